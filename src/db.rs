// src/db.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::backend::PollBackend;
use crate::error::PollError;
use crate::models::{Poll, PollOption, User};
use crate::poll::{apply_update, build_poll};

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        seq BIGSERIAL,
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        owner_id TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS poll_options (
        poll_id TEXT NOT NULL REFERENCES polls (id) ON DELETE CASCADE,
        id TEXT NOT NULL,
        position BIGINT NOT NULL,
        text TEXT NOT NULL,
        votes BIGINT NOT NULL DEFAULT 0 CHECK (votes >= 0),
        PRIMARY KEY (poll_id, id)
    )
    "#,
];

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[derive(Debug, sqlx::FromRow)]
struct PollRow {
    id: String,
    title: String,
    description: String,
    owner_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    poll_id: String,
    id: String,
    text: String,
    votes: i64,
}

fn assemble(row: PollRow, options: Vec<OptionRow>) -> Result<Poll, PollError> {
    let options = options
        .into_iter()
        .map(|opt| {
            let votes = u64::try_from(opt.votes).map_err(|_| {
                PollError::backend(format!("negative vote count on option {}", opt.id))
            })?;
            Ok(PollOption {
                id: opt.id,
                text: opt.text,
                votes,
            })
        })
        .collect::<Result<Vec<_>, PollError>>()?;

    Ok(Poll {
        id: row.id,
        title: row.title,
        description: row.description,
        options,
        owner_id: row.owner_id,
        created_at: row.created_at,
    })
}

async fn load_poll(conn: &mut PgConnection, id: &str) -> Result<Poll, PollError> {
    let row = sqlx::query_as::<_, PollRow>(
        "SELECT id, title, description, owner_id, created_at FROM polls WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| PollError::poll_not_found(id))?;

    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT poll_id, id, text, votes FROM poll_options WHERE poll_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    assemble(row, options)
}

async fn insert_options(conn: &mut PgConnection, poll: &Poll) -> Result<(), PollError> {
    for (position, opt) in poll.options.iter().enumerate() {
        let votes = i64::try_from(opt.votes)
            .map_err(|_| PollError::invalid("options", "vote count out of range"))?;
        sqlx::query(
            "INSERT INTO poll_options (poll_id, id, position, text, votes) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&poll.id)
        .bind(&opt.id)
        .bind(position as i64)
        .bind(&opt.text)
        .bind(votes)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_poll(conn: &mut PgConnection, poll: &Poll) -> Result<(), PollError> {
    sqlx::query(
        "INSERT INTO polls (id, title, description, owner_id, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&poll.id)
    .bind(&poll.title)
    .bind(&poll.description)
    .bind(&poll.owner_id)
    .bind(poll.created_at)
    .execute(&mut *conn)
    .await?;

    insert_options(conn, poll).await
}

/// Polls persisted in Postgres. Votes are a single atomic increment so
/// concurrent voters are serialized by the database.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, PollError> {
        let pool = create_pool(database_url, max_connections).await?;
        let backend = Self::new(pool);
        backend.migrate().await?;
        Ok(backend)
    }

    pub async fn migrate(&self) -> Result<(), PollError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Inserts `polls` only when no poll exists yet.
    pub async fn seed_if_empty(&self, polls: &[Poll]) -> Result<(), PollError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM polls")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for poll in polls {
            insert_poll(&mut tx, poll).await?;
        }
        tx.commit().await?;
        info!(count = polls.len(), "seeded demo polls");
        Ok(())
    }
}

#[async_trait]
impl PollBackend for PgBackend {
    async fn list_polls(&self) -> Result<Vec<Poll>, PollError> {
        let polls = sqlx::query_as::<_, PollRow>(
            "SELECT id, title, description, owner_id, created_at FROM polls ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT poll_id, id, text, votes FROM poll_options ORDER BY poll_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_poll: HashMap<String, Vec<OptionRow>> = HashMap::new();
        for opt in options {
            by_poll.entry(opt.poll_id.clone()).or_default().push(opt);
        }

        polls
            .into_iter()
            .map(|row| {
                let options = by_poll.remove(&row.id).unwrap_or_default();
                assemble(row, options)
            })
            .collect()
    }

    async fn get_poll(&self, id: &str) -> Result<Poll, PollError> {
        let mut conn = self.pool.acquire().await?;
        load_poll(&mut conn, id).await
    }

    async fn create_poll(
        &self,
        owner: Option<&User>,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<Poll, PollError> {
        let poll = build_poll(owner, title, description, option_texts)?;

        let mut tx = self.pool.begin().await?;
        insert_poll(&mut tx, &poll).await?;
        tx.commit().await?;

        info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
        Ok(poll)
    }

    /// The increment and the reload share one transaction, so a caller that
    /// gives up before the commit leaves the tally untouched.
    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, PollError> {
        let mut tx = self.pool.begin().await?;

        let counted = sqlx::query_scalar::<_, i64>(
            "UPDATE poll_options SET votes = votes + 1 \
             WHERE poll_id = $1 AND id = $2 AND votes < $3 RETURNING votes",
        )
        .bind(poll_id)
        .bind(option_id)
        .bind(i64::MAX)
        .fetch_optional(&mut *tx)
        .await?;

        if counted.is_none() {
            let option_exists =
                sqlx::query("SELECT 1 FROM poll_options WHERE poll_id = $1 AND id = $2")
                    .bind(poll_id)
                    .bind(option_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .is_some();
            if option_exists {
                return Err(PollError::vote_limit_reached());
            }
            let poll_exists = sqlx::query("SELECT 1 FROM polls WHERE id = $1")
                .bind(poll_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            return Err(if poll_exists {
                PollError::option_not_found(option_id)
            } else {
                PollError::poll_not_found(poll_id)
            });
        }

        let poll = load_poll(&mut tx, poll_id).await?;
        tx.commit().await?;
        Ok(poll)
    }

    async fn update_poll(&self, editor: Option<&User>, updated: Poll) -> Result<Poll, PollError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM polls WHERE id = $1 FOR UPDATE")
            .bind(&updated.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PollError::poll_not_found(&updated.id))?;

        let stored = load_poll(&mut tx, &updated.id).await?;
        let replacement = apply_update(&stored, editor, updated)?;

        sqlx::query("UPDATE polls SET title = $2, description = $3 WHERE id = $1")
            .bind(&replacement.id)
            .bind(&replacement.title)
            .bind(&replacement.description)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM poll_options WHERE poll_id = $1")
            .bind(&replacement.id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, &replacement).await?;

        tx.commit().await?;
        info!(poll_id = %replacement.id, "poll updated");
        Ok(replacement)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use sqlx::postgres::PgConnectOptions;

    use super::*;
    use crate::models::MAX_VOTES;
    use crate::poll::demo_polls;

    fn row() -> PollRow {
        PollRow {
            id: "p1".into(),
            title: "Stored poll title".into(),
            description: String::new(),
            owner_id: Some("u1".into()),
            created_at: Utc::now(),
        }
    }

    fn option_row(id: &str, votes: i64) -> OptionRow {
        OptionRow {
            poll_id: "p1".into(),
            id: id.into(),
            text: format!("Option {id}"),
            votes,
        }
    }

    #[test]
    fn assemble_keeps_option_order() {
        let poll = assemble(row(), vec![option_row("1", 4), option_row("0", 2)]).unwrap();
        let ids: Vec<&str> = poll.options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "0"]);
        assert_eq!(poll.total_votes(), 6);
        assert_eq!(poll.owner_id.as_deref(), Some("u1"));
    }

    #[test]
    fn assemble_rejects_negative_tallies() {
        let err = assemble(row(), vec![option_row("0", -1)]).unwrap_err();
        assert!(matches!(err, PollError::Backend(Some(_))));
    }

    /// Backend on a fresh schema of the database named by `DATABASE_URL`.
    /// Returns `None` when no database is configured, so these tests pass
    /// trivially on machines without Postgres.
    async fn scratch_backend() -> Option<PgBackend> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let schema = format!("poll_test_{}", uuid::Uuid::new_v4().simple());

        let admin = create_pool(&url, 1).await.unwrap();
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .unwrap();

        let options = PgConnectOptions::from_str(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .unwrap();
        let backend = PgBackend::new(pool);
        backend.migrate().await.unwrap();
        Some(backend)
    }

    fn owner() -> User {
        User {
            id: "u1".into(),
            email: "u1@example.com".into(),
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn pg_lists_polls_in_insertion_order() {
        let Some(backend) = scratch_backend().await else {
            return;
        };
        backend.seed_if_empty(&demo_polls()).await.unwrap();
        let created = backend
            .create_poll(Some(&owner()), "Newest poll", "", &texts(&["One", "Two"]))
            .await
            .unwrap();

        let ids: Vec<String> = backend
            .list_polls()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string(), created.id]);

        // seeding is skipped once polls exist
        backend.seed_if_empty(&demo_polls()).await.unwrap();
        assert_eq!(backend.list_polls().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn pg_vote_counts_once_and_reports_missing_ids() {
        let Some(backend) = scratch_backend().await else {
            return;
        };
        backend.seed_if_empty(&demo_polls()).await.unwrap();

        let poll = backend.vote("1", "a").await.unwrap();
        assert_eq!(poll.option("a").map(|o| o.votes), Some(3));
        let poll = backend.vote("1", "a").await.unwrap();
        assert_eq!(poll.option("a").map(|o| o.votes), Some(4));

        let err = backend.vote("1", "z").await.unwrap_err();
        assert!(matches!(err, PollError::NotFound { entity: "option", .. }));
        let err = backend.vote("missing", "a").await.unwrap_err();
        assert!(matches!(err, PollError::NotFound { entity: "poll", .. }));

        let votes: Vec<u64> = backend
            .get_poll("1")
            .await
            .unwrap()
            .options
            .iter()
            .map(|o| o.votes)
            .collect();
        assert_eq!(votes, vec![4, 3, 1]);
    }

    #[tokio::test]
    async fn pg_vote_stops_at_the_limit() {
        let Some(backend) = scratch_backend().await else {
            return;
        };
        let mut poll = backend
            .create_poll(Some(&owner()), "Limits poll", "", &texts(&["One", "Two"]))
            .await
            .unwrap();
        poll.options[0].votes = MAX_VOTES;
        backend.update_poll(Some(&owner()), poll.clone()).await.unwrap();

        let err = backend.vote(&poll.id, "0").await.unwrap_err();
        assert!(matches!(err, PollError::Validation(_)));
        let stored = backend.get_poll(&poll.id).await.unwrap();
        assert_eq!(stored.options[0].votes, MAX_VOTES);
    }

    #[tokio::test]
    async fn pg_update_replaces_options() {
        let Some(backend) = scratch_backend().await else {
            return;
        };
        let mut poll = backend
            .create_poll(Some(&owner()), "Original", "", &texts(&["One", "Two", "Three"]))
            .await
            .unwrap();
        backend.vote(&poll.id, "2").await.unwrap();

        poll.title = "Renamed".into();
        poll.options = vec![
            PollOption {
                id: "1".into(),
                text: "Second".into(),
                votes: 7,
            },
            PollOption::new("new-1700000000000", "Fresh"),
        ];
        let updated = backend.update_poll(Some(&owner()), poll.clone()).await.unwrap();
        assert_eq!(backend.get_poll(&poll.id).await.unwrap(), updated);

        let options: Vec<(&str, u64)> = updated
            .options
            .iter()
            .map(|o| (o.id.as_str(), o.votes))
            .collect();
        assert_eq!(options, vec![("1", 7), ("0", 0)]);
        assert_eq!(updated.title, "Renamed");

        let stranger = User {
            id: "u2".into(),
            email: "u2@example.com".into(),
        };
        let err = backend.update_poll(Some(&stranger), poll).await.unwrap_err();
        assert!(matches!(err, PollError::Forbidden));
    }
}
