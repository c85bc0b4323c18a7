// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ids of options added during an edit start with this marker until the
/// store assigns them a real id.
pub const PENDING_OPTION_PREFIX: &str = "new-";

/// Largest tally an option may hold. Matches the BIGINT column so the
/// in-memory and Postgres backends accept the same counts.
pub const MAX_VOTES: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub votes: u64,
}

impl PollOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            votes: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.starts_with(PENDING_OPTION_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|opt| opt.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: &str) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|opt| opt.id == option_id)
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id.as_deref() == Some(user.id.as_str())
    }

    fn exact_total(&self) -> u128 {
        self.options.iter().map(|opt| u128::from(opt.votes)).sum()
    }

    /// Saturates at `u64::MAX`.
    pub fn total_votes(&self) -> u64 {
        u64::try_from(self.exact_total()).unwrap_or(u64::MAX)
    }

    /// Per-option share of the total, rounded to the nearest whole percent.
    pub fn results(&self) -> PollResults {
        let total = self.exact_total();
        PollResults {
            poll_id: self.id.clone(),
            total_votes: self.total_votes(),
            options: self
                .options
                .iter()
                .map(|opt| OptionResult {
                    id: opt.id.clone(),
                    text: opt.text.clone(),
                    votes: opt.votes,
                    percentage: percentage(opt.votes, total),
                })
                .collect(),
        }
    }
}

fn percentage(votes: u64, total: u128) -> u64 {
    if total == 0 {
        return 0;
    }
    // round half up without going through floats; the share never exceeds 100
    let share = (u128::from(votes) * 200 + total) / (total * 2);
    share as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionResult {
    pub id: String,
    pub text: String,
    pub votes: u64,
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResults {
    pub poll_id: String,
    pub total_votes: u64,
    pub options: Vec<OptionResult>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePollRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_with_votes(votes: &[u64]) -> Poll {
        Poll {
            id: "p".into(),
            title: "Favorite editor?".into(),
            description: String::new(),
            options: votes
                .iter()
                .enumerate()
                .map(|(i, v)| PollOption {
                    id: i.to_string(),
                    text: format!("Option {i}"),
                    votes: *v,
                })
                .collect(),
            owner_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn results_round_to_nearest_percent() {
        let results = poll_with_votes(&[2, 3, 1]).results();
        assert_eq!(results.total_votes, 6);
        let shares: Vec<u64> = results.options.iter().map(|o| o.percentage).collect();
        assert_eq!(shares, vec![33, 50, 17]);
    }

    #[test]
    fn results_without_votes_are_zero() {
        let results = poll_with_votes(&[0, 0]).results();
        assert_eq!(results.total_votes, 0);
        assert!(results.options.iter().all(|o| o.percentage == 0));
    }

    #[test]
    fn half_percent_rounds_up() {
        // 1 of 8 is 12.5%
        let results = poll_with_votes(&[1, 7]).results();
        assert_eq!(results.options[0].percentage, 13);
        assert_eq!(results.options[1].percentage, 88);
    }

    #[test]
    fn large_tallies_do_not_overflow() {
        let results = poll_with_votes(&[100_000_000_000_000_000, 0]).results();
        assert_eq!(results.options[0].percentage, 100);
        assert_eq!(results.options[1].percentage, 0);

        let results = poll_with_votes(&[u64::MAX, u64::MAX, 0]).results();
        assert_eq!(results.total_votes, u64::MAX);
        assert_eq!(results.options[0].percentage, 50);
        assert_eq!(results.options[2].percentage, 0);
    }

    #[test]
    fn pending_marker_is_detected() {
        assert!(PollOption::new("new-1700000000000", "Rust").is_pending());
        assert!(!PollOption::new("0", "Rust").is_pending());
    }

    #[test]
    fn ownership_requires_matching_id() {
        let mut poll = poll_with_votes(&[0, 0]);
        let user = User {
            id: "u1".into(),
            email: "a@b.com".into(),
        };
        assert!(!poll.is_owned_by(&user));
        poll.owner_id = Some("u1".into());
        assert!(poll.is_owned_by(&user));
    }
}
