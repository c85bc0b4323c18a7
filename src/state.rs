// src/state.rs
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::backend::{MemoryBackend, PollBackend, TimedBackend};
use crate::config::Config;
use crate::db::PgBackend;
use crate::error::PollError;
use crate::items::ItemStore;
use crate::poll::{demo_polls, PollStore};
use crate::session::SessionHolder;

/// Everything a handler can reach. Passed to the router as shared state.
pub struct AppState {
    pub config: Config,
    pub session: RwLock<SessionHolder>,
    pub polls: Arc<dyn PollBackend>,
    pub items: ItemStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wraps `backend` with the configured timeout. The session starts out
    /// unknown until [`AppState::resolve_session`] runs.
    pub fn with_backend(config: Config, backend: Arc<dyn PollBackend>) -> SharedState {
        let polls: Arc<dyn PollBackend> =
            Arc::new(TimedBackend::new(backend, config.backend_timeout));
        Arc::new(Self {
            config,
            session: RwLock::new(SessionHolder::new()),
            polls,
            items: ItemStore::default(),
        })
    }

    /// Picks Postgres when a database URL is configured, otherwise the
    /// in-memory store.
    pub async fn connect(config: Config) -> Result<SharedState, PollError> {
        let backend: Arc<dyn PollBackend> = match &config.database_url {
            Some(url) => {
                let pg = PgBackend::connect(url, config.database_max_connections).await?;
                if config.seed_demo_polls {
                    pg.seed_if_empty(&demo_polls()).await?;
                }
                info!("using postgres poll backend");
                Arc::new(pg)
            }
            None => {
                let store = if config.seed_demo_polls {
                    PollStore::seeded()
                } else {
                    PollStore::new()
                };
                info!("using in-memory poll backend");
                Arc::new(MemoryBackend::new(store))
            }
        };

        let state = Self::with_backend(config, backend);
        state.resolve_session().await;
        Ok(state)
    }

    /// Login is mocked, so there is never a stored session to pick up.
    pub async fn resolve_session(&self) {
        self.session.write().await.restore(None);
    }
}
