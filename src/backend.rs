// src/backend.rs
//! Async seam between the HTTP layer and whatever owns the poll data.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::PollError;
use crate::models::{Poll, PollResults, User};
use crate::poll::PollStore;

#[async_trait]
pub trait PollBackend: Send + Sync {
    async fn list_polls(&self) -> Result<Vec<Poll>, PollError>;

    async fn get_poll(&self, id: &str) -> Result<Poll, PollError>;

    async fn create_poll(
        &self,
        owner: Option<&User>,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<Poll, PollError>;

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, PollError>;

    async fn update_poll(&self, editor: Option<&User>, updated: Poll) -> Result<Poll, PollError>;

    async fn results(&self, poll_id: &str) -> Result<PollResults, PollError> {
        Ok(self.get_poll(poll_id).await?.results())
    }
}

/// Serves the in-memory store. Every call holds the lock for its whole
/// duration, so mutations never interleave.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: RwLock<PollStore>,
}

impl MemoryBackend {
    pub fn new(store: PollStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }
}

#[async_trait]
impl PollBackend for MemoryBackend {
    async fn list_polls(&self) -> Result<Vec<Poll>, PollError> {
        Ok(self.store.read().await.list_polls().to_vec())
    }

    async fn get_poll(&self, id: &str) -> Result<Poll, PollError> {
        self.store.read().await.get_poll(id).cloned()
    }

    async fn create_poll(
        &self,
        owner: Option<&User>,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<Poll, PollError> {
        self.store
            .write()
            .await
            .create_poll(owner, title, description, option_texts)
            .cloned()
    }

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, PollError> {
        self.store.write().await.vote(poll_id, option_id).cloned()
    }

    async fn update_poll(&self, editor: Option<&User>, updated: Poll) -> Result<Poll, PollError> {
        self.store.write().await.update_poll(editor, updated).cloned()
    }

    async fn results(&self, poll_id: &str) -> Result<PollResults, PollError> {
        self.store.read().await.results(poll_id)
    }
}

/// Bounds every call on the inner backend. A call that runs past the limit
/// resolves once with a backend error; it is never retried.
///
/// Hitting the limit drops the inner future. Backends apply a mutation as the
/// last step of a call (the in-memory store under its write lock, Postgres
/// at commit), so a call reported as timed out has not been applied. The one
/// ambiguous window is a Postgres commit already in flight.
pub struct TimedBackend {
    inner: Arc<dyn PollBackend>,
    limit: Duration,
}

impl TimedBackend {
    pub fn new(inner: Arc<dyn PollBackend>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, PollError>> + Send,
    ) -> Result<T, PollError> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, limit_ms = self.limit.as_millis() as u64, "backend call timed out");
                Err(PollError::backend(format!(
                    "backend did not respond within {} ms",
                    self.limit.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl PollBackend for TimedBackend {
    async fn list_polls(&self) -> Result<Vec<Poll>, PollError> {
        self.bounded("list_polls", self.inner.list_polls()).await
    }

    async fn get_poll(&self, id: &str) -> Result<Poll, PollError> {
        self.bounded("get_poll", self.inner.get_poll(id)).await
    }

    async fn create_poll(
        &self,
        owner: Option<&User>,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<Poll, PollError> {
        self.bounded(
            "create_poll",
            self.inner.create_poll(owner, title, description, option_texts),
        )
        .await
    }

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, PollError> {
        self.bounded("vote", self.inner.vote(poll_id, option_id)).await
    }

    async fn update_poll(&self, editor: Option<&User>, updated: Poll) -> Result<Poll, PollError> {
        self.bounded("update_poll", self.inner.update_poll(editor, updated))
            .await
    }

    async fn results(&self, poll_id: &str) -> Result<PollResults, PollError> {
        self.bounded("results", self.inner.results(poll_id)).await
    }
}
