// error.rs
use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// Field name to message, shown next to the offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Keeps the first message recorded for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Please correct the errors in the form.")
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("You must be logged in")]
    AuthRequired,

    #[error("only the poll owner can edit it")]
    Forbidden,

    #[error("session is still loading")]
    SessionPending,

    #[error("{}", .0.as_deref().unwrap_or(UNKNOWN_ERROR))]
    Backend(Option<String>),
}

impl PollError {
    pub fn poll_not_found(id: &str) -> Self {
        PollError::NotFound {
            entity: "poll",
            id: id.to_string(),
        }
    }

    pub fn option_not_found(id: &str) -> Self {
        PollError::NotFound {
            entity: "option",
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        PollError::Validation(ValidationErrors::single(field, message))
    }

    pub fn vote_limit_reached() -> Self {
        PollError::invalid("option_id", "This option cannot take more votes")
    }

    pub fn backend(message: impl Into<String>) -> Self {
        PollError::Backend(Some(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PollError::Validation(_) => StatusCode::BAD_REQUEST,
            PollError::NotFound { .. } => StatusCode::NOT_FOUND,
            PollError::AuthRequired => StatusCode::UNAUTHORIZED,
            PollError::Forbidden => StatusCode::FORBIDDEN,
            PollError::SessionPending => StatusCode::SERVICE_UNAVAILABLE,
            PollError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for PollError {
    fn from(e: sqlx::Error) -> Self {
        PollError::Backend(Some(e.to_string()))
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = match &self {
            PollError::Validation(errors) => json!({
                "error": self.to_string(),
                "fields": errors.fields(),
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
