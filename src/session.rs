// src/session.rs
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::PollError;
use crate::models::User;

/// What the service knows about the current identity.
///
/// `Unknown` means session retrieval has not finished yet. Callers must not
/// treat it as logged out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unknown,
    LoggedOut,
    LoggedIn(User),
}

/// Tracks the single logged-in user. Login is mocked: any non-empty email is
/// accepted.
#[derive(Debug, Default)]
pub struct SessionHolder {
    state: AuthState,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            AuthState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn require_user(&self) -> Result<&User, PollError> {
        match &self.state {
            AuthState::LoggedIn(user) => Ok(user),
            AuthState::LoggedOut => Err(PollError::AuthRequired),
            AuthState::Unknown => Err(PollError::SessionPending),
        }
    }

    /// Resolves the state once session retrieval has completed.
    pub fn restore(&mut self, user: Option<User>) {
        self.state = match user {
            Some(user) => AuthState::LoggedIn(user),
            None => AuthState::LoggedOut,
        };
    }

    pub fn login(&mut self, email: &str) -> Result<&User, PollError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(PollError::invalid("email", "Email is required"));
        }

        let same_user = matches!(&self.state, AuthState::LoggedIn(user) if user.email == email);
        if !same_user {
            let user = User {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
            };
            info!(user_id = %user.id, "user logged in");
            self.state = AuthState::LoggedIn(user);
        }

        self.require_user()
    }

    pub fn logout(&mut self) {
        if let AuthState::LoggedIn(user) = &self.state {
            info!(user_id = %user.id, "user logged out");
        }
        self.state = AuthState::LoggedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown_and_is_not_treated_as_logged_out() {
        let session = SessionHolder::new();
        assert_eq!(session.state(), &AuthState::Unknown);
        assert!(matches!(session.require_user(), Err(PollError::SessionPending)));
    }

    #[test]
    fn restore_without_user_logs_out() {
        let mut session = SessionHolder::new();
        session.restore(None);
        assert_eq!(session.state(), &AuthState::LoggedOut);
        assert!(matches!(session.require_user(), Err(PollError::AuthRequired)));
    }

    #[test]
    fn login_with_empty_email_fails() {
        let mut session = SessionHolder::new();
        session.restore(None);
        let err = session.login("   ").unwrap_err();
        match err {
            PollError::Validation(errors) => assert!(errors.get("email").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.state(), &AuthState::LoggedOut);
    }

    #[test]
    fn login_sets_current_user() {
        let mut session = SessionHolder::new();
        let user = session.login("a@b.com").unwrap().clone();
        assert_eq!(user.email, "a@b.com");
        assert!(!user.id.is_empty());
        assert_eq!(session.current_user(), Some(&user));
    }

    #[test]
    fn repeated_login_with_same_email_keeps_one_user() {
        let mut session = SessionHolder::new();
        let first = session.login("a@b.com").unwrap().clone();
        let second = session.login("a@b.com").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(session.state(), &AuthState::LoggedIn(first));
    }

    #[test]
    fn login_with_other_email_replaces_user() {
        let mut session = SessionHolder::new();
        let first = session.login("a@b.com").unwrap().clone();
        let second = session.login("c@d.com").unwrap().clone();
        assert_ne!(first.id, second.id);
        assert_eq!(session.current_user().map(|u| u.email.as_str()), Some("c@d.com"));
    }

    #[test]
    fn logout_is_unconditional() {
        let mut session = SessionHolder::new();
        session.logout();
        assert_eq!(session.state(), &AuthState::LoggedOut);

        session.login("a@b.com").unwrap();
        session.logout();
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let mut session = SessionHolder::new();
        assert_eq!(
            serde_json::to_value(session.state()).unwrap(),
            serde_json::json!({ "status": "unknown" })
        );
        session.login("a@b.com").unwrap();
        let value = serde_json::to_value(session.state()).unwrap();
        assert_eq!(value["status"], "logged_in");
        assert_eq!(value["user"]["email"], "a@b.com");
    }
}
