//! Session identity and lifecycle.

use chrono::Utc;
use tracing::debug;

use crate::error::ValidationError;
use crate::types::Session;
use crate::utils;

// ─────────────────────────────────────────────
// SessionManager
// ─────────────────────────────────────────────

/// Owns the identity of the single active session.
///
/// Pure state transitions: no I/O, no interior mutability.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Option<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session for `user_id`, replacing any active one.
    ///
    /// A blank `session_id_hint` is treated as absent, in which case an id is
    /// generated. Values returned by earlier calls are left untouched.
    pub fn start(
        &mut self,
        user_id: &str,
        session_id_hint: Option<&str>,
    ) -> Result<Session, ValidationError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }

        let session_id = match session_id_hint.map(str::trim) {
            Some(hint) if !hint.is_empty() => hint.to_string(),
            _ => utils::generate_session_id(),
        };

        let session = Session {
            user_id: user_id.to_string(),
            session_id,
            started_at: Utc::now(),
        };
        debug!(user = %session.user_id, session = %session.session_id, "session started");

        self.current = Some(session.clone());
        Ok(session)
    }

    /// Discard the active session. Safe to call with no active session.
    pub fn reset(&mut self) {
        if let Some(session) = self.current.take() {
            debug!(session = %session.session_id, "session reset");
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_start_trims_user_id() {
        let mut mgr = SessionManager::new();
        let session = mgr.start("  alice ", None).unwrap();
        assert_eq!(session.user_id, "alice");
        assert!(!session.session_id.is_empty());
        assert_eq!(mgr.current(), Some(&session));
    }

    #[test]
    fn test_start_rejects_blank_user_id() {
        let mut mgr = SessionManager::new();
        assert_eq!(mgr.start("", None), Err(ValidationError::EmptyUserId));
        assert_eq!(mgr.start("   ", None), Err(ValidationError::EmptyUserId));
        assert!(mgr.current().is_none());
    }

    #[test]
    fn test_failed_start_keeps_prior_session() {
        let mut mgr = SessionManager::new();
        let first = mgr.start("alice", Some("abc")).unwrap();
        assert!(mgr.start(" ", None).is_err());
        assert_eq!(mgr.current(), Some(&first));
    }

    #[test]
    fn test_start_uses_hint() {
        let mut mgr = SessionManager::new();
        let session = mgr.start("bob", Some(" my-session ")).unwrap();
        assert_eq!(session.session_id, "my-session");
    }

    #[test]
    fn test_blank_hint_generates_id() {
        let mut mgr = SessionManager::new();
        let session = mgr.start("bob", Some("   ")).unwrap();
        assert!(session.session_id.starts_with("session_"));
    }

    #[test]
    fn test_generated_ids_differ() {
        let mut mgr = SessionManager::new();
        let ids: HashSet<String> = (0..1000)
            .map(|_| mgr.start("alice", None).unwrap().session_id)
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_start_does_not_mutate_previous_session() {
        let mut mgr = SessionManager::new();
        let first = mgr.start("alice", Some("one")).unwrap();
        let snapshot = first.clone();
        let second = mgr.start("carol", Some("two")).unwrap();
        assert_eq!(first, snapshot);
        assert_eq!(mgr.current(), Some(&second));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut mgr = SessionManager::new();
        mgr.reset();
        mgr.start("alice", None).unwrap();
        mgr.reset();
        mgr.reset();
        assert!(mgr.current().is_none());
    }
}
