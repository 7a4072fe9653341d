//! In-memory per-user context: the API key and the preview flag.
//!
//! Nothing here is ever written to disk. Idle sessions are pruned lazily
//! whenever the store is touched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: Uuid,
    pub credential: Option<String>,
    pub preview_requested: bool,
    last_seen: Instant,
}

impl SessionContext {
    fn new(id: Uuid) -> Self {
        SessionContext {
            id,
            credential: None,
            preview_requested: false,
            last_seen: Instant::now(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

/// Optional field updates; `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct SessionUpdate {
    pub credential: Option<String>,
    pub preview_requested: Option<bool>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionContext>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionContext>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prune(&self, sessions: &mut HashMap<Uuid, SessionContext>) {
        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() < ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, "Pruned idle sessions");
        }
    }

    pub fn create(&self, update: SessionUpdate) -> SessionContext {
        let mut sessions = self.lock();
        self.prune(&mut sessions);

        let mut session = SessionContext::new(Uuid::new_v4());
        apply(&mut session, update);
        sessions.insert(session.id, session.clone());
        tracing::info!(session = %session.id, live = sessions.len(), "Session created");
        session
    }

    /// Snapshot of a live session; refreshes its idle timer.
    pub fn get(&self, id: Uuid) -> Result<SessionContext> {
        let mut sessions = self.lock();
        self.prune(&mut sessions);

        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        session.last_seen = Instant::now();
        Ok(session.clone())
    }

    pub fn update(&self, id: Uuid, update: SessionUpdate) -> Result<SessionContext> {
        let mut sessions = self.lock();
        self.prune(&mut sessions);

        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        apply(session, update);
        session.last_seen = Instant::now();
        Ok(session.clone())
    }

    pub fn end(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.lock();
        sessions
            .remove(&id)
            .map(|_| tracing::info!(session = %id, "Session ended"))
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }
}

fn apply(session: &mut SessionContext, update: SessionUpdate) {
    if let Some(credential) = update.credential {
        let trimmed = credential.trim();
        session.credential = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }
    if let Some(preview) = update.preview_requested {
        session.preview_requested = preview;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[test]
    fn create_then_get() {
        let store = store();
        let created = store.create(SessionUpdate {
            credential: Some("  sk-abc  ".to_string()),
            preview_requested: Some(true),
        });
        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.credential.as_deref(), Some("sk-abc"));
        assert!(fetched.preview_requested);
        assert!(fetched.has_credential());
    }

    #[test]
    fn update_changes_only_given_fields() {
        let store = store();
        let id = store.create(SessionUpdate {
            credential: Some("sk-abc".to_string()),
            preview_requested: None,
        })
        .id;

        let updated = store
            .update(id, SessionUpdate { credential: None, preview_requested: Some(true) })
            .unwrap();
        assert_eq!(updated.credential.as_deref(), Some("sk-abc"));
        assert!(updated.preview_requested);

        let cleared = store
            .update(id, SessionUpdate { credential: Some(String::new()), preview_requested: None })
            .unwrap();
        assert!(!cleared.has_credential());
    }

    #[test]
    fn unknown_and_ended_sessions() {
        let store = store();
        assert!(matches!(store.get(Uuid::new_v4()), Err(AppError::SessionNotFound(_))));

        let id = store.create(SessionUpdate::default()).id;
        store.end(id).unwrap();
        assert!(matches!(store.get(id), Err(AppError::SessionNotFound(_))));
        assert!(store.end(id).is_err());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create(SessionUpdate::default()).id;
        assert!(matches!(store.get(id), Err(AppError::SessionNotFound(_))));
    }
}
