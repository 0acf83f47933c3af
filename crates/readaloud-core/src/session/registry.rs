//! Bounded registry of live playback sessions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::state::{PlaybackSession, SessionId};
use crate::commands::TabId;
use crate::error::{ReaderError, ReaderResult};

/// Default maximum number of concurrent sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10;

/// Default idle time after which a session is swept.
pub const DEFAULT_IDLE_TIMEOUT_HOURS: i64 = 24;

/// Registry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: Duration::hours(DEFAULT_IDLE_TIMEOUT_HOURS),
        }
    }
}

/// Holds every session that has not been stopped, expired or torn down.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    config: RegistryConfig,
    sessions: HashMap<SessionId, PlaybackSession>,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Add a session, failing with `SessionLimitExceeded` at capacity.
    pub fn register(&mut self, session: PlaybackSession) -> ReaderResult<SessionId> {
        if self.sessions.len() >= self.config.max_sessions {
            tracing::warn!(
                max = self.config.max_sessions,
                "Session registry full, rejecting session"
            );
            return Err(ReaderError::SessionLimitExceeded {
                max: self.config.max_sessions,
            });
        }
        let id = session.id();
        self.sessions.insert(id, session);
        tracing::debug!(session_id = %id, count = self.sessions.len(), "Session registered");
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Option<&PlaybackSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut PlaybackSession> {
        self.sessions.get_mut(&id)
    }

    /// Like [`Self::get_mut`], but a missing id is a `SessionNotFound` error.
    pub fn require_mut(&mut self, id: SessionId) -> ReaderResult<&mut PlaybackSession> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| ReaderError::session_not_found(id))
    }

    pub fn remove(&mut self, id: SessionId) -> Option<PlaybackSession> {
        self.sessions.remove(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// All sessions, oldest first.
    pub fn all(&self) -> Vec<&PlaybackSession> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by_key(|s| (s.created_at(), s.id()));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of every session reading in `tab`.
    pub fn ids_for_tab(&self, tab: TabId) -> Vec<SessionId> {
        self.all()
            .into_iter()
            .filter(|s| s.tab_id() == tab)
            .map(PlaybackSession::id)
            .collect()
    }

    /// Remove and return sessions idle for longer than the timeout, as of `now`.
    pub fn drain_expired(&mut self, now: DateTime<Utc>) -> Vec<PlaybackSession> {
        let cutoff = now - self.config.idle_timeout;
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.is_idle_since(cutoff))
            .map(PlaybackSession::id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }

    /// Remove idle sessions and return how many were removed.
    pub fn sweep(&mut self) -> usize {
        let removed = self.drain_expired(Utc::now()).len();
        if removed > 0 {
            tracing::info!(removed, remaining = self.sessions.len(), "Swept idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleId;

    fn session(tab: u64) -> PlaybackSession {
        PlaybackSession::new(ArticleId::new(), TabId(tab), "Some words to read.", 0)
    }

    #[test]
    fn eleventh_session_is_rejected() {
        let mut registry = SessionRegistry::default();
        for _ in 0..10 {
            registry.register(session(1)).unwrap();
        }
        let err = registry.register(session(1)).unwrap_err();
        assert_eq!(err, ReaderError::SessionLimitExceeded { max: 10 });
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn get_and_remove() {
        let mut registry = SessionRegistry::default();
        let id = registry.register(session(1)).unwrap();
        assert!(registry.get(id).is_some());
        assert!(registry.remove(id).is_some());
        assert!(registry.get(id).is_none());
        assert!(matches!(
            registry.require_mut(id),
            Err(ReaderError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn sessions_by_tab() {
        let mut registry = SessionRegistry::default();
        let a = registry.register(session(1)).unwrap();
        registry.register(session(2)).unwrap();
        assert_eq!(registry.ids_for_tab(TabId(1)), vec![a]);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn expired_sessions_are_drained() {
        let mut registry = SessionRegistry::default();
        registry.register(session(1)).unwrap();
        registry.register(session(2)).unwrap();

        assert_eq!(registry.sweep(), 0);
        assert!(registry.drain_expired(Utc::now() + Duration::hours(23)).is_empty());

        let expired = registry.drain_expired(Utc::now() + Duration::hours(25));
        assert_eq!(expired.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn idle_timeout_is_configurable() {
        let mut registry = SessionRegistry::new(RegistryConfig {
            max_sessions: 2,
            idle_timeout: Duration::minutes(5),
        });
        registry.register(session(1)).unwrap();
        assert_eq!(
            registry
                .drain_expired(Utc::now() + Duration::minutes(6))
                .len(),
            1
        );
    }
}
