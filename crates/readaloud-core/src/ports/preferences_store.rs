//! Preferences store trait definition.
//!
//! The settings store is an external async key-value store. The core only
//! loads preferences for session defaults and saves the enable toggle.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ReaderError;
use crate::preferences::UserPreferences;

/// Store failures.
#[derive(Debug, Error)]
pub enum PreferencesStoreError {
    #[error("Preferences store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored preferences are malformed: {0}")]
    Malformed(String),
}

impl From<PreferencesStoreError> for ReaderError {
    fn from(err: PreferencesStoreError) -> Self {
        Self::Preferences {
            message: err.to_string(),
        }
    }
}

/// Persistence for [`UserPreferences`].
///
/// # Design Rules
///
/// - Works with the domain type directly
/// - `load` returns defaults when nothing is stored
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn load(&self) -> Result<UserPreferences, PreferencesStoreError>;

    async fn save(&self, preferences: &UserPreferences) -> Result<(), PreferencesStoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    inner: Mutex<UserPreferences>,
}

impl MemoryPreferencesStore {
    pub fn new(preferences: UserPreferences) -> Self {
        Self {
            inner: Mutex::new(preferences),
        }
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn load(&self) -> Result<UserPreferences, PreferencesStoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<(), PreferencesStoreError> {
        *self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = preferences.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryPreferencesStore::default();
        let prefs = UserPreferences {
            enabled: false,
            ..Default::default()
        };
        tokio_test::block_on(store.save(&prefs)).unwrap();
        assert!(!tokio_test::block_on(store.load()).unwrap().enabled);
    }

    #[test]
    fn store_errors_convert() {
        let err: ReaderError = PreferencesStoreError::Unavailable("offline".into()).into();
        assert_eq!(
            err,
            ReaderError::Preferences {
                message: "Preferences store unavailable: offline".to_string()
            }
        );
    }
}
