use crate::db::KeyValueStore;
use crate::errors::AppResult;
use crate::models::ThemePreference;
use std::sync::Arc;

pub const USER_ID_KEY: &str = "userId";
pub const THEME_KEY: &str = "@theme";

/// Holds the single `userId` token confirmed by a successful profile fetch
/// or update. Nothing else writes it.
#[derive(Clone)]
pub struct LocalIdentityStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocalIdentityStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Unreadable storage is reported as "no identity" so startup falls back
    /// to remote resolution.
    pub fn get(&self) -> Option<String> {
        match self.store.get(USER_ID_KEY) {
            Ok(value) => value.filter(|id| !id.trim().is_empty()),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read local identity");
                None
            }
        }
    }

    pub fn set(&self, user_id: &str) -> AppResult<()> {
        self.store.set(USER_ID_KEY, user_id)
    }

    pub fn clear(&self) -> AppResult<()> {
        self.store.remove(USER_ID_KEY)
    }
}

#[derive(Clone)]
pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> ThemePreference {
        match self.store.get(THEME_KEY) {
            Ok(Some(raw)) => ThemePreference::parse(&raw).unwrap_or_default(),
            Ok(None) => ThemePreference::default(),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read theme preference");
                ThemePreference::default()
            }
        }
    }

    /// Flips the stored theme. The new value is returned even when it could
    /// not be persisted.
    pub fn toggle(&self) -> ThemePreference {
        let next = self.load().toggled();
        if let Err(error) = self.store.set(THEME_KEY, next.as_str()) {
            tracing::warn!(error = %error, "failed to persist theme preference");
        }
        next
    }
}
