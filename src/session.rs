use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const KEYRING_SERVICE: &str = "inner-health-client";
const TOKEN_ACCOUNT: &str = "auth-token";

/// The authentication boundary. Credential checks happen elsewhere; the
/// client only needs the current token and a way to drop it.
#[async_trait]
pub trait AuthSession: Send + Sync {
    async fn current_identity(&self) -> AppResult<Option<String>>;
    async fn sign_out(&self) -> AppResult<()>;
}

/// Keeps the bearer token in the OS keyring. The entry is resolved once and
/// shared by clones, so every read sees the last write.
#[derive(Clone)]
pub struct KeyringSession {
    keyring_lock: Arc<Mutex<()>>,
    entry: Arc<keyring::Entry>,
}

impl KeyringSession {
    pub fn new() -> AppResult<Self> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, TOKEN_ACCOUNT)?;
        Ok(Self {
            keyring_lock: Arc::new(Mutex::new(())),
            entry: Arc::new(entry),
        })
    }

    pub async fn store_token(&self, token: &str) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::Validation("auth token cannot be empty".to_string()));
        }
        let _guard = self.keyring_lock.lock().await;
        self.entry.set_password(token)?;
        Ok(())
    }
}

#[async_trait]
impl AuthSession for KeyringSession {
    async fn current_identity(&self) -> AppResult<Option<String>> {
        let _guard = self.keyring_lock.lock().await;
        match self.entry.get_password() {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AppError::from(error)),
        }
    }

    async fn sign_out(&self) -> AppResult<()> {
        let _guard = self.keyring_lock.lock().await;
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AppError::from(error)),
        }
    }
}

/// A fixed token held in memory, for embedders that manage credentials
/// themselves.
#[derive(Default)]
pub struct StaticSession {
    token: Mutex<Option<String>>,
}

impl StaticSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

#[async_trait]
impl AuthSession for StaticSession {
    async fn current_identity(&self) -> AppResult<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn sign_out(&self) -> AppResult<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}
