use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NETWORK_FAILURE: {0}")]
    Network(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("VALIDATION_FAILED: {0}")]
    Validation(String),
    #[error("PERSISTENCE_FAILURE: {0}")]
    Persistence(String),
    #[error("SUBMIT_REJECTED: {0}")]
    Submit(String),
    #[error("SERVER_ERROR {status}: {message}")]
    Server { status: u16, message: String },
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network(value.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<keyring::Error> for AppError {
    fn from(value: keyring::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
