use crate::errors::{AppError, AppResult};
use crate::transport::ApiTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    NotFound,
    Server(u16),
}

impl Failure {
    fn to_error(self, path: &str) -> AppError {
        match self {
            Self::Network => AppError::Network(format!("connection reset while calling {}", path)),
            Self::NotFound => AppError::NotFound(format!("{} not found", path)),
            Self::Server(status) => AppError::Server {
                status,
                message: "rejected".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Canned responses keyed by `"METHOD path"`, with every call recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, Result<Value, Failure>>>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn reply(&self, method: &str, path: &str, value: Value) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(format!("{} {}", method, path), Ok(value));
        self
    }

    pub fn fail(&self, method: &str, path: &str, failure: Failure) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(format!("{} {}", method, path), Err(failure));
        self
    }

    /// Scripts every `today` endpoint plus the profile.
    pub fn healthy_day(&self) -> &Self {
        self.reply("GET", "water/today", serde_json::json!({"totalMl": 750}))
            .reply("GET", "sleep/today", serde_json::json!({"record": {"hours": 7, "quality": 90}}))
            .reply("GET", "meditation/today", serde_json::json!({"total": 15, "items": []}))
            .reply("GET", "physical-activity/today", serde_json::json!({"total": 40, "items": []}))
            .reply("GET", "sunlight/today", serde_json::json!({"total": 20, "items": []}))
            .reply(
                "GET",
                "tasks/today",
                serde_json::json!([
                    {"id": 1, "title": "A", "isComplete": false, "priority": 0},
                    {"id": 2, "title": "B", "isComplete": false, "priority": 0},
                    {"id": 3, "title": "C", "isComplete": true, "priority": 1}
                ]),
            )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    async fn respond(&self, method: &'static str, path: &str, body: Option<Value>) -> AppResult<Value> {
        self.calls.lock().expect("calls lock").push(Call {
            method,
            path: path.to_string(),
            body,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get(&format!("{} {}", method, path))
            .cloned();
        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(failure)) => Err(failure.to_error(path)),
            None => Err(Failure::NotFound.to_error(path)),
        }
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get(&self, path: &str) -> AppResult<Value> {
        self.respond("GET", path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> AppResult<Value> {
        self.respond("POST", path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> AppResult<Value> {
        self.respond("PUT", path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.respond("DELETE", path, None).await.map(|_| ())
    }
}
