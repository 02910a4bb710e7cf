use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// JSON request/response boundary to the remote wellness API. Paths are
/// relative to the configured base URL (`water/today`, `tasks/12`, ...).
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, path: &str) -> AppResult<Value>;
    async fn post(&self, path: &str, body: Value) -> AppResult<Value>;
    async fn put(&self, path: &str, body: Value) -> AppResult<Value>;
    async fn delete(&self, path: &str) -> AppResult<()>;
}

pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, bearer_token: Option<&str>) -> AppResult<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = bearer_token.filter(|token| !token.is_empty()) {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|error| AppError::Validation(format!("invalid bearer token: {}", error)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> AppResult<Value> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let result = match request.send().await {
            Ok(response) => handle_response(path, response).await,
            Err(error) if error.is_timeout() => Err(AppError::Network(format!("request to {} timed out", path))),
            Err(error) => Err(AppError::from(error)),
        };

        if let Err(error) = &result {
            tracing::error!(method = %method, path = %path, error = %error, "api request failed");
        }
        result
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get(&self, path: &str) -> AppResult<Value> {
        self.send(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> AppResult<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> AppResult<Value> {
        self.send(Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}

async fn handle_response(path: &str, response: reqwest::Response) -> AppResult<Value> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{} not found", path)));
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AppError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    parse_body(&body)
}

fn parse_body(body: &str) -> AppResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
