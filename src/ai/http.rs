//! HTTP client for the annotation service
//!
//! Endpoints:
//! - `POST /api/auto-annotate` `{text, model}` → `{annotations: [...]}`
//! - `POST /api/qa` `{text, question, model}` → `{result: "..."}`

use super::client::{AiError, AnnotationClient};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5004";

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    text: &'a str,
    model: &'a str,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    text: &'a str,
    question: &'a str,
    model: &'a str,
}

#[derive(Clone)]
pub struct HttpAnnotationClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpAnnotationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(&self, e: reqwest::Error) -> AiError {
        if e.is_timeout() {
            AiError::Timeout(self.timeout)
        } else if e.is_connect() {
            AiError::Unavailable(e.to_string())
        } else {
            AiError::RequestFailed(e.to_string())
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, AiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "annotation service request");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl AnnotationClient for HttpAnnotationClient {
    async fn is_available(&self) -> bool {
        // Any HTTP answer, even an error status, means the service is up.
        self.client
            .get(&self.base_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn annotate(&self, text: &str, model: &str) -> Result<Value, AiError> {
        self.post("/api/auto-annotate", &AnnotateRequest { text, model }).await
    }

    async fn ask(&self, text: &str, question: &str, model: &str) -> Result<String, AiError> {
        let value = self
            .post("/api/qa", &AskRequest { text, question, model })
            .await?;
        match value.get("result") {
            Some(Value::String(answer)) => Ok(answer.clone()),
            _ => Err(AiError::Parse("missing 'result' string".to_string())),
        }
    }
}
