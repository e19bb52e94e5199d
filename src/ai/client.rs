//! Annotation service client
//!
//! Defines the client trait for the model-backed annotation service.
//! Two implementations:
//! - `HttpAnnotationClient`: JSON over HTTP to the annotation service (production)
//! - `MockClient`: returns preconfigured responses (testing)

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Errors from annotation service calls.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("annotation service not available: {0}")]
    Unavailable(String),

    #[error("annotation request failed: {0}")]
    RequestFailed(String),

    #[error("annotation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("annotation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to parse annotation response: {0}")]
    Parse(String),
}

/// Client for the annotation service.
///
/// Async because calls block on model inference, often for seconds.
#[async_trait]
pub trait AnnotationClient: Send + Sync {
    /// Check whether the service is reachable.
    async fn is_available(&self) -> bool;

    /// Ask for entity candidates in `text`.
    ///
    /// The response is returned undecoded; callers treat anything that is not
    /// a candidate sequence as "no candidates".
    async fn annotate(&self, text: &str, model: &str) -> Result<Value, AiError>;

    /// Ask a free-form question about `text`, returning the answer text.
    async fn ask(&self, text: &str, question: &str, model: &str) -> Result<String, AiError>;
}

/// Mock client for testing.
///
/// Entity responses are matched by substring: the first registered needle
/// contained in the request text wins.
pub struct MockClient {
    available: bool,
    annotations: Vec<(String, Result<Value, String>)>,
    default_annotations: Option<Value>,
    answer: Option<Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockClient {
    /// Create a mock client that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            annotations: Vec::new(),
            default_annotations: None,
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Respond with `response` to any text containing `needle`.
    pub fn with_annotations(mut self, needle: impl Into<String>, response: Value) -> Self {
        self.annotations.push((needle.into(), Ok(response)));
        self
    }

    /// Fail any request whose text contains `needle`.
    pub fn with_annotation_failure(mut self, needle: impl Into<String>) -> Self {
        self.annotations
            .push((needle.into(), Err("mock failure".to_string())));
        self
    }

    /// Response for texts no needle matches.
    pub fn with_default_annotations(mut self, response: Value) -> Self {
        self.default_annotations = Some(response);
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(Ok(answer.into()));
        self
    }

    pub fn with_answer_failure(mut self) -> Self {
        self.answer = Some(Err("mock failure".to_string()));
        self
    }

    /// Texts passed to `annotate`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnnotationClient for MockClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn annotate(&self, text: &str, _model: &str) -> Result<Value, AiError> {
        if !self.available {
            return Err(AiError::Unavailable(
                "mock client configured as unavailable".to_string(),
            ));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }

        let registered = self
            .annotations
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()));
        match registered {
            Some((_, Ok(value))) => Ok(value.clone()),
            Some((needle, Err(msg))) => Err(AiError::RequestFailed(format!("{msg} for '{needle}'"))),
            None => self
                .default_annotations
                .clone()
                .ok_or_else(|| AiError::RequestFailed("no mock response registered".to_string())),
        }
    }

    async fn ask(&self, _text: &str, _question: &str, _model: &str) -> Result<String, AiError> {
        if !self.available {
            return Err(AiError::Unavailable(
                "mock client configured as unavailable".to_string(),
            ));
        }
        match &self.answer {
            Some(Ok(answer)) => Ok(answer.clone()),
            Some(Err(msg)) => Err(AiError::RequestFailed(msg.clone())),
            None => Err(AiError::RequestFailed("no mock answer registered".to_string())),
        }
    }
}
