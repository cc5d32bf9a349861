//! Projection service providers.
//!
//! `ProjectionProvider` is the seam between the projection client and the
//! remote model. `GeminiProvider` talks to the Google Gemini API;
//! `MockProjectionProvider` replays queued replies for tests.

pub mod gemini;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ProjectionError;

pub use gemini::GeminiProvider;

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// MIME type the reply must use, e.g. `application/json`.
    pub response_mime_type: String,
}

/// The raw text reply of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Trait for projection service backends.
#[async_trait]
pub trait ProjectionProvider: Send + Sync {
    /// Perform exactly one generation call.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProjectionError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// A mock provider for testing.
///
/// Replies are returned in the order they were queued. When the queue is
/// empty the provider answers with a transport error.
pub struct MockProjectionProvider {
    model: String,
    replies: Mutex<Vec<Result<String, ProjectionError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl MockProjectionProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that answers the next call with `text`.
    pub fn with_reply(text: &str) -> Self {
        let provider = Self::new();
        provider.queue_reply(text);
        provider
    }

    /// Create a mock whose next call fails with `error`.
    pub fn with_error(error: ProjectionError) -> Self {
        let provider = Self::new();
        provider.queue_error(error);
        provider
    }

    pub fn queue_reply(&self, text: &str) {
        self.replies.lock().unwrap().push(Ok(text.to_string()));
    }

    pub fn queue_error(&self, error: ProjectionError) {
        self.replies.lock().unwrap().push(Err(error));
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProjectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectionProvider for MockProjectionProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProjectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let next = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                None
            } else {
                Some(replies.remove(0))
            }
        };
        match next {
            Some(Ok(text)) => Ok(GenerationResponse {
                text,
                model: self.model.clone(),
                finish_reason: Some("STOP".to_string()),
            }),
            Some(Err(e)) => Err(e),
            None => Err(ProjectionError::Transport {
                message: "mock provider has no queued replies".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
