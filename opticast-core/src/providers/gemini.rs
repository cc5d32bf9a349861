//! Google Gemini API provider implementation.
//!
//! Implements `ProjectionProvider` on top of the `generateContent` endpoint.
//! Authentication uses the `?key=API_KEY` query parameter; the key is never
//! written to logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{GenerationRequest, GenerationResponse, ProjectionProvider};
use crate::config::ServiceConfig;
use crate::credentials::Credential;
use crate::error::ProjectionError;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    credential: Credential,
    model: String,
    timeout_secs: u64,
}

impl GeminiProvider {
    /// Create a provider from the service configuration and a resolved credential.
    pub fn new(config: &ServiceConfig, credential: Credential) -> Result<Self, ProjectionError> {
        if config.model.trim().is_empty() {
            return Err(ProjectionError::InvalidConfig {
                message: "service.model is empty".to_string(),
            });
        }
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProjectionError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            credential,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build the JSON request body for the Gemini API.
    fn build_request_body(request: &GenerationRequest) -> Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}],
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "responseMimeType": request.response_mime_type,
                "maxOutputTokens": request.max_output_tokens,
            },
        })
    }

    /// Build the endpoint URL without the key; it is attached as a query parameter.
    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Parse a Gemini API response JSON into a `GenerationResponse`.
    fn parse_response(body: &Value, raw: &str) -> Result<GenerationResponse, ProjectionError> {
        let candidates = body["candidates"].as_array();
        let Some(candidate) = candidates.and_then(|c| c.first()) else {
            let reason = match body["promptFeedback"]["blockReason"].as_str() {
                Some(block) => format!("no candidates in response (prompt blocked: {block})"),
                None => "no candidates in response".to_string(),
            };
            return Err(ProjectionError::malformed(reason, raw));
        };

        let finish_reason = candidate["finishReason"].as_str().map(|s| s.to_string());
        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            let reason = match &finish_reason {
                Some(finish) => format!("candidate has no content parts (finish reason: {finish})"),
                None => "candidate has no content parts".to_string(),
            };
            ProjectionError::malformed(reason, raw)
        })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if text.trim().is_empty() {
            return Err(ProjectionError::malformed("candidate text is empty", raw));
        }

        let model = body["modelVersion"]
            .as_str()
            .unwrap_or("gemini")
            .to_string();

        Ok(GenerationResponse {
            text,
            model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate `ProjectionError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> ProjectionError {
        let message = Self::error_message(body_text);
        match status.as_u16() {
            401 | 403 => ProjectionError::AuthRejected {
                status: status.as_u16(),
                message,
            },
            // Gemini reports a bad key as 400 INVALID_ARGUMENT.
            400 if Self::is_invalid_key(body_text, &message) => ProjectionError::AuthRejected {
                status: 400,
                message,
            },
            429 => ProjectionError::QuotaExceeded { message },
            404 => ProjectionError::ServiceUnavailable {
                status: 404,
                message: format!("model not available: {message}"),
            },
            code if status.is_server_error() => ProjectionError::ServiceUnavailable {
                status: code,
                message,
            },
            _ => ProjectionError::Transport {
                message: format!("HTTP {} from Gemini API: {}", status, message),
            },
        }
    }

    fn is_invalid_key(body_text: &str, message: &str) -> bool {
        body_text.contains("API_KEY_INVALID") || message.contains("API key not valid")
    }

    /// Extract `error.message` from a Gemini error body, falling back to the raw text.
    fn error_message(body_text: &str) -> String {
        serde_json::from_str::<Value>(body_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| body_text.chars().take(200).collect())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProjectionError {
        if e.is_timeout() {
            ProjectionError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            // reqwest errors include the URL, which carries the key.
            ProjectionError::Transport {
                message: format!(
                    "Request to Gemini API failed: {}",
                    e.without_url()
                ),
            }
        }
    }
}

#[async_trait]
impl ProjectionProvider for GeminiProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProjectionError> {
        let body = Self::build_request_body(&request);
        let url = self.endpoint_url();

        debug!(
            model = self.model.as_str(),
            url = url.as_str(),
            prompt_chars = request.prompt.len(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.credential.expose())])
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value = serde_json::from_str(&body_text).map_err(|e| {
            ProjectionError::malformed(format!("Invalid JSON in response: {}", e), &body_text)
        })?;

        Self::parse_response(&response_json, &body_text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
