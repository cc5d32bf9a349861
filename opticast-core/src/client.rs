//! The projection client: prompt in, validated projection out.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{OptiCastConfig, PeriodLabels};
use crate::credentials::Credential;
use crate::drivers::DriverTable;
use crate::error::ProjectionError;
use crate::inputs::InputSet;
use crate::projection::ProjectionResult;
use crate::prompt::build_prompt;
use crate::providers::{GeminiProvider, GenerationRequest, ProjectionProvider};

/// MIME type requested from the service so the reply is bare JSON.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Sends one projection request per call and validates the reply.
///
/// There is no retry: any failure is returned to the caller as-is.
pub struct ProjectionClient {
    provider: Arc<dyn ProjectionProvider>,
    drivers: DriverTable,
    periods: PeriodLabels,
    temperature: f64,
    max_output_tokens: u32,
}

impl ProjectionClient {
    /// Build a client on an arbitrary provider.
    pub fn with_provider(provider: Arc<dyn ProjectionProvider>, config: &OptiCastConfig) -> Self {
        Self {
            provider,
            drivers: config.drivers.clone(),
            periods: config.periods.clone(),
            temperature: config.service.temperature,
            max_output_tokens: config.service.max_output_tokens,
        }
    }

    /// Build a client talking to Gemini with an already-validated credential.
    pub fn gemini(config: &OptiCastConfig, credential: Credential) -> Result<Self, ProjectionError> {
        let provider = GeminiProvider::new(&config.service, credential)?;
        Ok(Self::with_provider(Arc::new(provider), config))
    }

    /// Build a Gemini client from a raw key, refusing empty keys before any
    /// network activity.
    pub fn connect(config: &OptiCastConfig, api_key: &str) -> Result<Self, ProjectionError> {
        let credential = Credential::new(api_key)?;
        Self::gemini(config, credential)
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Request a projection for `inputs`.
    pub async fn project(&self, inputs: &InputSet) -> Result<ProjectionResult, ProjectionError> {
        let prompt = build_prompt(inputs, &self.drivers, &self.periods);
        debug!(
            model = self.provider.model_name(),
            temperature = self.temperature,
            prompt_chars = prompt.len(),
            "Built projection prompt"
        );

        let reply = self
            .provider
            .generate(GenerationRequest {
                prompt,
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: JSON_MIME_TYPE.to_string(),
            })
            .await?;

        let result = ProjectionResult::parse(&reply.text)?;
        info!(
            model = reply.model.as_str(),
            total_prior = result.kpis().total_prior,
            total_projected = result.kpis().total_projected,
            variation_percent = result.kpis().variation_percent,
            "Projection completed"
        );
        Ok(result)
    }
}
