//! Error types for the OptiCast core library.
//!
//! Uses `thiserror` for public API error types. Projection failures are split
//! into configuration, transport and parse classes (see [`FailureKind`]) so
//! callers can branch without inspecting message text. Export failures live in
//! their own type and never mix with projection failures.

use std::path::PathBuf;

/// Broad class of a projection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Blocked locally before any network activity.
    Configuration,
    /// The remote call failed or the service rejected it.
    Transport,
    /// The service answered but the reply is not a usable projection.
    Parse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Configuration => write!(f, "configuration"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Parse => write!(f, "parse"),
        }
    }
}

/// Errors from a projection request.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("No API credential available: {hint}")]
    MissingCredential { hint: String },

    #[error("Invalid service configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Request to projection service failed: {message}")]
    Transport { message: String },

    #[error("Projection service rejected the credential (HTTP {status}): {message}")]
    AuthRejected { status: u16, message: String },

    #[error("Projection service quota exhausted: {message}")]
    QuotaExceeded { message: String },

    #[error("Projection service timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Projection service unavailable (HTTP {status}): {message}")]
    ServiceUnavailable { status: u16, message: String },

    #[error("Malformed projection response: {reason}")]
    MalformedResponse { reason: String, preview: String },
}

impl ProjectionError {
    /// The failure class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProjectionError::MissingCredential { .. } | ProjectionError::InvalidConfig { .. } => {
                FailureKind::Configuration
            }
            ProjectionError::Transport { .. }
            | ProjectionError::AuthRejected { .. }
            | ProjectionError::QuotaExceeded { .. }
            | ProjectionError::Timeout { .. }
            | ProjectionError::ServiceUnavailable { .. } => FailureKind::Transport,
            ProjectionError::MalformedResponse { .. } => FailureKind::Parse,
        }
    }

    /// Build a `MalformedResponse`, keeping a short preview of the offending text.
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        const PREVIEW_CHARS: usize = 200;
        let preview: String = raw.chars().take(PREVIEW_CHARS).collect();
        ProjectionError::MalformedResponse {
            reason: reason.into(),
            preview,
        }
    }
}

/// Errors from building the spreadsheet report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to build sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },

    #[error("Failed to serialize workbook: {message}")]
    Serialize { message: String },
}

impl ExportError {
    /// What most likely went wrong, phrased for the operator.
    pub fn likely_cause(&self) -> &'static str {
        match self {
            ExportError::Sheet { .. } => {
                "A projected value or the analysis text does not fit in a spreadsheet cell \
                 (for example, text longer than 32,767 characters)."
            }
            ExportError::Serialize { .. } => {
                "The workbook could not be packaged in memory; the system may be low on memory."
            }
        }
    }
}

/// Errors from operator-supplied amounts.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Amount for {category} must not be negative (got {value})")]
    Negative { category: String, value: f64 },

    #[error("Amount for {category} must be a finite number")]
    NotFinite { category: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}
