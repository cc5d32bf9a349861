//! # OptiCast Core
//!
//! Core library for the OptiCast expense projection dashboard.
//! Provides input and driver types, prompt construction, the projection
//! client and its providers, reply validation, the variance bridge, terminal
//! rendering, the spreadsheet exporter, session state, configuration and credentials.

pub mod bridge;
pub mod client;
pub mod config;
pub mod credentials;
pub mod drivers;
pub mod error;
pub mod export;
pub mod inputs;
pub mod projection;
pub mod prompt;
pub mod providers;
pub mod render;
pub mod session;

// Re-export commonly used types at the crate root.
pub use bridge::{BridgeStep, StepKind, variance_bridge};
pub use client::ProjectionClient;
pub use config::{OptiCastConfig, PeriodLabels, ServiceConfig, load_config};
pub use credentials::{
    Credential, CredentialSource, CredentialStore, InMemoryCredentialStore,
    KeyringCredentialStore, resolve_credential,
};
pub use drivers::{Driver, DriverTable};
pub use error::{
    ConfigError, ExportError, FailureKind, InputError, ProjectionError,
};
pub use export::{ReportBuilder, ReportDocument, XlsxReportExporter};
pub use inputs::{Category, InputSet};
pub use projection::{CategoryRecord, KpiSummary, ProjectionResult};
pub use prompt::build_prompt;
pub use providers::{GeminiProvider, MockProjectionProvider, ProjectionProvider};
pub use render::{
    Dashboard, RenderOptions, format_currency, format_percent, format_signed_currency, render,
};
pub use session::{DownloadState, SessionContext};
