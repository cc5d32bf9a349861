//! Configuration system for OptiCast.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Configuration is loaded from the user config directory (`opticast/config.toml`)
//! and/or `.opticast/config.toml` in the workspace directory. CLI flags are
//! applied on top by the binary.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::drivers::DriverTable;
use crate::error::ConfigError;
use crate::inputs::InputSet;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptiCastConfig {
    pub service: ServiceConfig,
    pub inputs: InputDefaults,
    pub periods: PeriodLabels,
    pub report: ReportConfig,
    pub ui: UiConfig,
    pub drivers: DriverTable,
}

/// Projection service (Gemini) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Model identifier, e.g. "gemini-1.5-flash".
    pub model: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Account name in the OS credential store.
    pub credential_store_key: String,
    /// Sampling temperature. Kept low for numeric stability.
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            credential_store_key: "gemini".to_string(),
            temperature: 0.2,
            max_output_tokens: 2048,
            timeout_secs: 120,
        }
    }
}

impl ServiceConfig {
    /// Validate this service config and return any warnings.
    ///
    /// Returns an empty Vec if the config is sound. Warnings do not block a run.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=1.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature ({}) is outside 0.0–1.0; projections may vary between runs",
                self.temperature
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; requests will fail immediately".to_string());
        }
        if self.model.trim().is_empty() {
            warnings.push("model is empty".to_string());
        }
        warnings
    }
}

/// Default amounts offered to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDefaults {
    pub contractors: f64,
    pub labor: f64,
    pub fuel: f64,
    pub power: f64,
    pub maintenance: f64,
    /// Increment hint shown next to interactive prompts.
    pub step: f64,
}

impl Default for InputDefaults {
    fn default() -> Self {
        Self {
            contractors: 250_000.0,
            labor: 180_000.0,
            fuel: 85_000.0,
            power: 120_000.0,
            maintenance: 60_000.0,
            step: 1_000.0,
        }
    }
}

impl InputDefaults {
    /// The defaults as a validated input set.
    pub fn to_input_set(&self) -> Result<InputSet, ConfigError> {
        InputSet::new(
            self.contractors,
            self.labor,
            self.fuel,
            self.power,
            self.maintenance,
        )
        .map_err(|e| ConfigError::Invalid {
            message: format!("inputs: {e}"),
        })
    }
}

/// Labels for the prior (actual) and projected periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabels {
    pub prior: String,
    pub projected: String,
}

impl Default for PeriodLabels {
    fn default() -> Self {
        Self {
            prior: "2025".to_string(),
            projected: "2026".to_string(),
        }
    }
}

/// Spreadsheet report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: String,
    /// Directory the CLI saves downloaded reports into.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "OptiCast Mining - Financial Projection Report".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Terminal rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Width in columns used for charts, tables and wrapped text.
    pub width: usize,
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            width: 100,
            color: true,
        }
    }
}

/// Prefix of environment overrides (`OPTICAST_SERVICE__MODEL`, ...).
pub const ENV_PREFIX: &str = "OPTICAST_";

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `OPTICAST_`)
/// 2. Explicit config file (`--config`), which must exist
/// 3. Workspace-local config (`.opticast/config.toml`)
/// 4. User config (`<config dir>/opticast/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<OptiCastConfig, ConfigError> {
    let user_config = user_config_path();
    load_layered(user_config.as_deref(), workspace, explicit, ENV_PREFIX)
}

/// [`load_config`] with the user config file and the environment prefix given
/// explicitly.
fn load_layered(
    user_config: Option<&Path>,
    workspace: Option<&Path>,
    explicit: Option<&Path>,
    env_prefix: &str,
) -> Result<OptiCastConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(OptiCastConfig::default()));

    if let Some(user_config) = user_config
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Nested keys use `__`: OPTICAST_SERVICE__MODEL, OPTICAST_UI__WIDTH.
    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    let config: OptiCastConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.drivers.check()?;
    Ok(config)
}

/// `<config dir>/opticast/config.toml`, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "opticast", "opticast")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `<workspace>/.opticast/config.toml`.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".opticast").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Category;

    #[test]
    fn test_default_config() {
        let config = OptiCastConfig::default();
        assert_eq!(config.service.model, "gemini-1.5-flash");
        assert_eq!(config.service.api_key_env, "GEMINI_API_KEY");
        assert!((config.service.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.periods.prior, "2025");
        assert_eq!(config.periods.projected, "2026");
        assert_eq!(config.drivers.len(), 5);
    }

    #[test]
    fn test_input_defaults() {
        let inputs = InputDefaults::default().to_input_set().unwrap();
        assert_eq!(inputs.get(Category::Contractors), 250_000.0);
        assert_eq!(inputs.get(Category::Maintenance), 60_000.0);
        assert_eq!(InputDefaults::default().step, 1_000.0);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = OptiCastConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let back: OptiCastConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.service.model, config.service.model);
        assert_eq!(back.drivers, config.drivers);
        assert_eq!(back.periods, config.periods);
    }

    /// Loads with no user config and an environment prefix no other test uses.
    fn load_isolated(
        workspace: Option<&Path>,
        explicit: Option<&Path>,
        env_prefix: &str,
    ) -> Result<OptiCastConfig, ConfigError> {
        load_layered(None, workspace, explicit, env_prefix)
    }

    #[test]
    fn test_load_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_isolated(Some(dir.path()), None, "OPTICAST_TEST_DEFAULTS_").unwrap();
        assert_eq!(config.service.timeout_secs, 120);
        assert_eq!(config.service.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_env_overrides_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".opticast");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[service]\nmodel = \"gemini-2.0-flash\"\n",
        )
        .unwrap();

        let prefix = "OPTICAST_TEST_ENVLAYER_";
        // SAFETY: test-only env vars under a prefix unique to this test
        unsafe {
            std::env::set_var("OPTICAST_TEST_ENVLAYER_SERVICE__MODEL", "gemini-1.5-pro");
            std::env::set_var("OPTICAST_TEST_ENVLAYER_UI__WIDTH", "72");
        }
        let config = load_isolated(Some(dir.path()), None, prefix);
        // SAFETY: test-only env vars under a prefix unique to this test
        unsafe {
            std::env::remove_var("OPTICAST_TEST_ENVLAYER_SERVICE__MODEL");
            std::env::remove_var("OPTICAST_TEST_ENVLAYER_UI__WIDTH");
        }

        let config = config.unwrap();
        assert_eq!(config.service.model, "gemini-1.5-pro");
        assert_eq!(config.ui.width, 72);
        assert_eq!(config.service.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_user_config_is_lowest_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "[ui]\nwidth = 60\n\n[report]\ntitle = \"Mine A\"\n").unwrap();
        let cfg_dir = dir.path().join(".opticast");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[ui]\nwidth = 90\n").unwrap();

        let config =
            load_layered(Some(&user), Some(dir.path()), None, "OPTICAST_TEST_USERLAYER_").unwrap();
        assert_eq!(config.ui.width, 90);
        assert_eq!(config.report.title, "Mine A");
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".opticast");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            r#"
[service]
model = "gemini-2.0-flash"
temperature = 0.1

[periods]
prior = "FY25"
projected = "FY26"
"#,
        )
        .unwrap();

        let config = load_isolated(Some(dir.path()), None, "OPTICAST_TEST_WORKSPACE_").unwrap();
        assert_eq!(config.service.model, "gemini-2.0-flash");
        assert!((config.service.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.service.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.periods.prior, "FY25");
    }

    #[test]
    fn test_load_config_rejects_incomplete_driver_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[[drivers]]
category = "Fuel"
adjustment_percent = 5.0
justification = "Production increase"
"#,
        )
        .unwrap();

        let err = load_isolated(None, Some(&path), "OPTICAST_TEST_DRIVERS_").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let err = load_config(None, Some(Path::new("/nonexistent/opticast.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_service_validate() {
        assert!(ServiceConfig::default().validate().is_empty());

        let config = ServiceConfig {
            temperature: 1.5,
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().len(), 2);
    }
}
