//! Non-projection subcommands: configuration and API key management.

use std::path::{Path, PathBuf};

use dialoguer::Password;
use opticast_core::config::{OptiCastConfig, load_config, workspace_config_path};
use opticast_core::credentials::{
    Credential, CredentialStore, KeyringCredentialStore, resolve_deployment_credential,
};

use crate::{AuthAction, ConfigAction};

pub fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let (path, created) = init_config(workspace)?;
            if created {
                println!("Created default configuration at: {}", path.display());
            } else {
                println!("Configuration file already exists at: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", show_config(workspace, config_path)?);
            Ok(())
        }
    }
}

/// Write the default configuration unless one already exists.
/// Returns the path and whether it was created.
pub fn init_config(workspace: &Path) -> anyhow::Result<(PathBuf, bool)> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        return Ok((config_path, false));
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(&OptiCastConfig::default())?;
    std::fs::write(&config_path, &toml_str)?;
    Ok((config_path, true))
}

/// The effective configuration as TOML.
pub fn show_config(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<String> {
    let config = load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    Ok(toml::to_string_pretty(&config)?)
}

pub fn handle_auth(
    action: AuthAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let store = KeyringCredentialStore::new();
    let key_name = &config.service.credential_store_key;

    match action {
        AuthAction::Login => {
            let entered = Password::new()
                .with_prompt(format!("API key for {}", key_name))
                .interact()?;
            store_api_key(&store, key_name, &entered)?;
            println!("API key stored in the OS credential store.");
        }
        AuthAction::Logout => {
            if !store.has_key(key_name) {
                println!("No stored API key for {}.", key_name);
                return Ok(());
            }
            store
                .delete_key(key_name)
                .map_err(|e| anyhow::anyhow!("Failed to remove API key: {}", e))?;
            println!("Removed stored API key for {}.", key_name);
        }
        AuthAction::Status => {
            println!("{}", auth_status(&config, &store));
        }
    }
    Ok(())
}

/// Validate and store an API key under `key_name`.
pub fn store_api_key(store: &dyn CredentialStore, key_name: &str, raw: &str) -> anyhow::Result<()> {
    let credential = Credential::new(raw).map_err(|e| anyhow::anyhow!("{}", e))?;
    store
        .store_key(key_name, credential.expose())
        .map_err(|e| anyhow::anyhow!("Failed to store API key: {}", e))
}

/// Which deployment source would supply the key. Never prints the key itself.
pub fn auth_status(config: &OptiCastConfig, store: &dyn CredentialStore) -> String {
    match resolve_deployment_credential(&config.service, store) {
        Some((_, source)) => format!("API key: available ({})", source),
        None => format!(
            "API key: not configured (set {} or run `opticast auth login`)",
            config.service.api_key_env
        ),
    }
}
