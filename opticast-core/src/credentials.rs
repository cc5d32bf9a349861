//! Credential handling for the projection service API key.
//!
//! Provides a trait-based abstraction over credential storage with two implementations:
//! - `KeyringCredentialStore`: Uses the OS-native credential store (macOS Keychain,
//!   Windows Credential Manager, Linux Secret Service).
//! - `InMemoryCredentialStore`: In-memory store for testing.
//!
//! Lookup precedence is deployment secrets first (credential store, then the
//! configured environment variable), then whatever the operator enters manually.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::ServiceConfig;
use crate::error::ProjectionError;

/// Errors from credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential not found for {service}:{account}")]
    NotFound { service: String, account: String },

    #[error("Failed to store credential: {message}")]
    StoreFailed { message: String },

    #[error("Failed to delete credential: {message}")]
    DeleteFailed { message: String },

    #[error("Keyring backend not available: {message}")]
    BackendUnavailable { message: String },
}

/// A non-empty API key. The only way to obtain one is through [`Credential::new`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Result<Self, ProjectionError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ProjectionError::MissingCredential {
                hint: "the API key is empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    CredentialStore,
    Environment,
    Manual,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::CredentialStore => write!(f, "OS credential store"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Manual => write!(f, "manual entry"),
        }
    }
}

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store an API key for the given provider.
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError>;

    /// Retrieve the API key for the given provider.
    fn get_key(&self, provider: &str) -> Result<String, CredentialError>;

    /// Delete the API key for the given provider.
    fn delete_key(&self, provider: &str) -> Result<(), CredentialError>;

    /// Check whether a key exists for the given provider.
    fn has_key(&self, provider: &str) -> bool {
        self.get_key(provider).is_ok()
    }
}

/// OS-native credential store using the `keyring` crate.
///
/// Stores credentials under service `"opticast"` with account names
/// formatted as `"provider:{name}"`.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: "opticast".to_string(),
        }
    }

    /// Format the account name for a given provider.
    pub fn account_name(provider: &str) -> String {
        format!("provider:{provider}")
    }

    fn entry(&self, provider: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &Self::account_name(provider)).map_err(|e| {
            CredentialError::BackendUnavailable {
                message: e.to_string(),
            }
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError> {
        self.entry(provider)?
            .set_password(api_key)
            .map_err(|e| CredentialError::StoreFailed {
                message: e.to_string(),
            })
    }

    fn get_key(&self, provider: &str) -> Result<String, CredentialError> {
        self.entry(provider)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => CredentialError::NotFound {
                service: self.service.clone(),
                account: Self::account_name(provider),
            },
            other => CredentialError::StoreFailed {
                message: other.to_string(),
            },
        })
    }

    fn delete_key(&self, provider: &str) -> Result<(), CredentialError> {
        self.entry(provider)?
            .delete_credential()
            .map_err(|e| CredentialError::DeleteFailed {
                message: e.to_string(),
            })
    }
}

/// In-memory credential store for testing.
pub struct InMemoryCredentialStore {
    store: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError> {
        let account = KeyringCredentialStore::account_name(provider);
        self.store
            .lock()
            .unwrap()
            .insert(account, api_key.to_string());
        Ok(())
    }

    fn get_key(&self, provider: &str) -> Result<String, CredentialError> {
        let account = KeyringCredentialStore::account_name(provider);
        self.store
            .lock()
            .unwrap()
            .get(&account)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                service: "opticast".to_string(),
                account,
            })
    }

    fn delete_key(&self, provider: &str) -> Result<(), CredentialError> {
        let account = KeyringCredentialStore::account_name(provider);
        self.store.lock().unwrap().remove(&account);
        Ok(())
    }
}

/// Look up a deployment-level credential: the credential store first, then the
/// configured environment variable. Empty values are skipped.
///
/// Returns `None` when neither source has a key; the caller may then fall back
/// to manual entry.
pub fn resolve_deployment_credential(
    config: &ServiceConfig,
    store: &dyn CredentialStore,
) -> Option<(Credential, CredentialSource)> {
    match store.get_key(&config.credential_store_key) {
        Ok(key) => {
            if let Ok(credential) = Credential::new(key) {
                return Some((credential, CredentialSource::CredentialStore));
            }
        }
        Err(e) => tracing::debug!(error = %e, "No API key in credential store"),
    }

    std::env::var(&config.api_key_env)
        .ok()
        .and_then(|key| Credential::new(key).ok())
        .map(|credential| (credential, CredentialSource::Environment))
}

/// Resolve the credential, falling back to `manual` (an `--api-key` flag or an
/// interactive entry) only when no deployment-level secret exists.
pub fn resolve_credential(
    config: &ServiceConfig,
    store: &dyn CredentialStore,
    manual: Option<&str>,
) -> Result<(Credential, CredentialSource), ProjectionError> {
    if let Some(found) = resolve_deployment_credential(config, store) {
        return Ok(found);
    }
    match manual {
        Some(value) => Credential::new(value).map(|c| (c, CredentialSource::Manual)),
        None => Err(ProjectionError::MissingCredential {
            hint: format!(
                "set {} or run `opticast auth login`",
                config.api_key_env
            ),
        }),
    }
}
