//! Sync credentials kept in the local store.
//!
//! Stored under `bakery_config` as `{"githubToken": "...", "gistId": "..."}`,
//! the same shape the browser version writes.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{CONFIG_KEY, KeyValueStore, StoreError};

/// Accepted personal access token prefixes (classic and fine-grained).
pub const TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("token is required")]
    MissingToken,
    #[error("invalid token format: must start with \"ghp_\" or \"github_pat_\"")]
    InvalidTokenFormat,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Remote sync settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Default)]
pub struct SyncConfig {
    /// Personal access token with the `gist` scope.
    pub token: Option<SecretString>,
    /// Id of the gist holding the snapshot; created on first push when absent.
    pub gist_id: Option<String>,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("gist_id", &self.gist_id)
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfig {
    #[serde(default)]
    github_token: String,
    #[serde(default)]
    gist_id: String,
}

impl SyncConfig {
    /// Load the stored configuration. A missing entry yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or the entry is corrupt.
    pub fn load<S: KeyValueStore>(store: &S) -> Result<Self, StoreError> {
        let stored: StoredConfig = store.get_json(CONFIG_KEY)?.unwrap_or_default();
        Ok(Self {
            token: non_blank(stored.github_token).map(SecretString::from),
            gist_id: non_blank(stored.gist_id),
        })
    }

    /// Persist the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub fn save<S: KeyValueStore>(&self, store: &S) -> Result<(), StoreError> {
        let stored = StoredConfig {
            github_token: self
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_owned())
                .unwrap_or_default(),
            gist_id: self.gist_id.clone().unwrap_or_default(),
        };
        store.set_json(CONFIG_KEY, &stored)
    }

    /// Whether a token is present.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Whether a token and a gist id are both present.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.token.is_some() && self.gist_id.is_some()
    }
}

/// Check a token's shape before it is sent anywhere.
///
/// # Errors
///
/// Returns [`ConfigError::MissingToken`] for a blank token and
/// [`ConfigError::InvalidTokenFormat`] for an unknown prefix.
pub fn validate_token_format(token: &str) -> Result<SecretString, ConfigError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::MissingToken);
    }
    if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return Err(ConfigError::InvalidTokenFormat);
    }
    Ok(SecretString::from(token.to_owned()))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_validate_token_format() {
        assert!(validate_token_format("ghp_abc123").is_ok());
        assert!(validate_token_format("  github_pat_11ABC  ").is_ok());
        assert!(matches!(
            validate_token_format("   "),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            validate_token_format("gho_oauth"),
            Err(ConfigError::InvalidTokenFormat)
        ));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = MemoryStore::new();
        let config = SyncConfig::load(&store).unwrap();
        assert!(!config.has_token());
        assert!(config.gist_id.is_none());
    }

    #[test]
    fn test_save_uses_browser_shape() {
        let store = MemoryStore::new();
        let config = SyncConfig {
            token: Some(SecretString::from("ghp_secret")),
            gist_id: Some("abc".to_owned()),
        };
        config.save(&store).unwrap();

        let raw: serde_json::Value = store.get_json(CONFIG_KEY).unwrap().unwrap();
        assert_eq!(raw["githubToken"], "ghp_secret");
        assert_eq!(raw["gistId"], "abc");

        let loaded = SyncConfig::load(&store).unwrap();
        assert!(loaded.is_linked());
    }

    #[test]
    fn test_blank_gist_id_is_none() {
        let store = MemoryStore::new();
        store
            .set(CONFIG_KEY, r#"{"githubToken":"ghp_x","gistId":""}"#)
            .unwrap();
        let config = SyncConfig::load(&store).unwrap();
        assert!(config.has_token());
        assert!(!config.is_linked());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SyncConfig {
            token: Some(SecretString::from("ghp_supersecret")),
            gist_id: None,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("ghp_supersecret"));
    }
}
