//! Configuration for the Ledger Core client
//!
//! Supports two configuration methods:
//! 1. Environment variables (LEDGER_URL, LEDGER_ACCESS_TOKEN, LEDGER_HSM_URL)
//! 2. A JSON config file passed to the CLI with `--config`
//!
//! The access token is held as a [`secrecy::SecretString`] and is never
//! serialized or logged.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ledger core URL environment variable name
pub const LEDGER_URL_ENV: &str = "LEDGER_URL";

/// Access token environment variable name
pub const LEDGER_ACCESS_TOKEN_ENV: &str = "LEDGER_ACCESS_TOKEN";

/// HSM signing service URL environment variable name
pub const LEDGER_HSM_URL_ENV: &str = "LEDGER_HSM_URL";

/// The core's conventional listen address
pub const DEFAULT_CORE_URL: &str = "http://localhost:1999";

fn default_page_size() -> u32 {
    100
}

/// Connection settings for the ledger core
#[derive(Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Base URL of the ledger core API
    pub url: String,
    /// Access token in `id:secret` form. Never serialized.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub access_token: Option<SecretString>,
    /// URL of the HSM signing service. Defaults to the core URL, which
    /// hosts the mock HSM.
    #[serde(default)]
    pub hsm_url: Option<String>,
}

impl CoreConfig {
    /// Resolve the HSM URL, falling back to the core itself.
    pub fn hsm_url(&self) -> &str {
        self.hsm_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CORE_URL.to_string(),
            access_token: None,
            hsm_url: None,
        }
    }
}

// Implement Debug manually to avoid exposing the token
impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("url", &self.url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("hsm_url", &self.hsm_url)
            .finish()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall request timeout (milliseconds)
    pub timeout_ms: u64,
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger core connection
    pub core: CoreConfig,
    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Default page size for list queries
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Config {
    /// Build a config from environment variables.
    ///
    /// Priority:
    /// 1. LEDGER_URL (falls back to the local core)
    /// 2. LEDGER_ACCESS_TOKEN (unauthenticated when unset)
    /// 3. LEDGER_HSM_URL (falls back to the core-hosted mock HSM)
    pub fn from_env() -> Self {
        let url = match std::env::var(LEDGER_URL_ENV) {
            Ok(url) => {
                tracing::debug!(%url, "Using LEDGER_URL for core endpoint");
                url
            }
            Err(_) => DEFAULT_CORE_URL.to_string(),
        };

        let access_token = std::env::var(LEDGER_ACCESS_TOKEN_ENV)
            .ok()
            .map(SecretString::from);
        if access_token.is_none() {
            tracing::debug!("No LEDGER_ACCESS_TOKEN set, connecting unauthenticated");
        }

        let hsm_url = std::env::var(LEDGER_HSM_URL_ENV).ok();

        Self {
            core: CoreConfig {
                url,
                access_token,
                hsm_url,
            },
            http: HttpConfig::default(),
            page_size: default_page_size(),
        }
    }

    /// Load a config from a JSON file.
    ///
    /// The access token is never written to config files; after loading,
    /// it is filled in from LEDGER_ACCESS_TOKEN when present.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config(e.to_string()))?;
        let mut config: Config =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;

        if config.core.access_token.is_none() {
            config.core.access_token = std::env::var(LEDGER_ACCESS_TOKEN_ENV)
                .ok()
                .map(SecretString::from);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate URL fields and page size.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.core.url)
            .map_err(|e| Error::Config(format!("invalid core URL {}: {}", self.core.url, e)))?;
        if let Some(hsm_url) = &self.core.hsm_url {
            url::Url::parse(hsm_url)
                .map_err(|e| Error::Config(format!("invalid HSM URL {}: {}", hsm_url, e)))?;
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            http: HttpConfig::default(),
            page_size: default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn defaults_point_at_local_core() {
        let config = Config::default();
        assert_eq!(config.core.url, DEFAULT_CORE_URL);
        assert_eq!(config.core.hsm_url(), DEFAULT_CORE_URL);
        assert!(config.core.access_token.is_none());
        assert_eq!(config.page_size, 100);
        config.validate().unwrap();
    }

    #[test]
    fn load_from_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "core": {{ "url": "http://core.internal:1999", "hsm_url": "http://signer.internal:1999" }} }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.core.url, "http://core.internal:1999");
        assert_eq!(config.core.hsm_url(), "http://signer.internal:1999");
        assert_eq!(config.http.timeout_ms, HttpConfig::default().timeout_ms);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn load_rejects_bad_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "core": {{ "url": "not a url" }} }}"#).unwrap();

        assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn token_is_never_serialized_or_debug_printed() {
        let config = Config {
            core: CoreConfig {
                url: DEFAULT_CORE_URL.to_string(),
                access_token: Some(SecretString::from("client:super-secret".to_string())),
                hsm_url: None,
            },
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));

        // The token is still available to the client
        assert_eq!(
            config.core.access_token.unwrap().expose_secret(),
            "client:super-secret"
        );
    }
}
