//! Configuration management for Polystore (§4.9, §6)
//!
//! A root `Config` with `#[serde(default)]` nested sub-configs, loadable
//! from TOML or JSON, with `Config::default()` always producing a usable
//! configuration with no file or environment present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Root configuration for a Polystore deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which reference provider to construct and its system-table naming.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// CAS-loop retry budget (§4.6).
    #[serde(default)]
    pub retry: RetryConfig,

    /// Scan pagination defaults and caps (§4.8).
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML or JSON file.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::Config(format!("failed to read config file: {e}")))?;

        let config: Config = if path.as_ref().extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse TOML config: {e}")))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse JSON config: {e}")))?
        };

        Ok(config)
    }

    /// Layer environment-variable overrides onto an already-loaded config.
    /// Only the provider selection and system-table postfix are
    /// overridable this way.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(kind) = std::env::var("POLYSTORE_PROVIDER") {
            self.provider.kind = kind;
        }
        if let Ok(postfix) = std::env::var("POLYSTORE_SYSTEM_TABLE_POSTFIX") {
            self.provider.system_table_postfix = postfix;
        }
        self
    }
}

/// Selects which reference provider a `DatabaseService` factory constructs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// `"emulated"` (wide-column style, CAS loop for array conditions) or
    /// `"native"` (document-store style, fully native condition compiler).
    pub kind: String,

    /// Postfix appended to the implementation-defined system table name
    /// (§6). Clients must not assume the system table's schema; this only
    /// exists so parallel test runs don't collide.
    pub system_table_postfix: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "emulated".to_string(),
            system_table_postfix: "default".to_string(),
        }
    }
}

/// Bounded exponential back-off parameters for the post-condition emulator
/// (§4.6) and for `TransientBackendError` recovery (§7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum CAS-loop attempts before surfacing a 409 write-conflict.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay_ms: u64,
    /// Delay ceiling regardless of attempt count.
    pub max_delay_ms: u64,
    /// Fraction of the computed delay randomized as jitter, in `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 250,
            jitter_fraction: 0.2,
        }
    }
}

impl RetryConfig {
    /// Delay before the `attempt`-th retry (1-indexed), before jitter.
    #[must_use]
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        exp.min(self.max_delay_ms)
    }
}

/// Scan pagination defaults (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}
