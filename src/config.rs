//! Configuration Module
//!
//! This module defines all configuration structures for the coordinator and
//! the sandbox engine. Configuration is loaded from TOML files and parsed
//! using serde. Every section has defaults, so a partial file is enough.

use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [validation]
/// max_delay_ms = 86400000
/// future_gap_ms = 300000
///
/// [mst]
/// expiration_ms = 300000
///
/// [api]
/// host = "127.0.0.1"
/// port = 8545
///
/// [torii]
/// address = "http://127.0.0.1:50051"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub mst: MstConfig,
    pub api: ApiConfig,
    pub torii: ToriiConfig,
    pub genesis: GenesisConfig,
    pub log: LogConfig,
}

/// Field validation limits
///
/// The client applies the same limits as the engine so that malformed
/// transactions fail before a network round trip.
///
/// # Fields
/// - `max_delay_ms`: How old `created_time` may be (default 24h)
/// - `future_gap_ms`: How far in the future `created_time` may be (default 5 min)
/// - `max_quorum`: Largest accepted quorum value
/// - `max_batch_size`: Largest accepted number of transactions in one batch
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_delay_ms: u64,
    pub future_gap_ms: u64,
    pub max_quorum: u32,
    pub max_batch_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: 24 * 60 * 60 * 1000,
            future_gap_ms: 5 * 60 * 1000,
            max_quorum: 128,
            max_batch_size: 100,
        }
    }
}

/// Multi-signature pending pool settings (sandbox engine)
///
/// # Fields
/// - `expiration_ms`: Pending batches older than this are dropped with MST_EXPIRED
/// - `sweep_interval_ms`: How often the background sweeper runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MstConfig {
    pub expiration_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for MstConfig {
    fn default() -> Self {
        Self {
            expiration_ms: 5 * 60 * 1000,
            sweep_interval_ms: 1000,
        }
    }
}

/// JSON-RPC server configuration
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8545)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8545,
        }
    }
}

/// Remote engine endpoint
///
/// # Fields
/// - `address`: gRPC endpoint of the engine's command and query services
/// - `connect_timeout_ms`: Connection establishment timeout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToriiConfig {
    pub address: String,
    pub connect_timeout_ms: u64,
}

impl Default for ToriiConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:50051".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

/// Initial world state of the sandbox engine
///
/// # Fields
/// - `domain_id`: Domain created at genesis
/// - `default_role`: Role assigned to accounts of that domain
/// - `admin_account_name`: Name of the admin account created in that domain
/// - `admin_public_key`: Hex public key of the admin; a key is generated when empty
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub domain_id: String,
    pub default_role: String,
    pub admin_account_name: String,
    pub admin_public_key: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            domain_id: "test".to_string(),
            default_role: "user".to_string(),
            admin_account_name: "admin".to_string(),
            admin_public_key: String::new(),
        }
    }
}

/// Logging configuration
///
/// # Fields
/// - `filter`: `tracing_subscriber::EnvFilter` directive (e.g. "info,batch_coordinator=debug")
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        // Read the file contents as a string
        let content = fs::read_to_string(path)?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.validation.max_quorum, 128);
        assert_eq!(config.validation.max_delay_ms, 86_400_000);
        assert_eq!(config.mst.expiration_ms, 300_000);
        assert_eq!(config.api.port, 8545);
        assert_eq!(config.genesis.domain_id, "test");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [mst]
            expiration_ms = 1000

            [api]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.mst.expiration_ms, 1000);
        assert_eq!(config.mst.sweep_interval_ms, 1000);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[api\nport = ").is_err());
    }
}
