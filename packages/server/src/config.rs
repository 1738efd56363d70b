//! Node configuration, populated from environment variables.

use std::net::SocketAddr;

use eth2api::types::Timestamp;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Runtime configuration for the reference node.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a node can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `ETH2API_BIND` | `127.0.0.1:5052` | TCP socket address to listen on |
/// | `ETH2API_GENESIS_TIME` | `1606824023` | Genesis time reported by `/eth/v1/beacon/genesis` |
/// | `ETH2API_SYNCING` | `false` | Start in syncing mode (health 206, block production 503) |
/// | `ETH2API_NODE_VERSION` | `eth2api/<crate version>` | String reported by `/eth/v1/node/version` |
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    pub genesis_time: Timestamp,

    /// Whether the node reports itself as syncing at startup.
    pub syncing: bool,

    pub node_version: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5052)),
            genesis_time: Timestamp(1606824023),
            syncing: false,
            node_version: concat!("eth2api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NodeConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`NodeConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("ETH2API_BIND") {
            config.bind_addr = value.parse().map_err(|_| ConfigError {
                var: "ETH2API_BIND",
                expected: "a socket address (e.g. 127.0.0.1:5052)",
                value,
            })?;
        }
        if let Some(value) = lookup("ETH2API_GENESIS_TIME") {
            config.genesis_time = value.parse().map_err(|_| ConfigError {
                var: "ETH2API_GENESIS_TIME",
                expected: "unix seconds",
                value,
            })?;
        }
        if let Some(value) = lookup("ETH2API_SYNCING") {
            config.syncing = match value.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(ConfigError {
                        var: "ETH2API_SYNCING",
                        expected: "true or false",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("ETH2API_NODE_VERSION") {
            config.node_version = value;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 5052);
        assert!(!config.syncing);
        assert!(config.node_version.starts_with("eth2api/"));
    }

    #[test]
    fn values_are_read() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("ETH2API_BIND", "0.0.0.0:9000"),
            ("ETH2API_GENESIS_TIME", "42"),
            ("ETH2API_SYNCING", "true"),
            ("ETH2API_NODE_VERSION", "test/1"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.genesis_time, Timestamp(42));
        assert!(config.syncing);
        assert_eq!(config.node_version, "test/1");
    }

    #[test]
    fn bad_values_are_errors() {
        let err = NodeConfig::from_lookup(lookup(&[("ETH2API_BIND", "nowhere")])).unwrap_err();
        assert_eq!(err.var, "ETH2API_BIND");
        let err = NodeConfig::from_lookup(lookup(&[("ETH2API_SYNCING", "maybe")])).unwrap_err();
        assert_eq!(err.var, "ETH2API_SYNCING");
    }
}
