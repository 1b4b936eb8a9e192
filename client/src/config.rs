use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ClientError;
use crate::network::NetworkConfig;

/// Gas limits per registry endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasLimits {
    pub create_match: u64,
    pub join_match: u64,
    pub start_match: u64,
    pub submit_move: u64,
    pub finish_match: u64,
    pub cancel_match: u64,
    /// Added on top when the call carries an ESDT transfer.
    pub esdt_transfer_extra: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        GasLimits {
            create_match: 15_000_000,
            join_match: 10_000_000,
            start_match: 6_000_000,
            submit_move: 8_000_000,
            finish_match: 12_000_000,
            cancel_match: 12_000_000,
            esdt_transfer_extra: 500_000,
        }
    }
}

/// Client configuration, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub networks: Vec<NetworkConfig>,
    pub default_network: String,
    #[serde(default)]
    pub gas_limits: GasLimits,
    /// Delay between confirmation polls. Default: 1000ms.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long to wait for a transaction to settle. Default: 60s.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_confirmation_timeout_secs() -> u64 {
    60
}

impl ClientConfig {
    /// A single-network configuration with default timings.
    pub fn single(network: NetworkConfig) -> Self {
        ClientConfig {
            default_network: network.id.clone(),
            networks: vec![network],
            gas_limits: GasLimits::default(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        let config: ClientConfig =
            serde_json::from_str(text).map_err(|e| ClientError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.networks.is_empty() {
            return Err(ClientError::config("no networks configured"));
        }
        for (i, net) in self.networks.iter().enumerate() {
            if self.networks[..i].iter().any(|other| other.id == net.id) {
                return Err(ClientError::config(format!("duplicate network id {}", net.id)));
            }
            net.registry().map_err(|e| {
                ClientError::config(format!("network {}: bad registry address: {e}", net.id))
            })?;
        }
        self.network(&self.default_network)?;
        if self.poll_interval_ms == 0 {
            return Err(ClientError::config("poll_interval_ms must be positive"));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(ClientError::config(
                "confirmation_timeout_secs must be positive",
            ));
        }
        Ok(())
    }

    /// Looks a network up by id. Unknown ids are an error, never a fallback.
    pub fn network(&self, id: &str) -> Result<&NetworkConfig, ClientError> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| ClientError::config(format!("unknown network {id}")))
    }

    pub fn default_network(&self) -> Result<&NetworkConfig, ClientError> {
        self.network(&self.default_network)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}
