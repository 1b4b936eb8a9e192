use serde::{Deserialize, Serialize};

use crate::address::{Address, TxHash};

/// One chain the registry is deployed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Lookup key, e.g. "devnet".
    pub id: String,
    /// Chain id carried in signed transactions ("1", "D", "T").
    pub chain_id: String,
    pub name: String,
    pub gateway_url: String,
    pub explorer_url: String,
    /// Bech32 address of the registry contract on this network.
    pub registry_address: String,
}

impl NetworkConfig {
    pub fn mainnet(registry_address: impl Into<String>) -> Self {
        Self::builtin(
            "mainnet",
            "1",
            "MultiversX Mainnet",
            "https://gateway.multiversx.com",
            "https://explorer.multiversx.com",
            registry_address.into(),
        )
    }

    pub fn devnet(registry_address: impl Into<String>) -> Self {
        Self::builtin(
            "devnet",
            "D",
            "MultiversX Devnet",
            "https://devnet-gateway.multiversx.com",
            "https://devnet-explorer.multiversx.com",
            registry_address.into(),
        )
    }

    pub fn testnet(registry_address: impl Into<String>) -> Self {
        Self::builtin(
            "testnet",
            "T",
            "MultiversX Testnet",
            "https://testnet-gateway.multiversx.com",
            "https://testnet-explorer.multiversx.com",
            registry_address.into(),
        )
    }

    fn builtin(
        id: &str,
        chain_id: &str,
        name: &str,
        gateway_url: &str,
        explorer_url: &str,
        registry_address: String,
    ) -> Self {
        NetworkConfig {
            id: id.to_string(),
            chain_id: chain_id.to_string(),
            name: name.to_string(),
            gateway_url: gateway_url.to_string(),
            explorer_url: explorer_url.to_string(),
            registry_address,
        }
    }

    pub fn registry(&self) -> Result<Address, crate::ClientError> {
        self.registry_address.parse()
    }

    pub fn tx_url(&self, hash: &TxHash) -> String {
        format!("{}/transactions/{}", self.explorer_base(), hash.to_hex())
    }

    pub fn account_url(&self, address: &Address) -> String {
        format!("{}/accounts/{}", self.explorer_base(), address)
    }

    fn explorer_base(&self) -> &str {
        self.explorer_url.trim_end_matches('/')
    }
}
