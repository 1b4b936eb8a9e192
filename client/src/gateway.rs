use async_trait::async_trait;

use crate::address::{Address, TxHash};
use crate::error::TransportError;
use crate::network::NetworkConfig;

/// Where a broadcast transaction stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Not yet executed, or executed but not final.
    Pending,
    /// Executed. `results` holds the call's top-encoded return values.
    Success { results: Vec<Vec<u8>> },
    /// Executed and reverted. `message` carries the contract error, if any.
    Failed { message: String },
}

/// Read access to a network: contract queries and transaction status.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Runs a view function and returns its raw (top-encoded) results.
    async fn query(
        &self,
        network: &NetworkConfig,
        contract: &Address,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, TransportError>;

    async fn transaction_status(
        &self,
        network: &NetworkConfig,
        hash: &TxHash,
    ) -> Result<TxStatus, TransportError>;
}

#[async_trait]
impl<T: Gateway + ?Sized> Gateway for std::sync::Arc<T> {
    async fn query(
        &self,
        network: &NetworkConfig,
        contract: &Address,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, TransportError> {
        (**self).query(network, contract, function, args).await
    }

    async fn transaction_status(
        &self,
        network: &NetworkConfig,
        hash: &TxHash,
    ) -> Result<TxStatus, TransportError> {
        (**self).transaction_status(network, hash).await
    }
}
