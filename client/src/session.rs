use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::address::{Address, TxHash};
use crate::calls::ContractCall;
use crate::error::TransportError;
use crate::network::NetworkConfig;

/// Signs a call as the session account and broadcasts it.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_and_send(
        &self,
        network: &NetworkConfig,
        call: &ContractCall,
    ) -> Result<TxHash, TransportError>;
}

/// The account, network and signer one operation runs under. Switching
/// network or account means building a new session.
#[derive(Clone)]
pub struct Session {
    pub account: Address,
    pub network: NetworkConfig,
    signer: Arc<dyn Signer>,
}

impl Session {
    pub fn new(account: Address, network: NetworkConfig, signer: Arc<dyn Signer>) -> Self {
        Session {
            account,
            network,
            signer,
        }
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    pub fn on_network(&self, network: NetworkConfig) -> Self {
        Session {
            network,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("network", &self.network.id)
            .finish_non_exhaustive()
    }
}
