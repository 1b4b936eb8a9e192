#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use chess_match_client::{
    Address, ClientConfig, ContractCall, Gateway, MatchRegistryClient, NetworkConfig, Session,
    Signer, TransportError, TxHash, TxStatus,
};

pub fn registry() -> Address {
    Address::from_bytes([0xee; 32])
}

pub fn alice() -> Address {
    Address::from_bytes([0xa1; 32])
}

pub fn bob() -> Address {
    Address::from_bytes([0xb0; 32])
}

pub fn devnet() -> NetworkConfig {
    NetworkConfig::devnet(registry().to_bech32())
}

/// In-memory stand-in for a network: records signed calls, answers status
/// polls from a script and queries from canned results.
#[derive(Default)]
pub struct FakeChain {
    sent: Mutex<Vec<ContractCall>>,
    statuses: Mutex<HashMap<TxHash, VecDeque<TxStatus>>>,
    queries: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    polled: Mutex<Vec<String>>,
    next_hash: AtomicU8,
    refuse_signing: AtomicBool,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeChain::default())
    }

    pub fn sent(&self) -> Vec<ContractCall> {
        self.sent.lock().unwrap().clone()
    }

    /// Hash the next broadcast will get.
    pub fn upcoming_hash(&self) -> TxHash {
        TxHash::from_bytes([self.next_hash.load(Ordering::SeqCst) + 1; 32])
    }

    /// Statuses returned by successive polls; the last one repeats.
    pub fn script(&self, hash: TxHash, statuses: Vec<TxStatus>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(hash, statuses.into());
    }

    pub fn answer(&self, function: &str, results: Vec<Vec<u8>>) {
        self.queries
            .lock()
            .unwrap()
            .insert(function.to_string(), results);
    }

    /// Network ids seen by status polls, in order.
    pub fn polled(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    pub fn refuse_signing(&self, refuse: bool) {
        self.refuse_signing.store(refuse, Ordering::SeqCst);
    }
}

pub fn success(results: Vec<Vec<u8>>) -> TxStatus {
    TxStatus::Success { results }
}

pub fn failed(message: &str) -> TxStatus {
    TxStatus::Failed {
        message: message.to_string(),
    }
}

#[async_trait]
impl Gateway for FakeChain {
    async fn query(
        &self,
        _network: &NetworkConfig,
        contract: &Address,
        function: &str,
        _args: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, TransportError> {
        assert_eq!(*contract, registry());
        self.queries
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse {
                reason: format!("ERR_MATCH_NOT_FOUND in {function}"),
            })
    }

    async fn transaction_status(
        &self,
        network: &NetworkConfig,
        hash: &TxHash,
    ) -> Result<TxStatus, TransportError> {
        self.polled.lock().unwrap().push(network.id.clone());
        let mut statuses = self.statuses.lock().unwrap();
        let Some(queue) = statuses.get_mut(hash) else {
            return Ok(TxStatus::Pending);
        };
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap_or(TxStatus::Pending))
        }
    }
}

#[async_trait]
impl Signer for FakeChain {
    async fn sign_and_send(
        &self,
        network: &NetworkConfig,
        call: &ContractCall,
    ) -> Result<TxHash, TransportError> {
        assert_eq!(network.chain_id, "D");
        if self.refuse_signing.load(Ordering::SeqCst) {
            return Err(TransportError::SigningFailed {
                reason: "user closed the wallet".into(),
            });
        }
        self.sent.lock().unwrap().push(call.clone());
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::from_bytes([n; 32]))
    }
}

pub fn session(chain: &Arc<FakeChain>, account: Address) -> Session {
    Session::new(account, devnet(), chain.clone())
}

pub fn client(chain: &Arc<FakeChain>) -> MatchRegistryClient<Arc<FakeChain>> {
    MatchRegistryClient::new(chain.clone(), ClientConfig::single(devnet())).unwrap()
}

// ============================================================
// getMatch payloads in the contract's nested layout
// ============================================================

fn nested(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Unstaked PvP match with both seats filled.
pub fn encoded_match(id: u64, status: u8, fen_hash: [u8; 32], move_count: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&id.to_be_bytes());
    out.push(0); // PvP
    out.extend_from_slice(alice().as_bytes());
    out.push(status);
    out.push(0); // no stake token
    nested(&mut out, &[]);
    for (who, color) in [(alice(), 0u8), (bob(), 1u8)] {
        out.extend_from_slice(who.as_bytes());
        out.push(color);
        out.extend_from_slice(&1_000u64.to_be_bytes());
        out.push(0);
    }
    nested(&mut out, &fen_hash);
    out.extend_from_slice(&move_count.to_be_bytes());
    out.extend_from_slice(&[0u8; 32]);
    out.push(0);
    out.extend_from_slice(&1_000u64.to_be_bytes());
    out.extend_from_slice(&1_000u64.to_be_bytes());
    nested(&mut out, &[]);
    out
}
