//! Transaction builders for the registry endpoints.
//!
//! Arguments are top-encoded with the MultiversX codec, the same encoding
//! the contract decodes them with, and rendered into the `fn@arg@arg` data
//! field. ESDT payments wrap the call in `ESDTTransfer`.

use multiversx_sc::codec::{top_encode_to_vec_u8, TopEncode};
use num_bigint::BigUint;

use chess_match_registry::types::{Color, MatchMode};

use crate::address::Address;
use crate::config::GasLimits;
use crate::error::ClientError;
use crate::moves::ChessMove;

pub const EGLD_TICKER: &str = "EGLD";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenId {
    Egld,
    Esdt(String),
}

impl TokenId {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ClientError::decode("token id", e))?;
        Ok(if text == EGLD_TICKER {
            TokenId::Egld
        } else {
            TokenId::Esdt(text.to_string())
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TokenId::Egld => EGLD_TICKER.as_bytes(),
            TokenId::Esdt(ticker) => ticker.as_bytes(),
        }
    }
}

/// Tokens attached to a call. Only fungible transfers are supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub token: TokenId,
    pub amount: BigUint,
}

impl Payment {
    pub fn egld(amount: impl Into<BigUint>) -> Self {
        Payment {
            token: TokenId::Egld,
            amount: amount.into(),
        }
    }

    pub fn esdt(ticker: impl Into<String>, amount: impl Into<BigUint>) -> Self {
        Payment {
            token: TokenId::Esdt(ticker.into()),
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub receiver: Address,
    pub function: String,
    pub args: Vec<Vec<u8>>,
    pub payment: Option<Payment>,
    pub gas_limit: u64,
}

impl ContractCall {
    fn new(receiver: Address, function: &str, gas_limit: u64) -> Self {
        ContractCall {
            receiver,
            function: function.to_string(),
            args: Vec::new(),
            payment: None,
            gas_limit,
        }
    }

    fn arg<T: TopEncode>(mut self, value: &T) -> Result<Self, ClientError> {
        self.args.push(top_encode(value)?);
        Ok(self)
    }

    fn raw_arg(mut self, bytes: Vec<u8>) -> Self {
        self.args.push(bytes);
        self
    }

    fn paying(mut self, payment: Option<Payment>, gas: &GasLimits) -> Self {
        if let Some(p) = payment.filter(|p| p.amount > BigUint::default()) {
            if p.token != TokenId::Egld {
                self.gas_limit += gas.esdt_transfer_extra;
            }
            self.payment = Some(p);
        }
        self
    }

    /// EGLD value of the transaction itself.
    pub fn value(&self) -> BigUint {
        match &self.payment {
            Some(Payment {
                token: TokenId::Egld,
                amount,
            }) => amount.clone(),
            _ => BigUint::default(),
        }
    }

    /// The transaction data field.
    pub fn data(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.args.len() + 3);
        match &self.payment {
            Some(Payment {
                token: TokenId::Esdt(ticker),
                amount,
            }) => {
                parts.push("ESDTTransfer".to_string());
                parts.push(hex::encode(ticker));
                parts.push(hex::encode(biguint_bytes(amount)));
                parts.push(hex::encode(&self.function));
            }
            _ => parts.push(self.function.clone()),
        }
        parts.extend(self.args.iter().map(hex::encode));
        parts.join("@")
    }
}

pub(crate) fn top_encode<T: TopEncode>(value: &T) -> Result<Vec<u8>, ClientError> {
    top_encode_to_vec_u8(value).map_err(|e| ClientError::Encode {
        reason: format!("{e:?}"),
    })
}

/// Minimal big-endian bytes; zero encodes as nothing.
pub fn biguint_bytes(amount: &BigUint) -> Vec<u8> {
    if *amount == BigUint::default() {
        Vec::new()
    } else {
        amount.to_bytes_be()
    }
}

/// Builders for every registry endpoint, bound to one deployment.
#[derive(Debug, Clone)]
pub struct RegistryCalls<'a> {
    pub registry: Address,
    pub gas: &'a GasLimits,
}

impl<'a> RegistryCalls<'a> {
    pub fn new(registry: Address, gas: &'a GasLimits) -> Self {
        RegistryCalls { registry, gas }
    }

    /// `createMatch`. The stake, when present, is attached as the payment.
    pub fn create_match(
        &self,
        mode: MatchMode,
        creator_color: Color,
        stake: Option<&Payment>,
        initial_state_hash: &[u8; 32],
    ) -> Result<ContractCall, ClientError> {
        let token: Option<Vec<u8>> = stake.map(|s| s.token.as_bytes().to_vec());
        let amount = stake.map(|s| biguint_bytes(&s.amount)).unwrap_or_default();
        Ok(
            ContractCall::new(self.registry, "createMatch", self.gas.create_match)
                .arg(&mode)?
                .arg(&creator_color)?
                .arg(&token)?
                .raw_arg(amount)
                .raw_arg(initial_state_hash.to_vec())
                .paying(stake.cloned(), self.gas),
        )
    }

    pub fn join_match(
        &self,
        match_id: u64,
        stake: Option<&Payment>,
    ) -> Result<ContractCall, ClientError> {
        Ok(
            ContractCall::new(self.registry, "joinMatch", self.gas.join_match)
                .arg(&match_id)?
                .paying(stake.cloned(), self.gas),
        )
    }

    pub fn start_match(&self, match_id: u64) -> Result<ContractCall, ClientError> {
        ContractCall::new(self.registry, "startMatch", self.gas.start_match).arg(&match_id)
    }

    pub fn submit_move(
        &self,
        match_id: u64,
        new_state_hash: &[u8; 32],
        mv: &ChessMove,
    ) -> Result<ContractCall, ClientError> {
        Ok(
            ContractCall::new(self.registry, "submitMove", self.gas.submit_move)
                .arg(&match_id)?
                .raw_arg(new_state_hash.to_vec())
                .raw_arg(mv.to_bytes().to_vec()),
        )
    }

    /// `finishMatch`; `None` reports a draw.
    pub fn finish_match(
        &self,
        match_id: u64,
        winner: Option<&Address>,
    ) -> Result<ContractCall, ClientError> {
        let winner = winner.copied().unwrap_or_else(Address::zero);
        Ok(
            ContractCall::new(self.registry, "finishMatch", self.gas.finish_match)
                .arg(&match_id)?
                .raw_arg(winner.as_bytes().to_vec()),
        )
    }

    pub fn cancel_match(&self, match_id: u64) -> Result<ContractCall, ClientError> {
        ContractCall::new(self.registry, "cancelMatch", self.gas.cancel_match).arg(&match_id)
    }
}
