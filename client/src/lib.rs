//! Off-chain client for the chess match registry contract.
//!
//! A [`Session`] names the account, the network and the signer used for a
//! call; [`MatchRegistryClient`] builds registry transactions, hands them to
//! the signer, follows their confirmation through a [`Gateway`] and exposes
//! the outcome as an [`OperationStatus`].

pub mod address;
pub mod calls;
pub mod chess;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod moves;
pub mod network;
pub mod position;
pub mod session;
pub mod status;
pub mod validator;
pub mod view;

pub use address::{shorten, Address, TxHash};
pub use calls::{ContractCall, Payment, TokenId};
pub use client::{MatchRegistryClient, PendingOperation};
pub use config::{ClientConfig, GasLimits};
pub use error::{ClientError, ErrorKind, RegistryError, TransportError};
pub use gateway::{Gateway, TxStatus};
pub use moves::{ChessMove, Square};
pub use network::NetworkConfig;
pub use position::{initial_state_hash, GameOutcome, Position};
pub use session::{Session, Signer};
pub use status::{OperationError, OperationKey, OperationStatus, OperationTracker, Outcome};
pub use validator::{
    Arbiter, LocalRulesEngine, MoveContext, MoveValidator, NoValidation, RemoteArbiter,
};
pub use view::{Decoded, MatchSummaryView, MatchView, SeatView};

pub use chess_match_registry::types::{Color, FinishPolicy, MatchMode, MatchResult, MatchStatus};
