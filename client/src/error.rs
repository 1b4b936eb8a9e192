use chess_match_registry::errors::*;

use crate::status::OperationKey;

/// Why the registry refused a transaction, recovered from its `ERR_*` code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("registry is paused")]
    Paused,
    #[error("caller is not allowed to do this")]
    Unauthorized,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("match not found")]
    MatchNotFound,
    #[error("status transition not allowed")]
    InvalidTransition,
    #[error("stake token and amount are inconsistent")]
    InvalidStakeConfiguration,
    #[error("payment is smaller than the stake")]
    InsufficientFunds,
    #[error("payment does not match the creator's stake")]
    StakeMismatch,
    #[error("state hash must be 32 bytes")]
    InvalidStateHash,
    #[error("match cannot be joined")]
    MatchNotJoinable,
    #[error("caller already holds a seat")]
    AlreadyParticipant,
    #[error("caller is not a participant")]
    NotParticipant,
    #[error("match is not in progress")]
    MatchNotInProgress,
    #[error("it is not the caller's turn")]
    NotYourTurn,
    #[error("move data is malformed")]
    InvalidMoveData,
    #[error("match is already over")]
    MatchAlreadyFinished,
    #[error("caller may not report the result")]
    UnauthorizedFinisher,
    #[error("winner is not a participant")]
    InvalidWinner,
    #[error("match can no longer be cancelled")]
    MatchNotCancellable,
    #[error("cancellation grace period has not elapsed")]
    GracePeriodActive,
    #[error("registry error: {0}")]
    Other(String),
}

// Longer codes first: ERR_UNAUTHORIZED is a prefix of ERR_UNAUTHORIZED_FINISHER.
fn codes() -> [(&'static str, RegistryError); 20] {
    [
        (ERR_UNAUTHORIZED_FINISHER, RegistryError::UnauthorizedFinisher),
        (ERR_INVALID_STAKE_CONFIGURATION, RegistryError::InvalidStakeConfiguration),
        (ERR_MATCH_ALREADY_FINISHED, RegistryError::MatchAlreadyFinished),
        (ERR_MATCH_NOT_CANCELLABLE, RegistryError::MatchNotCancellable),
        (ERR_MATCH_NOT_IN_PROGRESS, RegistryError::MatchNotInProgress),
        (ERR_GRACE_PERIOD_ACTIVE, RegistryError::GracePeriodActive),
        (ERR_ALREADY_PARTICIPANT, RegistryError::AlreadyParticipant),
        (ERR_INSUFFICIENT_FUNDS, RegistryError::InsufficientFunds),
        (ERR_INVALID_TRANSITION, RegistryError::InvalidTransition),
        (ERR_MATCH_NOT_JOINABLE, RegistryError::MatchNotJoinable),
        (ERR_INVALID_STATE_HASH, RegistryError::InvalidStateHash),
        (ERR_INVALID_MOVE_DATA, RegistryError::InvalidMoveData),
        (ERR_MATCH_NOT_FOUND, RegistryError::MatchNotFound),
        (ERR_NOT_PARTICIPANT, RegistryError::NotParticipant),
        (ERR_STAKE_MISMATCH, RegistryError::StakeMismatch),
        (ERR_INVALID_WINNER, RegistryError::InvalidWinner),
        (ERR_NOT_YOUR_TURN, RegistryError::NotYourTurn),
        (ERR_UNAUTHORIZED, RegistryError::Unauthorized),
        (ERR_INVALID_ARG, RegistryError::InvalidArgument),
        (ERR_PAUSED, RegistryError::Paused),
    ]
}

impl RegistryError {
    /// Maps a failed transaction's message onto a registry error. Gateways
    /// tend to wrap the contract message, so the code is searched for
    /// anywhere in the text.
    pub fn from_message(message: &str) -> Self {
        codes()
            .into_iter()
            .find(|(code, _)| message.contains(code))
            .map(|(_, err)| err)
            .unwrap_or_else(|| RegistryError::Other(message.to_string()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::MatchNotFound => ErrorKind::NotFound,
            RegistryError::Unauthorized
            | RegistryError::NotParticipant
            | RegistryError::UnauthorizedFinisher
            | RegistryError::AlreadyParticipant => ErrorKind::Authorization,
            _ => ErrorKind::Validation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("signer refused the transaction: {reason}")]
    SigningFailed { reason: String },

    #[error("gateway returned an invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("transaction {hash} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { hash: String, waited_secs: u64 },
}

/// Coarse failure classes shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Transport,
    Rejected,
    Config,
    Codec,
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("registry refused the transaction: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("move rejected before submission: {reason}")]
    Rejected { reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("cannot decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("cannot encode call argument: {reason}")]
    Encode { reason: String },

    #[error("no Chess960 start position {index} (expected 0..960)")]
    InvalidStartPosition { index: u16 },

    #[error("an operation on {key} is still awaiting confirmation")]
    OperationInFlight { key: OperationKey },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Registry(err) => err.kind(),
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Rejected { .. } => ErrorKind::Rejected,
            ClientError::InvalidStartPosition { .. } => ErrorKind::Validation,
            ClientError::Config { .. } => ErrorKind::Config,
            ClientError::Decode { .. } | ClientError::Encode { .. } => ErrorKind::Codec,
            ClientError::OperationInFlight { .. } => ErrorKind::Busy,
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        ClientError::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        ClientError::Decode {
            what,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_variants() {
        assert_eq!(
            RegistryError::from_message("ERR_NOT_YOUR_TURN"),
            RegistryError::NotYourTurn
        );
        assert_eq!(
            RegistryError::from_message("execution failed: ERR_UNAUTHORIZED_FINISHER"),
            RegistryError::UnauthorizedFinisher
        );
        assert_eq!(
            RegistryError::from_message("ERR_UNAUTHORIZED"),
            RegistryError::Unauthorized
        );
        assert_eq!(
            RegistryError::from_message("out of gas"),
            RegistryError::Other("out of gas".into())
        );
    }

    #[test]
    fn every_contract_code_is_known() {
        for (code, _) in codes() {
            assert!(!matches!(
                RegistryError::from_message(code),
                RegistryError::Other(_)
            ));
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(RegistryError::MatchNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(RegistryError::NotYourTurn.kind(), ErrorKind::Validation);
        assert_eq!(RegistryError::MatchNotJoinable.kind(), ErrorKind::Validation);
        assert_eq!(RegistryError::NotParticipant.kind(), ErrorKind::Authorization);
        assert_eq!(RegistryError::StakeMismatch.kind(), ErrorKind::Validation);
        let err = ClientError::from(TransportError::Unreachable {
            reason: "dns".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(
            err.to_string(),
            "network unreachable: dns"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
