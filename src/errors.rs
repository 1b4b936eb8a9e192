//! Error messages raised by the registry.
//!
//! The strings are part of the public interface: clients match on them to
//! tell a registry rejection apart from a transport failure.

pub const ERR_PAUSED: &str = "ERR_PAUSED";
pub const ERR_UNAUTHORIZED: &str = "ERR_UNAUTHORIZED";
pub const ERR_INVALID_ARG: &str = "ERR_INVALID_ARG";

pub const ERR_MATCH_NOT_FOUND: &str = "ERR_MATCH_NOT_FOUND";
pub const ERR_INVALID_TRANSITION: &str = "ERR_INVALID_TRANSITION";

pub const ERR_INVALID_STAKE_CONFIGURATION: &str = "ERR_INVALID_STAKE_CONFIGURATION";
pub const ERR_INSUFFICIENT_FUNDS: &str = "ERR_INSUFFICIENT_FUNDS";
pub const ERR_STAKE_MISMATCH: &str = "ERR_STAKE_MISMATCH";
pub const ERR_INVALID_STATE_HASH: &str = "ERR_INVALID_STATE_HASH";

pub const ERR_MATCH_NOT_JOINABLE: &str = "ERR_MATCH_NOT_JOINABLE";
pub const ERR_ALREADY_PARTICIPANT: &str = "ERR_ALREADY_PARTICIPANT";
pub const ERR_NOT_PARTICIPANT: &str = "ERR_NOT_PARTICIPANT";

pub const ERR_MATCH_NOT_IN_PROGRESS: &str = "ERR_MATCH_NOT_IN_PROGRESS";
pub const ERR_NOT_YOUR_TURN: &str = "ERR_NOT_YOUR_TURN";
pub const ERR_INVALID_MOVE_DATA: &str = "ERR_INVALID_MOVE_DATA";

pub const ERR_MATCH_ALREADY_FINISHED: &str = "ERR_MATCH_ALREADY_FINISHED";
pub const ERR_UNAUTHORIZED_FINISHER: &str = "ERR_UNAUTHORIZED_FINISHER";
pub const ERR_INVALID_WINNER: &str = "ERR_INVALID_WINNER";

pub const ERR_MATCH_NOT_CANCELLABLE: &str = "ERR_MATCH_NOT_CANCELLABLE";
pub const ERR_GRACE_PERIOD_ACTIVE: &str = "ERR_GRACE_PERIOD_ACTIVE";
