use std::fmt;

use crate::address::TxHash;
use crate::error::{ClientError, ErrorKind};

/// What an operation acts on. At most one unconfirmed operation exists per
/// key and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKey {
    Create,
    Match(u64),
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::Create => f.write_str("match creation"),
            OperationKey::Match(id) => write!(f, "match {id}"),
        }
    }
}

/// Final or current result of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Succeeded,
    Failed { kind: ErrorKind, reason: String },
}

impl Outcome {
    pub fn from_error(err: &ClientError) -> Self {
        Outcome::Failed {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// Why an operation failed, as recorded for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub kind: ErrorKind,
    pub reason: String,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Flat status record for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    /// Waiting for the signer.
    pub pending: bool,
    /// Broadcast, waiting for execution.
    pub confirming: bool,
    pub succeeded: bool,
    pub transaction_hash: Option<TxHash>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending,
    Confirming,
    Succeeded,
    Failed { kind: ErrorKind, reason: String },
}

/// Idle -> Pending -> Confirming -> Succeeded | Failed. A new operation may
/// start from Idle or any final phase.
#[derive(Debug, Clone)]
pub struct OperationTracker {
    phase: Phase,
    hash: Option<TxHash>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        OperationTracker {
            phase: Phase::Idle,
            hash: None,
        }
    }
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Pending | Phase::Confirming)
    }

    /// Returns false, changing nothing, while another operation is open.
    pub fn begin(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.phase = Phase::Pending;
        self.hash = None;
        true
    }

    pub fn broadcast(&mut self, hash: TxHash) {
        if self.phase == Phase::Pending {
            self.phase = Phase::Confirming;
            self.hash = Some(hash);
        }
    }

    /// Records a final outcome. Ignored when no operation is open, or when
    /// `hash` belongs to an earlier operation.
    pub fn settle(&mut self, hash: Option<&TxHash>, outcome: &Outcome) {
        if !self.is_busy() || (hash.is_some() && hash != self.hash.as_ref()) {
            return;
        }
        match outcome {
            Outcome::Pending => {}
            Outcome::Succeeded => self.phase = Phase::Succeeded,
            Outcome::Failed { kind, reason } => {
                self.phase = Phase::Failed {
                    kind: *kind,
                    reason: reason.clone(),
                }
            }
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Pending | Phase::Confirming => Some(Outcome::Pending),
            Phase::Succeeded => Some(Outcome::Succeeded),
            Phase::Failed { kind, reason } => Some(Outcome::Failed {
                kind: *kind,
                reason: reason.clone(),
            }),
        }
    }

    pub fn status(&self) -> OperationStatus {
        OperationStatus {
            pending: self.phase == Phase::Pending,
            confirming: self.phase == Phase::Confirming,
            succeeded: self.phase == Phase::Succeeded,
            transaction_hash: self.hash,
            error: match &self.phase {
                Phase::Failed { kind, reason } => Some(OperationError {
                    kind: *kind,
                    reason: reason.clone(),
                }),
                _ => None,
            },
        }
    }
}
