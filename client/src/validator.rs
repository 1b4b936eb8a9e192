//! Optional pre-submission move checks.
//!
//! The registry accepts any well-formed move, so legality is a client
//! concern: skip it, check it locally, or ask an external arbiter.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::{ClientError, TransportError};
use crate::moves::ChessMove;
use crate::position::Position;

pub struct MoveContext<'a> {
    pub match_id: u64,
    pub mover: &'a Address,
    pub mv: &'a ChessMove,
    /// Position before the move, when the caller tracks one.
    pub position: Option<&'a Position>,
}

#[async_trait]
pub trait MoveValidator: Send + Sync {
    /// `Err(ClientError::Rejected)` stops the move before it is signed.
    async fn validate(&self, ctx: &MoveContext<'_>) -> Result<(), ClientError>;
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoValidation;

#[async_trait]
impl MoveValidator for NoValidation {
    async fn validate(&self, _ctx: &MoveContext<'_>) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Checks the move against the local rules engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRulesEngine;

#[async_trait]
impl MoveValidator for LocalRulesEngine {
    async fn validate(&self, ctx: &MoveContext<'_>) -> Result<(), ClientError> {
        let position = ctx.position.ok_or_else(|| ClientError::Rejected {
            reason: "local validation needs the current position".into(),
        })?;
        if position.outcome().is_over() {
            return Err(ClientError::Rejected {
                reason: format!("game is over: {:?}", position.outcome()),
            });
        }
        let mut probe = position.clone();
        probe.apply(ctx.mv).map_err(|e| ClientError::Rejected {
            reason: format!("{}: {e}", ctx.mv),
        })?;
        Ok(())
    }
}

/// External judge of move legality, e.g. a game server.
#[async_trait]
pub trait Arbiter: Send + Sync {
    /// `Ok(None)` accepts; `Ok(Some(reason))` rejects.
    async fn review(
        &self,
        match_id: u64,
        mover: &Address,
        mv: &ChessMove,
    ) -> Result<Option<String>, TransportError>;
}

pub struct RemoteArbiter<A: Arbiter> {
    arbiter: A,
}

impl<A: Arbiter> RemoteArbiter<A> {
    pub fn new(arbiter: A) -> Self {
        RemoteArbiter { arbiter }
    }
}

#[async_trait]
impl<A: Arbiter> MoveValidator for RemoteArbiter<A> {
    async fn validate(&self, ctx: &MoveContext<'_>) -> Result<(), ClientError> {
        match self.arbiter.review(ctx.match_id, ctx.mover, ctx.mv).await {
            Ok(None) => Ok(()),
            Ok(Some(reason)) => Err(ClientError::Rejected { reason }),
            Err(e) => Err(ClientError::Rejected {
                reason: format!("arbiter unavailable: {e}"),
            }),
        }
    }
}
