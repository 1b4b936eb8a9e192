use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use chess_match_registry::types::{Color, MatchMode};

use crate::address::{Address, TxHash};
use crate::calls::{top_encode, ContractCall, Payment, RegistryCalls};
use crate::config::ClientConfig;
use crate::error::{ClientError, RegistryError, TransportError};
use crate::gateway::{Gateway, TxStatus};
use crate::moves::ChessMove;
use crate::network::NetworkConfig;
use crate::position::{initial_state_hash, Position};
use crate::session::Session;
use crate::status::{OperationKey, OperationStatus, OperationTracker, Outcome};
use crate::validator::{MoveContext, MoveValidator, NoValidation};
use crate::view::{decode_color, decode_u64, MatchSummaryView, MatchView};

/// A transaction that was broadcast and awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub key: OperationKey,
    pub network: String,
    pub hash: TxHash,
    pub function: String,
}

type TrackerKey = (String, OperationKey);

/// Registry client. Each operation runs under an explicit [`Session`];
/// confirmations are polled through the [`Gateway`].
pub struct MatchRegistryClient<G: Gateway> {
    gateway: G,
    config: ClientConfig,
    validator: Arc<dyn MoveValidator>,
    trackers: Mutex<HashMap<TrackerKey, OperationTracker>>,
}

impl<G: Gateway> MatchRegistryClient<G> {
    pub fn new(gateway: G, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(MatchRegistryClient {
            gateway,
            config,
            validator: Arc::new(NoValidation),
            trackers: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_validator(mut self, validator: impl MoveValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // Sessions must point at a configured network; the registry address
    // always comes from configuration.
    fn network_of(&self, session: &Session) -> Result<&NetworkConfig, ClientError> {
        self.config.network(&session.network.id)
    }

    fn calls(&self, network: &NetworkConfig) -> Result<RegistryCalls<'_>, ClientError> {
        Ok(RegistryCalls::new(network.registry()?, &self.config.gas_limits))
    }

    // ============================================================
    // Transactions
    // ============================================================

    pub async fn create_match(
        &self,
        session: &Session,
        mode: MatchMode,
        creator_color: Color,
        stake: Option<Payment>,
        initial_state_hash: [u8; 32],
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self.calls(network)?.create_match(
            mode,
            creator_color,
            stake.as_ref(),
            &initial_state_hash,
        )?;
        self.send(session, OperationKey::Create, call).await
    }

    /// Unstaked match against the registry's engine account, starting from
    /// the given Chess960 position (518 is the classical setup).
    pub async fn create_pvc_match(
        &self,
        session: &Session,
        creator_color: Color,
        start_index: u16,
    ) -> Result<PendingOperation, ClientError> {
        self.create_match(
            session,
            MatchMode::PlayerVsComputer,
            creator_color,
            None,
            initial_state_hash(start_index)?,
        )
        .await
    }

    pub async fn join_match(
        &self,
        session: &Session,
        match_id: u64,
        stake: Option<Payment>,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self.calls(network)?.join_match(match_id, stake.as_ref())?;
        self.send(session, OperationKey::Match(match_id), call).await
    }

    pub async fn start_match(
        &self,
        session: &Session,
        match_id: u64,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self.calls(network)?.start_match(match_id)?;
        self.send(session, OperationKey::Match(match_id), call).await
    }

    /// Submits `mv` with the commitment to the resulting board. `position`
    /// is the board before the move; validators that need it reject the
    /// move when it is missing.
    pub async fn submit_move(
        &self,
        session: &Session,
        match_id: u64,
        mv: ChessMove,
        new_state_hash: [u8; 32],
        position: Option<&Position>,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self
            .calls(network)?
            .submit_move(match_id, &new_state_hash, &mv)?;

        let key = OperationKey::Match(match_id);
        self.begin(network, key).await?;

        let ctx = MoveContext {
            match_id,
            mover: &session.account,
            mv: &mv,
            position,
        };
        if let Err(err) = self.validator.validate(&ctx).await {
            warn!(match_id, mv = %mv, error = %err, "move rejected locally");
            self.settle(network, key, None, Outcome::from_error(&err))
                .await;
            return Err(err);
        }

        self.broadcast(session, network, key, call).await
    }

    /// Applies `mv` to `position` locally and submits the move with the new
    /// board's commitment. Returns the position after the move.
    pub async fn play_move(
        &self,
        session: &Session,
        match_id: u64,
        position: &Position,
        mv: ChessMove,
    ) -> Result<(PendingOperation, Position), ClientError> {
        let mut next = position.clone();
        next.apply(&mv).map_err(|e| ClientError::Rejected {
            reason: format!("{mv}: {e}"),
        })?;
        let pending = self
            .submit_move(session, match_id, mv, next.state_hash(), Some(position))
            .await?;
        Ok((pending, next))
    }

    /// Reports the result; `None` is a draw.
    pub async fn finish_match(
        &self,
        session: &Session,
        match_id: u64,
        winner: Option<Address>,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self
            .calls(network)?
            .finish_match(match_id, winner.as_ref())?;
        self.send(session, OperationKey::Match(match_id), call).await
    }

    pub async fn cancel_match(
        &self,
        session: &Session,
        match_id: u64,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        let call = self.calls(network)?.cancel_match(match_id)?;
        self.send(session, OperationKey::Match(match_id), call).await
    }

    async fn send(
        &self,
        session: &Session,
        key: OperationKey,
        call: ContractCall,
    ) -> Result<PendingOperation, ClientError> {
        let network = self.network_of(session)?;
        self.begin(network, key).await?;
        self.broadcast(session, network, key, call).await
    }

    async fn begin(&self, network: &NetworkConfig, key: OperationKey) -> Result<(), ClientError> {
        let mut trackers = self.trackers.lock().await;
        let tracker = trackers.entry((network.id.clone(), key)).or_default();
        if !tracker.begin() {
            warn!(network = %network.id, %key, "operation already in flight");
            return Err(ClientError::OperationInFlight { key });
        }
        Ok(())
    }

    async fn broadcast(
        &self,
        session: &Session,
        network: &NetworkConfig,
        key: OperationKey,
        call: ContractCall,
    ) -> Result<PendingOperation, ClientError> {
        match session.signer().sign_and_send(network, &call).await {
            Ok(hash) => {
                info!(
                    network = %network.id,
                    %key,
                    function = %call.function,
                    tx = %hash,
                    "transaction sent"
                );
                if let Some(tracker) = self
                    .trackers
                    .lock()
                    .await
                    .get_mut(&(network.id.clone(), key))
                {
                    tracker.broadcast(hash);
                }
                Ok(PendingOperation {
                    key,
                    network: network.id.clone(),
                    hash,
                    function: call.function,
                })
            }
            Err(err) => {
                let err = ClientError::Transport(err);
                warn!(network = %network.id, %key, function = %call.function, error = %err, "transaction not sent");
                self.settle(network, key, None, Outcome::from_error(&err))
                    .await;
                Err(err)
            }
        }
    }

    async fn settle(
        &self,
        network: &NetworkConfig,
        key: OperationKey,
        hash: Option<&TxHash>,
        outcome: Outcome,
    ) {
        if let Some(tracker) = self
            .trackers
            .lock()
            .await
            .get_mut(&(network.id.clone(), key))
        {
            tracker.settle(hash, &outcome);
        }
    }

    // ============================================================
    // Confirmation
    // ============================================================

    /// Polls until the transaction executes or the configured timeout
    /// passes. Returns the call's results on success. Nothing is retried:
    /// a refused transaction surfaces as [`ClientError::Registry`].
    /// Polls the network the operation was sent on.
    pub async fn confirm(&self, op: &PendingOperation) -> Result<Vec<Vec<u8>>, ClientError> {
        let network = self.config.network(&op.network)?;
        let timeout = self.config.confirmation_timeout();
        let result = match tokio::time::timeout(timeout, self.poll(network, &op.hash)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Transport(TransportError::ConfirmationTimeout {
                hash: op.hash.to_hex(),
                waited_secs: timeout.as_secs(),
            })),
        };

        let outcome = match &result {
            Ok(_) => {
                info!(network = %network.id, key = %op.key, tx = %op.hash, "transaction confirmed");
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(network = %network.id, key = %op.key, tx = %op.hash, error = %err, "transaction failed");
                Outcome::from_error(err)
            }
        };
        self.settle(network, op.key, Some(&op.hash), outcome).await;
        result
    }

    async fn poll(
        &self,
        network: &NetworkConfig,
        hash: &TxHash,
    ) -> Result<Vec<Vec<u8>>, ClientError> {
        let interval = self.config.poll_interval();
        loop {
            match self.gateway.transaction_status(network, hash).await {
                Ok(TxStatus::Success { results }) => return Ok(results),
                Ok(TxStatus::Failed { message }) => {
                    return Err(ClientError::Registry(RegistryError::from_message(&message)))
                }
                Ok(TxStatus::Pending) => debug!(tx = %hash, "still pending"),
                Err(err) => debug!(tx = %hash, error = %err, "status poll failed"),
            }
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn await_outcome(&self, op: &PendingOperation) -> Outcome {
        match self.confirm(op).await {
            Ok(_) => Outcome::Succeeded,
            Err(err) => Outcome::from_error(&err),
        }
    }

    /// Confirms a `createMatch` transaction and returns the new match id.
    pub async fn await_created_match(&self, op: &PendingOperation) -> Result<u64, ClientError> {
        let results = self.confirm(op).await?;
        let first = results
            .first()
            .ok_or_else(|| ClientError::decode("match id", "no return value"))?;
        decode_u64(first)
    }

    pub async fn status(&self, network_id: &str, key: OperationKey) -> OperationStatus {
        self.trackers
            .lock()
            .await
            .get(&(network_id.to_string(), key))
            .map(OperationTracker::status)
            .unwrap_or_default()
    }

    // ============================================================
    // Views
    // ============================================================

    async fn query(
        &self,
        network: &NetworkConfig,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ClientError> {
        let registry = network.registry()?;
        self.gateway
            .query(network, &registry, function, args)
            .await
            .map_err(|err| match err {
                TransportError::InvalidResponse { reason } if reason.contains("ERR_") => {
                    ClientError::Registry(RegistryError::from_message(&reason))
                }
                other => ClientError::Transport(other),
            })
    }

    async fn query_one(
        &self,
        network: &NetworkConfig,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Vec<u8>, ClientError> {
        self.query(network, function, args)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::decode("query result", format!("{function} returned nothing")))
    }

    pub async fn get_match(
        &self,
        network: &NetworkConfig,
        match_id: u64,
    ) -> Result<MatchView, ClientError> {
        let network = self.config.network(&network.id)?;
        let bytes = self
            .query_one(network, "getMatch", vec![top_encode(&match_id)?])
            .await?;
        MatchView::decode(&bytes)
    }

    pub async fn match_count(&self, network: &NetworkConfig) -> Result<u64, ClientError> {
        let network = self.config.network(&network.id)?;
        let bytes = self.query_one(network, "getMatchCount", Vec::new()).await?;
        decode_u64(&bytes)
    }

    pub async fn side_to_move(
        &self,
        network: &NetworkConfig,
        match_id: u64,
    ) -> Result<Color, ClientError> {
        let network = self.config.network(&network.id)?;
        let bytes = self
            .query_one(network, "getSideToMove", vec![top_encode(&match_id)?])
            .await?;
        decode_color(&bytes)
    }

    pub async fn escrowed_amount(
        &self,
        network: &NetworkConfig,
        match_id: u64,
    ) -> Result<BigUint, ClientError> {
        let network = self.config.network(&network.id)?;
        let bytes = self
            .query_one(network, "getEscrowedAmount", vec![top_encode(&match_id)?])
            .await?;
        Ok(BigUint::from_bytes_be(&bytes))
    }

    /// Newest first; the registry caps `count` at 50.
    pub async fn latest_matches(
        &self,
        network: &NetworkConfig,
        count: u64,
    ) -> Result<Vec<MatchSummaryView>, ClientError> {
        let network = self.config.network(&network.id)?;
        self.query(network, "getLatestMatches", vec![top_encode(&count)?])
            .await?
            .iter()
            .map(|bytes| MatchSummaryView::decode(bytes))
            .collect()
    }
}
