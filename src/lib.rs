#![no_std]

multiversx_sc::imports!();
multiversx_sc::derive_imports!();

pub mod errors;
pub mod types;

use errors::*;
use types::{
    BoardCommitment, Color, Config, FinishPolicy, Match, MatchCancelledData, MatchCreatedData,
    MatchFinishedData, MatchJoinedData, MatchMode, MatchResult, MatchStatus, MatchSummary,
    MoveSubmittedData, Participant, Stake,
};

pub const STATE_HASH_LEN: usize = 32;
pub const MOVE_DATA_MIN_LEN: usize = 4;
pub const BOARD_SQUARES: u16 = 64;
const MAX_LATEST_MATCHES: u64 = 50;

#[multiversx_sc::contract]
pub trait ChessMatchRegistry {
    #[init]
    fn init(
        &self,
        engine: ManagedAddress,
        arbiter: ManagedAddress,
        finish_policy: FinishPolicy,
        cancel_grace_period_seconds: u64,
    ) {
        require!(!engine.is_zero(), ERR_INVALID_ARG);
        require!(
            finish_policy != FinishPolicy::Arbiter || !arbiter.is_zero(),
            ERR_INVALID_ARG
        );
        require!(cancel_grace_period_seconds > 0, ERR_INVALID_ARG);

        let caller = self.blockchain().get_caller();
        self.owner().set(&caller);
        self.engine().set(&engine);
        self.arbiter().set(&arbiter);
        self.finish_policy().set(finish_policy);
        self.cancel_grace_period_seconds()
            .set(cancel_grace_period_seconds);
        self.paused().set(false);

        self.match_count().set(0u64);
    }

    #[upgrade]
    fn upgrade(&self) {}

    // ============================================================
    // Owner controls
    // ============================================================

    #[endpoint(setEngine)]
    fn set_engine(&self, new_engine: ManagedAddress) {
        self.require_owner();
        require!(!new_engine.is_zero(), ERR_INVALID_ARG);
        self.engine().set(&new_engine);
    }

    #[endpoint(setArbiter)]
    fn set_arbiter(&self, new_arbiter: ManagedAddress) {
        self.require_owner();
        require!(
            self.finish_policy().get() != FinishPolicy::Arbiter || !new_arbiter.is_zero(),
            ERR_INVALID_ARG
        );
        self.arbiter().set(&new_arbiter);
    }

    #[endpoint(setFinishPolicy)]
    fn set_finish_policy(&self, policy: FinishPolicy) {
        self.require_owner();
        require!(
            policy != FinishPolicy::Arbiter || !self.arbiter().get().is_zero(),
            ERR_INVALID_ARG
        );
        self.finish_policy().set(policy);
    }

    #[endpoint(setCancelGracePeriod)]
    fn set_cancel_grace_period(&self, seconds: u64) {
        self.require_owner();
        require!(seconds > 0, ERR_INVALID_ARG);
        self.cancel_grace_period_seconds().set(seconds);
    }

    #[endpoint(pause)]
    fn pause(&self) {
        self.require_owner();
        self.paused().set(true);
    }

    #[endpoint(resume)]
    fn resume(&self) {
        self.require_owner();
        self.paused().set(false);
    }

    // ============================================================
    // Match lifecycle
    // ============================================================

    #[endpoint(createMatch)]
    #[payable("*")]
    fn create_match(
        &self,
        mode: MatchMode,
        creator_color: Color,
        stake_token: Option<EgldOrEsdtTokenIdentifier>,
        stake_amount: BigUint,
        initial_state_hash: ManagedBuffer,
    ) -> u64 {
        self.require_not_paused();
        require!(
            initial_state_hash.len() == STATE_HASH_LEN,
            ERR_INVALID_STATE_HASH
        );

        let creator = self.blockchain().get_caller();
        let engine = self.engine().get();
        if mode == MatchMode::PlayerVsComputer {
            require!(creator != engine, ERR_INVALID_ARG);
        }

        let stake = self.escrow_creation_stake(mode, stake_token, stake_amount);

        let now = self.blockchain().get_block_timestamp();
        let match_id = self.match_count().get() + 1u64;
        self.match_count().set(match_id);

        let mut m = Match {
            id: match_id,
            mode,
            creator: creator.clone(),
            status: MatchStatus::Created,
            stake: stake.clone(),
            white: Participant::open(Color::White),
            black: Participant::open(Color::Black),
            board: BoardCommitment {
                fen_hash: initial_state_hash.clone(),
                move_count: 0,
            },
            winner: ManagedAddress::zero(),
            result: MatchResult::Unset,
            created_at: now,
            updated_at: now,
            pot: stake.amount.clone(),
        };
        {
            let seat = m.seat_mut(creator_color);
            seat.account = creator.clone();
            seat.joined_at = now;
            seat.escrowed = stake.is_staked();
        }

        self.match_created_event(
            match_id,
            &creator,
            MatchCreatedData {
                mode,
                creator_color,
                stake,
                initial_state_hash,
            },
        );

        if mode == MatchMode::PlayerVsComputer {
            // The engine seat is filled at once and play starts in the same
            // transaction; every intermediate status is still visited.
            let engine_color = creator_color.opposite();
            {
                let seat = m.seat_mut(engine_color);
                seat.account = engine.clone();
                seat.joined_at = now;
            }
            self.transition(&mut m, MatchStatus::Joined);
            self.match_joined_event(
                match_id,
                &engine,
                MatchJoinedData {
                    color: engine_color,
                    pot: m.pot.clone(),
                },
            );
            self.transition(&mut m, MatchStatus::InProgress);
            self.match_started_event(match_id, &m.white.account, &m.black.account);
        }

        self.matches(match_id).set(&m);
        match_id
    }

    #[endpoint(joinMatch)]
    #[payable("*")]
    fn join_match(&self, match_id: u64) {
        self.require_not_paused();

        let mut m = self.require_match(match_id);
        require!(m.status == MatchStatus::Created, ERR_MATCH_NOT_JOINABLE);

        let caller = self.blockchain().get_caller();
        require!(m.color_of(&caller).is_none(), ERR_ALREADY_PARTICIPANT);

        let open_color = if m.white.is_open() {
            Color::White
        } else if m.black.is_open() {
            Color::Black
        } else {
            sc_panic!(ERR_MATCH_NOT_JOINABLE)
        };

        let payment = self.call_value().egld_or_single_esdt();
        match &m.stake.token {
            None => {
                require!(payment.amount == 0u64, ERR_STAKE_MISMATCH);
            }
            Some(token) => {
                require!(
                    payment.token_identifier == *token
                        && payment.token_nonce == 0
                        && payment.amount == m.stake.amount,
                    ERR_STAKE_MISMATCH
                );
            }
        }

        let now = self.blockchain().get_block_timestamp();
        let staked = m.stake.is_staked();
        {
            let seat = m.seat_mut(open_color);
            seat.account = caller.clone();
            seat.joined_at = now;
            seat.escrowed = staked;
        }
        if staked {
            m.pot += &m.stake.amount;
        }
        self.transition(&mut m, MatchStatus::Joined);

        self.matches(match_id).set(&m);
        self.match_joined_event(
            match_id,
            &caller,
            MatchJoinedData {
                color: open_color,
                pot: m.pot.clone(),
            },
        );
    }

    #[endpoint(startMatch)]
    fn start_match(&self, match_id: u64) {
        self.require_not_paused();

        let mut m = self.require_match(match_id);
        let caller = self.blockchain().get_caller();
        require!(m.color_of(&caller).is_some(), ERR_NOT_PARTICIPANT);

        self.transition(&mut m, MatchStatus::InProgress);
        self.matches(match_id).set(&m);
        self.match_started_event(match_id, &m.white.account, &m.black.account);
    }

    #[endpoint(submitMove)]
    fn submit_move(&self, match_id: u64, new_state_hash: ManagedBuffer, move_data: ManagedBuffer) {
        self.require_not_paused();

        let mut m = self.require_match(match_id);
        require!(
            m.status == MatchStatus::InProgress,
            ERR_MATCH_NOT_IN_PROGRESS
        );
        require!(
            new_state_hash.len() == STATE_HASH_LEN,
            ERR_INVALID_STATE_HASH
        );
        self.require_well_formed_move(&move_data);

        let caller = self.blockchain().get_caller();
        let color = match m.color_of(&caller) {
            Some(color) => color,
            None => sc_panic!(ERR_NOT_PARTICIPANT),
        };
        require!(color == m.side_to_move(), ERR_NOT_YOUR_TURN);

        m.board.fen_hash = new_state_hash.clone();
        m.board.move_count += 1;
        self.transition(&mut m, MatchStatus::InProgress);

        self.matches(match_id).set(&m);
        self.move_submitted_event(
            match_id,
            &caller,
            MoveSubmittedData {
                color,
                move_count: m.board.move_count,
                fen_hash: new_state_hash,
                move_data,
            },
        );
    }

    #[endpoint(finishMatch)]
    fn finish_match(&self, match_id: u64, winner: ManagedAddress) {
        // Allowed even when paused (unwind).
        let mut m = self.require_match(match_id);
        require!(!m.status.is_terminal(), ERR_MATCH_ALREADY_FINISHED);
        require!(
            m.status == MatchStatus::InProgress,
            ERR_MATCH_NOT_IN_PROGRESS
        );
        require!(
            winner.is_zero() || m.color_of(&winner).is_some(),
            ERR_INVALID_WINNER
        );

        let caller = self.blockchain().get_caller();
        match self.finish_policy().get() {
            FinishPolicy::EitherParticipant => {
                require!(m.color_of(&caller).is_some(), ERR_UNAUTHORIZED_FINISHER);
            }
            FinishPolicy::Arbiter => {
                require!(caller == self.arbiter().get(), ERR_UNAUTHORIZED_FINISHER);
            }
            FinishPolicy::MutualConsent => {
                let color = match m.color_of(&caller) {
                    Some(color) => color,
                    None => sc_panic!(ERR_UNAUTHORIZED_FINISHER),
                };
                self.finish_proposal(match_id, &caller).set(&winner);

                let other = m.seat(color.opposite()).account.clone();
                let other_proposal = self.finish_proposal(match_id, &other);
                if other_proposal.is_empty() || other_proposal.get() != winner {
                    self.finish_proposed_event(match_id, &caller, &winner);
                    return;
                }
                self.finish_proposal(match_id, &caller).clear();
                other_proposal.clear();
            }
        }

        let result = match m.color_of(&winner) {
            Some(Color::White) => MatchResult::WhiteWin,
            Some(Color::Black) => MatchResult::BlackWin,
            None => MatchResult::Draw,
        };
        self.transition(&mut m, MatchStatus::Finished);
        m.result = result;
        m.winner = winner.clone();

        let payout = self.settle(&mut m, match_id, &winner);
        self.match_finished_event(
            match_id,
            &winner,
            MatchFinishedData {
                result,
                payout,
                move_count: m.board.move_count,
                ended_ts: m.updated_at,
            },
        );
    }

    #[endpoint(cancelMatch)]
    fn cancel_match(&self, match_id: u64) {
        // Allowed even when paused.
        let mut m = self.require_match(match_id);
        require!(!m.status.is_terminal(), ERR_MATCH_ALREADY_FINISHED);
        require!(
            m.status == MatchStatus::Created || m.status == MatchStatus::Joined,
            ERR_MATCH_NOT_CANCELLABLE
        );

        let caller = self.blockchain().get_caller();
        if m.color_of(&caller).is_none() {
            let now = self.blockchain().get_block_timestamp();
            let grace = self.cancel_grace_period_seconds().get();
            require!(
                now >= m.updated_at.saturating_add(grace),
                ERR_GRACE_PERIOD_ACTIVE
            );
        }

        self.transition(&mut m, MatchStatus::Cancelled);
        m.result = MatchResult::Cancelled;

        let refunded = self.refund_escrow(&mut m, match_id);
        self.match_cancelled_event(
            match_id,
            &caller,
            MatchCancelledData {
                refunded,
                ended_ts: m.updated_at,
            },
        );
    }

    // ============================================================
    // Views
    // ============================================================

    #[view(getConfig)]
    fn get_config(&self) -> Config<Self::Api> {
        Config {
            owner: self.owner().get(),
            engine: self.engine().get(),
            arbiter: self.arbiter().get(),
            finish_policy: self.finish_policy().get(),
            cancel_grace_period_seconds: self.cancel_grace_period_seconds().get(),
            paused: self.paused().get(),
        }
    }

    #[view(getMatch)]
    fn get_match(&self, match_id: u64) -> Match<Self::Api> {
        self.require_match(match_id)
    }

    #[view(getMatchCount)]
    fn get_match_count(&self) -> u64 {
        self.match_count().get()
    }

    #[view(getSideToMove)]
    fn get_side_to_move(&self, match_id: u64) -> Color {
        self.require_match(match_id).side_to_move()
    }

    #[view(getEscrowedAmount)]
    fn get_escrowed_amount(&self, match_id: u64) -> BigUint {
        let m = self.require_match(match_id);
        self.escrowed_amount(&m)
    }

    #[view(getFinishProposal)]
    fn get_finish_proposal(
        &self,
        match_id: u64,
        participant: ManagedAddress,
    ) -> OptionalValue<ManagedAddress> {
        let proposal = self.finish_proposal(match_id, &participant);
        if proposal.is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(proposal.get())
        }
    }

    #[view(getLatestMatches)]
    fn get_latest_matches(&self, count: u64) -> MultiValueEncoded<MatchSummary<Self::Api>> {
        let capped = core::cmp::min(count, MAX_LATEST_MATCHES);
        let total = self.match_count().get();
        let mut result = MultiValueEncoded::new();

        let mut pushed = 0u64;
        let mut id = total;
        while id > 0 && pushed < capped {
            if !self.matches(id).is_empty() {
                let m = self.matches(id).get();
                result.push(self.to_summary(&m));
                pushed += 1;
            }
            id -= 1;
        }

        result
    }

    // ============================================================
    // Internal helpers
    // ============================================================

    fn require_not_paused(&self) {
        require!(!self.paused().get(), ERR_PAUSED);
    }

    fn require_owner(&self) {
        let caller = self.blockchain().get_caller();
        require!(caller == self.owner().get(), ERR_UNAUTHORIZED);
    }

    fn require_match(&self, match_id: u64) -> Match<Self::Api> {
        require!(!self.matches(match_id).is_empty(), ERR_MATCH_NOT_FOUND);
        self.matches(match_id).get()
    }

    // moveData = u16_be(from) || u16_be(to) || reserved bytes
    fn require_well_formed_move(&self, move_data: &ManagedBuffer) {
        require!(move_data.len() >= MOVE_DATA_MIN_LEN, ERR_INVALID_MOVE_DATA);
        let mut head = [0u8; MOVE_DATA_MIN_LEN];
        require!(
            move_data.load_slice(0, &mut head).is_ok(),
            ERR_INVALID_MOVE_DATA
        );
        let from = u16::from_be_bytes([head[0], head[1]]);
        let to = u16::from_be_bytes([head[2], head[3]]);
        require!(
            from < BOARD_SQUARES && to < BOARD_SQUARES,
            ERR_INVALID_MOVE_DATA
        );
    }

    fn transition(&self, m: &mut Match<Self::Api>, next: MatchStatus) {
        require!(m.status.can_transition_to(next), ERR_INVALID_TRANSITION);
        m.status = next;
        m.updated_at = self.blockchain().get_block_timestamp();
    }

    fn escrow_creation_stake(
        &self,
        mode: MatchMode,
        stake_token: Option<EgldOrEsdtTokenIdentifier>,
        stake_amount: BigUint,
    ) -> Stake<Self::Api> {
        let payment = self.call_value().egld_or_single_esdt();
        match stake_token {
            None => {
                require!(stake_amount == 0u64, ERR_INVALID_STAKE_CONFIGURATION);
                require!(payment.amount == 0u64, ERR_INVALID_STAKE_CONFIGURATION);
                Stake::none()
            }
            Some(token) => {
                // The engine seat never escrows, so a staked PvC pot could
                // only ever pay the creator back.
                require!(
                    mode == MatchMode::PlayerVsPlayer,
                    ERR_INVALID_STAKE_CONFIGURATION
                );
                require!(stake_amount > 0u64, ERR_INVALID_STAKE_CONFIGURATION);
                require!(
                    payment.amount == 0u64
                        || (payment.token_identifier == token && payment.token_nonce == 0),
                    ERR_INVALID_STAKE_CONFIGURATION
                );
                require!(payment.amount >= stake_amount, ERR_INSUFFICIENT_FUNDS);
                require!(
                    payment.amount == stake_amount,
                    ERR_INVALID_STAKE_CONFIGURATION
                );
                Stake {
                    token: Some(token),
                    amount: stake_amount,
                }
            }
        }
    }

    fn escrowed_amount(&self, m: &Match<Self::Api>) -> BigUint {
        let mut total = BigUint::zero();
        if m.white.escrowed {
            total += &m.stake.amount;
        }
        if m.black.escrowed {
            total += &m.stake.amount;
        }
        total
    }

    /// Pays the pot out for a finished match and persists it. Returns the
    /// total amount transferred.
    fn settle(
        &self,
        m: &mut Match<Self::Api>,
        match_id: u64,
        winner: &ManagedAddress,
    ) -> BigUint {
        if winner.is_zero() {
            // Draw: every escrowed seat takes its own stake back.
            return self.refund_escrow(m, match_id);
        }

        let payout = self.escrowed_amount(m);
        m.white.escrowed = false;
        m.black.escrowed = false;
        self.matches(match_id).set(&*m);

        if let Some(token) = &m.stake.token {
            if payout > 0u64 {
                self.send().direct(winner, token, 0, &payout);
            }
        }
        payout
    }

    fn refund_escrow(&self, m: &mut Match<Self::Api>, match_id: u64) -> BigUint {
        let refunded = self.escrowed_amount(m);
        let refund_white = m.white.escrowed;
        let refund_black = m.black.escrowed;
        m.white.escrowed = false;
        m.black.escrowed = false;
        self.matches(match_id).set(&*m);

        if let Some(token) = &m.stake.token {
            if refund_white {
                self.send().direct(&m.white.account, token, 0, &m.stake.amount);
            }
            if refund_black {
                self.send().direct(&m.black.account, token, 0, &m.stake.amount);
            }
        }
        refunded
    }

    fn to_summary(&self, m: &Match<Self::Api>) -> MatchSummary<Self::Api> {
        MatchSummary {
            id: m.id,
            mode: m.mode,
            status: m.status,
            white: m.white.account.clone(),
            black: m.black.account.clone(),
            stake: m.stake.clone(),
            move_count: m.board.move_count,
            result: m.result,
            winner: m.winner.clone(),
            updated_at: m.updated_at,
        }
    }

    // ============================================================
    // Events
    // ============================================================

    #[event("matchCreated")]
    fn match_created_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] creator: &ManagedAddress,
        data: MatchCreatedData<Self::Api>,
    );

    #[event("matchJoined")]
    fn match_joined_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] player: &ManagedAddress,
        data: MatchJoinedData<Self::Api>,
    );

    #[event("matchStarted")]
    fn match_started_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] white: &ManagedAddress,
        #[indexed] black: &ManagedAddress,
    );

    #[event("moveSubmitted")]
    fn move_submitted_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] player: &ManagedAddress,
        data: MoveSubmittedData<Self::Api>,
    );

    #[event("finishProposed")]
    fn finish_proposed_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] proposer: &ManagedAddress,
        #[indexed] winner: &ManagedAddress,
    );

    #[event("matchFinished")]
    fn match_finished_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] winner: &ManagedAddress,
        data: MatchFinishedData<Self::Api>,
    );

    #[event("matchCancelled")]
    fn match_cancelled_event(
        &self,
        #[indexed] match_id: u64,
        #[indexed] cancelled_by: &ManagedAddress,
        data: MatchCancelledData<Self::Api>,
    );

    // ============================================================
    // Storage
    // ============================================================

    #[storage_mapper("owner")]
    fn owner(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("engine")]
    fn engine(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("arbiter")]
    fn arbiter(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("finishPolicy")]
    fn finish_policy(&self) -> SingleValueMapper<FinishPolicy>;

    #[storage_mapper("cancelGracePeriodSeconds")]
    fn cancel_grace_period_seconds(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("paused")]
    fn paused(&self) -> SingleValueMapper<bool>;

    #[storage_mapper("matchCount")]
    fn match_count(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("matches")]
    fn matches(&self, match_id: u64) -> SingleValueMapper<Match<Self::Api>>;

    #[storage_mapper("finishProposal")]
    fn finish_proposal(
        &self,
        match_id: u64,
        participant: &ManagedAddress,
    ) -> SingleValueMapper<ManagedAddress>;
}
