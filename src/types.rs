multiversx_sc::imports!();
multiversx_sc::derive_imports!();

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchMode {
    PlayerVsPlayer,
    PlayerVsComputer,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Side to move after `move_count` half-moves. White always opens.
    pub fn to_move(move_count: u32) -> Self {
        if move_count % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchStatus {
    Created,
    Joined,
    InProgress,
    Finished,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }

    /// Forward-only lifecycle. `InProgress` self-loops on every move.
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Created, MatchStatus::Joined)
                | (MatchStatus::Created, MatchStatus::Cancelled)
                | (MatchStatus::Joined, MatchStatus::InProgress)
                | (MatchStatus::Joined, MatchStatus::Cancelled)
                | (MatchStatus::InProgress, MatchStatus::InProgress)
                | (MatchStatus::InProgress, MatchStatus::Finished)
        )
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchResult {
    Unset,
    WhiteWin,
    BlackWin,
    Draw,
    Cancelled,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum FinishPolicy {
    /// Either seat may report the result on its own.
    EitherParticipant,
    /// Only the configured arbiter account may report.
    Arbiter,
    /// Both seats must report the same winner.
    MutualConsent,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct Config<M: ManagedTypeApi> {
    pub owner: ManagedAddress<M>,
    pub engine: ManagedAddress<M>,
    pub arbiter: ManagedAddress<M>,
    pub finish_policy: FinishPolicy,
    pub cancel_grace_period_seconds: u64,
    pub paused: bool,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct Stake<M: ManagedTypeApi> {
    pub token: Option<EgldOrEsdtTokenIdentifier<M>>, // None when unstaked
    pub amount: BigUint<M>,                          // per seat
}

impl<M: ManagedTypeApi> Stake<M> {
    pub fn none() -> Self {
        Stake {
            token: None,
            amount: BigUint::zero(),
        }
    }

    pub fn is_staked(&self) -> bool {
        self.token.is_some() && self.amount > 0u64
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct Participant<M: ManagedTypeApi> {
    pub account: ManagedAddress<M>, // zero while the seat is open
    pub color: Color,
    pub joined_at: u64,
    pub escrowed: bool,
}

impl<M: ManagedTypeApi> Participant<M> {
    pub fn open(color: Color) -> Self {
        Participant {
            account: ManagedAddress::zero(),
            color,
            joined_at: 0,
            escrowed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.account.is_zero()
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct BoardCommitment<M: ManagedTypeApi> {
    pub fen_hash: ManagedBuffer<M>, // always 32 bytes
    pub move_count: u32,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct Match<M: ManagedTypeApi> {
    pub id: u64,
    pub mode: MatchMode,
    pub creator: ManagedAddress<M>,
    pub status: MatchStatus,
    pub stake: Stake<M>,
    pub white: Participant<M>,
    pub black: Participant<M>,
    pub board: BoardCommitment<M>,
    pub winner: ManagedAddress<M>, // zero until resolved, and on draws
    pub result: MatchResult,
    pub created_at: u64,
    pub updated_at: u64,
    pub pot: BigUint<M>,
}

impl<M: ManagedTypeApi> Match<M> {
    pub fn seat(&self, color: Color) -> &Participant<M> {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn seat_mut(&mut self, color: Color) -> &mut Participant<M> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn color_of(&self, account: &ManagedAddress<M>) -> Option<Color> {
        if account.is_zero() {
            None
        } else if *account == self.white.account {
            Some(Color::White)
        } else if *account == self.black.account {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn side_to_move(&self) -> Color {
        Color::to_move(self.board.move_count)
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MatchSummary<M: ManagedTypeApi> {
    pub id: u64,
    pub mode: MatchMode,
    pub status: MatchStatus,
    pub white: ManagedAddress<M>,
    pub black: ManagedAddress<M>,
    pub stake: Stake<M>,
    pub move_count: u32,
    pub result: MatchResult,
    pub winner: ManagedAddress<M>,
    pub updated_at: u64,
}

// ============================================================
// Event payloads (MultiversX events allow only one non-indexed arg)
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MatchCreatedData<M: ManagedTypeApi> {
    pub mode: MatchMode,
    pub creator_color: Color,
    pub stake: Stake<M>,
    pub initial_state_hash: ManagedBuffer<M>,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MatchJoinedData<M: ManagedTypeApi> {
    pub color: Color,
    pub pot: BigUint<M>,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MoveSubmittedData<M: ManagedTypeApi> {
    pub color: Color,
    pub move_count: u32,
    pub fen_hash: ManagedBuffer<M>,
    pub move_data: ManagedBuffer<M>,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MatchFinishedData<M: ManagedTypeApi> {
    pub result: MatchResult,
    pub payout: BigUint<M>,
    pub move_count: u32,
    pub ended_ts: u64,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone)]
pub struct MatchCancelledData<M: ManagedTypeApi> {
    pub refunded: BigUint<M>,
    pub ended_ts: u64,
}
