//! Decoding of registry query results.
//!
//! The raw structs mirror the contract's storage types field by field and
//! are decoded with the MultiversX codec. Enum discriminants are read as
//! plain bytes so a newer registry with extra variants still decodes.

use multiversx_sc::codec;
use multiversx_sc::codec::derive::{NestedDecode, TopDecode};
use multiversx_sc::codec::TopDecode as _;
use num_bigint::BigUint;

use chess_match_registry::types::{Color, MatchMode, MatchResult, MatchStatus};

use crate::address::Address;
use crate::calls::{Payment, TokenId};
use crate::error::ClientError;

/// A discriminant this client may or may not know.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded<T> {
    Known(T),
    Unknown(u8),
}

impl<T: Copy> Decoded<T> {
    pub fn known(self) -> Option<T> {
        match self {
            Decoded::Known(v) => Some(v),
            Decoded::Unknown(_) => None,
        }
    }
}

impl<T: PartialEq> Decoded<T> {
    pub fn is(&self, value: T) -> bool {
        matches!(self, Decoded::Known(v) if *v == value)
    }
}

fn mode(raw: u8) -> Decoded<MatchMode> {
    match raw {
        0 => Decoded::Known(MatchMode::PlayerVsPlayer),
        1 => Decoded::Known(MatchMode::PlayerVsComputer),
        other => Decoded::Unknown(other),
    }
}

fn status(raw: u8) -> Decoded<MatchStatus> {
    match raw {
        0 => Decoded::Known(MatchStatus::Created),
        1 => Decoded::Known(MatchStatus::Joined),
        2 => Decoded::Known(MatchStatus::InProgress),
        3 => Decoded::Known(MatchStatus::Finished),
        4 => Decoded::Known(MatchStatus::Cancelled),
        other => Decoded::Unknown(other),
    }
}

fn result(raw: u8) -> Decoded<MatchResult> {
    match raw {
        0 => Decoded::Known(MatchResult::Unset),
        1 => Decoded::Known(MatchResult::WhiteWin),
        2 => Decoded::Known(MatchResult::BlackWin),
        3 => Decoded::Known(MatchResult::Draw),
        4 => Decoded::Known(MatchResult::Cancelled),
        other => Decoded::Unknown(other),
    }
}

fn color(raw: u8) -> Result<Color, ClientError> {
    match raw {
        0 => Ok(Color::White),
        1 => Ok(Color::Black),
        other => Err(ClientError::decode("color", format!("discriminant {other}"))),
    }
}

fn account(raw: [u8; 32]) -> Option<Address> {
    let addr = Address::from_bytes(raw);
    (!addr.is_zero()).then_some(addr)
}

#[derive(TopDecode, NestedDecode)]
struct RawStake {
    token: Option<Vec<u8>>,
    amount: Vec<u8>,
}

impl RawStake {
    fn into_payment(self) -> Result<Option<Payment>, ClientError> {
        let amount = BigUint::from_bytes_be(&self.amount);
        match self.token {
            Some(token) if amount > BigUint::default() => Ok(Some(Payment {
                token: TokenId::from_bytes(&token)?,
                amount,
            })),
            _ => Ok(None),
        }
    }
}

#[derive(TopDecode, NestedDecode)]
struct RawParticipant {
    account: [u8; 32],
    color: u8,
    joined_at: u64,
    escrowed: bool,
}

#[derive(TopDecode, NestedDecode)]
struct RawBoard {
    fen_hash: Vec<u8>,
    move_count: u32,
}

#[derive(TopDecode, NestedDecode)]
struct RawMatch {
    id: u64,
    mode: u8,
    creator: [u8; 32],
    status: u8,
    stake: RawStake,
    white: RawParticipant,
    black: RawParticipant,
    board: RawBoard,
    winner: [u8; 32],
    result: u8,
    created_at: u64,
    updated_at: u64,
    pot: Vec<u8>,
}

#[derive(TopDecode, NestedDecode)]
struct RawSummary {
    id: u64,
    mode: u8,
    status: u8,
    white: [u8; 32],
    black: [u8; 32],
    stake: RawStake,
    move_count: u32,
    result: u8,
    winner: [u8; 32],
    updated_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatView {
    /// `None` while the seat is open.
    pub account: Option<Address>,
    pub color: Color,
    pub joined_at: u64,
    pub escrowed: bool,
}

impl SeatView {
    fn from_raw(raw: RawParticipant) -> Result<Self, ClientError> {
        Ok(SeatView {
            account: account(raw.account),
            color: color(raw.color)?,
            joined_at: raw.joined_at,
            escrowed: raw.escrowed,
        })
    }
}

/// A match as returned by `getMatch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchView {
    pub id: u64,
    pub mode: Decoded<MatchMode>,
    pub creator: Address,
    pub status: Decoded<MatchStatus>,
    /// `None` for unstaked matches.
    pub stake: Option<Payment>,
    pub white: SeatView,
    pub black: SeatView,
    pub fen_hash: [u8; 32],
    pub move_count: u32,
    /// `None` until resolved, and for draws.
    pub winner: Option<Address>,
    pub result: Decoded<MatchResult>,
    pub created_at: u64,
    pub updated_at: u64,
    pub pot: BigUint,
}

impl MatchView {
    pub fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        let raw = RawMatch::top_decode(bytes)
            .map_err(|e| ClientError::decode("match", format!("{e:?}")))?;
        let fen_hash: [u8; 32] = raw
            .board
            .fen_hash
            .as_slice()
            .try_into()
            .map_err(|_| ClientError::decode("match", "state hash is not 32 bytes"))?;
        Ok(MatchView {
            id: raw.id,
            mode: mode(raw.mode),
            creator: Address::from_bytes(raw.creator),
            status: status(raw.status),
            stake: raw.stake.into_payment()?,
            white: SeatView::from_raw(raw.white)?,
            black: SeatView::from_raw(raw.black)?,
            fen_hash,
            move_count: raw.board.move_count,
            winner: account(raw.winner),
            result: result(raw.result),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            pot: BigUint::from_bytes_be(&raw.pot),
        })
    }

    pub fn side_to_move(&self) -> Color {
        Color::to_move(self.move_count)
    }

    pub fn seat(&self, color: Color) -> &SeatView {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn color_of(&self, who: &Address) -> Option<Color> {
        [&self.white, &self.black]
            .into_iter()
            .find(|seat| seat.account.as_ref() == Some(who))
            .map(|seat| seat.color)
    }

    /// Whether `who` holds the seat whose turn it is.
    pub fn is_turn_of(&self, who: &Address) -> bool {
        self.status.is(MatchStatus::InProgress) && self.color_of(who) == Some(self.side_to_move())
    }

    pub fn open_seat(&self) -> Option<Color> {
        [&self.white, &self.black]
            .into_iter()
            .find(|seat| seat.account.is_none())
            .map(|seat| seat.color)
    }
}

/// One entry of `getLatestMatches`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSummaryView {
    pub id: u64,
    pub mode: Decoded<MatchMode>,
    pub status: Decoded<MatchStatus>,
    pub white: Option<Address>,
    pub black: Option<Address>,
    pub stake: Option<Payment>,
    pub move_count: u32,
    pub result: Decoded<MatchResult>,
    pub winner: Option<Address>,
    pub updated_at: u64,
}

impl MatchSummaryView {
    pub fn decode(bytes: &[u8]) -> Result<Self, ClientError> {
        let raw = RawSummary::top_decode(bytes)
            .map_err(|e| ClientError::decode("match summary", format!("{e:?}")))?;
        Ok(MatchSummaryView {
            id: raw.id,
            mode: mode(raw.mode),
            status: status(raw.status),
            white: account(raw.white),
            black: account(raw.black),
            stake: raw.stake.into_payment()?,
            move_count: raw.move_count,
            result: result(raw.result),
            winner: account(raw.winner),
            updated_at: raw.updated_at,
        })
    }
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64, ClientError> {
    u64::top_decode(bytes).map_err(|e| ClientError::decode("u64", format!("{e:?}")))
}

pub fn decode_color(bytes: &[u8]) -> Result<Color, ClientError> {
    let raw = u8::top_decode(bytes).map_err(|e| ClientError::decode("color", format!("{e:?}")))?;
    color(raw)
}
