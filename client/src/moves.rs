use std::fmt;
use std::str::FromStr;

use crate::chess::{file_of, rank_of, square_name, PieceKind};
use crate::error::ClientError;

/// Length of the encoded move: from (u16 BE), to (u16 BE), promotion, flags.
pub const MOVE_DATA_LEN: usize = 6;

pub const PROMO_NONE: u8 = 0;
pub const PROMO_QUEEN: u8 = 1;
pub const PROMO_ROOK: u8 = 2;
pub const PROMO_BISHOP: u8 = 3;
pub const PROMO_KNIGHT: u8 = 4;

/// Board square, a1 = 0 through h8 = 63.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub fn new(index: u8) -> Option<Self> {
        (index < 64).then_some(Square(index))
    }

    pub fn from_file_rank(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Square(rank * 8 + file))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn file(self) -> u8 {
        file_of(self.0)
    }

    pub fn rank(self) -> u8 {
        rank_of(self.0)
    }
}

impl FromStr for Square {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ClientError::decode("square", s));
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::from_file_rank(file, rank).ok_or_else(|| ClientError::decode("square", s))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&square_name(self.0))
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self)
    }
}

/// A move as carried in `submitMove`'s `moveData`. The registry only reads
/// the two squares; promotion and flags travel along for observers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub flags: u8,
}

impl ChessMove {
    pub fn new(from: Square, to: Square) -> Self {
        ChessMove {
            from,
            to,
            promotion: None,
            flags: 0,
        }
    }

    pub fn with_promotion(mut self, piece: PieceKind) -> Self {
        self.promotion = Some(piece);
        self
    }

    /// Parses long algebraic (UCI) notation: "e2e4", "e7e8q".
    pub fn from_uci(text: &str) -> Result<Self, ClientError> {
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(ClientError::decode("uci move", text));
        }
        let mut mv = ChessMove::new(text[0..2].parse()?, text[2..4].parse()?);
        if let Some(c) = text[4..].chars().next() {
            let piece = PieceKind::from_letter(c)
                .filter(|p| p.is_promotion_target())
                .ok_or_else(|| ClientError::decode("uci move", text))?;
            mv = mv.with_promotion(piece);
        }
        Ok(mv)
    }

    pub fn to_uci(&self) -> String {
        let mut s = format!("{}{}", self.from, self.to);
        if let Some(p) = self.promotion {
            s.push(p.letter());
        }
        s
    }

    pub fn to_bytes(&self) -> [u8; MOVE_DATA_LEN] {
        let from = (self.from.index() as u16).to_be_bytes();
        let to = (self.to.index() as u16).to_be_bytes();
        [from[0], from[1], to[0], to[1], promo_code(self.promotion), self.flags]
    }

    /// Decodes `moveData` as emitted in `moveSubmitted` events. Only the
    /// first four bytes are mandatory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ClientError> {
        if data.len() < 4 {
            return Err(ClientError::decode("move data", format!("{} bytes", data.len())));
        }
        let square = |hi: u8, lo: u8| {
            u8::try_from(u16::from_be_bytes([hi, lo]))
                .ok()
                .and_then(Square::new)
                .ok_or_else(|| ClientError::decode("move data", "square out of range"))
        };
        let promotion = match data.get(4).copied().unwrap_or(PROMO_NONE) {
            PROMO_NONE => None,
            PROMO_QUEEN => Some(PieceKind::Queen),
            PROMO_ROOK => Some(PieceKind::Rook),
            PROMO_BISHOP => Some(PieceKind::Bishop),
            PROMO_KNIGHT => Some(PieceKind::Knight),
            other => {
                return Err(ClientError::decode(
                    "move data",
                    format!("promotion code {other}"),
                ))
            }
        };
        Ok(ChessMove {
            from: square(data[0], data[1])?,
            to: square(data[2], data[3])?,
            promotion,
            flags: data.get(5).copied().unwrap_or(0),
        })
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

fn promo_code(piece: Option<PieceKind>) -> u8 {
    match piece {
        Some(PieceKind::Queen) => PROMO_QUEEN,
        Some(PieceKind::Rook) => PROMO_ROOK,
        Some(PieceKind::Bishop) => PROMO_BISHOP,
        Some(PieceKind::Knight) => PROMO_KNIGHT,
        _ => PROMO_NONE,
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}
