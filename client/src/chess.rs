//! Bitboard chess rules (standard and Chess960 start positions).
//!
//! The registry never checks legality; this engine backs the opt-in
//! [`LocalRulesEngine`](crate::validator::LocalRulesEngine) and the board
//! commitments computed by [`Position`](crate::position::Position).

use chess_match_registry::types::Color;
use core::cmp::{max, min};
use thiserror::Error;

/// Chess960 index of the classical start position (RNBQKBNR).
pub const STANDARD_START: u16 = 518;
pub const CHESS960_POSITIONS: u16 = 960;

const CASTLE_WK: u8 = 1 << 0;
const CASTLE_WQ: u8 = 1 << 1;
const CASTLE_BK: u8 = 1 << 2;
const CASTLE_BQ: u8 = 1 << 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("square index out of range")]
    OffBoard,
    #[error("no piece on the origin square")]
    EmptyOrigin,
    #[error("the piece on the origin square belongs to the other side")]
    WrongSide,
    #[error("destination holds a piece of the moving side")]
    OwnPieceOnTarget,
    #[error("the piece cannot reach the destination")]
    Unreachable,
    #[error("castling is not allowed here")]
    CastlingNotAllowed,
    #[error("promotion piece is invalid")]
    BadPromotion,
    #[error("the move leaves the king in check")]
    KingInCheck,
}

/// Side effects of a legal move, used by the fifty-move counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveEffect {
    pub capture: bool,
    pub pawn_move: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CastleInfo {
    w_king_start: u8,
    w_rook_ks_start: u8,
    w_rook_qs_start: u8,
    b_king_start: u8,
    b_rook_ks_start: u8,
    b_rook_qs_start: u8,
}

impl CastleInfo {
    fn is_classical(&self) -> bool {
        self.w_king_start == 4
            && self.w_rook_qs_start == 0
            && self.w_rook_ks_start == 7
            && self.b_king_start == 60
            && self.b_rook_qs_start == 56
            && self.b_rook_ks_start == 63
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    bitboards: [u64; 12],
    side_to_move: Color,
    castling: u8,
    ep_square: Option<u8>,
    halfmove_clock: u16,
    fullmove_number: u16,
    castle: CastleInfo,
}

#[inline]
fn color_index(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

#[inline]
fn bb_idx(color: Color, piece: PieceKind) -> usize {
    color_index(color) * 6 + piece as usize
}

#[inline]
fn sq_mask(sq: u8) -> u64 {
    1u64 << (sq as u64)
}

#[inline]
pub fn file_of(sq: u8) -> u8 {
    sq & 7
}

#[inline]
pub fn rank_of(sq: u8) -> u8 {
    sq >> 3
}

#[inline]
fn pop_lsb(bb: &mut u64) -> u8 {
    let lsb = bb.trailing_zeros() as u8;
    *bb &= *bb - 1;
    lsb
}

#[inline]
fn step_ok(file: i8, rank: i8) -> bool {
    (0..8).contains(&file) && (0..8).contains(&rank)
}

#[inline]
fn sq_from_fr(file: i8, rank: i8) -> u8 {
    ((rank as u8) << 3) | (file as u8)
}

fn knight_attacks(sq: u8) -> u64 {
    let f = file_of(sq) as i8;
    let r = rank_of(sq) as i8;
    let deltas = [
        (1, 2),
        (2, 1),
        (2, -1),
        (1, -2),
        (-1, -2),
        (-2, -1),
        (-2, 1),
        (-1, 2),
    ];
    deltas
        .iter()
        .filter(|(df, dr)| step_ok(f + df, r + dr))
        .fold(0u64, |a, (df, dr)| a | sq_mask(sq_from_fr(f + df, r + dr)))
}

fn king_attacks(sq: u8) -> u64 {
    let f = file_of(sq) as i8;
    let r = rank_of(sq) as i8;
    let mut a = 0u64;
    for dr in -1..=1 {
        for df in -1..=1 {
            if (df, dr) != (0, 0) && step_ok(f + df, r + dr) {
                a |= sq_mask(sq_from_fr(f + df, r + dr));
            }
        }
    }
    a
}

fn ray_attacks(sq: u8, df: i8, dr: i8, occ: u64) -> u64 {
    let mut a = 0u64;
    let mut f = file_of(sq) as i8;
    let mut r = rank_of(sq) as i8;
    loop {
        f += df;
        r += dr;
        if !step_ok(f, r) {
            break;
        }
        let m = sq_mask(sq_from_fr(f, r));
        a |= m;
        if occ & m != 0 {
            break;
        }
    }
    a
}

fn bishop_attacks(sq: u8, occ: u64) -> u64 {
    ray_attacks(sq, 1, 1, occ)
        | ray_attacks(sq, 1, -1, occ)
        | ray_attacks(sq, -1, 1, occ)
        | ray_attacks(sq, -1, -1, occ)
}

fn rook_attacks(sq: u8, occ: u64) -> u64 {
    ray_attacks(sq, 1, 0, occ)
        | ray_attacks(sq, -1, 0, occ)
        | ray_attacks(sq, 0, 1, occ)
        | ray_attacks(sq, 0, -1, occ)
}

fn pawn_attacks(sq: u8, color: Color) -> u64 {
    let f = file_of(sq) as i8;
    let r = rank_of(sq) as i8 + pawn_dir(color);
    [-1i8, 1]
        .iter()
        .filter(|df| step_ok(f + *df, r))
        .fold(0u64, |a, df| a | sq_mask(sq_from_fr(f + df, r)))
}

#[inline]
fn pawn_dir(color: Color) -> i8 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

#[inline]
fn home_rank(color: Color) -> u8 {
    match color {
        Color::White => 0,
        Color::Black => 7,
    }
}

// squares strictly between a and b on the same rank or file
fn between_squares(a: u8, b: u8) -> u64 {
    let (af, ar, bf, br) = (file_of(a), rank_of(a), file_of(b), rank_of(b));
    let mut mask = 0u64;
    if a == b {
        return mask;
    }
    if ar == br {
        for f in (min(af, bf) + 1)..max(af, bf) {
            mask |= sq_mask(ar * 8 + f);
        }
    } else if af == bf {
        for r in (min(ar, br) + 1)..max(ar, br) {
            mask |= sq_mask(r * 8 + af);
        }
    }
    mask
}

// king walk along the rank, destination included, origin excluded
fn king_path_squares(from: u8, to: u8) -> u64 {
    if rank_of(from) != rank_of(to) || from == to {
        return 0;
    }
    between_squares(from, to) | sq_mask(to)
}

impl Board {
    /// Classical start position.
    pub fn standard() -> Self {
        Self::start_position(STANDARD_START)
    }

    /// Chess960 start position by its index, `None` outside 0..960.
    pub fn chess960(index: u16) -> Option<Self> {
        (index < CHESS960_POSITIONS).then(|| Self::start_position(index))
    }

    fn start_position(index: u16) -> Self {
        let back = chess960_backrank(index);
        let mut bitboards = [0u64; 12];

        for file in 0..8u8 {
            bitboards[bb_idx(Color::White, back[file as usize])] |= sq_mask(file);
            bitboards[bb_idx(Color::White, PieceKind::Pawn)] |= sq_mask(8 + file);
            bitboards[bb_idx(Color::Black, back[file as usize])] |= sq_mask(56 + file);
            bitboards[bb_idx(Color::Black, PieceKind::Pawn)] |= sq_mask(48 + file);
        }

        let (w_king_start, w_rook_qs_start, w_rook_ks_start) = king_and_rooks(&back, 0);
        let (b_king_start, b_rook_qs_start, b_rook_ks_start) = king_and_rooks(&back, 7);

        Board {
            bitboards,
            side_to_move: Color::White,
            castling: CASTLE_WK | CASTLE_WQ | CASTLE_BK | CASTLE_BQ,
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            castle: CastleInfo {
                w_king_start,
                w_rook_ks_start,
                w_rook_qs_start,
                b_king_start,
                b_rook_ks_start,
                b_rook_qs_start,
            },
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    pub fn piece_at(&self, sq: u8) -> Option<(Color, PieceKind)> {
        let m = sq_mask(sq);
        for color in [Color::White, Color::Black] {
            for piece in PieceKind::ALL {
                if self.bitboards[bb_idx(color, piece)] & m != 0 {
                    return Some((color, piece));
                }
            }
        }
        None
    }

    fn occupied_by(&self, color: Color) -> u64 {
        PieceKind::ALL
            .iter()
            .fold(0u64, |acc, p| acc | self.bitboards[bb_idx(color, *p)])
    }

    fn occupied(&self) -> u64 {
        self.occupied_by(Color::White) | self.occupied_by(Color::Black)
    }

    fn place(&mut self, color: Color, piece: PieceKind, sq: u8) {
        self.bitboards[bb_idx(color, piece)] |= sq_mask(sq);
    }

    fn remove(&mut self, color: Color, piece: PieceKind, sq: u8) {
        self.bitboards[bb_idx(color, piece)] &= !sq_mask(sq);
    }

    pub fn is_square_attacked(&self, sq: u8, by: Color) -> bool {
        let occ = self.occupied();
        let bb = |piece| self.bitboards[bb_idx(by, piece)];

        // A pawn of `by` attacks sq iff a pawn of the other side on sq would attack it.
        if pawn_attacks(sq, by.opposite()) & bb(PieceKind::Pawn) != 0 {
            return true;
        }
        if knight_attacks(sq) & bb(PieceKind::Knight) != 0 {
            return true;
        }
        if bishop_attacks(sq, occ) & (bb(PieceKind::Bishop) | bb(PieceKind::Queen)) != 0 {
            return true;
        }
        if rook_attacks(sq, occ) & (bb(PieceKind::Rook) | bb(PieceKind::Queen)) != 0 {
            return true;
        }
        king_attacks(sq) & bb(PieceKind::King) != 0
    }

    pub fn in_check(&self, color: Color) -> bool {
        let kings = self.bitboards[bb_idx(color, PieceKind::King)];
        if kings == 0 {
            return false;
        }
        self.is_square_attacked(kings.trailing_zeros() as u8, color.opposite())
    }

    /// Applies a move for the side to move. The board is left untouched
    /// when the move is illegal.
    pub fn apply(
        &mut self,
        from: u8,
        to: u8,
        promotion: Option<PieceKind>,
    ) -> Result<MoveEffect, IllegalMove> {
        let mut next = *self;
        let effect = next.apply_unchecked(from, to, promotion)?;
        *self = next;
        Ok(effect)
    }

    fn apply_unchecked(
        &mut self,
        from: u8,
        to: u8,
        promotion: Option<PieceKind>,
    ) -> Result<MoveEffect, IllegalMove> {
        if from >= 64 || to >= 64 {
            return Err(IllegalMove::OffBoard);
        }
        if let Some(p) = promotion {
            if !p.is_promotion_target() {
                return Err(IllegalMove::BadPromotion);
            }
        }

        let side = self.side_to_move;
        let opp = side.opposite();
        let (color, kind) = self.piece_at(from).ok_or(IllegalMove::EmptyOrigin)?;
        if color != side {
            return Err(IllegalMove::WrongSide);
        }

        // from == to only expresses Chess960 castling with the king already
        // on its destination file.
        let castle_target = |sq: u8| {
            let r = rank_of(from);
            rank_of(sq) == r && (sq == r * 8 + 2 || sq == r * 8 + 6)
        };
        if from == to && !(kind == PieceKind::King && castle_target(to)) {
            return Err(IllegalMove::Unreachable);
        }
        if from != to && self.occupied_by(side) & sq_mask(to) != 0 {
            return Err(IllegalMove::OwnPieceOnTarget);
        }

        let mut effect = MoveEffect {
            capture: false,
            pawn_move: false,
        };
        let prev_ep = self.ep_square;
        self.ep_square = None;
        self.remove(side, kind, from);

        if let Some((oc, ok)) = self.piece_at(to) {
            if oc == opp {
                self.remove(oc, ok, to);
                effect.capture = true;
                self.castling = self.clear_rook_right(to, oc);
            }
        }

        match kind {
            PieceKind::Pawn => {
                effect.pawn_move = true;
                self.move_pawn(side, from, to, prev_ep, promotion, &mut effect)?;
            }
            PieceKind::Knight => {
                if knight_attacks(from) & sq_mask(to) == 0 {
                    return Err(IllegalMove::Unreachable);
                }
                self.place(side, kind, to);
            }
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                let occ = self.occupied();
                let reach = match kind {
                    PieceKind::Bishop => bishop_attacks(from, occ),
                    PieceKind::Rook => rook_attacks(from, occ),
                    _ => bishop_attacks(from, occ) | rook_attacks(from, occ),
                };
                if reach & sq_mask(to) == 0 {
                    return Err(IllegalMove::Unreachable);
                }
                if kind == PieceKind::Rook {
                    self.castling = self.clear_rook_right(from, side);
                }
                self.place(side, kind, to);
            }
            PieceKind::King => {
                let one_step = king_attacks(from) & sq_mask(to) != 0;
                if castle_target(to) && !(one_step && !self.castle_intent(side, from, to)) {
                    if effect.capture {
                        return Err(IllegalMove::CastlingNotAllowed);
                    }
                    self.castle(side, from, to)?;
                } else {
                    if !one_step {
                        return Err(IllegalMove::Unreachable);
                    }
                    self.castling &= !rights_of(side);
                    self.place(side, kind, to);
                }
            }
        }

        if self.in_check(side) {
            return Err(IllegalMove::KingInCheck);
        }

        if effect.pawn_move || effect.capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if side == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = opp;
        Ok(effect)
    }

    fn move_pawn(
        &mut self,
        side: Color,
        from: u8,
        to: u8,
        prev_ep: Option<u8>,
        promotion: Option<PieceKind>,
        effect: &mut MoveEffect,
    ) -> Result<(), IllegalMove> {
        let dir = pawn_dir(side);
        let (from_f, from_r) = (file_of(from) as i8, rank_of(from) as i8);
        let (to_f, to_r) = (file_of(to) as i8, rank_of(to) as i8);
        let (df, dr) = (to_f - from_f, to_r - from_r);
        let occ = self.occupied();

        if df.abs() == 1 && dr == dir && Some(to) == prev_ep {
            // En passant: the captured pawn sits behind the target square.
            let cap_sq = sq_from_fr(to_f, to_r - dir);
            let opp = side.opposite();
            if self.bitboards[bb_idx(opp, PieceKind::Pawn)] & sq_mask(cap_sq) == 0 {
                return Err(IllegalMove::Unreachable);
            }
            self.remove(opp, PieceKind::Pawn, cap_sq);
            effect.capture = true;
        } else if df == 0 && dr == dir {
            if effect.capture || occ & sq_mask(to) != 0 {
                return Err(IllegalMove::Unreachable);
            }
        } else if df == 0 && dr == 2 * dir {
            let start_rank = if side == Color::White { 1 } else { 6 };
            let mid = sq_from_fr(from_f, from_r + dir);
            if effect.capture || from_r != start_rank || occ & (sq_mask(mid) | sq_mask(to)) != 0 {
                return Err(IllegalMove::Unreachable);
            }
            self.ep_square = Some(mid);
        } else if !(df.abs() == 1 && dr == dir && effect.capture) {
            return Err(IllegalMove::Unreachable);
        }

        let last_rank = home_rank(side.opposite()) as i8;
        if to_r == last_rank {
            self.place(side, promotion.unwrap_or(PieceKind::Queen), to);
        } else if promotion.is_some() {
            return Err(IllegalMove::BadPromotion);
        } else {
            self.place(side, PieceKind::Pawn, to);
        }
        Ok(())
    }

    // A one-step king move onto c/g is an ordinary move unless a castling
    // right for that wing is still held.
    fn castle_intent(&self, side: Color, from: u8, to: u8) -> bool {
        let (right, _, _) = self.castle_squares(side, file_of(to) == 6, rank_of(from));
        self.castling & right != 0 && from == self.king_start(side)
    }

    fn king_start(&self, side: Color) -> u8 {
        match side {
            Color::White => self.castle.w_king_start,
            Color::Black => self.castle.b_king_start,
        }
    }

    fn castle_squares(&self, side: Color, kingside: bool, rank: u8) -> (u8, u8, u8) {
        match (side, kingside) {
            (Color::White, true) => (CASTLE_WK, self.castle.w_rook_ks_start, rank * 8 + 5),
            (Color::White, false) => (CASTLE_WQ, self.castle.w_rook_qs_start, rank * 8 + 3),
            (Color::Black, true) => (CASTLE_BK, self.castle.b_rook_ks_start, rank * 8 + 5),
            (Color::Black, false) => (CASTLE_BQ, self.castle.b_rook_qs_start, rank * 8 + 3),
        }
    }

    // The king has already been lifted from `king_from`.
    fn castle(&mut self, side: Color, king_from: u8, king_to: u8) -> Result<(), IllegalMove> {
        let rank = rank_of(king_from);
        if rank != home_rank(side) || king_from != self.king_start(side) {
            return Err(IllegalMove::CastlingNotAllowed);
        }
        let (right, rook_from, rook_to) = self.castle_squares(side, file_of(king_to) == 6, rank);
        if self.castling & right == 0
            || self.bitboards[bb_idx(side, PieceKind::Rook)] & sq_mask(rook_from) == 0
        {
            return Err(IllegalMove::CastlingNotAllowed);
        }

        // Everything the king and rook cross must be empty, apart from the
        // two castling pieces themselves.
        let mut others = self.occupied() & !sq_mask(rook_from);
        others &= !sq_mask(king_from);
        let travel = between_squares(king_from, rook_from)
            | king_path_squares(king_from, king_to)
            | between_squares(rook_from, rook_to)
            | sq_mask(rook_to);
        if others & travel != 0 {
            return Err(IllegalMove::CastlingNotAllowed);
        }

        // The king may not castle out of, through, or into check.
        let opp = side.opposite();
        let mut path = king_path_squares(king_from, king_to) | sq_mask(king_from);
        while path != 0 {
            let sq = pop_lsb(&mut path);
            self.place(side, PieceKind::King, sq);
            let attacked = self.is_square_attacked(sq, opp);
            self.remove(side, PieceKind::King, sq);
            if attacked {
                return Err(IllegalMove::CastlingNotAllowed);
            }
        }

        self.remove(side, PieceKind::Rook, rook_from);
        self.place(side, PieceKind::King, king_to);
        self.place(side, PieceKind::Rook, rook_to);
        self.castling &= !rights_of(side);
        Ok(())
    }

    fn clear_rook_right(&self, sq: u8, color: Color) -> u8 {
        let ci = self.castle;
        let mut c = self.castling;
        match color {
            Color::White => {
                if sq == ci.w_rook_ks_start {
                    c &= !CASTLE_WK;
                }
                if sq == ci.w_rook_qs_start {
                    c &= !CASTLE_WQ;
                }
            }
            Color::Black => {
                if sq == ci.b_rook_ks_start {
                    c &= !CASTLE_BK;
                }
                if sq == ci.b_rook_qs_start {
                    c &= !CASTLE_BQ;
                }
            }
        }
        c
    }

    /// Existence check only: stops at the first legal move found.
    pub fn has_any_legal_move(&self) -> bool {
        let side = self.side_to_move;
        let own = self.occupied_by(side);
        let occ = self.occupied();

        for piece in PieceKind::ALL {
            let mut bb = self.bitboards[bb_idx(side, piece)];
            while bb != 0 {
                let from = pop_lsb(&mut bb);
                let mut targets = match piece {
                    PieceKind::Pawn => {
                        let mut t = pawn_attacks(from, side) & self.occupied_by(side.opposite());
                        if let Some(ep) = self.ep_square {
                            t |= pawn_attacks(from, side) & sq_mask(ep);
                        }
                        let r = rank_of(from) as i8 + pawn_dir(side);
                        if step_ok(file_of(from) as i8, r) {
                            t |= sq_mask(sq_from_fr(file_of(from) as i8, r)) & !occ;
                            let r2 = r + pawn_dir(side);
                            if step_ok(file_of(from) as i8, r2) {
                                t |= sq_mask(sq_from_fr(file_of(from) as i8, r2)) & !occ;
                            }
                        }
                        t
                    }
                    PieceKind::Knight => knight_attacks(from) & !own,
                    PieceKind::Bishop => bishop_attacks(from, occ) & !own,
                    PieceKind::Rook => rook_attacks(from, occ) & !own,
                    PieceKind::Queen => (bishop_attacks(from, occ) | rook_attacks(from, occ)) & !own,
                    PieceKind::King => {
                        let rank = rank_of(from);
                        (king_attacks(from) & !own) | sq_mask(rank * 8 + 2) | sq_mask(rank * 8 + 6)
                    }
                };
                while targets != 0 {
                    let to = pop_lsb(&mut targets);
                    let mut probe = *self;
                    if probe.apply_unchecked(from, to, None).is_ok() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Dead positions: bare kings, a single minor piece, or same-colored
    /// bishops only.
    pub fn insufficient_material(&self) -> bool {
        let bb = |c, p| self.bitboards[bb_idx(c, p)];
        let heavy_or_pawns = [Color::White, Color::Black].iter().any(|c| {
            bb(*c, PieceKind::Pawn) | bb(*c, PieceKind::Rook) | bb(*c, PieceKind::Queen) != 0
        });
        if heavy_or_pawns {
            return false;
        }

        let minors = |c| bb(c, PieceKind::Bishop) | bb(c, PieceKind::Knight);
        let (w, b) = (
            minors(Color::White).count_ones(),
            minors(Color::Black).count_ones(),
        );
        match (w, b) {
            (0, 0) | (1, 0) | (0, 1) => true,
            (1, 1) => {
                let wb = bb(Color::White, PieceKind::Bishop);
                let bbp = bb(Color::Black, PieceKind::Bishop);
                if wb == 0 || bbp == 0 {
                    return false;
                }
                let shade = |sq: u8| (file_of(sq) + rank_of(sq)) & 1;
                shade(wb.trailing_zeros() as u8) == shade(bbp.trailing_zeros() as u8)
            }
            _ => false,
        }
    }

    /// Repetition key: placement, side to move, castling rights and the
    /// en passant square.
    pub fn repetition_key(&self) -> u64 {
        let mut h = 0xcbf29ce484222325u64;
        for color in [Color::White, Color::Black] {
            for piece in PieceKind::ALL {
                let mut bb = self.bitboards[bb_idx(color, piece)];
                let pid = bb_idx(color, piece) as u64;
                while bb != 0 {
                    let sq = pop_lsb(&mut bb) as u64;
                    h ^= splitmix64(0xfeedfacedeadbeefu64 ^ ((pid << 6) ^ sq));
                }
            }
        }
        h ^= splitmix64(0xabad1deaa55aa55au64 ^ color_index(self.side_to_move) as u64);
        h ^= splitmix64(0x1234_5678_9abc_def0u64 ^ self.castling as u64);
        if let Some(ep) = self.ep_square {
            h ^= splitmix64(0x0ddc0ffeebadf00du64 ^ ep as u64);
        }
        h
    }

    /// Forsyth-Edwards notation. Chess960 starts use Shredder-FEN castling
    /// letters (rook files) instead of KQkq.
    pub fn fen(&self) -> String {
        let mut out = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.piece_at(rank * 8 + file) {
                    None => empty += 1,
                    Some((color, piece)) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        let c = piece.letter();
                        out.push(if color == Color::White {
                            c.to_ascii_uppercase()
                        } else {
                            c
                        });
                    }
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        out.push_str(&self.castling_field());

        out.push(' ');
        match self.ep_square {
            Some(sq) => out.push_str(&square_name(sq)),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }

    fn castling_field(&self) -> String {
        let ci = self.castle;
        let classical = ci.is_classical();
        let rights = [
            (CASTLE_WK, 'K', ci.w_rook_ks_start, true),
            (CASTLE_WQ, 'Q', ci.w_rook_qs_start, true),
            (CASTLE_BK, 'k', ci.b_rook_ks_start, false),
            (CASTLE_BQ, 'q', ci.b_rook_qs_start, false),
        ];
        let field: String = rights
            .iter()
            .filter(|(bit, ..)| self.castling & bit != 0)
            .map(|(_, letter, rook_sq, white)| {
                if classical {
                    *letter
                } else {
                    let file = char::from(b'a' + file_of(*rook_sq));
                    if *white {
                        file.to_ascii_uppercase()
                    } else {
                        file
                    }
                }
            })
            .collect();
        if field.is_empty() {
            "-".to_string()
        } else {
            field
        }
    }
}

fn rights_of(side: Color) -> u8 {
    match side {
        Color::White => CASTLE_WK | CASTLE_WQ,
        Color::Black => CASTLE_BK | CASTLE_BQ,
    }
}

pub fn square_name(sq: u8) -> String {
    format!(
        "{}{}",
        char::from(b'a' + file_of(sq)),
        char::from(b'1' + rank_of(sq))
    )
}

fn chess960_backrank(pos: u16) -> [PieceKind; 8] {
    // - 4 options for the light-square bishop (b,d,f,h)  => pos % 4
    // - 4 options for the dark-square bishop (a,c,e,g)   => (pos/4) % 4
    // - 6 options for the queen among the free squares   => (pos/16) % 6
    // - 10 knight pairs among the 5 free squares         => pos/96
    // The last three squares are always R, K, R.
    let pos = pos as usize;
    let mut slots: [Option<PieceKind>; 8] = [None; 8];
    slots[(pos % 4) * 2 + 1] = Some(PieceKind::Bishop);
    slots[((pos / 4) % 4) * 2] = Some(PieceKind::Bishop);

    let free = |slots: &[Option<PieceKind>; 8]| -> Vec<usize> {
        (0..8).filter(|i| slots[*i].is_none()).collect()
    };

    let q_file = free(&slots)[(pos / 16) % 6];
    slots[q_file] = Some(PieceKind::Queen);

    let rem = free(&slots);
    let pairs: Vec<(usize, usize)> = (0..rem.len())
        .flat_map(|i| ((i + 1)..rem.len()).map(move |j| (i, j)))
        .collect();
    let (n1, n2) = pairs[pos / 96];
    slots[rem[n1]] = Some(PieceKind::Knight);
    slots[rem[n2]] = Some(PieceKind::Knight);

    let last = free(&slots);
    slots[last[0]] = Some(PieceKind::Rook);
    slots[last[1]] = Some(PieceKind::King);
    slots[last[2]] = Some(PieceKind::Rook);

    slots.map(|s| s.unwrap_or(PieceKind::Pawn))
}

// (king, queenside rook, kingside rook) squares on `rank`
fn king_and_rooks(back: &[PieceKind; 8], rank: u8) -> (u8, u8, u8) {
    let files = |kind: PieceKind| (0..8u8).filter(move |f| back[*f as usize] == kind);
    let king = files(PieceKind::King).next().unwrap_or(4);
    let mut rooks = files(PieceKind::Rook);
    let qs = rooks.next().unwrap_or(0);
    let ks = rooks.next().unwrap_or(7);
    (rank * 8 + king, rank * 8 + qs, rank * 8 + ks)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(board: &mut Board, moves: &[(u8, u8)]) {
        for (from, to) in moves {
            board
                .apply(*from, *to, None)
                .unwrap_or_else(|e| panic!("{} -> {}: {}", from, to, e));
        }
    }

    #[test]
    fn standard_start_fen() {
        assert_eq!(
            Board::standard().fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn chess960_backranks_are_valid() {
        for idx in 0..CHESS960_POSITIONS {
            let back = chess960_backrank(idx);
            let king = back.iter().position(|p| *p == PieceKind::King).unwrap();
            let rooks: Vec<usize> = (0..8).filter(|i| back[*i] == PieceKind::Rook).collect();
            assert_eq!(rooks.len(), 2, "index {}", idx);
            assert!(rooks[0] < king && king < rooks[1], "index {}", idx);
            let bishops: Vec<usize> = (0..8).filter(|i| back[*i] == PieceKind::Bishop).collect();
            assert_ne!(bishops[0] % 2, bishops[1] % 2, "index {}", idx);
        }
    }

    #[test]
    fn chess960_index_is_bounded() {
        assert!(Board::chess960(CHESS960_POSITIONS - 1).is_some());
        assert!(Board::chess960(CHESS960_POSITIONS).is_none());
        assert_eq!(
            Board::chess960(STANDARD_START).map(|b| b.fen()),
            Some(Board::standard().fen())
        );
    }

    #[test]
    fn double_push_sets_en_passant_square() {
        let mut b = Board::standard();
        play(&mut b, &[(12, 28)]);
        assert_eq!(
            b.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn illegal_moves_leave_board_untouched() {
        let mut b = Board::standard();
        let before = b;
        assert_eq!(b.apply(12, 36, None), Err(IllegalMove::Unreachable));
        assert_eq!(b.apply(52, 36, None), Err(IllegalMove::WrongSide));
        assert_eq!(b.apply(20, 28, None), Err(IllegalMove::EmptyOrigin));
        assert_eq!(b.apply(3, 11, None), Err(IllegalMove::OwnPieceOnTarget));
        assert_eq!(b.apply(12, 64, None), Err(IllegalMove::OffBoard));
        assert_eq!(b, before);
    }

    #[test]
    fn en_passant_capture() {
        let mut b = Board::standard();
        // e4 a6 e5 d5 exd6
        play(&mut b, &[(12, 28), (48, 40), (28, 36), (51, 35), (36, 43)]);
        assert_eq!(b.piece_at(35), None);
        assert_eq!(b.piece_at(43), Some((Color::White, PieceKind::Pawn)));
        assert_eq!(b.halfmove_clock(), 0);
    }

    #[test]
    fn kingside_castling() {
        let mut b = Board::standard();
        // e4 e5 Nf3 Nc6 Bc4 Bc5 O-O
        play(
            &mut b,
            &[(12, 28), (52, 36), (6, 21), (57, 42), (5, 26), (61, 34), (4, 6)],
        );
        assert_eq!(b.piece_at(6), Some((Color::White, PieceKind::King)));
        assert_eq!(b.piece_at(5), Some((Color::White, PieceKind::Rook)));
        assert!(b.fen().contains(" b kq "));
    }

    #[test]
    fn castling_through_pieces_is_rejected() {
        let mut b = Board::standard();
        // e4 e5 Nf3 Nc6, the f1 bishop still blocks
        play(&mut b, &[(12, 28), (52, 36), (6, 21), (57, 42)]);
        assert_eq!(b.apply(4, 6, None), Err(IllegalMove::CastlingNotAllowed));
    }

    #[test]
    fn check_must_be_answered() {
        let mut b = Board::standard();
        // e4 e5 d4 Bb4+
        play(&mut b, &[(12, 28), (52, 36), (11, 27), (61, 25)]);
        assert!(b.in_check(Color::White));
        assert_eq!(b.apply(15, 23, None), Err(IllegalMove::KingInCheck));
        play(&mut b, &[(10, 18)]);
        assert!(!b.in_check(Color::White));
    }

    #[test]
    fn fools_mate_has_no_legal_reply() {
        let mut b = Board::standard();
        // f3 e5 g4 Qh4#
        play(&mut b, &[(13, 21), (52, 36), (14, 30), (59, 31)]);
        assert!(b.in_check(Color::White));
        assert!(!b.has_any_legal_move());
    }

    #[test]
    fn bare_kings_are_insufficient() {
        let mut b = Board::standard();
        b.bitboards = [0; 12];
        b.place(Color::White, PieceKind::King, 4);
        b.place(Color::Black, PieceKind::King, 60);
        assert!(b.insufficient_material());
        b.place(Color::White, PieceKind::Knight, 10);
        assert!(b.insufficient_material());
        b.place(Color::Black, PieceKind::Rook, 63);
        assert!(!b.insufficient_material());
    }
}
