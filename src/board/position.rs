//! Position state and board queries.

use std::fmt;

use super::attack_tables::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use super::types::{
    Bitboard, CastlingRights, Color, Piece, Square, ALL_PIECES, DARK_SQUARES, LIGHT_SQUARES,
};
use super::zobrist::ZOBRIST;

/// One side's piece bitboards plus their union.
///
/// Invariants: exactly one king bit; the six kind boards are pairwise
/// disjoint; their union equals `occupancy`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SidePosition {
    pieces: [Bitboard; 6],
    occupancy: Bitboard,
}

impl SidePosition {
    #[inline]
    #[must_use]
    pub const fn pieces(&self, piece: Piece) -> Bitboard {
        self.pieces[piece.index()]
    }

    #[inline]
    #[must_use]
    pub const fn occupancy(&self) -> Bitboard {
        self.occupancy
    }

    /// The king square. Only valid on a position holding both kings.
    #[inline]
    #[must_use]
    pub fn king_square(&self) -> Square {
        debug_assert_eq!(self.pieces(Piece::King).count(), 1);
        self.pieces[Piece::King.index()]
            .first()
            .expect("side has no king")
    }

    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        if !self.occupancy.contains(sq) {
            return None;
        }
        ALL_PIECES.into_iter().find(|&p| self.pieces(p).contains(sq))
    }

    fn set(&mut self, sq: Square, piece: Piece) {
        self.pieces[piece.index()].set(sq);
        self.occupancy.set(sq);
    }

    fn clear(&mut self, sq: Square, piece: Piece) {
        self.pieces[piece.index()].clear(sq);
        self.occupancy.clear(sq);
    }
}

/// Full board state. Copied by value down the search tree, so it carries
/// no heap data and no undo information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub(crate) sides: [SidePosition; 2],
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u16,
    pub(crate) fullmove_number: u16,
    pub(crate) hash: u64,
}

impl Position {
    /// An empty board, White to move. Used by the FEN parser.
    #[must_use]
    pub(crate) fn empty() -> Self {
        Position {
            sides: [SidePosition::default(); 2],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
        }
    }

    /// The standard starting position.
    #[must_use]
    pub fn startpos() -> Self {
        const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        Self::from_fen(START_FEN).expect("start FEN is valid")
    }

    #[inline]
    #[must_use]
    pub const fn side(&self, color: Color) -> &SidePosition {
        &self.sides[color.index()]
    }

    #[inline]
    #[must_use]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    #[must_use]
    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    #[must_use]
    pub const fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    #[must_use]
    pub const fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub const fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// All occupied squares.
    #[inline]
    #[must_use]
    pub fn occupancy(&self) -> Bitboard {
        self.sides[0].occupancy() | self.sides[1].occupancy()
    }

    #[inline]
    #[must_use]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.side(color).pieces(piece)
    }

    #[inline]
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        self.side(color).king_square()
    }

    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        for color in [Color::White, Color::Black] {
            if let Some(piece) = self.side(color).piece_at(sq) {
                return Some((color, piece));
            }
        }
        None
    }

    #[inline]
    #[must_use]
    pub fn is_empty_square(&self, sq: Square) -> bool {
        !self.occupancy().contains(sq)
    }

    /// Place a piece and fold it into the hash.
    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        self.sides[color.index()].set(sq, piece);
        self.hash ^= ZOBRIST.piece(color, piece, sq);
    }

    /// Remove a piece and fold it out of the hash.
    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        self.sides[color.index()].clear(sq, piece);
        self.hash ^= ZOBRIST.piece(color, piece, sq);
    }

    pub(crate) fn set_side_to_move(&mut self, color: Color) {
        if self.side_to_move != color {
            self.hash ^= ZOBRIST.black_to_move;
        }
        self.side_to_move = color;
    }

    pub(crate) fn set_castling(&mut self, rights: CastlingRights) {
        self.hash ^= ZOBRIST.castling_rights(self.castling);
        self.hash ^= ZOBRIST.castling_rights(rights);
        self.castling = rights;
    }

    pub(crate) fn set_en_passant(&mut self, target: Option<Square>) {
        if let Some(old) = self.en_passant {
            self.hash ^= ZOBRIST.en_passant_file[old.file()];
        }
        if let Some(new) = target {
            self.hash ^= ZOBRIST.en_passant_file[new.file()];
        }
        self.en_passant = target;
    }

    pub(crate) fn set_clocks(&mut self, halfmove: u16, fullmove: u16) {
        self.halfmove_clock = halfmove;
        self.fullmove_number = fullmove;
    }

    /// Recompute the hash from scratch. Equal to the stored hash at all
    /// times outside make-move; debug builds assert this at every node.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for piece in ALL_PIECES {
                for sq in self.pieces(color, piece) {
                    hash ^= ZOBRIST.piece(color, piece, sq);
                }
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= ZOBRIST.black_to_move;
        }
        hash ^= ZOBRIST.castling_rights(self.castling);
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.en_passant_file[ep.file()];
        }
        hash
    }

    /// All pieces of `by_color` attacking `sq`, under the given occupancy.
    #[must_use]
    pub fn attackers_of_with_occupancy(
        &self,
        sq: Square,
        by_color: Color,
        occupancy: Bitboard,
    ) -> Bitboard {
        let side = self.side(by_color);
        let mut attackers = Bitboard::EMPTY;
        // A pawn of `by_color` attacks sq iff it stands on a square that a
        // pawn of the opposite color on sq would attack.
        attackers |= pawn_attacks(sq, by_color.opponent()) & side.pieces(Piece::Pawn);
        attackers |= knight_attacks(sq) & side.pieces(Piece::Knight);
        attackers |= king_attacks(sq) & side.pieces(Piece::King);
        let diagonal = side.pieces(Piece::Bishop) | side.pieces(Piece::Queen);
        attackers |= bishop_attacks(sq, occupancy) & diagonal;
        let straight = side.pieces(Piece::Rook) | side.pieces(Piece::Queen);
        attackers |= rook_attacks(sq, occupancy) & straight;
        attackers
    }

    /// All pieces of `by_color` attacking `sq`.
    #[inline]
    #[must_use]
    pub fn attackers_of(&self, sq: Square, by_color: Color) -> Bitboard {
        self.attackers_of_with_occupancy(sq, by_color, self.occupancy())
    }

    #[inline]
    #[must_use]
    pub fn is_attacked(&self, sq: Square, by_color: Color) -> bool {
        !self.attackers_of(sq, by_color).is_empty()
    }

    /// True iff `color`'s king is attacked.
    #[inline]
    #[must_use]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_attacked(self.king_square(color), color.opponent())
    }

    /// Non-pawn, non-king material for `color`. Gates null-move pruning.
    #[must_use]
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let side = self.side(color);
        let pawns_and_king = side.pieces(Piece::Pawn) | side.pieces(Piece::King);
        side.occupancy() != pawns_and_king
    }

    /// Draw by bare material: K-K, K+minor-K, and K+B-K+B with both
    /// bishops on the same square color.
    #[must_use]
    pub fn is_insufficient_material(&self) -> bool {
        let majors_or_pawns = [Piece::Pawn, Piece::Rook, Piece::Queen]
            .into_iter()
            .any(|p| {
                !(self.pieces(Color::White, p) | self.pieces(Color::Black, p)).is_empty()
            });
        if majors_or_pawns {
            return false;
        }

        let knights = self.pieces(Color::White, Piece::Knight) | self.pieces(Color::Black, Piece::Knight);
        let bishops = self.pieces(Color::White, Piece::Bishop) | self.pieces(Color::Black, Piece::Bishop);
        let minors = knights.count() + bishops.count();

        if minors <= 1 {
            return true;
        }
        if knights.is_empty() && bishops.count() == 2 {
            // One bishop each (same side's pair can still mate with help,
            // but two bishops on one color never can).
            return (bishops & LIGHT_SQUARES).is_empty() || (bishops & DARK_SQUARES).is_empty();
        }
        false
    }

    /// Debug-build structural check: disjoint kind boards, occupancy
    /// unions, single kings, and hash consistency.
    #[cfg(debug_assertions)]
    pub(crate) fn assert_consistent(&self) {
        for color in [Color::White, Color::Black] {
            let side = self.side(color);
            let mut union = Bitboard::EMPTY;
            for piece in ALL_PIECES {
                let bb = side.pieces(piece);
                assert!(
                    (union & bb).is_empty(),
                    "{color:?} {piece:?} overlaps another kind"
                );
                union |= bb;
            }
            assert_eq!(union, side.occupancy(), "{color:?} occupancy out of sync");
            assert_eq!(side.pieces(Piece::King).count(), 1, "{color:?} king count");
        }
        assert!(
            (self.sides[0].occupancy() & self.sides[1].occupancy()).is_empty(),
            "colors overlap"
        );
        assert_eq!(self.hash, self.compute_hash(), "stored hash diverged");
    }
}

impl fmt::Display for Position {
    /// Board diagram, rank 8 on top, uppercase = White.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let ch = match self.piece_at(Square::new(rank, file)) {
                    Some((Color::White, p)) => p.to_char().to_ascii_uppercase(),
                    Some((Color::Black, p)) => p.to_char(),
                    None => '.',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{} to move", self.side_to_move)
    }
}
