//! FEN parsing and formatting.

use super::error::FenError;
use super::position::Position;
use super::types::{CastlingRights, Color, Piece, Square};

impl Position {
    /// Parse a Forsyth-Edwards record.
    ///
    /// The board and side-to-move fields are mandatory; castling, en
    /// passant, and the move counters default to "-", "-", 0, 1. The
    /// parsed position is validated: both kings present, material within
    /// bounds, no pawns on the back ranks, castling rights consistent
    /// with king/rook placement, and the side not to move not in check.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(FenError::TooFewFields {
                found: fields.len(),
            });
        }

        let mut pos = Position::empty();
        parse_board(&mut pos, fields[0])?;

        let side = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };
        pos.set_side_to_move(side);

        let castling = match fields.get(2) {
            Some(field) => parse_castling(field)?,
            None => CastlingRights::NONE,
        };
        pos.set_castling(castling);

        let en_passant = match fields.get(3) {
            Some(&"-") | None => None,
            Some(field) => {
                let sq: Square = field.parse().map_err(|_| FenError::InvalidEnPassant {
                    found: (*field).to_string(),
                })?;
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(FenError::InvalidEnPassant {
                        found: (*field).to_string(),
                    });
                }
                Some(sq)
            }
        };
        pos.set_en_passant(en_passant);

        let halfmove = parse_counter(fields.get(4), 0)?;
        let fullmove = parse_counter(fields.get(5), 1)?;
        if fields.get(5).is_some() && fullmove == 0 {
            return Err(FenError::InvalidCounter {
                found: (*fields[5]).to_string(),
            });
        }
        pos.set_clocks(halfmove, fullmove.max(1));

        validate(&pos)?;
        Ok(pos)
    }

    /// Format the position as a six-field FEN record.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            fen.push(char::from_digit(empty_run, 10).unwrap());
                            empty_run = 0;
                        }
                        let ch = piece.to_char();
                        fen.push(if color == Color::White {
                            ch.to_ascii_uppercase()
                        } else {
                            ch
                        });
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                fen.push(char::from_digit(empty_run, 10).unwrap());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push_str(&self.side_to_move().to_string());
        fen.push(' ');
        fen.push_str(&self.castling_rights().to_string());
        fen.push(' ');
        match self.en_passant_target() {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(
            " {} {}",
            self.halfmove_clock(),
            self.fullmove_number()
        ));
        fen
    }
}

fn parse_board(pos: &mut Position, field: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadBoardShape);
    }
    for (i, rank_text) in ranks.iter().enumerate() {
        let rank = 7 - i;
        let mut file = 0usize;
        for ch in rank_text.chars() {
            if let Some(skip) = ch.to_digit(10) {
                if skip == 0 || skip > 8 {
                    return Err(FenError::InvalidPiece { ch });
                }
                file += skip as usize;
            } else {
                let piece = Piece::from_char(ch).ok_or(FenError::InvalidPiece { ch })?;
                let color = if ch.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                if file >= 8 {
                    return Err(FenError::BadBoardShape);
                }
                pos.set_piece(Square::new(rank, file), color, piece);
                file += 1;
            }
        }
        if file != 8 {
            return Err(FenError::BadBoardShape);
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<CastlingRights, FenError> {
    let mut rights = CastlingRights::NONE;
    if field == "-" {
        return Ok(rights);
    }
    for ch in field.chars() {
        match ch {
            'K' => rights.grant_short(Color::White),
            'Q' => rights.grant_long(Color::White),
            'k' => rights.grant_short(Color::Black),
            'q' => rights.grant_long(Color::Black),
            _ => return Err(FenError::InvalidCastling { ch }),
        }
    }
    Ok(rights)
}

fn parse_counter(field: Option<&&str>, default: u16) -> Result<u16, FenError> {
    match field {
        None => Ok(default),
        Some(text) => text.parse().map_err(|_| FenError::InvalidCounter {
            found: (*text).to_string(),
        }),
    }
}

fn validate(pos: &Position) -> Result<(), FenError> {
    for color in [Color::White, Color::Black] {
        let side = pos.side(color);
        if side.pieces(Piece::King).count() != 1 {
            return Err(FenError::BadMaterial);
        }
        if side.occupancy().count() > 16 || side.pieces(Piece::Pawn).count() > 8 {
            return Err(FenError::BadMaterial);
        }
    }

    let pawns = pos.pieces(Color::White, Piece::Pawn) | pos.pieces(Color::Black, Piece::Pawn);
    for sq in pawns {
        if sq.rank() == 0 || sq.rank() == 7 {
            return Err(FenError::PawnOnBackRank);
        }
    }

    let rights = pos.castling_rights();
    for (color, king_sq, short_rook, long_rook) in [
        (Color::White, "e1", "h1", "a1"),
        (Color::Black, "e8", "h8", "a8"),
    ] {
        let king_home: Square = king_sq.parse().unwrap();
        let rook_ok = |sq: &str| {
            let sq: Square = sq.parse().unwrap();
            pos.pieces(color, Piece::Rook).contains(sq)
        };
        if rights.has_short(color)
            && (pos.king_square(color) != king_home || !rook_ok(short_rook))
        {
            return Err(FenError::InconsistentCastling);
        }
        if rights.has_long(color) && (pos.king_square(color) != king_home || !rook_ok(long_rook)) {
            return Err(FenError::InconsistentCastling);
        }
    }

    if pos.is_in_check(pos.side_to_move().opponent()) {
        return Err(FenError::OpponentInCheck);
    }
    Ok(())
}
