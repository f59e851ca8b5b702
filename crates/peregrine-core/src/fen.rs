//! FEN string parsing and serialization for [`Board`].

use std::fmt;
use std::str::FromStr;

use crate::board::Board;
use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::error::FenError;
use crate::piece::Piece;
use crate::square::Square;

/// The FEN string for the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl FromStr for Board {
    type Err = FenError;

    fn from_str(fen: &str) -> Result<Board, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::WrongFieldCount {
                found: fields.len(),
            });
        }

        // Piece placement, rank 8 first.
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::WrongRankCount {
                found: ranks.len(),
            });
        }

        let mut squares = [Piece::Empty; 64];
        for (rank_index, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_index as u8;
            let mut file: u8 = 0;

            for c in rank_str.chars() {
                if let Some(digit) = c.to_digit(10) {
                    if !(1..=8).contains(&digit) {
                        return Err(FenError::InvalidPieceChar { character: c });
                    }
                    file += digit as u8;
                } else {
                    let piece = Piece::from_fen_char(c)
                        .ok_or(FenError::InvalidPieceChar { character: c })?;
                    if file >= 8 {
                        return Err(FenError::BadRankLength {
                            rank_index,
                            length: file as usize + 1,
                        });
                    }
                    squares[Square::new(file, rank).index()] = piece;
                    file += 1;
                }
            }

            if file != 8 {
                return Err(FenError::BadRankLength {
                    rank_index,
                    length: file as usize,
                });
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidColor {
                    found: other.to_string(),
                });
            }
        };

        let castling = CastleRights::from_fen(fields[2])?;

        let en_passant = if fields[3] == "-" {
            None
        } else {
            Some(
                Square::from_algebraic(fields[3]).ok_or_else(|| FenError::InvalidEnPassant {
                    found: fields[3].to_string(),
                })?,
            )
        };

        let halfmove_clock =
            fields[4]
                .parse::<u16>()
                .map_err(|_| FenError::InvalidMoveCounter {
                    field: "halfmove clock",
                    found: fields[4].to_string(),
                })?;

        let fullmove_number =
            fields[5]
                .parse::<u16>()
                .map_err(|_| FenError::InvalidMoveCounter {
                    field: "fullmove number",
                    found: fields[5].to_string(),
                })?;

        let board = Board::from_parts(
            squares,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        )?;
        Ok(board)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0u8..8).rev() {
            let mut empty_run = 0u8;
            for file in 0u8..8 {
                let piece = self.piece_at(Square::new(file, rank));
                match piece.fen_char() {
                    Some(c) => {
                        if empty_run > 0 {
                            write!(f, "{empty_run}")?;
                            empty_run = 0;
                        }
                        write!(f, "{c}")?;
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                write!(f, "{empty_run}")?;
            }
            if rank > 0 {
                write!(f, "/")?;
            }
        }

        write!(f, " {}", self.side_to_move())?;
        write!(f, " {}", self.castling())?;
        match self.en_passant() {
            Some(sq) => write!(f, " {sq}")?,
            None => write!(f, " -")?,
        }
        write!(f, " {} {}", self.halfmove_clock(), self.fullmove_number())
    }
}
