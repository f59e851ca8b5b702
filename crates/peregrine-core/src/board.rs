//! The chess board: a mailbox of piece codes plus side to move, castling,
//! en passant, move counters, and the make/undo history.

use std::fmt;

use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::error::BoardError;
use crate::make_move::Undo;
use crate::piece::{Piece, PieceKind};
use crate::square::Square;
use crate::zobrist;

/// Complete chess position state with in-place make/undo.
///
/// Two boards compare equal when they describe the same position: piece
/// placement, side to move, castling rights, en passant square, and move
/// counters. The make/undo history is not part of the comparison.
#[derive(Clone)]
pub struct Board {
    /// Piece code per square, indexed by [`Square::index`].
    pub(crate) squares: [Piece; 64],
    /// Which side moves next.
    pub(crate) side_to_move: Color,
    /// Current castling rights.
    pub(crate) castling: CastleRights,
    /// En passant target square, if any.
    pub(crate) en_passant: Option<Square>,
    /// Halfmove clock for the fifty-move rule.
    pub(crate) halfmove_clock: u16,
    /// Fullmove number (starts at 1, incremented after Black moves).
    pub(crate) fullmove_number: u16,
    /// Monotonic ply counter since the initial position.
    pub(crate) ply_number: u32,
    /// Zobrist hash of the position.
    pub(crate) hash: u64,
    /// King square per side, kept current by make/undo.
    pub(crate) king_sq: [Square; 2],
    /// Undo records for moves made on this board.
    pub(crate) undo_stack: Vec<Undo>,
    /// Hashes of every position reached, including the current one.
    pub(crate) hash_history: Vec<u64>,
}

impl Board {
    /// Return the standard starting position.
    pub fn starting_position() -> Board {
        crate::fen::STARTING_FEN
            .parse()
            .expect("starting FEN is valid")
    }

    /// Construct a board from parsed FEN components.
    pub(crate) fn from_parts(
        squares: [Piece; 64],
        side_to_move: Color,
        castling: CastleRights,
        en_passant: Option<Square>,
        halfmove_clock: u16,
        fullmove_number: u16,
    ) -> Result<Board, BoardError> {
        let mut king_sq = [Square::A1; 2];
        for color in Color::ALL {
            let king = Piece::new(PieceKind::King, color);
            let mut found = 0;
            for sq in Square::all() {
                if squares[sq.index()] == king {
                    king_sq[color.index()] = sq;
                    found += 1;
                }
            }
            if found != 1 {
                let color_name = match color {
                    Color::White => "white",
                    Color::Black => "black",
                };
                return Err(BoardError::InvalidKingCount {
                    color: color_name,
                    count: found,
                });
            }
        }

        // Ply count reconstructed from the move counters, so root-distance
        // arithmetic works for positions set up from FEN.
        let ply_number =
            (fullmove_number.max(1) as u32 - 1) * 2 + side_to_move.index() as u32;

        let hash = zobrist::hash_position(&squares, side_to_move, castling, en_passant);
        let board = Board {
            squares,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            ply_number,
            hash,
            king_sq,
            undo_stack: Vec::new(),
            hash_history: vec![hash],
        };
        board.validate()?;
        Ok(board)
    }

    /// Return the piece code on the given square.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.squares[sq.index()]
    }

    /// Return the side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Return the current castling rights.
    #[inline]
    pub fn castling(&self) -> CastleRights {
        self.castling
    }

    /// Return the en passant target square, if any.
    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Return the halfmove clock.
    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    /// Return the fullmove number.
    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Monotonic ply counter since the initial position. Increments on
    /// every [`make_move`](Board::make_move), decrements on
    /// [`undo_move`](Board::undo_move).
    #[inline]
    pub fn ply_number(&self) -> u32 {
        self.ply_number
    }

    /// Return the Zobrist hash of the position.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Return the square of the king for the given side.
    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_sq[color.index()]
    }

    /// Return `true` if the side to move is in check.
    pub fn in_check(&self) -> bool {
        self.attacked_by(!self.side_to_move, self.king_square(self.side_to_move))
    }

    /// Return `true` if the position is a draw by threefold repetition or
    /// the fifty-move rule.
    ///
    /// Repetition counts occurrences of the current position in the game
    /// history, scanning back no further than the halfmove clock allows.
    pub fn repetition(&self) -> bool {
        if self.halfmove_clock >= 100 {
            return true;
        }
        let len = self.hash_history.len();
        let lookback = (self.halfmove_clock as usize).min(len - 1);
        let mut count = 1; // the current position
        for &h in self.hash_history[len - 1 - lookback..len - 1].iter().rev() {
            if h == self.hash {
                count += 1;
                if count >= 3 {
                    return true;
                }
            }
        }
        false
    }

    /// Return `true` if a move from `from` to `to` would be a pawn
    /// promotion: a pawn stepping onto the back rank.
    pub fn is_promotion(&self, from: Square, to: Square) -> bool {
        self.squares[from.index()].kind() == Some(PieceKind::Pawn)
            && (to.rank() == 0 || to.rank() == 7)
    }

    /// Validate the structural integrity of the board.
    pub fn validate(&self) -> Result<(), BoardError> {
        for color in Color::ALL {
            let king = Piece::new(PieceKind::King, color);
            let count = self
                .squares
                .iter()
                .filter(|&&p| p == king)
                .count();
            if count != 1 {
                let color_name = match color {
                    Color::White => "white",
                    Color::Black => "black",
                };
                return Err(BoardError::InvalidKingCount {
                    color: color_name,
                    count,
                });
            }
        }

        for sq in Square::all() {
            if self.squares[sq.index()].kind() == Some(PieceKind::Pawn)
                && (sq.rank() == 0 || sq.rank() == 7)
            {
                return Err(BoardError::PawnsOnBackRank);
            }
        }

        if let Some(ep) = self.en_passant {
            let expected = match self.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            if ep.rank() != expected {
                return Err(BoardError::BadEnPassantRank);
            }
        }

        Ok(())
    }

    /// Return a pretty-printable wrapper for this board.
    pub fn pretty(&self) -> PrettyBoard<'_> {
        PrettyBoard(self)
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Board) -> bool {
        self.squares == other.squares
            && self.side_to_move == other.side_to_move
            && self.castling == other.castling
            && self.en_passant == other.en_passant
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
    }
}

impl Eq for Board {}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board(\"{}\")", self)
    }
}

/// Wrapper for pretty-printing a board as an 8x8 grid.
pub struct PrettyBoard<'a>(&'a Board);

impl fmt::Display for PrettyBoard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0u8..8).rev() {
            write!(f, "{}  ", rank + 1)?;
            for file in 0u8..8 {
                let piece = self.0.piece_at(Square::new(file, rank));
                if file < 7 {
                    write!(f, "{piece} ")?;
                } else {
                    write!(f, "{piece}")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
