//! Attack detection by offset scans over the mailbox.

use crate::board::Board;
use crate::color::Color;
use crate::movegen::{BISHOP_DIRS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRS};
use crate::piece::{Piece, PieceKind};
use crate::square::Square;

impl Board {
    /// Return `true` if any piece of `by` attacks `sq`.
    pub fn attacked_by(&self, by: Color, sq: Square) -> bool {
        // Pawns: an attacker sits one rank behind `sq` relative to its
        // own push direction, on an adjacent file.
        let pawn = Piece::new(PieceKind::Pawn, by);
        let dr = -by.forward();
        for df in [-1i8, 1] {
            if let Some(from) = sq.offset(df, dr) {
                if self.squares[from.index()] == pawn {
                    return true;
                }
            }
        }

        let knight = Piece::new(PieceKind::Knight, by);
        for &(df, dr) in &KNIGHT_OFFSETS {
            if let Some(from) = sq.offset(df, dr) {
                if self.squares[from.index()] == knight {
                    return true;
                }
            }
        }

        let king = Piece::new(PieceKind::King, by);
        for &(df, dr) in &KING_OFFSETS {
            if let Some(from) = sq.offset(df, dr) {
                if self.squares[from.index()] == king {
                    return true;
                }
            }
        }

        // Sliders: walk each ray until the first occupied square.
        let queen = Piece::new(PieceKind::Queen, by);
        let bishop = Piece::new(PieceKind::Bishop, by);
        for &(df, dr) in &BISHOP_DIRS {
            if let Some(p) = self.first_piece_on_ray(sq, df, dr) {
                if p == bishop || p == queen {
                    return true;
                }
            }
        }
        let rook = Piece::new(PieceKind::Rook, by);
        for &(df, dr) in &ROOK_DIRS {
            if let Some(p) = self.first_piece_on_ray(sq, df, dr) {
                if p == rook || p == queen {
                    return true;
                }
            }
        }

        false
    }

    /// The first piece encountered walking from `sq` in direction `(df, dr)`.
    fn first_piece_on_ray(&self, sq: Square, df: i8, dr: i8) -> Option<Piece> {
        let mut current = sq;
        while let Some(next) = current.offset(df, dr) {
            let piece = self.squares[next.index()];
            if !piece.is_empty() {
                return Some(piece);
            }
            current = next;
        }
        None
    }

    /// Legality of the last-made move: the side that just moved must not
    /// have left its own king attacked.
    pub fn was_legal_move(&self) -> bool {
        let mover = !self.side_to_move;
        !self.attacked_by(self.side_to_move, self.king_square(mover))
    }
}
