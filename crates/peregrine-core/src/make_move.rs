//! In-place move making and unmaking.

use crate::board::Board;
use crate::castle_rights::CastleRights;
use crate::chess_move::{Move, MoveKind};
use crate::color::Color;
use crate::piece::{Piece, PieceKind};
use crate::square::Square;
use crate::zobrist;

/// State saved before a move so it can be undone exactly.
#[derive(Clone)]
pub(crate) struct Undo {
    mv: Move,
    captured: Piece,
    /// Where the captured piece stood (differs from the destination for
    /// en passant captures).
    captured_sq: Square,
    castling: CastleRights,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    hash: u64,
}

/// Castling-right bits that survive a move touching each square.
///
/// Moving from (or capturing on) a king or rook home square clears the
/// corresponding rights: `castling &= MASK[from] & MASK[to]`.
const RIGHTS_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[Square::A1.index()] = 0b1101;
    mask[Square::E1.index()] = 0b1100;
    mask[Square::H1.index()] = 0b1110;
    mask[Square::A8.index()] = 0b0111;
    mask[Square::E8.index()] = 0b0011;
    mask[Square::H8.index()] = 0b1011;
    mask
};

impl Board {
    /// Make a pseudo-legal move on the board.
    ///
    /// Pairs with [`undo_move`](Board::undo_move); every make must be
    /// undone in LIFO order. Legality of the resulting position is
    /// checked separately via [`was_legal_move`](Board::was_legal_move).
    pub fn make_move(&mut self, mv: Move) {
        let us = self.side_to_move;
        let from = mv.source();
        let to = mv.dest();
        let piece = self.squares[from.index()];
        debug_assert!(piece.is_color(us), "no piece of the mover on {from}");

        self.undo_stack.push(Undo {
            mv,
            captured: Piece::Empty,
            captured_sq: to,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
        });
        let undo_index = self.undo_stack.len() - 1;

        self.halfmove_clock += 1;
        self.en_passant = None;

        match mv.kind() {
            MoveKind::Normal => {
                let captured = self.squares[to.index()];
                self.squares[to.index()] = piece;
                self.squares[from.index()] = Piece::Empty;
                if !captured.is_empty() {
                    self.halfmove_clock = 0;
                    self.undo_stack[undo_index].captured = captured;
                }
                if piece.kind() == Some(PieceKind::Pawn) {
                    self.halfmove_clock = 0;
                    if from.rank().abs_diff(to.rank()) == 2 {
                        self.en_passant = from.offset(0, us.forward());
                    }
                }
            }
            MoveKind::Promotion => {
                let captured = self.squares[to.index()];
                self.squares[to.index()] = Piece::new(mv.promotion().to_piece_kind(), us);
                self.squares[from.index()] = Piece::Empty;
                self.halfmove_clock = 0;
                self.undo_stack[undo_index].captured = captured;
            }
            MoveKind::EnPassant => {
                let captured_sq = Square::new(to.file(), from.rank());
                self.undo_stack[undo_index].captured = self.squares[captured_sq.index()];
                self.undo_stack[undo_index].captured_sq = captured_sq;
                self.squares[captured_sq.index()] = Piece::Empty;
                self.squares[to.index()] = piece;
                self.squares[from.index()] = Piece::Empty;
                self.halfmove_clock = 0;
            }
            MoveKind::Castling => {
                let (rook_from, rook_to) = rook_squares(to);
                self.squares[to.index()] = piece;
                self.squares[from.index()] = Piece::Empty;
                self.squares[rook_to.index()] = self.squares[rook_from.index()];
                self.squares[rook_from.index()] = Piece::Empty;
            }
        }

        if piece.kind() == Some(PieceKind::King) {
            self.king_sq[us.index()] = to;
        }

        self.castling = self
            .castling
            .mask(RIGHTS_MASK[from.index()] & RIGHTS_MASK[to.index()]);

        self.side_to_move = !us;
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.ply_number += 1;

        self.hash = zobrist::hash_position(
            &self.squares,
            self.side_to_move,
            self.castling,
            self.en_passant,
        );
        self.hash_history.push(self.hash);
    }

    /// Undo the most recent move.
    ///
    /// # Panics
    ///
    /// Panics if there is no move to undo; an unbalanced make/undo pair
    /// is a programming error with no defined recovery.
    pub fn undo_move(&mut self) {
        let undo = self
            .undo_stack
            .pop()
            .expect("undo_move without a matching make_move");
        self.hash_history.pop();

        let us = !self.side_to_move; // the side that made the move
        let mv = undo.mv;
        let from = mv.source();
        let to = mv.dest();

        let moved = self.squares[to.index()];
        self.squares[to.index()] = Piece::Empty;
        self.squares[from.index()] = if mv.is_promotion() {
            Piece::new(PieceKind::Pawn, us)
        } else {
            moved
        };
        self.squares[undo.captured_sq.index()] = undo.captured;

        if mv.is_castle() {
            let (rook_from, rook_to) = rook_squares(to);
            self.squares[rook_from.index()] = self.squares[rook_to.index()];
            self.squares[rook_to.index()] = Piece::Empty;
        }

        if moved.kind() == Some(PieceKind::King) {
            self.king_sq[us.index()] = from;
        }

        self.side_to_move = us;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
        self.ply_number -= 1;
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.hash = undo.hash;
    }
}

/// The rook's from/to squares for a castling move, keyed by the king's
/// destination.
fn rook_squares(king_to: Square) -> (Square, Square) {
    let rank = king_to.rank();
    if king_to.file() == 6 {
        (Square::new(7, rank), Square::new(5, rank))
    } else {
        (Square::new(0, rank), Square::new(3, rank))
    }
}
