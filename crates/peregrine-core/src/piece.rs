//! Piece codes for the mailbox board.
//!
//! A square holds a single `Piece` code: 0 for an empty square, then six
//! codes per color. The numeric layout is part of the board's public
//! contract — callers index value tables directly by [`Piece::index`].

use std::fmt;

use crate::color::Color;

/// The kind of a chess piece, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    /// Total number of piece kinds.
    pub const COUNT: usize = 6;

    /// All kinds in index order.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Return the index (0..6).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The lowercase FEN character for this kind.
    pub const fn fen_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    /// Parse a FEN piece character (either case) into a kind.
    pub const fn from_fen_char(c: char) -> Option<PieceKind> {
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
}

/// A colored piece code as stored in the board's square array.
///
/// `Empty = 0`, White pieces are 1..=6, Black pieces are 7..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Piece {
    #[default]
    Empty = 0,
    WhitePawn = 1,
    WhiteKnight = 2,
    WhiteBishop = 3,
    WhiteRook = 4,
    WhiteQueen = 5,
    WhiteKing = 6,
    BlackPawn = 7,
    BlackKnight = 8,
    BlackBishop = 9,
    BlackRook = 10,
    BlackQueen = 11,
    BlackKing = 12,
}

impl Piece {
    /// Number of distinct codes, including `Empty`.
    pub const COUNT: usize = 13;

    /// Build a colored piece code from kind and color.
    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Piece {
        let code = 1 + kind as u8 + 6 * color as u8;
        // Safety by construction: code is always in 1..=12.
        match code {
            1 => Piece::WhitePawn,
            2 => Piece::WhiteKnight,
            3 => Piece::WhiteBishop,
            4 => Piece::WhiteRook,
            5 => Piece::WhiteQueen,
            6 => Piece::WhiteKing,
            7 => Piece::BlackPawn,
            8 => Piece::BlackKnight,
            9 => Piece::BlackBishop,
            10 => Piece::BlackRook,
            11 => Piece::BlackQueen,
            _ => Piece::BlackKing,
        }
    }

    /// Return the numeric code (0..13), usable as a table index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Return `true` for the empty-square code.
    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Piece::Empty)
    }

    /// Return the kind, or `None` for an empty square.
    #[inline]
    pub const fn kind(self) -> Option<PieceKind> {
        match self as u8 {
            0 => None,
            code => Some(PieceKind::ALL[((code - 1) % 6) as usize]),
        }
    }

    /// Return the color, or `None` for an empty square.
    #[inline]
    pub const fn color(self) -> Option<Color> {
        match self as u8 {
            0 => None,
            1..=6 => Some(Color::White),
            _ => Some(Color::Black),
        }
    }

    /// Return `true` if this is a piece of the given color.
    #[inline]
    pub const fn is_color(self, color: Color) -> bool {
        match self.color() {
            Some(c) => c as u8 == color as u8,
            None => false,
        }
    }

    /// Return `true` if this is the given kind of piece of the given color.
    #[inline]
    pub const fn is(self, kind: PieceKind, color: Color) -> bool {
        self as u8 == Piece::new(kind, color) as u8
    }

    /// The FEN character (uppercase for White), or `None` for `Empty`.
    pub const fn fen_char(self) -> Option<char> {
        match (self.kind(), self.color()) {
            (Some(kind), Some(Color::White)) => Some(kind.fen_char().to_ascii_uppercase()),
            (Some(kind), Some(Color::Black)) => Some(kind.fen_char()),
            _ => None,
        }
    }

    /// Parse a FEN piece character into a colored piece code.
    pub const fn from_fen_char(c: char) -> Option<Piece> {
        match PieceKind::from_fen_char(c) {
            Some(kind) => {
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                Some(Piece::new(kind, color))
            }
            None => None,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char().unwrap_or('.'))
    }
}
