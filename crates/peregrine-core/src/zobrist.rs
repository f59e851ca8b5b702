//! Zobrist hashing keys for position identity and repetition detection.

use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::piece::Piece;
use crate::square::Square;

const SEED: u64 = 0x70e7_e471_4e47_7d2b;

/// SplitMix64 step. Returns the next key and the advanced state.
const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    (z ^ (z >> 31), state)
}

/// One key per (piece code 1..=12, square) pair, then the side-to-move
/// key, sixteen castling-configuration keys, and eight en-passant file
/// keys, all drawn from a single SplitMix64 stream.
const KEY_COUNT: usize = 12 * 64 + 1 + 16 + 8;

static KEYS: [u64; KEY_COUNT] = {
    let mut keys = [0u64; KEY_COUNT];
    let mut state = SEED;
    let mut i = 0;
    while i < KEY_COUNT {
        let (key, next) = splitmix64(state);
        keys[i] = key;
        state = next;
        i += 1;
    }
    keys
};

const SIDE_INDEX: usize = 12 * 64;
const CASTLING_INDEX: usize = SIDE_INDEX + 1;
const EP_INDEX: usize = CASTLING_INDEX + 16;

#[inline]
fn piece_key(piece: Piece, sq: Square) -> u64 {
    debug_assert!(!piece.is_empty());
    KEYS[(piece.index() - 1) * 64 + sq.index()]
}

/// Compute the Zobrist hash of a position from its components.
///
/// Covers piece placement, side to move, castling rights, and the en
/// passant file; the move counters are deliberately excluded so that
/// repeated positions hash equal.
pub(crate) fn hash_position(
    squares: &[Piece; 64],
    side_to_move: Color,
    castling: CastleRights,
    en_passant: Option<Square>,
) -> u64 {
    let mut hash = 0u64;

    for sq in Square::all() {
        let piece = squares[sq.index()];
        if !piece.is_empty() {
            hash ^= piece_key(piece, sq);
        }
    }

    if side_to_move == Color::Black {
        hash ^= KEYS[SIDE_INDEX];
    }

    hash ^= KEYS[CASTLING_INDEX + castling.bits() as usize];

    if let Some(ep) = en_passant {
        hash ^= KEYS[EP_INDEX + ep.file() as usize];
    }

    hash
}
