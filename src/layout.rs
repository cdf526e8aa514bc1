//! Texture Layout & Connection Map
//!
//! Sub-texel packing is a deliberate design choice to keep all per-cell data
//! in a handful of 2-D textures instead of reaching for 3-D texture support.
//! This module documents the packing as named constants rather than magic
//! numbers scattered across the passes, and builds the static connection map.
//!
//! # Packing summary
//!
//! - **Probability** texture: `(2W) x H`, 4 channels. Column parity selects
//!   `c` (even = 0, odd = 1); channel index `n1*2 + n2` selects the neighbour
//!   pair within that half.
//! - **History** texture: `(2W) x (2H)`, 4 channels. `(x%2, y%2)` is
//!   `(c, n1)`; channel index `n2*2 + next` selects the committed outcome.
//! - **Connection** texture: `W x H`, 4 channels, each `{0,128,255}` encoding
//!   `{-1,0,+1}` for `(dx1,dy1,dx2,dy2)`.
//! - **Noise** texture: `W x H`, 4 channels of 8 bits, little-endian `u32`.

/// Channel index within a probability sub-texel for neighbour states `(n1, n2)`.
#[inline]
#[must_use]
pub const fn probability_channel(n1: u8, n2: u8) -> usize {
    (n1 * 2 + n2) as usize
}

/// Channel index within a history sub-texel for `(n2, next)`.
#[inline]
#[must_use]
pub const fn history_channel(n2: u8, next: u8) -> usize {
    (n2 * 2 + next) as usize
}

/// One of the two fixed neighbour-offset pairs used by the checker pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OffsetPair {
    dx1: i8,
    dy1: i8,
    dx2: i8,
    dy2: i8,
}

const HORIZONTAL: OffsetPair = OffsetPair { dx1: -1, dy1: 0, dx2: 1, dy2: 0 };
const VERTICAL: OffsetPair = OffsetPair { dx1: 0, dy1: -1, dx2: 0, dy2: 1 };

/// Encodes an offset in `{-1,0,+1}` as a `{0,128,255}` byte.
const fn encode_offset(v: i8) -> u8 {
    match v {
        -1 => 0,
        0 => 128,
        1 => 255,
        _ => unreachable!(),
    }
}

/// Builds the static `width x height` RGBA8 connection map described in
/// §3/§4.2.
///
/// On even rows columns alternate `HORIZONTAL, VERTICAL, HORIZONTAL, ...`;
/// odd rows start with `VERTICAL` instead (the checker pattern is rotated).
/// `disable_self_inputs` is not a parameter of this map: it never changes
/// which neighbours a cell is wired to, only how the decision shader snippet
/// consumes `c` at read time, so it is handled entirely in the passes that
/// read this texture, not here.
#[must_use]
pub fn build_connection_map(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let row_starts_horizontal = y % 2 == 0;
        for x in 0..width {
            let col_is_even = x % 2 == 0;
            let pair = if col_is_even == row_starts_horizontal {
                HORIZONTAL
            } else {
                VERTICAL
            };
            data.push(encode_offset(pair.dx1));
            data.push(encode_offset(pair.dy1));
            data.push(encode_offset(pair.dx2));
            data.push(encode_offset(pair.dy2));
        }
    }
    data
}
