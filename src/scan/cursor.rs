//! Bit-Cursor Navigation
//!
//! The parser walks the raw buffer and the bitmaps in lockstep. A byte offset
//! `p` in the buffer is bit `p % 8` of byte `p / 8` in every bitmap, so a
//! single [`BitCursor`] addresses all of them at once. [`Lockstep`] bundles
//! the cursor with the borrowed buffer and bitmaps and offers the lookups the
//! state machine needs: test a class at the cursor, measure a run, find the
//! next set bit within a 24-bit window.

use super::{Bitmaps, ByteClass};

/// Bits covered by one lookahead window.
pub const WINDOW_BITS: u32 = 24;

/// Loads up to three bitmap bytes as a little-endian window. Missing bytes
/// read as zero.
#[inline]
fn window24(bitmap: &[u8]) -> u32 {
    match bitmap {
        [a, b, c, ..] => u32::from_le_bytes([*a, *b, *c, 0]),
        [a, b] => u32::from_le_bytes([*a, *b, 0, 0]),
        [a] => u32::from(*a),
        [] => 0,
    }
}

/// Returns the bit offset, relative to the start of `bitmap`, of the first
/// set bit at or after `start_bit`.
///
/// `start_bit` is a sub-byte offset in `[0, 8)`. The search covers the first
/// three bytes of `bitmap`; when no bit is set there the result is
/// [`WINDOW_BITS`]. That still leaves at least 16 bits of lookahead, enough
/// to reach the CRLF after a sigil and ten digits.
#[inline]
pub fn find_next24(start_bit: u32, bitmap: &[u8]) -> u32 {
    debug_assert!(start_bit < 8);
    let window = window24(bitmap) | (1 << WINDOW_BITS);
    (window >> start_bit).trailing_zeros() + start_bit
}

/// Returns how many consecutive bits are set starting at `start_bit`,
/// capped at the end of the 24-bit window.
#[inline]
pub fn run_length24(start_bit: u32, bitmap: &[u8]) -> u32 {
    debug_assert!(start_bit < 8);
    (!(window24(bitmap) >> start_bit)).trailing_zeros()
}

/// A (byte index, bit offset) position inside a set of bitmaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCursor {
    byte: usize,
    bit: u32,
}

impl BitCursor {
    /// The cursor for buffer offset `position`.
    #[inline]
    pub const fn at(position: usize) -> Self {
        Self {
            byte: position >> 3,
            bit: (position & 7) as u32,
        }
    }

    #[inline]
    pub const fn byte_index(&self) -> usize {
        self.byte
    }

    /// Always in `[0, 8)`.
    #[inline]
    pub const fn bit_offset(&self) -> u32 {
        self.bit
    }

    /// The buffer offset this cursor stands for.
    #[inline]
    pub const fn position(&self) -> usize {
        (self.byte << 3) | self.bit as usize
    }

    /// Moves forward by `bits`, carrying whole bytes into the byte index.
    #[inline]
    pub fn advance(&mut self, bits: usize) {
        let total = self.bit as usize + bits;
        self.byte += total >> 3;
        self.bit = (total & 7) as u32;
    }
}

/// A buffer, its bitmaps and one cursor over both.
#[derive(Debug, Clone, Copy)]
pub struct Lockstep<'a> {
    buf: &'a [u8],
    maps: &'a Bitmaps,
    cursor: BitCursor,
}

impl<'a> Lockstep<'a> {
    /// Starts at buffer offset `position`.
    pub fn new(buf: &'a [u8], maps: &'a Bitmaps, position: usize) -> Self {
        debug_assert_eq!(maps.len(), buf.len(), "bitmaps were scanned over another buffer");
        debug_assert!(position <= buf.len());
        Self {
            buf,
            maps,
            cursor: BitCursor::at(position),
        }
    }

    #[inline]
    pub fn cursor(&self) -> BitCursor {
        self.cursor
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position()
    }

    /// The whole buffer the cursor walks.
    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// The buffer from the cursor on.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.position()..]
    }

    /// The byte under the cursor, if any.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.position()).copied()
    }

    /// The bitmap for `class` from the cursor's byte on.
    #[inline]
    pub fn bitmap(&self, class: ByteClass) -> &'a [u8] {
        self.maps.plane(class).get(self.cursor.byte..).unwrap_or(&[])
    }

    /// Advances the buffer view and every bitmap view by `bits` positions.
    ///
    /// `bits` must not run past the end of the buffer.
    #[inline]
    pub fn advance(&mut self, bits: usize) {
        debug_assert!(bits <= self.remaining());
        self.cursor.advance(bits);
    }

    /// Whether the byte under the cursor belongs to `class`.
    #[inline]
    pub fn is_set(&self, class: ByteClass) -> bool {
        self.bitmap(class)
            .first()
            .is_some_and(|&byte| byte >> self.cursor.bit & 1 == 1)
    }

    /// Distance from the cursor to the next byte of `class`, or a value of at
    /// least `WINDOW_BITS - 7` when none lies inside the window.
    #[inline]
    pub fn find_next(&self, class: ByteClass) -> usize {
        let bit = self.cursor.bit;
        (find_next24(bit, self.bitmap(class)) - bit) as usize
    }

    /// Number of consecutive `class` bytes starting at the cursor, capped by
    /// the window.
    #[inline]
    pub fn run_length(&self, class: ByteClass) -> usize {
        run_length24(self.cursor.bit, self.bitmap(class)) as usize
    }
}
