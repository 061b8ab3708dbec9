//! Buffer Layout & Padding
//!
//! The lane kernels always load a full vector's worth of bytes, even when the
//! load starts a few bytes before the logical end of the data. This module
//! computes allocation sizes that keep those loads inside owned memory, and
//! provides [`PaddedBuffer`], a growable byte buffer that upholds the padding
//! invariant while data is appended and consumed.
//!
//! ## Invariant
//!
//! ```text
//!  0                      usable                    allocated
//!  ├──────── data ───────────┼──────── zeros ───────────┤
//!                            └── at least VECTOR_WIDTH ─┘
//! ```
//!
//! Every byte past the usable length is zero. Zero is not a sigil and not a
//! digit, so a vector load that spills into the padding never produces a
//! spurious bitmap bit.

use bytes::{Buf, BytesMut};

/// Width in bytes of the widest vector load issued by any kernel.
pub const VECTOR_WIDTH: usize = 64;

/// Sizes for one buffer and its bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Bytes to allocate for the data buffer, padding included.
    pub allocated_bytes: usize,
    /// Bytes of real data exposed to the caller.
    pub usable_bytes: usize,
    /// Bytes to allocate for each bitmap, padding included.
    pub bitmap_bytes: usize,
}

#[inline]
const fn round_up(n: usize, multiple: usize) -> usize {
    n.div_ceil(multiple) * multiple
}

/// Computes the allocation envelope for `logical_len` bytes of data.
///
/// A load of [`VECTOR_WIDTH`] bytes starting at any offset up to
/// `usable_bytes` stays inside `allocated_bytes`, and the same holds for the
/// bitmaps at one bit per data byte.
pub const fn calculate_sizes(logical_len: usize) -> Layout {
    Layout {
        allocated_bytes: round_up(logical_len, VECTOR_WIDTH) + VECTOR_WIDTH,
        usable_bytes: logical_len,
        bitmap_bytes: round_up(logical_len.div_ceil(8), VECTOR_WIDTH) + VECTOR_WIDTH,
    }
}

/// Number of bitmap bytes that carry bits for `len` data bytes.
#[inline]
pub const fn bitmap_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// A byte buffer whose tail is always followed by zeroed padding.
///
/// Backed by `BytesMut` so that consuming a committed prefix is O(1) and the
/// freed front is reclaimed on the next growth.
#[derive(Debug, Clone)]
pub struct PaddedBuffer {
    storage: BytesMut,
    len: usize,
}

impl Default for PaddedBuffer {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl PaddedBuffer {
    /// Creates an empty buffer able to hold `capacity` bytes before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let layout = calculate_sizes(capacity);
        let mut storage = BytesMut::with_capacity(layout.allocated_bytes);
        storage.resize(layout.allocated_bytes, 0);
        Self { storage, len: 0 }
    }

    /// Creates a padded copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(data.len());
        buffer.extend_from_slice(data);
        buffer
    }

    /// Number of data bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The data bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// The data bytes followed by the zeroed padding.
    #[inline]
    pub fn padded(&self) -> &[u8] {
        &self.storage
    }

    /// Appends `data`, growing the allocation when needed.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        let end = self.len + data.len();
        self.spare_mut(data.len()).copy_from_slice(data);
        self.len = end;
    }

    /// Returns `min` writable zeroed bytes directly after the data.
    ///
    /// Bytes written here become data only after [`commit`](Self::commit).
    /// Anything left unwritten stays zero, so the padding invariant holds.
    pub fn spare_mut(&mut self, min: usize) -> &mut [u8] {
        let required = calculate_sizes(self.len + min).allocated_bytes;
        if self.storage.len() < required {
            self.storage.resize(required, 0);
        }
        &mut self.storage[self.len..self.len + min]
    }

    /// Marks `n` bytes previously written through [`spare_mut`](Self::spare_mut)
    /// as data.
    ///
    /// # Panics
    ///
    /// Panics if the new data would leave fewer than [`VECTOR_WIDTH`] zero
    /// bytes of padding after it.
    pub fn commit(&mut self, n: usize) {
        assert!(
            self.len + n + VECTOR_WIDTH <= self.storage.len(),
            "commit of {} bytes overruns the padding",
            n
        );
        self.len += n;
    }

    /// Drops the first `n` data bytes.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.storage.advance(n);
        self.len -= n;
        // The advanced storage still ends in the old padding, which is at least
        // VECTOR_WIDTH zero bytes past the new end.
        debug_assert!(self.storage.len() >= self.len + VECTOR_WIDTH);
    }

    /// Drops every data byte, keeping the allocation.
    pub fn clear(&mut self) {
        self.storage[..self.len].fill(0);
        self.len = 0;
    }
}
