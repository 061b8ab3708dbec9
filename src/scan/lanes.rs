//! Lane kernels for the sigil/digit scan.
//!
//! A kernel classifies `WIDTH` bytes at a time and returns one bitmask per
//! byte class, bit `i` standing for byte `i` of the chunk. [`scan_lanes`] is
//! the single driver shared by every width: it stores each mask into the
//! bitmaps at byte offset `pos / 8` and stops at the last full chunk. The
//! caller finishes with [`scan_scalar`].

use crate::protocol::types::sigil;

/// Per-class bitmasks for one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ClassMasks {
    pub asterisks: u64,
    pub dollars: u64,
    pub crs: u64,
    pub lfs: u64,
    pub digits: u64,
}

/// Mutable views of the five scanned bitmaps.
pub(crate) struct Planes<'a> {
    pub asterisks: &'a mut [u8],
    pub dollars: &'a mut [u8],
    pub crs: &'a mut [u8],
    pub lfs: &'a mut [u8],
    pub digits: &'a mut [u8],
}

/// A chunk classifier. `WIDTH` is a multiple of 8 and at most 64.
pub(crate) trait Lanes {
    const WIDTH: usize;

    /// `chunk` holds at least `WIDTH` bytes.
    fn classify(chunk: &[u8]) -> ClassMasks;
}

#[inline]
fn store(plane: &mut [u8], at: usize, mask: u64, bytes: usize) {
    plane[at..at + bytes].copy_from_slice(&mask.to_le_bytes()[..bytes]);
}

/// Runs `L` over every full chunk of `input` and returns the offset of the
/// first byte left unscanned.
#[inline]
pub(crate) fn scan_lanes<L: Lanes>(input: &[u8], planes: &mut Planes<'_>) -> usize {
    let bytes = L::WIDTH / 8;
    let mut pos = 0;

    while pos + L::WIDTH <= input.len() {
        let masks = L::classify(&input[pos..pos + L::WIDTH]);
        let at = pos / 8;
        store(planes.asterisks, at, masks.asterisks, bytes);
        store(planes.dollars, at, masks.dollars, bytes);
        store(planes.crs, at, masks.crs, bytes);
        store(planes.lfs, at, masks.lfs, bytes);
        store(planes.digits, at, masks.digits, bytes);
        pos += L::WIDTH;
    }

    pos
}

#[inline]
fn set(plane: &mut [u8], pos: usize) {
    plane[pos >> 3] |= 1 << (pos & 7);
}

/// Classifies `input[from..]` one byte at a time. Target bits must be clear.
pub(crate) fn scan_scalar(input: &[u8], from: usize, planes: &mut Planes<'_>) {
    for (pos, &byte) in input.iter().enumerate().skip(from) {
        match byte {
            sigil::ARRAY => set(planes.asterisks, pos),
            sigil::BULK_STRING => set(planes.dollars, pos),
            sigil::CR => set(planes.crs, pos),
            sigil::LF => set(planes.lfs, pos),
            b'0'..=b'9' => set(planes.digits, pos),
            _ => {}
        }
    }
}

/// Portable kernel over `N` lanes.
///
/// Written as straight-line compares so the optimizer can lower it to the
/// target's compare + movemask sequence.
pub(crate) struct Portable<const N: usize>;

impl<const N: usize> Lanes for Portable<N> {
    const WIDTH: usize = N;

    #[inline(always)]
    fn classify(chunk: &[u8]) -> ClassMasks {
        let mut masks = ClassMasks::default();
        for (i, &byte) in chunk[..N].iter().enumerate() {
            let bit = 1u64 << i;
            masks.asterisks |= bit * u64::from(byte == sigil::ARRAY);
            masks.dollars |= bit * u64::from(byte == sigil::BULK_STRING);
            masks.crs |= bit * u64::from(byte == sigil::CR);
            masks.lfs |= bit * u64::from(byte == sigil::LF);
            masks.digits |= bit * u64::from(byte.wrapping_sub(b'0') < 10);
        }
        masks
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86 {
    use super::{ClassMasks, Lanes};
    use crate::protocol::types::sigil;
    use std::arch::x86_64::*;

    /// 128-bit SSE2 kernel. SSE2 is part of the x86_64 baseline.
    pub(crate) struct Sse2;

    impl Lanes for Sse2 {
        const WIDTH: usize = 16;

        #[inline(always)]
        fn classify(chunk: &[u8]) -> ClassMasks {
            assert!(chunk.len() >= Self::WIDTH);
            // SAFETY: sse2 is always enabled on x86_64 and the load reads
            // exactly 16 bytes from a slice holding at least 16.
            unsafe { classify_sse2(chunk.as_ptr()) }
        }
    }

    /// 256-bit AVX2 kernel. Only dispatched after runtime detection.
    pub(crate) struct Avx2;

    impl Lanes for Avx2 {
        const WIDTH: usize = 32;

        #[inline(always)]
        fn classify(chunk: &[u8]) -> ClassMasks {
            assert!(chunk.len() >= Self::WIDTH);
            // SAFETY: `Kernel::effective` never yields Avx2 unless the CPU
            // reports avx2, and the load reads exactly 32 bytes.
            unsafe { classify_avx2(chunk.as_ptr()) }
        }
    }

    #[target_feature(enable = "sse2")]
    #[inline]
    unsafe fn classify_sse2(ptr: *const u8) -> ClassMasks {
        let v = _mm_loadu_si128(ptr as *const __m128i);
        macro_rules! eq {
            ($c:expr) => {
                _mm_movemask_epi8(_mm_cmpeq_epi8(v, _mm_set1_epi8($c as i8))) as u32
            };
        }

        // Unsigned `byte - '0' <= 9` via min.
        let offset = _mm_sub_epi8(v, _mm_set1_epi8(b'0' as i8));
        let digits = _mm_cmpeq_epi8(_mm_min_epu8(offset, _mm_set1_epi8(9)), offset);

        ClassMasks {
            asterisks: u64::from(eq!(sigil::ARRAY)),
            dollars: u64::from(eq!(sigil::BULK_STRING)),
            crs: u64::from(eq!(sigil::CR)),
            lfs: u64::from(eq!(sigil::LF)),
            digits: u64::from(_mm_movemask_epi8(digits) as u32),
        }
    }

    #[target_feature(enable = "avx2")]
    #[inline]
    unsafe fn classify_avx2(ptr: *const u8) -> ClassMasks {
        let v = _mm256_loadu_si256(ptr as *const __m256i);
        macro_rules! eq {
            ($c:expr) => {
                _mm256_movemask_epi8(_mm256_cmpeq_epi8(v, _mm256_set1_epi8($c as i8))) as u32
            };
        }

        let offset = _mm256_sub_epi8(v, _mm256_set1_epi8(b'0' as i8));
        let digits = _mm256_cmpeq_epi8(_mm256_min_epu8(offset, _mm256_set1_epi8(9)), offset);

        ClassMasks {
            asterisks: u64::from(eq!(sigil::ARRAY)),
            dollars: u64::from(eq!(sigil::BULK_STRING)),
            crs: u64::from(eq!(sigil::CR)),
            lfs: u64::from(eq!(sigil::LF)),
            digits: u64::from(_mm256_movemask_epi8(digits) as u32),
        }
    }
}
