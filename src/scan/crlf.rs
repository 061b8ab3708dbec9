//! CRLF Combiner
//!
//! Bit `i` of the combined bitmap is set iff bit `i` of `crs` and bit `i + 1`
//! of `lfs` are both set, i.e. a `\r\n` pair starts at byte `i`. Bit `i + 1`
//! may sit in the next bitmap byte, so the LF bitmap is shifted down one bit
//! with the low bit of the following byte (or word) carried into the top.
//!
//! ```text
//!   lfs byte b+1    lfs byte b
//!   ┌──────────┐   ┌──────────┐
//!   │ ....... x│   │ yyyyyyy z│      carry = x
//!   └──────────┘   └──────────┘
//!                  shifted = (lfs[b] >> 1) | (x << 7)
//!                  crlfs[b] = crs[b] & shifted
//! ```

use super::Kernel;

/// Byte-at-a-time with an explicit carry, writing `out[from..]`.
fn combine_scalar(crs: &[u8], lfs: &[u8], out: &mut [u8], from: usize) {
    for b in from..out.len() {
        let carry = lfs.get(b + 1).map_or(0, |next| next & 1);
        out[b] = crs[b] & ((lfs[b] >> 1) | (carry << 7));
    }
}

#[inline]
fn load_word(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

/// Combines `WORDS` 64-bit words per step; the carry into the top word of a
/// step comes from the first LF byte of the next step.
fn combine_words<const WORDS: usize>(crs: &[u8], lfs: &[u8], out: &mut [u8]) -> usize {
    let step = WORDS * 8;
    let mut at = 0;

    while at + step <= out.len() {
        let mut lf = [0u64; WORDS];
        for (w, word) in lf.iter_mut().enumerate() {
            *word = load_word(lfs, at + w * 8);
        }
        let carry_in = u64::from(lfs.get(at + step).map_or(0, |next| next & 1));

        for w in 0..WORDS {
            let next = if w + 1 < WORDS { lf[w + 1] & 1 } else { carry_in };
            let cr = load_word(crs, at + w * 8);
            let combined = cr & ((lf[w] >> 1) | (next << 63));
            out[at + w * 8..at + w * 8 + 8].copy_from_slice(&combined.to_le_bytes());
        }

        at += step;
    }

    at
}

/// Writes the CRLF bitmap for `crs`/`lfs` into `out`.
///
/// `out.len()` bytes are produced; `crs` must be at least that long. `lfs`
/// may be longer, in which case its next byte feeds the final carry.
pub fn combine_crlf_into(kernel: Kernel, crs: &[u8], lfs: &[u8], out: &mut [u8]) {
    debug_assert!(crs.len() >= out.len());
    debug_assert!(lfs.len() >= out.len());

    let done = match kernel.effective() {
        Kernel::Scalar => 0,
        Kernel::Lanes16 | Kernel::Sse2 => combine_words::<2>(crs, lfs, out),
        Kernel::Lanes32 | Kernel::Avx2 => combine_words::<4>(crs, lfs, out),
        Kernel::Lanes64 => combine_words::<8>(crs, lfs, out),
    };
    combine_scalar(crs, lfs, out, done);
}

/// Returns the CRLF bitmap for `crs`/`lfs`, one byte per input byte.
pub fn combine_crlf(kernel: Kernel, crs: &[u8], lfs: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; crs.len().min(lfs.len())];
    combine_crlf_into(kernel, crs, lfs, &mut out);
    out
}
