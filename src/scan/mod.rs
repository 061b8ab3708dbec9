//! Delimiter Discovery
//!
//! Before any command is parsed, the whole buffer is classified once into a
//! set of bitmaps, one bit per buffer byte:
//!
//! ```text
//! buffer     *  2 \r \n  $  3 \r \n  G  E  T \r \n ...
//! asterisks  1  0  0  0  0  0  0  0  0  0  0  0  0
//! dollars    0  0  0  0  1  0  0  0  0  0  0  0  0
//! crs        0  0  1  0  0  0  1  0  0  0  0  1  0
//! lfs        0  0  0  1  0  0  0  1  0  0  0  0  1
//! crlfs      0  0  1  0  0  0  1  0  0  0  0  1  0
//! digits     0  1  0  0  0  1  0  0  0  0  0  0  0
//! ```
//!
//! Bit `i % 8` of byte `i / 8` belongs to buffer byte `i`. The parser then
//! navigates these bitmaps instead of testing bytes one by one.
//!
//! ## Modules
//!
//! - `layout`: allocation sizes and the zero-padded buffer
//! - `lanes`: the width-generic classification kernels
//! - `crlf`: the CRLF combiner
//! - `cursor`: bit-cursor navigation over buffer + bitmaps

pub mod crlf;
pub mod cursor;
mod lanes;
pub mod layout;

pub use crlf::{combine_crlf, combine_crlf_into};
pub use cursor::{find_next24, run_length24, BitCursor, Lockstep, WINDOW_BITS};
pub use layout::{calculate_sizes, Layout, PaddedBuffer, VECTOR_WIDTH};

use lanes::{scan_lanes, scan_scalar, Planes, Portable};
use layout::bitmap_len;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// The byte classes tracked by [`Bitmaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteClass {
    /// `*`
    Asterisk,
    /// `$`
    Dollar,
    /// `\r`
    Cr,
    /// `\n`
    Lf,
    /// `\r` directly followed by `\n`
    CrLf,
    /// `0`..=`9`
    Digit,
}

impl ByteClass {
    pub const ALL: [ByteClass; 6] = [
        ByteClass::Asterisk,
        ByteClass::Dollar,
        ByteClass::Cr,
        ByteClass::Lf,
        ByteClass::CrLf,
        ByteClass::Digit,
    ];
}

/// A scan implementation.
///
/// Every kernel produces byte-identical bitmaps; they differ only in how many
/// bytes are classified per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// One byte at a time.
    Scalar,
    /// Portable 128-bit lanes.
    Lanes16,
    /// Portable 256-bit lanes.
    Lanes32,
    /// Portable 512-bit lanes.
    Lanes64,
    /// x86_64 SSE2 intrinsics, 128-bit.
    Sse2,
    /// x86_64 AVX2 intrinsics, 256-bit. Requires runtime support.
    Avx2,
}

impl Kernel {
    pub const ALL: [Kernel; 6] = [
        Kernel::Scalar,
        Kernel::Lanes16,
        Kernel::Lanes32,
        Kernel::Lanes64,
        Kernel::Sse2,
        Kernel::Avx2,
    ];

    /// Bytes classified per step.
    pub const fn width(self) -> usize {
        match self {
            Kernel::Scalar => 1,
            Kernel::Lanes16 | Kernel::Sse2 => 16,
            Kernel::Lanes32 | Kernel::Avx2 => 32,
            Kernel::Lanes64 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Scalar => "scalar",
            Kernel::Lanes16 => "lanes16",
            Kernel::Lanes32 => "lanes32",
            Kernel::Lanes64 => "lanes64",
            Kernel::Sse2 => "sse2",
            Kernel::Avx2 => "avx2",
        }
    }

    /// Whether this kernel can run on the current CPU.
    pub fn is_supported(self) -> bool {
        match self {
            Kernel::Scalar | Kernel::Lanes16 | Kernel::Lanes32 | Kernel::Lanes64 => true,
            #[cfg(target_arch = "x86_64")]
            Kernel::Sse2 => true,
            #[cfg(target_arch = "x86_64")]
            Kernel::Avx2 => std::arch::is_x86_feature_detected!("avx2"),
            #[cfg(not(target_arch = "x86_64"))]
            Kernel::Sse2 | Kernel::Avx2 => false,
        }
    }

    /// This kernel if supported, otherwise the portable kernel of the same
    /// width.
    pub fn effective(self) -> Kernel {
        match self {
            Kernel::Sse2 if !self.is_supported() => Kernel::Lanes16,
            Kernel::Avx2 if !self.is_supported() => Kernel::Lanes32,
            other => other,
        }
    }

    /// The widest kernel the current CPU supports.
    ///
    /// Feature detection runs once per process; later calls return the
    /// cached choice.
    pub fn detect() -> Kernel {
        static DETECTED: OnceLock<Kernel> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let kernel = if Kernel::Avx2.is_supported() {
                Kernel::Avx2
            } else if Kernel::Sse2.is_supported() {
                Kernel::Sse2
            } else {
                Kernel::Lanes16
            };
            debug!(kernel = %kernel, "Selected scan kernel");
            kernel
        })
    }

    /// Every kernel usable on the current CPU.
    pub fn available() -> Vec<Kernel> {
        Kernel::ALL
            .into_iter()
            .filter(|kernel| kernel.is_supported())
            .collect()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::detect()
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a kernel name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scan kernel: {0}")]
pub struct UnknownKernel(pub String);

impl FromStr for Kernel {
    type Err = UnknownKernel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kernel::ALL
            .into_iter()
            .find(|kernel| kernel.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKernel(s.to_string()))
    }
}

/// The class bitmaps for one buffer.
///
/// Each bitmap is allocated with [`Layout::bitmap_bytes`] bytes, so lookups
/// that read a few bytes past the last data bit stay inside the allocation
/// and see zeros. The bitmaps are reusable: [`rescan`](Self::rescan) keeps the
/// allocations and only grows them.
#[derive(Debug, Clone)]
pub struct Bitmaps {
    len: usize,
    kernel: Kernel,
    asterisks: Vec<u8>,
    dollars: Vec<u8>,
    crs: Vec<u8>,
    lfs: Vec<u8>,
    crlfs: Vec<u8>,
    digits: Vec<u8>,
}

impl Default for Bitmaps {
    fn default() -> Self {
        Self::new()
    }
}

impl Bitmaps {
    /// Empty bitmaps for an empty buffer.
    pub fn new() -> Self {
        Self {
            len: 0,
            kernel: Kernel::Scalar,
            asterisks: Vec::new(),
            dollars: Vec::new(),
            crs: Vec::new(),
            lfs: Vec::new(),
            crlfs: Vec::new(),
            digits: Vec::new(),
        }
    }

    /// Scans `buf` with the best kernel for this CPU.
    pub fn scan(buf: &[u8]) -> Self {
        Self::scan_with(Kernel::detect(), buf)
    }

    /// Scans `buf` with `kernel`.
    pub fn scan_with(kernel: Kernel, buf: &[u8]) -> Self {
        let mut maps = Self::new();
        maps.rescan(kernel, buf);
        maps
    }

    /// Rescans `buf`, reusing the existing allocations.
    ///
    /// The last partial chunk is classified by the scalar tail.
    pub fn rescan(&mut self, kernel: Kernel, buf: &[u8]) {
        self.reset(kernel, buf.len());
        let mut planes = self.planes();
        let done = run_kernel(kernel, buf, &mut planes);
        scan_scalar(buf, done, &mut planes);
        self.combine();
    }

    /// Rescans a padded buffer.
    ///
    /// The final chunk is loaded straight out of the zero padding, so no
    /// scalar tail runs.
    pub fn rescan_padded(&mut self, kernel: Kernel, buf: &PaddedBuffer) {
        let kernel = kernel.effective();
        let covered = buf.len().next_multiple_of(kernel.width());
        let input = &buf.padded()[..covered];

        self.reset(kernel, buf.len());
        let mut planes = self.planes();
        let done = run_kernel(kernel, input, &mut planes);
        scan_scalar(input, done, &mut planes);
        self.combine();
    }

    /// Number of buffer bytes these bitmaps describe.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The kernel that produced the current bitmaps.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// The bitmap for `class`, trimmed to the bytes that carry data bits.
    pub fn bitmap(&self, class: ByteClass) -> &[u8] {
        &self.plane(class)[..bitmap_len(self.len)]
    }

    /// Whether buffer byte `pos` belongs to `class`.
    pub fn is_set(&self, class: ByteClass, pos: usize) -> bool {
        pos < self.len && self.plane(class)[pos >> 3] >> (pos & 7) & 1 == 1
    }

    /// The full, padded bitmap for `class`.
    #[inline]
    pub(crate) fn plane(&self, class: ByteClass) -> &[u8] {
        match class {
            ByteClass::Asterisk => &self.asterisks,
            ByteClass::Dollar => &self.dollars,
            ByteClass::Cr => &self.crs,
            ByteClass::Lf => &self.lfs,
            ByteClass::CrLf => &self.crlfs,
            ByteClass::Digit => &self.digits,
        }
    }

    fn reset(&mut self, kernel: Kernel, len: usize) {
        let bytes = calculate_sizes(len).bitmap_bytes;
        for plane in [
            &mut self.asterisks,
            &mut self.dollars,
            &mut self.crs,
            &mut self.lfs,
            &mut self.crlfs,
            &mut self.digits,
        ] {
            plane.clear();
            plane.resize(bytes, 0);
        }
        self.len = len;
        self.kernel = kernel.effective();
    }

    fn planes(&mut self) -> Planes<'_> {
        Planes {
            asterisks: &mut self.asterisks,
            dollars: &mut self.dollars,
            crs: &mut self.crs,
            lfs: &mut self.lfs,
            digits: &mut self.digits,
        }
    }

    fn combine(&mut self) {
        let used = bitmap_len(self.len);
        combine_crlf_into(self.kernel, &self.crs, &self.lfs, &mut self.crlfs[..used]);
    }
}

/// Runs the lane kernel for `kernel` and returns the first unscanned offset.
fn run_kernel(kernel: Kernel, input: &[u8], planes: &mut Planes<'_>) -> usize {
    match kernel.effective() {
        Kernel::Scalar => 0,
        Kernel::Lanes16 => scan_lanes::<Portable<16>>(input, planes),
        Kernel::Lanes32 => scan_lanes::<Portable<32>>(input, planes),
        Kernel::Lanes64 => scan_lanes::<Portable<64>>(input, planes),
        #[cfg(target_arch = "x86_64")]
        Kernel::Sse2 => scan_lanes::<lanes::x86::Sse2>(input, planes),
        #[cfg(target_arch = "x86_64")]
        Kernel::Avx2 => scan_lanes::<lanes::x86::Avx2>(input, planes),
        #[cfg(not(target_arch = "x86_64"))]
        Kernel::Sse2 => scan_lanes::<Portable<16>>(input, planes),
        #[cfg(not(target_arch = "x86_64"))]
        Kernel::Avx2 => scan_lanes::<Portable<32>>(input, planes),
    }
}
