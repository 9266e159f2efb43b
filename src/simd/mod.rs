// Runtime SIMD dispatch.
//
// Capabilities are probed once, on first use, and cached process-wide in a
// table of function pointers. Each pointer is a safe wrapper that was only
// installed after its target feature probe succeeded, so callers never touch
// `unsafe` directly.
//
// The capability hierarchy covered here: scalar everywhere; SSE2 (baseline)
// and AVX2 with PCLMULQDQ on x86_64; NEON with PMULL on aarch64.

pub mod classify;
pub mod minmax;
pub mod quote;

use once_cell::sync::Lazy;

pub use classify::{compute_newline_mask, compute_quote_mask, load_block, BlockMasks};
pub use quote::{inside_quote_scalar, prefix_xor};

/// Bytes per SIMD group. Everything in the parser is phrased in these blocks.
pub const BLOCK: usize = 64;

/// Detected capability level, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimdLevel {
    Scalar,
    Sse2,
    Avx2,
    Neon,
}

/// Process-wide kernel table.
pub struct Kernels {
    pub level: SimdLevel,
    /// True when the carryless-multiply quote kernel is hardware-backed.
    pub has_clmul: bool,
    pub classify: fn(&[u8; BLOCK], u8, u8) -> BlockMasks,
    pub inside_quote: fn(u64, u64) -> (u64, u64),
    pub minmax_i32: fn(&[i32]) -> (i32, i32),
    pub minmax_i64: fn(&[i64]) -> (i64, i64),
    pub minmax_f64: fn(&[f64]) -> (f64, f64),
}

static KERNELS: Lazy<Kernels> = Lazy::new(detect);

/// The cached kernel table; the probe runs exactly once per process.
#[inline]
pub fn kernels() -> &'static Kernels {
    &KERNELS
}

fn scalar_kernels() -> Kernels {
    Kernels {
        level: SimdLevel::Scalar,
        has_clmul: false,
        classify: classify::classify_block_scalar,
        inside_quote: quote::inside_quote_scalar,
        minmax_i32: minmax::minmax_i32_scalar,
        minmax_i64: minmax::minmax_i64_scalar,
        minmax_f64: minmax::minmax_f64_scalar,
    }
}

#[cfg(target_arch = "x86_64")]
fn detect() -> Kernels {
    let mut k = scalar_kernels();
    // SSE2 is part of the x86_64 baseline.
    k.level = SimdLevel::Sse2;
    k.classify = classify::classify_block_sse2;

    if std::arch::is_x86_feature_detected!("avx2") {
        k.level = SimdLevel::Avx2;
        k.classify = classify::classify_block_avx2;
        k.minmax_i32 = minmax::minmax_i32_avx2;
        k.minmax_i64 = minmax::minmax_i64_avx2;
        k.minmax_f64 = minmax::minmax_f64_avx2;
    }
    if std::arch::is_x86_feature_detected!("pclmulqdq") {
        k.has_clmul = true;
        k.inside_quote = quote::inside_quote_clmul;
    }
    log::debug!("simd dispatch: {:?}, clmul={}", k.level, k.has_clmul);
    k
}

#[cfg(target_arch = "aarch64")]
fn detect() -> Kernels {
    let mut k = scalar_kernels();
    // NEON is part of the aarch64 baseline.
    k.level = SimdLevel::Neon;
    k.classify = classify::classify_block_neon;
    if std::arch::is_aarch64_feature_detected!("aes") {
        k.has_clmul = true;
        k.inside_quote = quote::inside_quote_clmul;
    }
    log::debug!("simd dispatch: {:?}, clmul={}", k.level, k.has_clmul);
    k
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect() -> Kernels {
    scalar_kernels()
}
