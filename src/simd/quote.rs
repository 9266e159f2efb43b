// Quote-parity propagation across 64-byte lanes.
//
// Given the positions of quote bytes in a 64-bit chunk and the parity carried
// from the previous chunk, produce the mask whose bit i is set iff position i
// lies inside a quoted field. The carryless-multiply form computes the whole
// lane in O(1): CLMUL(quote_bits, all-ones) is exactly the prefix-XOR of the
// bit positions. The new carry is the arithmetic right-shift-by-63 of the
// result: all-ones while still inside a quote.
//
// The portable fallback is the shift-and-xor cascade; 6 dependent ops,
// comparable to a single CLMUL/PMULL latency plus setup.

/// Prefix-XOR via shift-and-xor cascade over the full 64 bits.
#[inline]
pub fn prefix_xor(mut x: u64) -> u64 {
    x ^= x << 1;
    x ^= x << 2;
    x ^= x << 4;
    x ^= x << 8;
    x ^= x << 16;
    x ^= x << 32;
    x
}

/// New carry from an inside-quote mask: all-ones iff bit 63 is set.
#[inline]
fn next_carry(mask: u64) -> u64 {
    ((mask as i64) >> 63) as u64
}

/// Portable inside-quote mask. `carry` must be 0 or all-ones.
#[inline]
pub fn inside_quote_scalar(quote_bits: u64, carry: u64) -> (u64, u64) {
    let mask = prefix_xor(quote_bits) ^ carry;
    (mask, next_carry(mask))
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::next_carry;

    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    #[target_feature(enable = "sse2", enable = "pclmulqdq")]
    unsafe fn inside_quote_pclmul(quote_bits: u64, carry: u64) -> (u64, u64) {
        let quotes = _mm_set_epi64x(0, quote_bits as i64);
        let ones = _mm_set1_epi8(-1);
        let product = _mm_clmulepi64_si128::<0>(quotes, ones);
        let mask = _mm_cvtsi128_si64(product) as u64 ^ carry;
        (mask, next_carry(mask))
    }

    /// Safe wrapper; only installed in the kernel table after the PCLMULQDQ
    /// probe succeeded.
    pub fn inside_quote_clmul(quote_bits: u64, carry: u64) -> (u64, u64) {
        unsafe { inside_quote_pclmul(quote_bits, carry) }
    }
}

#[cfg(target_arch = "x86_64")]
pub use x86::inside_quote_clmul;

#[cfg(target_arch = "aarch64")]
mod arm {
    use super::next_carry;
    use std::arch::aarch64::*;

    #[target_feature(enable = "neon", enable = "aes")]
    unsafe fn inside_quote_pmull(quote_bits: u64, carry: u64) -> (u64, u64) {
        let mask = (vmull_p64(quote_bits, u64::MAX) as u64) ^ carry;
        (mask, next_carry(mask))
    }

    /// Safe wrapper; only installed after the PMULL probe succeeded.
    pub fn inside_quote_clmul(quote_bits: u64, carry: u64) -> (u64, u64) {
        unsafe { inside_quote_pmull(quote_bits, carry) }
    }
}

#[cfg(target_arch = "aarch64")]
pub use arm::inside_quote_clmul;

#[cfg(test)]
mod tests {
    use super::*;

    /// Bit-by-bit reference: bit i set iff an odd number of quote bits at
    /// positions 0..=i.
    fn inside_quote_reference(quote_bits: u64, carry: u64) -> (u64, u64) {
        let mut mask = 0u64;
        let mut parity = carry & 1;
        for i in 0..64 {
            parity ^= (quote_bits >> i) & 1;
            mask |= parity << i;
        }
        (mask, if parity == 1 { u64::MAX } else { 0 })
    }

    const PATTERNS: &[u64] = &[
        0,
        1,
        0b11,
        0b101,
        0b1001,
        0xFF,
        0xAAAA_AAAA_AAAA_AAAA,
        0x8000_0000_0000_0001,
        u64::MAX,
        0x0123_4567_89AB_CDEF,
    ];

    #[test]
    fn test_scalar_matches_reference() {
        for &bits in PATTERNS {
            for carry in [0u64, u64::MAX] {
                let got = inside_quote_scalar(bits, carry);
                let want = inside_quote_reference(bits, carry);
                assert_eq!(got, want, "bits={bits:#018x} carry={carry:#x}");
            }
        }
    }

    #[test]
    fn test_clmul_matches_scalar() {
        // Only meaningful when the hardware path is available; the kernel
        // table makes the same probe.
        #[cfg(target_arch = "x86_64")]
        if std::arch::is_x86_feature_detected!("pclmulqdq") {
            for &bits in PATTERNS {
                for carry in [0u64, u64::MAX] {
                    assert_eq!(
                        inside_quote_clmul(bits, carry),
                        inside_quote_scalar(bits, carry),
                        "bits={bits:#018x}"
                    );
                }
            }
        }
        #[cfg(target_arch = "aarch64")]
        if std::arch::is_aarch64_feature_detected!("aes") {
            for &bits in PATTERNS {
                for carry in [0u64, u64::MAX] {
                    assert_eq!(
                        inside_quote_clmul(bits, carry),
                        inside_quote_scalar(bits, carry)
                    );
                }
            }
        }
    }

    #[test]
    fn test_quote_semantics() {
        // Single quote at pos 0: everything after is inside.
        assert_eq!(inside_quote_scalar(1, 0).0, u64::MAX);
        // Open at 0, close at 1: only the opening position is inside.
        assert_eq!(inside_quote_scalar(0b11, 0).0, 1);
        // Open at 0, close at 5: positions 0..=4 inside.
        assert_eq!(inside_quote_scalar(0b100001, 0).0, 0b011111);
        // Carry-in flips the whole lane when no quotes appear.
        assert_eq!(inside_quote_scalar(0, u64::MAX), (u64::MAX, u64::MAX));
    }

    #[test]
    fn test_carry_chains_across_lanes() {
        // A quote opens in lane 0 and closes in lane 2.
        let (m0, c0) = inside_quote_scalar(1 << 10, 0);
        assert_eq!(c0, u64::MAX);
        assert_eq!(m0 >> 10, u64::MAX >> 10);
        let (m1, c1) = inside_quote_scalar(0, c0);
        assert_eq!(m1, u64::MAX);
        assert_eq!(c1, u64::MAX);
        let (m2, c2) = inside_quote_scalar(1 << 3, c1);
        assert_eq!(m2, 0b1111);
        assert_eq!(c2, 0);
    }
}
