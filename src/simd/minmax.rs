// SIMD min/max reductions backing column statistics.
//
// Empty input yields sentinels: (MAX, MIN) for the integer kernels so any
// merge overwrites them, (NaN, NaN) for float. The float kernel skips NaN
// values; an all-NaN input also yields the sentinels.

/// Scalar reference; also the sub-threshold fallback.
pub fn minmax_i32_scalar(values: &[i32]) -> (i32, i32) {
    let mut min = i32::MAX;
    let mut max = i32::MIN;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

pub fn minmax_i64_scalar(values: &[i64]) -> (i64, i64) {
    let mut min = i64::MAX;
    let mut max = i64::MIN;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

pub fn minmax_f64_scalar(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;
    for &v in values {
        if v.is_nan() {
            continue;
        }
        seen = true;
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if seen {
        (min, max)
    } else {
        (f64::NAN, f64::NAN)
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    /// AVX2 reduction over 8 lanes of i32; scalar tail.
    pub fn minmax_i32_avx2(values: &[i32]) -> (i32, i32) {
        if values.len() < 8 {
            return super::minmax_i32_scalar(values);
        }
        unsafe { minmax_i32_impl(values) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn minmax_i32_impl(values: &[i32]) -> (i32, i32) {
        let mut vmin = _mm256_set1_epi32(i32::MAX);
        let mut vmax = _mm256_set1_epi32(i32::MIN);
        let chunks = values.len() / 8;
        for c in 0..chunks {
            let v = _mm256_loadu_si256(values.as_ptr().add(c * 8) as *const __m256i);
            vmin = _mm256_min_epi32(vmin, v);
            vmax = _mm256_max_epi32(vmax, v);
        }
        let mut lanes_min = [0i32; 8];
        let mut lanes_max = [0i32; 8];
        _mm256_storeu_si256(lanes_min.as_mut_ptr() as *mut __m256i, vmin);
        _mm256_storeu_si256(lanes_max.as_mut_ptr() as *mut __m256i, vmax);
        let (mut min, mut max) = super::minmax_i32_scalar(&lanes_min);
        let (_, tail_max) = super::minmax_i32_scalar(&lanes_max);
        max = max.max(tail_max);
        let (tmin, tmax) = super::minmax_i32_scalar(&values[chunks * 8..]);
        min = min.min(tmin);
        max = max.max(tmax);
        (min, max)
    }

    /// AVX2 has no packed 64-bit min/max; compare + blend per lane pair.
    pub fn minmax_i64_avx2(values: &[i64]) -> (i64, i64) {
        if values.len() < 4 {
            return super::minmax_i64_scalar(values);
        }
        unsafe { minmax_i64_impl(values) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn minmax_i64_impl(values: &[i64]) -> (i64, i64) {
        let mut vmin = _mm256_set1_epi64x(i64::MAX);
        let mut vmax = _mm256_set1_epi64x(i64::MIN);
        let chunks = values.len() / 4;
        for c in 0..chunks {
            let v = _mm256_loadu_si256(values.as_ptr().add(c * 4) as *const __m256i);
            let gt_min = _mm256_cmpgt_epi64(vmin, v);
            vmin = _mm256_blendv_epi8(vmin, v, gt_min);
            let gt_max = _mm256_cmpgt_epi64(v, vmax);
            vmax = _mm256_blendv_epi8(vmax, v, gt_max);
        }
        let mut lanes_min = [0i64; 4];
        let mut lanes_max = [0i64; 4];
        _mm256_storeu_si256(lanes_min.as_mut_ptr() as *mut __m256i, vmin);
        _mm256_storeu_si256(lanes_max.as_mut_ptr() as *mut __m256i, vmax);
        let (mut min, _) = super::minmax_i64_scalar(&lanes_min);
        let (_, mut max) = super::minmax_i64_scalar(&lanes_max);
        let (tmin, tmax) = super::minmax_i64_scalar(&values[chunks * 4..]);
        min = min.min(tmin);
        max = max.max(tmax);
        (min, max)
    }

    /// AVX2 f64 reduction. NaN lanes are replaced with the fold identity
    /// before the min/max so they never propagate.
    pub fn minmax_f64_avx2(values: &[f64]) -> (f64, f64) {
        if values.len() < 4 {
            return super::minmax_f64_scalar(values);
        }
        unsafe { minmax_f64_impl(values) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn minmax_f64_impl(values: &[f64]) -> (f64, f64) {
        let pos_inf = _mm256_set1_pd(f64::INFINITY);
        let neg_inf = _mm256_set1_pd(f64::NEG_INFINITY);
        let mut vmin = pos_inf;
        let mut vmax = neg_inf;
        let mut any_finite = 0u32;
        let chunks = values.len() / 4;
        for c in 0..chunks {
            let v = _mm256_loadu_pd(values.as_ptr().add(c * 4));
            let ordered = _mm256_cmp_pd::<_CMP_ORD_Q>(v, v);
            any_finite |= _mm256_movemask_pd(ordered) as u32;
            vmin = _mm256_min_pd(vmin, _mm256_blendv_pd(pos_inf, v, ordered));
            vmax = _mm256_max_pd(vmax, _mm256_blendv_pd(neg_inf, v, ordered));
        }
        let mut lanes_min = [0f64; 4];
        let mut lanes_max = [0f64; 4];
        _mm256_storeu_pd(lanes_min.as_mut_ptr(), vmin);
        _mm256_storeu_pd(lanes_max.as_mut_ptr(), vmax);
        let mut min = lanes_min.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = lanes_max.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut seen = any_finite != 0;
        let (tmin, tmax) = super::minmax_f64_scalar(&values[chunks * 4..]);
        if !tmin.is_nan() {
            seen = true;
            min = min.min(tmin);
            max = max.max(tmax);
        }
        if seen {
            (min, max)
        } else {
            (f64::NAN, f64::NAN)
        }
    }
}

#[cfg(target_arch = "x86_64")]
pub use x86::{minmax_f64_avx2, minmax_i32_avx2, minmax_i64_avx2};
