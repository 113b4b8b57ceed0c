//! Cosine distance kernels.
//!
//! Four variants of the same contract `1 - (u·v)/(‖u‖·‖v‖)`: a scalar
//! reference, a unit-norm fast path (`1 - u·v`), and SIMD forms of both.
//! SIMD uses NEON on aarch64 and AVX2+FMA on x86_64 behind runtime feature
//! detection, falling back to scalar elsewhere. A zero-norm input yields
//! distance `1.0` rather than NaN.

use serde::{Deserialize, Serialize};

/// Selects which cosine distance implementation a graph uses.
///
/// The kernel is part of [`Parameters`](crate::hnsw::Parameters) and is
/// serialized with the graph, so a rebuild after delete/update always uses
/// the same kernel that built the graph initially.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceKernel {
    /// Scalar reference implementation.
    NonOptimized,
    /// Scalar `1 - u·v`; assumes both inputs are unit-norm.
    ForUnits,
    /// Vectorized full cosine distance.
    #[default]
    Simd,
    /// Vectorized `1 - u·v`; assumes both inputs are unit-norm.
    SimdForUnits,
}

impl DistanceKernel {
    /// Cosine distance between two equal-length vectors.
    #[inline]
    pub fn distance(&self, u: &[f32], v: &[f32]) -> f32 {
        debug_assert_eq!(u.len(), v.len());
        match self {
            DistanceKernel::NonOptimized => cosine_distance_scalar(u, v),
            DistanceKernel::ForUnits => 1.0 - dot_scalar(u, v),
            DistanceKernel::Simd => cosine_distance_simd(u, v),
            DistanceKernel::SimdForUnits => 1.0 - dot_simd(u, v),
        }
    }
}

/// Scalar cosine distance. Correctness reference for the SIMD paths.
pub fn cosine_distance_scalar(u: &[f32], v: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_u = 0.0f32;
    let mut norm_v = 0.0f32;
    for i in 0..u.len() {
        dot += u[i] * v[i];
        norm_u += u[i] * u[i];
        norm_v += v[i] * v[i];
    }
    let denom = norm_u.sqrt() * norm_v.sqrt();
    if denom < 1e-10 {
        return 1.0;
    }
    1.0 - dot / denom
}

/// Scalar dot product.
pub fn dot_scalar(u: &[f32], v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..u.len() {
        sum += u[i] * v[i];
    }
    sum
}

/// Vectorized cosine distance. Falls back to scalar when no SIMD path
/// is available for the target.
#[inline]
#[allow(unreachable_code)]
pub fn cosine_distance_simd(u: &[f32], v: &[f32]) -> f32 {
    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { neon_cosine_distance(u, v) };
    }
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") && std::arch::is_x86_feature_detected!("fma")
        {
            return unsafe { avx2_cosine_distance(u, v) };
        }
    }
    cosine_distance_scalar(u, v)
}

/// Vectorized dot product. Falls back to scalar when no SIMD path
/// is available for the target.
#[inline]
#[allow(unreachable_code)]
pub fn dot_simd(u: &[f32], v: &[f32]) -> f32 {
    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { neon_dot(u, v) };
    }
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") && std::arch::is_x86_feature_detected!("fma")
        {
            return unsafe { avx2_dot(u, v) };
        }
    }
    dot_scalar(u, v)
}

// ============================================================================
// NEON implementations (aarch64)
// ============================================================================

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

#[cfg(target_arch = "aarch64")]
unsafe fn neon_cosine_distance(u: &[f32], v: &[f32]) -> f32 {
    let len = u.len();
    let u_ptr = u.as_ptr();
    let v_ptr = v.as_ptr();

    let mut dot0 = vdupq_n_f32(0.0);
    let mut dot1 = vdupq_n_f32(0.0);
    let mut nu0 = vdupq_n_f32(0.0);
    let mut nu1 = vdupq_n_f32(0.0);
    let mut nv0 = vdupq_n_f32(0.0);
    let mut nv1 = vdupq_n_f32(0.0);

    let chunks = len / 8;
    for i in 0..chunks {
        let base = i * 8;
        let u0 = vld1q_f32(u_ptr.add(base));
        let u1 = vld1q_f32(u_ptr.add(base + 4));
        let v0 = vld1q_f32(v_ptr.add(base));
        let v1 = vld1q_f32(v_ptr.add(base + 4));
        dot0 = vfmaq_f32(dot0, u0, v0);
        dot1 = vfmaq_f32(dot1, u1, v1);
        nu0 = vfmaq_f32(nu0, u0, u0);
        nu1 = vfmaq_f32(nu1, u1, u1);
        nv0 = vfmaq_f32(nv0, v0, v0);
        nv1 = vfmaq_f32(nv1, v1, v1);
    }

    let mut dot = vaddvq_f32(vaddq_f32(dot0, dot1));
    let mut norm_u = vaddvq_f32(vaddq_f32(nu0, nu1));
    let mut norm_v = vaddvq_f32(vaddq_f32(nv0, nv1));

    for i in (chunks * 8)..len {
        let ui = *u_ptr.add(i);
        let vi = *v_ptr.add(i);
        dot += ui * vi;
        norm_u += ui * ui;
        norm_v += vi * vi;
    }

    let denom = norm_u.sqrt() * norm_v.sqrt();
    if denom < 1e-10 {
        return 1.0;
    }
    1.0 - dot / denom
}

#[cfg(target_arch = "aarch64")]
unsafe fn neon_dot(u: &[f32], v: &[f32]) -> f32 {
    let len = u.len();
    let u_ptr = u.as_ptr();
    let v_ptr = v.as_ptr();

    let mut s0 = vdupq_n_f32(0.0);
    let mut s1 = vdupq_n_f32(0.0);
    let mut s2 = vdupq_n_f32(0.0);
    let mut s3 = vdupq_n_f32(0.0);

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        s0 = vfmaq_f32(s0, vld1q_f32(u_ptr.add(base)), vld1q_f32(v_ptr.add(base)));
        s1 = vfmaq_f32(
            s1,
            vld1q_f32(u_ptr.add(base + 4)),
            vld1q_f32(v_ptr.add(base + 4)),
        );
        s2 = vfmaq_f32(
            s2,
            vld1q_f32(u_ptr.add(base + 8)),
            vld1q_f32(v_ptr.add(base + 8)),
        );
        s3 = vfmaq_f32(
            s3,
            vld1q_f32(u_ptr.add(base + 12)),
            vld1q_f32(v_ptr.add(base + 12)),
        );
    }

    let mut sum = vaddvq_f32(vaddq_f32(vaddq_f32(s0, s1), vaddq_f32(s2, s3)));

    for i in (chunks * 16)..len {
        sum += *u_ptr.add(i) * *v_ptr.add(i);
    }
    sum
}

// ============================================================================
// AVX2+FMA implementations (x86_64)
// ============================================================================

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Horizontal sum of 8 f32 values in a __m256 register.
#[cfg(target_arch = "x86_64")]
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_f32x8(v: __m256) -> f32 {
    let hi128 = _mm256_extractf128_ps(v, 1);
    let lo128 = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo128, hi128);
    let hi64 = _mm_movehl_ps(sum128, sum128);
    let sum64 = _mm_add_ps(sum128, hi64);
    let hi32 = _mm_shuffle_ps(sum64, sum64, 0x55);
    _mm_cvtss_f32(_mm_add_ss(sum64, hi32))
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_cosine_distance(u: &[f32], v: &[f32]) -> f32 {
    let len = u.len();
    let u_ptr = u.as_ptr();
    let v_ptr = v.as_ptr();

    let mut dot0 = _mm256_setzero_ps();
    let mut dot1 = _mm256_setzero_ps();
    let mut nu0 = _mm256_setzero_ps();
    let mut nu1 = _mm256_setzero_ps();
    let mut nv0 = _mm256_setzero_ps();
    let mut nv1 = _mm256_setzero_ps();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        let u0 = _mm256_loadu_ps(u_ptr.add(base));
        let u1 = _mm256_loadu_ps(u_ptr.add(base + 8));
        let v0 = _mm256_loadu_ps(v_ptr.add(base));
        let v1 = _mm256_loadu_ps(v_ptr.add(base + 8));
        dot0 = _mm256_fmadd_ps(u0, v0, dot0);
        dot1 = _mm256_fmadd_ps(u1, v1, dot1);
        nu0 = _mm256_fmadd_ps(u0, u0, nu0);
        nu1 = _mm256_fmadd_ps(u1, u1, nu1);
        nv0 = _mm256_fmadd_ps(v0, v0, nv0);
        nv1 = _mm256_fmadd_ps(v1, v1, nv1);
    }

    let mut dot = hsum_f32x8(_mm256_add_ps(dot0, dot1));
    let mut norm_u = hsum_f32x8(_mm256_add_ps(nu0, nu1));
    let mut norm_v = hsum_f32x8(_mm256_add_ps(nv0, nv1));

    for i in (chunks * 16)..len {
        let ui = *u_ptr.add(i);
        let vi = *v_ptr.add(i);
        dot += ui * vi;
        norm_u += ui * ui;
        norm_v += vi * vi;
    }

    let denom = norm_u.sqrt() * norm_v.sqrt();
    if denom < 1e-10 {
        return 1.0;
    }
    1.0 - dot / denom
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_dot(u: &[f32], v: &[f32]) -> f32 {
    let len = u.len();
    let u_ptr = u.as_ptr();
    let v_ptr = v.as_ptr();

    let mut s0 = _mm256_setzero_ps();
    let mut s1 = _mm256_setzero_ps();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        s0 = _mm256_fmadd_ps(
            _mm256_loadu_ps(u_ptr.add(base)),
            _mm256_loadu_ps(v_ptr.add(base)),
            s0,
        );
        s1 = _mm256_fmadd_ps(
            _mm256_loadu_ps(u_ptr.add(base + 8)),
            _mm256_loadu_ps(v_ptr.add(base + 8)),
            s1,
        );
    }

    let mut sum = hsum_f32x8(_mm256_add_ps(s0, s1));

    for i in (chunks * 16)..len {
        sum += *u_ptr.add(i) * *v_ptr.add(i);
    }
    sum
}
