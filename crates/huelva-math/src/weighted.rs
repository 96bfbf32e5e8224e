//! Rank weights and weighted moments.
//!
//! The exponential rank weight is the spread-portfolio primitive used by the
//! testing engine and the signal combiner: the top of a sorted cross section
//! goes long, the bottom goes short, and magnitudes decay geometrically from
//! the extremes toward the center.

use crate::rank::average_rank;
use crate::stats;

fn decay_ratio(k0: usize, rate: f64) -> f64 {
    if k0 > 1 {
        rate.powf(1.0 / (k0 - 1) as f64)
    } else {
        1.0
    }
}

fn normalize_abs(raw: Vec<f64>) -> Vec<f64> {
    let total: f64 = raw.iter().map(|v| v.abs()).sum();
    if total > 0.0 {
        raw.into_iter().map(|v| v / total).collect()
    } else {
        vec![0.0; raw.len()]
    }
}

/// Exponential rank weights for a cross section of `k` names sorted descending.
///
/// With `k0 = k / 2`, the first `k0` weights are positive, the last `k0`
/// negative and a middle name (odd `k`) gets zero. Adjacent same-sign
/// magnitudes differ by `rate^(1/(k0-1))`, so the innermost weight is `rate`
/// times the outermost. The result satisfies `Σ|w| = 1` (all zeros when
/// `k < 2`).
///
/// ```
/// use huelva_math::weighted::gen_exp_weight;
///
/// let w = gen_exp_weight(5, 0.25);
/// assert!((w[1] / w[0] - 0.25).abs() < 1e-12);
/// assert_eq!(w[2], 0.0);
/// ```
pub fn gen_exp_weight(k: usize, rate: f64) -> Vec<f64> {
    let k0 = k / 2;
    let odd = k % 2 == 1;
    let rho = decay_ratio(k0, rate);
    let mut raw = Vec::with_capacity(k);
    for i in 0..k0 {
        raw.push(rho.powi(i as i32));
    }
    if odd {
        raw.push(0.0);
    }
    for i in (0..k0).rev() {
        raw.push(-rho.powi(i as i32));
    }
    normalize_abs(raw)
}

/// Maps raw scores to exponential rank weights on their continuous rank.
///
/// Missing scores take the cross-sectional median; ties share an average
/// rank. Scores above the middle rank get positive weights.
pub fn map_to_weight(values: &[f64], rate: f64) -> Vec<f64> {
    let k = values.len();
    if k == 0 {
        return Vec::new();
    }
    let k0 = k / 2;
    let r0 = (k + 1) as f64 / 2.0;
    let rho = decay_ratio(k0, rate);
    let med = stats::median(values);
    if med.is_nan() {
        return vec![0.0; k];
    }
    let filled: Vec<f64> = values
        .iter()
        .map(|v| if v.is_nan() { med } else { *v })
        .collect();
    let raw: Vec<f64> = average_rank(&filled)
        .into_iter()
        .map(|r| {
            let d = r - r0;
            let sign = if d > 0.0 {
                1.0
            } else if d < 0.0 {
                -1.0
            } else {
                0.0
            };
            sign * rho.powf(r0 - d.abs())
        })
        .collect();
    normalize_abs(raw)
}

/// Weighted covariance; `w` is expected to be non-negative and sum to 1.
pub fn wcov(x: &[f64], y: &[f64], w: &[f64]) -> f64 {
    let dot = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(p, q)| p * q).sum::<f64>();
    let xy: Vec<f64> = x.iter().zip(y).map(|(a, b)| a * b).collect();
    dot(w, &xy) - dot(w, x) * dot(w, y)
}

/// Weighted correlation with weights normalized to `Σ|w| = 1`.
///
/// Returns `0.0` when either weighted variance is not positive.
pub fn wcorr(x: &[f64], y: &[f64], w: &[f64]) -> f64 {
    let total: f64 = w.iter().map(|v| v.abs()).sum();
    if total <= 0.0 {
        tracing::warn!("weighted correlation with zero total weight");
        return 0.0;
    }
    let w: Vec<f64> = w.iter().map(|v| v / total).collect();
    let vxy = wcov(x, y, &w);
    let vxx = wcov(x, x, &w);
    let vyy = wcov(y, y, &w);
    if vxx > 0.0 && vyy > 0.0 {
        vxy / (vxx * vyy).sqrt()
    } else {
        tracing::warn!(vxx, vyy, "degenerate weighted correlation");
        0.0
    }
}

/// Standard deviation of `x`, weighted when `w` is given.
pub fn weighted_volatility(x: &[f64], w: Option<&[f64]>) -> f64 {
    let Some(w) = w else {
        return stats::std(x);
    };
    let total: f64 = w.iter().map(|v| v.abs()).sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    let (mut mu, mut x2) = (0.0, 0.0);
    for (a, b) in x.iter().zip(w) {
        let wb = b / total;
        mu += a * wb;
        x2 += a * a * wb;
    }
    (x2 - mu * mu).max(0.0).sqrt()
}

/// Time-decay weights over `decay` observations, oldest first.
///
/// The newest observation weighs `1`, the oldest `rate`, geometric in
/// between; the vector is normalized to sum to 1.
pub fn ewa_weights(decay: usize, rate: f64) -> Vec<f64> {
    match decay {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let raw: Vec<f64> = (0..decay)
                .map(|j| rate.powf((decay - 1 - j) as f64 / (decay - 1) as f64))
                .collect();
            let total: f64 = raw.iter().sum();
            raw.into_iter().map(|v| v / total).collect()
        }
    }
}

/// Exponentially weighted trailing average with [`ewa_weights`].
///
/// Missing observations are dropped and the remaining weights renormalized;
/// a window without observations yields `NaN`.
pub fn ewa(x: &[f64], decay: usize, rate: f64) -> Vec<f64> {
    let weights = ewa_weights(decay, rate);
    (0..x.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(decay);
            let offset = decay - (i + 1 - start);
            let (mut acc, mut wsum) = (0.0, 0.0);
            for (j, v) in x[start..=i].iter().enumerate() {
                if !v.is_nan() {
                    let w = weights[offset + j];
                    acc += v * w;
                    wsum += w;
                }
            }
            if wsum > 0.0 { acc / wsum } else { f64::NAN }
        })
        .collect()
}
