//! Sample estimators over slices.
//!
//! `NaN` entries are skipped. Each estimator needs a minimum number of valid
//! points (`std` 2, `skew` 3, `kurt` 4) and returns `NaN` below it.

/// The non-`NaN` entries of `x`.
pub fn valid(x: &[f64]) -> Vec<f64> {
    x.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn all_equal(x: &[f64]) -> bool {
    x.windows(2).all(|w| w[0] == w[1])
}

/// Arithmetic mean.
pub fn mean(x: &[f64]) -> f64 {
    let v = valid(x);
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Sum of the valid entries, `NaN` when there are none.
pub fn sum(x: &[f64]) -> f64 {
    let v = valid(x);
    if v.is_empty() { f64::NAN } else { v.iter().sum() }
}

/// Unbiased sample variance.
pub fn var(x: &[f64]) -> f64 {
    let v = valid(x);
    let n = v.len();
    if n < 2 {
        return f64::NAN;
    }
    if all_equal(&v) {
        return 0.0;
    }
    let mu = v.iter().sum::<f64>() / n as f64;
    v.iter().map(|a| (a - mu).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation.
pub fn std(x: &[f64]) -> f64 {
    var(x).sqrt()
}

fn central_moments(v: &[f64]) -> (f64, f64, f64) {
    let n = v.len() as f64;
    let mu = v.iter().sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for a in v {
        let d = a - mu;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Bias-corrected sample skewness; `NaN` for constant input.
pub fn skew(x: &[f64]) -> f64 {
    let v = valid(x);
    let n = v.len();
    if n < 3 || all_equal(&v) {
        return f64::NAN;
    }
    let (m2, m3, _) = central_moments(&v);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-corrected sample excess kurtosis; `NaN` for constant input.
pub fn kurt(x: &[f64]) -> f64 {
    let v = valid(x);
    let n = v.len();
    if n < 4 || all_equal(&v) {
        return f64::NAN;
    }
    let (m2, _, m4) = central_moments(&v);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    let n = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Median of the valid entries.
pub fn median(x: &[f64]) -> f64 {
    let mut v = valid(x);
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}

/// Pearson correlation over pairs where both sides are present.
///
/// `NaN` with fewer than two pairs or when either side has zero variance.
pub fn corr(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip();
    pearson(&xs, &ys)
}

/// Pearson correlation of two complete, equally long samples.
pub(crate) fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 || all_equal(xs) || all_equal(ys) {
        return f64::NAN;
    }
    let nf = n as f64;
    let mx = xs.iter().sum::<f64>() / nf;
    let my = ys.iter().sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in xs.iter().zip(ys) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Lag-one autocorrelation: correlation of `x[1..]` with `x[..n-1]`.
pub fn autocorr(x: &[f64]) -> f64 {
    if x.len() < 3 {
        return f64::NAN;
    }
    corr(&x[1..], &x[..x.len() - 1])
}

/// Shannon entropy of a non-negative weight distribution.
///
/// Non-positive and missing weights are dropped; `NaN` when nothing remains.
pub fn entropy(weights: &[f64]) -> f64 {
    let w: Vec<f64> = weights.iter().copied().filter(|v| *v > 0.0).collect();
    let total: f64 = w.iter().sum();
    if w.is_empty() || total <= 0.0 {
        return f64::NAN;
    }
    -w.iter()
        .map(|v| {
            let p = v / total;
            p * p.ln()
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_skip_nan() {
        let x = [1.0, f64::NAN, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&x), 2.5);
        assert_relative_eq!(std(&x), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(std(&[1.0]).is_nan());
        assert_eq!(std(&[0.1, 0.1, 0.1]), 0.0);
    }

    #[test]
    fn test_skew_matches_bias_corrected_estimator() {
        let s = skew(&[1.0, 2.0, 3.0, 10.0]);
        assert_relative_eq!(s, 1.763_632_614_803_888, epsilon = 1e-9);
        assert!(skew(&[1.0, 2.0]).is_nan());
        assert!(skew(&[2.0, 2.0, 2.0]).is_nan());
    }

    #[test]
    fn test_kurt_matches_bias_corrected_estimator() {
        let k = kurt(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert_relative_eq!(k, 3.152, epsilon = 1e-9);
        assert!(kurt(&[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_median() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, f64::NAN, 2.0, 3.0]), 2.5);
        assert!(median(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_corr_guards() {
        assert_relative_eq!(corr(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0, epsilon = 1e-12);
        assert!(corr(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(corr(&[1.0, f64::NAN], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn test_autocorr() {
        let a = autocorr(&[1.0, -1.0, 1.0, -1.0, 1.0]);
        assert_relative_eq!(a, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_entropy_of_uniform_distribution() {
        assert_relative_eq!(entropy(&[2.0, 2.0, 2.0, 2.0]), 4.0f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(entropy(&[5.0, 0.0, -1.0]), 0.0);
        assert!(entropy(&[0.0, f64::NAN]).is_nan());
    }
}
