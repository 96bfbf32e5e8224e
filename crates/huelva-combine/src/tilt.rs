//! Long/short risk balancing.

use huelva_math::CovarianceMatrix;

/// Rescales the short leg so both legs carry the same variance.
///
/// Instruments with `w >= 0` form the long leg and the rest the short leg.
/// When both legs have positive variance under `cov`, the short weights are
/// multiplied by `√(var_long / var_short)`; the result is renormalized to
/// `Σ|w| = 1`. `NaN` weights stay `NaN` and belong to neither leg.
pub fn covariance_tilt(instruments: &[String], weights: &[f64], cov: &CovarianceMatrix) -> Vec<f64> {
    let mut out = weights.to_vec();
    let (long, short): (Vec<usize>, Vec<usize>) = (0..weights.len())
        .filter(|&i| !weights[i].is_nan())
        .partition(|&i| weights[i] >= 0.0);

    let leg_variance = |leg: &[usize]| {
        let names: Vec<String> = leg.iter().map(|&i| instruments[i].clone()).collect();
        let w: Vec<f64> = leg.iter().map(|&i| weights[i]).collect();
        cov.portfolio_variance(&names, &w)
    };
    if !long.is_empty() && !short.is_empty() {
        let (var_long, var_short) = (leg_variance(&long), leg_variance(&short));
        if var_long > 0.0 && var_short > 0.0 {
            let ratio = (var_long / var_short).sqrt();
            for &i in &short {
                out[i] *= ratio;
            }
        }
    }

    let gross: f64 = out.iter().filter(|w| !w.is_nan()).map(|w| w.abs()).sum();
    if gross > 0.0 {
        for w in &mut out {
            *w /= gross;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn names() -> Vec<String> {
        ["AL", "CU", "ZN", "NI"].iter().map(|s| s.to_string()).collect()
    }

    fn diagonal(v: [f64; 4]) -> CovarianceMatrix {
        let m = array![
            [v[0], 0.0, 0.0, 0.0],
            [0.0, v[1], 0.0, 0.0],
            [0.0, 0.0, v[2], 0.0],
            [0.0, 0.0, 0.0, v[3]],
        ];
        CovarianceMatrix::new(names(), m)
    }

    #[test]
    fn test_short_leg_matches_long_risk() {
        // Long leg AL+CU, short leg ZN+NI with four times the variance.
        let w = [0.25, 0.25, -0.25, -0.25];
        let cov = diagonal([1.0, 1.0, 4.0, 4.0]);
        let out = covariance_tilt(&names(), &w, &cov);
        // Short weights halve before renormalization.
        assert_relative_eq!(out[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], -1.0 / 6.0, epsilon = 1e-12);
        let var_long = cov.portfolio_variance(&names()[..2], &out[..2]);
        let var_short = cov.portfolio_variance(&names()[2..], &out[2..]);
        assert_relative_eq!(var_long, var_short, epsilon = 1e-12);
        assert_relative_eq!(out.iter().map(|v| v.abs()).sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_one_sided_only_renormalizes() {
        let w = [0.2, 0.2, 0.0, 0.1];
        let out = covariance_tilt(&names(), &w, &diagonal([1.0; 4]));
        assert_relative_eq!(out[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(out[3], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_leg_untouched() {
        let w = [0.25, 0.25, -0.25, -0.25];
        let out = covariance_tilt(&names(), &w, &diagonal([1.0, 1.0, 0.0, 0.0]));
        assert_eq!(out, w.to_vec());
    }

    #[test]
    fn test_nan_kept() {
        let w = [0.5, f64::NAN, -0.25, -0.25];
        let out = covariance_tilt(&names(), &w, &diagonal([1.0; 4]));
        assert!(out[1].is_nan());
        assert_relative_eq!(out[0] + out[2].abs() + out[3].abs(), 1.0, epsilon = 1e-12);
    }
}
