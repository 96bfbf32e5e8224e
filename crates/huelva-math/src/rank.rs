//! Ranks and rank correlation.

use crate::stats::pearson;

/// One-based ranks with ties sharing their average rank.
///
/// Missing values keep a `NaN` rank and do not occupy a rank position.
pub fn average_rank(values: &[f64]) -> Vec<f64> {
    let mut indexed: Vec<(usize, f64)> = values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![f64::NAN; values.len()];
    let n = indexed.len();
    let mut i = 0;
    while i < n {
        let mut j = i;
        // Find ties
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for item in &indexed[i..j] {
            ranks[item.0] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Spearman rank correlation over the pairs where both values are present.
///
/// Values range from -1 to 1; `NaN` with fewer than two pairs or when either
/// side is constant.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();
    if xs.len() < 2 {
        return f64::NAN;
    }
    pearson(&average_rank(&xs), &average_rank(&ys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_average_rank_ties() {
        let r = average_rank(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(r, vec![3.5, 1.0, 3.5, 2.0]);
    }

    #[test]
    fn test_average_rank_skips_nan() {
        let r = average_rank(&[2.0, f64::NAN, 1.0]);
        assert_relative_eq!(r[0], 2.0);
        assert!(r[1].is_nan());
        assert_relative_eq!(r[2], 1.0);
    }

    #[test]
    fn test_spearman_perfect() {
        let scores = [1.0, 2.0, 3.0, 4.0, 5.0];
        let returns = [0.01, 0.02, 0.03, 0.04, 0.05];
        assert_relative_eq!(spearman(&scores, &returns), 1.0, epsilon = 1e-10);
        let reversed = [0.05, 0.04, 0.03, 0.02, 0.01];
        assert_relative_eq!(spearman(&scores, &reversed), -1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_spearman_monotone_transform_invariant() {
        let x = [0.3, -1.2, 2.5, 0.0, 0.7];
        let y: Vec<f64> = x.iter().map(|v: &f64| v.powi(3) + 10.0).collect();
        assert_relative_eq!(spearman(&x, &y), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_spearman_textbook_value() {
        // d = [0, -2, 1, 1, 0]; rho = 1 - 6 * 6 / (5 * 24)
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 2.0, 3.0, 5.0];
        assert_relative_eq!(spearman(&x, &y), 0.7, epsilon = 1e-10);
    }

    #[test]
    fn test_spearman_drops_missing_pairs() {
        let x = [1.0, f64::NAN, 3.0, 4.0];
        let y = [1.0, 5.0, 3.0, 4.0];
        assert_relative_eq!(spearman(&x, &y), 1.0, epsilon = 1e-10);
        assert!(spearman(&[1.0], &[2.0]).is_nan());
    }
}
