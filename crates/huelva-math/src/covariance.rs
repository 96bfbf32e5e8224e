//! Instrument covariance matrices.
//!
//! The covariance store keeps one row per instrument pair and date. A matrix
//! is rebuilt from whichever triangle was stored: present entries are
//! mirrored, missing pairs stay at zero.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::collections::HashMap;

/// A symmetric covariance matrix labelled by instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    instruments: Vec<String>,
    values: Array2<f64>,
}

impl CovarianceMatrix {
    /// Wraps an already symmetric matrix.
    pub fn new(instruments: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(values.nrows(), instruments.len());
        Self {
            instruments,
            values,
        }
    }

    /// Rebuilds a matrix from `(instrument0, instrument1, cov)` rows.
    ///
    /// Rows naming an instrument outside `instruments` are ignored and
    /// non-finite covariances are treated as missing. The stored triangle is
    /// mirrored (`M + Mᵀ − diag(M)`).
    pub fn from_long_form<'a, I>(rows: I, instruments: &[String]) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let n = instruments.len();
        let index: HashMap<&str, usize> = instruments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let mut values = Array2::<f64>::zeros((n, n));
        for (a, b, cov) in rows {
            if !cov.is_finite() {
                continue;
            }
            if let (Some(&i), Some(&j)) = (index.get(a), index.get(b)) {
                values[[i, j]] = cov;
                values[[j, i]] = cov;
            }
        }
        Self::new(instruments.to_vec(), values)
    }

    /// Instrument labels in matrix order.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// The raw matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Whether the matrix is empty.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// The sub-matrix for `names`, in that order; unknown names get zero rows.
    pub fn select(&self, names: &[String]) -> Array2<f64> {
        let index: HashMap<&str, usize> = self
            .instruments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let positions: Vec<Option<usize>> =
            names.iter().map(|n| index.get(n.as_str()).copied()).collect();
        let k = names.len();
        Array2::from_shape_fn((k, k), |(r, c)| match (positions[r], positions[c]) {
            (Some(i), Some(j)) => self.values[[i, j]],
            _ => 0.0,
        })
    }

    /// Portfolio variance `wᵀ V w` for weights on `names`.
    pub fn portfolio_variance(&self, names: &[String], weights: &[f64]) -> f64 {
        let v = self.select(names);
        let w = Array1::from(weights.to_vec());
        w.dot(&v.dot(&w))
    }
}

/// Unbiased sample covariance of the columns of `data` (rows are observations).
///
/// Fewer than two rows give a zero matrix.
pub fn sample_covariance(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let (t, n) = data.dim();
    if t < 2 {
        return Array2::zeros((n, n));
    }
    let Some(mean) = data.mean_axis(Axis(0)) else {
        return Array2::zeros((n, n));
    };
    let centered = &data - &mean;
    centered.t().dot(&centered) / (t - 1) as f64
}

/// Correlation matrix of the columns of `data`; flat columns correlate 0
/// with everything and 1 with themselves.
pub fn correlation_matrix(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let cov = sample_covariance(data);
    let n = cov.nrows();
    let sd: Vec<f64> = (0..n).map(|i| cov[[i, i]].max(0.0).sqrt()).collect();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            1.0
        } else if sd[i] > 0.0 && sd[j] > 0.0 {
            cov[[i, j]] / (sd[i] * sd[j])
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_from_long_form_mirrors_triangle() {
        let instruments = names(&["AL", "CU", "ZN"]);
        let rows = vec![
            ("AL", "AL", 0.04),
            ("AL", "CU", 0.01),
            ("CU", "CU", 0.09),
            ("ZN", "CU", -0.02),
            ("XX", "AL", 1.0),
        ];
        let m = CovarianceMatrix::from_long_form(rows, &instruments);
        let v = m.values();
        assert_relative_eq!(v[[0, 1]], 0.01);
        assert_relative_eq!(v[[1, 0]], 0.01);
        assert_relative_eq!(v[[1, 2]], -0.02);
        assert_relative_eq!(v[[2, 1]], -0.02);
        assert_relative_eq!(v[[2, 2]], 0.0);
        assert_relative_eq!(v[[1, 1]], 0.09);
    }

    #[test]
    fn test_select_and_portfolio_variance() {
        let m = CovarianceMatrix::new(names(&["A", "B"]), array![[0.04, 0.01], [0.01, 0.09]]);
        let sub = m.select(&names(&["B", "Q"]));
        assert_relative_eq!(sub[[0, 0]], 0.09);
        assert_relative_eq!(sub[[1, 1]], 0.0);
        let var = m.portfolio_variance(&names(&["A", "B"]), &[0.5, -0.5]);
        assert_relative_eq!(var, 0.25 * 0.04 + 0.25 * 0.09 - 0.5 * 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_covariance() {
        let data = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let cov = sample_covariance(data.view());
        assert_relative_eq!(cov[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 4.0, epsilon = 1e-12);
        let corr = correlation_matrix(data.view());
        assert_relative_eq!(corr[[0, 1]], 1.0, epsilon = 1e-12);
    }
}
