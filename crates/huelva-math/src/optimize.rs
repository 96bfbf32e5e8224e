//! Bounded Sharpe-ratio maximization.
//!
//! Maximizes `m·w / √(wᵀVw)` over a per-asset box intersected with a band on
//! the total absolute weight `Σ|w|`. The solver is a projected gradient
//! ascent with an adaptive step; the projection first clips to the box and
//! then moves every weight by a common shift (soft threshold toward zero, or
//! away from it) found by bisection until the budget band is met.

use huelva_traits::{HuelvaError, Result};
use ndarray::{Array1, Array2};

const BISECTION_STEPS: usize = 100;

/// Per-asset bounds `±drift` (relative) around an initial guess, ordered so
/// that `lower <= upper` whatever the sign of the guess.
pub fn drift_bounds(x0: &[f64], drift: f64) -> (Vec<f64>, Vec<f64>) {
    x0.iter()
        .map(|&z| {
            let (a, b) = (z * (1.0 - drift), z * (1.0 + drift));
            if a <= b { (a, b) } else { (b, a) }
        })
        .unzip()
}

/// The outcome of [`SharpeProblem::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    /// Best weights found: the solution, or the initial guess when the
    /// solution did not improve on it.
    pub weights: Vec<f64>,
    /// Objective at `weights`.
    pub sharpe: f64,
    /// Objective at the initial guess.
    pub initial_sharpe: f64,
    /// Accepted ascent steps.
    pub iterations: usize,
    /// Whether the solution beats the initial guess.
    pub improved: bool,
}

/// A bounded mean-variance Sharpe problem.
#[derive(Debug, Clone)]
pub struct SharpeProblem {
    mean: Array1<f64>,
    cov: Array2<f64>,
    x0: Array1<f64>,
    lower: Array1<f64>,
    upper: Array1<f64>,
    budget: (f64, f64),
    max_iter: usize,
    tol: f64,
}

impl SharpeProblem {
    /// Creates an unbounded problem seeded at `x0`.
    ///
    /// # Errors
    ///
    /// [`HuelvaError::DataContract`] when dimensions disagree.
    pub fn new(mean: Vec<f64>, cov: Array2<f64>, x0: Vec<f64>) -> Result<Self> {
        let n = mean.len();
        if cov.dim() != (n, n) || x0.len() != n {
            return Err(HuelvaError::DataContract(format!(
                "sharpe problem: mean has {n} assets, covariance is {:?}, x0 has {}",
                cov.dim(),
                x0.len()
            )));
        }
        Ok(Self {
            mean: Array1::from(mean),
            cov,
            x0: Array1::from(x0),
            lower: Array1::from_elem(n, f64::NEG_INFINITY),
            upper: Array1::from_elem(n, f64::INFINITY),
            budget: (0.0, f64::INFINITY),
            max_iter: 1000,
            tol: 1e-10,
        })
    }

    /// Sets per-asset bounds.
    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        let n = self.mean.len();
        if lower.len() != n || upper.len() != n {
            return Err(HuelvaError::DataContract(format!(
                "sharpe problem: {n} assets but {} lower and {} upper bounds",
                lower.len(),
                upper.len()
            )));
        }
        if lower.iter().zip(&upper).any(|(l, u)| l > u) {
            return Err(HuelvaError::DataContract(
                "sharpe problem: lower bound above upper bound".to_string(),
            ));
        }
        self.lower = Array1::from(lower);
        self.upper = Array1::from(upper);
        Ok(self)
    }

    /// Sets the band on `Σ|w|`.
    #[must_use]
    pub const fn with_budget(mut self, low: f64, high: f64) -> Self {
        self.budget = (low, high);
        self
    }

    /// Caps the number of ascent attempts.
    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// The objective; `NaN` when the portfolio variance is not positive.
    pub fn sharpe(&self, w: &Array1<f64>) -> f64 {
        let var = w.dot(&self.cov.dot(w));
        if var > 0.0 && var.is_finite() {
            self.mean.dot(w) / var.sqrt()
        } else {
            f64::NAN
        }
    }

    fn gradient(&self, w: &Array1<f64>) -> Option<Array1<f64>> {
        let vw = self.cov.dot(w);
        let var = w.dot(&vw);
        if var <= 0.0 || !var.is_finite() {
            return None;
        }
        let s = var.sqrt();
        let mw = self.mean.dot(w);
        Some(&self.mean / s - &vw * (mw / (s * s * s)))
    }

    fn clip(&self, v: &Array1<f64>) -> Array1<f64> {
        let mut out = v.clone();
        for ((x, lo), hi) in out.iter_mut().zip(&self.lower).zip(&self.upper) {
            *x = x.clamp(*lo, *hi);
        }
        out
    }

    fn abs_sum(w: &Array1<f64>) -> f64 {
        w.iter().map(|x| x.abs()).sum()
    }

    fn shrink(&self, v: &Array1<f64>, tau: f64) -> Array1<f64> {
        let moved = v.mapv(|x| x.signum() * (x.abs() - tau).max(0.0));
        self.clip(&moved)
    }

    fn expand(&self, v: &Array1<f64>, tau: f64) -> Array1<f64> {
        let mut moved = v.clone();
        for (i, x) in moved.iter_mut().enumerate() {
            let dir = if *x != 0.0 {
                x.signum()
            } else {
                let mid = 0.5 * (self.lower[i].max(-1.0) + self.upper[i].min(1.0));
                if mid < 0.0 { -1.0 } else { 1.0 }
            };
            *x += dir * tau;
        }
        self.clip(&moved)
    }

    /// Maps `v` onto the box and, as far as the box allows, into the budget band.
    pub fn project(&self, v: &Array1<f64>) -> Array1<f64> {
        let clipped = self.clip(v);
        let total = Self::abs_sum(&clipped);
        let (low, high) = self.budget;
        if total > high {
            let mut hi = v.iter().fold(0.0f64, |m, x| m.max(x.abs()));
            if Self::abs_sum(&self.shrink(v, hi)) > high {
                return self.shrink(v, hi);
            }
            let mut lo = 0.0;
            for _ in 0..BISECTION_STEPS {
                let mid = 0.5 * (lo + hi);
                if Self::abs_sum(&self.shrink(v, mid)) > high {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            self.shrink(v, hi)
        } else if total < low {
            let mut hi = 1.0;
            let mut reached = false;
            for _ in 0..64 {
                if Self::abs_sum(&self.expand(v, hi)) >= low {
                    reached = true;
                    break;
                }
                hi *= 2.0;
            }
            if !reached {
                return self.expand(v, hi);
            }
            let mut lo = 0.0;
            for _ in 0..BISECTION_STEPS {
                let mid = 0.5 * (lo + hi);
                if Self::abs_sum(&self.expand(v, mid)) < low {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            self.expand(v, hi)
        } else {
            clipped
        }
    }

    /// Runs the ascent from the projected initial guess.
    pub fn solve(&self) -> OptimizeOutcome {
        let initial_sharpe = self.sharpe(&self.x0);
        let mut w = self.project(&self.x0);
        let mut f = self.sharpe(&w);
        let scale = w.iter().map(|x| x * x).sum::<f64>().sqrt();
        let mut step = 0.1 * if scale > 0.0 { scale } else { 1.0 };
        let mut iterations = 0;
        let mut flat_steps = 0;

        for _ in 0..self.max_iter {
            let Some(g) = self.gradient(&w) else {
                break;
            };
            let norm = g.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm == 0.0 || !norm.is_finite() {
                break;
            }
            let candidate = self.project(&(&w + &(g * (step / norm))));
            let fc = self.sharpe(&candidate);
            if fc.is_finite() && (f.is_nan() || fc > f) {
                let gain = if f.is_nan() { f64::INFINITY } else { fc - f };
                w = candidate;
                f = fc;
                iterations += 1;
                step *= 1.5;
                if gain < self.tol * (1.0 + f.abs()) {
                    flat_steps += 1;
                    if flat_steps >= 3 {
                        break;
                    }
                } else {
                    flat_steps = 0;
                }
            } else {
                step *= 0.5;
                if step < 1e-14 {
                    break;
                }
            }
        }

        let improved = f.is_finite() && (initial_sharpe.is_nan() || f > initial_sharpe);
        if improved {
            OptimizeOutcome {
                weights: w.to_vec(),
                sharpe: f,
                initial_sharpe,
                iterations,
                improved,
            }
        } else {
            OptimizeOutcome {
                weights: self.x0.to_vec(),
                sharpe: initial_sharpe,
                initial_sharpe,
                iterations,
                improved,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_drift_bounds_are_ordered() {
        let (lo, hi) = drift_bounds(&[0.5, -0.5, 0.0], 0.2);
        assert_relative_eq!(lo[0], 0.4);
        assert_relative_eq!(hi[0], 0.6);
        assert_relative_eq!(lo[1], -0.6);
        assert_relative_eq!(hi[1], -0.4);
        assert_eq!((lo[2], hi[2]), (0.0, 0.0));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let err = SharpeProblem::new(vec![0.1, 0.2], Array2::eye(3), vec![0.5, 0.5]);
        assert!(err.is_err());
    }

    #[test]
    fn test_projection_respects_box_and_budget() {
        let p = SharpeProblem::new(vec![0.0; 3], Array2::eye(3), vec![0.0; 3])
            .unwrap()
            .with_bounds(vec![-0.5; 3], vec![0.5; 3])
            .unwrap()
            .with_budget(0.8, 1.2);
        let w = p.project(&array![2.0, 1.0, -1.0]);
        let total: f64 = w.iter().map(|x| x.abs()).sum();
        assert!(total <= 1.2 + 1e-9);
        assert!(w.iter().all(|x| x.abs() <= 0.5 + 1e-12));

        let w = p.project(&array![0.1, -0.1, 0.0]);
        let total: f64 = w.iter().map(|x| x.abs()).sum();
        assert!(total >= 0.8 - 1e-9);
    }

    #[test]
    fn test_solve_improves_on_poor_guess() {
        // independent assets: optimum is proportional to m / var
        let mean = vec![0.02, 0.01];
        let cov = array![[0.04, 0.0], [0.0, 0.01]];
        let x0 = vec![0.2, 0.8];
        let (lo, hi) = (vec![0.0, 0.0], vec![1.0, 1.0]);
        let p = SharpeProblem::new(mean, cov, x0)
            .unwrap()
            .with_bounds(lo, hi)
            .unwrap()
            .with_budget(0.9, 1.1);
        let out = p.solve();
        assert!(out.improved);
        assert!(out.sharpe > out.initial_sharpe);
        let ratio = out.weights[0] / out.weights[1];
        assert_relative_eq!(ratio, 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_solve_keeps_initial_guess_when_stuck() {
        let p = SharpeProblem::new(vec![0.01, 0.01], Array2::zeros((2, 2)), vec![0.5, 0.5]).unwrap();
        let out = p.solve();
        assert!(!out.improved);
        assert_eq!(out.weights, vec![0.5, 0.5]);
    }
}
