//! Long/short horizon contrasts.
//!
//! A diff factor subtracts a short-window variant from a long-window one. The
//! long leg is rescaled first so both horizons contribute comparable variance
//! under a random walk.

/// How the long leg of a diff is rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffScale {
    /// Rolling means: long leg times `√(long / short)`.
    #[default]
    Mean,
    /// Rolling sums: long leg times `√(short / long)`.
    Sum,
    /// No rescaling.
    None,
}

impl DiffScale {
    /// Multiplier applied to the long leg.
    #[must_use]
    pub fn factor(self, long_win: usize, short_win: usize) -> f64 {
        let (l, s) = (long_win as f64, short_win as f64);
        match self {
            Self::Mean => (l / s).sqrt(),
            Self::Sum => (s / l).sqrt(),
            Self::None => 1.0,
        }
    }
}

/// `long * scale - short`, element-wise.
pub fn diff(
    long: &[f64],
    short: &[f64],
    long_win: usize,
    short_win: usize,
    scale: DiffScale,
) -> Vec<f64> {
    debug_assert_eq!(long.len(), short.len());
    let k = scale.factor(long_win, short_win);
    long.iter().zip(short).map(|(l, s)| l * k - s).collect()
}
