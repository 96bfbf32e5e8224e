//! Guarded ratios.
//!
//! Division by a zero or wrong-signed denominator yields `NaN` (or a fill
//! value) at that position instead of an infinity.

/// Condition a denominator must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Guard {
    /// `y != 0`.
    #[default]
    NonZero,
    /// `y > 0`.
    Positive,
    /// `y < 0`.
    Negative,
}

impl Guard {
    /// Whether `y` may be used as a denominator. `NaN` never passes.
    #[must_use]
    pub fn admits(self, y: f64) -> bool {
        match self {
            Self::NonZero => y != 0.0 && !y.is_nan(),
            Self::Positive => y > 0.0,
            Self::Negative => y < 0.0,
        }
    }
}

/// `(x / y - 1) * scale`, or `NaN` when `y` fails the guard.
#[must_use]
pub fn ratio(x: f64, y: f64, scale: f64, guard: Guard) -> f64 {
    if guard.admits(y) {
        (x / y - 1.0) * scale
    } else {
        f64::NAN
    }
}

/// Element-wise [`ratio`].
pub fn ret_alg(x: &[f64], y: &[f64], scale: f64, guard: Guard) -> Vec<f64> {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .map(|(&a, &b)| ratio(a, b, scale, guard))
        .collect()
}

/// `ln(x / y) * scale` where both operands are positive, `NaN` elsewhere.
pub fn ret_log(x: &[f64], y: &[f64], scale: f64) -> Vec<f64> {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .map(|(&a, &b)| {
            if a > 0.0 && b > 0.0 {
                (a / b).ln() * scale
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// `x / y` guarded on `y`; any missing result, including a missing `x`,
/// becomes `fill`.
pub fn div(x: &[f64], y: &[f64], fill: f64, guard: Guard) -> Vec<f64> {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .map(|(&a, &b)| {
            let v = if guard.admits(b) { a / b } else { f64::NAN };
            if v.is_nan() { fill } else { v }
        })
        .collect()
}
