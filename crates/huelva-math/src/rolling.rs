//! Trailing-window transforms over a date-ordered series.
//!
//! A window at position `i` covers `x[i+1-win ..= i]`. Missing values inside
//! the window are skipped; the output is `NaN` until at least `min_periods`
//! valid points are available. The estimators' own minimum sample sizes from
//! [`crate::stats`] apply on top of `min_periods`.

use crate::stats;

fn window(len: usize, i: usize, win: usize) -> std::ops::Range<usize> {
    let start = (i + 1).saturating_sub(win);
    start..(i + 1).min(len)
}

/// Applies `f` to the valid values of every trailing window.
pub fn apply<F>(x: &[f64], win: usize, min_periods: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let min_periods = min_periods.max(1);
    (0..x.len())
        .map(|i| {
            let values = stats::valid(&x[window(x.len(), i, win)]);
            if values.len() < min_periods {
                f64::NAN
            } else {
                f(&values)
            }
        })
        .collect()
}

/// Applies `f` to the complete `(x, y)` pairs of every trailing window.
pub fn apply_pair<F>(x: &[f64], y: &[f64], win: usize, min_periods: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    debug_assert_eq!(x.len(), y.len());
    let min_periods = min_periods.max(1);
    (0..x.len())
        .map(|i| {
            let range = window(x.len(), i, win);
            let (xs, ys): (Vec<f64>, Vec<f64>) = x[range.clone()]
                .iter()
                .zip(&y[range])
                .filter(|(a, b)| !a.is_nan() && !b.is_nan())
                .map(|(a, b)| (*a, *b))
                .unzip();
            if xs.len() < min_periods {
                f64::NAN
            } else {
                f(&xs, &ys)
            }
        })
        .collect()
}

/// Rolling mean.
pub fn mean(x: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply(x, win, min_periods, stats::mean)
}

/// Rolling sum.
pub fn sum(x: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply(x, win, min_periods, |v| v.iter().sum())
}

/// Rolling sample standard deviation.
pub fn std(x: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply(x, win, min_periods, stats::std)
}

/// Rolling bias-corrected skewness.
pub fn skew(x: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply(x, win, min_periods, stats::skew)
}

/// Rolling bias-corrected excess kurtosis.
pub fn kurt(x: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply(x, win, min_periods, stats::kurt)
}

/// Rolling Pearson correlation.
pub fn corr(x: &[f64], y: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply_pair(x, y, win, min_periods, stats::pearson)
}

/// Rolling OLS slope of `y` on `x` (with intercept); `NaN` when `x` is flat.
pub fn beta(x: &[f64], y: &[f64], win: usize, min_periods: usize) -> Vec<f64> {
    apply_pair(x, y, win, min_periods, |xs, ys| {
        let n = xs.len();
        if n < 2 {
            return f64::NAN;
        }
        let nf = n as f64;
        let mx = xs.iter().sum::<f64>() / nf;
        let my = ys.iter().sum::<f64>() / nf;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (a, b) in xs.iter().zip(ys) {
            sxy += (a - mx) * (b - my);
            sxx += (a - mx) * (a - mx);
        }
        if sxx > 0.0 { sxy / sxx } else { f64::NAN }
    })
}

/// Shifts forward by `n` positions (negative `n` looks ahead), padding with `NaN`.
pub fn shift(x: &[f64], n: i64) -> Vec<f64> {
    let len = x.len() as i64;
    (0..len)
        .map(|i| {
            let j = i - n;
            if (0..len).contains(&j) {
                x[j as usize]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Forward-fills missing values, at most `limit` consecutive positions.
pub fn ffill(x: &[f64], limit: Option<usize>) -> Vec<f64> {
    let mut out = Vec::with_capacity(x.len());
    let mut last = f64::NAN;
    let mut run = 0usize;
    for &v in x {
        if v.is_nan() {
            run += 1;
            if limit.is_none_or(|l| run <= l) {
                out.push(last);
            } else {
                out.push(f64::NAN);
            }
        } else {
            last = v;
            run = 0;
            out.push(v);
        }
    }
    out
}

/// Replaces missing values with `value`.
pub fn fill_nan(x: &[f64], value: f64) -> Vec<f64> {
    x.iter()
        .map(|v| if v.is_nan() { value } else { *v })
        .collect()
}
