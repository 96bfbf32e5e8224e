//! Correlation over the busiest sessions of a trailing window.

use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use crate::minute::sorted_desc;
use huelva_math::stats;

/// For every row with a full window, correlates `x` and `y` over the
/// `int(win * lbd)` sessions of the window with the largest `sort_key`.
///
/// `NaN` until the window fills and when fewer than two complete pairs
/// remain.
pub(crate) fn sliced_correlation(
    x: &[f64],
    y: &[f64],
    sort_key: &[f64],
    win: usize,
    lbd: f64,
) -> Vec<f64> {
    let pick = (win as f64 * lbd) as usize;
    (0..x.len())
        .map(|i| {
            if i + 1 < win {
                return f64::NAN;
            }
            let order = sorted_desc(i + 1 - win..i + 1, sort_key);
            let (xs, ys): (Vec<f64>, Vec<f64>) =
                order[..pick].iter().map(|j| (x[*j], y[*j])).unzip();
            stats::corr(&xs, &ys)
        })
        .collect()
}

/// Inserts every `(win, lbd)` vanilla column of `group`.
pub(crate) fn insert_sliced(
    frame: &mut DailyFrame,
    group: &WinLbdGroup,
    x: &[f64],
    y: &[f64],
    sort_key: &[f64],
) {
    for win in group.wins() {
        for lbd in group.lbds() {
            frame.insert(
                group.name_vanilla(*win, *lbd),
                sliced_correlation(x, y, sort_key, *win, *lbd),
            );
        }
    }
}
