//! Registered warehouse stock.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Longest gap in stock reports bridged by forward filling.
const FILL_LIMIT: usize = 5;

/// `RS`: warehouse stock against its rolling mean (`PA`) and against its
/// level a window ago (`LA`), both as `1 - stock / reference`.
///
/// Takes exactly two windows; `RSDIFF` is the plain difference of the `PA`
/// pair.
#[derive(Debug, Clone)]
pub struct RsFactor {
    group: WinGroup,
    diff_wins: (usize, usize),
}

impl RsFactor {
    /// Creates the family from a two-window group.
    pub fn new(group: WinGroup) -> Result<Self> {
        let diff_wins = group.pair()?;
        Ok(Self { group, diff_wins })
    }

    fn fill_limit(&self) -> usize {
        FILL_LIMIT.min(self.group.wins().iter().copied().min().unwrap_or(FILL_LIMIT))
    }
}

/// `1 - x / reference` where the reference is positive.
fn relative_gap(x: &[f64], reference: &[f64]) -> Vec<f64> {
    robust::ret_alg(x, reference, -1.0, Guard::Positive)
}

impl FactorAlgorithm for RsFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_pa();
        names.extend(self.group.names_la());
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &["stock"])?;
        let filled = rolling::ffill(frame.column("stock")?, Some(self.fill_limit()));
        let stock = rolling::fill_nan(&filled, 0.0);
        for win in self.group.wins() {
            let average = rolling::mean(&stock, *win, *win);
            let lagged = rolling::shift(&stock, *win as i64);
            frame.insert(self.group.name_pa(*win), relative_gap(&stock, &average));
            frame.insert(self.group.name_la(*win), relative_gap(&stock, &lagged));
        }
        let (w0, w1) = self.diff_wins;
        let pa0 = frame.column(&self.group.name_pa(w0))?;
        let pa1 = frame.column(&self.group.name_pa(w1))?;
        let diff = pa0.iter().zip(pa1).map(|(a, b)| a - b).collect();
        frame.insert(self.group.name_diff(), diff);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
