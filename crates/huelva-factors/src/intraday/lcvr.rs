//! Lead correlation of volume and return.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `-corr(vol[t], ret[t+1]) - corr(vol[t], |ret[t+1]|)` over one session's
/// bars; each term is 0 when either side is flat.
fn lead_correlation(vol: &[f64], ret: &[f64]) -> f64 {
    let n = vol.len();
    if n < 2 {
        return 0.0;
    }
    let sv = rolling::fill_nan(&vol[..n - 1], 0.0);
    let sr = &ret[1..];
    let sa: Vec<f64> = sr.iter().map(|r| r.abs()).collect();
    let term = |other: &[f64]| {
        if stats::std(&sv) > 0.0 && stats::std(other) > 0.0 {
            -stats::corr(&sv, other)
        } else {
            0.0
        }
    };
    term(sr) + term(&sa)
}

/// `LCVR`: rolling mean of how volume leads the next minute's return and its
/// magnitude.
#[derive(Debug, Clone)]
pub struct LcvrFactor {
    group: WinGroup,
}

impl LcvrFactor {
    /// Creates the family.
    pub fn new(group: WinGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for LcvrFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        self.group.names_vanilla()
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let bars = MinuteBars::load(request, &begin)?;
        let ret = rolling::fill_nan(&bars.simple_returns(1.0), 0.0);
        let daily = bars.aggregate(|range| lead_correlation(&bars.vol()[range.clone()], &ret[range]));
        frame.attach("lcvr", &daily);
        let lcvr = frame.column("lcvr")?.to_vec();
        for win in self.group.wins() {
            frame.insert(self.group.name_vanilla(*win), rolling::mean(&lcvr, *win, *win));
        }
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
