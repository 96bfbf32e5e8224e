//! Autocorrelation of minute returns and volume.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Variable tags, in output order.
const VARIABLES: [&str; 2] = ["SIMPLE", "VOL"];
const DIFF_SIMPLE_WIN: usize = 120;
const DIFF_VOL_WIN: usize = 8;

/// Negated lag-one autocorrelation with missing values as 0; 0 when either
/// lagged side is flat.
fn negated_autocorr(x: &[f64]) -> f64 {
    let s0 = rolling::fill_nan(x, 0.0);
    let n = s0.len();
    if n < 2 || !(stats::std(&s0[1..]) > 0.0 && stats::std(&s0[..n - 1]) > 0.0) {
        return 0.0;
    }
    -stats::autocorr(&s0)
}

/// `ACR`: rolling mean of the negated lag-one autocorrelation of minute
/// returns (`SIMPLE`) and minute volume (`VOL`).
///
/// Names are `ACR{win}{VAR}`, variables outer. `ACRDIFF` is the 8 session
/// volume value less the 120 session return value.
#[derive(Debug, Clone)]
pub struct AcrFactor {
    group: WinGroup,
}

impl AcrFactor {
    /// Creates the family; windows 120 and 8 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_SIMPLE_WIN, DIFF_VOL_WIN])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for AcrFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = VARIABLES
            .iter()
            .flat_map(|var| self.group.names_tagged(var))
            .collect();
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let bars = MinuteBars::load(request, &begin)?;
        let simple = bars.simple_returns(1e4);
        let daily = bars.aggregate_many(VARIABLES.len(), |range| {
            vec![
                negated_autocorr(&simple[range.clone()]),
                negated_autocorr(&bars.vol()[range]),
            ]
        });
        for (var, series) in VARIABLES.iter().zip(&daily) {
            let name_daily = self.group.name_suffixed(var);
            frame.attach(name_daily.clone(), series);
            let values = frame.column(&name_daily)?.to_vec();
            for win in self.group.wins() {
                frame.insert(
                    self.group.name_tagged(*win, var),
                    rolling::mean(&values, *win, *win),
                );
            }
        }
        let short_vol = frame.column(&self.group.name_tagged(DIFF_VOL_WIN, "VOL"))?;
        let long_ret = frame.column(&self.group.name_tagged(DIFF_SIMPLE_WIN, "SIMPLE"))?;
        let diff = short_vol.iter().zip(long_ret).map(|(v, s)| v - s).collect();
        frame.insert(self.group.name_diff(), diff);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
