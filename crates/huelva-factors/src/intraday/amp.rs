//! Return of the widest-ranging minutes.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use crate::minute::{MinuteBars, sorted_desc};
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 20);
const DIFF_LBD: f64 = 0.5;

/// Mean return, in basis points, of the first `lbd` share of bars ordered by
/// amplitude, widest first. `NaN` when the share rounds down to no bars.
fn top_amplitude_return(order: &[usize], ret: &[f64], lbd: f64) -> f64 {
    let pick = (order.len() as f64 * lbd) as usize;
    if pick == 0 {
        return f64::NAN;
    }
    order[..pick].iter().map(|i| ret[*i]).sum::<f64>() / pick as f64 * 1e4
}

/// `AMP`: rolling mean of the daily return earned in the widest-ranging
/// minutes.
///
/// Emits `AMP{win}L{pct}` for every window and fraction, plus `AMPDIFF`
/// contrasting windows 240 and 20 at fraction 0.5.
#[derive(Debug, Clone)]
pub struct AmpFactor {
    group: WinLbdGroup,
}

impl AmpFactor {
    /// Creates the family; windows 240 and 20 and fraction 0.5 must be
    /// configured.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        group.base().require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        group.require_lbd(DIFF_LBD)?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for AmpFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.base().max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let bars = MinuteBars::load(request, &begin)?;
        let ret = rolling::fill_nan(&bars.simple_returns(1.0), 0.0);
        let amp = bars.amplitude(1e4);
        let lbds = self.group.lbds();
        let daily = bars.aggregate_many(lbds.len(), |range| {
            let order = sorted_desc(range, &amp);
            lbds.iter()
                .map(|lbd| top_amplitude_return(&order, &ret, *lbd))
                .collect()
        });
        for (lbd, series) in lbds.iter().zip(&daily) {
            let name_lbd = self.group.name_lbd(*lbd);
            frame.attach(name_lbd.clone(), series);
            let values = frame.column(&name_lbd)?.to_vec();
            for win in self.group.wins() {
                frame.insert(
                    self.group.name_vanilla(*win, *lbd),
                    rolling::mean(&values, *win, *win),
                );
            }
        }
        frame.insert_diff(
            self.group.name_diff(),
            &self.group.name_vanilla(DIFF_WINS.0, DIFF_LBD),
            &self.group.name_vanilla(DIFF_WINS.1, DIFF_LBD),
            DIFF_WINS,
            DiffScale::Mean,
        )?;
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
