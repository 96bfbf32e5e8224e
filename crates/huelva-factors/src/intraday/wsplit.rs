//! Return split by traded amount.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use crate::minute::{MinuteBars, sorted_desc};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Return of the `lbd` share of heaviest-amount minutes less that of the
/// lightest; `order` lists bars by amount, heaviest first.
fn weight_split(order: &[usize], ret: &[f64], lbd: f64) -> f64 {
    let k = (order.len() as f64 * lbd) as usize;
    let sum = |bars: &[usize]| -> f64 {
        bars.iter().map(|i| ret[*i]).filter(|r| !r.is_nan()).sum()
    };
    sum(&order[..k]) - sum(&order[order.len() - k..])
}

/// `WSPLIT`: rolling mean of the daily heavy-minus-light minute return.
#[derive(Debug, Clone)]
pub struct WsplitFactor {
    group: WinLbdGroup,
}

impl WsplitFactor {
    /// Creates the family.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for WsplitFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        self.group.names_vanilla()
    }

    fn max_window(&self) -> usize {
        self.group.base().max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let bars = MinuteBars::load(request, &begin)?;
        let simple = bars.simple_returns(1e4);
        let lbds = self.group.lbds();
        let daily = bars.aggregate_many(lbds.len(), |range| {
            let order = sorted_desc(range, bars.amount());
            lbds.iter()
                .map(|lbd| weight_split(&order, &simple, *lbd))
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
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
