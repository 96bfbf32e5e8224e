//! Entropy of the intraday amount distribution.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, roll_series};
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `VENTROPY`: rolling sum of the daily entropy of traded amount across
/// minutes, times 100, over the sessions that have minute bars.
#[derive(Debug, Clone)]
pub struct VentropyFactor {
    group: WinGroup,
}

impl VentropyFactor {
    /// Creates the family.
    pub fn new(group: WinGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for VentropyFactor {
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
        let entropy = bars.aggregate(|range| stats::entropy(&bars.amount()[range]) * 100.0);
        for win in self.group.wins() {
            let rolled = roll_series(&entropy, |x| rolling::sum(x, *win, *win));
            frame.attach(self.group.name_vanilla(*win), &rolled);
        }
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fixture, assert_shape, last};
    use approx::assert_relative_eq;

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = VentropyFactor::new(WinGroup::new("VENTROPY", vec![1, 5]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let r = Fixture::last_row();
        let amount = fixture.minute("amount", r);
        let total: f64 = amount.iter().sum();
        let expected = -amount
            .iter()
            .map(|a| a / total * (a / total).ln())
            .sum::<f64>()
            * 100.0;
        assert_relative_eq!(last(&out, "VENTROPY001"), expected, epsilon = 1e-9);
    }
}
