//! Correlation of intraday volatility and price.

use super::sliced::insert_sliced;
use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use crate::minute::MinuteBars;
use huelva_math::stats;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `CVP`: correlation of the daily minute-return volatility with the index
/// price over the highest volume sessions of each window.
#[derive(Debug, Clone)]
pub struct CvpFactor {
    group: WinLbdGroup,
}

impl CvpFactor {
    /// Creates the family.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for CvpFactor {
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
        let mut frame = DailyFrame::load(request, &begin, &["closeI", "vol_major"])?;
        let bars = MinuteBars::load(request, &begin)?;
        let simple = bars.simple_returns(1e4);
        frame.attach("volatility", &bars.aggregate(|range| stats::std(&simple[range])));
        let volatility = frame.column("volatility")?.to_vec();
        let price = frame.column("closeI")?.to_vec();
        let vol = frame.column("vol_major")?.to_vec();
        insert_sliced(&mut frame, &self.group, &volatility, &price, &vol);
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
        let group = WinLbdGroup::new("CVP", vec![10], vec![1.0]).unwrap();
        let alg = CvpFactor::new(group).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let price = fixture.daily("closeI");
        let r = Fixture::last_row();
        let volatility: Vec<f64> = (r - 9..=r)
            .map(|d| stats::std(&fixture.minute_returns(d, 1e4)))
            .collect();
        let expected = stats::corr(&volatility, &price[r - 9..=r]);
        assert_relative_eq!(last(&out, "CVP010L100"), expected, epsilon = 1e-9);
    }
}
