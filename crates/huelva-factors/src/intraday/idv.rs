//! Standardized intraday volatility.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::diff::DiffScale;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (60, 10);

/// `IDV`: negated z-score of the daily standard deviation of minute returns
/// against its own rolling mean and deviation; 0 where undefined.
#[derive(Debug, Clone)]
pub struct IdvFactor {
    group: WinGroup,
}

impl IdvFactor {
    /// Creates the family; windows 60 and 10 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for IdvFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
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
        frame.attach("vol", &bars.aggregate(|range| stats::std(&simple[range])));
        let vol = frame.column("vol")?.to_vec();
        for win in self.group.wins() {
            let mu = rolling::mean(&vol, *win, *win);
            let sd = rolling::std(&vol, *win, *win);
            let z: Vec<f64> = (0..vol.len())
                .map(|i| {
                    let v = if sd[i] > 0.0 {
                        -((vol[i] - mu[i]) / sd[i])
                    } else {
                        f64::NAN
                    };
                    if v.is_nan() { 0.0 } else { v }
                })
                .collect();
            frame.insert(self.group.name_vanilla(*win), z);
        }
        frame.insert_diff(
            self.group.name_diff(),
            &self.group.name_vanilla(DIFF_WINS.0),
            &self.group.name_vanilla(DIFF_WINS.1),
            DIFF_WINS,
            DiffScale::None,
        )?;
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
        let alg = IdvFactor::new(WinGroup::new("IDV", vec![10, 60]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let r = Fixture::last_row();
        let vol: Vec<f64> = (r - 9..=r)
            .map(|d| stats::std(&fixture.minute_returns(d, 1e4)))
            .collect();
        let expected = -((vol[9] - stats::mean(&vol)) / stats::std(&vol));
        assert_relative_eq!(last(&out, "IDV010"), expected, epsilon = 1e-9);
    }
}
