//! Jump component of minute returns.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Bars dropped at each end of the session.
const EDGE_BARS: usize = 2;

/// Mean of `2 (simple - log) - log²` over the session's interior bars, the
/// part of the return a continuous path cannot explain.
fn jump(simple: &[f64], log: &[f64]) -> f64 {
    let n = simple.len();
    if n <= 2 * EDGE_BARS {
        return f64::NAN;
    }
    let residual: Vec<f64> = (EDGE_BARS..n - EDGE_BARS)
        .map(|i| 2.0 * (simple[i] - log[i]) - log[i] * log[i])
        .collect();
    stats::mean(&residual)
}

/// `JUMP`: rolling mean of the daily jump measure.
#[derive(Debug, Clone)]
pub struct JumpFactor {
    group: WinGroup,
}

impl JumpFactor {
    /// Creates the family.
    pub fn new(group: WinGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for JumpFactor {
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
        let simple = bars.simple_returns(1e4);
        let log = bars.log_returns(1e4);
        frame.attach(
            "jump",
            &bars.aggregate(|range| jump(&simple[range.clone()], &log[range])),
        );
        let daily = frame.column("jump")?.to_vec();
        for win in self.group.wins() {
            frame.insert(self.group.name_vanilla(*win), rolling::mean(&daily, *win, *win));
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
    fn test_short_session_is_missing() {
        assert!(jump(&[1.0; 4], &[1.0; 4]).is_nan());
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = JumpFactor::new(WinGroup::new("JUMP", vec![1, 20]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let day = Fixture::last_row();
        let close = fixture.minute("close", day);
        let pre_close = fixture.minute("pre_close", day);
        let terms: Vec<f64> = (2..close.len() - 2)
            .map(|i| {
                let s = (close[i] / pre_close[i] - 1.0) * 1e4;
                let c = (close[i] / pre_close[i]).ln() * 1e4;
                2.0 * (s - c) - c * c
            })
            .collect();
        let expected = terms.iter().sum::<f64>() / terms.len() as f64;
        assert_relative_eq!(last(&out, "JUMP001"), expected, epsilon = 1e-9);
    }
}
