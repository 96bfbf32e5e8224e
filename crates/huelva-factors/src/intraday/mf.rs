//! Money flow.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (1, 5);

/// Negated amount-weighted minute return; `NaN` without traded amount.
fn money_flow(amount: &[f64], ret: &[f64]) -> f64 {
    let total: f64 = amount.iter().filter(|a| !a.is_nan()).sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    -amount
        .iter()
        .zip(ret)
        .map(|(a, r)| {
            let r = if r.is_nan() { 0.0 } else { *r };
            a / total * r
        })
        .filter(|v| !v.is_nan())
        .sum::<f64>()
}

/// `MF`: rolling mean of the daily money flow.
///
/// `MFDIFF` is the one session value less the 5 session mean.
#[derive(Debug, Clone)]
pub struct MfFactor {
    group: WinGroup,
}

impl MfFactor {
    /// Creates the family; windows 1 and 5 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for MfFactor {
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
        let ret = bars.simple_returns(1e4);
        frame.attach(
            "mf",
            &bars.aggregate(|range| money_flow(&bars.amount()[range.clone()], &ret[range])),
        );
        let mf = frame.column("mf")?.to_vec();
        for win in self.group.wins() {
            frame.insert(self.group.name_vanilla(*win), rolling::mean(&mf, *win, *win));
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
    fn test_money_flow() {
        assert_relative_eq!(money_flow(&[1.0, 3.0], &[4.0, f64::NAN]), -1.0);
        assert!(money_flow(&[0.0, 0.0], &[1.0, 1.0]).is_nan());
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = MfFactor::new(WinGroup::new("MF", vec![1, 5]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let r = Fixture::last_row();
        let daily: Vec<f64> = (r - 4..=r)
            .map(|d| money_flow(&fixture.minute("amount", d), &fixture.minute_returns(d, 1e4)))
            .collect();
        let mean = daily.iter().sum::<f64>() / 5.0;
        assert_relative_eq!(last(&out, "MF001"), daily[4], epsilon = 1e-12);
        assert_relative_eq!(last(&out, "MFDIFF"), daily[4] - mean, epsilon = 1e-12);
    }
}
