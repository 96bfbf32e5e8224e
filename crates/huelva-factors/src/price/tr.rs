//! Turnover-weighted return.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 60);

/// Volume over the two-session average open interest; `1.0` where undefined.
fn turnover(vol: &[f64], oi: &[f64]) -> Vec<f64> {
    let aver_oi = rolling::mean(oi, 2, 2);
    robust::div(vol, &aver_oi, 1.0, Guard::NonZero)
}

/// `TR`: rolling sum of `return * turnover`, missing products counted as 0.
#[derive(Debug, Clone)]
pub struct TrFactor {
    group: WinGroup,
}

impl TrFactor {
    /// Creates the family; windows 240 and 60 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for TrFactor {
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
        let mut frame = DailyFrame::load(
            request,
            &begin,
            &["oi_major", "vol_major", "return_c_major"],
        )?;
        let turnover = turnover(frame.column("vol_major")?, frame.column("oi_major")?);
        let ret_adj: Vec<f64> = frame
            .column("return_c_major")?
            .iter()
            .zip(&turnover)
            .map(|(r, t)| {
                let v = r * t;
                if v.is_nan() { 0.0 } else { v }
            })
            .collect();
        for win in self.group.wins() {
            let min_periods = 2 * win / 3;
            frame.insert(
                self.group.name_vanilla(*win),
                rolling::sum(&ret_adj, *win, min_periods),
            );
        }
        frame.insert_diff(
            self.group.name_diff(),
            &self.group.name_vanilla(DIFF_WINS.0),
            &self.group.name_vanilla(DIFF_WINS.1),
            DIFF_WINS,
            DiffScale::Sum,
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
    fn test_turnover_fill() {
        let t = turnover(&[10.0, 20.0, 10.0], &[5.0, 15.0, f64::NAN]);
        assert_eq!(t[0], 1.0);
        assert_relative_eq!(t[1], 2.0);
        assert_eq!(t[2], 1.0);
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = TrFactor::new(WinGroup::new("TR", vec![60, 240]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let ret = fixture.daily("return_c_major");
        let vol = fixture.daily("vol_major");
        let oi = fixture.daily("oi_major");
        let r = Fixture::last_row();
        let expected: f64 = (r - 59..=r)
            .map(|i| ret[i] * vol[i] / ((oi[i] + oi[i - 1]) / 2.0))
            .sum();
        assert_relative_eq!(last(&out, "TR060"), expected, epsilon = 1e-10);
    }
}
