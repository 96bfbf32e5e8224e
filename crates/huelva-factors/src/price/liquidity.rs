//! Price impact per traded amount.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `LIQUIDITY`: rolling mean of `return * 1e10 / amount`.
///
/// The group takes exactly two windows; `LIQUIDITYDIFF` contrasts them, the
/// first being the long leg.
#[derive(Debug, Clone)]
pub struct LiquidityFactor {
    group: WinGroup,
    diff_wins: (usize, usize),
}

impl LiquidityFactor {
    /// Creates the family from a two-window group.
    pub fn new(group: WinGroup) -> Result<Self> {
        let diff_wins = group.pair()?;
        Ok(Self { group, diff_wins })
    }
}

impl FactorAlgorithm for LiquidityFactor {
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
        let mut frame = DailyFrame::load(request, &begin, &["return_c_major", "amount_major"])?;
        let scaled: Vec<f64> = frame
            .column("return_c_major")?
            .iter()
            .map(|r| r * 1e10)
            .collect();
        let liquidity = robust::div(&scaled, frame.column("amount_major")?, f64::NAN, Guard::NonZero);
        for win in self.group.wins() {
            let min_periods = (*win as f64 * 0.3) as usize;
            frame.insert(
                self.group.name_vanilla(*win),
                rolling::mean(&liquidity, *win, min_periods),
            );
        }
        let (w0, w1) = self.diff_wins;
        frame.insert_diff(
            self.group.name_diff(),
            &self.group.name_vanilla(w0),
            &self.group.name_vanilla(w1),
            self.diff_wins,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fixture, assert_shape, last};
    use approx::assert_relative_eq;

    #[test]
    fn test_requires_two_wins() {
        let group = WinGroup::new("LIQUIDITY", vec![10, 20, 60]).unwrap();
        assert!(LiquidityFactor::new(group).unwrap_err().is_config());
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = LiquidityFactor::new(WinGroup::new("LIQUIDITY", vec![60, 10]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let ret = fixture.daily("return_c_major");
        let amount = fixture.daily("amount_major");
        let r = Fixture::last_row();
        let mean = |w: usize| {
            (r + 1 - w..=r).map(|i| ret[i] * 1e10 / amount[i]).sum::<f64>() / w as f64
        };
        assert_relative_eq!(last(&out, "LIQUIDITY010"), mean(10), epsilon = 1e-6);
        let diff = mean(60) * 6.0f64.sqrt() - mean(10);
        assert_relative_eq!(last(&out, "LIQUIDITYDIFF"), diff, epsilon = 1e-6);
    }
}
