//! Convergence of moving averages.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Upper bound of the sign and benchmark window.
const BENCHMARK_CAP: usize = 120;

/// Source fields with the tag used in intermediate and output names.
const VARIABLES: [(&str, &str); 3] = [
    ("close_major", "CLS"),
    ("vol_major", "VOL"),
    ("amount_major", "AMT"),
];

/// `CNVG`: dispersion of a variable's moving averages across windows,
/// relative to the benchmark average and signed against the current level.
///
/// For each of close, volume and amount the family emits `CNVG{TAG}`:
/// `std(ma_w for w in wins) / ma_bench * -sign(x / ma_bench - 1)`, where the
/// benchmark window is `min(120, max(wins))`.
#[derive(Debug, Clone)]
pub struct CnvgFactor {
    group: WinGroup,
    benchmark_win: usize,
}

impl CnvgFactor {
    /// Creates the family; `min(120, max(wins))` must be a configured window.
    pub fn new(group: WinGroup) -> Result<Self> {
        let benchmark_win = BENCHMARK_CAP.min(group.max_win());
        group.require_wins(&[benchmark_win])?;
        Ok(Self {
            group,
            benchmark_win,
        })
    }

    fn name_ma(&self, win: usize, tag: &str) -> String {
        self.group.name_tagged(win, tag)
    }
}

/// `sign(v)` with `sign(0) = 0`, keeping `NaN`.
fn sign(v: f64) -> f64 {
    if v.is_nan() || v == 0.0 { v } else { v.signum() }
}

impl FactorAlgorithm for CnvgFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        VARIABLES
            .iter()
            .map(|(_, tag)| self.group.name_suffixed(tag))
            .collect()
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let fields: Vec<&str> = VARIABLES.iter().map(|(f, _)| *f).collect();
        let mut frame = DailyFrame::load(request, &begin, &fields)?;
        for (field, tag) in VARIABLES {
            let x = frame.column(field)?.to_vec();
            let averages: Vec<Vec<f64>> = self
                .group
                .wins()
                .iter()
                .map(|w| rolling::mean(&x, *w, *w))
                .collect();
            for (win, ma) in self.group.wins().iter().zip(&averages) {
                frame.insert(self.name_ma(*win, tag), ma.clone());
            }
            let benchmark = frame.column(&self.name_ma(self.benchmark_win, tag))?;
            let value: Vec<f64> = (0..x.len())
                .map(|i| {
                    let row: Vec<f64> = averages.iter().map(|ma| ma[i]).collect();
                    let direction = -sign(x[i] / benchmark[i] - 1.0);
                    stats::std(&row) / benchmark[i] * direction
                })
                .collect();
            frame.insert(self.group.name_suffixed(tag), value);
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
    fn test_sign() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-2.0), -1.0);
        assert!(sign(f64::NAN).is_nan());
    }

    #[test]
    fn test_benchmark_window_required() {
        let group = WinGroup::new("CNVG", vec![5, 240]).unwrap();
        assert!(CnvgFactor::new(group).unwrap_err().is_config());
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = CnvgFactor::new(WinGroup::new("CNVG", vec![5, 20, 60]).unwrap()).unwrap();
        assert_eq!(alg.factor_names(), vec!["CNVGCLS", "CNVGVOL", "CNVGAMT"]);
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let close = fixture.daily("close_major");
        let r = Fixture::last_row();
        let ma = |w: usize| close[r + 1 - w..=r].iter().sum::<f64>() / w as f64;
        let row = [ma(5), ma(20), ma(60)];
        let direction = -sign(close[r] / ma(60) - 1.0);
        let expected = stats::std(&row) / ma(60) * direction;
        assert_relative_eq!(last(&out, "CNVGCLS"), expected, epsilon = 1e-12);
    }
}
