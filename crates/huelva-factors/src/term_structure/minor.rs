//! Minor contract momentum.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `MINOR`: rolling mean return of the minor contract, and `RES` variants
/// holding the major contract's mean return in excess of it.
///
/// Takes exactly two windows; `MINORDIFF` contrasts the vanilla pair.
#[derive(Debug, Clone)]
pub struct MinorFactor {
    group: WinGroup,
    diff_wins: (usize, usize),
}

impl MinorFactor {
    /// Creates the family from a two-window group.
    pub fn new(group: WinGroup) -> Result<Self> {
        let diff_wins = group.pair()?;
        Ok(Self { group, diff_wins })
    }
}

impl FactorAlgorithm for MinorFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_res());
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame =
            DailyFrame::load(request, &begin, &["return_c_major", "return_c_minor"])?;
        let major = frame.column("return_c_major")?.to_vec();
        let minor = frame.column("return_c_minor")?.to_vec();
        for win in self.group.wins() {
            let min_periods = 2 * win / 3;
            let minor_avg = rolling::mean(&minor, *win, min_periods);
            let major_avg = rolling::mean(&major, *win, min_periods);
            let res = major_avg.iter().zip(&minor_avg).map(|(a, b)| a - b).collect();
            frame.insert(self.group.name_vanilla(*win), minor_avg);
            frame.insert(self.group.name_res(*win), res);
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
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = MinorFactor::new(WinGroup::new("MINOR", vec![20, 5]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let major = fixture.daily("return_c_major");
        let minor = fixture.daily("return_c_minor");
        let r = Fixture::last_row();
        let mean = |x: &[f64], w: usize| x[r + 1 - w..=r].iter().sum::<f64>() / w as f64;
        assert_relative_eq!(last(&out, "MINOR005"), mean(&minor, 5), epsilon = 1e-12);
        assert_relative_eq!(
            last(&out, "MINOR005RES"),
            mean(&major, 5) - mean(&minor, 5),
            epsilon = 1e-12
        );
        let diff = mean(&minor, 20) * 2.0 - mean(&minor, 5);
        assert_relative_eq!(last(&out, "MINORDIFF"), diff, epsilon = 1e-12);
    }
}
