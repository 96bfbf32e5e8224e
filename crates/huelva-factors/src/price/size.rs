//! Open interest relative to its average.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 60);

/// `SIZE`: `-(oi / mean(oi) - 1)`, so a swelling open interest scores low.
#[derive(Debug, Clone)]
pub struct SizeFactor {
    group: WinGroup,
}

impl SizeFactor {
    /// Creates the family; windows 240 and 60 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for SizeFactor {
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
        let mut frame = DailyFrame::load(request, &begin, &["oi_major"])?;
        let oi = frame.column("oi_major")?.to_vec();
        for win in self.group.wins() {
            let average = rolling::mean(&oi, *win, (*win as f64 * 0.3) as usize);
            let size = robust::ret_alg(&oi, &average, -1.0, Guard::NonZero);
            frame.insert(self.group.name_vanilla(*win), size);
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
        let alg = SizeFactor::new(WinGroup::new("SIZE", vec![60, 240]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let oi = fixture.daily("oi_major");
        let r = Fixture::last_row();
        let size = |w: usize| {
            let mean = oi[r + 1 - w..=r].iter().sum::<f64>() / w as f64;
            -(oi[r] / mean - 1.0)
        };
        assert_relative_eq!(last(&out, "SIZE060"), size(60), epsilon = 1e-12);
        assert_relative_eq!(last(&out, "SIZEDIFF"), size(240) - size(60), epsilon = 1e-12);
    }
}
