//! Return skewness.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_LONG: usize = 120;
const DIFF_DELAY: usize = 10;

/// `SKEW`: negated rolling skewness of the close-to-close return, with a
/// one-session delayed copy per window.
///
/// `SKEWDIFF` adds the 120 session value to the delayed 10 session value.
#[derive(Debug, Clone)]
pub struct SkewFactor {
    group: WinGroup,
}

impl SkewFactor {
    /// Creates the family; windows 120 and 10 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_LONG, DIFF_DELAY])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for SkewFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_delay());
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &["return_c_major"])?;
        let ret = frame.column("return_c_major")?.to_vec();
        for win in self.group.wins() {
            let vanilla: Vec<f64> = rolling::skew(&ret, *win, *win)
                .into_iter()
                .map(|v| -v)
                .collect();
            frame.insert(self.group.name_delay(*win), rolling::shift(&vanilla, 1));
            frame.insert(self.group.name_vanilla(*win), vanilla);
        }
        let long = frame.column(&self.group.name_vanilla(DIFF_LONG))?;
        let delayed = frame.column(&self.group.name_delay(DIFF_DELAY))?;
        let diff = long.iter().zip(delayed).map(|(a, b)| a + b).collect();
        frame.insert(self.group.name_diff(), diff);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
