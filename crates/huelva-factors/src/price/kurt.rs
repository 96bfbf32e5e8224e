//! Return kurtosis.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (60, 10);

/// `KURT`: negated rolling excess kurtosis of the close-to-close return.
///
/// `KURTDIFF` is the unscaled difference of the 60 and 10 session values.
#[derive(Debug, Clone)]
pub struct KurtFactor {
    group: WinGroup,
}

impl KurtFactor {
    /// Creates the family; windows 60 and 10 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for KurtFactor {
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
        let mut frame = DailyFrame::load(request, &begin, &["return_c_major"])?;
        let ret = frame.column("return_c_major")?.to_vec();
        for win in self.group.wins() {
            let kurt = rolling::kurt(&ret, *win, *win);
            frame.insert(
                self.group.name_vanilla(*win),
                kurt.into_iter().map(|v| -v).collect(),
            );
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
