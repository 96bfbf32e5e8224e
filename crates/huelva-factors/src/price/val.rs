//! Price level relative to its own history.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 60);
const VALUE_FIELD: &str = "close_major";

/// `VAL`: percent change of the close over a window, and `PA` variants
/// measuring the close against its rolling mean.
#[derive(Debug, Clone)]
pub struct ValFactor {
    group: WinGroup,
}

impl ValFactor {
    /// Creates the family; windows 240 and 60 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for ValFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_pa());
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[VALUE_FIELD])?;
        let close = frame.column(VALUE_FIELD)?.to_vec();
        for win in self.group.wins() {
            let lagged = rolling::shift(&close, *win as i64);
            let average = rolling::mean(&close, *win, *win);
            frame.insert(
                self.group.name_vanilla(*win),
                robust::ret_alg(&close, &lagged, 100.0, Guard::NonZero),
            );
            frame.insert(
                self.group.name_pa(*win),
                robust::ret_alg(&close, &average, 100.0, Guard::NonZero),
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
