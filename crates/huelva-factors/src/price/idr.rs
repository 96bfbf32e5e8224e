//! Intraday return: the open-to-close move accumulated over a window.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 5);

/// `IDR`: rolling sum of `close / open - 1` of the major contract.
///
/// Emits one column per window plus `IDRDIFF`, the sum-scaled contrast of the
/// 240 and 5 session sums.
#[derive(Debug, Clone)]
pub struct IdrFactor {
    group: WinGroup,
}

impl IdrFactor {
    /// Creates the family; windows 240 and 5 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for IdrFactor {
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
        let mut frame = DailyFrame::load(request, &begin, &["open_major", "close_major"])?;
        let idr = robust::ret_alg(
            frame.column("close_major")?,
            frame.column("open_major")?,
            1.0,
            Guard::NonZero,
        );
        for win in self.group.wins() {
            frame.insert(self.group.name_vanilla(*win), rolling::sum(&idr, *win, *win));
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
