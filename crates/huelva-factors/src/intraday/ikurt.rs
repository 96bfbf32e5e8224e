//! Kurtosis of minute returns.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, roll_series};
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::diff::DiffScale;
use huelva_math::{rolling, stats};
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 20);

/// `IKURT`: negated rolling sum of the daily kurtosis of minute returns.
///
/// The sum rolls over the sessions that have minute bars.
#[derive(Debug, Clone)]
pub struct IkurtFactor {
    group: WinGroup,
}

impl IkurtFactor {
    /// Creates the family; windows 240 and 20 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for IkurtFactor {
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
        let simple = bars.simple_returns(1e4);
        let ikurt = bars.aggregate(|range| stats::kurt(&simple[range]));
        for win in self.group.wins() {
            let rolled = roll_series(&ikurt, |x| {
                rolling::sum(x, *win, *win).into_iter().map(|v| -v).collect()
            });
            frame.attach(self.group.name_vanilla(*win), &rolled);
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
