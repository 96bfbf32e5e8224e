//! Net signed volume scaled by open interest.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use huelva_math::diff::DiffScale;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const DIFF_WINS: (usize, usize) = (240, 3);

/// Volume of rising minutes less volume of falling minutes.
fn net_volume(ret: &[f64], vol: &[f64]) -> f64 {
    ret.iter()
        .zip(vol)
        .map(|(r, v)| {
            if *r > 0.0 {
                *v
            } else if *r < 0.0 {
                -*v
            } else {
                0.0
            }
        })
        .filter(|v| !v.is_nan())
        .sum()
}

/// `NPLS`: rolling sum of net signed minute volume over the two-session
/// average open interest, 0 where undefined.
#[derive(Debug, Clone)]
pub struct NplsFactor {
    group: WinGroup,
}

impl NplsFactor {
    /// Creates the family; windows 240 and 3 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for NplsFactor {
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
        let bars = MinuteBars::load(request, &begin)?;
        let simple = bars.simple_returns(1e4);
        let net = bars.aggregate(|range| net_volume(&simple[range.clone()], &bars.vol()[range]));
        frame.attach("net_pos_chg", &net);
        let aver_oi = rolling::mean(frame.column("oi_major")?, 2, 2);
        let npls = robust::div(frame.column("net_pos_chg")?, &aver_oi, 0.0, Guard::NonZero);
        for win in self.group.wins() {
            frame.insert(self.group.name_vanilla(*win), rolling::sum(&npls, *win, *win));
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
