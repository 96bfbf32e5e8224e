//! Overnight return.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use crate::minute::MinuteBars;
use chrono::{DateTime, FixedOffset, Timelike};
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;
use std::ops::RangeInclusive;

const DIFF_WINS: (usize, usize) = (120, 5);
/// Exchange time, UTC+8.
const EXCHANGE_OFFSET_SECS: i32 = 8 * 3600;
/// Hours of the day session in exchange time.
const DAY_SESSION: RangeInclusive<u32> = 8..=15;

/// Hour of a Unix timestamp in exchange time.
fn exchange_hour(timestamp: i64) -> Option<u32> {
    let offset = FixedOffset::east_opt(EXCHANGE_OFFSET_SECS)?;
    DateTime::from_timestamp(timestamp, 0).map(|t| t.with_timezone(&offset).hour())
}

/// `ONR`: negated rolling sum of the overnight gap, taken as the open-to-
/// previous-close return of the first day-session bar.
#[derive(Debug, Clone)]
pub struct OnrFactor {
    group: WinGroup,
}

impl OnrFactor {
    /// Creates the family; windows 120 and 5 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_WINS.0, DIFF_WINS.1])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for OnrFactor {
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
        let gap = bars.open_returns(1e4);
        let timestamps = bars.timestamps();
        let onr = bars.aggregate(|range| {
            range
                .filter(|i| exchange_hour(timestamps[*i]).is_some_and(|h| DAY_SESSION.contains(&h)))
                .map(|i| gap[i])
                .find(|v| !v.is_nan())
                .unwrap_or(f64::NAN)
        });
        frame.attach("onr", &onr);
        let daily = frame.column("onr")?.to_vec();
        for win in self.group.wins() {
            let sum = rolling::sum(&daily, *win, *win);
            frame.insert(
                self.group.name_vanilla(*win),
                sum.into_iter().map(|v| -v).collect(),
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
