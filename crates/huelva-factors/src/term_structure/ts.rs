//! Roll return between the major and minor contracts.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, TICKER_MAJOR};
use crate::group::WinGroup;
use super::basis::residual;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const TICKER_MINOR: &str = "ticker_minor";
const DIFF_VANILLA: usize = 120;
const DIFF_RES: usize = 60;
const DIFF_RES_WEIGHT: f64 = 500.0;

/// Delivery month encoded in the last two digits of a contract code, e.g.
/// `CU2405.SHF -> 5`.
fn delivery_month(ticker: &str) -> Option<i32> {
    let code = ticker.split('.').next()?;
    let digits = code.get(code.len().checked_sub(2)?..)?;
    digits.parse().ok()
}

/// Annualized percent roll return from the major to the minor contract.
///
/// `NaN` for empty tickers, a non-positive minor price, or contracts sharing
/// a delivery month.
pub(crate) fn roll_return(
    ticker_major: &str,
    ticker_minor: &str,
    close_major: f64,
    close_minor: f64,
) -> f64 {
    if ticker_major.is_empty() || ticker_minor.is_empty() || close_minor.is_nan() || close_minor <= 0.0 {
        return f64::NAN;
    }
    let (Some(month_major), Some(month_minor)) =
        (delivery_month(ticker_major), delivery_month(ticker_minor))
    else {
        return f64::NAN;
    };
    let months = (month_minor - month_major).rem_euclid(12);
    if months == 0 {
        return f64::NAN;
    }
    (close_major / close_minor - 1.0) / f64::from(months) * 12.0 * 100.0
}

/// `TS`: rolling mean of the roll return, and `RES` variants holding the
/// negated return residual after a rolling regression on it.
///
/// `TSDIFF` adds the 120 session mean to 500 times the 60 session residual.
#[derive(Debug, Clone)]
pub struct TsFactor {
    group: WinGroup,
}

impl TsFactor {
    /// Creates the family; windows 120 and 60 must be configured.
    pub fn new(group: WinGroup) -> Result<Self> {
        group.require_wins(&[DIFF_VANILLA, DIFF_RES])?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for TsFactor {
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
        let mut frame = DailyFrame::load(
            request,
            &begin,
            &[TICKER_MINOR, "close_major", "close_minor", "return_c_major"],
        )?;
        let ts: Vec<f64> = {
            let majors = frame.text(TICKER_MAJOR)?;
            let minors = frame.text(TICKER_MINOR)?;
            let close_major = frame.column("close_major")?;
            let close_minor = frame.column("close_minor")?;
            (0..frame.len())
                .map(|i| roll_return(&majors[i], &minors[i], close_major[i], close_minor[i]))
                .collect()
        };
        let y = frame.column("return_c_major")?.to_vec();
        for win in self.group.wins() {
            frame.insert(
                self.group.name_vanilla(*win),
                rolling::mean(&ts, *win, 2 * win / 3),
            );
            let beta = rolling::beta(&ts, &y, *win, *win);
            frame.insert(self.group.name_res(*win), residual(&ts, &y, &beta, true));
        }
        let vanilla = frame.column(&self.group.name_vanilla(DIFF_VANILLA))?;
        let res = frame.column(&self.group.name_res(DIFF_RES))?;
        let diff = vanilla
            .iter()
            .zip(res)
            .map(|(v, r)| v + DIFF_RES_WEIGHT * r)
            .collect();
        frame.insert(self.group.name_diff(), diff);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
