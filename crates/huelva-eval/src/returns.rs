//! Forward test returns.
//!
//! A return `Opn010L1` seen from date `t` compounds the open-to-open returns
//! of sessions `t+2 ..= t+11`: one session of execution delay, then ten of
//! holding. It is only known at `t + shift`, so a run over `[begin, stop)`
//! produces the returns of the factor dates `[begin - shift, stop - shift)`,
//! exactly the ones realized inside the run.

use huelva_traits::{
    Calendar, HuelvaError, Instrument, MarketDataSource, Panel, Result, ReturnSpec, TradeDate,
    columns, filter_dates, float_values, frame_from_parts, restrict_to_keys, sort_frame,
    stack_frames, text_values,
};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use tracing::info;

/// Compounds `win` daily returns starting `lag + 1` sessions after each row.
///
/// `NaN` when a component is missing or the window runs past the data.
pub fn forward_returns(daily: &[f64], win: usize, lag: usize) -> Vec<f64> {
    let n = daily.len();
    (0..n)
        .map(|i| {
            let first = i + lag + 1;
            let last = i + lag + win;
            if win == 0 || last >= n {
                return f64::NAN;
            }
            let mut acc = 1.0;
            for r in &daily[first..=last] {
                if r.is_nan() {
                    return f64::NAN;
                }
                acc *= 1.0 + r;
            }
            acc - 1.0
        })
        .collect()
}

/// Forward returns of one [`ReturnSpec`] for a universe of instruments.
#[derive(Debug, Clone, Copy)]
pub struct TestReturnCalculator {
    ret: ReturnSpec,
}

impl TestReturnCalculator {
    /// Creates a calculator.
    pub const fn new(ret: ReturnSpec) -> Self {
        Self { ret }
    }

    /// The return definition.
    pub const fn ret(&self) -> ReturnSpec {
        self.ret
    }

    /// Factor dates whose returns are realized inside `[begin, stop)`.
    pub fn base_range(
        &self,
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
    ) -> Result<(TradeDate, TradeDate)> {
        let shift = -(self.ret.shift() as i64);
        Ok((
            calendar.next_date(begin, shift)?,
            calendar.next_date(stop, shift)?,
        ))
    }

    /// One instrument's `(trade_date, instrument, <ret name>)` rows.
    pub fn compute_instrument(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
        source: &dyn MarketDataSource,
    ) -> Result<DataFrame> {
        let (base_begin, base_stop) = self.base_range(begin, stop, calendar)?;
        let field = self.ret.class.daily_return_column();
        let bars = source.load_preprocess(
            instrument,
            &base_begin,
            stop,
            &[columns::TRADE_DATE, field],
        )?;
        let dates = text_values(&bars, columns::TRADE_DATE)?;
        let daily = float_values(&bars, field)?;
        let fwd = forward_returns(&daily, self.ret.win, self.ret.lag);
        let n = dates.len();
        let out = frame_from_parts(
            vec![
                (columns::TRADE_DATE, dates),
                (columns::INSTRUMENT, vec![instrument.to_string(); n]),
            ],
            &[(self.ret.name(), fwd)],
        )?;
        filter_dates(&out, &base_begin, &base_stop)
    }

    /// Stacks every instrument's returns and keeps the available rows.
    ///
    /// A failing instrument fails the whole batch, named in the error.
    pub fn compute(
        &self,
        universe: &[Instrument],
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
        source: &dyn MarketDataSource,
        available: &Panel,
    ) -> Result<Panel> {
        let frames: Vec<DataFrame> = universe
            .par_iter()
            .map(|instrument| {
                self.compute_instrument(instrument, begin, stop, calendar, source)
                    .map_err(|e| HuelvaError::for_instrument(instrument.as_str(), e))
            })
            .collect::<Result<_>>()?;
        let stacked = if frames.is_empty() {
            frame_from_parts(
                vec![(columns::TRADE_DATE, Vec::new()), (columns::INSTRUMENT, Vec::new())],
                &[(self.ret.name(), Vec::new())],
            )?
        } else {
            sort_frame(&stack_frames(frames)?, &[columns::TRADE_DATE, columns::INSTRUMENT])?
        };
        let panel = restrict_to_keys(&stacked, available.data())?;
        info!(
            ret = %self.ret,
            instruments = universe.len(),
            rows = panel.height(),
            "test returns computed"
        );
        Ok(Panel::new(panel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use huelva_traits::{MemorySource, ReturnClass, TradingCalendar};
    use polars::prelude::*;

    fn dates() -> Vec<String> {
        (2..=13).map(|d| format!("202401{d:02}")).collect()
    }

    fn daily() -> Vec<f64> {
        (0..12).map(|i| 0.01 * (i as f64 - 5.0)).collect()
    }

    fn source() -> MemorySource {
        let bars = df! {
            "trade_date" => dates(),
            "return_o_major" => daily(),
            "return_c_major" => daily(),
        }
        .unwrap();
        MemorySource::new().with_preprocess("CU", bars)
    }

    #[test]
    fn test_forward_returns() {
        let r = [0.1, 0.2, f64::NAN, 0.3, 0.4, 0.5];
        let fwd = forward_returns(&r, 2, 1);
        // Row 0 compounds rows 2 and 3.
        assert!(fwd[0].is_nan());
        assert_relative_eq!(fwd[1], 1.3 * 1.4 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(fwd[2], 1.4 * 1.5 - 1.0, epsilon = 1e-12);
        assert!(fwd[3].is_nan());
        assert!(fwd[5].is_nan());
    }

    #[test]
    fn test_compute_instrument_base_range() {
        let calendar = TradingCalendar::from_dates(dates()).unwrap();
        let calc = TestReturnCalculator::new(ReturnSpec::new(ReturnClass::Opn, 2, 1));
        let out = calc
            .compute_instrument("CU", "20240108", "20240112", &calendar, &source())
            .unwrap();
        // Realized in [08, 12) means factor dates [05, 09).
        let got = text_values(&out, "trade_date").unwrap();
        assert_eq!(got, vec!["20240105", "20240106", "20240107", "20240108"]);
        let r = daily();
        let v = float_values(&out, "Opn002L1").unwrap();
        assert_relative_eq!(v[0], (1.0 + r[5]) * (1.0 + r[6]) - 1.0, epsilon = 1e-12);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_compute_keeps_available_rows() {
        let calendar = TradingCalendar::from_dates(dates()).unwrap();
        let calc = TestReturnCalculator::new(ReturnSpec::new(ReturnClass::Cls, 1, 1));
        let available = Panel::new(
            df! {
                "trade_date" => &["20240109", "20240110"],
                "instrument" => &["CU", "CU"],
            }
            .unwrap(),
        );
        let out = calc
            .compute(
                &["CU".to_string()],
                "20240108",
                "20240113",
                &calendar,
                &source(),
                &available,
            )
            .unwrap();
        assert_eq!(out.dates().unwrap(), vec!["20240109", "20240110"]);
        assert_eq!(out.columns(), vec!["trade_date", "instrument", "Cls001L1"]);
    }

    #[test]
    fn test_unknown_instrument_is_named() {
        let calendar = TradingCalendar::from_dates(dates()).unwrap();
        let calc = TestReturnCalculator::new(ReturnSpec::new(ReturnClass::Cls, 1, 1));
        let err = calc
            .compute(
                &["ZN".to_string()],
                "20240108",
                "20240113",
                &calendar,
                &source(),
                &Panel::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("ZN"));
    }
}
