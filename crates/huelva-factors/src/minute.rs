//! Minute bars grouped by trade date.

use crate::algorithm::InstrumentRequest;
use crate::frame::DailySeries;
use huelva_math::robust::{self, Guard};
use huelva_traits::{HuelvaError, Result, TradeDate, columns, float_values, text_values};
use polars::prelude::*;
use std::ops::Range;

/// Minute bars of one instrument, ordered by trade date and timestamp.
#[derive(Debug, Clone, Default)]
pub struct MinuteBars {
    dates: Vec<TradeDate>,
    timestamps: Vec<i64>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    pre_close: Vec<f64>,
    vol: Vec<f64>,
    amount: Vec<f64>,
    days: Vec<(TradeDate, Range<usize>)>,
}

impl MinuteBars {
    /// Loads minute bars from `begin` to the request's stop.
    pub fn load(request: &InstrumentRequest<'_>, begin: &str) -> Result<Self> {
        let df = request
            .source
            .load_minute_bar(request.instrument, begin, request.stop)?;
        Self::from_frame(&df)
    }

    /// Builds the day index over a sorted minute bar panel.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let dates = text_values(df, columns::TRADE_DATE)?;
        let timestamps: Vec<i64> = float_values(df, "timestamp")?
            .into_iter()
            .map(|t| if t.is_finite() { t as i64 } else { 0 })
            .collect();
        let mut days: Vec<(TradeDate, Range<usize>)> = Vec::new();
        for (i, date) in dates.iter().enumerate() {
            match days.last_mut() {
                Some((last, range)) if last.as_str() == date.as_str() => range.end = i + 1,
                Some((last, _)) if last.as_str() > date.as_str() => {
                    return Err(HuelvaError::DataContract(format!(
                        "minute bars not date ordered at {date}"
                    )));
                }
                _ => days.push((date.clone(), i..i + 1)),
            }
        }
        Ok(Self {
            open: float_values(df, "open")?,
            high: float_values(df, "high")?,
            low: float_values(df, "low")?,
            close: float_values(df, "close")?,
            pre_close: float_values(df, "pre_close")?,
            vol: float_values(df, "vol")?,
            amount: float_values(df, "amount")?,
            dates,
            timestamps,
            days,
        })
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether there are no bars.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Trade dates with their bar ranges.
    pub fn days(&self) -> &[(TradeDate, Range<usize>)] {
        &self.days
    }

    /// Unix timestamps in seconds.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Opening prices.
    pub fn open(&self) -> &[f64] {
        &self.open
    }

    /// Closing prices.
    pub fn close(&self) -> &[f64] {
        &self.close
    }

    /// Traded volume.
    pub fn vol(&self) -> &[f64] {
        &self.vol
    }

    /// Traded amount.
    pub fn amount(&self) -> &[f64] {
        &self.amount
    }

    /// `(close / pre_close - 1) * scale`.
    pub fn simple_returns(&self, scale: f64) -> Vec<f64> {
        robust::ret_alg(&self.close, &self.pre_close, scale, Guard::NonZero)
    }

    /// `ln(close / pre_close) * scale`.
    pub fn log_returns(&self, scale: f64) -> Vec<f64> {
        robust::ret_log(&self.close, &self.pre_close, scale)
    }

    /// `(open / pre_close - 1) * scale`, the gap into each bar.
    pub fn open_returns(&self, scale: f64) -> Vec<f64> {
        robust::ret_alg(&self.open, &self.pre_close, scale, Guard::NonZero)
    }

    /// `(high / low - 1) * scale`.
    pub fn amplitude(&self, scale: f64) -> Vec<f64> {
        robust::ret_alg(&self.high, &self.low, scale, Guard::NonZero)
    }

    /// Reduces every day's bars to one value.
    pub fn aggregate<F>(&self, f: F) -> DailySeries
    where
        F: Fn(Range<usize>) -> f64,
    {
        self.days
            .iter()
            .map(|(date, range)| (date.clone(), f(range.clone())))
            .collect()
    }

    /// Reduces every day's bars to several values, one series per output.
    pub fn aggregate_many<F>(&self, outputs: usize, f: F) -> Vec<DailySeries>
    where
        F: Fn(Range<usize>) -> Vec<f64>,
    {
        let mut series = vec![DailySeries::new(); outputs];
        for (date, range) in &self.days {
            for (out, value) in series.iter_mut().zip(f(range.clone())) {
                out.insert(date.clone(), value);
            }
        }
        series
    }
}

/// Row indices ordered by `key` descending, stable among ties and with `NaN`
/// keys last.
pub fn sorted_desc(rows: impl IntoIterator<Item = usize>, key: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = rows.into_iter().collect();
    idx.sort_by(|a, b| match (key[*a].is_nan(), key[*b].is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => key[*b].total_cmp(&key[*a]),
    });
    idx
}
