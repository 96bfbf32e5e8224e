//! Date-aligned working columns of one instrument.

use crate::algorithm::InstrumentRequest;
use huelva_math::diff::{self, DiffScale};
use huelva_traits::{
    HuelvaError, Result, TradeDate, columns, float_values, frame_from_parts, text_values,
};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Ticker of the major contract in the preprocessed bars.
pub const TICKER_MAJOR: &str = "ticker_major";

/// Preprocessed columns holding text.
const TEXT_FIELDS: [&str; 2] = [TICKER_MAJOR, "ticker_minor"];

/// Per-date values of an intraday or positional reduction.
pub type DailySeries = BTreeMap<TradeDate, f64>;

/// One instrument's daily bars, one row per trade date, plus derived columns.
///
/// Rows follow the preprocessed bars, so every derived column is aligned with
/// the instrument's own trading history. Values are `NaN` where missing.
#[derive(Debug, Clone, Default)]
pub struct DailyFrame {
    dates: Vec<TradeDate>,
    texts: HashMap<String, Vec<String>>,
    values: HashMap<String, Vec<f64>>,
}

impl DailyFrame {
    /// Loads `fields` of the preprocessed bars from `begin` to the request's stop.
    ///
    /// `trade_date` and `ticker_major` are always loaded.
    pub fn load(request: &InstrumentRequest<'_>, begin: &str, fields: &[&str]) -> Result<Self> {
        let mut wanted = vec![columns::TRADE_DATE, TICKER_MAJOR];
        for field in fields {
            if !wanted.contains(field) {
                wanted.push(*field);
            }
        }
        let df = request
            .source
            .load_preprocess(request.instrument, begin, request.stop, &wanted)?;
        Self::from_frame(&df, fields)
    }

    /// Builds a frame from a date-sorted preprocessed panel.
    pub fn from_frame(df: &DataFrame, fields: &[&str]) -> Result<Self> {
        let dates = text_values(df, columns::TRADE_DATE)?;
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HuelvaError::DataContract(
                "preprocessed bars are not strictly date ordered".to_string(),
            ));
        }
        let mut frame = Self {
            dates,
            ..Self::default()
        };
        frame
            .texts
            .insert(TICKER_MAJOR.to_string(), text_values(df, TICKER_MAJOR)?);
        for field in fields {
            if TEXT_FIELDS.contains(field) {
                frame.texts.insert((*field).to_string(), text_values(df, field)?);
            } else {
                frame.values.insert((*field).to_string(), float_values(df, field)?);
            }
        }
        Ok(frame)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Trade dates, ascending.
    pub fn dates(&self) -> &[TradeDate] {
        &self.dates
    }

    /// A numeric column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.values
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| HuelvaError::MissingColumn(name.to_string()))
    }

    /// A text column.
    pub fn text(&self, name: &str) -> Result<&[String]> {
        self.texts
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| HuelvaError::MissingColumn(name.to_string()))
    }

    /// Adds or replaces a numeric column.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.dates.len());
        self.values.insert(name.into(), values);
    }

    /// Left-joins a per-date series onto the rows; absent dates become `NaN`.
    pub fn attach(&mut self, name: impl Into<String>, series: &DailySeries) {
        let values = self
            .dates
            .iter()
            .map(|d| series.get(d).copied().unwrap_or(f64::NAN))
            .collect();
        self.values.insert(name.into(), values);
    }

    /// Inserts the diff `long * scale - short` of two existing columns
    /// computed over windows `wins = (long, short)`.
    pub fn insert_diff(
        &mut self,
        name: impl Into<String>,
        long: &str,
        short: &str,
        wins: (usize, usize),
        scale: DiffScale,
    ) -> Result<()> {
        let values = diff::diff(self.column(long)?, self.column(short)?, wins.0, wins.1, scale);
        self.insert(name, values);
        Ok(())
    }

    /// The output panel `(trade_date, instrument, ticker, names...)` for
    /// `begin <= trade_date < stop`.
    pub fn finish(
        &self,
        instrument: &str,
        names: &[String],
        begin: &str,
        stop: &str,
    ) -> Result<DataFrame> {
        let rows: Vec<usize> = (0..self.len())
            .filter(|i| self.dates[*i].as_str() >= begin && self.dates[*i].as_str() < stop)
            .collect();
        let tickers = self.text(TICKER_MAJOR)?;
        let pick_text = |v: &[String]| rows.iter().map(|i| v[*i].clone()).collect::<Vec<_>>();
        let values = names
            .iter()
            .map(|name| {
                let column = self.column(name)?;
                Ok((name.clone(), rows.iter().map(|i| column[*i]).collect()))
            })
            .collect::<Result<Vec<(String, Vec<f64>)>>>()?;
        frame_from_parts(
            vec![
                (columns::TRADE_DATE, pick_text(&self.dates)),
                (columns::INSTRUMENT, vec![instrument.to_string(); rows.len()]),
                (columns::TICKER, pick_text(tickers)),
            ],
            &values,
        )
    }
}

/// Applies a series transform to the values of a per-date series, keeping
/// its own dates.
///
/// Used where a family rolls over the days its reduction produced rather
/// than over the daily bars.
pub fn roll_series<F>(series: &DailySeries, f: F) -> DailySeries
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let values: Vec<f64> = series.values().copied().collect();
    series.keys().cloned().zip(f(&values)).collect()
}
