//! Read-only access to raw market data.
//!
//! Every loader takes a `[begin, stop)` date range and returns a panel sorted
//! by date (minute bars additionally by timestamp).

use crate::{HuelvaError, Result, columns, filter_dates, sort_frame};
use polars::prelude::*;
use std::collections::HashMap;

/// Columns of a minute bar panel.
pub const MINUTE_BAR_COLUMNS: [&str; 10] = [
    "trade_date",
    "timestamp",
    "ticker",
    "open",
    "high",
    "low",
    "close",
    "pre_close",
    "vol",
    "amount",
];

/// Named read-only queries over raw market data.
pub trait MarketDataSource: Send + Sync {
    /// Preprocessed daily bars of the major/minor contracts of `instrument`.
    fn load_preprocess(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame>;

    /// Minute bars of the major contract, see [`MINUTE_BAR_COLUMNS`].
    fn load_minute_bar(&self, instrument: &str, begin: &str, stop: &str) -> Result<DataFrame>;

    /// Member position reports.
    fn load_position(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame>;

    /// Market index closes and returns, one column per index.
    fn load_market_index(&self, begin: &str, stop: &str, fields: &[&str]) -> Result<DataFrame>;
}

/// A [`MarketDataSource`] over frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    preprocess: HashMap<String, DataFrame>,
    minute_bar: HashMap<String, DataFrame>,
    position: HashMap<String, DataFrame>,
    market_index: Option<DataFrame>,
}

impl MemorySource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers daily bars for an instrument.
    #[must_use]
    pub fn with_preprocess(mut self, instrument: &str, data: DataFrame) -> Self {
        self.preprocess.insert(instrument.to_string(), data);
        self
    }

    /// Registers minute bars for an instrument.
    #[must_use]
    pub fn with_minute_bar(mut self, instrument: &str, data: DataFrame) -> Self {
        self.minute_bar.insert(instrument.to_string(), data);
        self
    }

    /// Registers position reports for an instrument.
    #[must_use]
    pub fn with_position(mut self, instrument: &str, data: DataFrame) -> Self {
        self.position.insert(instrument.to_string(), data);
        self
    }

    /// Registers the market index panel.
    #[must_use]
    pub fn with_market_index(mut self, data: DataFrame) -> Self {
        self.market_index = Some(data);
        self
    }

    fn slice(
        data: Option<&DataFrame>,
        what: &str,
        instrument: &str,
        begin: &str,
        stop: &str,
        keys: &[&str],
        fields: Option<&[&str]>,
    ) -> Result<DataFrame> {
        let data = data.ok_or_else(|| {
            HuelvaError::DataContract(format!("no {what} data for {instrument}"))
        })?;
        let sliced = sort_frame(&filter_dates(data, begin, stop)?, keys)?;
        match fields {
            Some(cols) => Ok(sliced.select(cols.iter().copied())?),
            None => Ok(sliced),
        }
    }
}

impl MarketDataSource for MemorySource {
    fn load_preprocess(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        Self::slice(
            self.preprocess.get(instrument),
            "preprocess",
            instrument,
            begin,
            stop,
            &[columns::TRADE_DATE],
            Some(fields),
        )
    }

    fn load_minute_bar(&self, instrument: &str, begin: &str, stop: &str) -> Result<DataFrame> {
        Self::slice(
            self.minute_bar.get(instrument),
            "minute bar",
            instrument,
            begin,
            stop,
            &[columns::TRADE_DATE, "timestamp"],
            None,
        )
    }

    fn load_position(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        Self::slice(
            self.position.get(instrument),
            "position",
            instrument,
            begin,
            stop,
            &[columns::TRADE_DATE],
            Some(fields),
        )
    }

    fn load_market_index(&self, begin: &str, stop: &str, fields: &[&str]) -> Result<DataFrame> {
        Self::slice(
            self.market_index.as_ref(),
            "market index",
            "market",
            begin,
            stop,
            &[columns::TRADE_DATE],
            Some(fields),
        )
    }
}
