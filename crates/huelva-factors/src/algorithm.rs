//! The per-instrument computation contract.

use huelva_traits::{Calendar, MarketDataSource, Result, TradeDate};
use polars::prelude::DataFrame;
use std::fmt::Debug;

/// Everything one per-instrument computation may read.
#[derive(Clone, Copy)]
pub struct InstrumentRequest<'a> {
    /// Instrument to compute.
    pub instrument: &'a str,
    /// First output date, inclusive.
    pub begin: &'a str,
    /// Last output date, exclusive.
    pub stop: &'a str,
    /// Trading calendar for buffering.
    pub calendar: &'a dyn Calendar,
    /// Raw market data.
    pub source: &'a dyn MarketDataSource,
}

impl Debug for InstrumentRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentRequest")
            .field("instrument", &self.instrument)
            .field("begin", &self.begin)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

impl<'a> InstrumentRequest<'a> {
    /// Creates a request.
    pub fn new(
        instrument: &'a str,
        begin: &'a str,
        stop: &'a str,
        calendar: &'a dyn Calendar,
        source: &'a dyn MarketDataSource,
    ) -> Self {
        Self {
            instrument,
            begin,
            stop,
            calendar,
            source,
        }
    }
}

/// A factor family's computation.
///
/// Implementations hold only their immutable group configuration, so one
/// instance serves every instrument concurrently.
pub trait FactorAlgorithm: Send + Sync + Debug {
    /// Factor class, e.g. `AMP`.
    fn factor_class(&self) -> &str;

    /// Output columns, in output order.
    fn factor_names(&self) -> Vec<String>;

    /// Longest rolling window, which drives buffering.
    fn max_window(&self) -> usize;

    /// First date to load so every window is filled by `begin`.
    fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        let shift = (self.max_window() + crate::group::BUFFER_SESSIONS) as i64;
        calendar.next_date(begin, -shift)
    }

    /// Computes `(trade_date, instrument, ticker, factor_names...)` for
    /// `request.begin <= trade_date < request.stop`.
    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame>;
}
