#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and collaborator traits for the Huelva futures research pipeline.
//!
//! The pipeline exchanges trade-date/instrument keyed panels. This crate fixes
//! their column contract, the calendar arithmetic used to buffer date ranges,
//! and the storage and market-data interfaces every stage depends on.

/// The version of the huelva-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod calendar;
pub mod config;
pub mod error;
pub mod source;
pub mod store;
pub mod types;

// Re-exports
pub use calendar::{Calendar, DATE_FORMAT, TradingCalendar, parse_trade_date};
pub use config::{FactorId, InstrumentInfo, Portfolio, ReturnClass, ReturnSpec, Strategy};
pub use error::{HuelvaError, Result};
pub use source::{MINUTE_BAR_COLUMNS, MarketDataSource, MemorySource};
pub use store::{AppendOutcome, Continuity, MemoryTable, TabularStore};
pub use types::{
    Instrument, Panel, TradeDate, columns, filter_dates, float_column, float_values,
    frame_from_parts, group_indices, join_on_keys, restrict_to_keys, sort_frame, stack_frames,
    text_column, text_values,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
