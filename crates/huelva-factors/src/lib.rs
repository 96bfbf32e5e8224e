#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Factor families for the Huelva futures pipeline.
//!
//! Families are grouped by what they read:
//! - Price: daily bar statistics of the major contract
//! - Term structure: basis, minor contract and warehouse stock
//! - Intraday: reductions of minute bars
//! - Correlation: quantile-sliced correlations of daily series
//! - Positioning: exchange member reports
//! - Market: exposure to the market index
//!
//! # Example
//!
//! ```ignore
//! use huelva_factors::registry::{FactorCatalog, FactorClass};
//! use huelva_factors::driver::FactorDriver;
//!
//! let catalog = FactorCatalog::new([FactorClass::Amp.default_group()])?;
//! let out = FactorDriver::default().run(
//!     catalog.get(FactorClass::Amp)?,
//!     &universe,
//!     "20240102",
//!     "20240701",
//!     &calendar,
//!     &source,
//! )?;
//! ```

pub mod algorithm;
pub mod available;
pub mod correlation;
pub mod driver;
pub mod frame;
pub mod group;
pub mod intraday;
pub mod market;
pub mod minute;
pub mod positioning;
pub mod price;
pub mod registry;
pub mod term_structure;

#[cfg(test)]
mod fixtures;

// Re-export key types
pub use algorithm::{FactorAlgorithm, InstrumentRequest};
pub use available::{ewa_smooth, intersect_available};
pub use driver::{FactorDriver, FailurePolicy, FanOut, InstrumentFailure};
pub use frame::{DailyFrame, DailySeries};
pub use group::{FactorGroupConfig, WinGroup, WinLbdGroup};
pub use minute::MinuteBars;
pub use registry::{FactorCatalog, FactorCategory, FactorClass, FactorInfo};
