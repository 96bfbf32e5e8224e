#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # huelva
//!
//! huelva is an umbrella crate that re-exports all huelva sub-crates for
//! convenience.
//!
//! ## Quick Start
//!
//! ```ignore
//! use huelva::prelude::*;
//! use huelva::eval::{IcScorer, QTest};
//!
//! # fn main() -> Result<()> {
//! let calendar = TradingCalendar::from_csv("calendar.csv")?;
//! let test = QTest::new("AMP", names, "Opn010L1".parse()?, 1);
//! let ic = test.run(&IcScorer::new(false), &returns, &factors, &available, &calendar)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Factors** turn each instrument's market data into dated factor values
//! 2. **Tests** score factors against forward returns, date by date
//! 3. **Optimizer** weighs a strategy's factors by their recent VT returns
//! 4. **Signals** combine factor ranks into risk-balanced instrument weights

/// Version information for the huelva crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core types, calendar and collaborator traits.
pub mod traits {
    pub use huelva_traits::*;
}

// Re-export error types
pub use huelva_traits::{HuelvaError, Result};

/// Numerical primitives.
pub mod math {
    pub use huelva_math::*;
}

/// SQLite persistence.
pub mod store {
    pub use huelva_store::*;
}

/// Factor families.
pub mod factors {
    pub use huelva_factors::*;
}

/// Factor testing.
///
/// ```text
/// IC_t = spearman(factor_t, return_{t -> t + win + lag})
/// IR   = mean(IC) / std(IC)
/// ```
pub mod eval {
    pub use huelva_eval::*;
}

/// Weight optimization and signal combination.
pub mod combine {
    pub use huelva_combine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{HuelvaError, Result};
    pub use huelva_traits::{
        Calendar, FactorId, MarketDataSource, Panel, Portfolio, ReturnSpec, Strategy,
        TabularStore, TradingCalendar,
    };
}
