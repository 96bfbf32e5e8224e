#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Factor weight optimization and signal combination for Huelva.
//!
//! # Example
//!
//! ```rust,ignore
//! use huelva_combine::{OptimizerKind, StrategySignals, WeightOptimizer, SignalTable};
//!
//! let weights = WeightOptimizer::new(strategy.clone(), OptimizerKind::Sharpe, Default::default())
//!     .run(begin, stop, &vt_returns, &calendar)?;
//! let table = SignalTable::from_panels(&strategy.factor_names(), &[&signals_a, &signals_b])?;
//! let signals = StrategySignals::new(strategy)?.run(begin, &table, &weights, &book, &css)?;
//! ```

pub mod factor_signals;
pub mod optimizer;
pub mod portfolio;
pub mod strategy;
pub mod tilt;

// Re-export main types
pub use factor_signals::{FactorSignals, SIGNAL_RATE};
pub use optimizer::{OptimizerConfig, OptimizerKind, WEEK_SPAN, WeightOptimizer, align_weights};
pub use portfolio::PortfolioSignals;
pub use strategy::{SignalTable, StrategySignals, apply_throttle};
pub use tilt::covariance_tilt;
