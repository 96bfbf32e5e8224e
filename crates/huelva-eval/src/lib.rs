#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Factor testing for the Huelva futures pipeline.
//!
//! This crate provides the inputs and the engine of factor tests:
//! - Forward test returns per return horizon
//! - The available universe and its cross-section statistics
//! - Trailing covariances of available instruments
//! - IC, VT and OT scoring of factor panels
//! - Yearly reports and factor-to-factor correlation
//!
//! # Example
//!
//! ```rust,ignore
//! use huelva_eval::{IcScorer, QTest, YearlyReport, TestKind};
//!
//! let test = QTest::new("AMP", names, "Opn010L1".parse()?, 1);
//! let scores = test.run(&IcScorer::new(false), &returns, &factors, &available, &calendar)?;
//! let report = YearlyReport::from_results(test.save_id(), TestKind::Ic, &scores, test.factor_names())?;
//! ```

pub mod correlation;
pub mod covariance;
pub mod css;
pub mod qtest;
pub mod report;
pub mod returns;
pub mod universe;

// Re-export main types
pub use correlation::{FactorCorrelation, YearlyCorrelation, factor_correlation};
pub use covariance::{CovarianceBook, CovarianceEstimator};
pub use css::{CrossSectionStats, CssConfig, dispersion_ratio};
pub use qtest::{
    CrossSection, IcScorer, OtConfig, OtScorer, QTest, Scorer, TestKind, VtScorer, scorer_for,
};
pub use report::{IcSummary, ReportRows, ReturnSummary, YearlyReport};
pub use returns::{TestReturnCalculator, forward_returns};
pub use universe::{AvailableUniverse, ReturnGrid, UniverseConfig};
