#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```
//! use huelva_math::{diff::{DiffScale, diff}, rolling};
//!
//! let closes = vec![1.0; 40];
//! let long = rolling::mean(&closes, 20, 20);
//! let short = rolling::mean(&closes, 5, 5);
//! let d = diff(&long, &short, 20, 5, DiffScale::Mean);
//! assert!((d[39] - 1.0).abs() < 1e-12);
//! ```

pub mod covariance;
pub mod diff;
pub mod linalg;
pub mod optimize;
pub mod rank;
pub mod robust;
pub mod rolling;
pub mod stats;
pub mod weighted;

// Re-export main types
pub use covariance::{CovarianceMatrix, correlation_matrix, sample_covariance};
pub use diff::DiffScale;
pub use linalg::symmetric_eigenvalues;
pub use optimize::{OptimizeOutcome, SharpeProblem, drift_bounds};
pub use rank::{average_rank, spearman};
pub use robust::Guard;
pub use weighted::{ewa, ewa_weights, gen_exp_weight, map_to_weight, wcorr, wcov, weighted_volatility};
