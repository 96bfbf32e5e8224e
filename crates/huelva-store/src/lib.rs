#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/huelva/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod schema;
pub mod source;
pub mod table;

pub use error::{StoreError, StoreResult};
pub use schema::{ColumnDef, SqlType, TableSchema};
pub use source::{MarketTable, SqliteSource};
pub use table::SqliteTable;
