//! Families built from exchange member position reports.

mod spdweb;

pub use spdweb::SpdwebFactor;
