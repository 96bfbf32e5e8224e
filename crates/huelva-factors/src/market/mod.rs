//! Families measured against the market index.

mod s0beta;

pub use s0beta::{MARKET_INDEX, S0betaFactor};
