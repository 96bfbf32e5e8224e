//! Families computed from the daily bars of the major contract.

mod cnvg;
mod idr;
mod kurt;
mod liquidity;
mod oma;
mod size;
mod skew;
mod tr;
mod val;

pub use cnvg::CnvgFactor;
pub use idr::IdrFactor;
pub use kurt::KurtFactor;
pub use liquidity::LiquidityFactor;
pub use oma::OmaFactor;
pub use size::SizeFactor;
pub use skew::SkewFactor;
pub use tr::TrFactor;
pub use val::ValFactor;
