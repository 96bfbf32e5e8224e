//! Families built on the relation between contracts, the basis and
//! warehouse stock.

mod basis;
mod minor;
mod rs;
mod ts;

pub use basis::BasisFactor;
pub use minor::MinorFactor;
pub use rs::RsFactor;
pub use ts::TsFactor;

pub(crate) use basis::residual;
