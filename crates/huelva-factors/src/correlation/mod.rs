//! Families correlating two daily series over the highest volume sessions
//! of a trailing window.

mod sliced;
mod ctp;
mod ctr;
mod cvp;

pub use ctp::CtpFactor;
pub use ctr::CtrFactor;
pub use cvp::CvpFactor;
