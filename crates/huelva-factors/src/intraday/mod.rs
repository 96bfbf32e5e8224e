//! Families reduced from minute bars, one value per session before rolling.

mod acr;
mod amp;
mod idv;
mod ikurt;
mod jump;
mod lcvr;
mod mf;
mod npls;
mod onr;
mod smt;
mod ventropy;
mod wsplit;

pub use acr::AcrFactor;
pub use amp::AmpFactor;
pub use idv::IdvFactor;
pub use ikurt::IkurtFactor;
pub use jump::JumpFactor;
pub use lcvr::LcvrFactor;
pub use mf::MfFactor;
pub use npls::NplsFactor;
pub use onr::OnrFactor;
pub use smt::SmtFactor;
pub use ventropy::VentropyFactor;
pub use wsplit::WsplitFactor;
