//! Correlation of turnover and return.

use super::sliced::insert_sliced;
use super::ctp::raw_turnover;
use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// `CTR`: correlation of turnover with the close-to-close return over the
/// highest volume sessions of each window.
#[derive(Debug, Clone)]
pub struct CtrFactor {
    group: WinLbdGroup,
}

impl CtrFactor {
    /// Creates the family.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for CtrFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        self.group.names_vanilla()
    }

    fn max_window(&self) -> usize {
        self.group.base().max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(
            request,
            &begin,
            &["return_c_major", "oi_major", "vol_major"],
        )?;
        let vol = frame.column("vol_major")?.to_vec();
        let turnover = raw_turnover(&vol, frame.column("oi_major")?);
        let ret = frame.column("return_c_major")?.to_vec();
        insert_sliced(&mut frame, &self.group, &turnover, &ret, &vol);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
