//! Correlation of turnover and price.

use super::sliced::insert_sliced;
use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinLbdGroup;
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Volume over the two-session average open interest; `NaN` where undefined.
pub(crate) fn raw_turnover(vol: &[f64], oi: &[f64]) -> Vec<f64> {
    let aver_oi = rolling::mean(oi, 2, 2);
    robust::div(vol, &aver_oi, f64::NAN, Guard::NonZero)
}

/// `CTP`: correlation of turnover with the index price over the highest
/// volume sessions of each window.
#[derive(Debug, Clone)]
pub struct CtpFactor {
    group: WinLbdGroup,
}

impl CtpFactor {
    /// Creates the family.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for CtpFactor {
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
        let mut frame =
            DailyFrame::load(request, &begin, &["closeI", "oi_major", "vol_major"])?;
        let vol = frame.column("vol_major")?.to_vec();
        let turnover = raw_turnover(&vol, frame.column("oi_major")?);
        let price = frame.column("closeI")?.to_vec();
        insert_sliced(&mut frame, &self.group, &turnover, &price, &vol);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
