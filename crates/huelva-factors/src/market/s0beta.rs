//! Beta to the commodity market index.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, DailySeries};
use crate::group::WinGroup;
use crate::term_structure::residual;
use huelva_math::rolling;
use huelva_traits::{Result, columns, float_values, text_values};
use polars::prelude::DataFrame;

/// Market index return the instrument is regressed on.
pub const MARKET_INDEX: &str = "INH0100_NHF";

/// `S0BETA`: rolling beta of the close-to-close return on the market index
/// return, the negated residual (`RES`) and its one-session delay (`RESD`).
#[derive(Debug, Clone)]
pub struct S0betaFactor {
    group: WinGroup,
}

impl S0betaFactor {
    /// Creates the family.
    pub fn new(group: WinGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for S0betaFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_res());
        names.extend(self.group.names_delay());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &["return_c_major"])?;
        let market = request.source.load_market_index(
            &begin,
            request.stop,
            &[columns::TRADE_DATE, MARKET_INDEX],
        )?;
        let index: DailySeries = text_values(&market, columns::TRADE_DATE)?
            .into_iter()
            .zip(float_values(&market, MARKET_INDEX)?)
            .collect();
        frame.attach(MARKET_INDEX, &index);
        let x = frame.column(MARKET_INDEX)?.to_vec();
        let y = frame.column("return_c_major")?.to_vec();
        for win in self.group.wins() {
            let beta = rolling::beta(&x, &y, *win, *win);
            let res = residual(&x, &y, &beta, true);
            frame.insert(self.group.name_delay(*win), rolling::shift(&res, 1));
            frame.insert(self.group.name_res(*win), res);
            frame.insert(self.group.name_vanilla(*win), beta);
        }
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
