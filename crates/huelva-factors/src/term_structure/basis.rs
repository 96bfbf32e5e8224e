//! Basis rate and the return left unexplained by it.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::diff::DiffScale;
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

const X_FIELD: &str = "basis_rate";
const Y_FIELD: &str = "return_c_major";

/// Residual of `y` after a per-row beta on `x`, negated when `negate`.
pub(crate) fn residual(x: &[f64], y: &[f64], beta: &[f64], negate: bool) -> Vec<f64> {
    let sign = if negate { -1.0 } else { 1.0 };
    x.iter()
        .zip(y)
        .zip(beta)
        .map(|((a, b), k)| sign * (b - a * k))
        .collect()
}

/// `BASIS`: rolling mean of the basis rate, and `RES` variants holding the
/// return residual after a rolling regression on the basis rate.
///
/// Takes exactly two windows. `BASISDIFF` contrasts the vanilla pair,
/// `BASISDIFF2` the residual pair.
#[derive(Debug, Clone)]
pub struct BasisFactor {
    group: WinGroup,
    diff_wins: (usize, usize),
}

impl BasisFactor {
    /// Creates the family from a two-window group.
    pub fn new(group: WinGroup) -> Result<Self> {
        let diff_wins = group.pair()?;
        Ok(Self { group, diff_wins })
    }
}

impl FactorAlgorithm for BasisFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_res());
        names.push(self.group.name_diff());
        names.push(self.group.name_diff2());
        names
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[X_FIELD, Y_FIELD])?;
        let x = frame.column(X_FIELD)?.to_vec();
        let y = frame.column(Y_FIELD)?.to_vec();
        for win in self.group.wins() {
            frame.insert(
                self.group.name_vanilla(*win),
                rolling::mean(&x, *win, 2 * win / 3),
            );
            let beta = rolling::beta(&x, &y, *win, *win);
            frame.insert(self.group.name_res(*win), residual(&x, &y, &beta, false));
        }
        let (w0, w1) = self.diff_wins;
        frame.insert_diff(
            self.group.name_diff(),
            &self.group.name_vanilla(w0),
            &self.group.name_vanilla(w1),
            self.diff_wins,
            DiffScale::Mean,
        )?;
        frame.insert_diff(
            self.group.name_diff2(),
            &self.group.name_res(w0),
            &self.group.name_res(w1),
            self.diff_wins,
            DiffScale::Mean,
        )?;
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}
