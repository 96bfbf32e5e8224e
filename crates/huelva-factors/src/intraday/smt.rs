//! Smart money price gap.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, roll_series};
use crate::group::WinLbdGroup;
use crate::minute::{MinuteBars, sorted_desc};
use huelva_math::robust::{self, Guard};
use huelva_math::rolling;
use huelva_traits::Result;
use polars::prelude::DataFrame;

/// Return magnitude per log volume, the "smartness" of a minute.
fn smart_index(ret: f64, vol: f64) -> f64 {
    if vol > 1.0 {
        ret.abs() / vol.ln() * 1e4
    } else {
        0.0
    }
}

/// Amount-weighted average of `vwap` over `bars`, with the amount total.
fn weighted_price(bars: &[usize], vwap: &[f64], amount: &[f64]) -> (f64, f64) {
    let total: f64 = bars.iter().map(|i| amount[*i]).filter(|a| !a.is_nan()).sum();
    let price: f64 = bars.iter().map(|i| vwap[*i] * amount[*i] / total).sum();
    (price, total)
}

/// Negated basis-point gap between the price paid by the smartest minutes
/// holding `lbd` of the volume and the session's average price.
///
/// `order` lists the session's bars, smartest first.
fn smart_money(order: &[usize], vwap: &[f64], amount: &[f64], vol: &[f64], lbd: f64) -> f64 {
    let (total_price, total_amount) = weighted_price(order, vwap, amount);
    if total_amount <= 0.0 {
        return f64::NAN;
    }
    let threshold = order.iter().map(|i| vol[*i]).filter(|v| !v.is_nan()).sum::<f64>() * lbd;
    let mut cumulative = 0.0;
    let mut below = 0;
    for i in order {
        if !vol[*i].is_nan() {
            cumulative += vol[*i];
        }
        if cumulative < threshold {
            below += 1;
        }
    }
    let smart = &order[..(below + 1).min(order.len())];
    let (smart_price, smart_amount) = weighted_price(smart, vwap, amount);
    if smart_amount <= 0.0 {
        return f64::NAN;
    }
    if total_price > 0.0 {
        -(smart_price / total_price - 1.0) * 1e4
    } else {
        0.0
    }
}

/// `SMT`: rolling mean of the smart money gap over the sessions that have
/// minute bars, with a one-session delayed copy.
#[derive(Debug, Clone)]
pub struct SmtFactor {
    group: WinLbdGroup,
}

impl SmtFactor {
    /// Creates the family.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        Ok(Self { group })
    }
}

impl FactorAlgorithm for SmtFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.extend(self.group.names_delay());
        names
    }

    fn max_window(&self) -> usize {
        self.group.base().max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let bars = MinuteBars::load(request, &begin)?;
        let ret = rolling::fill_nan(&bars.simple_returns(1.0), 0.0);
        let vwap = rolling::ffill(
            &robust::div(bars.amount(), bars.vol(), f64::NAN, Guard::NonZero),
            None,
        );
        let smart: Vec<f64> = ret
            .iter()
            .zip(bars.vol())
            .map(|(r, v)| smart_index(*r, *v))
            .collect();
        let lbds = self.group.lbds();
        let daily = bars.aggregate_many(lbds.len(), |range| {
            let order = sorted_desc(range, &smart);
            lbds.iter()
                .map(|lbd| smart_money(&order, &vwap, bars.amount(), bars.vol(), *lbd))
                .collect()
        });
        for (lbd, series) in lbds.iter().zip(&daily) {
            for win in self.group.wins() {
                let vanilla = roll_series(series, |x| rolling::mean(x, *win, *win));
                let delay = roll_series(&vanilla, |x| rolling::shift(x, 1));
                frame.attach(self.group.name_vanilla(*win, *lbd), &vanilla);
                frame.attach(self.group.name_delay(*win, *lbd), &delay);
            }
        }
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fixture, assert_shape};
    use approx::assert_relative_eq;
    use huelva_traits::float_values;

    #[test]
    fn test_smart_index() {
        assert_eq!(smart_index(0.01, 1.0), 0.0);
        assert_relative_eq!(smart_index(-0.01, std::f64::consts::E), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smart_money() {
        let vwap = [10.0, 11.0, 12.0];
        let amount = [100.0, 110.0, 120.0];
        let vol = [10.0, 10.0, 10.0];
        let total = (1000.0 + 1210.0 + 1440.0) / 330.0;
        let smart = (1000.0 + 1210.0) / 210.0;
        let expected = -(smart / total - 1.0) * 1e4;
        let v = smart_money(&[0, 1, 2], &vwap, &amount, &vol, 0.5);
        assert_relative_eq!(v, expected, epsilon = 1e-9);
        assert!(smart_money(&[0, 1], &vwap, &[0.0, 0.0], &vol, 0.5).is_nan());
    }

    #[test]
    fn test_compute_delay() {
        let fixture = Fixture::new();
        let group = WinLbdGroup::new("SMT", vec![2, 10], vec![0.2, 0.5]).unwrap();
        let alg = SmtFactor::new(group).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let vanilla = float_values(&out, "SMT010L20").unwrap();
        let delay = float_values(&out, "SMT010L20D").unwrap();
        assert!(vanilla.iter().all(|v| v.is_finite()));
        assert_relative_eq!(delay[2], vanilla[1], epsilon = 1e-12);
    }
}
