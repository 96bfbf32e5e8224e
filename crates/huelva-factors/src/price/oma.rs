//! Ordering of moving averages.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::DailyFrame;
use crate::group::WinGroup;
use huelva_math::{rank, rolling};
use huelva_traits::Result;
use polars::prelude::DataFrame;

const PRICE_FIELD: &str = "closeI";
const VOLUME_FIELD: &str = "vol_major";

/// `OMA`: how far the moving averages are ordered by window length.
///
/// `OMAP` is the negated Spearman correlation between the price averages and
/// their window positions, `OMAV` the same for volume, `OMAS` their sum.
/// Undefined correlations count as 0.
#[derive(Debug, Clone)]
pub struct OmaFactor {
    group: WinGroup,
}

impl OmaFactor {
    /// Creates the family.
    pub fn new(group: WinGroup) -> Result<Self> {
        Ok(Self { group })
    }

    fn order(&self, averages: &[Vec<f64>], len: usize) -> Vec<f64> {
        let positions: Vec<f64> = (0..averages.len()).map(|p| p as f64).collect();
        (0..len)
            .map(|i| {
                let row: Vec<f64> = averages.iter().map(|ma| ma[i]).collect();
                let rho = rank::spearman(&row, &positions);
                if rho.is_nan() { 0.0 } else { -rho }
            })
            .collect()
    }
}

impl FactorAlgorithm for OmaFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        ["P", "V", "S"]
            .iter()
            .map(|s| self.group.name_suffixed(s))
            .collect()
    }

    fn max_window(&self) -> usize {
        self.group.max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[PRICE_FIELD, VOLUME_FIELD])?;
        let price = frame.column(PRICE_FIELD)?;
        let volume = frame.column(VOLUME_FIELD)?;
        let (price_ma, volume_ma): (Vec<Vec<f64>>, Vec<Vec<f64>>) = self
            .group
            .wins()
            .iter()
            .map(|w| (rolling::mean(price, *w, *w), rolling::mean(volume, *w, *w)))
            .unzip();
        let order_p = self.order(&price_ma, frame.len());
        let order_v = self.order(&volume_ma, frame.len());
        let order_s = order_p.iter().zip(&order_v).map(|(p, v)| p + v).collect();
        for ((win, p), v) in self.group.wins().iter().zip(price_ma).zip(volume_ma) {
            frame.insert(self.group.name_vanilla(*win), p);
            frame.insert(self.group.name_tagged(*win, "V"), v);
        }
        frame.insert(self.group.name_suffixed("P"), order_p);
        frame.insert(self.group.name_suffixed("V"), order_v);
        frame.insert(self.group.name_suffixed("S"), order_s);
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
    use crate::fixtures::{Fixture, assert_shape, last};
    use approx::assert_relative_eq;

    #[test]
    fn test_order_of_monotone_averages() {
        let alg = OmaFactor::new(WinGroup::new("OMA", vec![5, 10, 20]).unwrap()).unwrap();
        let rising = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert_relative_eq!(alg.order(&rising, 1)[0], -1.0);
        let flat = vec![vec![1.0], vec![1.0], vec![1.0]];
        assert_eq!(alg.order(&flat, 1)[0], 0.0);
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let alg = OmaFactor::new(WinGroup::new("OMA", vec![5, 10, 20]).unwrap()).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let price = fixture.daily("closeI");
        let volume = fixture.daily("vol_major");
        let r = Fixture::last_row();
        let ma = |x: &[f64], w: usize| x[r + 1 - w..=r].iter().sum::<f64>() / w as f64;
        let positions = [0.0, 1.0, 2.0];
        let p = -rank::spearman(&[ma(&price, 5), ma(&price, 10), ma(&price, 20)], &positions);
        let v = -rank::spearman(&[ma(&volume, 5), ma(&volume, 10), ma(&volume, 20)], &positions);
        assert_relative_eq!(last(&out, "OMAP"), p, epsilon = 1e-12);
        assert_relative_eq!(last(&out, "OMAS"), p + v, epsilon = 1e-12);
    }
}
