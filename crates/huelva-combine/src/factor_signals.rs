//! Instrument weights of single factors.

use huelva_math::gen_exp_weight;
use huelva_traits::{Panel, Result, columns, float_values, frame_from_parts};
use std::cmp::Ordering;
use tracing::info;

/// Decay rate of factor signals: equal magnitude across each leg.
pub const SIGNAL_RATE: f64 = 1.0;

/// Exponential rank weights of every factor of a family.
#[derive(Debug, Clone)]
pub struct FactorSignals {
    factor_class: String,
    factor_names: Vec<String>,
    rate: f64,
}

impl FactorSignals {
    /// Signals of `factor_names` with [`SIGNAL_RATE`].
    pub fn new(factor_class: impl Into<String>, factor_names: Vec<String>) -> Self {
        Self {
            factor_class: factor_class.into(),
            factor_names,
            rate: SIGNAL_RATE,
        }
    }

    /// Overrides the decay rate.
    #[must_use]
    pub const fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// The factor names.
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    /// Per date and factor, instruments sorted by descending factor value
    /// (missing values last) receive `gen_exp_weight(k, rate)` in order.
    ///
    /// The result keeps the factor panel's `(trade_date, instrument)` rows
    /// and holds one weight column per factor, named after it.
    pub fn compute(&self, factors: &Panel) -> Result<Panel> {
        let mut required = vec![columns::TRADE_DATE, columns::INSTRUMENT];
        required.extend(self.factor_names.iter().map(String::as_str));
        factors.require_columns(&required)?;
        let panel = factors.sorted_by(&[columns::TRADE_DATE, columns::INSTRUMENT])?;
        let groups = panel.date_groups()?;

        let mut weights: Vec<(String, Vec<f64>)> = Vec::with_capacity(self.factor_names.len());
        for name in &self.factor_names {
            let values = float_values(panel.data(), name)?;
            let mut out = vec![f64::NAN; values.len()];
            for rows in groups.values() {
                let mut order = rows.clone();
                order.sort_by(|&a, &b| descending(values[a], values[b]));
                for (&row, w) in order.iter().zip(gen_exp_weight(rows.len(), self.rate)) {
                    out[row] = w;
                }
            }
            weights.push((name.clone(), out));
        }

        let df = frame_from_parts(
            vec![
                (columns::TRADE_DATE, panel.dates()?),
                (columns::INSTRUMENT, panel.instruments()?),
            ],
            &weights,
        )?;
        info!(
            factor_class = %self.factor_class,
            dates = groups.len(),
            rows = df.height(),
            "factor signals computed"
        );
        Ok(Panel::new(df))
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn factors() -> Panel {
        Panel::new(
            df! {
                "trade_date" => ["20240102", "20240102", "20240102", "20240102", "20240103", "20240103"],
                "instrument" => ["AL", "CU", "NI", "ZN", "AL", "CU"],
                "F1" => [Some(0.3), Some(-1.0), None, Some(2.0), Some(1.0), Some(2.0)],
                "F2" => [1.0, 2.0, 3.0, 4.0, 0.0, 0.0],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_descending_ranks() {
        let out = FactorSignals::new("F", vec!["F1".to_string(), "F2".to_string()])
            .compute(&factors())
            .unwrap();
        assert_eq!(out.columns(), vec!["trade_date", "instrument", "F1", "F2"]);
        let f1 = out.floats("F1").unwrap();
        // 20240102 order: ZN, AL, CU, NI (missing last).
        assert_relative_eq!(f1[3], 0.25);
        assert_relative_eq!(f1[0], 0.25);
        assert_relative_eq!(f1[1], -0.25);
        assert_relative_eq!(f1[2], -0.25);
        // 20240103: CU long, AL short.
        assert_relative_eq!(f1[5], 0.5);
        assert_relative_eq!(f1[4], -0.5);
    }

    #[test]
    fn test_decaying_rate() {
        let out = FactorSignals::new("F", vec!["F2".to_string()])
            .with_rate(0.25)
            .compute(&factors())
            .unwrap();
        let f2 = out.floats("F2").unwrap();
        // Two per leg: the inner weight is a quarter of the outer one.
        assert_relative_eq!(f2[2] / f2[3], 0.25, epsilon = 1e-12);
        assert_relative_eq!(f2[1] / f2[0], 0.25, epsilon = 1e-12);
        let gross: f64 = f2[..4].iter().map(|w| w.abs()).sum();
        assert_relative_eq!(gross, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_factor_column() {
        let err = FactorSignals::new("F", vec!["F9".to_string()])
            .compute(&factors())
            .unwrap_err();
        assert!(err.to_string().contains("F9"));
    }
}
