//! Fixed-weight blends of strategy signals.

use crate::strategy::signal_frame;
use huelva_traits::{HuelvaError, Instrument, Panel, Portfolio, Result, TradeDate, columns};
use std::collections::BTreeMap;
use tracing::info;

/// Blends strategy signals with a portfolio's weights.
#[derive(Debug, Clone)]
pub struct PortfolioSignals {
    portfolio: Portfolio,
}

impl PortfolioSignals {
    /// Creates the blender; weights are used as given.
    pub const fn new(portfolio: Portfolio) -> Self {
        Self { portfolio }
    }

    /// The portfolio.
    pub const fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// `Σ weight_s × signal_s` per `(trade_date, instrument)`.
    ///
    /// A strategy without a row, or with a missing weight, contributes 0 to it.
    ///
    /// # Errors
    ///
    /// [`HuelvaError::Config`] when a weighted strategy has no signal panel.
    pub fn compute(&self, strategies: &BTreeMap<String, Panel>) -> Result<Panel> {
        let mut blended: BTreeMap<(TradeDate, Instrument), f64> = BTreeMap::new();
        for (name, weight) in &self.portfolio.weights {
            let signals = strategies.get(name).ok_or_else(|| {
                HuelvaError::Config(format!(
                    "portfolio {} needs signals of strategy {name}",
                    self.portfolio.name
                ))
            })?;
            let rows = signals
                .dates()?
                .into_iter()
                .zip(signals.instruments()?)
                .zip(signals.floats(columns::WEIGHT)?);
            for (key, w) in rows {
                let entry = blended.entry(key).or_insert(0.0);
                if !w.is_nan() {
                    *entry += weight * w;
                }
            }
        }

        let mut dates = Vec::with_capacity(blended.len());
        let mut instruments = Vec::with_capacity(blended.len());
        let mut values = Vec::with_capacity(blended.len());
        for ((d, i), w) in blended {
            dates.push(d);
            instruments.push(i);
            values.push(w);
        }
        let out = signal_frame(dates, instruments, values)?;
        info!(
            portfolio = %self.portfolio.name,
            strategies = self.portfolio.weights.len(),
            rows = out.len(),
            "portfolio signals computed"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn portfolio() -> Portfolio {
        Portfolio {
            name: "P1".to_string(),
            weights: BTreeMap::from([("S1".to_string(), 2.0), ("S2".to_string(), 0.5)]),
        }
    }

    fn strategies() -> BTreeMap<String, Panel> {
        let s1 = Panel::new(
            df! {
                "trade_date" => ["20240102", "20240102"],
                "instrument" => ["AL", "CU"],
                "weight" => [0.5, -0.5],
            }
            .unwrap(),
        );
        let s2 = Panel::new(
            df! {
                "trade_date" => ["20240102", "20240102"],
                "instrument" => ["CU", "ZN"],
                "weight" => [Some(1.0), None],
            }
            .unwrap(),
        );
        BTreeMap::from([("S1".to_string(), s1), ("S2".to_string(), s2)])
    }

    #[test]
    fn test_blend_counts_missing_as_zero() {
        let out = PortfolioSignals::new(portfolio()).compute(&strategies()).unwrap();
        assert_eq!(out.instruments().unwrap(), vec!["AL", "CU", "ZN"]);
        let w = out.floats("weight").unwrap();
        assert_relative_eq!(w[0], 1.0);
        assert_relative_eq!(w[1], -0.5);
        assert_relative_eq!(w[2], 0.0);
    }

    #[test]
    fn test_missing_strategy() {
        let mut p = portfolio();
        p.weights.insert("S9".to_string(), 1.0);
        let err = PortfolioSignals::new(p).compute(&strategies()).unwrap_err();
        assert!(err.is_config());
    }
}
