//! Weekly factor weights of a strategy.
//!
//! At the end of every week the factors' VT returns over the strategy's
//! optimization window are turned into weights, either maximizing the
//! window's Sharpe ratio near a signed inverse-volatility guess or equally.
//! The weekly weights are then carried forward to every session.

use derive_more::Display;
use huelva_math::{SharpeProblem, drift_bounds, sample_covariance, stats};
use huelva_traits::{
    Calendar, HuelvaError, Panel, Result, Strategy, TradeDate, columns, float_values,
    frame_from_parts, text_values,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Extra sessions loaded before the first optimization window.
pub const WEEK_SPAN: usize = 10;

/// How factor weights are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Maximize the Sharpe ratio of the factors' VT returns.
    #[default]
    #[display("VT")]
    #[serde(rename = "VT")]
    Sharpe,
    /// `1/n` per factor.
    #[display("EQ")]
    #[serde(rename = "EQ")]
    Equal,
}

impl FromStr for OptimizerKind {
    type Err = HuelvaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VT" | "SHARPE" => Ok(Self::Sharpe),
            "EQ" | "EQUAL" => Ok(Self::Equal),
            other => Err(HuelvaError::Config(format!("unknown optimizer: {other}"))),
        }
    }
}

/// Bounds of the Sharpe optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Relative drift allowed around the initial guess.
    pub drift: f64,
    /// Lower bound of `Σ|w|`.
    pub budget_low: f64,
    /// Upper bound of `Σ|w|`.
    pub budget_high: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            drift: 0.2,
            budget_low: 0.9,
            budget_high: 1.1,
        }
    }
}

/// Optimizes the factor weights of one strategy.
#[derive(Debug, Clone)]
pub struct WeightOptimizer {
    strategy: Strategy,
    kind: OptimizerKind,
    config: OptimizerConfig,
}

impl WeightOptimizer {
    /// Creates the optimizer of `strategy`.
    pub const fn new(strategy: Strategy, kind: OptimizerKind, config: OptimizerConfig) -> Self {
        Self {
            strategy,
            kind,
            config,
        }
    }

    /// The strategy.
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// First date of factor returns needed for an output starting at `begin`.
    pub fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        let shift = -((self.strategy.opt_win + WEEK_SPAN) as i64) + 1;
        calendar.next_date(begin, shift)
    }

    /// Sharpe-optimal weights of the columns of `rets` (rows are dates).
    ///
    /// The guess is `sign(mean) / std` normalized to `Σ|w| = 1`; each weight
    /// may drift by `config.drift` around it. Factors with a degenerate guess
    /// start at 0, and a window with no usable factor gets equal weights.
    pub fn optimize_window(&self, rets: &[Vec<f64>]) -> Result<Vec<f64>> {
        let n = rets.len();
        let mean: Vec<f64> = rets.iter().map(|r| stats::mean(r)).collect();
        let raw: Vec<f64> = rets
            .iter()
            .zip(&mean)
            .map(|(r, m)| {
                let w = m.signum() / stats::std(r);
                if w.is_finite() && *m != 0.0 { w } else { 0.0 }
            })
            .collect();
        let gross: f64 = raw.iter().map(|w| w.abs()).sum();
        if gross <= 0.0 {
            warn!(
                strategy = %self.strategy.name,
                "no factor has a usable return history, using equal weights"
            );
            return Ok(vec![1.0 / n as f64; n]);
        }
        let x0: Vec<f64> = raw.iter().map(|w| w / gross).collect();

        let cov = complete_covariance(rets);
        let mean: Vec<f64> = mean.iter().map(|m| if m.is_finite() { *m } else { 0.0 }).collect();
        let (lower, upper) = drift_bounds(&x0, self.config.drift);
        let outcome = SharpeProblem::new(mean, cov, x0)?
            .with_bounds(lower, upper)?
            .with_budget(self.config.budget_low, self.config.budget_high)
            .solve();
        if !outcome.improved {
            warn!(
                strategy = %self.strategy.name,
                sharpe = outcome.sharpe,
                initial = outcome.initial_sharpe,
                "optimization did not improve on the initial guess"
            );
        }
        let gross: f64 = outcome.weights.iter().map(|w| w.abs()).sum();
        Ok(outcome.weights.iter().map(|w| w / gross).collect())
    }

    /// Weights at `trade_date` from the `opt_win` sessions ending on it.
    ///
    /// `factor_returns` has `trade_date` and one column per strategy factor.
    pub fn optimize_at(
        &self,
        trade_date: &str,
        factor_returns: &Panel,
        calendar: &dyn Calendar,
    ) -> Result<Vec<f64>> {
        let names = self.strategy.factor_names();
        if self.kind == OptimizerKind::Equal {
            return Ok(vec![1.0 / names.len() as f64; names.len()]);
        }
        let first = calendar.next_date(trade_date, -(self.strategy.opt_win as i64) + 1)?;
        let df = factor_returns.data();
        let dates = text_values(df, columns::TRADE_DATE)?;
        let rows: Vec<usize> = (0..dates.len())
            .filter(|&i| dates[i] >= first && dates[i].as_str() <= trade_date)
            .collect();
        let rets: Vec<Vec<f64>> = names
            .iter()
            .map(|n| {
                let v = float_values(df, n)?;
                Ok(rows.iter().map(|&i| v[i]).collect())
            })
            .collect::<Result<_>>()?;
        debug!(trade_date, rows = rows.len(), "optimizing factor weights");
        self.optimize_window(&rets)
    }

    /// Weekly weights over `[begin, stop)`, forward-filled to every session.
    ///
    /// The result has `trade_date` and one column per strategy factor.
    pub fn run(
        &self,
        begin: &str,
        stop: &str,
        factor_returns: &Panel,
        calendar: &dyn Calendar,
    ) -> Result<Panel> {
        let names = self.strategy.factor_names();
        if self.kind == OptimizerKind::Sharpe {
            let mut required = vec![columns::TRADE_DATE];
            required.extend(names.iter().map(String::as_str));
            factor_returns.require_columns(&required)?;
        }
        let buffer = self.buffer_begin(begin, calendar)?;
        let weekly: Vec<(TradeDate, Vec<f64>)> = calendar
            .week_end_days(&buffer, stop)
            .into_iter()
            .map(|d| {
                let w = self.optimize_at(&d, factor_returns, calendar)?;
                Ok((d, w))
            })
            .collect::<Result<_>>()?;
        let out = align_weights(&weekly, &names, begin, stop, calendar)?;
        info!(
            strategy = %self.strategy.name,
            method = %self.kind,
            weeks = weekly.len(),
            rows = out.len(),
            "factor weights optimized"
        );
        Ok(out)
    }
}

fn complete_covariance(rets: &[Vec<f64>]) -> Array2<f64> {
    let n = rets.len();
    let t = rets.first().map_or(0, Vec::len);
    let rows: Vec<usize> = (0..t)
        .filter(|&i| rets.iter().all(|r| r[i].is_finite()))
        .collect();
    let data = Array2::from_shape_fn((rows.len(), n), |(i, j)| rets[j][rows[i]]);
    sample_covariance(data.view())
}

/// Carries dated weights forward onto every session from the first weight
/// date up to `stop`, then keeps `[begin, stop)`.
pub fn align_weights(
    weights: &[(TradeDate, Vec<f64>)],
    names: &[String],
    begin: &str,
    stop: &str,
    calendar: &dyn Calendar,
) -> Result<Panel> {
    let mut dates = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    if let Some((first, _)) = weights.first() {
        let mut next = 0;
        let mut current: Option<&Vec<f64>> = None;
        for d in calendar.iter_dates(first, stop) {
            while next < weights.len() && weights[next].0 <= d {
                current = Some(&weights[next].1);
                next += 1;
            }
            if d.as_str() < begin {
                continue;
            }
            if let Some(w) = current {
                for (col, v) in values.iter_mut().zip(w) {
                    col.push(*v);
                }
                dates.push(d);
            }
        }
    }
    let parts: Vec<(String, Vec<f64>)> = names.iter().cloned().zip(values).collect();
    Ok(Panel::new(frame_from_parts(
        vec![(columns::TRADE_DATE, dates)],
        &parts,
    )?))
}
