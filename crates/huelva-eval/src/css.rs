//! Cross-section statistics and the gross exposure throttle.
//!
//! Every date of the available panel is summarized by the dispersion of its
//! returns. The smoothed dispersion `vma` sets the throttle `tot_wgt`:
//! full exposure in calm markets, `low_weight` otherwise.

use crate::universe::ReturnGrid;
use huelva_math::{correlation_matrix, rolling, stats, symmetric_eigenvalues, weighted_volatility};
use huelva_traits::{
    Calendar, Panel, Result, TradeDate, columns, float_values, frame_from_parts, text_values,
};
use ndarray::{Axis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Sessions loaded before `begin`.
pub const CSS_BUFFER: i64 = 20;

/// Parameters of the cross-section statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Sector names: `sectorL1` tags of the universe and columns of the
    /// market index table.
    pub sectors: Vec<String>,
    /// `vma` below this keeps full exposure.
    pub vma_threshold: f64,
    /// Exposure when `vma` is at or above the threshold.
    pub low_weight: f64,
    /// Smoothing window of the daily statistics.
    pub win: usize,
    /// Window of the return correlation behind `sev`.
    pub sev_win: usize,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            sectors: Vec::new(),
            vma_threshold: 0.0175,
            low_weight: 0.5,
            win: 5,
            sev_win: 20,
        }
    }
}

/// Computes the `css` table.
#[derive(Debug, Clone)]
pub struct CrossSectionStats {
    config: CssConfig,
}

impl CrossSectionStats {
    /// Creates the calculator.
    pub const fn new(config: CssConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub const fn config(&self) -> &CssConfig {
        &self.config
    }

    /// First date to load for an output starting at `begin`.
    pub fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        calendar.next_date(begin, -CSS_BUFFER)
    }

    /// Output column names after `trade_date`, in table order.
    pub fn value_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["volatility", "skewness", "kurtosis"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        names.extend(self.config.sectors.iter().map(|s| format!("volatility_{s}")));
        names.extend(
            ["vma", "sma", "kma", "volatility_sector", "sev", columns::TOT_WGT]
                .iter()
                .map(|s| (*s).to_string()),
        );
        names
    }

    /// Statistics of the dates `>= begin`.
    ///
    /// `available` and `market_index` should start at
    /// [`buffer_begin`](Self::buffer_begin); the market index needs one
    /// column per configured sector.
    pub fn compute(&self, available: &Panel, market_index: &Panel, begin: &str) -> Result<Panel> {
        let cfg = &self.config;
        let df = available.data();
        let ret = float_values(df, columns::RETURN)?;
        let amount = float_values(df, columns::AMOUNT)?;
        let sector = text_values(df, columns::SECTOR_L1)?;
        let by_date = available.date_groups()?;
        let dates: Vec<TradeDate> = by_date.keys().cloned().collect();

        let n = dates.len();
        let mut volatility = Vec::with_capacity(n);
        let mut skewness = Vec::with_capacity(n);
        let mut kurtosis = Vec::with_capacity(n);
        let mut sector_vol = vec![Vec::with_capacity(n); cfg.sectors.len()];
        for rows in by_date.values() {
            let (r, a) = valid_pairs(rows.iter().copied(), &ret, &amount);
            volatility.push(weighted_volatility(&r, Some(&a)));
            skewness.push(stats::skew(&r));
            kurtosis.push(stats::kurt(&r));
            for (s, name) in cfg.sectors.iter().enumerate() {
                let members = rows.iter().copied().filter(|&i| sector[i] == *name);
                let (r, a) = valid_pairs(members, &ret, &amount);
                let v = if r.is_empty() {
                    f64::NAN
                } else {
                    weighted_volatility(&r, Some(&a))
                };
                sector_vol[s].push(v);
            }
        }

        let smooth = |x: &[f64]| rolling::mean(x, cfg.win, cfg.win);
        let vma = smooth(&volatility);
        let tot_wgt: Vec<f64> = vma
            .iter()
            .map(|v| if *v < cfg.vma_threshold { 1.0 } else { cfg.low_weight })
            .collect();
        let sector_dispersion = self.sector_dispersion(market_index)?;
        let sev_by_date = dispersion_ratio(&ReturnGrid::from_available(available)?, cfg.sev_win);

        let mut values: Vec<(String, Vec<f64>)> = vec![
            ("volatility".to_string(), volatility),
            ("skewness".to_string(), skewness.clone()),
            ("kurtosis".to_string(), kurtosis.clone()),
        ];
        for (name, v) in cfg.sectors.iter().zip(&sector_vol) {
            values.push((format!("volatility_{name}"), smooth(v)));
        }
        let lookup = |m: &BTreeMap<TradeDate, f64>| -> Vec<f64> {
            dates.iter().map(|d| m.get(d).copied().unwrap_or(f64::NAN)).collect()
        };
        values.push(("vma".to_string(), vma));
        values.push(("sma".to_string(), smooth(&skewness)));
        values.push(("kma".to_string(), smooth(&kurtosis)));
        values.push(("volatility_sector".to_string(), lookup(&sector_dispersion)));
        values.push(("sev".to_string(), lookup(&sev_by_date)));
        values.push((columns::TOT_WGT.to_string(), tot_wgt));

        let start = dates.partition_point(|d| d.as_str() < begin);
        let out_dates = dates[start..].to_vec();
        let values: Vec<(String, Vec<f64>)> = values
            .into_iter()
            .map(|(name, v)| (name, v[start..].to_vec()))
            .collect();
        let out = frame_from_parts(vec![(columns::TRADE_DATE, out_dates)], &values)?;
        info!(dates = out.height(), begin, "cross section statistics computed");
        Ok(Panel::new(out))
    }

    /// Smoothed cross-sector standard deviation of the sector indices.
    fn sector_dispersion(&self, market_index: &Panel) -> Result<BTreeMap<TradeDate, f64>> {
        let cfg = &self.config;
        let dates = market_index.dates()?;
        let series: Vec<Vec<f64>> = cfg
            .sectors
            .iter()
            .map(|s| market_index.floats(s))
            .collect::<Result<_>>()?;
        let daily: Vec<f64> = (0..dates.len())
            .map(|i| {
                let row: Vec<f64> = series.iter().map(|s| s[i]).collect();
                stats::std(&row)
            })
            .collect();
        let smoothed = rolling::mean(&daily, cfg.win, cfg.win);
        Ok(dates.into_iter().zip(smoothed).collect())
    }
}

fn valid_pairs(
    rows: impl Iterator<Item = usize>,
    ret: &[f64],
    amount: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    rows.filter(|&i| ret[i].is_finite() && amount[i].is_finite())
        .map(|i| (ret[i], amount[i]))
        .unzip()
}

/// Share of the trailing return correlation explained by eigenvalues above 1.
///
/// For every date with `win` sessions of history, the correlation of the
/// instruments available that date is taken over the window; flat return
/// series are dropped. The sum of eigenvalues above 1 is divided by the
/// number of remaining instruments.
pub fn dispersion_ratio(grid: &ReturnGrid, win: usize) -> BTreeMap<TradeDate, f64> {
    let mut out = BTreeMap::new();
    if win == 0 || grid.len() < win {
        return out;
    }
    for i in win - 1..grid.len() {
        let window = grid.values.slice_axis(Axis(0), Slice::from(i + 1 - win..i + 1));
        let live: Vec<usize> = grid.members[i]
            .iter()
            .copied()
            .filter(|&j| stats::var(&window.column(j).to_vec()) > 0.0)
            .collect();
        let ratio = if live.is_empty() {
            f64::NAN
        } else {
            let sub = window.select(Axis(1), &live);
            let corr = correlation_matrix(sub.view());
            let significant: f64 = symmetric_eigenvalues(&corr)
                .into_iter()
                .filter(|ev| *ev > 1.0)
                .sum();
            significant / live.len() as f64
        };
        out.insert(grid.dates[i].clone(), ratio);
    }
    out
}
