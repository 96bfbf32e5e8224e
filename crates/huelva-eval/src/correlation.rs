//! Cross-sectional correlation between two factors.

use crate::report::ALL_YEARS;
use huelva_math::{spearman, stats};
use huelva_traits::{
    HuelvaError, Panel, Result, TradeDate, columns, float_values, frame_from_parts, join_on_keys,
    text_values,
};
use polars::prelude::JoinType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Column of the daily correlation.
pub const CORR: &str = "corr";

/// Mean correlation over one year, or over the whole range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyCorrelation {
    /// Calendar year, or `ALL`.
    pub trade_year: String,
    /// Mean of the daily correlations.
    pub corr: f64,
}

/// Daily and yearly rank correlation of two factors.
#[derive(Debug, Clone)]
pub struct FactorCorrelation {
    /// `(trade_date, corr)`, ascending by date.
    pub daily: Panel,
    /// One row per year, `ALL` last.
    pub yearly: Vec<YearlyCorrelation>,
}

/// Spearman correlation between factor `f0` of `left` and factor `f1` of
/// `right` on each date, over the `(trade_date, instrument)` rows both
/// panels share.
///
/// When both factors live in the same panel pass it twice.
pub fn factor_correlation(left: &Panel, f0: &str, right: &Panel, f1: &str) -> Result<FactorCorrelation> {
    if f0 == f1 {
        return Err(HuelvaError::Config(format!("cannot correlate {f0} with itself")));
    }
    let keys = [columns::TRADE_DATE, columns::INSTRUMENT];
    let lhs = left.data().select(keys.iter().copied().chain([f0]))?;
    let rhs = right.data().select(keys.iter().copied().chain([f1]))?;
    let joined = join_on_keys(&lhs, &rhs, JoinType::Inner)?;

    let dates = text_values(&joined, columns::TRADE_DATE)?;
    let x = float_values(&joined, f0)?;
    let y = float_values(&joined, f1)?;
    let mut by_date: BTreeMap<TradeDate, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for ((d, a), b) in dates.into_iter().zip(x).zip(y) {
        let entry = by_date.entry(d).or_default();
        entry.0.push(a);
        entry.1.push(b);
    }

    let mut out_dates = Vec::with_capacity(by_date.len());
    let mut corr = Vec::with_capacity(by_date.len());
    let mut by_year: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (date, (a, b)) in by_date {
        let c = spearman(&a, &b);
        by_year.entry(date.chars().take(4).collect()).or_default().push(c);
        out_dates.push(date);
        corr.push(c);
    }

    let mut yearly: Vec<YearlyCorrelation> = by_year
        .into_iter()
        .map(|(trade_year, values)| YearlyCorrelation {
            trade_year,
            corr: stats::mean(&values),
        })
        .collect();
    yearly.push(YearlyCorrelation {
        trade_year: ALL_YEARS.to_string(),
        corr: stats::mean(&corr),
    });
    info!(f0, f1, dates = out_dates.len(), "factor correlation computed");

    let daily = frame_from_parts(
        vec![(columns::TRADE_DATE, out_dates)],
        &[(CORR.to_string(), corr)],
    )?;
    Ok(FactorCorrelation {
        daily: Panel::new(daily),
        yearly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn panel() -> Panel {
        Panel::new(
            df! {
                "trade_date" => ["20231229", "20231229", "20231229", "20240102", "20240102", "20240102"],
                "instrument" => ["AL", "CU", "ZN", "AL", "CU", "ZN"],
                "X" => [1.0, 2.0, 3.0, 1.0, 2.0, 3.0],
                "Y" => [10.0, 20.0, 30.0, 30.0, 20.0, 10.0],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_daily_and_yearly() {
        let p = panel();
        let out = factor_correlation(&p, "X", &p, "Y").unwrap();
        assert_eq!(out.daily.dates().unwrap(), vec!["20231229", "20240102"]);
        let corr = out.daily.floats(CORR).unwrap();
        assert_relative_eq!(corr[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(corr[1], -1.0, epsilon = 1e-12);

        let years: Vec<&str> = out.yearly.iter().map(|y| y.trade_year.as_str()).collect();
        assert_eq!(years, vec!["2023", "2024", "ALL"]);
        assert_relative_eq!(out.yearly[2].corr, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separate_panels_join_on_keys() {
        let p = panel();
        let right = Panel::new(
            df! {
                "trade_date" => ["20231229", "20231229"],
                "instrument" => ["AL", "ZN"],
                "Z" => [5.0, 1.0],
            }
            .unwrap(),
        );
        let out = factor_correlation(&p, "X", &right, "Z").unwrap();
        assert_eq!(out.daily.len(), 1);
        assert_relative_eq!(out.daily.floats(CORR).unwrap()[0], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_same_factor_rejected() {
        let p = panel();
        let err = factor_correlation(&p, "X", &p, "X").unwrap_err();
        assert!(err.is_config());
    }
}
