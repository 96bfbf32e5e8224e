//! Restriction of factor panels to the tradable universe, and time smoothing.

use huelva_math::weighted;
use huelva_traits::{
    Panel, Result, columns, float_column, float_values, group_indices, restrict_to_keys, sort_frame,
};

/// Newest-to-oldest weight ratio of the smoothing window.
pub const EWA_RATE: f64 = 0.25;

/// Keeps the factor rows whose `(trade_date, instrument)` is available.
///
/// `available` only contributes its keys; the result carries the factor
/// panel's columns sorted by `(trade_date, instrument)`.
pub fn intersect_available(factors: &Panel, available: &Panel) -> Result<Panel> {
    Ok(Panel::new(restrict_to_keys(factors.data(), available.data())?))
}

/// Replaces each named factor with its exponentially weighted trailing
/// average over `decay` of the instrument's rows.
///
/// A `decay` of 1 leaves the values unchanged.
pub fn ewa_smooth(panel: &Panel, names: &[String], decay: usize) -> Result<Panel> {
    if decay <= 1 {
        return Ok(panel.clone());
    }
    let mut df = sort_frame(panel.data(), &[columns::TRADE_DATE, columns::INSTRUMENT])?;
    let groups = group_indices(&Panel::new(df.clone()).instruments()?);
    for name in names {
        let raw = float_values(&df, name)?;
        let mut smoothed = vec![f64::NAN; raw.len()];
        for rows in groups.values() {
            let series: Vec<f64> = rows.iter().map(|i| raw[*i]).collect();
            for (i, v) in rows.iter().zip(weighted::ewa(&series, decay, EWA_RATE)) {
                smoothed[*i] = v;
            }
        }
        df.with_column(float_column(name, &smoothed))?;
    }
    Ok(Panel::new(df))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn factors() -> Panel {
        Panel::new(
            df! {
                "trade_date" => &["20240102", "20240102", "20240103", "20240103", "20240104", "20240104"],
                "instrument" => &["CU", "AL", "CU", "AL", "CU", "AL"],
                "ticker" => &["CU2402", "AL2402", "CU2402", "AL2402", "CU2402", "AL2402"],
                "X" => &[Some(1.0), Some(10.0), Some(2.0), None, Some(4.0), Some(30.0)],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_intersect_available() {
        let available = Panel::new(
            df! {
                "trade_date" => &["20240103", "20240102", "20240104"],
                "instrument" => &["CU", "AL", "AL"],
                "amount" => &[1.0, 2.0, 3.0],
            }
            .unwrap(),
        );
        let out = intersect_available(&factors(), &available).unwrap();
        assert_eq!(out.columns(), vec!["trade_date", "instrument", "ticker", "X"]);
        assert_eq!(out.dates().unwrap(), vec!["20240102", "20240103", "20240104"]);
        assert_eq!(out.instruments().unwrap(), vec!["AL", "CU", "AL"]);
        assert_eq!(out.floats("X").unwrap(), vec![10.0, 2.0, 30.0]);
    }

    #[test]
    fn test_ewa_smooth_per_instrument() {
        let out = ewa_smooth(&factors(), &["X".to_string()], 2).unwrap();
        // Sorted: (02, AL), (02, CU), (03, AL), (03, CU), (04, AL), (04, CU).
        let x = out.floats("X").unwrap();
        let w = weighted::ewa_weights(2, EWA_RATE);
        assert_relative_eq!(x[0], 10.0);
        assert_relative_eq!(x[1], 1.0);
        // The missing AL value drops out of its window.
        assert_relative_eq!(x[2], 10.0);
        assert_relative_eq!(x[3], w[0] * 1.0 + w[1] * 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[4], 30.0);
        assert_relative_eq!(x[5], w[0] * 2.0 + w[1] * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ewa_smooth_unit_decay() {
        let out = ewa_smooth(&factors(), &["X".to_string()], 1).unwrap();
        assert_eq!(out.len(), 6);
        assert!(out.floats("X").unwrap()[3].is_nan());
    }
}
