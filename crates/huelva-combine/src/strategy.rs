//! Instrument weights of a strategy.
//!
//! Factor signals are smoothed per instrument over the strategy's holding
//! window, combined with the optimized factor weights of the day and
//! normalized to unit gross exposure. The short leg is then rescaled to the
//! long leg's risk and the whole cross section multiplied by the day's
//! throttle.

use crate::tilt::covariance_tilt;
use huelva_eval::CovarianceBook;
use huelva_math::rolling;
use huelva_traits::{
    Calendar, HuelvaError, Instrument, Panel, Result, Strategy, TradeDate, columns, float_values,
    frame_from_parts, group_indices, text_values,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Factor signals of a strategy on the union of their rows.
///
/// Rows are sorted by `(trade_date, instrument)`; a factor without a value
/// on a row counts as 0.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    keys: Vec<(TradeDate, Instrument)>,
    values: Vec<Vec<f64>>,
}

impl SignalTable {
    /// Gathers `names`, each read from the first panel that has it.
    ///
    /// # Errors
    ///
    /// [`HuelvaError::MissingColumn`] when no panel carries a factor.
    pub fn from_panels(names: &[String], panels: &[&Panel]) -> Result<Self> {
        let mut rows: BTreeMap<(TradeDate, Instrument), Vec<f64>> = BTreeMap::new();
        for (j, name) in names.iter().enumerate() {
            let panel = panels
                .iter()
                .find(|p| p.has_column(name))
                .ok_or_else(|| HuelvaError::MissingColumn(name.clone()))?;
            let dates = panel.dates()?;
            let instruments = panel.instruments()?;
            let values = panel.floats(name)?;
            for ((d, i), v) in dates.into_iter().zip(instruments).zip(values) {
                let row = rows.entry((d, i)).or_insert_with(|| vec![0.0; names.len()]);
                row[j] = if v.is_nan() { 0.0 } else { v };
            }
        }
        let mut values = vec![Vec::with_capacity(rows.len()); names.len()];
        let mut keys = Vec::with_capacity(rows.len());
        for (key, row) in rows {
            keys.push(key);
            for (col, v) in values.iter_mut().zip(row) {
                col.push(v);
            }
        }
        Ok(Self { keys, values })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(trade_date, instrument)` of every row.
    pub fn keys(&self) -> &[(TradeDate, Instrument)] {
        &self.keys
    }

    /// Per-instrument trailing mean of every factor over `win` rows.
    pub fn moving_average(&self, win: usize) -> Vec<Vec<f64>> {
        let instruments: Vec<String> = self.keys.iter().map(|(_, i)| i.clone()).collect();
        let groups = group_indices(&instruments);
        self.values
            .iter()
            .map(|col| {
                let mut out = vec![f64::NAN; col.len()];
                for rows in groups.values() {
                    let series: Vec<f64> = rows.iter().map(|&r| col[r]).collect();
                    for (&r, v) in rows.iter().zip(rolling::mean(&series, win, win)) {
                        out[r] = v;
                    }
                }
                out
            })
            .collect()
    }
}

/// Builds the instrument weights of one strategy.
#[derive(Debug, Clone)]
pub struct StrategySignals {
    strategy: Strategy,
}

impl StrategySignals {
    /// Creates the builder after validating `strategy`.
    pub fn new(strategy: Strategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    /// The strategy.
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// First date of factor signals needed for an output starting at `begin`.
    pub fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        calendar.next_date(begin, -(self.strategy.ret.win as i64) + 1)
    }

    /// Smoothed signals times the day's factor weights, summed per instrument
    /// and normalized to `Σ|w| = 1` per date, for dates `>= begin`.
    ///
    /// `weights` has `trade_date` and one column per strategy factor. Dates
    /// without any exposure are dropped.
    pub fn raw_weights(&self, begin: &str, table: &SignalTable, weights: &Panel) -> Result<Panel> {
        let names = self.strategy.factor_names();
        let wdates = text_values(weights.data(), columns::TRADE_DATE)?;
        let wcols: Vec<Vec<f64>> = names
            .iter()
            .map(|n| float_values(weights.data(), n))
            .collect::<Result<_>>()?;
        let by_date: BTreeMap<&str, usize> = wdates
            .iter()
            .enumerate()
            .map(|(i, d)| (d.as_str(), i))
            .collect();

        let ma = table.moving_average(self.strategy.ret.win);
        let mut combined: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        for (r, (date, instrument)) in table.keys().iter().enumerate() {
            if date.as_str() < begin {
                continue;
            }
            let sum: f64 = match by_date.get(date.as_str()) {
                Some(&i) => (0..names.len())
                    .map(|j| ma[j][r] * wcols[j][i])
                    .filter(|v| !v.is_nan())
                    .sum(),
                None => 0.0,
            };
            combined
                .entry(date.as_str())
                .or_default()
                .push((instrument.as_str(), sum));
        }

        let mut dates = Vec::new();
        let mut instruments = Vec::new();
        let mut values = Vec::new();
        let mut dropped = 0;
        for (date, rows) in combined {
            let gross: f64 = rows.iter().map(|(_, w)| w.abs()).sum();
            if gross <= 0.0 {
                dropped += 1;
                continue;
            }
            for (instrument, w) in rows {
                dates.push(date.to_string());
                instruments.push(instrument.to_string());
                values.push(w / gross);
            }
        }
        if dropped > 0 {
            warn!(strategy = %self.strategy.name, dates = dropped, "dates without exposure dropped");
        }
        signal_frame(dates, instruments, values)
    }

    /// Applies [`covariance_tilt`] per date; dates without covariances are
    /// kept as they are.
    pub fn tilt(&self, raw: &Panel, book: &CovarianceBook) -> Result<Panel> {
        let dates = raw.dates()?;
        let instruments = raw.instruments()?;
        let mut weights = raw.floats(columns::WEIGHT)?;
        let mut missing = 0;
        for (date, rows) in group_indices(&dates) {
            let names: Vec<String> = rows.iter().map(|&r| instruments[r].clone()).collect();
            let Some(cov) = book.matrix(&date, &names) else {
                missing += 1;
                continue;
            };
            let w: Vec<f64> = rows.iter().map(|&r| weights[r]).collect();
            for (&r, v) in rows.iter().zip(covariance_tilt(&names, &w, &cov)) {
                weights[r] = v;
            }
        }
        if missing > 0 {
            warn!(strategy = %self.strategy.name, dates = missing, "no covariance, tilt skipped");
        }
        signal_frame(dates, instruments, weights)
    }

    /// Full pipeline: raw weights, covariance tilt and throttle.
    pub fn run(
        &self,
        begin: &str,
        table: &SignalTable,
        weights: &Panel,
        book: &CovarianceBook,
        css: &Panel,
    ) -> Result<Panel> {
        let raw = self.raw_weights(begin, table, weights)?;
        let tilted = self.tilt(&raw, book)?;
        let out = apply_throttle(&tilted, css)?;
        info!(
            strategy = %self.strategy.name,
            rows = out.len(),
            begin,
            "strategy signals computed"
        );
        Ok(out)
    }
}

/// Multiplies each weight by its date's `tot_wgt`; dates absent from `css`
/// get `NaN` weights.
pub fn apply_throttle(signals: &Panel, css: &Panel) -> Result<Panel> {
    let throttle: BTreeMap<String, f64> = css
        .dates()?
        .into_iter()
        .zip(css.floats(columns::TOT_WGT)?)
        .collect();
    let dates = signals.dates()?;
    let weights = signals.floats(columns::WEIGHT)?;
    let scaled: Vec<f64> = dates
        .iter()
        .zip(&weights)
        .map(|(d, w)| throttle.get(d).map_or(f64::NAN, |t| w * t))
        .collect();
    let unmatched = dates.iter().filter(|d| !throttle.contains_key(*d)).count();
    if unmatched > 0 {
        warn!(rows = unmatched, "no throttle for rows, weights left missing");
    }
    signal_frame(dates, signals.instruments()?, scaled)
}

pub(crate) fn signal_frame(
    dates: Vec<TradeDate>,
    instruments: Vec<Instrument>,
    weights: Vec<f64>,
) -> Result<Panel> {
    Ok(Panel::new(frame_from_parts(
        vec![
            (columns::TRADE_DATE, dates),
            (columns::INSTRUMENT, instruments),
        ],
        &[(columns::WEIGHT.to_string(), weights)],
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use huelva_traits::{FactorId, TradingCalendar};
    use polars::prelude::*;

    fn strategy() -> Strategy {
        Strategy {
            name: "S1".to_string(),
            ret: "Opn002L1".parse().unwrap(),
            factors: vec![FactorId::new("A", "A1"), FactorId::new("B", "B1")],
            opt_win: 5,
        }
    }

    fn signals_a() -> Panel {
        Panel::new(
            df! {
                "trade_date" => ["20240102", "20240102", "20240103", "20240103", "20240104", "20240104"],
                "instrument" => ["AL", "CU", "AL", "CU", "AL", "CU"],
                "A1" => [0.5, -0.5, 0.5, -0.5, -0.5, 0.5],
            }
            .unwrap(),
        )
    }

    fn signals_b() -> Panel {
        // B1 has no row for CU on the 4th and a missing value for AL on the 3rd.
        Panel::new(
            df! {
                "trade_date" => ["20240102", "20240102", "20240103", "20240103", "20240104"],
                "instrument" => ["AL", "CU", "AL", "CU", "AL"],
                "B1" => [Some(-0.5), Some(0.5), None, Some(0.5), Some(0.5)],
            }
            .unwrap(),
        )
    }

    fn table() -> SignalTable {
        let names = vec!["A1".to_string(), "B1".to_string()];
        SignalTable::from_panels(&names, &[&signals_a(), &signals_b()]).unwrap()
    }

    fn weights() -> Panel {
        Panel::new(
            df! {
                "trade_date" => ["20240103", "20240104"],
                "A1" => [0.75, 0.75],
                "B1" => [0.25, 0.25],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_table_zero_fills() {
        let t = table();
        assert_eq!(t.len(), 6);
        assert_eq!(t.keys()[5], ("20240104".to_string(), "CU".to_string()));
        let ma = t.moving_average(2);
        // AL B1 over [0.0 (3rd, missing), 0.5 (4th)].
        assert_relative_eq!(ma[1][4], 0.25);
        assert!(ma[0][0].is_nan());
        // CU B1 over [0.5, 0.0].
        assert_relative_eq!(ma[1][5], 0.25);
    }

    #[test]
    fn test_raw_weights_normalized() {
        let s = StrategySignals::new(strategy()).unwrap();
        let raw = s.raw_weights("20240103", &table(), &weights()).unwrap();
        assert_eq!(raw.columns(), vec!["trade_date", "instrument", "weight"]);
        assert_eq!(raw.len(), 4);
        let w = raw.floats("weight").unwrap();
        // 3rd: AL = 0.75*0.5 + 0.25*(-0.25), CU = 0.75*(-0.5) + 0.25*0.5.
        assert_relative_eq!(w[0], 0.3125 / 0.5625, epsilon = 1e-12);
        assert_relative_eq!(w[1], -0.25 / 0.5625, epsilon = 1e-12);
        // 4th: only B1 contributes, equally.
        assert_relative_eq!(w[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[3], 0.5, epsilon = 1e-12);
        for date in ["20240103", "20240104"] {
            let day = raw.between(date, "20240105").unwrap();
            let gross: f64 = day.floats("weight").unwrap()[..2].iter().map(|v| v.abs()).sum();
            assert_relative_eq!(gross, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dates_without_weights_dropped() {
        let s = StrategySignals::new(strategy()).unwrap();
        let w = Panel::new(df! { "trade_date" => ["20240104"], "A1" => [1.0], "B1" => [0.0] }.unwrap());
        let raw = s.raw_weights("20240103", &table(), &w).unwrap();
        // The 4th's smoothed A1 is 0 for both instruments; the 3rd has no weights.
        assert!(raw.is_empty());
    }

    #[test]
    fn test_buffer_begin() {
        let cal = TradingCalendar::from_dates(["20240102", "20240103", "20240104"]).unwrap();
        let s = StrategySignals::new(strategy()).unwrap();
        assert_eq!(s.buffer_begin("20240104", &cal).unwrap(), "20240103");
    }

    #[test]
    fn test_throttle() {
        let s = StrategySignals::new(strategy()).unwrap();
        let raw = s.raw_weights("20240103", &table(), &weights()).unwrap();
        let css = Panel::new(df! { "trade_date" => ["20240103"], "tot_wgt" => [0.5] }.unwrap());
        let out = apply_throttle(&raw, &css).unwrap();
        let w = out.floats("weight").unwrap();
        assert_relative_eq!(w[0], 0.5 * 0.3125 / 0.5625, epsilon = 1e-12);
        assert!(w[2].is_nan());
    }

    #[test]
    fn test_run_without_covariance_keeps_raw() {
        let s = StrategySignals::new(strategy()).unwrap();
        let raw = s.raw_weights("20240103", &table(), &weights()).unwrap();
        let css = Panel::new(
            df! { "trade_date" => ["20240103", "20240104"], "tot_wgt" => [1.0, 1.0] }.unwrap(),
        );
        let out = s
            .run("20240103", &table(), &weights(), &CovarianceBook::default(), &css)
            .unwrap();
        assert_eq!(out.floats("weight").unwrap(), raw.floats("weight").unwrap());
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let mut bad = strategy();
        bad.factors.clear();
        assert!(StrategySignals::new(bad).unwrap_err().is_config());
    }
}
