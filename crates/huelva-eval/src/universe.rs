//! The available universe.
//!
//! An instrument is tradable on a date when its trailing mean turnover clears
//! a threshold. Available rows carry the day's return, turnover, a trailing
//! volatility and the instrument's sector tags; every later stage is
//! restricted to them.

use huelva_math::rolling;
use huelva_traits::{
    Calendar, HuelvaError, Instrument, InstrumentInfo, MarketDataSource, Panel, Result, TradeDate,
    columns, float_values, frame_from_parts, group_indices, sort_frame, stack_frames,
    text_column, text_values,
};
use ndarray::Array2;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Rolling windows and threshold of the available universe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Window of the trailing mean turnover.
    pub win: usize,
    /// Minimum trailing mean turnover.
    pub amount_threshold: f64,
    /// Window of the trailing volatility.
    pub win_vol: usize,
    /// Minimum observations of the trailing volatility.
    pub win_vol_min: usize,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            win: 20,
            amount_threshold: 5e3,
            win_vol: 60,
            win_vol_min: 30,
        }
    }
}

impl UniverseConfig {
    /// Sessions loaded before `begin` so every window is filled.
    #[must_use]
    pub fn buffer_win(&self) -> usize {
        self.win.max(self.win_vol).max(self.win_vol_min)
    }
}

/// Builds the available panel of a configured universe.
#[derive(Debug, Clone)]
pub struct AvailableUniverse {
    config: UniverseConfig,
    instruments: BTreeMap<Instrument, InstrumentInfo>,
}

impl AvailableUniverse {
    /// Creates the builder for `instruments`.
    pub fn new(config: UniverseConfig, instruments: BTreeMap<Instrument, InstrumentInfo>) -> Self {
        Self {
            config,
            instruments,
        }
    }

    /// The configured instruments.
    pub fn instruments(&self) -> Vec<Instrument> {
        self.instruments.keys().cloned().collect()
    }

    /// One instrument's available rows in `[begin, stop)`.
    pub fn compute_instrument(
        &self,
        instrument: &str,
        info: &InstrumentInfo,
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
        source: &dyn MarketDataSource,
    ) -> Result<DataFrame> {
        let cfg = &self.config;
        let buffer = calendar.next_date(begin, -(cfg.buffer_win() as i64))?;
        let bars = source.load_preprocess(
            instrument,
            &buffer,
            stop,
            &[columns::TRADE_DATE, "return_c_major", "amount_major"],
        )?;
        let dates = text_values(&bars, columns::TRADE_DATE)?;
        let ret = float_values(&bars, "return_c_major")?;
        let amount = float_values(&bars, "amount_major")?;
        let amount_ma = rolling::mean(&amount, cfg.win, cfg.win);
        let volatility = rolling::std(&ret, cfg.win_vol, cfg.win_vol_min);

        let keep: Vec<usize> = (0..dates.len())
            .filter(|&i| dates[i].as_str() >= begin && amount_ma[i] >= cfg.amount_threshold)
            .collect();
        let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
        let n = keep.len();
        let mut df = frame_from_parts(
            vec![
                (columns::TRADE_DATE, keep.iter().map(|&i| dates[i].clone()).collect()),
                (columns::INSTRUMENT, vec![instrument.to_string(); n]),
            ],
            &[
                (columns::RETURN.to_string(), pick(&ret)),
                (columns::AMOUNT.to_string(), pick(&amount)),
                (columns::VOLATILITY.to_string(), pick(&volatility)),
            ],
        )?;
        df.with_column(text_column(columns::SECTOR_L0, &vec![info.sector_l0.clone(); n]))?;
        df.with_column(text_column(columns::SECTOR_L1, &vec![info.sector_l1.clone(); n]))?;
        Ok(df)
    }

    /// The available panel over `[begin, stop)`, sorted by
    /// `(trade_date, instrument)`.
    pub fn compute(
        &self,
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
        source: &dyn MarketDataSource,
    ) -> Result<Panel> {
        let frames: Vec<DataFrame> = self
            .instruments
            .par_iter()
            .map(|(instrument, info)| {
                self.compute_instrument(instrument, info, begin, stop, calendar, source)
                    .map_err(|e| HuelvaError::for_instrument(instrument.as_str(), e))
            })
            .collect::<Result<_>>()?;
        let panel = sort_frame(
            &stack_frames(frames)?,
            &[columns::TRADE_DATE, columns::INSTRUMENT],
        )?;
        info!(
            instruments = self.instruments.len(),
            rows = panel.height(),
            begin,
            stop,
            "available universe computed"
        );
        Ok(Panel::new(panel))
    }
}

/// Daily returns of an available panel pivoted to dates × instruments.
///
/// Missing returns are 0; `members` lists the instruments available on each
/// date.
#[derive(Debug, Clone)]
pub struct ReturnGrid {
    /// Row labels, ascending.
    pub dates: Vec<TradeDate>,
    /// Column labels, ascending.
    pub instruments: Vec<Instrument>,
    /// `dates × instruments` returns.
    pub values: Array2<f64>,
    /// Column positions available on each date, ascending.
    pub members: Vec<Vec<usize>>,
}

impl ReturnGrid {
    /// Pivots the `return` column of an available panel.
    pub fn from_available(available: &Panel) -> Result<Self> {
        let df = available.data();
        let dates = available.dates()?;
        let names = available.instruments()?;
        let ret = float_values(df, columns::RETURN)?;

        let instruments: Vec<Instrument> = group_indices(&names).into_keys().collect();
        let col_of: BTreeMap<&str, usize> = instruments
            .iter()
            .enumerate()
            .map(|(j, s)| (s.as_str(), j))
            .collect();
        let by_date = group_indices(&dates);
        let mut values = Array2::<f64>::zeros((by_date.len(), instruments.len()));
        let mut members = Vec::with_capacity(by_date.len());
        for (i, rows) in by_date.values().enumerate() {
            let mut cols = Vec::with_capacity(rows.len());
            for &r in rows {
                let j = col_of[names[r].as_str()];
                if ret[r].is_finite() {
                    values[[i, j]] = ret[r];
                }
                cols.push(j);
            }
            cols.sort_unstable();
            cols.dedup();
            members.push(cols);
        }
        Ok(Self {
            dates: by_date.into_keys().collect(),
            instruments,
            values,
            members,
        })
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the grid has no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
