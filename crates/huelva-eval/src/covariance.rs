//! Instrument covariances: estimation into long form and per-date lookup.

use crate::universe::ReturnGrid;
use huelva_math::{CovarianceMatrix, sample_covariance};
use huelva_traits::{
    Calendar, Panel, Result, TradeDate, columns, float_values, frame_from_parts, text_values,
};
use ndarray::{Axis, Slice};
use std::collections::BTreeMap;
use tracing::info;

/// First instrument of a covariance row.
pub const INSTRUMENT0: &str = "instrument0";
/// Second instrument of a covariance row.
pub const INSTRUMENT1: &str = "instrument1";
/// Covariance value column.
pub const COV: &str = "cov";

/// Trailing sample covariance of the available instruments' returns.
#[derive(Debug, Clone, Copy)]
pub struct CovarianceEstimator {
    win: usize,
}

impl Default for CovarianceEstimator {
    fn default() -> Self {
        Self::new(60)
    }
}

impl CovarianceEstimator {
    /// An estimator over `win` sessions.
    pub const fn new(win: usize) -> Self {
        Self { win }
    }

    /// The window.
    pub const fn win(&self) -> usize {
        self.win
    }

    /// First date to load for an output starting at `begin`.
    pub fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        calendar.next_date(begin, -(self.win as i64))
    }

    /// Long-form covariances of the dates `>= begin` that have a full window.
    ///
    /// For each date the instruments available that date are paired with
    /// themselves and each other once (`instrument0 <= instrument1`);
    /// missing returns count as 0.
    pub fn compute(&self, available: &Panel, begin: &str) -> Result<Panel> {
        let grid = ReturnGrid::from_available(available)?;
        let mut dates = Vec::new();
        let mut first = Vec::new();
        let mut second = Vec::new();
        let mut cov = Vec::new();
        if self.win >= 2 {
            for i in self.win - 1..grid.len() {
                if grid.dates[i].as_str() < begin {
                    continue;
                }
                let members = &grid.members[i];
                let window = grid
                    .values
                    .slice_axis(Axis(0), Slice::from(i + 1 - self.win..i + 1))
                    .select(Axis(1), members);
                let matrix = sample_covariance(window.view());
                for (a, &ja) in members.iter().enumerate() {
                    for (b, &jb) in members.iter().enumerate().skip(a) {
                        dates.push(grid.dates[i].clone());
                        first.push(grid.instruments[ja].clone());
                        second.push(grid.instruments[jb].clone());
                        cov.push(matrix[[a, b]]);
                    }
                }
            }
        }
        let out = frame_from_parts(
            vec![
                (columns::TRADE_DATE, dates),
                (INSTRUMENT0, first),
                (INSTRUMENT1, second),
            ],
            &[(COV.to_string(), cov)],
        )?;
        info!(rows = out.height(), win = self.win, begin, "covariances estimated");
        Ok(Panel::new(out))
    }
}

/// Long-form covariances grouped by date.
#[derive(Debug, Clone, Default)]
pub struct CovarianceBook {
    by_date: BTreeMap<TradeDate, Vec<(String, String, f64)>>,
}

impl CovarianceBook {
    /// Indexes a `(trade_date, instrument0, instrument1, cov)` panel.
    pub fn from_panel(panel: &Panel) -> Result<Self> {
        let df = panel.data();
        let dates = text_values(df, columns::TRADE_DATE)?;
        let a = text_values(df, INSTRUMENT0)?;
        let b = text_values(df, INSTRUMENT1)?;
        let v = float_values(df, COV)?;
        let mut by_date: BTreeMap<TradeDate, Vec<(String, String, f64)>> = BTreeMap::new();
        for (((d, a), b), v) in dates.into_iter().zip(a).zip(b).zip(v) {
            by_date.entry(d).or_default().push((a, b, v));
        }
        Ok(Self { by_date })
    }

    /// Dates with at least one covariance.
    pub fn dates(&self) -> impl Iterator<Item = &TradeDate> {
        self.by_date.keys()
    }

    /// Whether `date` has covariances.
    pub fn contains(&self, date: &str) -> bool {
        self.by_date.contains_key(date)
    }

    /// The matrix of `instruments` on `date`, `None` when the date is missing.
    pub fn matrix(&self, date: &str, instruments: &[String]) -> Option<CovarianceMatrix> {
        let rows = self.by_date.get(date)?;
        Some(CovarianceMatrix::from_long_form(
            rows.iter().map(|(a, b, v)| (a.as_str(), b.as_str(), *v)),
            instruments,
        ))
    }
}
