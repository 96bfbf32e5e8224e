//! On-disk layout of a project and the table plumbing shared by commands.
//!
//! ```text
//! <project>/available.db                 available
//! <project>/css.db                       css
//! <project>/covariance.db                covariance
//! <project>/test_return/<ret>.db         <ret>
//! <project>/factor/<CLASS>/<inst>.db     <CLASS>
//! <project>/qtest/<id>.db                ic, ic-va, vt, ...
//! <project>/weights/<strategy>.db        <strategy>
//! <project>/signals/<kind>/<name>.db     <name>
//! <project>/reports/<kind>/<id>.{csv,json}
//! ```

use crate::config::ProjectConfig;
use anyhow::Context;
use huelva::factors::{FactorCatalog, ewa_smooth, intersect_available};
use huelva::store::{SqliteSource, SqliteTable, TableSchema};
use huelva::traits::{
    AppendOutcome, Calendar, HuelvaError, Instrument, Panel, Result, TabularStore,
    TradingCalendar, columns, sort_frame, stack_frames,
};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Signal tables kept apart by producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    Factors,
    Strategies,
    Portfolios,
}

impl SignalKind {
    const fn dir(&self) -> &'static str {
        match self {
            Self::Factors => "factors",
            Self::Strategies => "strategies",
            Self::Portfolios => "portfolios",
        }
    }
}

/// Everything a command needs: the validated configuration, the factor
/// catalog, the calendar and the market data source.
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) config: ProjectConfig,
    pub(crate) catalog: FactorCatalog,
    pub(crate) calendar: TradingCalendar,
    pub(crate) source: SqliteSource,
}

/// A project shared by concurrent units.
pub(crate) type SharedProject = Arc<Project>;

impl Project {
    /// Validates `config`, then loads the calendar.
    pub(crate) fn open(config: ProjectConfig) -> anyhow::Result<Self> {
        let catalog = config.validate().context("invalid project configuration")?;
        let calendar = TradingCalendar::from_csv(&config.paths.calendar).with_context(|| {
            format!("failed to load calendar {}", config.paths.calendar.display())
        })?;
        let source = SqliteSource::new(&config.paths.market_data);
        info!(
            instruments = config.universe.len(),
            factor_groups = catalog.len(),
            strategies = config.strategies.len(),
            sessions = calendar.dates().len(),
            "project loaded"
        );
        Ok(Self {
            config,
            catalog,
            calendar,
            source,
        })
    }

    /// The configured instruments in order.
    pub(crate) fn universe(&self) -> Vec<Instrument> {
        self.config.universe.keys().cloned().collect()
    }

    fn root(&self) -> &Path {
        &self.config.paths.project
    }

    /// Path of a database file under the project root.
    pub(crate) fn db_path(&self, parts: &[&str]) -> PathBuf {
        let mut path = self.root().to_path_buf();
        for part in parts {
            path.push(part);
        }
        path.set_extension("db");
        path
    }

    /// Directory of the reports of one test kind.
    pub(crate) fn report_dir(&self, kind: &str) -> PathBuf {
        self.root().join("reports").join(kind)
    }

    /// Opens a table for writing, creating parent directories.
    pub(crate) fn open_table(&self, path: &Path, schema: TableSchema) -> Result<SqliteTable> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(SqliteTable::open(path, schema)?)
    }

    /// Reads `[begin, stop)` of an existing table.
    pub(crate) fn read_table(
        &self,
        path: &Path,
        schema: TableSchema,
        begin: &str,
        stop: &str,
    ) -> Result<Panel> {
        let table = SqliteTable::open_read_only(path, schema)?;
        let df = table.read_by_range(begin, stop, None)?;
        debug!(path = %path.display(), rows = df.height(), begin, stop, "table read");
        Ok(Panel::new(df))
    }

    /// Reads `fields` of `[begin, stop)` of an existing table.
    pub(crate) fn read_columns(
        &self,
        path: &Path,
        schema: TableSchema,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<Panel> {
        let table = SqliteTable::open_read_only(path, schema)?;
        Ok(Panel::new(table.read_by_range(begin, stop, Some(fields))?))
    }

    /// Appends a panel with the continuity check.
    pub(crate) fn append(
        &self,
        path: &Path,
        schema: TableSchema,
        panel: &Panel,
    ) -> Result<AppendOutcome> {
        let mut table = self.open_table(path, schema)?;
        table.append(panel.data(), &self.calendar)
    }

    pub(crate) fn available_path(&self) -> PathBuf {
        self.db_path(&["available"])
    }

    pub(crate) fn css_path(&self) -> PathBuf {
        self.db_path(&["css"])
    }

    pub(crate) fn covariance_path(&self) -> PathBuf {
        self.db_path(&["covariance"])
    }

    pub(crate) fn test_return_path(&self, ret: &str) -> PathBuf {
        self.db_path(&["test_return", ret])
    }

    pub(crate) fn factor_path(&self, factor_class: &str, instrument: &str) -> PathBuf {
        self.db_path(&["factor", factor_class, instrument])
    }

    pub(crate) fn qtest_path(&self, id: &str) -> PathBuf {
        self.db_path(&["qtest", id])
    }

    pub(crate) fn weights_path(&self, strategy: &str) -> PathBuf {
        self.db_path(&["weights", strategy])
    }

    pub(crate) fn signal_path(&self, kind: SignalKind, name: &str) -> PathBuf {
        self.db_path(&["signals", kind.dir(), name])
    }

    /// The available panel over `[begin, stop)`.
    pub(crate) fn read_available(&self, begin: &str, stop: &str) -> Result<Panel> {
        self.read_table(&self.available_path(), TableSchema::availability(), begin, stop)
    }

    /// The css panel over `[begin, stop)`.
    pub(crate) fn read_css(&self, begin: &str, stop: &str) -> Result<Panel> {
        self.read_table(
            &self.css_path(),
            TableSchema::cross_section(&self.config.css.sectors),
            begin,
            stop,
        )
    }

    /// Long-form covariances over `[begin, stop)`.
    pub(crate) fn read_covariance(&self, begin: &str, stop: &str) -> Result<Panel> {
        self.read_table(&self.covariance_path(), TableSchema::covariance(), begin, stop)
    }

    /// A family's factors over `[begin, stop)`, stacked across instruments.
    ///
    /// Instruments without a factor table are skipped.
    pub(crate) fn read_factors(&self, factor_class: &str, begin: &str, stop: &str) -> Result<Panel> {
        let names = self.catalog.get_by_label(factor_class)?.factor_names();
        let mut fields = vec![columns::TRADE_DATE, columns::INSTRUMENT];
        fields.extend(names.iter().map(String::as_str));
        let mut frames = Vec::new();
        for instrument in self.config.universe.keys() {
            let path = self.factor_path(factor_class, instrument);
            if !path.exists() {
                debug!(factor_class, %instrument, "no factor table");
                continue;
            }
            let table = SqliteTable::open_read_only(
                &path,
                TableSchema::factor_by_instrument(factor_class, &names),
            )?;
            frames.push(table.read_by_range(begin, stop, Some(&fields))?);
        }
        if frames.is_empty() {
            return Ok(Panel::new(DataFrame::empty()));
        }
        Ok(Panel::new(sort_frame(
            &stack_frames(frames)?,
            &[columns::TRADE_DATE, columns::INSTRUMENT],
        )?))
    }

    /// A family's factors restricted to the available universe and smoothed
    /// with the family's decay, over `[begin, stop)`.
    ///
    /// Loading starts `decay` sessions earlier so the first dates are
    /// smoothed over a full window.
    pub(crate) fn read_available_factors(
        &self,
        factor_class: &str,
        begin: &str,
        stop: &str,
    ) -> Result<Panel> {
        let names = self.catalog.get_by_label(factor_class)?.factor_names();
        let decay = self.config.decay_of(factor_class);
        let load = self.back(begin, decay)?;
        let available = self.read_available(&load, stop)?;
        let raw = self.read_factors(factor_class, &load, stop)?;
        if raw.is_empty() {
            return Err(HuelvaError::DataContract(format!(
                "no {factor_class} factors in [{load}, {stop})"
            )));
        }
        let smoothed = ewa_smooth(&intersect_available(&raw, &available)?, &names, decay)?;
        smoothed.between(begin, stop)
    }

    /// Splits a stacked factor panel and appends each instrument's rows to
    /// its own table.
    pub(crate) fn write_factors(&self, factor_class: &str, panel: &Panel) -> Result<usize> {
        let names = self.catalog.get_by_label(factor_class)?.factor_names();
        let mut written = 0;
        let instruments: BTreeSet<Instrument> = panel.instruments()?.into_iter().collect();
        for instrument in instruments {
            let rows = panel
                .data()
                .clone()
                .lazy()
                .filter(col(columns::INSTRUMENT).eq(lit(instrument.as_str())))
                .collect()?;
            let outcome = self.append(
                &self.factor_path(factor_class, &instrument),
                TableSchema::factor_by_instrument(factor_class, &names),
                &Panel::new(rows),
            )?;
            written += rows_written(&outcome);
        }
        Ok(written)
    }

    /// The trading date `sessions` sessions before `date`.
    pub(crate) fn back(&self, date: &str, sessions: usize) -> Result<String> {
        self.calendar.next_date(date, -(sessions as i64))
    }
}

/// Rows an append wrote.
pub(crate) const fn rows_written(outcome: &AppendOutcome) -> usize {
    match outcome {
        AppendOutcome::Appended { rows, .. } => *rows,
        AppendOutcome::AlreadyCovered | AppendOutcome::Empty => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(root: &str) -> Project {
        let config = ProjectConfig::from_toml(&format!(
            r#"
[paths]
calendar = "calendar.csv"
market_data = "market"
project = "{root}"

[universe.AL]
sector_l0 = "industrial"
sector_l1 = "metal"
"#
        ))
        .unwrap();
        let catalog = config.validate().unwrap();
        Project {
            config,
            catalog,
            calendar: TradingCalendar::from_dates(["20240102", "20240103", "20240104"]).unwrap(),
            source: SqliteSource::new("market"),
        }
    }

    #[test]
    fn test_layout() {
        let p = project("out");
        assert_eq!(p.available_path(), PathBuf::from("out/available.db"));
        assert_eq!(
            p.test_return_path("Opn010L1"),
            PathBuf::from("out/test_return/Opn010L1.db")
        );
        assert_eq!(p.factor_path("KURT", "AL"), PathBuf::from("out/factor/KURT/AL.db"));
        assert_eq!(
            p.qtest_path("KURT-Opn010L1-3"),
            PathBuf::from("out/qtest/KURT-Opn010L1-3.db")
        );
        assert_eq!(
            p.signal_path(SignalKind::Strategies, "S1"),
            PathBuf::from("out/signals/strategies/S1.db")
        );
        assert_eq!(p.report_dir("ic"), PathBuf::from("out/reports/ic"));
        assert_eq!(p.back("20240104", 2).unwrap(), "20240102");
    }

    #[test]
    fn test_append_then_read() {
        let root = std::env::temp_dir().join(format!("huelva-cli-{}", std::process::id()));
        let p = project(&root.display().to_string());
        let panel = Panel::new(
            df! {
                "trade_date" => ["20240102", "20240103"],
                "instrument" => ["AL", "AL"],
                "weight" => [0.5, -0.5],
            }
            .unwrap(),
        );
        let path = p.signal_path(SignalKind::Portfolios, "P1");
        let outcome = p.append(&path, TableSchema::signal("P1"), &panel).unwrap();
        assert_eq!(rows_written(&outcome), 2);
        let again = p.append(&path, TableSchema::signal("P1"), &panel).unwrap();
        assert_eq!(again, AppendOutcome::AlreadyCovered);
        let back = p
            .read_table(&path, TableSchema::signal("P1"), "20240103", "20240105")
            .unwrap();
        assert_eq!(back.len(), 1);
        std::fs::remove_dir_all(&root).unwrap();
    }
}
