//! Read-only market data over per-instrument SQLite files.
//!
//! Layout under the market data root:
//!
//! ```text
//! preprocess/<instrument>.db   table "preprocess"
//! minute_bar/<instrument>.db   table "minute_bar"
//! position/<instrument>.db     table "position"
//! market_index.db              table "market_index"
//! ```

use crate::error::{StoreError, StoreResult};
use crate::table::query_frame;
use huelva_traits::{HuelvaError, MINUTE_BAR_COLUMNS, MarketDataSource, Result, columns};
use polars::prelude::*;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Kinds of raw market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketTable {
    /// Preprocessed daily major/minor bars.
    Preprocess,
    /// Minute bars of the major contract.
    MinuteBar,
    /// Member position reports.
    Position,
    /// Market and sector index series.
    MarketIndex,
}

impl MarketTable {
    /// Table name inside the database file.
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::MinuteBar => "minute_bar",
            Self::Position => "position",
            Self::MarketIndex => "market_index",
        }
    }

    const fn order_by(&self) -> &'static str {
        match self {
            Self::MinuteBar => "\"trade_date\", \"timestamp\"",
            _ => "\"trade_date\"",
        }
    }
}

/// A [`MarketDataSource`] reading the SQLite layout described above.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    root: PathBuf,
}

impl SqliteSource {
    /// Creates a source rooted at the market data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Database file of `kind` for `instrument`.
    pub fn db_path(&self, kind: MarketTable, instrument: &str) -> PathBuf {
        match kind {
            MarketTable::MarketIndex => self.root.join("market_index.db"),
            other => self.root.join(other.table()).join(format!("{instrument}.db")),
        }
    }

    fn connect(path: &Path) -> StoreResult<Connection> {
        Ok(Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    fn load(
        &self,
        kind: MarketTable,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        let path = self.db_path(kind, instrument);
        if !path.exists() {
            return Err(HuelvaError::DataContract(format!(
                "no {} data for {instrument} at {}",
                kind.table(),
                path.display()
            )));
        }
        let conn = Self::connect(&path)?;
        let cols: Vec<String> = fields.iter().map(|f| format!("\"{f}\"")).collect();
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{td}\" >= ?1 AND \"{td}\" < ?2 ORDER BY {}",
            cols.join(", "),
            kind.table(),
            kind.order_by(),
            td = columns::TRADE_DATE,
        );
        let types = vec![None; fields.len()];
        let df = query_frame(&conn, &sql, begin, stop, fields, &types).map_err(|e| match e {
            StoreError::Database(err) => HuelvaError::DataContract(format!(
                "{} of {instrument}: {err}",
                kind.table()
            )),
            other => HuelvaError::from(other),
        })?;
        tracing::debug!(
            instrument,
            table = kind.table(),
            rows = df.height(),
            "loaded market data"
        );
        Ok(df)
    }
}

impl MarketDataSource for SqliteSource {
    fn load_preprocess(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        self.load(MarketTable::Preprocess, instrument, begin, stop, fields)
    }

    fn load_minute_bar(&self, instrument: &str, begin: &str, stop: &str) -> Result<DataFrame> {
        self.load(
            MarketTable::MinuteBar,
            instrument,
            begin,
            stop,
            &MINUTE_BAR_COLUMNS,
        )
    }

    fn load_position(
        &self,
        instrument: &str,
        begin: &str,
        stop: &str,
        fields: &[&str],
    ) -> Result<DataFrame> {
        self.load(MarketTable::Position, instrument, begin, stop, fields)
    }

    fn load_market_index(&self, begin: &str, stop: &str, fields: &[&str]) -> Result<DataFrame> {
        self.load(MarketTable::MarketIndex, "", begin, stop, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huelva_traits::{float_values, text_values};

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("huelva-store-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("preprocess")).unwrap();
        dir
    }

    #[test]
    fn test_load_preprocess_infers_column_types() {
        let root = scratch_dir("preprocess");
        let conn = Connection::open(root.join("preprocess").join("CU.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE preprocess (trade_date TEXT, ticker_major TEXT, close_major REAL, vol_major INTEGER);
             INSERT INTO preprocess VALUES ('20240103', 'CU2402', 70010.0, 12);
             INSERT INTO preprocess VALUES ('20240102', 'CU2402', 70000.0, NULL);
             INSERT INTO preprocess VALUES ('20240104', 'CU2403', 70100.0, 15);",
        )
        .unwrap();
        drop(conn);

        let source = SqliteSource::new(&root);
        let df = source
            .load_preprocess(
                "CU",
                "20240102",
                "20240104",
                &["trade_date", "ticker_major", "vol_major"],
            )
            .unwrap();
        assert_eq!(text_values(&df, "trade_date").unwrap(), vec!["20240102", "20240103"]);
        assert_eq!(text_values(&df, "ticker_major").unwrap(), vec!["CU2402", "CU2402"]);
        let vol = float_values(&df, "vol_major").unwrap();
        assert!(vol[0].is_nan());
        assert_eq!(vol[1], 12.0);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_instrument_is_data_contract_error() {
        let root = scratch_dir("missing");
        let source = SqliteSource::new(&root);
        let err = source
            .load_preprocess("ZZ", "20240102", "20240104", &["trade_date"])
            .unwrap_err();
        assert!(matches!(err, HuelvaError::DataContract(_)));
        let _ = std::fs::remove_dir_all(&root);
    }
}
