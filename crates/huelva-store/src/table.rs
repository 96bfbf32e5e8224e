//! SQLite-backed append-only table.

use crate::error::{StoreError, StoreResult};
use crate::schema::{ColumnDef, SqlType, TableSchema};
use huelva_traits::{Result, TabularStore, TradeDate};
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use std::path::Path;

/// A [`TabularStore`] persisted in one SQLite table.
///
/// Every worker opens its own `SqliteTable`; connections are never shared
/// across threads.
#[derive(Debug)]
pub struct SqliteTable {
    conn: Connection,
    schema: TableSchema,
}

impl SqliteTable {
    /// Opens (creating if needed) the table inside the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P, schema: TableSchema) -> StoreResult<Self> {
        if let Some(dir) = path.as_ref().parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Schema(format!("{}: {e}", dir.display())))?;
        }
        let conn = Connection::open(path.as_ref())?;
        let table = Self { conn, schema };
        table.initialize_schema()?;
        tracing::debug!(path = %path.as_ref().display(), table = %table.schema.name, "opened table");
        Ok(table)
    }

    /// Opens an existing table without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P, schema: TableSchema) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn, schema })
    }

    /// Create an in-memory table (useful for testing).
    pub fn in_memory(schema: TableSchema) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let table = Self { conn, schema };
        table.initialize_schema()?;
        Ok(table)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        self.conn.execute(&self.schema.create_sql(), [])?;
        Ok(())
    }

    /// The table layout.
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Number of persisted rows.
    pub fn count(&self) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.schema.name);
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn read(&self, begin: &str, stop: &str, fields: &[&str]) -> StoreResult<DataFrame> {
        let defs = fields
            .iter()
            .map(|f| {
                self.schema.column(f).cloned().ok_or_else(|| {
                    StoreError::Schema(format!("table {} has no column {f}", self.schema.name))
                })
            })
            .collect::<StoreResult<Vec<ColumnDef>>>()?;
        let types: Vec<Option<SqlType>> = defs.iter().map(|d| Some(d.ty)).collect();
        query_frame(
            &self.conn,
            &self.schema.select_sql(fields),
            begin,
            stop,
            fields,
            &types,
        )
    }

    fn write(&self, panel: &DataFrame) -> StoreResult<usize> {
        let defs: Vec<&ColumnDef> = self.schema.keys.iter().chain(&self.schema.values).collect();
        let columns = defs
            .iter()
            .map(|d| column_values(panel, d))
            .collect::<StoreResult<Vec<Vec<Value>>>>()?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&self.schema.insert_sql())?;
            for i in 0..panel.height() {
                stmt.execute(params_from_iter(columns.iter().map(|c| &c[i])))?;
            }
        }
        tx.commit()?;
        Ok(panel.height())
    }
}

/// Extracts a frame column as SQLite values; non-finite floats become `NULL`.
fn column_values(df: &DataFrame, def: &ColumnDef) -> StoreResult<Vec<Value>> {
    let column = df
        .column(&def.name)
        .map_err(|_| StoreError::Schema(format!("frame lacks column {}", def.name)))?;
    let series = column.as_materialized_series();
    let values = match def.ty {
        SqlType::Text => {
            let casted = series.cast(&DataType::String)?;
            casted
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                .collect()
        }
        SqlType::Real => {
            let casted = series.cast(&DataType::Float64)?;
            casted
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if x.is_finite() => Value::Real(x),
                    _ => Value::Null,
                })
                .collect()
        }
        SqlType::Integer => {
            let casted = series.cast(&DataType::Int64)?;
            casted
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Integer))
                .collect()
        }
    };
    Ok(values)
}

fn infer_type(values: &[Value]) -> SqlType {
    if values.iter().any(|v| matches!(v, Value::Text(_))) {
        SqlType::Text
    } else {
        SqlType::Real
    }
}

/// Runs a `[begin, stop)` range query and builds a frame.
///
/// A column without a declared type becomes text when any value is text and
/// `f64` otherwise.
pub(crate) fn query_frame(
    conn: &Connection,
    sql: &str,
    begin: &str,
    stop: &str,
    fields: &[&str],
    types: &[Option<SqlType>],
) -> StoreResult<DataFrame> {
    let mut stmt = conn.prepare(sql)?;
    let mut raw: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
    let mut rows = stmt.query(params![begin, stop])?;
    while let Some(row) = rows.next()? {
        for (i, col) in raw.iter_mut().enumerate() {
            col.push(row.get::<_, Value>(i)?);
        }
    }

    let columns: Vec<Column> = fields
        .iter()
        .zip(raw)
        .zip(types)
        .map(|((name, values), ty)| {
            let ty = ty.unwrap_or_else(|| infer_type(&values));
            let name = PlSmallStr::from(*name);
            match ty {
                SqlType::Text => {
                    let v: Vec<Option<String>> = values
                        .into_iter()
                        .map(|v| match v {
                            Value::Text(s) => Some(s),
                            Value::Integer(i) => Some(i.to_string()),
                            Value::Real(x) => Some(x.to_string()),
                            _ => None,
                        })
                        .collect();
                    Column::new(name, v)
                }
                SqlType::Real => {
                    let v: Vec<Option<f64>> = values
                        .into_iter()
                        .map(|v| match v {
                            Value::Real(x) => Some(x),
                            Value::Integer(i) => Some(i as f64),
                            _ => None,
                        })
                        .collect();
                    Column::new(name, v)
                }
                SqlType::Integer => {
                    let v: Vec<Option<i64>> = values
                        .into_iter()
                        .map(|v| match v {
                            Value::Integer(i) => Some(i),
                            Value::Real(x) => Some(x as i64),
                            _ => None,
                        })
                        .collect();
                    Column::new(name, v)
                }
            }
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

impl TabularStore for SqliteTable {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn read_by_range(
        &self,
        begin: &str,
        stop: &str,
        fields: Option<&[&str]>,
    ) -> Result<DataFrame> {
        let all = self.schema.column_names();
        let fields = fields.unwrap_or(all.as_slice());
        Ok(self.read(begin, stop, fields)?)
    }

    fn last_date(&self) -> Result<Option<TradeDate>> {
        let sql = format!(
            "SELECT MAX(\"trade_date\") FROM \"{}\"",
            self.schema.name
        );
        let last: Option<String> = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(StoreError::from)?;
        Ok(last)
    }

    fn insert(&mut self, panel: &DataFrame) -> Result<usize> {
        Ok(self.write(panel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huelva_traits::{AppendOutcome, HuelvaError, TradingCalendar, float_values, text_values};

    fn calendar() -> TradingCalendar {
        TradingCalendar::from_dates(["20240102", "20240103", "20240104", "20240105"]).unwrap()
    }

    fn signal_batch(dates: &[&str], weights: &[f64]) -> DataFrame {
        let instruments: Vec<&str> = dates.iter().map(|_| "CU").collect();
        df! {
            "trade_date" => dates,
            "instrument" => instruments,
            "weight" => weights,
        }
        .unwrap()
    }

    #[test]
    fn test_append_and_read_back() {
        let cal = calendar();
        let mut table = SqliteTable::in_memory(TableSchema::signal("S0")).unwrap();
        let outcome = table
            .append(&signal_batch(&["20240102", "20240103"], &[0.5, f64::NAN]), &cal)
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Appended { rows: 2, .. }));

        let df = table.read_by_range("20240101", "20240110", None).unwrap();
        assert_eq!(df.height(), 2);
        let weights = float_values(&df, "weight").unwrap();
        assert_eq!(weights[0], 0.5);
        assert!(weights[1].is_nan());
        assert_eq!(table.last_date().unwrap().as_deref(), Some("20240103"));
    }

    #[test]
    fn test_reappend_is_noop() {
        let cal = calendar();
        let mut table = SqliteTable::in_memory(TableSchema::signal("S0")).unwrap();
        let batch = signal_batch(&["20240102", "20240103"], &[0.1, 0.2]);
        table.append(&batch, &cal).unwrap();
        let outcome = table.append(&batch, &cal).unwrap();
        assert_eq!(outcome, AppendOutcome::AlreadyCovered);
        assert_eq!(table.count().unwrap(), 2);
    }

    #[test]
    fn test_gap_is_rejected() {
        let cal = calendar();
        let mut table = SqliteTable::in_memory(TableSchema::signal("S0")).unwrap();
        table.append(&signal_batch(&["20240102"], &[0.1]), &cal).unwrap();
        let err = table
            .append(&signal_batch(&["20240104"], &[0.1]), &cal)
            .unwrap_err();
        assert!(matches!(err, HuelvaError::Discontinuity { .. }));
    }

    #[test]
    fn test_read_selected_fields_in_key_order() {
        let cal = calendar();
        let mut table = SqliteTable::in_memory(TableSchema::signal("S0")).unwrap();
        let batch = df! {
            "trade_date" => &["20240102", "20240102", "20240103"],
            "instrument" => &["ZN", "AL", "AL"],
            "weight" => &[1.0, 2.0, 3.0],
        }
        .unwrap();
        table.append(&batch, &cal).unwrap();
        let df = table
            .read_by_range("20240102", "20240103", Some(&["trade_date", "instrument"]))
            .unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(text_values(&df, "instrument").unwrap(), vec!["AL", "ZN"]);

        let err = table.read_by_range("20240102", "20240103", Some(&["nope"]));
        assert!(err.is_err());
    }
}
