//! Append-only, date-keyed table storage.
//!
//! A table only ever grows forward in time. Every append is checked against
//! the calendar: the first incoming date must be the session right after the
//! last persisted one. Batches that are already covered become no-ops, so
//! re-running a date range is idempotent.

use crate::{Calendar, HuelvaError, Result, TradeDate, columns, sort_frame, text_values};
use polars::prelude::*;

/// Result of checking an incoming batch against the persisted data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuity {
    /// The table is empty or the batch starts right after the last date.
    Continuous,
    /// The batch starts at or before the last persisted date.
    AlreadyCovered {
        /// Last persisted date.
        last: TradeDate,
    },
    /// The batch would leave a hole in the table.
    Gap {
        /// The date the batch had to start at.
        expected: TradeDate,
        /// The date it starts at.
        incoming: TradeDate,
    },
}

impl Continuity {
    /// Numeric status: `0` continuous, `1` already covered, `2` gap.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Continuous => 0,
            Self::AlreadyCovered { .. } => 1,
            Self::Gap { .. } => 2,
        }
    }
}

/// What an [`TabularStore::append`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Rows were written, starting at `from`.
    Appended {
        /// Number of rows written.
        rows: usize,
        /// First date written.
        from: TradeDate,
    },
    /// Every date in the batch was already persisted.
    AlreadyCovered,
    /// The batch had no rows.
    Empty,
}

/// A keyed, append-only time-series table.
pub trait TabularStore: Send {
    /// Table name used in diagnostics.
    fn name(&self) -> &str;

    /// Rows with `begin <= trade_date < stop`, sorted by the table keys.
    ///
    /// `fields` selects a subset (keys must be listed explicitly); `None`
    /// returns every column.
    fn read_by_range(&self, begin: &str, stop: &str, fields: Option<&[&str]>)
    -> Result<DataFrame>;

    /// Latest persisted trade date.
    fn last_date(&self) -> Result<Option<TradeDate>>;

    /// Writes rows without any continuity check.
    fn insert(&mut self, panel: &DataFrame) -> Result<usize>;

    /// Checks whether a batch starting at `incoming` may be appended.
    fn check_continuity(&self, incoming: &str, calendar: &dyn Calendar) -> Result<Continuity> {
        let Some(last) = self.last_date()? else {
            return Ok(Continuity::Continuous);
        };
        if incoming <= last.as_str() {
            return Ok(Continuity::AlreadyCovered { last });
        }
        let expected = calendar.next_date(&last, 1)?;
        if incoming == expected {
            Ok(Continuity::Continuous)
        } else {
            Ok(Continuity::Gap {
                expected,
                incoming: incoming.to_string(),
            })
        }
    }

    /// Continuity-checked append.
    ///
    /// Only dates after the last persisted one are written; a fully covered
    /// batch is a logged no-op and a gap is [`HuelvaError::Discontinuity`].
    fn append(&mut self, panel: &DataFrame, calendar: &dyn Calendar) -> Result<AppendOutcome> {
        if panel.height() == 0 {
            return Ok(AppendOutcome::Empty);
        }
        let dates = text_values(panel, columns::TRADE_DATE)?;
        let first = dates.iter().min().cloned().unwrap_or_default();
        let batch = match self.check_continuity(&first, calendar)? {
            Continuity::Continuous => panel.clone(),
            Continuity::AlreadyCovered { last } => {
                let remaining = panel
                    .clone()
                    .lazy()
                    .filter(col(columns::TRADE_DATE).gt(lit(last.clone())))
                    .collect()?;
                if remaining.height() == 0 {
                    tracing::warn!(
                        table = self.name(),
                        first = %first,
                        last = %last,
                        "batch already covered, nothing appended"
                    );
                    return Ok(AppendOutcome::AlreadyCovered);
                }
                let rest = text_values(&remaining, columns::TRADE_DATE)?;
                let rest_first = rest.iter().min().cloned().unwrap_or_default();
                let expected = calendar.next_date(&last, 1)?;
                if rest_first != expected {
                    return Err(HuelvaError::Discontinuity {
                        table: self.name().to_string(),
                        expected,
                        incoming: rest_first,
                    });
                }
                remaining
            }
            Continuity::Gap { expected, incoming } => {
                return Err(HuelvaError::Discontinuity {
                    table: self.name().to_string(),
                    expected,
                    incoming,
                });
            }
        };
        let from = text_values(&batch, columns::TRADE_DATE)?
            .into_iter()
            .min()
            .unwrap_or_default();
        let rows = self.insert(&batch)?;
        tracing::debug!(table = self.name(), rows, from = %from, "appended rows");
        Ok(AppendOutcome::Appended { rows, from })
    }
}

/// In-memory table, mostly for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    keys: Vec<String>,
    data: Option<DataFrame>,
}

impl MemoryTable {
    /// Creates an empty table sorted by `keys` on read.
    pub fn new(name: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
            data: None,
        }
    }

    /// Creates a table pre-filled with `data`.
    pub fn with_data(name: impl Into<String>, keys: &[&str], data: DataFrame) -> Self {
        let mut table = Self::new(name, keys);
        table.data = Some(data);
        table
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, DataFrame::height)
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TabularStore for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_by_range(
        &self,
        begin: &str,
        stop: &str,
        fields: Option<&[&str]>,
    ) -> Result<DataFrame> {
        let Some(data) = &self.data else {
            return Ok(DataFrame::default());
        };
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let sliced = sort_frame(&crate::filter_dates(data, begin, stop)?, &keys)?;
        match fields {
            Some(cols) => Ok(sliced.select(cols.iter().copied())?),
            None => Ok(sliced),
        }
    }

    fn last_date(&self) -> Result<Option<TradeDate>> {
        match &self.data {
            Some(data) if data.height() > 0 => {
                Ok(text_values(data, columns::TRADE_DATE)?.into_iter().max())
            }
            _ => Ok(None),
        }
    }

    fn insert(&mut self, panel: &DataFrame) -> Result<usize> {
        match &mut self.data {
            Some(data) => {
                data.vstack_mut(panel)?;
            }
            None => self.data = Some(panel.clone()),
        }
        Ok(panel.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TradingCalendar;

    fn calendar() -> TradingCalendar {
        TradingCalendar::from_dates(["20240102", "20240103", "20240104", "20240105", "20240108"])
            .unwrap()
    }

    fn batch(dates: &[&str]) -> DataFrame {
        let values: Vec<f64> = (0..dates.len()).map(|i| i as f64).collect();
        df! {
            "trade_date" => dates,
            "x" => values,
        }
        .unwrap()
    }

    #[test]
    fn test_append_to_empty_table() {
        let mut table = MemoryTable::new("t", &["trade_date"]);
        let outcome = table
            .append(&batch(&["20240103", "20240104"]), &calendar())
            .unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Appended {
                rows: 2,
                from: "20240103".to_string()
            }
        );
        assert_eq!(table.last_date().unwrap().as_deref(), Some("20240104"));
    }

    #[test]
    fn test_append_same_range_twice_is_noop() {
        let cal = calendar();
        let mut table = MemoryTable::new("t", &["trade_date"]);
        table.append(&batch(&["20240102", "20240103"]), &cal).unwrap();
        let outcome = table.append(&batch(&["20240102", "20240103"]), &cal).unwrap();
        assert_eq!(outcome, AppendOutcome::AlreadyCovered);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_append_overlapping_batch_extends_only() {
        let cal = calendar();
        let mut table = MemoryTable::new("t", &["trade_date"]);
        table.append(&batch(&["20240102", "20240103"]), &cal).unwrap();
        let outcome = table
            .append(&batch(&["20240103", "20240104", "20240105"]), &cal)
            .unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Appended {
                rows: 2,
                from: "20240104".to_string()
            }
        );
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_append_with_gap_is_rejected() {
        let cal = calendar();
        let mut table = MemoryTable::new("t", &["trade_date"]);
        table.append(&batch(&["20240102"]), &cal).unwrap();
        let err = table.append(&batch(&["20240105"]), &cal).unwrap_err();
        assert!(matches!(err, HuelvaError::Discontinuity { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_check_continuity_codes() {
        let cal = calendar();
        let mut table = MemoryTable::new("t", &["trade_date"]);
        assert_eq!(table.check_continuity("20240104", &cal).unwrap().code(), 0);
        table.insert(&batch(&["20240102", "20240103"])).unwrap();
        assert_eq!(table.check_continuity("20240104", &cal).unwrap().code(), 0);
        assert_eq!(table.check_continuity("20240103", &cal).unwrap().code(), 1);
        assert_eq!(table.check_continuity("20240105", &cal).unwrap().code(), 2);
    }

    #[test]
    fn test_read_by_range_selects_columns() {
        let mut table = MemoryTable::new("t", &["trade_date"]);
        table.insert(&batch(&["20240104", "20240102", "20240103"])).unwrap();
        let df = table
            .read_by_range("20240102", "20240104", Some(&["trade_date"]))
            .unwrap();
        assert_eq!(df.width(), 1);
        assert_eq!(
            text_values(&df, "trade_date").unwrap(),
            vec!["20240102", "20240103"]
        );
    }
}
