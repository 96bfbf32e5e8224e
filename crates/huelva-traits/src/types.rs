//! Common types used throughout the Huelva pipeline.
//!
//! Every table in the pipeline is a panel keyed by `trade_date` (a `YYYYMMDD`
//! string, so lexicographic order is chronological order) and, for
//! cross-sectional tables, by `instrument`. Value columns are `f64`; a missing
//! value is a null inside the `DataFrame` and `NaN` once extracted.

use crate::{HuelvaError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

/// A trading session identifier in `YYYYMMDD` form.
pub type TradeDate = String;

/// A futures instrument identifier such as `"CU"` or `"IF"`.
pub type Instrument = String;

/// Column names shared by every panel.
pub mod columns {
    /// Trading session key.
    pub const TRADE_DATE: &str = "trade_date";
    /// Instrument key.
    pub const INSTRUMENT: &str = "instrument";
    /// Contract ticker carried onto factor rows.
    pub const TICKER: &str = "ticker";
    /// Signal weight column.
    pub const WEIGHT: &str = "weight";
    /// Daily instrument return in the availability panel.
    pub const RETURN: &str = "return";
    /// Traded amount in the availability panel.
    pub const AMOUNT: &str = "amount";
    /// Rolling volatility in the availability panel.
    pub const VOLATILITY: &str = "volatility";
    /// Top-level sector tag.
    pub const SECTOR_L0: &str = "sectorL0";
    /// Second-level sector tag.
    pub const SECTOR_L1: &str = "sectorL1";
    /// Cross-section throttle scalar.
    pub const TOT_WGT: &str = "tot_wgt";
}

/// Container for a date or date/instrument keyed table.
///
/// `Panel` wraps a Polars DataFrame and offers typed extraction of key and
/// value columns, so downstream numerics can run on plain slices.
///
/// # Example
///
/// ```no_run
/// use huelva_traits::Panel;
/// use polars::prelude::*;
///
/// let df = df! {
///     "trade_date" => &["20240102", "20240102"],
///     "instrument" => &["CU", "AL"],
///     "AMP020L50" => &[0.5, -0.2],
/// }.unwrap();
///
/// let panel = Panel::new(df);
/// assert_eq!(panel.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Panel {
    data: DataFrame,
}

impl Panel {
    /// Creates a new `Panel` from a DataFrame.
    pub const fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying DataFrame.
    pub const fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Consumes self and returns the underlying DataFrame.
    pub fn into_inner(self) -> DataFrame {
        self.data
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Returns the column names.
    pub fn columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Checks if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.data
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == name)
    }

    /// Fails with [`HuelvaError::MissingColumn`] naming the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(missing) => Err(HuelvaError::MissingColumn((*missing).to_string())),
            None => Ok(()),
        }
    }

    /// The `trade_date` column.
    pub fn dates(&self) -> Result<Vec<TradeDate>> {
        text_values(&self.data, columns::TRADE_DATE)
    }

    /// The `instrument` column.
    pub fn instruments(&self) -> Result<Vec<Instrument>> {
        text_values(&self.data, columns::INSTRUMENT)
    }

    /// A numeric column with nulls as `NaN`.
    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        float_values(&self.data, name)
    }

    /// A string column with nulls as empty strings.
    pub fn texts(&self, name: &str) -> Result<Vec<String>> {
        text_values(&self.data, name)
    }

    /// Rows with `begin <= trade_date < stop`.
    pub fn between(&self, begin: &str, stop: &str) -> Result<Self> {
        Ok(Self::new(filter_dates(&self.data, begin, stop)?))
    }

    /// Sorts by the given key columns.
    pub fn sorted_by(&self, keys: &[&str]) -> Result<Self> {
        Ok(Self::new(sort_frame(&self.data, keys)?))
    }

    /// Row indices grouped by trade date, in chronological order.
    pub fn date_groups(&self) -> Result<BTreeMap<TradeDate, Vec<usize>>> {
        Ok(group_indices(&self.dates()?))
    }
}

impl From<DataFrame> for Panel {
    fn from(data: DataFrame) -> Self {
        Self::new(data)
    }
}

impl AsRef<DataFrame> for Panel {
    fn as_ref(&self) -> &DataFrame {
        &self.data
    }
}

/// Extracts a numeric column as `f64`, nulls becoming `NaN`.
///
/// Integer columns are widened; anything non-numeric is a data-contract
/// violation rather than a silent coercion.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| HuelvaError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series();
    match series.dtype() {
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::Int16
        | DataType::Int8
        | DataType::UInt64
        | DataType::UInt32
        | DataType::UInt16
        | DataType::UInt8
        | DataType::Null => {}
        other => {
            return Err(HuelvaError::DataContract(format!(
                "column {name} has non-numeric type {other}"
            )));
        }
    }
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Extracts a string column, nulls becoming empty strings.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| HuelvaError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series();
    let chunked = series.str().map_err(|_| {
        HuelvaError::DataContract(format!(
            "column {name} has type {}, expected string",
            series.dtype()
        ))
    })?;
    Ok(chunked
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Builds a nullable `f64` column; non-finite values are stored as nulls.
pub fn float_column(name: &str, values: &[f64]) -> Column {
    let values: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.is_finite().then_some(*v))
        .collect();
    Column::new(name.into(), values)
}

/// Builds a string column.
pub fn text_column(name: &str, values: &[String]) -> Column {
    Column::new(name.into(), values)
}

/// Assembles a frame from key columns followed by value columns.
pub fn frame_from_parts(
    keys: Vec<(&str, Vec<String>)>,
    values: &[(String, Vec<f64>)],
) -> Result<DataFrame> {
    let mut cols: Vec<Column> = keys
        .iter()
        .map(|(name, v)| text_column(name, v))
        .collect();
    cols.extend(values.iter().map(|(name, v)| float_column(name, v)));
    Ok(DataFrame::new(cols)?)
}

/// Rows with `begin <= trade_date < stop`.
pub fn filter_dates(df: &DataFrame, begin: &str, stop: &str) -> Result<DataFrame> {
    Ok(df
        .clone()
        .lazy()
        .filter(
            col(columns::TRADE_DATE)
                .gt_eq(lit(begin.to_string()))
                .and(col(columns::TRADE_DATE).lt(lit(stop.to_string()))),
        )
        .collect()?)
}

/// Sorts a frame ascending by the given keys.
pub fn sort_frame(df: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let by: Vec<PlSmallStr> = keys.iter().map(|k| PlSmallStr::from(*k)).collect();
    Ok(df.clone().lazy().sort(by, Default::default()).collect()?)
}

/// Vertically stacks frames sharing one schema.
pub fn stack_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut iter = frames.into_iter();
    let Some(mut acc) = iter.next() else {
        return Ok(DataFrame::default());
    };
    for frame in iter {
        acc.vstack_mut(&frame)?;
    }
    acc.as_single_chunk_par();
    Ok(acc)
}

/// Groups positions by key, keys in ascending order.
pub fn group_indices(keys: &[String]) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        groups.entry(key.clone()).or_default().push(i);
    }
    groups
}

/// Joins two frames on `(trade_date, instrument)`.
///
/// Non-key columns present on both sides keep the left name and get a
/// `_right` suffix on the right.
pub fn join_on_keys(left: &DataFrame, right: &DataFrame, how: JoinType) -> Result<DataFrame> {
    let keys = [col(columns::TRADE_DATE), col(columns::INSTRUMENT)];
    Ok(left
        .clone()
        .lazy()
        .join(right.clone().lazy(), keys.clone(), keys, JoinArgs::new(how))
        .collect()?)
}

/// Rows of `df` whose `(trade_date, instrument)` appears in `keys`, sorted
/// by those two columns.
///
/// Only the key columns of `keys` are read; the result has the columns of
/// `df`.
pub fn restrict_to_keys(df: &DataFrame, keys: &DataFrame) -> Result<DataFrame> {
    let key_cols = [col(columns::TRADE_DATE), col(columns::INSTRUMENT)];
    let names: Vec<Expr> = df
        .get_column_names()
        .iter()
        .map(|c| col(c.as_str()))
        .collect();
    let joined = keys
        .clone()
        .lazy()
        .select(key_cols.clone())
        .join(
            df.clone().lazy(),
            key_cols.clone(),
            key_cols,
            JoinArgs::new(JoinType::Inner),
        )
        .select(names)
        .collect()?;
    sort_frame(&joined, &[columns::TRADE_DATE, columns::INSTRUMENT])
}
