//! Table layouts.
//!
//! Every table is keyed by `trade_date`, optionally followed by further key
//! columns. Layouts are fixed when a table is created and never migrated.

use huelva_traits::columns;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// UTF-8 text.
    Text,
    /// 64-bit float; `NaN` is stored as `NULL`.
    Real,
    /// 64-bit integer.
    Integer,
}

impl SqlType {
    /// SQL type name.
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Integer => "INTEGER",
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Storage class.
    pub ty: SqlType,
}

impl ColumnDef {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Layout of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Primary key columns, `trade_date` first.
    pub keys: Vec<ColumnDef>,
    /// Value columns.
    pub values: Vec<ColumnDef>,
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn reals<S: AsRef<str>>(names: &[S]) -> Vec<ColumnDef> {
    names
        .iter()
        .map(|n| ColumnDef::new(n.as_ref(), SqlType::Real))
        .collect()
}

fn date_key() -> ColumnDef {
    ColumnDef::new(columns::TRADE_DATE, SqlType::Text)
}

fn date_instrument_keys() -> Vec<ColumnDef> {
    vec![date_key(), ColumnDef::new(columns::INSTRUMENT, SqlType::Text)]
}

impl TableSchema {
    /// Creates a layout.
    pub fn new(name: impl Into<String>, keys: Vec<ColumnDef>, values: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            keys,
            values,
        }
    }

    /// Key names followed by value names.
    pub fn column_names(&self) -> Vec<&str> {
        self.keys
            .iter()
            .chain(&self.values)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Key names.
    pub fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(|c| c.name.as_str()).collect()
    }

    /// Looks up a column.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.keys.iter().chain(&self.values).find(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_sql(&self) -> String {
        let cols: Vec<String> = self
            .keys
            .iter()
            .map(|c| format!("{} {} NOT NULL", quoted(&c.name), c.ty.sql()))
            .chain(
                self.values
                    .iter()
                    .map(|c| format!("{} {}", quoted(&c.name), c.ty.sql())),
            )
            .collect();
        let keys: Vec<String> = self.keys.iter().map(|c| quoted(&c.name)).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
            quoted(&self.name),
            cols.join(", "),
            keys.join(", ")
        )
    }

    /// Parameterized `INSERT` statement over all columns.
    pub fn insert_sql(&self) -> String {
        let names = self.column_names();
        let cols: Vec<String> = names.iter().map(|n| quoted(n)).collect();
        let marks: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(&self.name),
            cols.join(", "),
            marks.join(", ")
        )
    }

    /// Parameterized range query over `fields`, ordered by the keys.
    pub fn select_sql(&self, fields: &[&str]) -> String {
        let cols: Vec<String> = fields.iter().map(|n| quoted(n)).collect();
        let keys: Vec<String> = self.keys.iter().map(|c| quoted(&c.name)).collect();
        format!(
            "SELECT {} FROM {} WHERE {td} >= ?1 AND {td} < ?2 ORDER BY {}",
            cols.join(", "),
            quoted(&self.name),
            keys.join(", "),
            td = quoted(columns::TRADE_DATE),
        )
    }

    /// Per-date, per-instrument availability panel.
    pub fn availability() -> Self {
        let mut values = reals(&[columns::RETURN, columns::AMOUNT, columns::VOLATILITY]);
        values.push(ColumnDef::new(columns::SECTOR_L0, SqlType::Text));
        values.push(ColumnDef::new(columns::SECTOR_L1, SqlType::Text));
        Self::new("available", date_instrument_keys(), values)
    }

    /// Per-date cross-section statistics, with one volatility per sector.
    pub fn cross_section<S: AsRef<str>>(sectors: &[S]) -> Self {
        let mut names: Vec<String> = ["volatility", "skewness", "kurtosis"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        names.extend(sectors.iter().map(|s| format!("volatility_{}", s.as_ref())));
        names.extend(
            ["vma", "sma", "kma", "volatility_sector", "sev", columns::TOT_WGT]
                .iter()
                .map(|s| (*s).to_string()),
        );
        Self::new("css", vec![date_key()], reals(&names))
    }

    /// Forward returns of one return definition.
    pub fn test_return(ret_name: &str) -> Self {
        Self::new(ret_name, date_instrument_keys(), reals(&[ret_name]))
    }

    /// One instrument's factor values of one family.
    pub fn factor_by_instrument<S: AsRef<str>>(factor_class: &str, names: &[S]) -> Self {
        let mut values = vec![
            ColumnDef::new(columns::INSTRUMENT, SqlType::Text),
            ColumnDef::new(columns::TICKER, SqlType::Text),
        ];
        values.extend(reals(names));
        Self::new(factor_class, vec![date_key()], values)
    }

    /// Cross-sectional factor panel of one family.
    pub fn factor_panel<S: AsRef<str>>(factor_class: &str, names: &[S]) -> Self {
        Self::new(factor_class, date_instrument_keys(), reals(names))
    }

    /// Per-date test scores of one family.
    pub fn test_result<S: AsRef<str>>(table: &str, names: &[S]) -> Self {
        Self::new(table, vec![date_key()], reals(names))
    }

    /// Optimized factor weights of a strategy.
    pub fn optimized_weights<S: AsRef<str>>(strategy: &str, factors: &[S]) -> Self {
        Self::new(strategy, vec![date_key()], reals(factors))
    }

    /// Instrument weight signal.
    pub fn signal(name: &str) -> Self {
        Self::new(name, date_instrument_keys(), reals(&[columns::WEIGHT]))
    }

    /// Long-form instrument covariances.
    pub fn covariance() -> Self {
        Self::new(
            "covariance",
            vec![
                date_key(),
                ColumnDef::new("instrument0", SqlType::Text),
                ColumnDef::new("instrument1", SqlType::Text),
            ],
            reals(&["cov"]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_create_sql() {
        let schema = TableSchema::signal("S0");
        assert_eq!(
            schema.create_sql(),
            "CREATE TABLE IF NOT EXISTS \"S0\" (\"trade_date\" TEXT NOT NULL, \
             \"instrument\" TEXT NOT NULL, \"weight\" REAL, \
             PRIMARY KEY (\"trade_date\", \"instrument\"))"
        );
        assert_eq!(
            schema.insert_sql(),
            "INSERT INTO \"S0\" (\"trade_date\", \"instrument\", \"weight\") VALUES (?1, ?2, ?3)"
        );
    }

    #[test]
    fn test_cross_section_columns() {
        let schema = TableSchema::cross_section(&["AUG", "MTL"]);
        let names = schema.column_names();
        assert!(names.contains(&"volatility_AUG"));
        assert!(names.contains(&"tot_wgt"));
        assert_eq!(schema.key_names(), vec!["trade_date"]);
    }

    #[rstest]
    #[case(TableSchema::availability(), "available", &["trade_date", "instrument"])]
    #[case(TableSchema::test_return("Opn010L1"), "Opn010L1", &["trade_date", "instrument"])]
    #[case(TableSchema::factor_by_instrument("AMP", &["AMP010"]), "AMP", &["trade_date"])]
    #[case(TableSchema::factor_panel("AMP", &["AMP010"]), "AMP", &["trade_date", "instrument"])]
    #[case(TableSchema::test_result("ic-va", &["AMP010"]), "ic-va", &["trade_date"])]
    #[case(TableSchema::optimized_weights("S0", &["AMP010"]), "S0", &["trade_date"])]
    #[case(TableSchema::signal("P0"), "P0", &["trade_date", "instrument"])]
    #[case(
        TableSchema::covariance(),
        "covariance",
        &["trade_date", "instrument0", "instrument1"]
    )]
    fn test_table_keys(#[case] schema: TableSchema, #[case] name: &str, #[case] keys: &[&str]) {
        assert_eq!(schema.name, name);
        assert_eq!(schema.key_names(), keys);
        // Range queries filter and order on the date key.
        assert!(schema.select_sql(&schema.column_names()).contains("\"trade_date\" >= ?1"));
    }
}

