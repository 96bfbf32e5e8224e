//! Yearly summaries of test results.
//!
//! IC results summarize to the mean IC and the information ratio. VT and OT
//! results are daily portfolio returns and summarize to mean, volatility,
//! annualized figures and Sharpe. Every summary reports the share of missing
//! scores, and a final `ALL` row covers the whole range.

use crate::qtest::TestKind;
use huelva_math::stats;
use huelva_traits::{HuelvaError, Panel, Result, columns};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Scale applied to VT/OT means and standard deviations (percent).
pub const RET_SCALE: f64 = 100.0;
/// Trading sessions per year.
pub const ANN_RATE: f64 = 250.0;
/// Label of the whole-range row.
pub const ALL_YEARS: &str = "ALL";

/// Summary of IC scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// Calendar year, or `ALL`.
    pub trade_year: String,
    /// Factor name.
    pub factor: String,
    /// Mean IC.
    pub ic_mean: f64,
    /// Mean IC over its standard deviation.
    pub ir: f64,
    /// Share of missing scores.
    pub nan_rate: f64,
}

/// Summary of portfolio-return scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSummary {
    /// Calendar year, or `ALL`.
    pub trade_year: String,
    /// Factor name.
    pub factor: String,
    /// Mean daily return, in percent.
    pub mean: f64,
    /// Standard deviation of daily returns, in percent.
    pub std: f64,
    /// `mean × 250`.
    pub ann_ret: f64,
    /// `std × √250`.
    pub ann_vol: f64,
    /// `ann_ret / ann_vol`.
    pub sharpe: f64,
    /// Share of missing scores.
    pub nan_rate: f64,
}

/// Rows of a report, shaped by the test kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportRows {
    /// IC rows.
    Ic(Vec<IcSummary>),
    /// VT/OT rows.
    Returns(Vec<ReturnSummary>),
}

/// A yearly report of one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    /// Test identifier, e.g. `AMP-Opn010L1-1`.
    pub id: String,
    /// Test kind.
    pub kind: TestKind,
    /// Summaries by year then factor, `ALL` rows last.
    pub rows: ReportRows,
}

fn ic_summary(trade_year: &str, factor: &str, values: &[f64]) -> IcSummary {
    let mean = stats::mean(values);
    IcSummary {
        trade_year: trade_year.to_string(),
        factor: factor.to_string(),
        ic_mean: mean,
        ir: mean / stats::std(values),
        nan_rate: nan_rate(values),
    }
}

fn return_summary(trade_year: &str, factor: &str, values: &[f64]) -> ReturnSummary {
    let mean = stats::mean(values) * RET_SCALE;
    let std = stats::std(values) * RET_SCALE;
    let ann_ret = mean * ANN_RATE;
    let ann_vol = std * ANN_RATE.sqrt();
    ReturnSummary {
        trade_year: trade_year.to_string(),
        factor: factor.to_string(),
        mean,
        std,
        ann_ret,
        ann_vol,
        sharpe: ann_ret / ann_vol,
        nan_rate: nan_rate(values),
    }
}

fn nan_rate(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().filter(|v| v.is_nan()).count() as f64 / values.len() as f64
}

impl YearlyReport {
    /// Summarizes a test result panel (`trade_date` plus one column per
    /// factor).
    pub fn from_results(
        id: impl Into<String>,
        kind: TestKind,
        results: &Panel,
        factor_names: &[String],
    ) -> Result<Self> {
        let dates = results.dates()?;
        let series: Vec<Vec<f64>> = factor_names
            .iter()
            .map(|n| results.floats(n))
            .collect::<Result<_>>()?;
        let mut years: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, d) in dates.iter().enumerate() {
            let year = d.get(..4).ok_or_else(|| HuelvaError::InvalidDate(d.clone()))?;
            years.entry(year).or_default().push(i);
        }

        let mut groups: Vec<(&str, Vec<usize>)> = years.into_iter().collect();
        groups.push((ALL_YEARS, (0..dates.len()).collect()));
        let mut cells = Vec::with_capacity(groups.len() * factor_names.len());
        for (year, rows) in &groups {
            for (name, values) in factor_names.iter().zip(&series) {
                let picked: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
                cells.push((*year, name.as_str(), picked));
            }
        }
        let rows = if kind.scores_returns() {
            ReportRows::Returns(
                cells
                    .iter()
                    .map(|(y, f, v)| return_summary(y, f, v))
                    .collect(),
            )
        } else {
            ReportRows::Ic(cells.iter().map(|(y, f, v)| ic_summary(y, f, v)).collect())
        };
        Ok(Self {
            id: id.into(),
            kind,
            rows,
        })
    }

    /// Number of summary rows.
    pub fn len(&self) -> usize {
        match &self.rows {
            ReportRows::Ic(rows) => rows.len(),
            ReportRows::Returns(rows) => rows.len(),
        }
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        match &self.rows {
            ReportRows::Ic(rows) => rows.iter().try_for_each(|r| out.serialize(r))?,
            ReportRows::Returns(rows) => rows.iter().try_for_each(|r| out.serialize(r))?,
        }
        out.flush()?;
        Ok(())
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HuelvaError::Other(format!("report serialization failed: {e}")))
    }

    /// Writes `{id}.csv` and `{id}.json` under `dir`, returning the CSV path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join(format!("{}.csv", self.id));
        self.write_csv(fs::File::create(&csv_path)?)?;
        fs::write(dir.join(format!("{}.json", self.id)), self.to_json()?)?;
        info!(id = %self.id, kind = %self.kind, path = %csv_path.display(), "report saved");
        Ok(csv_path)
    }
}

/// Keeps the `trade_date` column plus `names` of a result panel, sorted by date.
pub fn select_results(results: &Panel, names: &[String]) -> Result<Panel> {
    let mut cols = vec![columns::TRADE_DATE.to_string()];
    cols.extend(names.iter().cloned());
    let df = results.data().select(cols)?;
    Panel::new(df).sorted_by(&[columns::TRADE_DATE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn results() -> Panel {
        Panel::new(
            df! {
                "trade_date" => ["20231228", "20231229", "20240102", "20240103", "20240104"],
                "A" => [Some(0.1), Some(0.3), Some(0.2), None, Some(0.4)],
                "B" => [-0.1, 0.0, 0.1, 0.2, 0.3],
            }
            .unwrap(),
        )
    }

    fn names() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    #[test]
    fn test_ic_report() {
        let report = YearlyReport::from_results("X-Opn001L1-1", TestKind::Ic, &results(), &names())
            .unwrap();
        let ReportRows::Ic(rows) = &report.rows else {
            panic!("expected ic rows");
        };
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].trade_year, "2023");
        assert_eq!(rows[0].factor, "A");
        assert_relative_eq!(rows[0].ic_mean, 0.2, epsilon = 1e-12);
        // std of [0.1, 0.3] is 0.1414..
        assert_relative_eq!(rows[0].ir, 0.2 / 0.02f64.sqrt(), epsilon = 1e-12);
        assert_eq!(rows[2].trade_year, "2024");
        assert_relative_eq!(rows[2].nan_rate, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(rows[2].ic_mean, 0.3, epsilon = 1e-12);
        assert_eq!(rows[4].trade_year, "ALL");
        assert_relative_eq!(rows[4].ic_mean, 0.25, epsilon = 1e-12);
        assert_relative_eq!(rows[5].nan_rate, 0.0);
    }

    #[test]
    fn test_return_report() {
        let report = YearlyReport::from_results("X", TestKind::Vt, &results(), &names()).unwrap();
        let ReportRows::Returns(rows) = &report.rows else {
            panic!("expected return rows");
        };
        let b2024 = &rows[3];
        assert_eq!((b2024.trade_year.as_str(), b2024.factor.as_str()), ("2024", "B"));
        assert_relative_eq!(b2024.mean, 20.0, epsilon = 1e-9);
        assert_relative_eq!(b2024.std, 10.0, epsilon = 1e-9);
        assert_relative_eq!(b2024.ann_ret, 5000.0, epsilon = 1e-6);
        assert_relative_eq!(b2024.ann_vol, 10.0 * 250f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(b2024.sharpe, 5000.0 / (10.0 * 250f64.sqrt()), epsilon = 1e-9);
    }

    #[test]
    fn test_csv_and_json() {
        let report = YearlyReport::from_results("X", TestKind::Ic, &results(), &names()).unwrap();
        let mut buf = Vec::new();
        report.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("trade_year,factor,ic_mean,ir,nan_rate"));
        assert_eq!(text.lines().count(), 1 + report.len());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "ic");
        assert_eq!(json["rows"][0]["factor"], "A");
    }

    #[test]
    fn test_select_results() {
        let out = select_results(&results(), &["B".to_string()]).unwrap();
        assert_eq!(out.columns(), vec!["trade_date", "B"]);
    }
}
