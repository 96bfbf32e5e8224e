//! Trading calendar.
//!
//! All date arithmetic in the pipeline is expressed in trading sessions, never
//! in calendar days.

use crate::{HuelvaError, Result, TradeDate};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::Path;

/// Date format used by every trade date.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Parses a `YYYYMMDD` trade date.
pub fn parse_trade_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| HuelvaError::InvalidDate(format!("{date}: {e}")))
}

/// Trading-day sequence and date arithmetic.
pub trait Calendar: Send + Sync {
    /// The trading date `shift` sessions after `date`; negative shifts look back.
    ///
    /// # Errors
    ///
    /// [`HuelvaError::InvalidDate`] when `date` is not a trading date or the
    /// result falls outside the calendar.
    fn next_date(&self, date: &str, shift: i64) -> Result<TradeDate>;

    /// Trading dates in `[begin, stop)`.
    fn iter_dates(&self, begin: &str, stop: &str) -> Vec<TradeDate>;

    /// Trading dates in `[begin, stop)` whose next session falls in another
    /// ISO week, or that end the calendar.
    fn week_end_days(&self, begin: &str, stop: &str) -> Vec<TradeDate>;
}

/// A calendar backed by an explicit, sorted list of trading dates.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    dates: Vec<TradeDate>,
}

#[derive(Debug, Deserialize)]
struct CalendarRecord {
    trade_date: String,
}

impl TradingCalendar {
    /// Builds a calendar; dates are validated, sorted and de-duplicated.
    pub fn from_dates<I, S>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dates: Vec<TradeDate> = dates.into_iter().map(Into::into).collect();
        for date in &dates {
            parse_trade_date(date)?;
        }
        dates.sort();
        dates.dedup();
        if dates.is_empty() {
            return Err(HuelvaError::InvalidDate("empty calendar".to_string()));
        }
        Ok(Self { dates })
    }

    /// Loads a CSV file with a `trade_date` column.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut dates = Vec::new();
        for record in reader.deserialize::<CalendarRecord>() {
            dates.push(record?.trade_date);
        }
        tracing::debug!(
            path = %path.as_ref().display(),
            sessions = dates.len(),
            "loaded trading calendar"
        );
        Self::from_dates(dates)
    }

    /// All trading dates.
    pub fn dates(&self) -> &[TradeDate] {
        &self.dates
    }

    /// First trading date.
    pub fn first_date(&self) -> &str {
        self.dates.first().map_or("", String::as_str)
    }

    /// Last trading date.
    pub fn last_date(&self) -> &str {
        self.dates.last().map_or("", String::as_str)
    }

    /// Whether `date` is a trading date.
    pub fn contains(&self, date: &str) -> bool {
        self.dates.binary_search_by(|d| d.as_str().cmp(date)).is_ok()
    }

    fn position(&self, date: &str) -> Result<usize> {
        self.dates
            .binary_search_by(|d| d.as_str().cmp(date))
            .map_err(|_| HuelvaError::InvalidDate(format!("{date} is not a trading date")))
    }

    fn lower_bound(&self, date: &str) -> usize {
        self.dates.partition_point(|d| d.as_str() < date)
    }
}

impl Calendar for TradingCalendar {
    fn next_date(&self, date: &str, shift: i64) -> Result<TradeDate> {
        let pos = self.position(date)? as i64 + shift;
        if pos < 0 || pos >= self.dates.len() as i64 {
            return Err(HuelvaError::InvalidDate(format!(
                "{date} shifted by {shift} leaves the calendar [{}, {}]",
                self.first_date(),
                self.last_date()
            )));
        }
        Ok(self.dates[pos as usize].clone())
    }

    fn iter_dates(&self, begin: &str, stop: &str) -> Vec<TradeDate> {
        let lo = self.lower_bound(begin);
        let hi = self.lower_bound(stop);
        if lo >= hi {
            return Vec::new();
        }
        self.dates[lo..hi].to_vec()
    }

    fn week_end_days(&self, begin: &str, stop: &str) -> Vec<TradeDate> {
        let lo = self.lower_bound(begin);
        let hi = self.lower_bound(stop);
        if lo >= hi {
            return Vec::new();
        }
        // A week end is decided by the next session of the whole calendar,
        // never by `stop`.
        let week = |date: &str| parse_trade_date(date).ok().map(|d| d.iso_week());
        (lo..hi)
            .filter(|&i| match self.dates.get(i + 1) {
                Some(next) => week(next) != week(&self.dates[i]),
                None => true,
            })
            .map(|i| self.dates[i].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn calendar() -> TradingCalendar {
        // Mon 2024-01-01 .. Fri 2024-01-12, weekends excluded
        TradingCalendar::from_dates([
            "20240102", "20240103", "20240104", "20240105", "20240108", "20240109",
            "20240110", "20240111", "20240112", "20240101",
        ])
        .unwrap()
    }

    #[rstest]
    #[case("20240102", 1, "20240103")]
    #[case("20240105", 1, "20240108")]
    #[case("20240108", -2, "20240104")]
    #[case("20240110", 0, "20240110")]
    fn test_next_date(#[case] date: &str, #[case] shift: i64, #[case] expected: &str) {
        assert_eq!(calendar().next_date(date, shift).unwrap(), expected);
    }

    #[test]
    fn test_next_date_out_of_range() {
        assert!(calendar().next_date("20240101", -1).is_err());
        assert!(calendar().next_date("20240112", 1).is_err());
        assert!(calendar().next_date("20240106", 1).is_err());
    }

    #[test]
    fn test_iter_dates_is_end_exclusive() {
        let cal = calendar();
        assert_eq!(
            cal.iter_dates("20240104", "20240109"),
            vec!["20240104", "20240105", "20240108"]
        );
        assert!(cal.iter_dates("20240109", "20240104").is_empty());
        // bounds that are not trading dates
        assert_eq!(cal.iter_dates("20240106", "20240109"), vec!["20240108"]);
    }

    #[test]
    fn test_week_end_days() {
        let cal = calendar();
        assert_eq!(
            cal.week_end_days("20240101", "20240113"),
            vec!["20240105", "20240112"]
        );
        // Wed 2024-01-10 is mid-week even though the range stops after it.
        assert_eq!(
            cal.week_end_days("20240101", "20240111"),
            vec!["20240105"]
        );
        // The calendar's last session closes its week.
        assert_eq!(cal.week_end_days("20240108", "20240113"), vec!["20240112"]);
    }

    #[test]
    fn test_week_end_days_independent_of_stop() {
        let cal = calendar();
        let full = cal.week_end_days("20240101", "20240113");
        for stop in cal.dates().iter().skip(1) {
            let split = cal.week_end_days("20240101", stop);
            assert_eq!(split.as_slice(), &full[..split.len()], "stop {stop}");
        }
    }

    #[test]
    fn test_first_and_last_date() {
        let cal = calendar();
        assert_eq!(cal.first_date(), "20240101");
        assert_eq!(cal.last_date(), "20240112");
    }

    #[test]
    fn test_rejects_malformed_dates() {
        assert!(TradingCalendar::from_dates(["2024-01-02"]).is_err());
        assert!(TradingCalendar::from_dates(Vec::<String>::new()).is_err());
    }
}
