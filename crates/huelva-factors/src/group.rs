//! Factor group configurations and naming.
//!
//! A group fixes a family's rolling windows (and quantile fractions where the
//! family uses them) and derives every output column name from them:
//!
//! | kind | pattern | example |
//! |---|---|---|
//! | vanilla | `{CLASS}{win:03}` | `KURT060` |
//! | with fraction | `{CLASS}{win:03}L{pct:02}` | `AMP240L50` |
//! | daily intermediate | `{CLASS}L{pct:02}` | `AMPL50` |
//! | delay | `{vanilla}D` | `SKEW010D` |
//! | residual | `{vanilla}RES` | `BASIS120RES` |
//! | price average / lag | `{vanilla}PA`, `{vanilla}LA` | `RS060PA` |
//! | diff | `{CLASS}DIFF`, `{CLASS}DIFF2` | `IDRDIFF` |

use huelva_traits::{Calendar, HuelvaError, Result, TradeDate};
use serde::{Deserialize, Serialize};

/// Sessions added to the longest window when buffering a date range.
pub const BUFFER_SESSIONS: usize = 10;

/// Group configuration as written in the project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorGroupConfig {
    /// Factor class, e.g. `AMP`.
    pub class: String,
    /// Rolling windows in sessions.
    pub wins: Vec<usize>,
    /// Quantile fractions in `(0, 1]`, for families that slice by fraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lbds: Option<Vec<f64>>,
}

impl FactorGroupConfig {
    /// A windows-only configuration.
    pub fn win(class: impl Into<String>, wins: Vec<usize>) -> Self {
        Self {
            class: class.into(),
            wins,
            lbds: None,
        }
    }

    /// A windows-and-fractions configuration.
    pub fn win_lbd(class: impl Into<String>, wins: Vec<usize>, lbds: Vec<f64>) -> Self {
        Self {
            class: class.into(),
            wins,
            lbds: Some(lbds),
        }
    }

    /// Converts into a windows-only group; fractions are a configuration error.
    pub fn into_win(self) -> Result<WinGroup> {
        if self.lbds.is_some() {
            return Err(HuelvaError::Config(format!(
                "factor class {} takes no lbds",
                self.class
            )));
        }
        WinGroup::new(self.class, self.wins)
    }

    /// Converts into a windows-and-fractions group; missing fractions are a
    /// configuration error.
    pub fn into_win_lbd(self) -> Result<WinLbdGroup> {
        let Some(lbds) = self.lbds else {
            return Err(HuelvaError::Config(format!(
                "factor class {} requires lbds",
                self.class
            )));
        };
        WinLbdGroup::new(self.class, self.wins, lbds)
    }
}

/// A family configured by rolling windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinGroup {
    class: String,
    wins: Vec<usize>,
}

impl WinGroup {
    /// Validates and creates a group. Windows must be non-empty, positive and
    /// distinct.
    pub fn new(class: impl Into<String>, wins: Vec<usize>) -> Result<Self> {
        let class = class.into();
        if wins.is_empty() {
            return Err(HuelvaError::Config(format!("factor class {class} has no wins")));
        }
        if wins.contains(&0) {
            return Err(HuelvaError::Config(format!(
                "factor class {class} has a zero window"
            )));
        }
        let mut sorted = wins.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(HuelvaError::Config(format!(
                "factor class {class} repeats a window"
            )));
        }
        Ok(Self { class, wins })
    }

    /// Factor class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Configured windows, in configuration order.
    pub fn wins(&self) -> &[usize] {
        &self.wins
    }

    /// The longest window.
    pub fn max_win(&self) -> usize {
        self.wins.iter().copied().max().unwrap_or_default()
    }

    /// First date to load so every window is filled by `begin`.
    pub fn buffer_begin(&self, begin: &str, calendar: &dyn Calendar) -> Result<TradeDate> {
        let shift = (self.max_win() + BUFFER_SESSIONS) as i64;
        calendar.next_date(begin, -shift)
    }

    /// Fails unless every window in `needed` is configured.
    pub fn require_wins(&self, needed: &[usize]) -> Result<()> {
        match needed.iter().find(|w| !self.wins.contains(w)) {
            Some(w) => Err(HuelvaError::Config(format!(
                "factor class {} needs window {w} for its diff, configured {:?}",
                self.class, self.wins
            ))),
            None => Ok(()),
        }
    }

    /// The two configured windows, for families that contrast exactly two.
    pub fn pair(&self) -> Result<(usize, usize)> {
        match self.wins.as_slice() {
            [w0, w1] => Ok((*w0, *w1)),
            other => Err(HuelvaError::Config(format!(
                "factor class {} needs exactly two wins, got {other:?}",
                self.class
            ))),
        }
    }

    /// `{CLASS}{win:03}`.
    pub fn name_vanilla(&self, win: usize) -> String {
        format!("{}{win:03}", self.class)
    }

    /// Vanilla names in window order.
    pub fn names_vanilla(&self) -> Vec<String> {
        self.wins.iter().map(|w| self.name_vanilla(*w)).collect()
    }

    /// `{CLASS}{win:03}{tag}`.
    pub fn name_tagged(&self, win: usize, tag: &str) -> String {
        format!("{}{tag}", self.name_vanilla(win))
    }

    /// Tagged names in window order.
    pub fn names_tagged(&self, tag: &str) -> Vec<String> {
        self.wins.iter().map(|w| self.name_tagged(*w, tag)).collect()
    }

    /// One-day delayed variant.
    pub fn name_delay(&self, win: usize) -> String {
        self.name_tagged(win, "D")
    }

    /// Delayed names.
    pub fn names_delay(&self) -> Vec<String> {
        self.names_tagged("D")
    }

    /// Regression residual variant.
    pub fn name_res(&self, win: usize) -> String {
        self.name_tagged(win, "RES")
    }

    /// Residual names.
    pub fn names_res(&self) -> Vec<String> {
        self.names_tagged("RES")
    }

    /// Price-to-average variant.
    pub fn name_pa(&self, win: usize) -> String {
        self.name_tagged(win, "PA")
    }

    /// Price-to-average names.
    pub fn names_pa(&self) -> Vec<String> {
        self.names_tagged("PA")
    }

    /// Price-to-lag variant.
    pub fn name_la(&self, win: usize) -> String {
        self.name_tagged(win, "LA")
    }

    /// Price-to-lag names.
    pub fn names_la(&self) -> Vec<String> {
        self.names_tagged("LA")
    }

    /// `{CLASS}DIFF`.
    pub fn name_diff(&self) -> String {
        format!("{}DIFF", self.class)
    }

    /// `{CLASS}DIFF2`.
    pub fn name_diff2(&self) -> String {
        format!("{}DIFF2", self.class)
    }

    /// `{CLASS}{suffix}`, for per-variable daily intermediates and summaries.
    pub fn name_suffixed(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.class)
    }
}

/// A family configured by rolling windows and quantile fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct WinLbdGroup {
    base: WinGroup,
    lbds: Vec<f64>,
}

/// Percent label of a fraction, e.g. `0.5 -> 50`.
pub fn lbd_pct(lbd: f64) -> usize {
    (lbd * 100.0).round() as usize
}

impl WinLbdGroup {
    /// Validates and creates a group. Fractions must lie in `(0, 1]` and have
    /// distinct percent labels.
    pub fn new(class: impl Into<String>, wins: Vec<usize>, lbds: Vec<f64>) -> Result<Self> {
        let base = WinGroup::new(class, wins)?;
        if lbds.is_empty() {
            return Err(HuelvaError::Config(format!(
                "factor class {} has no lbds",
                base.class
            )));
        }
        if let Some(bad) = lbds.iter().find(|l| !(**l > 0.0 && **l <= 1.0)) {
            return Err(HuelvaError::Config(format!(
                "factor class {} has lbd {bad} outside (0, 1]",
                base.class
            )));
        }
        let mut pcts: Vec<usize> = lbds.iter().map(|l| lbd_pct(*l)).collect();
        pcts.sort_unstable();
        if pcts.windows(2).any(|w| w[0] == w[1]) {
            return Err(HuelvaError::Config(format!(
                "factor class {} repeats an lbd",
                base.class
            )));
        }
        Ok(Self { base, lbds })
    }

    /// The window part of the group.
    pub const fn base(&self) -> &WinGroup {
        &self.base
    }

    /// Factor class.
    pub fn class(&self) -> &str {
        self.base.class()
    }

    /// Configured windows.
    pub fn wins(&self) -> &[usize] {
        self.base.wins()
    }

    /// Configured fractions.
    pub fn lbds(&self) -> &[f64] {
        &self.lbds
    }

    /// Fails unless `lbd` is configured.
    pub fn require_lbd(&self, lbd: f64) -> Result<()> {
        if self.lbds.iter().any(|l| lbd_pct(*l) == lbd_pct(lbd)) {
            Ok(())
        } else {
            Err(HuelvaError::Config(format!(
                "factor class {} needs lbd {lbd} for its diff, configured {:?}",
                self.class(),
                self.lbds
            )))
        }
    }

    /// `{CLASS}L{pct:02}`, the daily value before rolling.
    pub fn name_lbd(&self, lbd: f64) -> String {
        format!("{}L{:02}", self.class(), lbd_pct(lbd))
    }

    /// `{CLASS}{win:03}L{pct:02}`.
    pub fn name_vanilla(&self, win: usize, lbd: f64) -> String {
        format!("{}L{:02}", self.base.name_vanilla(win), lbd_pct(lbd))
    }

    /// Vanilla names, windows outer and fractions inner.
    pub fn names_vanilla(&self) -> Vec<String> {
        self.wins()
            .iter()
            .flat_map(|w| self.lbds.iter().map(move |l| self.name_vanilla(*w, *l)))
            .collect()
    }

    /// One-day delayed variant.
    pub fn name_delay(&self, win: usize, lbd: f64) -> String {
        format!("{}D", self.name_vanilla(win, lbd))
    }

    /// Delayed names in vanilla order.
    pub fn names_delay(&self) -> Vec<String> {
        self.names_vanilla().into_iter().map(|n| n + "D").collect()
    }

    /// `{CLASS}DIFF`.
    pub fn name_diff(&self) -> String {
        self.base.name_diff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huelva_traits::TradingCalendar;
    use rstest::rstest;

    #[test]
    fn test_win_names() {
        let group = WinGroup::new("BASIS", vec![120, 10]).unwrap();
        assert_eq!(group.names_vanilla(), vec!["BASIS120", "BASIS010"]);
        assert_eq!(group.names_res(), vec!["BASIS120RES", "BASIS010RES"]);
        assert_eq!(group.name_delay(10), "BASIS010D");
        assert_eq!(group.name_diff2(), "BASISDIFF2");
        assert_eq!(group.pair().unwrap(), (120, 10));
        assert_eq!(group.max_win(), 120);
    }

    #[test]
    fn test_win_lbd_names() {
        let group = WinLbdGroup::new("AMP", vec![20, 240], vec![0.5, 0.9]).unwrap();
        assert_eq!(
            group.names_vanilla(),
            vec!["AMP020L50", "AMP020L90", "AMP240L50", "AMP240L90"]
        );
        assert_eq!(group.name_lbd(0.5), "AMPL50");
        assert_eq!(group.name_delay(20, 0.9), "AMP020L90D");
        assert!(group.require_lbd(0.5).is_ok());
        assert!(group.require_lbd(0.3).is_err());
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![0, 5])]
    #[case(vec![5, 5])]
    fn test_invalid_wins(#[case] wins: Vec<usize>) {
        assert!(WinGroup::new("KURT", wins).unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_lbds() {
        assert!(WinLbdGroup::new("AMP", vec![20], vec![]).is_err());
        assert!(WinLbdGroup::new("AMP", vec![20], vec![1.5]).is_err());
        assert!(WinLbdGroup::new("AMP", vec![20], vec![0.5, 0.501]).is_err());
    }

    #[test]
    fn test_group_shape_mismatch() {
        let err = FactorGroupConfig::win("AMP", vec![20]).into_win_lbd().unwrap_err();
        assert!(err.is_config());
        let err = FactorGroupConfig::win_lbd("KURT", vec![20], vec![0.5])
            .into_win()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_require_wins() {
        let group = WinGroup::new("IDR", vec![5, 20]).unwrap();
        assert!(group.require_wins(&[5]).is_ok());
        assert!(group.require_wins(&[240, 5]).is_err());
        assert!(group.pair().is_ok());
        assert!(WinGroup::new("IDR", vec![5]).unwrap().pair().is_err());
    }

    #[test]
    fn test_buffer_begin() {
        let dates: Vec<String> = (1..=28).map(|d| format!("202402{d:02}")).collect();
        let calendar = TradingCalendar::from_dates(dates).unwrap();
        let group = WinGroup::new("KURT", vec![5, 3]).unwrap();
        assert_eq!(group.buffer_begin("20240220", &calendar).unwrap(), "20240205");
    }
}
