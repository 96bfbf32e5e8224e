//! Immutable run configuration records.
//!
//! Returns, factors, strategies and portfolios are read once at startup and
//! never mutated afterwards.

use crate::{HuelvaError, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Price used to realize a forward return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ReturnClass {
    /// Open-to-open returns.
    #[display("Opn")]
    Opn,
    /// Close-to-close returns.
    #[display("Cls")]
    Cls,
}

impl ReturnClass {
    /// Both classes.
    pub const ALL: [Self; 2] = [Self::Opn, Self::Cls];

    /// The daily return column of the preprocessed bars this class compounds.
    #[must_use]
    pub const fn daily_return_column(&self) -> &'static str {
        match self {
            Self::Opn => "return_o_major",
            Self::Cls => "return_c_major",
        }
    }
}

/// A forward-looking return: `win` sessions realized after `lag` sessions of delay.
///
/// Its canonical name, e.g. `Opn010L1`, doubles as its storage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{class}{win:03}L{lag}")]
#[serde(try_from = "String", into = "String")]
pub struct ReturnSpec {
    /// Open or close based.
    pub class: ReturnClass,
    /// Holding window in sessions.
    pub win: usize,
    /// Execution delay in sessions.
    pub lag: usize,
}

impl ReturnSpec {
    /// Creates a return definition.
    pub const fn new(class: ReturnClass, win: usize, lag: usize) -> Self {
        Self { class, win, lag }
    }

    /// Sessions between a factor date and the realization of its return.
    #[must_use]
    pub const fn shift(&self) -> usize {
        self.win + self.lag
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl FromStr for ReturnSpec {
    type Err = HuelvaError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || HuelvaError::Config(format!("invalid return name {s:?}, expected like Opn010L1"));
        let class = match s.get(..3) {
            Some("Opn") => ReturnClass::Opn,
            Some("Cls") => ReturnClass::Cls,
            _ => return Err(bad()),
        };
        let (win, lag) = s[3..].split_once('L').ok_or_else(bad)?;
        let win: usize = win.parse().map_err(|_| bad())?;
        let lag: usize = lag.parse().map_err(|_| bad())?;
        if win == 0 {
            return Err(bad());
        }
        Ok(Self::new(class, win, lag))
    }
}

impl TryFrom<String> for ReturnSpec {
    type Error = HuelvaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ReturnSpec> for String {
    fn from(value: ReturnSpec) -> Self {
        value.to_string()
    }
}

/// A single factor: its family and its concrete variant name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct FactorId {
    /// Factor class, e.g. `AMP`.
    pub class: String,
    /// Factor name, e.g. `AMP240L50`.
    pub name: String,
}

impl FactorId {
    /// Creates a factor identifier.
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }
}

impl From<(String, String)> for FactorId {
    fn from((class, name): (String, String)) -> Self {
        Self { class, name }
    }
}

impl From<FactorId> for (String, String) {
    fn from(value: FactorId) -> Self {
        (value.class, value.name)
    }
}

/// A named combination of a target return and a factor set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Target forward return.
    pub ret: ReturnSpec,
    /// Ordered factor list.
    pub factors: Vec<FactorId>,
    /// Optimization window in sessions.
    pub opt_win: usize,
}

impl Strategy {
    /// Factor names in order.
    pub fn factor_names(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.name.clone()).collect()
    }

    /// Rejects empty factor lists, duplicates and a zero optimization window.
    pub fn validate(&self) -> Result<()> {
        if self.factors.is_empty() {
            return Err(HuelvaError::Config(format!(
                "strategy {} has no factors",
                self.name
            )));
        }
        if self.opt_win < 2 {
            return Err(HuelvaError::Config(format!(
                "strategy {} needs opt_win >= 2, got {}",
                self.name, self.opt_win
            )));
        }
        let mut names = self.factor_names();
        names.sort();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(HuelvaError::Config(format!(
                "strategy {} lists a factor twice",
                self.name
            )));
        }
        Ok(())
    }
}

/// A named weighting of strategies. Weights are used as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Portfolio name.
    pub name: String,
    /// Strategy name to weight.
    pub weights: BTreeMap<String, f64>,
}

/// Sector tags of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// Top-level sector.
    pub sector_l0: String,
    /// Second-level sector.
    pub sector_l1: String,
}
