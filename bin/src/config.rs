//! Project configuration.
//!
//! One TOML file describes where data lives, the instrument universe and
//! every stage's parameters. It is read once at startup and validated before
//! any data is touched.

use huelva::combine::OptimizerConfig;
use huelva::eval::{CssConfig, OtConfig, UniverseConfig};
use huelva::factors::{FactorCatalog, FactorGroupConfig};
use huelva::traits::{
    HuelvaError, InstrumentInfo, Portfolio, Result, ReturnClass, ReturnSpec, Strategy,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Default project file name.
pub(crate) const DEFAULT_CONFIG: &str = "huelva.toml";

/// Where inputs are read from and outputs are written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PathsConfig {
    /// CSV file with a `trade_date` column.
    pub(crate) calendar: PathBuf,
    /// Directory of the per-instrument market databases.
    pub(crate) market_data: PathBuf,
    /// Root of every derived table and report.
    pub(crate) project: PathBuf,
}

/// Trailing window of the instrument covariances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CovarianceConfig {
    pub(crate) win: usize,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self { win: 60 }
    }
}

/// Forward returns to compute and to test against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TestConfig {
    /// Horizons written by `test-return`.
    pub(crate) wins: Vec<usize>,
    /// Horizons used by `qtest` and `report`; a subset of `wins`.
    pub(crate) wins_qtest: Vec<usize>,
    /// Sessions between the factor date and the first return.
    pub(crate) lag: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            wins: vec![1, 2, 5, 10, 20],
            wins_qtest: vec![1, 5, 10],
            lag: 1,
        }
    }
}

/// The parsed project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProjectConfig {
    pub(crate) paths: PathsConfig,
    #[serde(default)]
    pub(crate) universe: BTreeMap<String, InstrumentInfo>,
    #[serde(default)]
    pub(crate) available: UniverseConfig,
    #[serde(default)]
    pub(crate) css: CssConfig,
    #[serde(default)]
    pub(crate) covariance: CovarianceConfig,
    #[serde(default)]
    pub(crate) tst: TestConfig,
    #[serde(default)]
    pub(crate) ot: OtConfig,
    #[serde(default)]
    pub(crate) optimizer: OptimizerConfig,
    #[serde(default = "default_decay")]
    pub(crate) factor_decay_default: usize,
    /// Per-class smoothing overrides.
    #[serde(default)]
    pub(crate) factor_decay: BTreeMap<String, usize>,
    #[serde(default)]
    pub(crate) factors: Vec<FactorGroupConfig>,
    #[serde(default)]
    pub(crate) strategies: Vec<Strategy>,
    #[serde(default)]
    pub(crate) portfolios: Vec<Portfolio>,
}

const fn default_decay() -> usize {
    1
}

impl ProjectConfig {
    /// Loads a project file.
    pub(crate) fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parses a project file's content.
    pub(crate) fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Forward returns written by `test-return`.
    pub(crate) fn test_returns(&self) -> Vec<ReturnSpec> {
        self.returns_of(&self.tst.wins)
    }

    /// Forward returns the factor tests run against.
    pub(crate) fn qtest_returns(&self) -> Vec<ReturnSpec> {
        self.returns_of(&self.tst.wins_qtest)
    }

    fn returns_of(&self, wins: &[usize]) -> Vec<ReturnSpec> {
        ReturnClass::ALL
            .into_iter()
            .flat_map(|class| wins.iter().map(move |&w| ReturnSpec::new(class, w, self.tst.lag)))
            .collect()
    }

    /// Smoothing window of a factor class.
    pub(crate) fn decay_of(&self, factor_class: &str) -> usize {
        self.factor_decay
            .get(factor_class)
            .copied()
            .unwrap_or(self.factor_decay_default)
    }

    /// A configured strategy by name.
    pub(crate) fn strategy(&self, name: &str) -> Result<&Strategy> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HuelvaError::Config(format!("strategy {name} is not configured")))
    }

    /// Checks the whole file and builds the factor catalog.
    ///
    /// Runs before any IO: unknown classes, group shapes, missing diff
    /// windows and duplicate factor names surface here, as do strategies on
    /// unknown factors or untested returns and portfolios on unknown
    /// strategies.
    pub(crate) fn validate(&self) -> Result<FactorCatalog> {
        if self.universe.is_empty() {
            return Err(HuelvaError::Config("the universe is empty".to_string()));
        }
        if self.tst.wins.iter().any(|&w| w == 0) {
            return Err(HuelvaError::Config("return windows must be positive".to_string()));
        }
        if let Some(w) = self.tst.wins_qtest.iter().find(|w| !self.tst.wins.contains(w)) {
            return Err(HuelvaError::Config(format!(
                "qtest window {w} has no test return, add it to tst.wins"
            )));
        }
        if self.factor_decay_default == 0 || self.factor_decay.values().any(|&d| d == 0) {
            return Err(HuelvaError::Config("factor decay must be positive".to_string()));
        }
        for sector in &self.css.sectors {
            if !self.universe.values().any(|i| i.sector_l1 == *sector) {
                return Err(HuelvaError::Config(format!(
                    "css sector {sector} has no instrument in the universe"
                )));
            }
        }

        let catalog = FactorCatalog::new(self.factors.iter().cloned())?;
        for class in self.factor_decay.keys() {
            catalog.get_by_label(class)?;
        }

        let tested = self.qtest_returns();
        let mut names = BTreeSet::new();
        for strategy in &self.strategies {
            strategy.validate()?;
            if !names.insert(strategy.name.as_str()) {
                return Err(HuelvaError::Config(format!(
                    "strategy {} is configured twice",
                    strategy.name
                )));
            }
            if !tested.contains(&strategy.ret) {
                return Err(HuelvaError::Config(format!(
                    "strategy {} targets {}, which is not tested",
                    strategy.name, strategy.ret
                )));
            }
            for factor in &strategy.factors {
                catalog.resolve(factor)?;
            }
        }

        for portfolio in &self.portfolios {
            if portfolio.weights.is_empty() {
                return Err(HuelvaError::Config(format!(
                    "portfolio {} has no strategies",
                    portfolio.name
                )));
            }
            for name in portfolio.weights.keys() {
                if !names.contains(name.as_str()) {
                    return Err(HuelvaError::Config(format!(
                        "portfolio {} weighs unknown strategy {name}",
                        portfolio.name
                    )));
                }
            }
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PROJECT: &str = r#"
factor_decay_default = 3

[paths]
calendar = "data/calendar.csv"
market_data = "data/market"
project = "out"

[universe.AL]
sector_l0 = "industrial"
sector_l1 = "metal"

[universe.CU]
sector_l0 = "industrial"
sector_l1 = "metal"

[universe.M]
sector_l0 = "agriculture"
sector_l1 = "grain"

[css]
sectors = ["metal", "grain"]

[tst]
wins = [1, 5, 10]
wins_qtest = [1, 10]
lag = 1

[factor_decay]
KURT = 5

[[factors]]
class = "KURT"
wins = [10, 20, 60]

[[factors]]
class = "AMP"
wins = [20, 240]
lbds = [0.25, 0.5]

[[strategies]]
name = "S1"
ret = "Opn010L1"
factors = [["KURT", "KURT020"], ["AMP", "AMP020L25"]]
opt_win = 20

[[portfolios]]
name = "P1"
weights = { S1 = 1.0 }
"#;

    fn project() -> ProjectConfig {
        ProjectConfig::from_toml(PROJECT).unwrap()
    }

    #[test]
    fn test_parse_and_validate() {
        let config = project();
        let catalog = config.validate().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(config.universe.len(), 3);
        assert_eq!(config.covariance.win, 60);
        assert_eq!(config.decay_of("KURT"), 5);
        assert_eq!(config.decay_of("AMP"), 3);
        assert_eq!(config.test_returns().len(), 6);
        let names: Vec<String> = config.qtest_returns().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["Opn001L1", "Opn010L1", "Cls001L1", "Cls010L1"]);
        assert_eq!(config.strategy("S1").unwrap().opt_win, 20);
    }

    #[rstest]
    #[case("class = \"KURT\"", "class = \"NOPE\"")]
    #[case("wins = [20, 240]\nlbds", "wins = [20, 240]\nlbdz")]
    #[case("[\"KURT\", \"KURT020\"]", "[\"KURT\", \"KURT030\"]")]
    #[case("ret = \"Opn010L1\"", "ret = \"Opn005L1\"")]
    #[case("S1 = 1.0", "S2 = 1.0")]
    #[case("wins_qtest = [1, 10]", "wins_qtest = [1, 20]")]
    #[case("opt_win = 20", "opt_win = 1")]
    fn test_invalid_projects(#[case] from: &str, #[case] to: &str) {
        let content = PROJECT.replacen(from, to, 1);
        assert_ne!(content, PROJECT);
        let parsed = ProjectConfig::from_toml(&content);
        if let Ok(config) = parsed {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_unparsable_return_is_rejected_at_load() {
        let content = PROJECT.replacen("ret = \"Opn010L1\"", "ret = \"Xyz010L1\"", 1);
        assert!(ProjectConfig::from_toml(&content).is_err());
    }
}
