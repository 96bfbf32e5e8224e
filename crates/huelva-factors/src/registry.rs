//! Factor registry for discovering, building and resolving factor families.
//!
//! [`FactorClass`] is the closed set of families this crate implements. A
//! [`FactorCatalog`] is the validated set of configured groups for one run.

use crate::algorithm::FactorAlgorithm;
use crate::correlation::{CtpFactor, CtrFactor, CvpFactor};
use crate::group::FactorGroupConfig;
use crate::intraday::{
    AcrFactor, AmpFactor, IdvFactor, IkurtFactor, JumpFactor, LcvrFactor, MfFactor, NplsFactor,
    OnrFactor, SmtFactor, VentropyFactor, WsplitFactor,
};
use crate::market::S0betaFactor;
use crate::positioning::SpdwebFactor;
use crate::price::{
    CnvgFactor, IdrFactor, KurtFactor, LiquidityFactor, OmaFactor, SizeFactor, SkewFactor,
    TrFactor, ValFactor,
};
use crate::term_structure::{BasisFactor, MinorFactor, RsFactor, TsFactor};
use huelva_traits::{FactorId, HuelvaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Factor category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactorCategory {
    /// Daily bar price and volume statistics.
    Price,
    /// Relations between contracts, the spot basis and warehouse stock.
    TermStructure,
    /// Reductions of minute bars.
    Intraday,
    /// Quantile-sliced correlations of daily series.
    Correlation,
    /// Exchange member position reports.
    Positioning,
    /// Exposure to the market index.
    Market,
}

impl FactorCategory {
    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Price => "Rolling statistics of daily returns, volume and turnover",
            Self::TermStructure => "Basis, roll yield and inventory signals",
            Self::Intraday => "Minute bar shape, flow and autocorrelation signals",
            Self::Correlation => "Correlations of price with turnover and volume",
            Self::Positioning => "Sentiment of committed exchange members",
            Self::Market => "Beta and residual against the market index",
        }
    }
}

/// A factor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FactorClass {
    /// Return of the high-amplitude minutes against the low-amplitude ones.
    Amp,
    /// Spot basis rate, its change and its residual.
    Basis,
    /// Correlation of close with turnover.
    Ctp,
    /// Correlation of volume with close.
    Cvp,
    /// Correlation of turnover with return.
    Ctr,
    /// Open-to-close return.
    Idr,
    /// Kurtosis of minute returns.
    Ikurt,
    /// Kurtosis of daily returns.
    Kurt,
    /// Lead correlation of minute volume and return.
    Lcvr,
    /// Amihud illiquidity.
    Liquidity,
    /// Major-minor return spread.
    Minor,
    /// Net volume of rising minutes.
    Npls,
    /// Stock change.
    Rs,
    /// Skewness of daily returns.
    Skew,
    /// Turnover.
    Tr,
    /// Traded value.
    Val,
    /// Minute return autocorrelation.
    Acr,
    /// Convergence of moving averages.
    Cnvg,
    /// Intraday volatility.
    Idv,
    /// Jumps in minute returns.
    Jump,
    /// Money flow.
    Mf,
    /// Ordering of moving averages.
    Oma,
    /// Overnight return.
    Onr,
    /// Beta to the market index.
    S0beta,
    /// Open interest size.
    Size,
    /// Smart money.
    Smt,
    /// Member sentiment spread.
    Spdweb,
    /// Roll return.
    Ts,
    /// Entropy of minute volume.
    Ventropy,
    /// Price split by volume weight.
    Wsplit,
}

impl FactorClass {
    /// Every family.
    pub const ALL: [Self; 30] = [
        Self::Amp,
        Self::Basis,
        Self::Ctp,
        Self::Cvp,
        Self::Ctr,
        Self::Idr,
        Self::Ikurt,
        Self::Kurt,
        Self::Lcvr,
        Self::Liquidity,
        Self::Minor,
        Self::Npls,
        Self::Rs,
        Self::Skew,
        Self::Tr,
        Self::Val,
        Self::Acr,
        Self::Cnvg,
        Self::Idv,
        Self::Jump,
        Self::Mf,
        Self::Oma,
        Self::Onr,
        Self::S0beta,
        Self::Size,
        Self::Smt,
        Self::Spdweb,
        Self::Ts,
        Self::Ventropy,
        Self::Wsplit,
    ];

    /// The class label used in configuration and factor names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Amp => "AMP",
            Self::Basis => "BASIS",
            Self::Ctp => "CTP",
            Self::Cvp => "CVP",
            Self::Ctr => "CTR",
            Self::Idr => "IDR",
            Self::Ikurt => "IKURT",
            Self::Kurt => "KURT",
            Self::Lcvr => "LCVR",
            Self::Liquidity => "LIQUIDITY",
            Self::Minor => "MINOR",
            Self::Npls => "NPLS",
            Self::Rs => "RS",
            Self::Skew => "SKEW",
            Self::Tr => "TR",
            Self::Val => "VAL",
            Self::Acr => "ACR",
            Self::Cnvg => "CNVG",
            Self::Idv => "IDV",
            Self::Jump => "JUMP",
            Self::Mf => "MF",
            Self::Oma => "OMA",
            Self::Onr => "ONR",
            Self::S0beta => "S0BETA",
            Self::Size => "SIZE",
            Self::Smt => "SMT",
            Self::Spdweb => "SPDWEB",
            Self::Ts => "TS",
            Self::Ventropy => "VENTROPY",
            Self::Wsplit => "WSPLIT",
        }
    }

    /// Category classification.
    #[must_use]
    pub const fn category(&self) -> FactorCategory {
        match self {
            Self::Idr
            | Self::Kurt
            | Self::Skew
            | Self::Liquidity
            | Self::Tr
            | Self::Val
            | Self::Size
            | Self::Cnvg
            | Self::Oma => FactorCategory::Price,
            Self::Basis | Self::Minor | Self::Rs | Self::Ts => FactorCategory::TermStructure,
            Self::Amp
            | Self::Ikurt
            | Self::Lcvr
            | Self::Npls
            | Self::Acr
            | Self::Idv
            | Self::Jump
            | Self::Mf
            | Self::Onr
            | Self::Smt
            | Self::Ventropy
            | Self::Wsplit => FactorCategory::Intraday,
            Self::Ctp | Self::Cvp | Self::Ctr => FactorCategory::Correlation,
            Self::Spdweb => FactorCategory::Positioning,
            Self::S0beta => FactorCategory::Market,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Amp => "Mean return of the highest-amplitude minutes less the lowest",
            Self::Basis => "Spot basis rate, its change and its residual against returns",
            Self::Ctp => "Correlation of close and turnover over the top turnover sessions",
            Self::Cvp => "Correlation of volume and close over the top volume sessions",
            Self::Ctr => "Correlation of turnover and return over the top turnover sessions",
            Self::Idr => "Rolling sum of the open-to-close return",
            Self::Ikurt => "Kurtosis of minute returns",
            Self::Kurt => "Kurtosis of daily close-to-close returns",
            Self::Lcvr => "Correlation of minute volume with the next minute's return",
            Self::Liquidity => "Absolute return per unit of traded amount",
            Self::Minor => "Return of the minor contract less the major",
            Self::Npls => "Net volume of rising minutes over total volume",
            Self::Rs => "Relative change of warehouse stock",
            Self::Skew => "Skewness of daily close-to-close returns",
            Self::Tr => "Volume over open interest",
            Self::Val => "Rolling mean of traded amount",
            Self::Acr => "Autocorrelation of minute returns",
            Self::Cnvg => "Dispersion of short moving averages around a benchmark",
            Self::Idv => "Standard deviation of minute returns",
            Self::Jump => "Difference between simple and log minute return variation",
            Self::Mf => "Signed money flow over total amount",
            Self::Oma => "Rank correlation of moving averages with their window order",
            Self::Onr => "Overnight return from the night session to the day open",
            Self::S0beta => "Beta and residual of returns against the market index",
            Self::Size => "Log open interest value",
            Self::Smt => "Price of the smart-money minutes against the day's price",
            Self::Spdweb => "Sentiment of the most committed members less the least",
            Self::Ts => "Annualized roll return between the major and minor contracts",
            Self::Ventropy => "Entropy of minute volume shares",
            Self::Wsplit => "Price of the heaviest volume minutes against the day's price",
        }
    }

    /// Whether the family is configured with quantile fractions as well as
    /// windows.
    #[must_use]
    pub const fn uses_lambdas(&self) -> bool {
        matches!(
            self,
            Self::Amp
                | Self::Ctp
                | Self::Cvp
                | Self::Ctr
                | Self::Smt
                | Self::Spdweb
                | Self::Wsplit
        )
    }

    /// A configuration satisfying every window and fraction the family
    /// contrasts in its diff.
    #[must_use]
    pub fn default_group(&self) -> FactorGroupConfig {
        let class = self.as_str();
        let win = |wins: &[usize]| FactorGroupConfig::win(class, wins.to_vec());
        let win_lbd =
            |wins: &[usize], lbds: &[f64]| FactorGroupConfig::win_lbd(class, wins.to_vec(), lbds.to_vec());
        match self {
            Self::Amp => win_lbd(&[20, 60, 120, 240], &[0.2, 0.5]),
            Self::Ctp | Self::Cvp | Self::Ctr => win_lbd(&[20, 60, 120], &[0.5, 1.0]),
            Self::Smt => win_lbd(&[1, 5, 20], &[0.2]),
            Self::Spdweb => win_lbd(&[20, 60, 240], &[0.6, 0.9]),
            Self::Wsplit => win_lbd(&[1, 5, 20], &[0.25]),
            Self::Basis => win(&[60, 20]),
            Self::Liquidity => win(&[60, 10]),
            Self::Minor => win(&[20, 5]),
            Self::Rs => win(&[60, 5]),
            Self::Idr => win(&[5, 20, 60, 240]),
            Self::Ikurt => win(&[20, 60, 240]),
            Self::Kurt | Self::Idv => win(&[10, 20, 60]),
            Self::Skew => win(&[10, 20, 60, 120]),
            Self::Tr | Self::Val | Self::Size => win(&[20, 60, 240]),
            Self::Npls => win(&[3, 20, 240]),
            Self::Acr => win(&[8, 20, 120]),
            Self::Cnvg => win(&[5, 10, 20, 60, 120]),
            Self::Oma => win(&[5, 10, 20, 60]),
            Self::Onr => win(&[5, 20, 120]),
            Self::Mf => win(&[1, 5, 20]),
            Self::Ts => win(&[20, 60, 120]),
            Self::Lcvr | Self::Jump | Self::Ventropy => win(&[1, 5, 20]),
            Self::S0beta => win(&[20, 60, 120]),
        }
    }

    /// Builds the family's algorithm from a group configuration.
    ///
    /// The configuration's class must be this class and its shape must match
    /// [`Self::uses_lambdas`].
    pub fn build(&self, cfg: FactorGroupConfig) -> Result<Box<dyn FactorAlgorithm>> {
        if cfg.class != self.as_str() {
            return Err(HuelvaError::Config(format!(
                "group of class {} handed to the {} builder",
                cfg.class,
                self.as_str()
            )));
        }
        Ok(match self {
            Self::Amp => Box::new(AmpFactor::new(cfg.into_win_lbd()?)?),
            Self::Ctp => Box::new(CtpFactor::new(cfg.into_win_lbd()?)?),
            Self::Cvp => Box::new(CvpFactor::new(cfg.into_win_lbd()?)?),
            Self::Ctr => Box::new(CtrFactor::new(cfg.into_win_lbd()?)?),
            Self::Smt => Box::new(SmtFactor::new(cfg.into_win_lbd()?)?),
            Self::Spdweb => Box::new(SpdwebFactor::new(cfg.into_win_lbd()?)?),
            Self::Wsplit => Box::new(WsplitFactor::new(cfg.into_win_lbd()?)?),
            Self::Basis => Box::new(BasisFactor::new(cfg.into_win()?)?),
            Self::Idr => Box::new(IdrFactor::new(cfg.into_win()?)?),
            Self::Ikurt => Box::new(IkurtFactor::new(cfg.into_win()?)?),
            Self::Kurt => Box::new(KurtFactor::new(cfg.into_win()?)?),
            Self::Lcvr => Box::new(LcvrFactor::new(cfg.into_win()?)?),
            Self::Liquidity => Box::new(LiquidityFactor::new(cfg.into_win()?)?),
            Self::Minor => Box::new(MinorFactor::new(cfg.into_win()?)?),
            Self::Npls => Box::new(NplsFactor::new(cfg.into_win()?)?),
            Self::Rs => Box::new(RsFactor::new(cfg.into_win()?)?),
            Self::Skew => Box::new(SkewFactor::new(cfg.into_win()?)?),
            Self::Tr => Box::new(TrFactor::new(cfg.into_win()?)?),
            Self::Val => Box::new(ValFactor::new(cfg.into_win()?)?),
            Self::Acr => Box::new(AcrFactor::new(cfg.into_win()?)?),
            Self::Cnvg => Box::new(CnvgFactor::new(cfg.into_win()?)?),
            Self::Idv => Box::new(IdvFactor::new(cfg.into_win()?)?),
            Self::Jump => Box::new(JumpFactor::new(cfg.into_win()?)?),
            Self::Mf => Box::new(MfFactor::new(cfg.into_win()?)?),
            Self::Oma => Box::new(OmaFactor::new(cfg.into_win()?)?),
            Self::Onr => Box::new(OnrFactor::new(cfg.into_win()?)?),
            Self::S0beta => Box::new(S0betaFactor::new(cfg.into_win()?)?),
            Self::Size => Box::new(SizeFactor::new(cfg.into_win()?)?),
            Self::Ts => Box::new(TsFactor::new(cfg.into_win()?)?),
            Self::Ventropy => Box::new(VentropyFactor::new(cfg.into_win()?)?),
        })
    }
}

impl fmt::Display for FactorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactorClass {
    type Err = HuelvaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| HuelvaError::UnknownFactorClass(s.to_string()))
    }
}

/// Metadata about a factor family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorInfo {
    /// The family.
    pub class: FactorClass,

    /// Category classification.
    pub category: FactorCategory,

    /// Human-readable description.
    pub description: &'static str,

    /// Whether the family takes quantile fractions.
    pub uses_lambdas: bool,

    /// Longest window of the default configuration.
    pub typical_lookback: usize,
}

impl From<FactorClass> for FactorInfo {
    fn from(class: FactorClass) -> Self {
        Self {
            class,
            category: class.category(),
            description: class.description(),
            uses_lambdas: class.uses_lambdas(),
            typical_lookback: class.default_group().wins.into_iter().max().unwrap_or(0),
        }
    }
}

/// Get information about all available factor families.
#[must_use]
pub fn available_factors() -> Vec<FactorInfo> {
    FactorClass::ALL.into_iter().map(FactorInfo::from).collect()
}

/// Get all families of a category.
#[must_use]
pub fn factors_by_category(category: &FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|info| info.category == *category)
        .collect()
}

/// Get information about a family by its class label.
#[must_use]
pub fn get_factor_info(class: &str) -> Option<FactorInfo> {
    class.parse::<FactorClass>().ok().map(FactorInfo::from)
}

/// The configured factor groups of one run, built and cross-checked.
///
/// Each class appears at most once and every generated factor name is unique
/// across groups.
#[derive(Debug, Default)]
pub struct FactorCatalog {
    algorithms: BTreeMap<FactorClass, Box<dyn FactorAlgorithm>>,
}

impl FactorCatalog {
    /// Builds every group, failing on the first configuration error.
    pub fn new(groups: impl IntoIterator<Item = FactorGroupConfig>) -> Result<Self> {
        let mut algorithms = BTreeMap::new();
        let mut names = BTreeSet::new();
        for cfg in groups {
            let class: FactorClass = cfg.class.parse()?;
            if algorithms.contains_key(&class) {
                return Err(HuelvaError::Config(format!(
                    "factor class {class} is configured twice"
                )));
            }
            let algorithm = class.build(cfg)?;
            for name in algorithm.factor_names() {
                if !names.insert(name.clone()) {
                    return Err(HuelvaError::Config(format!(
                        "factor name {name} is generated by more than one group"
                    )));
                }
            }
            algorithms.insert(class, algorithm);
        }
        Ok(Self { algorithms })
    }

    /// Number of configured groups.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Whether no group is configured.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// The configured classes in order.
    pub fn classes(&self) -> impl Iterator<Item = FactorClass> + '_ {
        self.algorithms.keys().copied()
    }

    /// The algorithm of a configured class.
    pub fn get(&self, class: FactorClass) -> Result<&dyn FactorAlgorithm> {
        self.algorithms
            .get(&class)
            .map(AsRef::as_ref)
            .ok_or_else(|| HuelvaError::Config(format!("factor class {class} is not configured")))
    }

    /// The algorithm of a configured class given by label.
    pub fn get_by_label(&self, class: &str) -> Result<&dyn FactorAlgorithm> {
        self.get(class.parse()?)
    }

    /// The algorithm producing `id`, checking the name belongs to the class.
    pub fn resolve(&self, id: &FactorId) -> Result<&dyn FactorAlgorithm> {
        let algorithm = self.get_by_label(&id.class)?;
        if algorithm.factor_names().iter().any(|n| *n == id.name) {
            Ok(algorithm)
        } else {
            Err(HuelvaError::Config(format!(
                "factor {} is not produced by the configured {} group",
                id.name, id.class
            )))
        }
    }

    /// Every `(class, name)` pair the catalog produces.
    pub fn factor_ids(&self) -> Vec<FactorId> {
        self.algorithms
            .iter()
            .flat_map(|(class, algorithm)| {
                algorithm
                    .factor_names()
                    .into_iter()
                    .map(move |name| FactorId::new(class.as_str(), name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_available_factors() {
        let factors = available_factors();
        assert_eq!(factors.len(), 30);
        let categories: BTreeSet<_> = factors.iter().map(|f| f.category).collect();
        assert_eq!(categories.len(), 6);
    }

    #[test]
    fn test_factors_by_category() {
        assert_eq!(factors_by_category(&FactorCategory::Price).len(), 9);
        assert_eq!(factors_by_category(&FactorCategory::TermStructure).len(), 4);
        assert_eq!(factors_by_category(&FactorCategory::Intraday).len(), 12);
        assert_eq!(factors_by_category(&FactorCategory::Correlation).len(), 3);
        assert_eq!(factors_by_category(&FactorCategory::Positioning).len(), 1);
        assert_eq!(factors_by_category(&FactorCategory::Market).len(), 1);
    }

    #[test]
    fn test_get_factor_info() {
        let info = get_factor_info("AMP").unwrap();
        assert_eq!(info.class, FactorClass::Amp);
        assert!(info.uses_lambdas);
        assert_eq!(info.typical_lookback, 240);
        assert!(get_factor_info("nonexistent").is_none());
    }

    #[rstest]
    #[case("S0BETA", FactorClass::S0beta)]
    #[case("LIQUIDITY", FactorClass::Liquidity)]
    #[case("VENTROPY", FactorClass::Ventropy)]
    fn test_parse_class(#[case] label: &str, #[case] class: FactorClass) {
        assert_eq!(label.parse::<FactorClass>().unwrap(), class);
        assert_eq!(class.to_string(), label);
    }

    #[test]
    fn test_parse_unknown_class() {
        let err = "amp".parse::<FactorClass>().unwrap_err();
        assert!(matches!(err, HuelvaError::UnknownFactorClass(_)));
    }

    #[test]
    fn test_every_default_group_builds() {
        for class in FactorClass::ALL {
            let algorithm = class.build(class.default_group()).unwrap();
            assert_eq!(algorithm.factor_class(), class.as_str());
            assert!(!algorithm.factor_names().is_empty());
        }
    }

    #[test]
    fn test_build_shape_mismatch() {
        let err = FactorClass::Amp
            .build(FactorGroupConfig::win("AMP", vec![20, 240]))
            .unwrap_err();
        assert!(err.is_config());
        let err = FactorClass::Kurt
            .build(FactorGroupConfig::win_lbd("KURT", vec![10, 60], vec![0.5]))
            .unwrap_err();
        assert!(err.is_config());
        let err = FactorClass::Kurt
            .build(FactorGroupConfig::win("SKEW", vec![10, 60]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_catalog_resolve() {
        let catalog = FactorCatalog::new([
            FactorClass::Kurt.default_group(),
            FactorClass::Amp.default_group(),
        ])
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.classes().collect::<Vec<_>>(),
            vec![FactorClass::Amp, FactorClass::Kurt]
        );
        let alg = catalog.resolve(&FactorId::new("AMP", "AMP240L50")).unwrap();
        assert_eq!(alg.factor_class(), "AMP");
        assert!(catalog.resolve(&FactorId::new("AMP", "KURT060")).is_err());
        assert!(catalog.resolve(&FactorId::new("SKEW", "SKEW010")).is_err());
        assert!(catalog.factor_ids().contains(&FactorId::new("KURT", "KURTDIFF")));
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let err = FactorCatalog::new([
            FactorClass::Kurt.default_group(),
            FactorClass::Kurt.default_group(),
        ])
        .unwrap_err();
        assert!(err.is_config());

        let err = FactorCatalog::new([FactorGroupConfig::win("NOPE", vec![5])]).unwrap_err();
        assert!(matches!(err, HuelvaError::UnknownFactorClass(_)));
    }
}
