//! Cross-sectional factor tests.
//!
//! A test aligns forward returns with a factor panel on
//! `(trade_date, instrument)`, attaches the volatility of the available
//! panel, and scores every trading date with a [`Scorer`]:
//!
//! - IC: rank correlation between each factor and the forward return
//! - VT: return of an exponential rank-weight spread portfolio
//! - OT: return of a Sharpe-optimized portfolio seeded from factor ranks
//!
//! Volatility-adjusted variants (`-va`) divide weights by volatility. The
//! score of factor date `t` is only known once the return is realized, so it
//! is stamped on `t + shift`.

use crate::covariance::CovarianceBook;
use derive_more::Display;
use huelva_math::{
    SharpeProblem, average_rank, gen_exp_weight, map_to_weight, spearman, stats, wcorr,
};
use huelva_traits::{
    Calendar, HuelvaError, Instrument, Panel, Result, ReturnSpec, TradeDate, columns,
    float_values, frame_from_parts, join_on_keys, sort_frame, text_values,
};
use polars::prelude::{DataFrame, JoinType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Decay rate of the VT spread portfolio.
pub const VT_RATE: f64 = 0.25;
/// Decay rate of the OT initial guess.
pub const OT_RATE: f64 = 0.25;

/// The three cross-sectional tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Rank information coefficient.
    #[display("ic")]
    Ic,
    /// Exponential rank-weight spread return.
    #[display("vt")]
    Vt,
    /// Optimized-tilt portfolio return.
    #[display("ot")]
    Ot,
}

impl TestKind {
    /// Every kind.
    pub const ALL: [Self; 3] = [Self::Ic, Self::Vt, Self::Ot];

    /// Lowercase tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ic => "ic",
            Self::Vt => "vt",
            Self::Ot => "ot",
        }
    }

    /// Table holding the scores: `ic`, `ic-va`, `vt`, ...
    pub fn table_name(&self, weighted: bool) -> String {
        if weighted {
            format!("{}-va", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }

    /// Whether scores are portfolio returns rather than correlations.
    pub const fn scores_returns(&self) -> bool {
        !matches!(self, Self::Ic)
    }
}

impl FromStr for TestKind {
    type Err = HuelvaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ic" => Ok(Self::Ic),
            "vt" => Ok(Self::Vt),
            "ot" => Ok(Self::Ot),
            other => Err(HuelvaError::Config(format!(
                "unknown test kind {other:?}, expected ic, vt or ot"
            ))),
        }
    }
}

/// One trading date of aligned test inputs.
#[derive(Debug, Clone, Default)]
pub struct CrossSection {
    /// Factor date.
    pub trade_date: TradeDate,
    /// Instruments in ascending order.
    pub instruments: Vec<Instrument>,
    /// Forward return per instrument.
    pub returns: Vec<f64>,
    /// Volatility per instrument, `NaN` when unavailable.
    pub volatility: Vec<f64>,
    /// One vector per factor, aligned with `instruments`.
    pub factors: Vec<Vec<f64>>,
}

impl CrossSection {
    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Whether the date has no instruments.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Volatility with missing values replaced by the date's median.
    pub fn filled_volatility(&self) -> Vec<f64> {
        let median = stats::median(&self.volatility);
        self.volatility
            .iter()
            .map(|v| if v.is_nan() { median } else { *v })
            .collect()
    }
}

/// Scores one cross section, one value per factor.
///
/// Degenerate dates score `NaN`; scoring never fails.
pub trait Scorer: Send + Sync {
    /// The test this scorer implements.
    fn kind(&self) -> TestKind;

    /// Whether weights are volatility adjusted.
    fn weighted(&self) -> bool;

    /// Scores every factor of `section`.
    fn score(&self, section: &CrossSection) -> Vec<f64>;
}

/// Spearman rank correlation between factor and forward return.
///
/// The weighted variant correlates ranks under `1 / volatility` weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcScorer {
    weighted: bool,
}

impl IcScorer {
    /// Creates the scorer.
    pub const fn new(weighted: bool) -> Self {
        Self { weighted }
    }
}

impl Scorer for IcScorer {
    fn kind(&self) -> TestKind {
        TestKind::Ic
    }

    fn weighted(&self) -> bool {
        self.weighted
    }

    fn score(&self, section: &CrossSection) -> Vec<f64> {
        if !self.weighted {
            return section
                .factors
                .iter()
                .map(|f| spearman(f, &section.returns))
                .collect();
        }
        let vol = section.filled_volatility();
        section
            .factors
            .iter()
            .map(|f| {
                let rows: Vec<usize> = (0..section.len())
                    .filter(|&i| {
                        f[i].is_finite() && section.returns[i].is_finite() && vol[i] > 0.0
                    })
                    .collect();
                if rows.len() < 2 {
                    return f64::NAN;
                }
                let pick = |v: &[f64]| rows.iter().map(|&i| v[i]).collect::<Vec<f64>>();
                let w: Vec<f64> = rows.iter().map(|&i| 1.0 / vol[i]).collect();
                wcorr(
                    &average_rank(&pick(f)),
                    &average_rank(&pick(&section.returns)),
                    &w,
                )
            })
            .collect()
    }
}

/// Indices ordering `values` descending, missing values last.
fn descending(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| match (values[a].is_nan(), values[b].is_nan()) {
        (false, false) => values[b].total_cmp(&values[a]),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
    order
}

/// Dot product of returns with weights normalized to `Σ|w| = 1`, per
/// session of the return window.
fn normalized_return(returns: &[f64], weights: &[f64], ret_win: usize) -> f64 {
    let total: f64 = weights.iter().map(|w| w.abs()).sum();
    if total.is_nan() || total <= 0.0 {
        return f64::NAN;
    }
    let dot: f64 = returns.iter().zip(weights).map(|(r, w)| r * w / total).sum();
    dot / ret_win as f64
}

/// Return of the exponential rank-weight spread portfolio.
#[derive(Debug, Clone, Copy)]
pub struct VtScorer {
    weighted: bool,
    ret_win: usize,
}

impl VtScorer {
    /// Creates the scorer for a return over `ret_win` sessions.
    pub const fn new(weighted: bool, ret_win: usize) -> Self {
        Self { weighted, ret_win }
    }
}

impl Scorer for VtScorer {
    fn kind(&self) -> TestKind {
        TestKind::Vt
    }

    fn weighted(&self) -> bool {
        self.weighted
    }

    fn score(&self, section: &CrossSection) -> Vec<f64> {
        let wgt = gen_exp_weight(section.len(), VT_RATE);
        let vol = section.filled_volatility();
        section
            .factors
            .iter()
            .map(|f| {
                let order = descending(f);
                let returns: Vec<f64> = order.iter().map(|&i| section.returns[i]).collect();
                let weights: Vec<f64> = order
                    .iter()
                    .zip(&wgt)
                    .map(|(&i, w)| if self.weighted { w / vol[i] } else { *w })
                    .collect();
                normalized_return(&returns, &weights, self.ret_win)
            })
            .collect()
    }
}

/// Bounds and budget of the OT portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtConfig {
    /// Per-instrument bound is `±bound_scale / k`.
    pub bound_scale: f64,
    /// Lower end of the `Σ|w|` band.
    pub budget_low: f64,
    /// Upper end of the `Σ|w|` band.
    pub budget_high: f64,
}

impl Default for OtConfig {
    fn default() -> Self {
        Self {
            bound_scale: 3.0,
            budget_low: 0.8,
            budget_high: 1.2,
        }
    }
}

/// Return of a bounded Sharpe-maximizing portfolio.
///
/// The factor's exponential rank weights serve as both the expected return
/// and the initial guess; the covariance comes from the covariance store at
/// the factor date.
#[derive(Debug, Clone, Copy)]
pub struct OtScorer<'a> {
    weighted: bool,
    ret_win: usize,
    book: &'a CovarianceBook,
    config: OtConfig,
}

impl<'a> OtScorer<'a> {
    /// Creates the scorer.
    pub const fn new(
        weighted: bool,
        ret_win: usize,
        book: &'a CovarianceBook,
        config: OtConfig,
    ) -> Self {
        Self {
            weighted,
            ret_win,
            book,
            config,
        }
    }

    fn optimize(&self, section: &CrossSection, factor: &[f64], vol: &[f64]) -> Option<Vec<f64>> {
        let k = section.len();
        let cov = self.book.matrix(&section.trade_date, &section.instruments)?;
        let mut x0 = map_to_weight(factor, OT_RATE);
        if self.weighted {
            for (x, v) in x0.iter_mut().zip(vol) {
                *x /= v;
            }
            let total: f64 = x0.iter().map(|x| x.abs()).sum();
            if total.is_nan() || total <= 0.0 {
                return None;
            }
            x0.iter_mut().for_each(|x| *x /= total);
        }
        let bound = self.config.bound_scale / k as f64;
        let problem = SharpeProblem::new(x0.clone(), cov.values().clone(), x0)
            .and_then(|p| p.with_bounds(vec![-bound; k], vec![bound; k]))
            .ok()?
            .with_budget(self.config.budget_low, self.config.budget_high);
        let outcome = problem.solve();
        if !outcome.improved {
            debug!(
                date = %section.trade_date,
                sharpe = outcome.sharpe,
                "optimized tilt kept its initial guess"
            );
        }
        Some(outcome.weights)
    }
}

impl Scorer for OtScorer<'_> {
    fn kind(&self) -> TestKind {
        TestKind::Ot
    }

    fn weighted(&self) -> bool {
        self.weighted
    }

    fn score(&self, section: &CrossSection) -> Vec<f64> {
        let nan = || vec![f64::NAN; section.factors.len()];
        if section.len() < 2 {
            return nan();
        }
        if !self.book.contains(&section.trade_date) {
            warn!(date = %section.trade_date, "no covariance for the date");
            return nan();
        }
        let vol = section.filled_volatility();
        section
            .factors
            .iter()
            .map(|f| match self.optimize(section, f, &vol) {
                Some(w) => normalized_return(&section.returns, &w, self.ret_win),
                None => f64::NAN,
            })
            .collect()
    }
}

/// Builds the scorer of `kind`; OT needs a covariance book.
pub fn scorer_for<'a>(
    kind: TestKind,
    weighted: bool,
    ret: &ReturnSpec,
    book: Option<&'a CovarianceBook>,
    ot: OtConfig,
) -> Result<Box<dyn Scorer + 'a>> {
    Ok(match kind {
        TestKind::Ic => Box::new(IcScorer::new(weighted)),
        TestKind::Vt => Box::new(VtScorer::new(weighted, ret.win)),
        TestKind::Ot => {
            let book = book.ok_or_else(|| {
                HuelvaError::Config("the ot test needs covariances".to_string())
            })?;
            Box::new(OtScorer::new(weighted, ret.win, book, ot))
        }
    })
}

/// One factor family tested against one forward return.
#[derive(Debug, Clone)]
pub struct QTest {
    factor_class: String,
    factor_names: Vec<String>,
    ret: ReturnSpec,
    decay: usize,
}

impl QTest {
    /// Creates a test of `factor_names` (smoothed with `decay`) against `ret`.
    pub fn new(
        factor_class: impl Into<String>,
        factor_names: Vec<String>,
        ret: ReturnSpec,
        decay: usize,
    ) -> Self {
        Self {
            factor_class: factor_class.into(),
            factor_names,
            ret,
            decay,
        }
    }

    /// `{class}-{ret}-{decay}`, the store and report identifier.
    pub fn save_id(&self) -> String {
        format!("{}-{}-{}", self.factor_class, self.ret, self.decay)
    }

    /// The factor family tested.
    pub fn factor_class(&self) -> &str {
        &self.factor_class
    }

    /// The factor names scored.
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    /// The forward return.
    pub const fn ret(&self) -> ReturnSpec {
        self.ret
    }

    /// Factor dates whose scores are stamped inside `[begin, stop)`.
    pub fn input_range(
        &self,
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
    ) -> Result<(TradeDate, TradeDate)> {
        let shift = -(self.ret.shift() as i64);
        Ok((
            calendar.next_date(begin, shift)?,
            calendar.next_date(stop, shift)?,
        ))
    }

    /// Joins returns, factors and volatility into per-date cross sections.
    ///
    /// # Errors
    ///
    /// [`HuelvaError::RowCountMismatch`] when the inner join of returns and
    /// factors loses rows of either side.
    pub fn align(
        &self,
        returns: &Panel,
        factors: &Panel,
        available: &Panel,
    ) -> Result<Vec<CrossSection>> {
        let ret_name = self.ret.name();
        let keys = [columns::TRADE_DATE, columns::INSTRUMENT];
        let ret_cols: Vec<&str> = vec![columns::TRADE_DATE, columns::INSTRUMENT, ret_name.as_str()];
        let mut factor_cols: Vec<&str> = keys.to_vec();
        factor_cols.extend(self.factor_names.iter().map(String::as_str));
        returns.require_columns(&ret_cols)?;
        factors.require_columns(&factor_cols)?;
        available.require_columns(&[
            columns::TRADE_DATE,
            columns::INSTRUMENT,
            columns::VOLATILITY,
        ])?;

        let returns = returns.data().select(ret_cols)?;
        let factors = factors.data().select(factor_cols)?;
        let joined = join_on_keys(&returns, &factors, JoinType::Inner)?;
        for expected in [returns.height(), factors.height()] {
            if joined.height() != expected {
                return Err(HuelvaError::RowCountMismatch {
                    context: format!("{} returns x factors", self.save_id()),
                    joined: joined.height(),
                    expected,
                });
            }
        }
        let volatility = available
            .data()
            .select([columns::TRADE_DATE, columns::INSTRUMENT, columns::VOLATILITY])?;
        let input = sort_frame(
            &join_on_keys(&joined, &volatility, JoinType::Left)?,
            &keys,
        )?;
        sections(&input, &ret_name, &self.factor_names)
    }

    /// Scores every date and stamps the scores on `t + shift`.
    ///
    /// The result has `trade_date` followed by one column per factor.
    pub fn run(
        &self,
        scorer: &dyn Scorer,
        returns: &Panel,
        factors: &Panel,
        available: &Panel,
        calendar: &dyn Calendar,
    ) -> Result<Panel> {
        let sections = self.align(returns, factors, available)?;
        let shift = self.ret.shift() as i64;
        let scored: Vec<(TradeDate, Vec<f64>)> = sections
            .par_iter()
            .map(|s| -> Result<(TradeDate, Vec<f64>)> {
                Ok((calendar.next_date(&s.trade_date, shift)?, scorer.score(s)))
            })
            .collect::<Result<_>>()?;

        let dates: Vec<TradeDate> = scored.iter().map(|(d, _)| d.clone()).collect();
        let values: Vec<(String, Vec<f64>)> = self
            .factor_names
            .iter()
            .enumerate()
            .map(|(j, name)| (name.clone(), scored.iter().map(|(_, s)| s[j]).collect()))
            .collect();
        let out = frame_from_parts(vec![(columns::TRADE_DATE, dates)], &values)?;
        info!(
            test = %scorer.kind().table_name(scorer.weighted()),
            id = %self.save_id(),
            dates = out.height(),
            "factor test finished"
        );
        Ok(Panel::new(out))
    }
}

fn sections(
    input: &DataFrame,
    ret_name: &str,
    factor_names: &[String],
) -> Result<Vec<CrossSection>> {
    let dates = text_values(input, columns::TRADE_DATE)?;
    let instruments = text_values(input, columns::INSTRUMENT)?;
    let returns = float_values(input, ret_name)?;
    let volatility = float_values(input, columns::VOLATILITY)?;
    let factors: Vec<Vec<f64>> = factor_names
        .iter()
        .map(|n| float_values(input, n))
        .collect::<Result<_>>()?;

    let mut out: Vec<CrossSection> = Vec::new();
    for i in 0..dates.len() {
        if out.last().is_none_or(|s| s.trade_date != dates[i]) {
            out.push(CrossSection {
                trade_date: dates[i].clone(),
                factors: vec![Vec::new(); factors.len()],
                ..CrossSection::default()
            });
        }
        if let Some(section) = out.last_mut() {
            section.instruments.push(instruments[i].clone());
            section.returns.push(returns[i]);
            section.volatility.push(volatility[i]);
            for (dst, src) in section.factors.iter_mut().zip(&factors) {
                dst.push(src[i]);
            }
        }
    }
    Ok(out)
}
