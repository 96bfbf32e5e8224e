//! Fan-out of one factor family over a universe of instruments.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use huelva_traits::{
    Calendar, HuelvaError, Instrument, MarketDataSource, Panel, Result, columns, frame_from_parts,
    sort_frame, stack_frames,
};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use tracing::{info, warn};

/// What a failing instrument does to the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure, in universe order, fails the run.
    Abort,
    /// Failures are reported and the remaining instruments are kept.
    #[default]
    Isolate,
}

/// An instrument whose computation failed under [`FailurePolicy::Isolate`].
#[derive(Debug)]
pub struct InstrumentFailure {
    /// The failing instrument.
    pub instrument: Instrument,
    /// Why it failed.
    pub error: HuelvaError,
}

/// The stacked panel of a fan-out plus the instruments left out of it.
#[derive(Debug, Default)]
pub struct FanOut {
    /// `(trade_date, instrument, ticker, factor names...)` sorted by
    /// `(trade_date, instrument)`.
    pub panel: Panel,
    /// Instruments that failed, in universe order.
    pub failures: Vec<InstrumentFailure>,
}

impl FanOut {
    /// Whether every instrument succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a [`FactorAlgorithm`] for every instrument of a universe.
///
/// Instruments are independent, so they are computed on the rayon pool unless
/// parallelism is switched off.
#[derive(Debug, Clone, Copy)]
pub struct FactorDriver {
    policy: FailurePolicy,
    parallel: bool,
}

impl Default for FactorDriver {
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

impl FactorDriver {
    /// A parallel driver with the given failure policy.
    pub const fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            parallel: true,
        }
    }

    /// Switches between the rayon pool and a serial loop.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The failure policy.
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Computes `algorithm` for each instrument over `[begin, stop)` and
    /// stacks the results.
    pub fn run(
        &self,
        algorithm: &dyn FactorAlgorithm,
        universe: &[Instrument],
        begin: &str,
        stop: &str,
        calendar: &dyn Calendar,
        source: &dyn MarketDataSource,
    ) -> Result<FanOut> {
        info!(
            class = algorithm.factor_class(),
            instruments = universe.len(),
            begin,
            stop,
            "computing factor family"
        );
        let compute = |instrument: &Instrument| {
            let request = InstrumentRequest::new(instrument, begin, stop, calendar, source);
            (instrument.clone(), algorithm.compute(&request))
        };
        let outcomes: Vec<(Instrument, Result<DataFrame>)> = if self.parallel {
            universe.par_iter().map(compute).collect()
        } else {
            universe.iter().map(compute).collect()
        };

        let mut frames = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (instrument, outcome) in outcomes {
            match outcome {
                Ok(frame) => frames.push(frame),
                Err(error) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(HuelvaError::for_instrument(instrument, error));
                    }
                    FailurePolicy::Isolate => {
                        warn!(
                            class = algorithm.factor_class(),
                            %instrument,
                            %error,
                            "instrument failed, left out of the panel"
                        );
                        failures.push(InstrumentFailure { instrument, error });
                    }
                },
            }
        }

        let panel = if frames.is_empty() {
            empty_output(&algorithm.factor_names())?
        } else {
            sort_frame(
                &stack_frames(frames)?,
                &[columns::TRADE_DATE, columns::INSTRUMENT],
            )?
        };
        info!(
            class = algorithm.factor_class(),
            rows = panel.height(),
            failed = failures.len(),
            "factor family computed"
        );
        Ok(FanOut {
            panel: Panel::new(panel),
            failures,
        })
    }
}

/// A zero-row panel with the output schema of `names`.
fn empty_output(names: &[String]) -> Result<DataFrame> {
    let values: Vec<(String, Vec<f64>)> = names.iter().map(|n| (n.clone(), Vec::new())).collect();
    frame_from_parts(
        vec![
            (columns::TRADE_DATE, Vec::new()),
            (columns::INSTRUMENT, Vec::new()),
            (columns::TICKER, Vec::new()),
        ],
        &values,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use crate::group::WinGroup;
    use crate::price::KurtFactor;

    fn kurt() -> KurtFactor {
        KurtFactor::new(WinGroup::new("KURT", vec![10, 60]).unwrap()).unwrap()
    }

    fn universe(names: &[&str]) -> Vec<Instrument> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_stacks_sorted() {
        let fixture = Fixture::with_instruments(&["CU", "AL"]);
        let (begin, stop) = fixture.range();
        let out = FactorDriver::default()
            .run(
                &kurt(),
                &universe(&["CU", "AL"]),
                begin,
                stop,
                &fixture.calendar,
                &fixture.source,
            )
            .unwrap();
        assert!(out.is_complete());
        assert_eq!(out.panel.len(), 6);
        let instruments = out.panel.instruments().unwrap();
        assert_eq!(&instruments[..2], &["AL", "CU"]);
        let dates = out.panel.dates().unwrap();
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        assert!(out.panel.has_column("KURTDIFF"));
    }

    #[test]
    fn test_isolate_reports_failures() {
        let fixture = Fixture::new();
        let (begin, stop) = fixture.range();
        let out = FactorDriver::new(FailurePolicy::Isolate)
            .with_parallel(false)
            .run(
                &kurt(),
                &universe(&["CU", "ZN"]),
                begin,
                stop,
                &fixture.calendar,
                &fixture.source,
            )
            .unwrap();
        assert_eq!(out.panel.len(), 3);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].instrument, "ZN");
    }

    #[test]
    fn test_abort_names_instrument() {
        let fixture = Fixture::new();
        let (begin, stop) = fixture.range();
        let err = FactorDriver::new(FailurePolicy::Abort)
            .run(
                &kurt(),
                &universe(&["ZN", "CU"]),
                begin,
                stop,
                &fixture.calendar,
                &fixture.source,
            )
            .unwrap_err();
        match err {
            HuelvaError::Instrument { instrument, .. } => assert_eq!(instrument, "ZN"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_all_failed_keeps_schema() {
        let fixture = Fixture::new();
        let (begin, stop) = fixture.range();
        let out = FactorDriver::default()
            .run(
                &kurt(),
                &universe(&["ZN"]),
                begin,
                stop,
                &fixture.calendar,
                &fixture.source,
            )
            .unwrap();
        assert!(out.panel.is_empty());
        assert_eq!(
            out.panel.columns(),
            vec!["trade_date", "instrument", "ticker", "KURT010", "KURT060", "KURTDIFF"]
        );
    }
}
