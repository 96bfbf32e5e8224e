//! Unit-level fan-out.
//!
//! A command splits into independent units (one per factor class, return,
//! strategy...). Each unit runs on the blocking pool, opens its own tables
//! and writes its own output. A failing unit never stops its siblings; the
//! failures are collected into a [`FailureReport`].

use huelva::traits::Result;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Work of one unit, returning a short summary line.
pub(crate) type Job = Box<dyn FnOnce() -> Result<String> + Send + 'static>;

/// A labelled unit of work.
pub(crate) struct Unit {
    label: String,
    job: Job,
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit").field("label", &self.label).finish_non_exhaustive()
    }
}

impl Unit {
    pub(crate) fn new<F>(label: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Result<String> + Send + 'static,
    {
        Self {
            label: label.into(),
            job: Box::new(job),
        }
    }
}

/// A unit that failed, with its rendered error chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnitFailure {
    pub(crate) label: String,
    pub(crate) error: String,
}

/// Outcome of a fan-out.
#[derive(Debug, Default)]
pub(crate) struct FailureReport {
    pub(crate) command: String,
    pub(crate) succeeded: Vec<(String, String)>,
    pub(crate) failures: Vec<UnitFailure>,
}

impl FailureReport {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, label: String, outcome: std::result::Result<String, String>) {
        match outcome {
            Ok(summary) => {
                info!(command = %self.command, unit = %label, %summary, "unit finished");
                self.succeeded.push((label, summary));
            }
            Err(error) => {
                error!(command = %self.command, unit = %label, %error, "unit failed");
                self.failures.push(UnitFailure { label, error });
            }
        }
    }

    /// Number of units run.
    pub(crate) fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// Whether every unit succeeded.
    pub(crate) fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Prints the per-unit outcome.
    pub(crate) fn print(&self) {
        println!();
        for (label, summary) in &self.succeeded {
            println!("  ok    {label:30} {summary}");
        }
        for failure in &self.failures {
            println!("  FAIL  {:30} {}", failure.label, failure.error);
        }
        println!(
            "\n{}: {} of {} units succeeded\n",
            self.command,
            self.succeeded.len(),
            self.total()
        );
    }

    /// An error when any unit failed.
    pub(crate) fn into_result(self) -> anyhow::Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            let labels: Vec<&str> = self.failures.iter().map(|f| f.label.as_str()).collect();
            Err(anyhow::anyhow!(
                "{}: {} of {} units failed ({})",
                self.command,
                self.failures.len(),
                self.total(),
                labels.join(", ")
            ))
        }
    }
}

fn render(err: &huelva::traits::HuelvaError) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Runs every unit and collects the outcomes.
///
/// With `parallel` the units share the blocking pool; otherwise they run one
/// after the other in the given order.
pub(crate) async fn run_units(command: &str, units: Vec<Unit>, parallel: bool) -> FailureReport {
    let started = Instant::now();
    let mut report = FailureReport::new(command);
    info!(command, units = units.len(), parallel, "starting units");

    let run = |unit: Unit| {
        let Unit { label, job } = unit;
        let handle = tokio::task::spawn_blocking(move || job().map_err(|e| render(&e)));
        (label, handle)
    };

    if parallel {
        let mut set = JoinSet::new();
        for unit in units {
            let (label, handle) = run(unit);
            set.spawn(async move {
                let outcome = handle.await.unwrap_or_else(|e| Err(format!("unit panicked: {e}")));
                (label, outcome)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((label, outcome)) => report.record(label, outcome),
                Err(e) => report.record("<unknown>".to_string(), Err(format!("join error: {e}"))),
            }
        }
    } else {
        for unit in units {
            let (label, handle) = run(unit);
            let outcome = handle.await.unwrap_or_else(|e| Err(format!("unit panicked: {e}")));
            report.record(label, outcome);
        }
    }

    info!(
        command,
        succeeded = report.succeeded.len(),
        failed = report.failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "units finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use huelva::traits::HuelvaError;

    fn units() -> Vec<Unit> {
        vec![
            Unit::new("a", || Ok("1 row".to_string())),
            Unit::new("b", || Err(HuelvaError::Config("bad".to_string()))),
            Unit::new("c", || {
                Err(HuelvaError::for_instrument(
                    "AL",
                    HuelvaError::MissingColumn("close".to_string()),
                ))
            }),
        ]
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_siblings() {
        for parallel in [true, false] {
            let report = run_units("test", units(), parallel).await;
            assert_eq!(report.total(), 3);
            assert_eq!(report.succeeded, vec![("a".to_string(), "1 row".to_string())]);
            let mut labels: Vec<&str> = report.failures.iter().map(|f| f.label.as_str()).collect();
            labels.sort_unstable();
            assert_eq!(labels, vec!["b", "c"]);
            assert!(!report.is_clean());
            let err = report.into_result().unwrap_err().to_string();
            assert!(err.contains("2 of 3 units failed"));
        }
    }

    #[tokio::test]
    async fn test_error_chain_is_rendered() {
        let report = run_units("test", units().split_off(2), false).await;
        assert!(report.failures[0].error.contains("AL"));
        assert!(report.failures[0].error.contains("close"));
    }

    #[tokio::test]
    async fn test_clean_run() {
        let report = run_units("test", units().into_iter().take(1).collect(), true).await;
        assert!(report.is_clean());
        assert!(report.into_result().is_ok());
    }
}
