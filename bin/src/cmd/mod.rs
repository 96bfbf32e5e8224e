//! CLI subcommand modules.
//!
//! This module contains the implementations for all huelva CLI subcommands.

pub(crate) mod combine;
pub(crate) mod data;
pub(crate) mod factor;
pub(crate) mod list;
pub(crate) mod qtest;

use crate::fanout::FailureReport;
use crate::project::SharedProject;
use huelva::traits::{Calendar, HuelvaError, Result, parse_trade_date};

/// A validated project and the `[begin, stop)` range a command runs over.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    pub(crate) project: SharedProject,
    pub(crate) begin: String,
    pub(crate) stop: String,
    pub(crate) parallel: bool,
}

impl Run {
    /// Checks the range against the calendar; `stop` defaults to the last
    /// session.
    pub(crate) fn new(
        project: SharedProject,
        begin: Option<String>,
        stop: Option<String>,
        parallel: bool,
    ) -> Result<Self> {
        let begin =
            begin.ok_or_else(|| HuelvaError::Config("--bgn is required".to_string()))?;
        let stop = stop.unwrap_or_else(|| project.calendar.last_date().to_string());
        parse_trade_date(&begin)?;
        parse_trade_date(&stop)?;
        if begin >= stop {
            return Err(HuelvaError::InvalidDate(format!(
                "empty range [{begin}, {stop})"
            )));
        }
        for date in [&begin, &stop] {
            // Both ends must be sessions.
            project.calendar.next_date(date, 0)?;
        }
        Ok(Self {
            project,
            begin,
            stop,
            parallel,
        })
    }
}

/// Prints a boxed section title.
pub(crate) fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║ {title:^60} ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Every configured item, or only `only` when it is one of them.
pub(crate) fn pick(all: Vec<String>, only: Option<String>, what: &str) -> Result<Vec<String>> {
    match only {
        None => Ok(all),
        Some(name) if all.contains(&name) => Ok(vec![name]),
        Some(name) => Err(HuelvaError::Config(format!("{what} {name} is not configured"))),
    }
}

/// Prints the outcome of a fan-out and fails when any unit failed.
pub(crate) fn finish(report: FailureReport) -> anyhow::Result<()> {
    report.print();
    report.into_result()
}
