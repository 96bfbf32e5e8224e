//! Factor computation command implementation.

use super::{Run, finish, pick};
use crate::fanout::{Unit, run_units};
use crate::project::Project;
use anyhow::Result;
use huelva::factors::{FactorDriver, FailurePolicy};
use huelva::traits::HuelvaError;

fn compute_family(
    project: &Project,
    factor_class: &str,
    driver: FactorDriver,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let algorithm = project.catalog.get_by_label(factor_class)?;
    let fan_out = driver.run(
        algorithm,
        &project.universe(),
        begin,
        stop,
        &project.calendar,
        &project.source,
    )?;
    // Instruments that succeeded are persisted before the failures are raised.
    let written = project.write_factors(factor_class, &fan_out.panel)?;
    if !fan_out.is_complete() {
        let failed: Vec<String> = fan_out
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.instrument, f.error))
            .collect();
        return Err(HuelvaError::DataContract(format!(
            "{factor_class}: {} of {} instruments failed ({}), {written} rows written",
            failed.len(),
            project.config.universe.len(),
            failed.join("; ")
        )));
    }
    Ok(format!("{} rows, {written} written", fan_out.panel.len()))
}

/// Computes factor families, one unit per class.
///
/// Instruments inside a family run in parallel; with `abort` the first
/// failing instrument fails its family, otherwise failures are isolated and
/// reported once the others are written.
pub(crate) async fn factors(run: &Run, fclass: Option<String>, abort: bool) -> Result<()> {
    let all: Vec<String> = run.project.catalog.classes().map(|c| c.to_string()).collect();
    let policy = if abort {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Isolate
    };
    let units = pick(all, fclass, "factor class")?
        .into_iter()
        .map(|class| {
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            let driver = FactorDriver::new(policy).with_parallel(run.parallel);
            Unit::new(class.clone(), move || {
                compute_family(&project, &class, driver, &begin, &stop)
            })
        })
        .collect();
    finish(run_units("factor", units, run.parallel).await)
}
