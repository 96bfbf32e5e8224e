//! Universe-level stages: availability, cross-section statistics, forward
//! test returns and instrument covariances.

use super::{Run, finish};
use crate::fanout::{Unit, run_units};
use crate::project::{Project, rows_written};
use anyhow::Result;
use huelva::eval::{AvailableUniverse, CovarianceEstimator, CrossSectionStats, TestReturnCalculator};
use huelva::store::TableSchema;
use huelva::traits::{MarketDataSource, Panel, ReturnSpec, columns};

/// Computes the available universe and appends it.
pub(crate) async fn available(run: &Run) -> Result<()> {
    let (project, begin, stop) = (run.project.clone(), run.begin.clone(), run.stop.clone());
    let unit = Unit::new("available", move || {
        let universe =
            AvailableUniverse::new(project.config.available, project.config.universe.clone());
        let panel = universe.compute(&begin, &stop, &project.calendar, &project.source)?;
        let outcome = project.append(
            &project.available_path(),
            TableSchema::availability(),
            &panel,
        )?;
        Ok(format!("{} rows, {} written", panel.len(), rows_written(&outcome)))
    });
    finish(run_units("available", vec![unit], run.parallel).await)
}

/// Computes the cross-section statistics and throttle from the available
/// universe and the sector indices.
pub(crate) async fn css(run: &Run) -> Result<()> {
    let (project, begin, stop) = (run.project.clone(), run.begin.clone(), run.stop.clone());
    let unit = Unit::new("css", move || {
        let stats = CrossSectionStats::new(project.config.css.clone());
        let buffer = stats.buffer_begin(&begin, &project.calendar)?;
        let available = project.read_available(&buffer, &stop)?;
        let mut fields = vec![columns::TRADE_DATE];
        fields.extend(project.config.css.sectors.iter().map(String::as_str));
        let index = project.source.load_market_index(&buffer, &stop, &fields)?;
        let panel = stats.compute(&available, &Panel::new(index), &begin)?;
        let outcome = project.append(
            &project.css_path(),
            TableSchema::cross_section(&project.config.css.sectors),
            &panel,
        )?;
        Ok(format!("{} dates, {} written", panel.len(), rows_written(&outcome)))
    });
    finish(run_units("css", vec![unit], run.parallel).await)
}

fn test_return_unit(run: &Run, ret: ReturnSpec) -> Unit {
    let (project, begin, stop) = (run.project.clone(), run.begin.clone(), run.stop.clone());
    Unit::new(ret.name(), move || {
        let calculator = TestReturnCalculator::new(ret);
        let (base_begin, base_stop) = calculator.base_range(&begin, &stop, &project.calendar)?;
        let available = project.read_available(&base_begin, &base_stop)?;
        let panel = calculator.compute(
            &project.universe(),
            &begin,
            &stop,
            &project.calendar,
            &project.source,
            &available,
        )?;
        let name = ret.name();
        let outcome = project.append(
            &project.test_return_path(&name),
            TableSchema::test_return(&name),
            &panel,
        )?;
        Ok(format!("{} rows, {} written", panel.len(), rows_written(&outcome)))
    })
}

/// Computes every configured forward return, one unit per return.
pub(crate) async fn test_returns(run: &Run) -> Result<()> {
    let units = run
        .project
        .config
        .test_returns()
        .into_iter()
        .map(|ret| test_return_unit(run, ret))
        .collect();
    finish(run_units("test-return", units, run.parallel).await)
}

fn estimate_covariance(project: &Project, begin: &str, stop: &str) -> huelva::Result<String> {
    let estimator = CovarianceEstimator::new(project.config.covariance.win);
    let buffer = estimator.buffer_begin(begin, &project.calendar)?;
    let available = project.read_available(&buffer, stop)?;
    let panel = estimator.compute(&available, begin)?;
    let outcome = project.append(&project.covariance_path(), TableSchema::covariance(), &panel)?;
    Ok(format!("{} pairs, {} written", panel.len(), rows_written(&outcome)))
}

/// Estimates trailing instrument covariances of the available universe.
pub(crate) async fn covariance(run: &Run) -> Result<()> {
    let (project, begin, stop) = (run.project.clone(), run.begin.clone(), run.stop.clone());
    let unit = Unit::new("covariance", move || estimate_covariance(&project, &begin, &stop));
    finish(run_units("covariance", vec![unit], run.parallel).await)
}
