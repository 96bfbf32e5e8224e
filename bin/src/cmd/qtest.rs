//! Factor test, yearly report and factor correlation commands.

use super::{Run, banner, finish, pick};
use crate::fanout::{Unit, run_units};
use crate::project::{Project, rows_written};
use anyhow::Result;
use huelva::eval::{CovarianceBook, QTest, TestKind, YearlyReport, factor_correlation, scorer_for};
use huelva::store::TableSchema;
use huelva::traits::{HuelvaError, ReturnSpec};
use std::fs;

fn qtest_of(project: &Project, factor_class: &str, ret: ReturnSpec) -> huelva::Result<QTest> {
    let names = project.catalog.get_by_label(factor_class)?.factor_names();
    Ok(QTest::new(
        factor_class,
        names,
        ret,
        project.config.decay_of(factor_class),
    ))
}

fn run_qtest(
    project: &Project,
    test: &QTest,
    kind: TestKind,
    weighted: bool,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let (in_begin, in_stop) = test.input_range(begin, stop, &project.calendar)?;
    let ret = test.ret();
    let factors = project.read_available_factors(test.factor_class(), &in_begin, &in_stop)?;
    let returns = project.read_table(
        &project.test_return_path(&ret.name()),
        TableSchema::test_return(&ret.name()),
        &in_begin,
        &in_stop,
    )?;
    let available = project.read_available(&in_begin, &in_stop)?;
    let book = match kind {
        TestKind::Ot => Some(CovarianceBook::from_panel(
            &project.read_covariance(&in_begin, &in_stop)?,
        )?),
        TestKind::Ic | TestKind::Vt => None,
    };
    let scorer = scorer_for(kind, weighted, &ret, book.as_ref(), project.config.ot)?;
    let results = test.run(
        scorer.as_ref(),
        &returns,
        &factors,
        &available,
        &project.calendar,
    )?;
    let outcome = project.append(
        &project.qtest_path(&test.save_id()),
        TableSchema::test_result(&kind.table_name(weighted), test.factor_names()),
        &results,
    )?;
    Ok(format!("{} dates, {} written", results.len(), rows_written(&outcome)))
}

fn units_for<F>(run: &Run, fclass: Option<String>, label: &str, job: F) -> Result<Vec<Unit>>
where
    F: Fn(&Project, &QTest, &str, &str) -> huelva::Result<String> + Copy + Send + 'static,
{
    let all: Vec<String> = run.project.catalog.classes().map(|c| c.to_string()).collect();
    let mut units = Vec::new();
    for class in pick(all, fclass, "factor class")? {
        for ret in run.project.config.qtest_returns() {
            let test = qtest_of(&run.project, &class, ret)?;
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            units.push(Unit::new(
                format!("{label} {}", test.save_id()),
                move || job(&project, &test, &begin, &stop),
            ));
        }
    }
    Ok(units)
}

/// Tests factor families against every tested return, one unit per
/// `(class, return)`.
pub(crate) async fn qtest(
    run: &Run,
    kind: TestKind,
    fclass: Option<String>,
    weighted: bool,
) -> Result<()> {
    let label = kind.table_name(weighted);
    let units = units_for(run, fclass, &label, move |project, test, begin, stop| {
        run_qtest(project, test, kind, weighted, begin, stop)
    })?;
    finish(run_units("qtest", units, run.parallel).await)
}

fn write_report(
    project: &Project,
    test: &QTest,
    kind: TestKind,
    weighted: bool,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let table = kind.table_name(weighted);
    let results = project.read_table(
        &project.qtest_path(&test.save_id()),
        TableSchema::test_result(&table, test.factor_names()),
        begin,
        stop,
    )?;
    if results.is_empty() {
        return Err(HuelvaError::InsufficientData(format!(
            "no {table} results for {} in [{begin}, {stop})",
            test.save_id()
        )));
    }
    let report = YearlyReport::from_results(test.save_id(), kind, &results, test.factor_names())?;
    let path = report.save(&project.report_dir(&table))?;
    Ok(format!("{} rows -> {}", report.len(), path.display()))
}

/// Summarizes stored test results by year, one report per
/// `(class, return)`.
pub(crate) async fn report(
    run: &Run,
    kind: TestKind,
    fclass: Option<String>,
    weighted: bool,
) -> Result<()> {
    let label = kind.table_name(weighted);
    let units = units_for(run, fclass, &label, move |project, test, begin, stop| {
        write_report(project, test, kind, weighted, begin, stop)
    })?;
    finish(run_units("report", units, run.parallel).await)
}

fn class_of(project: &Project, name: &str) -> huelva::Result<String> {
    project
        .catalog
        .factor_ids()
        .into_iter()
        .find(|id| id.name == name)
        .map(|id| id.class)
        .ok_or_else(|| HuelvaError::Config(format!("factor {name} is not configured")))
}

/// Daily and yearly rank correlation between two configured factors.
pub(crate) fn fcorr(run: &Run, f0: &str, f1: &str) -> Result<()> {
    let project = &run.project;
    let (c0, c1) = (class_of(project, f0)?, class_of(project, f1)?);
    let left = project.read_available_factors(&c0, &run.begin, &run.stop)?;
    let corr = if c0 == c1 {
        factor_correlation(&left, f0, &left, f1)?
    } else {
        let right = project.read_available_factors(&c1, &run.begin, &run.stop)?;
        factor_correlation(&left, f0, &right, f1)?
    };

    banner("Factor Correlation");
    println!("{f0} x {f1}, [{}, {})\n", run.begin, run.stop);
    println!("  {:>6}  {:>8}", "year", "corr");
    for row in &corr.yearly {
        println!("  {:>6}  {:>8.4}", row.trade_year, row.corr);
    }

    let dir = project.report_dir("fcorr");
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{f0}-{f1}.json"));
    fs::write(&path, serde_json::to_string_pretty(&corr.yearly)?)?;
    println!("\nSaved {}\n", path.display());
    Ok(())
}
