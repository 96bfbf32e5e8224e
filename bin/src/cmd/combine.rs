//! Weight optimization and signal commands.

use super::{Run, finish, pick};
use crate::fanout::{Unit, run_units};
use crate::project::{Project, SignalKind, rows_written};
use anyhow::Result;
use huelva::combine::{
    FactorSignals, OptimizerKind, PortfolioSignals, SignalTable, StrategySignals, WeightOptimizer,
};
use huelva::eval::{CovarianceBook, QTest, TestKind};
use huelva::store::TableSchema;
use huelva::traits::{
    Calendar, HuelvaError, Panel, Portfolio, Strategy, columns, frame_from_parts,
};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Daily VT returns of each strategy factor over `[begin, stop)`, one
/// column per factor, on every session of the range.
fn factor_test_returns(
    project: &Project,
    strategy: &Strategy,
    begin: &str,
    stop: &str,
) -> huelva::Result<Panel> {
    let dates = project.calendar.iter_dates(begin, stop);
    let mut frame = frame_from_parts(vec![(columns::TRADE_DATE, dates)], &[])?;
    let table = TestKind::Vt.table_name(false);
    for id in &strategy.factors {
        let names = project.catalog.resolve(id)?.factor_names();
        let test = QTest::new(
            id.class.as_str(),
            names.clone(),
            strategy.ret,
            project.config.decay_of(&id.class),
        );
        let scores = project
            .read_columns(
                &project.qtest_path(&test.save_id()),
                TableSchema::test_result(&table, &names),
                begin,
                stop,
                &[columns::TRADE_DATE, id.name.as_str()],
            )
            .map_err(|e| {
                HuelvaError::DataContract(format!(
                    "{table} results of {} for strategy {}: {e}",
                    test.save_id(),
                    strategy.name
                ))
            })?;
        frame = frame
            .lazy()
            .join(
                scores.into_inner().lazy(),
                [col(columns::TRADE_DATE)],
                [col(columns::TRADE_DATE)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;
    }
    Ok(Panel::new(frame))
}

fn optimize_strategy(
    project: &Project,
    name: &str,
    kind: OptimizerKind,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let strategy = project.config.strategy(name)?.clone();
    let optimizer = WeightOptimizer::new(strategy.clone(), kind, project.config.optimizer);
    let returns = match kind {
        OptimizerKind::Sharpe => {
            let buffer = optimizer.buffer_begin(begin, &project.calendar)?;
            factor_test_returns(project, &strategy, &buffer, stop)?
        }
        OptimizerKind::Equal => Panel::default(),
    };
    let weights = optimizer.run(begin, stop, &returns, &project.calendar)?;
    let outcome = project.append(
        &project.weights_path(name),
        TableSchema::optimized_weights(name, &strategy.factor_names()),
        &weights,
    )?;
    Ok(format!("{} dates, {} written", weights.len(), rows_written(&outcome)))
}

fn strategy_names(run: &Run) -> Vec<String> {
    run.project
        .config
        .strategies
        .iter()
        .map(|s| s.name.clone())
        .collect()
}

/// Optimizes the factor weights of each strategy, one unit per strategy.
pub(crate) async fn optimize(run: &Run, strategy: Option<String>, method: &str) -> Result<()> {
    let kind: OptimizerKind = method.parse()?;
    let units = pick(strategy_names(run), strategy, "strategy")?
        .into_iter()
        .map(|name| {
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            Unit::new(name.clone(), move || {
                optimize_strategy(&project, &name, kind, &begin, &stop)
            })
        })
        .collect();
    finish(run_units("optimize", units, run.parallel).await)
}

fn compute_factor_signals(
    project: &Project,
    factor_class: &str,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let names = project.catalog.get_by_label(factor_class)?.factor_names();
    let factors = project.read_available_factors(factor_class, begin, stop)?;
    let signals = FactorSignals::new(factor_class, names.clone()).compute(&factors)?;
    let outcome = project.append(
        &project.signal_path(SignalKind::Factors, factor_class),
        TableSchema::factor_panel(factor_class, &names),
        &signals,
    )?;
    Ok(format!("{} rows, {} written", signals.len(), rows_written(&outcome)))
}

/// Rank weights of every factor of each family, one unit per class.
pub(crate) async fn factor_signals(run: &Run, fclass: Option<String>) -> Result<()> {
    let all: Vec<String> = run.project.catalog.classes().map(|c| c.to_string()).collect();
    let units = pick(all, fclass, "factor class")?
        .into_iter()
        .map(|class| {
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            Unit::new(class.clone(), move || {
                compute_factor_signals(&project, &class, &begin, &stop)
            })
        })
        .collect();
    finish(run_units("signals factors", units, run.parallel).await)
}

fn compute_strategy_signals(
    project: &Project,
    name: &str,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let strategy = project.config.strategy(name)?.clone();
    let signals = StrategySignals::new(strategy.clone())?;
    let buffer = signals.buffer_begin(begin, &project.calendar)?;

    let classes: BTreeSet<&str> = strategy.factors.iter().map(|f| f.class.as_str()).collect();
    let panels: Vec<Panel> = classes
        .into_iter()
        .map(|class| {
            let names = project.catalog.get_by_label(class)?.factor_names();
            project.read_table(
                &project.signal_path(SignalKind::Factors, class),
                TableSchema::factor_panel(class, &names),
                &buffer,
                stop,
            )
        })
        .collect::<huelva::Result<_>>()?;
    let refs: Vec<&Panel> = panels.iter().collect();
    let table = SignalTable::from_panels(&strategy.factor_names(), &refs)?;

    let weights = project.read_table(
        &project.weights_path(name),
        TableSchema::optimized_weights(name, &strategy.factor_names()),
        &buffer,
        stop,
    )?;
    let book = CovarianceBook::from_panel(&project.read_covariance(begin, stop)?)?;
    let css = project.read_css(begin, stop)?;
    let out = signals.run(begin, &table, &weights, &book, &css)?;
    let outcome = project.append(
        &project.signal_path(SignalKind::Strategies, name),
        TableSchema::signal(name),
        &out,
    )?;
    Ok(format!("{} rows, {} written", out.len(), rows_written(&outcome)))
}

/// Throttled instrument weights of each strategy, one unit per strategy.
pub(crate) async fn strategy_signals(run: &Run, strategy: Option<String>) -> Result<()> {
    let units = pick(strategy_names(run), strategy, "strategy")?
        .into_iter()
        .map(|name| {
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            Unit::new(name.clone(), move || {
                compute_strategy_signals(&project, &name, &begin, &stop)
            })
        })
        .collect();
    finish(run_units("signals strategies", units, run.parallel).await)
}

fn compute_portfolio_signals(
    project: &Project,
    portfolio: &Portfolio,
    begin: &str,
    stop: &str,
) -> huelva::Result<String> {
    let strategies: BTreeMap<String, Panel> = portfolio
        .weights
        .keys()
        .map(|name| {
            let panel = project.read_table(
                &project.signal_path(SignalKind::Strategies, name),
                TableSchema::signal(name),
                begin,
                stop,
            )?;
            Ok((name.clone(), panel))
        })
        .collect::<huelva::Result<_>>()?;
    let out = PortfolioSignals::new(portfolio.clone()).compute(&strategies)?;
    let outcome = project.append(
        &project.signal_path(SignalKind::Portfolios, &portfolio.name),
        TableSchema::signal(&portfolio.name),
        &out,
    )?;
    Ok(format!("{} rows, {} written", out.len(), rows_written(&outcome)))
}

/// Strategy weights blended per portfolio, one unit per portfolio.
pub(crate) async fn portfolio_signals(run: &Run, portfolio: Option<String>) -> Result<()> {
    let config = &run.project.config;
    let all: Vec<String> = config.portfolios.iter().map(|p| p.name.clone()).collect();
    let units = pick(all, portfolio, "portfolio")?
        .into_iter()
        .filter_map(|name| config.portfolios.iter().find(|p| p.name == name).cloned())
        .map(|portfolio| {
            let (project, begin, stop) =
                (run.project.clone(), run.begin.clone(), run.stop.clone());
            Unit::new(portfolio.name.clone(), move || {
                compute_portfolio_signals(&project, &portfolio, &begin, &stop)
            })
        })
        .collect();
    finish(run_units("signals portfolios", units, run.parallel).await)
}
