//! Factor panels to throttled strategy weights.

use approx::assert_relative_eq;
use huelva_combine::{
    FactorSignals, OptimizerConfig, OptimizerKind, SignalTable, StrategySignals, WeightOptimizer,
};
use huelva_eval::{CovarianceBook, CovarianceEstimator};
use huelva_traits::{FactorId, Panel, Strategy, TradingCalendar};
use polars::prelude::*;

const INSTRUMENTS: [&str; 4] = ["AL", "CU", "NI", "ZN"];

fn calendar() -> TradingCalendar {
    let dates: Vec<String> = (0..20)
        .map(|i| format!("202402{:02}", i + 1))
        .collect();
    TradingCalendar::from_dates(dates).unwrap()
}

fn long_panel(days: usize, column: &str, f: impl Fn(usize, usize) -> f64) -> Panel {
    let cal = calendar();
    let mut td = Vec::new();
    let mut inst = Vec::new();
    let mut v = Vec::new();
    for (i, d) in cal.dates()[..days].iter().enumerate() {
        for (j, name) in INSTRUMENTS.iter().enumerate() {
            td.push(d.clone());
            inst.push(name.to_string());
            v.push(f(i, j));
        }
    }
    let mut df = df! { "trade_date" => td, "instrument" => inst }.unwrap();
    df.with_column(Column::new(column.into(), v)).unwrap();
    Panel::new(df)
}

fn strategy() -> Strategy {
    Strategy {
        name: "S1".to_string(),
        ret: "Cls002L1".parse().unwrap(),
        factors: vec![FactorId::new("A", "A1"), FactorId::new("B", "B1")],
        opt_win: 2,
    }
}

#[test]
fn weights_are_risk_balanced_and_throttled() {
    let cal = calendar();
    let d = cal.dates().to_vec();
    let (begin, stop) = (d[14].as_str(), d[19].as_str());

    let a = long_panel(19, "A1", |i, j| ((i * 3 + j * 5) % 7) as f64);
    let b = long_panel(19, "B1", |i, j| ((i * 2 + j * 3) % 5) as f64);
    let sig_a = FactorSignals::new("A", vec!["A1".to_string()]).compute(&a).unwrap();
    let sig_b = FactorSignals::new("B", vec!["B1".to_string()]).compute(&b).unwrap();

    let weights = WeightOptimizer::new(strategy(), OptimizerKind::Equal, OptimizerConfig::default())
        .run(begin, stop, &Panel::default(), &cal)
        .unwrap();
    assert_eq!(weights.len(), 5);

    let available = long_panel(19, "return", |i, j| {
        0.01 * (1.7 * (i * (j + 1)) as f64 + j as f64).sin()
    });
    let book = CovarianceBook::from_panel(&CovarianceEstimator::new(3).compute(&available, begin).unwrap())
        .unwrap();

    let throttle = [1.0, 0.5, 1.0, 0.5, 1.0];
    let css = Panel::new(
        df! { "trade_date" => d[14..19].to_vec(), "tot_wgt" => throttle.to_vec() }.unwrap(),
    );

    let signals = StrategySignals::new(strategy()).unwrap();
    let buffer = signals.buffer_begin(begin, &cal).unwrap();
    assert_eq!(buffer, d[13]);
    let table = SignalTable::from_panels(
        &strategy().factor_names(),
        &[&sig_a.between(&buffer, stop).unwrap(), &sig_b.between(&buffer, stop).unwrap()],
    )
    .unwrap();
    let out = signals.run(begin, &table, &weights, &book, &css).unwrap();

    // The 16th has offsetting signals on every instrument and is dropped.
    let groups = out.date_groups().unwrap();
    let dates: Vec<&String> = groups.keys().collect();
    assert_eq!(dates, vec![&d[14], &d[15], &d[17], &d[18]]);

    let instruments = out.instruments().unwrap();
    let w = out.floats("weight").unwrap();
    for (date, rows) in &groups {
        let k = d.iter().position(|x| x == date).unwrap() - 14;
        let gross: f64 = rows.iter().map(|&r| w[r].abs()).sum();
        assert_relative_eq!(gross, throttle[k], epsilon = 1e-12);

        let names: Vec<String> = rows.iter().map(|&r| instruments[r].clone()).collect();
        let cov = book.matrix(date, &names).unwrap();
        let (long, short): (Vec<usize>, Vec<usize>) =
            (0..rows.len()).partition(|&p| w[rows[p]] >= 0.0);
        let leg = |ps: &[usize]| {
            let n: Vec<String> = ps.iter().map(|&p| names[p].clone()).collect();
            let x: Vec<f64> = ps.iter().map(|&p| w[rows[p]]).collect();
            cov.portfolio_variance(&n, &x)
        };
        assert_relative_eq!(leg(&long), leg(&short), max_relative = 1e-9);
    }
}
