//! Synthetic market data shared by the algorithm tests.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use chrono::{Datelike, NaiveDate};
use huelva_traits::{MemorySource, TradingCalendar, float_values};
use polars::prelude::*;

/// Sessions of synthetic history; enough for the 240-session windows plus buffer.
pub(crate) const DAYS: usize = 270;
/// Minute bars per session.
pub(crate) const BARS_PER_DAY: usize = 8;

pub(crate) fn trade_dates(n: usize) -> Vec<String> {
    let mut day = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        if day.weekday().number_from_monday() <= 5 {
            out.push(day.format("%Y%m%d").to_string());
        }
        day = day.succ_opt().unwrap();
    }
    out
}

fn daily_bars(dates: &[String]) -> DataFrame {
    let n = dates.len();
    let t = |i: usize| i as f64;
    let close: Vec<f64> = (0..n)
        .map(|i| 100.0 + 5.0 * (t(i) / 3.0).sin() + 0.1 * t(i))
        .collect();
    let close_minor: Vec<f64> = (0..n)
        .map(|i| close[i] * (1.0 + 0.01 * (t(i) / 5.0).sin()))
        .collect();
    let open: Vec<f64> = (0..n).map(|i| close[i] * (1.0 + 0.002 * t(i).cos())).collect();
    let high: Vec<f64> = (0..n).map(|i| open[i].max(close[i]) * 1.01).collect();
    let low: Vec<f64> = (0..n).map(|i| open[i].min(close[i]) * 0.99).collect();
    let vol: Vec<f64> = (0..n)
        .map(|i| 1000.0 + 200.0 * (t(i) / 2.0).sin() + 10.0 * t(i))
        .collect();
    let amount: Vec<f64> = (0..n).map(|i| vol[i] * close[i] * 10.0).collect();
    let oi: Vec<f64> = (0..n).map(|i| 5000.0 + 300.0 * (t(i) / 4.0).cos()).collect();
    let ret = |p: &[f64]| -> Vec<Option<f64>> {
        (0..n)
            .map(|i| (i > 0).then(|| p[i] / p[i - 1] - 1.0))
            .collect()
    };
    let ret_o: Vec<Option<f64>> = ret(&open);
    let basis: Vec<f64> = (0..n).map(|i| 0.02 * (t(i) / 7.0).sin()).collect();
    let stock: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 11 != 5).then(|| 1000.0 + 50.0 * (t(i) / 6.0).sin()))
        .collect();
    let ticker_major: Vec<String> = (0..n).map(|i| format!("CU{}.SHF", 2302 + i / 20)).collect();
    let ticker_minor: Vec<String> = (0..n).map(|i| format!("CU{}.SHF", 2303 + i / 20)).collect();
    let close_i: Vec<f64> = close.iter().map(|c| c * 1.001).collect();
    df! {
        "trade_date" => dates,
        "ticker_major" => ticker_major,
        "ticker_minor" => ticker_minor,
        "open_major" => &open,
        "high_major" => &high,
        "low_major" => &low,
        "close_major" => &close,
        "close_minor" => &close_minor,
        "closeI" => &close_i,
        "vol_major" => &vol,
        "amount_major" => &amount,
        "oi_major" => &oi,
        "return_c_major" => ret(&close),
        "return_c_minor" => ret(&close_minor),
        "return_o_major" => ret_o,
        "basis_rate" => &basis,
        "stock" => stock,
    }
    .unwrap()
}

fn minute_bars(dates: &[String]) -> DataFrame {
    let mut trade_date = Vec::new();
    let mut timestamp = Vec::new();
    let mut open = Vec::new();
    let mut high = Vec::new();
    let mut low = Vec::new();
    let mut close = Vec::new();
    let mut pre_close = Vec::new();
    let mut vol = Vec::new();
    let mut amount = Vec::new();
    let mut last = 100.0;
    for (d, date) in dates.iter().enumerate() {
        let day = NaiveDate::parse_from_str(date, "%Y%m%d").unwrap();
        // 09:00 at UTC+8.
        let base = day.and_hms_opt(1, 0, 0).unwrap().and_utc().timestamp();
        for j in 0..BARS_PER_DAY {
            let k = (d * BARS_PER_DAY + j) as f64;
            let c = 100.0 + 0.5 * (0.7 * k).sin() + 0.01 * j as f64 + 0.3 * (d as f64 / 9.0).cos();
            let o = last * (1.0 + 0.0005 * k.cos());
            let v = 10.0 + ((d * BARS_PER_DAY + j) * 7 % 13) as f64;
            trade_date.push(date.clone());
            timestamp.push(base + 60 * j as i64);
            open.push(o);
            high.push(o.max(c) * 1.001);
            low.push(o.min(c) * 0.999);
            close.push(c);
            pre_close.push(last);
            vol.push(v);
            amount.push(v * c * 10.0);
            last = c;
        }
    }
    let ticker = vec!["CU2402".to_string(); trade_date.len()];
    df! {
        "trade_date" => trade_date,
        "timestamp" => timestamp,
        "ticker" => ticker,
        "open" => open,
        "high" => high,
        "low" => low,
        "close" => close,
        "pre_close" => pre_close,
        "vol" => vol,
        "amount" => amount,
    }
    .unwrap()
}

fn positions(dates: &[String]) -> DataFrame {
    let mut trade_date = Vec::new();
    let mut broker = Vec::new();
    let mut vol = Vec::new();
    let mut long_hld = Vec::new();
    let mut long_chg = Vec::new();
    let mut short_hld = Vec::new();
    let mut short_chg = Vec::new();
    let mut code_type = Vec::new();
    for (d, date) in dates.iter().enumerate() {
        for b in 0..6usize {
            let x = (d * 6 + b) as f64;
            trade_date.push(date.clone());
            broker.push(format!("B{b}"));
            vol.push(1000.0 + 100.0 * b as f64);
            long_hld.push(200.0 + 30.0 * b as f64 + 10.0 * (x / 5.0).sin());
            long_chg.push(20.0 * (x / 3.0).sin());
            short_hld.push(180.0 + 25.0 * b as f64);
            short_chg.push(15.0 * (x / 4.0).cos());
            code_type.push(i64::from(b == 5));
        }
    }
    let ts_code = vec!["CU.SHF".to_string(); trade_date.len()];
    df! {
        "trade_date" => trade_date,
        "ts_code" => ts_code,
        "broker" => broker,
        "vol" => vol,
        "long_hld" => long_hld,
        "long_chg" => long_chg,
        "short_hld" => short_hld,
        "short_chg" => short_chg,
        "code_type" => code_type,
    }
    .unwrap()
}

fn market_index(dates: &[String]) -> DataFrame {
    let nhf: Vec<f64> = (0..dates.len())
        .map(|i| 0.01 * (i as f64 / 3.0).sin())
        .collect();
    df! {
        "trade_date" => dates,
        "INH0100_NHF" => nhf,
    }
    .unwrap()
}

/// One instrument `CU` with daily bars, minute bars, positions and a market
/// index over [`DAYS`] sessions.
pub(crate) struct Fixture {
    pub(crate) calendar: TradingCalendar,
    pub(crate) source: MemorySource,
    pub(crate) dates: Vec<String>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_instruments(&["CU"])
    }

    /// Every instrument gets the same synthetic history.
    pub(crate) fn with_instruments(instruments: &[&str]) -> Self {
        let dates = trade_dates(DAYS);
        let mut source = MemorySource::new().with_market_index(market_index(&dates));
        for instrument in instruments {
            source = source
                .with_preprocess(instrument, daily_bars(&dates))
                .with_minute_bar(instrument, minute_bars(&dates))
                .with_position(instrument, positions(&dates));
        }
        Self {
            calendar: TradingCalendar::from_dates(dates.clone()).unwrap(),
            source,
            dates,
        }
    }

    /// Output window: the last three sessions but one.
    pub(crate) fn range(&self) -> (&str, &str) {
        (&self.dates[DAYS - 4], &self.dates[DAYS - 1])
    }

    pub(crate) fn compute(&self, algorithm: &dyn FactorAlgorithm) -> DataFrame {
        let (begin, stop) = self.range();
        let request = InstrumentRequest::new("CU", begin, stop, &self.calendar, &self.source);
        algorithm.compute(&request).unwrap()
    }

    /// A full daily column, aligned with `dates`.
    pub(crate) fn daily(&self, field: &str) -> Vec<f64> {
        let df = daily_bars(&self.dates);
        float_values(&df, field).unwrap()
    }

    pub(crate) fn minute_frame(&self) -> DataFrame {
        minute_bars(&self.dates)
    }

    pub(crate) fn position_frame(&self) -> DataFrame {
        positions(&self.dates)
    }

    /// One session's minute bar column.
    pub(crate) fn minute(&self, field: &str, day: usize) -> Vec<f64> {
        let all = float_values(&self.minute_frame(), field).unwrap();
        all[day * BARS_PER_DAY..(day + 1) * BARS_PER_DAY].to_vec()
    }

    /// `close / pre_close - 1` of one session's bars, times `scale`.
    pub(crate) fn minute_returns(&self, day: usize, scale: f64) -> Vec<f64> {
        let close = self.minute("close", day);
        let pre_close = self.minute("pre_close", day);
        close
            .iter()
            .zip(&pre_close)
            .map(|(c, p)| (c / p - 1.0) * scale)
            .collect()
    }

    /// Position of the last output row in `dates`.
    pub(crate) const fn last_row() -> usize {
        DAYS - 2
    }
}

/// Asserts the output has exactly the algorithm's columns and three rows.
pub(crate) fn assert_shape(out: &DataFrame, algorithm: &dyn FactorAlgorithm) {
    let mut expected = vec!["trade_date", "instrument", "ticker"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    expected.extend(algorithm.factor_names());
    let got: Vec<String> = out
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(got, expected);
    assert_eq!(out.height(), 3);
}

/// The last value of a factor column.
pub(crate) fn last(out: &DataFrame, name: &str) -> f64 {
    *float_values(out, name).unwrap().last().unwrap()
}
