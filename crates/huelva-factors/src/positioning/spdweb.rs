//! Sentiment spread between the most and least committed members.

use crate::algorithm::{FactorAlgorithm, InstrumentRequest};
use crate::frame::{DailyFrame, DailySeries, roll_series};
use crate::group::WinLbdGroup;
use crate::minute::sorted_desc;
use huelva_math::{rolling, stats};
use huelva_traits::{Result, columns, float_values, group_indices, text_values};
use polars::prelude::DataFrame;

/// Holdings a member must exceed on both sides to be ranked.
const MIN_HOLDING: f64 = 50.0;
const DIFF_SHORT: (usize, f64) = (20, 0.9);
const DIFF_LONG: (usize, f64) = (240, 0.6);

const POSITION_FIELDS: [&str; 7] = [
    columns::TRADE_DATE,
    "vol",
    "long_hld",
    "long_chg",
    "short_hld",
    "short_chg",
    "code_type",
];

/// Qualifying member rows of one session: `(commitment, sentiment)`.
///
/// Commitment is total holdings per traded volume, sentiment the net change
/// in holdings over the gross change.
#[derive(Debug, Default)]
struct MemberDay {
    stat: Vec<f64>,
    senti: Vec<f64>,
}

impl MemberDay {
    /// Mean sentiment of the `lbd` most committed members less that of the
    /// `lbd` least committed, at least one member on each side.
    fn spread(&self, lbd: f64) -> f64 {
        let n = self.stat.len();
        if n == 0 {
            return f64::NAN;
        }
        let k = ((n as f64 * lbd) as usize).max(1);
        let order = sorted_desc(0..n, &self.stat);
        let mean = |rows: &[usize]| {
            stats::mean(&rows.iter().map(|i| self.senti[*i]).collect::<Vec<_>>())
        };
        mean(&order[..k]) - mean(&order[n - k..])
    }
}

/// Groups contract-level member rows by session, dropping incomplete rows and
/// members below [`MIN_HOLDING`].
fn member_days(positions: &DataFrame) -> Result<Vec<(String, MemberDay)>> {
    let dates = text_values(positions, columns::TRADE_DATE)?;
    let vol = float_values(positions, "vol")?;
    let long_hld = float_values(positions, "long_hld")?;
    let long_chg = float_values(positions, "long_chg")?;
    let short_hld = float_values(positions, "short_hld")?;
    let short_chg = float_values(positions, "short_chg")?;
    let code_type = float_values(positions, "code_type")?;
    Ok(group_indices(&dates)
        .into_iter()
        .map(|(date, rows)| {
            let mut day = MemberDay::default();
            for i in rows {
                let complete = [vol[i], long_hld[i], long_chg[i], short_hld[i], short_chg[i]]
                    .iter()
                    .all(|v| !v.is_nan());
                if code_type[i] != 0.0
                    || !complete
                    || long_hld[i] <= MIN_HOLDING
                    || short_hld[i] <= MIN_HOLDING
                {
                    continue;
                }
                day.stat.push((long_hld[i] + short_hld[i]) / vol[i]);
                day.senti
                    .push((long_chg[i] - short_chg[i]) / (long_chg[i].abs() + short_chg[i].abs()));
            }
            (date, day)
        })
        .filter(|(_, day)| !day.stat.is_empty())
        .collect())
}

/// `SPDWEB`: rolling mean of the daily member sentiment spread, over the
/// sessions with qualifying member reports.
///
/// `SPDWEBDIFF` is the `(20, 0.9)` value less the `(240, 0.6)` value.
#[derive(Debug, Clone)]
pub struct SpdwebFactor {
    group: WinLbdGroup,
}

impl SpdwebFactor {
    /// Creates the family; windows 20 and 240 and fractions 0.9 and 0.6 must
    /// be configured.
    pub fn new(group: WinLbdGroup) -> Result<Self> {
        group.base().require_wins(&[DIFF_SHORT.0, DIFF_LONG.0])?;
        group.require_lbd(DIFF_SHORT.1)?;
        group.require_lbd(DIFF_LONG.1)?;
        Ok(Self { group })
    }
}

impl FactorAlgorithm for SpdwebFactor {
    fn factor_class(&self) -> &str {
        self.group.class()
    }

    fn factor_names(&self) -> Vec<String> {
        let mut names = self.group.names_vanilla();
        names.push(self.group.name_diff());
        names
    }

    fn max_window(&self) -> usize {
        self.group.base().max_win()
    }

    fn compute(&self, request: &InstrumentRequest<'_>) -> Result<DataFrame> {
        let begin = self.buffer_begin(request.begin, request.calendar)?;
        let mut frame = DailyFrame::load(request, &begin, &[])?;
        let positions = request.source.load_position(
            request.instrument,
            &begin,
            request.stop,
            &POSITION_FIELDS,
        )?;
        let days = member_days(&positions)?;
        for lbd in self.group.lbds() {
            let daily: DailySeries = days
                .iter()
                .map(|(date, day)| (date.clone(), day.spread(*lbd)))
                .collect();
            for win in self.group.wins() {
                let rolled = roll_series(&daily, |x| rolling::mean(x, *win, *win));
                frame.attach(self.group.name_vanilla(*win, *lbd), &rolled);
            }
        }
        let short = frame.column(&self.group.name_vanilla(DIFF_SHORT.0, DIFF_SHORT.1))?;
        let long = frame.column(&self.group.name_vanilla(DIFF_LONG.0, DIFF_LONG.1))?;
        let diff = short.iter().zip(long).map(|(s, l)| s - l).collect();
        frame.insert(self.group.name_diff(), diff);
        frame.finish(
            request.instrument,
            &self.factor_names(),
            request.begin,
            request.stop,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fixture, assert_shape, last};
    use approx::assert_relative_eq;

    #[test]
    fn test_spread() {
        let day = MemberDay {
            stat: vec![3.0, 1.0, 2.0, 4.0],
            senti: vec![0.5, -1.0, 0.0, 1.0],
        };
        // Top two (rows 3, 0) against bottom two (rows 2, 1).
        assert_relative_eq!(day.spread(0.5), 0.75 - (-0.5));
        // A fraction below one member still takes one from each end.
        assert_relative_eq!(day.spread(0.1), 2.0);
        assert!(MemberDay::default().spread(0.5).is_nan());
    }

    #[test]
    fn test_member_filters() {
        let positions = polars::df! {
            "trade_date" => &["20240102", "20240102", "20240102", "20240103"],
            "vol" => &[Some(10.0), Some(10.0), None, Some(10.0)],
            "long_hld" => &[100.0, 40.0, 100.0, 100.0],
            "long_chg" => &[5.0, 5.0, 5.0, 5.0],
            "short_hld" => &[100.0, 100.0, 100.0, 100.0],
            "short_chg" => &[-5.0, 5.0, 5.0, 5.0],
            "code_type" => &[0i64, 0, 0, 1],
        }
        .unwrap();
        let days = member_days(&positions).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].0, "20240102");
        assert_eq!(days[0].1.stat, vec![20.0]);
        assert_eq!(days[0].1.senti, vec![1.0]);
    }

    #[test]
    fn test_compute() {
        let fixture = Fixture::new();
        let group = WinLbdGroup::new("SPDWEB", vec![1, 20, 240], vec![0.6, 0.9]).unwrap();
        let alg = SpdwebFactor::new(group).unwrap();
        let out = fixture.compute(&alg);
        assert_shape(&out, &alg);

        let days = member_days(&fixture.position_frame()).unwrap();
        let r = Fixture::last_row();
        let (date, day) = &days[r];
        assert_eq!(date, &fixture.dates[r]);
        assert_eq!(day.stat.len(), 5);
        assert_relative_eq!(last(&out, "SPDWEB001L60"), day.spread(0.6), epsilon = 1e-12);
    }
}
