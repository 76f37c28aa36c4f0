//! Ensemble aggregation: per-date means over all trials.
//!
//! Values of a date are summed in sorted order, so the result is bit-identical
//! whatever order the trials finished in. Missing values (`NaN`) are skipped; a
//! date whose values are all missing reports `NaN`.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::domain::{NormalisedRow, PredictionRecord};

#[derive(Debug, Default)]
struct DateGroup {
    values: Vec<f64>,
    se: Option<Vec<f64>>,
}

fn nan_mean(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Reduce trial records to one row per distinct date, sorted by date.
///
/// The standard-error column is kept iff the records carry one.
pub fn aggregate_by_date(records: &[PredictionRecord]) -> Vec<NormalisedRow> {
    let mut groups: BTreeMap<NaiveDateTime, DateGroup> = BTreeMap::new();

    for r in records {
        let group = groups.entry(r.date).or_default();
        group.values.push(r.value);
        if let Some(se) = r.se {
            group.se.get_or_insert_with(Vec::new).push(se);
        }
    }

    groups
        .into_iter()
        .map(|(date, mut group)| NormalisedRow {
            date,
            value: nan_mean(&mut group.values),
            se: group.se.as_mut().map(|s| nan_mean(s)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn rec(trial: usize, d: u32, value: f64, se: Option<f64>) -> PredictionRecord {
        PredictionRecord {
            trial,
            date: day(d),
            value,
            se,
        }
    }

    #[test]
    fn means_per_date() {
        let records = vec![
            rec(1, 2, 4.0, None),
            rec(1, 1, 1.0, None),
            rec(2, 1, 3.0, None),
            rec(2, 2, 8.0, None),
        ];
        let rows = aggregate_by_date(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(1));
        assert!((rows[0].value - 2.0).abs() < 1e-12);
        assert!((rows[1].value - 6.0).abs() < 1e-12);
        assert!(rows.iter().all(|r| r.se.is_none()));
    }

    #[test]
    fn missing_values_are_skipped() {
        let records = vec![
            rec(1, 1, f64::NAN, Some(1.0)),
            rec(2, 1, 3.0, Some(f64::NAN)),
            rec(3, 1, 5.0, Some(3.0)),
        ];
        let rows = aggregate_by_date(&records);
        assert!((rows[0].value - 4.0).abs() < 1e-12);
        assert!((rows[0].se.unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn all_missing_stays_missing() {
        let records = vec![rec(1, 1, f64::NAN, None), rec(2, 1, f64::NAN, None), rec(1, 2, 1.0, None)];
        let rows = aggregate_by_date(&records);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].value.is_nan());
        assert_eq!(rows[1].value, 1.0);
    }

    #[test]
    fn order_does_not_matter() {
        let mut records: Vec<PredictionRecord> = (1..=40)
            .flat_map(|trial| (1..=5).map(move |d| rec(trial, d, (trial * d as usize) as f64 * 0.5, Some(d as f64))))
            .collect();
        let expected = aggregate_by_date(&records);

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..5 {
            records.shuffle(&mut rng);
            assert_eq!(aggregate_by_date(&records), expected);
        }
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert!(aggregate_by_date(&[]).is_empty());
    }
}
