//! Historical backfill from per-day commit counts

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use clout_domain::Snapshot;

use crate::history::SaveReport;

/// January 1st that anchors the cumulative count reported for `day`.
///
/// With `anchor_year` unset every calendar year restarts the count.
pub fn count_anchor(day: NaiveDate, anchor_year: Option<i32>) -> NaiveDate {
    let year = anchor_year.unwrap_or_else(|| day.year());
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(day)
}

/// First day whose commits must be fetched to plan `since..`.
pub fn fetch_start(since: NaiveDate, anchor_year: Option<i32>) -> NaiveDate {
    count_anchor(since, anchor_year).min(since)
}

/// Turn per-day commit counts into one cumulative snapshot per day.
///
/// Each day's count is the sum of daily counts from its anchor (see
/// [`count_anchor`]) through that day, so a mid-year `since` carries the
/// year-to-date total and the count restarts at every January 1st.
/// `daily_counts` should therefore cover [`fetch_start`] onwards.
///
/// Every day in `since..=until` gets an entry, even when no commits landed
/// that day. Each snapshot carries the same `followers` mapping. Returns an
/// empty plan when `since > until`.
pub fn plan_backfill(
    since: NaiveDate,
    until: NaiveDate,
    anchor_year: Option<i32>,
    daily_counts: &BTreeMap<NaiveDate, u64>,
    followers: &BTreeMap<String, u64>,
) -> Vec<Snapshot> {
    let mut current_anchor = None;
    let mut cumulative: u64 = 0;
    since
        .iter_days()
        .take_while(|day| *day <= until)
        .map(|day| {
            let anchor = count_anchor(day, anchor_year);
            if anchor > day {
                cumulative = 0;
                current_anchor = None;
                return Snapshot::new(day, 0, followers.clone());
            }
            if current_anchor != Some(anchor) {
                cumulative = sum_counts(daily_counts.range(anchor..day));
                current_anchor = Some(anchor);
            }
            cumulative = cumulative.saturating_add(daily_counts.get(&day).copied().unwrap_or(0));
            Snapshot::new(day, cumulative, followers.clone())
        })
        .collect()
}

fn sum_counts<'a>(counts: impl Iterator<Item = (&'a NaiveDate, &'a u64)>) -> u64 {
    counts.fold(0, |total, (_, count)| total.saturating_add(*count))
}

/// Outcome of a backfill run
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillReport {
    pub since: NaiveDate,
    /// Inclusive end of the planned range.
    pub until: NaiveDate,
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub save: SaveReport,
}

impl BackfillReport {
    /// Number of days in the plan.
    pub fn planned(&self) -> usize {
        self.inserted + self.replaced + self.unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn cumulative_counts_fill_gaps() {
        let daily = BTreeMap::from([(day(1), 3), (day(3), 2), (day(9), 100)]);
        let followers = BTreeMap::from([("twitter".to_string(), 35)]);

        let plan = plan_backfill(day(1), day(4), None, &daily, &followers);

        let counts: Vec<u64> = plan.iter().map(Snapshot::commit_count).collect();
        assert_eq!(counts, vec![3, 3, 5, 5]);
        assert_eq!(plan[0].date(), day(1));
        assert_eq!(plan[3].date(), day(4));
        assert_eq!(plan[2].follower_count("twitter"), Some(35));
        assert_eq!(plan[2].ratio(), Some(5.0 / 35.0));
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let plan = plan_backfill(day(5), day(4), None, &BTreeMap::new(), &BTreeMap::new());
        assert!(plan.is_empty());
    }

    #[test]
    fn without_followers_ratio_is_undefined() {
        let plan = plan_backfill(day(1), day(1), None, &BTreeMap::from([(day(1), 7)]), &BTreeMap::new());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].ratio(), None);
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mid_year_start_carries_year_to_date_total() {
        let daily = BTreeMap::from([
            (ymd(2024, 1, 15), 10),
            (ymd(2024, 5, 31), 4),
            (ymd(2024, 6, 1), 3),
            (ymd(2024, 6, 2), 1),
        ]);

        let plan = plan_backfill(ymd(2024, 6, 1), ymd(2024, 6, 2), None, &daily, &BTreeMap::new());

        let counts: Vec<u64> = plan.iter().map(Snapshot::commit_count).collect();
        assert_eq!(counts, vec![17, 18]);
        assert_eq!(fetch_start(ymd(2024, 6, 1), None), ymd(2024, 1, 1));
    }

    #[test]
    fn count_restarts_on_january_first() {
        let daily = BTreeMap::from([(ymd(2024, 12, 30), 5), (ymd(2024, 12, 31), 1), (ymd(2025, 1, 1), 1)]);

        let plan = plan_backfill(ymd(2024, 12, 31), ymd(2025, 1, 2), None, &daily, &BTreeMap::new());

        let counts: Vec<u64> = plan.iter().map(Snapshot::commit_count).collect();
        assert_eq!(counts, vec![6, 1, 1]);
    }

    #[test]
    fn fixed_anchor_year_never_restarts() {
        let daily = BTreeMap::from([(ymd(2023, 12, 31), 9), (ymd(2024, 12, 31), 2), (ymd(2025, 1, 1), 3)]);

        let plan = plan_backfill(ymd(2024, 12, 31), ymd(2025, 1, 1), Some(2024), &daily, &BTreeMap::new());

        let counts: Vec<u64> = plan.iter().map(Snapshot::commit_count).collect();
        assert_eq!(counts, vec![2, 5]);
        assert_eq!(fetch_start(ymd(2024, 12, 31), Some(2024)), ymd(2024, 1, 1));
    }

    #[test]
    fn days_before_a_later_anchor_count_nothing() {
        let daily = BTreeMap::from([(ymd(2024, 12, 31), 2), (ymd(2025, 1, 1), 3)]);

        let plan = plan_backfill(ymd(2024, 12, 31), ymd(2025, 1, 1), Some(2025), &daily, &BTreeMap::new());

        let counts: Vec<u64> = plan.iter().map(Snapshot::commit_count).collect();
        assert_eq!(counts, vec![0, 3]);
        assert_eq!(fetch_start(ymd(2024, 12, 31), Some(2025)), ymd(2024, 12, 31));
    }
}
