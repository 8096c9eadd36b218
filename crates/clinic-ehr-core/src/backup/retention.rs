//! Grandfather-father-son retention for backups.
//!
//! Successful backups are walked newest first. A backup survives if it is the
//! newest one in its day and that day is among the `daily` most recent days
//! that have backups. The same rule applies to ISO weeks (`weekly`), months
//! (`monthly`) and years (`yearly`). A backup kept by any of the four rules is
//! kept. The newest successful backup is always kept. Failed attempts are
//! never kept.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::BackupLog;

/// How many of each bucket to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub daily: usize,
    pub weekly: usize,
    pub monthly: usize,
    pub yearly: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily: 7,
            weekly: 4,
            monthly: 12,
            yearly: 3,
        }
    }
}

/// Split of a set of backups into those to keep and those to prune.
/// Both lists are newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionPlan {
    pub keep: Vec<BackupLog>,
    pub prune: Vec<BackupLog>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Bucket {
    Day(NaiveDate),
    Week(i32, u32),
    Month(i32, u32),
    Year(i32),
}

type BucketFn = fn(NaiveDate) -> Bucket;

fn bucket_rules(policy: &RetentionPolicy) -> [(usize, BucketFn); 4] {
    [
        (policy.daily, Bucket::Day),
        (policy.weekly, |d| {
            let week = d.iso_week();
            Bucket::Week(week.year(), week.week())
        }),
        (policy.monthly, |d| Bucket::Month(d.year(), d.month())),
        (policy.yearly, |d| Bucket::Year(d.year())),
    ]
}

/// Decide which backups to keep under `policy`.
pub fn plan_retention(backups: &[BackupLog], policy: &RetentionPolicy) -> RetentionPlan {
    let mut ordered: Vec<&BackupLog> = backups.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let successful: Vec<&BackupLog> = ordered.iter().copied().filter(|b| b.succeeded()).collect();
    let mut keep_ids: HashSet<&str> = HashSet::new();

    if let Some(newest) = successful.first() {
        keep_ids.insert(newest.id.as_str());
    }

    for (limit, bucket_of) in bucket_rules(policy) {
        let mut seen: HashSet<Bucket> = HashSet::new();
        for backup in &successful {
            if seen.len() >= limit {
                break;
            }
            // Newest first, so the first backup seen in a bucket is its newest
            if seen.insert(bucket_of(backup.created_at.date_naive())) {
                keep_ids.insert(backup.id.as_str());
            }
        }
    }

    let (keep, prune): (Vec<&BackupLog>, Vec<&BackupLog>) = ordered
        .into_iter()
        .partition(|b| keep_ids.contains(b.id.as_str()));

    RetentionPlan {
        keep: keep.into_iter().cloned().collect(),
        prune: prune.into_iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackupKind, BackupStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn backup(created_at: DateTime<Utc>, status: BackupStatus) -> BackupLog {
        BackupLog {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: format!("backup-{}.json", created_at.format("%Y%m%d-%H%M%S")),
            kind: BackupKind::Scheduled,
            status,
            size_bytes: 100,
            checksum: None,
            schedule_id: None,
            error: None,
            created_at,
        }
    }

    fn daily_backups(start: DateTime<Utc>, days: i64) -> Vec<BackupLog> {
        (0..days)
            .map(|i| backup(start + Duration::days(i), BackupStatus::Success))
            .collect()
    }

    fn only(daily: usize, weekly: usize, monthly: usize, yearly: usize) -> RetentionPolicy {
        RetentionPolicy {
            daily,
            weekly,
            monthly,
            yearly,
        }
    }

    #[test]
    fn test_keeps_last_n_days() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let backups = daily_backups(start, 10);
        let plan = plan_retention(&backups, &only(3, 0, 0, 0));

        assert_eq!(plan.keep.len(), 3);
        assert_eq!(plan.keep[0].created_at, start + Duration::days(9));
        assert_eq!(plan.keep[2].created_at, start + Duration::days(7));
        assert_eq!(plan.prune.len(), 7);
    }

    #[test]
    fn test_only_newest_per_day_kept() {
        let day = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let backups = vec![
            backup(day + Duration::hours(1), BackupStatus::Success),
            backup(day + Duration::hours(12), BackupStatus::Success),
            backup(day + Duration::hours(23), BackupStatus::Success),
        ];
        let plan = plan_retention(&backups, &only(7, 0, 0, 0));
        assert_eq!(plan.keep.len(), 1);
        assert_eq!(plan.keep[0].created_at, day + Duration::hours(23));
    }

    #[test]
    fn test_weekly_and_monthly_buckets() {
        // Daily backups across all of January and February 2026
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let backups = daily_backups(start, 59);
        let plan = plan_retention(&backups, &only(0, 0, 2, 0));

        let kept: Vec<String> = plan
            .keep
            .iter()
            .map(|b| b.created_at.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(kept, vec!["2026-02-28", "2026-01-31"]);

        // ISO weeks end on Sunday: 2026-02-22 closes the week before the last
        let plan = plan_retention(&backups, &only(0, 2, 0, 0));
        let kept: Vec<String> = plan
            .keep
            .iter()
            .map(|b| b.created_at.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(kept, vec!["2026-02-28", "2026-02-22"]);
    }

    #[test]
    fn test_failed_backups_pruned() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 2, 0, 0).unwrap();
        let failed = backup(now, BackupStatus::Failed);
        let ok = backup(now - Duration::days(1), BackupStatus::Success);
        let plan = plan_retention(&[failed.clone(), ok.clone()], &RetentionPolicy::default());

        assert_eq!(plan.keep, vec![ok]);
        assert_eq!(plan.prune, vec![failed]);
    }

    #[test]
    fn test_newest_kept_even_with_zero_policy() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let backups = daily_backups(start, 3);
        let plan = plan_retention(&backups, &only(0, 0, 0, 0));
        assert_eq!(plan.keep.len(), 1);
        assert_eq!(plan.keep[0].created_at, start + Duration::days(2));
    }

    #[test]
    fn test_empty_input() {
        let plan = plan_retention(&[], &RetentionPolicy::default());
        assert!(plan.keep.is_empty());
        assert!(plan.prune.is_empty());
    }

    fn arb_backups() -> impl Strategy<Value = Vec<BackupLog>> {
        prop::collection::vec((0i64..2_000 * 24, any::<bool>()), 0..60).prop_map(|entries| {
            let epoch = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
            entries
                .into_iter()
                .map(|(hours, ok)| {
                    let status = if ok {
                        BackupStatus::Success
                    } else {
                        BackupStatus::Failed
                    };
                    backup(epoch + Duration::hours(hours), status)
                })
                .collect()
        })
    }

    fn arb_policy() -> impl Strategy<Value = RetentionPolicy> {
        (0usize..10, 0usize..6, 0usize..14, 0usize..4).prop_map(|(d, w, m, y)| only(d, w, m, y))
    }

    proptest! {
        #[test]
        fn prop_partition_is_exact(backups in arb_backups(), policy in arb_policy()) {
            let plan = plan_retention(&backups, &policy);

            let mut input: Vec<&str> = backups.iter().map(|b| b.id.as_str()).collect();
            let mut output: Vec<&str> = plan
                .keep
                .iter()
                .chain(plan.prune.iter())
                .map(|b| b.id.as_str())
                .collect();
            input.sort();
            output.sort();
            prop_assert_eq!(input, output);
        }

        #[test]
        fn prop_newest_success_kept(backups in arb_backups(), policy in arb_policy()) {
            let plan = plan_retention(&backups, &policy);
            let newest = backups
                .iter()
                .filter(|b| b.succeeded())
                .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| b.id.cmp(&a.id)));
            if let Some(newest) = newest {
                prop_assert!(plan.keep.iter().any(|b| b.id == newest.id));
            }
        }

        #[test]
        fn prop_kept_are_successful_and_bounded(backups in arb_backups(), policy in arb_policy()) {
            let plan = plan_retention(&backups, &policy);
            prop_assert!(plan.keep.iter().all(|b| b.succeeded()));
            let bound = policy.daily + policy.weekly + policy.monthly + policy.yearly + 1;
            prop_assert!(plan.keep.len() <= bound);
        }
    }
}
