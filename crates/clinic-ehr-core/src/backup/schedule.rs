//! Fire times for recurring backup schedules.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::models::{BackupFrequency, BackupSchedule};

impl BackupSchedule {
    /// First fire time strictly after `after`, all in UTC.
    ///
    /// `None` when the schedule lacks the weekday or month day its
    /// frequency needs.
    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let day = after.date_naive();
        let at = |date: NaiveDate| date.and_time(self.time_of_day).and_utc();

        match self.frequency {
            BackupFrequency::Daily => {
                let today = at(day);
                Some(if today > after { today } else { at(day + Duration::days(1)) })
            }
            BackupFrequency::Weekly => {
                let weekday = self.weekday.filter(|d| *d <= 6)?;
                let ahead = (7 + weekday - day.weekday().num_days_from_monday()) % 7;
                let candidate = at(day + Duration::days(i64::from(ahead)));
                Some(if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(7)
                })
            }
            BackupFrequency::Monthly => {
                let dom = self.day_of_month.filter(|d| (1..=28).contains(d))?;
                let this_month = at(NaiveDate::from_ymd_opt(day.year(), day.month(), dom)?);
                if this_month > after {
                    return Some(this_month);
                }
                let (year, month) = if day.month() == 12 {
                    (day.year() + 1, 1)
                } else {
                    (day.year(), day.month() + 1)
                };
                Some(at(NaiveDate::from_ymd_opt(year, month, dom)?))
            }
        }
    }

    /// Whether an enabled schedule has a fire time at or before `now` that
    /// has not run yet. Never-run schedules count from their creation.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let since = self.last_run_at.unwrap_or(self.created_at);
        self.next_run_after(since).is_some_and(|next| next <= now)
    }
}
