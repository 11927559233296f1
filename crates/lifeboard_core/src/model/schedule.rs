//! Calendar evaluation of validated recurrence patterns.
//!
//! # Responsibility
//! - Resolve a pattern plus its epoch into a `RecurrenceSchedule`.
//! - Answer "is this date due" and walk due dates backward/forward.
//!
//! # Invariants
//! - Dates before the epoch, after `end_date`, or past the `repeat_count`-th
//!   occurrence are never due.
//! - Monthly anchors beyond a month's length fall on that month's last day.
//! - Backward walks never scan more than `MAX_LOOKBACK_DAYS` days.

use crate::model::recurrence::{PatternError, RecurrencePattern, RecurrenceRule, RecurrenceUnit};
use crate::model::task::TaskNode;
use chrono::{Datelike, Days, NaiveDate};

/// Upper bound for backward scans when a schedule has no epoch.
pub const MAX_LOOKBACK_DAYS: u64 = 3_660;

/// A validated pattern bound to the date it counts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSchedule {
    pattern: RecurrencePattern,
    epoch: Option<NaiveDate>,
}

impl RecurrenceSchedule {
    /// Binds `pattern` to its epoch: `start_date`, else `fallback_epoch`.
    ///
    /// # Errors
    /// - `MissingEpoch` when a custom rule, an anchorless monthly rule, or a
    ///   `repeat_count` has nothing to count from.
    pub fn new(
        pattern: RecurrencePattern,
        fallback_epoch: Option<NaiveDate>,
    ) -> Result<Self, PatternError> {
        let epoch = pattern.start_date.or(fallback_epoch);
        if epoch.is_none() {
            match pattern.rule {
                RecurrenceRule::Custom { .. } => {
                    return Err(PatternError::MissingEpoch("custom interval"))
                }
                RecurrenceRule::Monthly { day_of_month: None } => {
                    return Err(PatternError::MissingEpoch("monthly anchor day"))
                }
                _ => {}
            }
            if pattern.repeat_count.is_some() {
                return Err(PatternError::MissingEpoch("repeatCount"));
            }
        }
        Ok(Self { pattern, epoch })
    }

    /// Resolves the schedule of a recurring task.
    ///
    /// The epoch falls back to the UTC calendar day of `created_at`. The
    /// engine has no user time zone, so clients anchoring on a local day must
    /// send `startDate`.
    pub fn for_task(node: &TaskNode) -> Result<Self, PatternError> {
        let spec = node
            .recurrence_pattern
            .as_ref()
            .ok_or(PatternError::MissingPattern)?;
        let pattern = spec.parse()?;
        Self::new(pattern, node.created_at.map(|at| at.date_naive()))
    }

    /// Date the schedule counts from, if any.
    pub fn epoch(&self) -> Option<NaiveDate> {
        self.epoch
    }

    /// Returns whether `date` is a due date of this schedule.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        if self.epoch.is_some_and(|epoch| date < epoch) {
            return false;
        }
        if self.pattern.end_date.is_some_and(|end| date > end) {
            return false;
        }
        if !self.matches_rule(date) {
            return false;
        }
        match self.pattern.repeat_count {
            Some(limit) => self
                .occurrence_ordinal(date)
                .is_some_and(|ordinal| ordinal <= u64::from(limit)),
            None => true,
        }
    }

    /// Latest due date strictly before `before`.
    pub fn previous_due(&self, before: NaiveDate) -> Option<NaiveDate> {
        let floor = match self.epoch {
            Some(epoch) => epoch,
            None => before.checked_sub_days(Days::new(MAX_LOOKBACK_DAYS))?,
        };
        let mut cursor = before.pred_opt()?;
        while cursor >= floor {
            if self.is_due(cursor) {
                return Some(cursor);
            }
            cursor = cursor.pred_opt()?;
        }
        None
    }

    /// Earliest due date strictly after `after`, scanning at most `horizon_days`.
    pub fn next_due(&self, after: NaiveDate, horizon_days: u64) -> Option<NaiveDate> {
        let mut cursor = after;
        for _ in 0..horizon_days {
            cursor = cursor.succ_opt()?;
            if self.pattern.end_date.is_some_and(|end| cursor > end) {
                return None;
            }
            if self.is_due(cursor) {
                return Some(cursor);
            }
        }
        None
    }

    fn matches_rule(&self, date: NaiveDate) -> bool {
        match &self.pattern.rule {
            RecurrenceRule::Daily => true,
            RecurrenceRule::Weekly { days } => days.contains(&date.weekday().num_days_from_monday()),
            RecurrenceRule::Monthly { day_of_month } => {
                match day_of_month.or(self.epoch.map(|epoch| epoch.day())) {
                    Some(anchor) => date.day() == clamp_day(date.year(), date.month(), anchor),
                    None => false,
                }
            }
            RecurrenceRule::Custom { interval, unit } => match self.epoch {
                Some(epoch) => units_elapsed(epoch, date, *unit)
                    .is_some_and(|units| units % u64::from(*interval) == 0),
                None => false,
            },
        }
    }

    /// 1-based index of `date` among rule matches in `[epoch, date]`.
    ///
    /// Callers must only pass dates that match the rule.
    fn occurrence_ordinal(&self, date: NaiveDate) -> Option<u64> {
        let epoch = self.epoch?;
        if date < epoch {
            return None;
        }
        let days = u64::try_from((date - epoch).num_days()).ok()?;
        match &self.pattern.rule {
            RecurrenceRule::Daily => Some(days + 1),
            RecurrenceRule::Weekly { days: weekdays } => {
                let span = days + 1;
                let full_weeks = span / 7;
                let mut count = full_weeks * weekdays.len() as u64;
                let mut cursor = epoch.checked_add_days(Days::new(full_weeks * 7))?;
                for _ in 0..(span % 7) {
                    if weekdays.contains(&cursor.weekday().num_days_from_monday()) {
                        count += 1;
                    }
                    cursor = cursor.succ_opt()?;
                }
                Some(count)
            }
            RecurrenceRule::Monthly { day_of_month } => {
                let anchor = day_of_month.unwrap_or(epoch.day());
                let first_due = clamp_day(epoch.year(), epoch.month(), anchor);
                let months = u64::try_from(months_between(epoch, date)).ok()?;
                let skipped_first = u64::from(first_due < epoch.day());
                Some(months + 1 - skipped_first)
            }
            RecurrenceRule::Custom { interval, unit } => {
                let units = units_elapsed(epoch, date, *unit)?;
                Some(units / u64::from(*interval) + 1)
            }
        }
    }
}

/// Whole `unit`s between `epoch` and `date` when `date` sits on a unit boundary.
fn units_elapsed(epoch: NaiveDate, date: NaiveDate, unit: RecurrenceUnit) -> Option<u64> {
    if date < epoch {
        return None;
    }
    let days = u64::try_from((date - epoch).num_days()).ok()?;
    match unit {
        RecurrenceUnit::Day => Some(days),
        RecurrenceUnit::Week => (days % 7 == 0).then_some(days / 7),
        RecurrenceUnit::Month => {
            let on_anchor = date.day() == clamp_day(date.year(), date.month(), epoch.day());
            on_anchor
                .then(|| u64::try_from(months_between(epoch, date)).ok())
                .flatten()
        }
        RecurrenceUnit::Year => {
            let on_anchor = date.month() == epoch.month()
                && date.day() == clamp_day(date.year(), date.month(), epoch.day());
            on_anchor
                .then(|| u64::try_from(date.year() - epoch.year()).ok())
                .flatten()
        }
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

/// `anchor` clamped to the length of `year-month`.
fn clamp_day(year: i32, month: u32, anchor: u32) -> u32 {
    anchor.min(days_in_month(year, month))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::{days_in_month, RecurrenceSchedule};
    use crate::model::recurrence::{PatternError, RecurrenceSpec, RecurrenceUnit};
    use crate::model::task::{TaskNode, TaskType};
    use chrono::{NaiveDate, TimeZone, Utc, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(spec: RecurrenceSpec, epoch: Option<NaiveDate>) -> RecurrenceSchedule {
        RecurrenceSchedule::new(spec.parse().unwrap(), epoch).unwrap()
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn daily_respects_epoch_and_end_date() {
        let spec = RecurrenceSpec {
            end_date: Some(date(2024, 3, 10)),
            ..RecurrenceSpec::daily()
        };
        let schedule = schedule(spec, Some(date(2024, 3, 1)));
        assert!(!schedule.is_due(date(2024, 2, 29)));
        assert!(schedule.is_due(date(2024, 3, 1)));
        assert!(schedule.is_due(date(2024, 3, 10)));
        assert!(!schedule.is_due(date(2024, 3, 11)));
    }

    #[test]
    fn monthly_anchor_clamps_to_month_end() {
        let schedule = schedule(RecurrenceSpec::monthly_on(31), None);
        assert!(schedule.is_due(date(2024, 1, 31)));
        assert!(schedule.is_due(date(2024, 2, 29)));
        assert!(!schedule.is_due(date(2024, 2, 28)));
        assert!(schedule.is_due(date(2024, 4, 30)));
    }

    #[test]
    fn monthly_without_anchor_uses_epoch_day() {
        let schedule = schedule(RecurrenceSpec::new("monthly"), Some(date(2024, 1, 15)));
        assert!(schedule.is_due(date(2024, 5, 15)));
        assert!(!schedule.is_due(date(2024, 5, 16)));
    }

    #[test]
    fn monthly_without_anchor_or_epoch_is_malformed() {
        let pattern = RecurrenceSpec::new("monthly").parse().unwrap();
        assert_eq!(
            RecurrenceSchedule::new(pattern, None).unwrap_err(),
            PatternError::MissingEpoch("monthly anchor day")
        );
    }

    #[test]
    fn custom_every_three_days_counts_from_epoch() {
        let schedule = schedule(
            RecurrenceSpec::every(3, RecurrenceUnit::Day, date(2024, 1, 1)),
            None,
        );
        assert!(schedule.is_due(date(2024, 1, 1)));
        assert!(!schedule.is_due(date(2024, 1, 2)));
        assert!(schedule.is_due(date(2024, 1, 4)));
        assert!(schedule.is_due(date(2024, 1, 31)));
    }

    #[test]
    fn custom_every_two_weeks_keeps_weekday() {
        let schedule = schedule(
            RecurrenceSpec::every(2, RecurrenceUnit::Week, date(2024, 1, 1)),
            None,
        );
        assert!(schedule.is_due(date(2024, 1, 15)));
        assert!(!schedule.is_due(date(2024, 1, 8)));
        assert!(!schedule.is_due(date(2024, 1, 16)));
    }

    #[test]
    fn repeat_count_limits_weekly_occurrences() {
        let spec = RecurrenceSpec {
            repeat_count: Some(3),
            ..RecurrenceSpec::weekly([Weekday::Mon, Weekday::Thu])
        };
        // 2024-01-01 is a Monday.
        let schedule = schedule(spec, Some(date(2024, 1, 1)));
        assert!(schedule.is_due(date(2024, 1, 1)));
        assert!(schedule.is_due(date(2024, 1, 4)));
        assert!(schedule.is_due(date(2024, 1, 8)));
        assert!(!schedule.is_due(date(2024, 1, 11)));
    }

    #[test]
    fn repeat_count_skips_monthly_anchor_before_epoch() {
        let spec = RecurrenceSpec {
            repeat_count: Some(2),
            ..RecurrenceSpec::monthly_on(5)
        };
        let schedule = schedule(spec, Some(date(2024, 1, 10)));
        assert!(!schedule.is_due(date(2024, 1, 5)));
        assert!(schedule.is_due(date(2024, 2, 5)));
        assert!(schedule.is_due(date(2024, 3, 5)));
        assert!(!schedule.is_due(date(2024, 4, 5)));
    }

    #[test]
    fn task_epoch_prefers_start_date_over_utc_creation_day() {
        let mut task = TaskNode::with_id("t", "t");
        task.task_type = TaskType::Recurring;
        task.recurrence_pattern = Some(RecurrenceSpec::new("monthly"));
        // 20:30 on Jan 14 at UTC-5 is already Jan 15 in UTC.
        task.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap());
        let from_creation = RecurrenceSchedule::for_task(&task).unwrap();
        assert_eq!(from_creation.epoch(), Some(date(2024, 1, 15)));

        task.recurrence_pattern = Some(RecurrenceSpec {
            start_date: Some(date(2024, 1, 14)),
            ..RecurrenceSpec::new("monthly")
        });
        let from_start = RecurrenceSchedule::for_task(&task).unwrap();
        assert_eq!(from_start.epoch(), Some(date(2024, 1, 14)));
        assert!(from_start.is_due(date(2024, 2, 14)));
    }

    #[test]
    fn previous_and_next_due_walk_weekly_pattern() {
        let schedule = schedule(RecurrenceSpec::weekly([Weekday::Mon, Weekday::Thu]), None);
        // 2024-01-10 is a Wednesday.
        assert_eq!(schedule.previous_due(date(2024, 1, 10)), Some(date(2024, 1, 8)));
        assert_eq!(schedule.next_due(date(2024, 1, 10), 14), Some(date(2024, 1, 11)));
        assert_eq!(schedule.next_due(date(2024, 1, 10), 0), None);
    }
}
