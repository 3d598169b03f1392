//! Date and progress arithmetic for Activities and Tasks.
//!
//! Durations count calendar days inclusively: an activity starting and
//! ending on the same day lasts one day.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Date;

/// Longest accepted duration, in days.
pub const MAX_DURATION_DAYS: i32 = 36_500;

/// A fully resolved schedule. Any field may still be absent when the
/// caller supplied too little to derive it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub duration_days: Option<i32>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.duration_days.is_none()
    }
}

/// Inclusive number of days between two dates.
pub fn inclusive_days(start: Date, end: Date) -> i64 {
    (end - start).num_days() + 1
}

/// End dates must not precede start dates.
pub fn validate_date_range(start: Option<Date>, end: Option<Date>) -> Result<(), CoreError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::Validation(format!(
                "End date {end} is before start date {start}"
            )));
        }
    }
    Ok(())
}

/// Percent complete is a whole number from 0 to 100.
pub fn validate_percent_complete(percent: i32) -> Result<(), CoreError> {
    if !(0..=100).contains(&percent) {
        return Err(CoreError::Validation(format!(
            "Percent complete must be between 0 and 100, got {percent}"
        )));
    }
    Ok(())
}

/// Fill in whichever of start, end and duration can be derived from the
/// other two, and check that all three agree when all are given.
pub fn resolve_schedule(
    start: Option<Date>,
    end: Option<Date>,
    duration_days: Option<i32>,
) -> Result<Schedule, CoreError> {
    if let Some(days) = duration_days {
        if !(1..=MAX_DURATION_DAYS).contains(&days) {
            return Err(CoreError::Validation(format!(
                "Duration must be between 1 and {MAX_DURATION_DAYS} days, got {days}"
            )));
        }
    }
    validate_date_range(start, end)?;

    let schedule = match (start, end, duration_days) {
        (Some(s), Some(e), Some(d)) => {
            let actual = inclusive_days(s, e);
            if actual != i64::from(d) {
                return Err(CoreError::Validation(format!(
                    "Duration of {d} days does not match {s} to {e} ({actual} days)"
                )));
            }
            Schedule {
                start_date: Some(s),
                end_date: Some(e),
                duration_days: Some(d),
            }
        }
        (Some(s), Some(e), None) => {
            let days = i32::try_from(inclusive_days(s, e))
                .ok()
                .filter(|d| *d <= MAX_DURATION_DAYS)
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Schedule from {s} to {e} exceeds {MAX_DURATION_DAYS} days"
                    ))
                })?;
            Schedule {
                start_date: Some(s),
                end_date: Some(e),
                duration_days: Some(days),
            }
        }
        (Some(s), None, Some(d)) => Schedule {
            start_date: Some(s),
            end_date: Some(
                s.checked_add_signed(Duration::days(i64::from(d) - 1))
                    .ok_or_else(|| out_of_calendar(s, d))?,
            ),
            duration_days: Some(d),
        },
        (None, Some(e), Some(d)) => Schedule {
            start_date: Some(
                e.checked_sub_signed(Duration::days(i64::from(d) - 1))
                    .ok_or_else(|| out_of_calendar(e, d))?,
            ),
            end_date: Some(e),
            duration_days: Some(d),
        },
        (start_date, end_date, duration_days) => Schedule {
            start_date,
            end_date,
            duration_days,
        },
    };
    Ok(schedule)
}

fn out_of_calendar(anchor: Date, days: i32) -> CoreError {
    CoreError::Validation(format!(
        "A duration of {days} days from {anchor} falls outside the supported calendar"
    ))
}

/// Apply a partial schedule edit on top of a stored schedule.
///
/// Two or more patched fields replace the schedule outright. A single
/// patched field keeps whichever stored field still makes sense: moving the
/// start keeps the duration, moving the end keeps the start, and changing
/// the duration keeps the start.
pub fn apply_schedule_patch(current: Schedule, patch: Schedule) -> Result<Schedule, CoreError> {
    let provided = [
        patch.start_date.is_some(),
        patch.end_date.is_some(),
        patch.duration_days.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();

    match provided {
        0 => Ok(current),
        1 => {
            let (start, end, duration) = if let Some(start) = patch.start_date {
                match current.duration_days {
                    Some(d) => (Some(start), None, Some(d)),
                    None => (Some(start), current.end_date, None),
                }
            } else if let Some(end) = patch.end_date {
                match current.start_date {
                    Some(s) => (Some(s), Some(end), None),
                    None => (None, Some(end), current.duration_days),
                }
            } else {
                match current.start_date {
                    Some(s) => (Some(s), None, patch.duration_days),
                    None => (None, current.end_date, patch.duration_days),
                }
            };
            resolve_schedule(start, end, duration)
        }
        _ => resolve_schedule(patch.start_date, patch.end_date, patch.duration_days),
    }
}
