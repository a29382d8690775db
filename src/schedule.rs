//! Weekly schedule parsing and offset computation.
//!
//! Restart and backup policies are configured with a compact schedule string:
//! a contiguous subset of the characters `S M T W R F D` (Sunday through
//! Saturday) followed by a 4-digit 24-hour time, for example `MWF 0300`.
//!
//! Everything in this module is pure: [`seconds_until`] takes the current
//! time as a parameter and performs no I/O, so policies are deterministic
//! and testable.
//!
//! # Examples
//!
//! ```
//! use worldsmith::schedule::{ScheduleSpec, seconds_until};
//! use chrono::NaiveDate;
//!
//! let spec = ScheduleSpec::parse("MWF 0300").unwrap();
//! // A Monday at 01:00, two hours before the trigger.
//! let now = NaiveDate::from_ymd_opt(2024, 1, 1)
//!     .unwrap()
//!     .and_hms_opt(1, 0, 0)
//!     .unwrap();
//! assert_eq!(seconds_until(&spec, now), 2 * 3600);
//! ```

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Day letters in Sunday-first order, as used in schedule strings.
const DAY_LETTERS: [char; 7] = ['S', 'M', 'T', 'W', 'R', 'F', 'D'];

const SECONDS_PER_DAY: i64 = 86_400;

/// A weekly day-mask plus time-of-day, parsed from configuration.
///
/// Immutable once parsed. An absent or disabled schedule is represented by
/// `Option<ScheduleSpec>` at the policy site rather than a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    /// Which weekdays the schedule fires on, indexed Sunday = 0.
    days: [bool; 7],
    /// Hour of day, 0-23.
    hour: u32,
    /// Minute of hour, 0-59.
    minute: u32,
}

impl ScheduleSpec {
    /// Parses a schedule string such as `"MWF 0300"` or `"D 1430"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] when the day letters contain
    /// anything outside `SMTWRFD`, the mask is empty, or the time is not a
    /// valid 4-digit 24-hour time.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split_whitespace();
        let (days_part, time_part) = match (parts.next(), parts.next(), parts.next()) {
            (Some(days), Some(time), None) => (days, time),
            _ => {
                return Err(Error::ConfigValidation(format!(
                    "Schedule '{}' must be day letters followed by a 4-digit time",
                    spec
                )));
            }
        };

        let mut days = [false; 7];
        for letter in days_part.chars() {
            let index = DAY_LETTERS
                .iter()
                .position(|&d| d == letter)
                .ok_or_else(|| {
                    Error::ConfigValidation(format!(
                        "Schedule '{}' has unknown day letter '{}'",
                        spec, letter
                    ))
                })?;
            days[index] = true;
        }
        if !days.iter().any(|&d| d) {
            return Err(Error::ConfigValidation(format!(
                "Schedule '{}' selects no days",
                spec
            )));
        }

        if time_part.len() != 4 || !time_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::ConfigValidation(format!(
                "Schedule '{}' time must be 4 digits (HHMM)",
                spec
            )));
        }
        let hour: u32 = time_part[..2].parse().map_err(|_| {
            Error::ConfigValidation(format!("Schedule '{}' has an invalid hour", spec))
        })?;
        let minute: u32 = time_part[2..].parse().map_err(|_| {
            Error::ConfigValidation(format!("Schedule '{}' has an invalid minute", spec))
        })?;
        if hour > 23 || minute > 59 {
            return Err(Error::ConfigValidation(format!(
                "Schedule '{}' time is out of range",
                spec
            )));
        }

        Ok(Self { days, hour, minute })
    }

    /// Returns true if the schedule fires on the given weekday
    /// (Sunday = 0 through Saturday = 6).
    pub fn fires_on(&self, weekday: usize) -> bool {
        weekday < 7 && self.days[weekday]
    }

    /// Scheduled hour of day.
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Scheduled minute of hour.
    pub fn minute(&self) -> u32 {
        self.minute
    }
}

/// Computes the number of seconds from `now` until the next occurrence of
/// the schedule.
///
/// The result is strictly positive and at most seven days: the target is
/// the earliest timestamp strictly after `now` whose weekday is in the
/// mask and whose time-of-day matches. A just-arrived occurrence rolls
/// forward to the next one, so sampling the offset around a trigger always
/// observes it jumping larger. The search window spans 14 days rather
/// than 7 because if today's weekday matches but the time has passed, the
/// occurrence must wrap to the same weekday next week; a 7-day bound would
/// incorrectly treat "today, already past" as the immediate next
/// occurrence.
pub fn seconds_until(spec: &ScheduleSpec, now: NaiveDateTime) -> i64 {
    let mut offset = (spec.hour as i64 - now.hour() as i64) * 3600
        + (spec.minute as i64 - now.minute() as i64) * 60
        - now.second() as i64;
    let today = now.weekday().num_days_from_sunday() as usize;
    for i in 0..(14 - today) {
        // offset <= 0 covers today's trigger time being at or already
        // past, which pushes the search to the same weekday next week.
        if !spec.days[(today + i) % 7] || offset <= 0 {
            offset += SECONDS_PER_DAY;
        } else {
            break;
        }
    }
    offset
}
