//! Cron schedule parsing and evaluation

use crate::core::config::ConfigError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// How far ahead `next_after` searches before giving up
const SEARCH_HORIZON_DAYS: i64 = 366 * 5;

/// A standard 5-field cron expression: minute, hour, day of month, month,
/// day of week.
///
/// A minute matches when all five fields match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: u64,
    hours: u64,
    days: u64,
    months: u64,
    weekdays: u64,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    /// Names mapped to `min + index`
    names: &'static [&'static str],
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
};
const DAY: FieldSpec = FieldSpec {
    name: "day of month",
    min: 1,
    max: 31,
    names: &[],
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
};
// 7 is accepted as a second Sunday and folded onto 0
const WEEKDAY: FieldSpec = FieldSpec {
    name: "day of week",
    min: 0,
    max: 7,
    names: &WEEKDAY_NAMES,
};

impl CronSchedule {
    /// Parse a 5-field cron expression
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSchedule {
            expr: expr.to_string(),
            reason,
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
        }

        let minutes = parse_field(fields[0], &MINUTE).map_err(invalid)?;
        let hours = parse_field(fields[1], &HOUR).map_err(invalid)?;
        let days = parse_field(fields[2], &DAY).map_err(invalid)?;
        let months = parse_field(fields[3], &MONTH).map_err(invalid)?;
        let mut weekdays = parse_field(fields[4], &WEEKDAY).map_err(invalid)?;
        if weekdays & (1 << 7) != 0 {
            weekdays = (weekdays & !(1 << 7)) | 1;
        }

        Ok(Self {
            source: fields.join(" "),
            minutes,
            hours,
            days,
            months,
            weekdays,
        })
    }

    /// The expression as parsed
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if the minute containing `at` is scheduled
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.date_matches(at.date())
            && bit(self.hours, at.hour())
            && bit(self.minutes, at.minute())
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        bit(self.months, date.month())
            && bit(self.days, date.day())
            && bit(self.weekdays, date.weekday().num_days_from_sunday())
    }

    /// First scheduled minute strictly after `after`.
    ///
    /// Returns `None` for expressions that never fire (e.g. February 31st).
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let horizon = start + Duration::days(SEARCH_HORIZON_DAYS);
        let mut t = start;

        while t <= horizon {
            if !bit(self.months, t.month()) {
                let (year, month) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                t = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.date_matches(t.date()) {
                t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !bit(self.hours, t.hour()) {
                t = t.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !bit(self.minutes, t.minute()) {
                t += Duration::minutes(1);
                continue;
            }
            return Some(t);
        }

        None
    }

    /// The next `count` scheduled minutes after `after`
    pub fn upcoming(&self, after: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
        let mut times = Vec::new();
        let mut cursor = after;
        while times.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    times.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        times
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn bit(mask: u64, value: u32) -> bool {
    mask & (1u64 << value) != 0
}

/// Parse one field into a bitmask of allowed values
fn parse_field(field: &str, spec: &FieldSpec) -> Result<u64, String> {
    let mut mask = 0u64;

    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("empty entry in {} field", spec.name));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{}' in {} field", step, spec.name))?;
                if step == 0 {
                    return Err(format!("step must be positive in {} field", spec.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, spec)?, parse_value(b, spec)?)
        } else {
            let value = parse_value(range, spec)?;
            // `5/15` means "from 5 to the end, every 15"
            if step.is_some() {
                (value, spec.max)
            } else {
                (value, value)
            }
        };

        if start > end {
            return Err(format!("range {}-{} is reversed in {} field", start, end, spec.name));
        }

        let step = step.unwrap_or(1) as usize;
        for value in (start..=end).step_by(step) {
            mask |= 1u64 << value;
        }
    }

    Ok(mask)
}

fn parse_value(raw: &str, spec: &FieldSpec) -> Result<u32, String> {
    let lower = raw.to_ascii_lowercase();
    let value = match spec.names.iter().position(|name| *name == lower) {
        Some(index) => spec.min + index as u32,
        None => raw
            .parse::<u32>()
            .map_err(|_| format!("invalid value '{}' in {} field", raw, spec.name))?,
    };

    if value < spec.min || value > spec.max {
        return Err(format!(
            "{} is out of range {}-{} in {} field",
            value, spec.min, spec.max, spec.name
        ));
    }
    Ok(value)
}
