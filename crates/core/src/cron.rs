// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expression evaluator
//!
//! Fields are `minute hour day-of-month month day-of-week`. Each field accepts
//! `*`, `*/N`, a single value, an inclusive range `a-b`, or a comma-separated
//! list of single values. Day-of-week runs 0-7 with both 0 and 7 meaning Sunday.
//!
//! Day-of-month and day-of-week are combined with AND: `0 9 13 * 5` only fires
//! on a Friday the 13th. Classic cron ORs the two day fields when both are
//! restricted; this evaluator does not.

use chrono::{DateTime, Datelike, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Timelike};
use std::fmt;
use thiserror::Error;

/// Upper bound of the forward scan, in minutes (366 days)
pub const SEARCH_LIMIT_MINUTES: i64 = 366 * 24 * 60;

/// Errors from parsing a cron expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {field} field: {token:?}")]
    InvalidToken { field: FieldKind, token: String },
    #[error("step in {0} field must be greater than zero")]
    ZeroStep(FieldKind),
}

/// Position of a field within the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day-of-month",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day-of-week",
        };
        f.write_str(name)
    }
}

/// A single parsed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Any,
    Step(u32),
    Value(u32),
    Range(u32, u32),
    List(Vec<u32>),
}

impl Field {
    fn parse(token: &str, kind: FieldKind) -> Result<Self, CronError> {
        let invalid = || CronError::InvalidToken {
            field: kind,
            token: token.to_string(),
        };

        if token == "*" {
            return Ok(Field::Any);
        }

        if let Some(step) = token.strip_prefix("*/") {
            let step: u32 = step.parse().map_err(|_| invalid())?;
            if step == 0 {
                return Err(CronError::ZeroStep(kind));
            }
            return Ok(Field::Step(step));
        }

        if token.contains(',') {
            let values = token
                .split(',')
                .map(|v| v.trim().parse::<u32>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Field::List(values));
        }

        if let Some((start, end)) = token.split_once('-') {
            let start = start.parse().map_err(|_| invalid())?;
            let end = end.parse().map_err(|_| invalid())?;
            return Ok(Field::Range(start, end));
        }

        token.parse().map(Field::Value).map_err(|_| invalid())
    }

    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Step(step) => value % step == 0,
            Field::Value(v) => *v == value,
            Field::Range(start, end) => (*start..=*end).contains(&value),
            Field::List(values) => values.contains(&value),
        }
    }

    /// Day-of-week match where 7 is an alias for Sunday (0)
    fn matches_weekday(&self, days_from_sunday: u32) -> bool {
        self.matches(days_from_sunday) || (days_from_sunday == 0 && self.matches(7))
    }
}

/// A parsed cron expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    pub minute: Field,
    pub hour: Field,
    pub day_of_month: Field,
    pub month: Field,
    pub day_of_week: Field,
}

impl CronExpr {
    /// Parse a five-field expression
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = parts.as_slice() else {
            return Err(CronError::FieldCount(parts.len()));
        };

        Ok(Self {
            minute: Field::parse(minute, FieldKind::Minute)?,
            hour: Field::parse(hour, FieldKind::Hour)?,
            day_of_month: Field::parse(day_of_month, FieldKind::DayOfMonth)?,
            month: Field::parse(month, FieldKind::Month)?,
            day_of_week: Field::parse(day_of_week, FieldKind::DayOfWeek)?,
        })
    }

    /// Check whether a wall-clock minute matches every field
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self
                .day_of_week
                .matches_weekday(at.weekday().num_days_from_sunday())
    }

    /// First matching minute strictly after `from`, evaluated in `from`'s time zone.
    ///
    /// Local times skipped by a DST jump are never produced; a repeated local
    /// time resolves to the earliest instant still after `from`.
    pub fn next_after<Tz: TimeZone>(&self, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = from.timezone();
        let start = from.naive_local().with_second(0)?.with_nanosecond(0)?;
        let mut candidate = start + TimeDelta::minutes(1);

        for _ in 0..SEARCH_LIMIT_MINUTES {
            if self.matches(&candidate) {
                let resolved = match tz.from_local_datetime(&candidate) {
                    LocalResult::Single(t) => Some(t),
                    LocalResult::Ambiguous(first, second) => {
                        if first > *from {
                            Some(first)
                        } else {
                            Some(second)
                        }
                    }
                    LocalResult::None => None,
                };
                if let Some(found) = resolved.filter(|t| t > from) {
                    return Some(found);
                }
            }
            candidate += TimeDelta::minutes(1);
        }

        None
    }
}

/// Next time `expression` fires after `from`.
///
/// Returns `None` for an unparseable expression or when nothing matches
/// within [`SEARCH_LIMIT_MINUTES`].
pub fn next_occurrence<Tz: TimeZone>(expression: &str, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    CronExpr::parse(expression).ok()?.next_after(from)
}

/// An expression is valid when it fires at least once within the search bound
pub fn is_valid<Tz: TimeZone>(expression: &str, now: &DateTime<Tz>) -> bool {
    next_occurrence(expression, now).is_some()
}

/// Best-effort human label for common expression shapes
pub fn describe(expression: &str) -> String {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = parts.as_slice() else {
        return "Invalid cron expression".to_string();
    };

    match (*minute, *hour, *day, *month, *weekday) {
        ("*", "*", "*", "*", "*") => "Every minute".to_string(),
        ("0", "*", "*", "*", "*") => "Every hour".to_string(),
        (m, _, _, _, _) if m.starts_with("*/") => format!("Every {} minutes", &m[2..]),
        (m, h, "*", "*", "*") if m != "*" && h != "*" => {
            format!("Daily at {}", clock_label(h, m))
        }
        (m, h, "*", "*", w) if m != "*" && h != "*" => {
            format!("Every {} at {}", day_name(w), clock_label(h, m))
        }
        _ => format!("Custom: {}", expression.trim()),
    }
}

fn clock_label(hour: &str, minute: &str) -> String {
    format!("{:0>2}:{:0>2}", hour, minute)
}

fn day_name(weekday: &str) -> String {
    match weekday {
        "0" | "7" => "Sunday".to_string(),
        "1" => "Monday".to_string(),
        "2" => "Tuesday".to_string(),
        "3" => "Wednesday".to_string(),
        "4" => "Thursday".to_string(),
        "5" => "Friday".to_string(),
        "6" => "Saturday".to_string(),
        other => format!("day {}", other),
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
