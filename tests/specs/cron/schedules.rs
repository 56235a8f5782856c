// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedule specs
//!
//! Verify next-occurrence arithmetic and schedule labels.

use chrono::{DateTime, TimeZone, Utc};
use dash_core::{describe, next_occurrence};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

#[test]
fn next_occurrence_is_strictly_after_now() {
    let now = at(2026, 1, 5, 9, 0);
    assert_eq!(next_occurrence("0 9 * * *", &now), Some(at(2026, 1, 6, 9, 0)));
    assert_eq!(next_occurrence("* * * * *", &now), Some(at(2026, 1, 5, 9, 1)));
}

#[test]
fn seconds_are_dropped_before_searching() {
    let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 42).unwrap();
    assert_eq!(next_occurrence("* * * * *", &now), Some(at(2026, 1, 5, 9, 1)));
}

#[test]
fn sunday_is_zero_or_seven() {
    // 2026-01-05 is a Monday
    let now = at(2026, 1, 5, 9, 0);
    let sunday = Some(at(2026, 1, 11, 8, 0));
    assert_eq!(next_occurrence("0 8 * * 0", &now), sunday);
    assert_eq!(next_occurrence("0 8 * * 7", &now), sunday);
}

#[test]
fn day_of_month_and_weekday_must_both_match() {
    // Friday the 13th
    let now = at(2026, 1, 5, 9, 0);
    assert_eq!(
        next_occurrence("0 0 13 * 5", &now),
        Some(at(2026, 2, 13, 0, 0))
    );
}

#[test]
fn impossible_and_malformed_expressions_have_no_next_time() {
    let now = at(2026, 1, 5, 9, 0);
    assert_eq!(next_occurrence("0 0 30 2 *", &now), None);
    assert_eq!(next_occurrence("every day", &now), None);
    assert_eq!(next_occurrence("*/0 * * * *", &now), None);
}

#[test]
fn common_shapes_have_friendly_labels() {
    assert_eq!(describe("* * * * *"), "Every minute");
    assert_eq!(describe("0 * * * *"), "Every hour");
    assert_eq!(describe("*/15 * * * *"), "Every 15 minutes");
    assert_eq!(describe("30 2 * * *"), "Daily at 02:30");
    assert_eq!(describe("0 9 * * 1"), "Every Monday at 09:00");
    assert_eq!(describe("0 9 1 * *"), "Custom: 0 9 1 * *");
    assert_eq!(describe("nonsense"), "Invalid cron expression");
}
