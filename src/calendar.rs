// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure date arithmetic: rule occurrences and credit-card cycle boundaries.
//!
//! Nothing in here touches storage. Every function is deterministic in its
//! inputs and may be called any number of times.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::errors::{Result, ScheduleError};
use crate::models::{Anchor, Frequency, RecurringRule};

pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let first = first_of_month(year, month)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| ScheduleError::validation(format!("month {}-{:02} out of range", year, month)))?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    if !(1..=12).contains(&month) {
        return Err(ScheduleError::validation(format!(
            "month must be 1-12, got {}",
            month
        )));
    }
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ScheduleError::validation(format!("year {} out of range", year)))
}

pub fn last_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, last)
        .ok_or_else(|| ScheduleError::validation(format!("month {}-{:02} out of range", year, month)))
}

/// `day` in the given month, pulled back to the month's last day when it overflows.
pub fn clamp_day(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    check_day_of_month(day)?;
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
        .ok_or_else(|| ScheduleError::validation(format!("no day {} in {}-{:02}", day, year, month)))
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 { (year - 1, 12) } else { (year, month - 1) }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

pub fn check_day_of_month(day: u32) -> Result<()> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(ScheduleError::validation(format!(
            "day of month must be 1-31, got {}",
            day
        )))
    }
}

/// Checks that exactly the anchor the frequency needs is present and in range.
pub fn check_anchor(
    frequency: Frequency,
    day_of_week: Option<u32>,
    day_of_month: Option<u32>,
) -> Result<()> {
    match (frequency, day_of_week, day_of_month) {
        (Frequency::Daily, None, None) => Ok(()),
        (Frequency::Daily, _, _) => Err(ScheduleError::validation(
            "daily rules take no day of week or day of month",
        )),
        (Frequency::Weekly, Some(dow), None) if dow <= 6 => Ok(()),
        (Frequency::Weekly, Some(dow), None) => Err(ScheduleError::validation(format!(
            "day of week must be 0-6, got {}",
            dow
        ))),
        (Frequency::Weekly, _, _) => Err(ScheduleError::validation(
            "weekly rules need a day of week and no day of month",
        )),
        (_, None, Some(dom)) => check_day_of_month(dom),
        (f, _, _) => Err(ScheduleError::validation(format!(
            "{} rules need a day of month and no day of week",
            f
        ))),
    }
}

/// All dates in `[from, to]` on which `rule` falls due, ascending.
///
/// Inactive rules yield nothing. Dates outside `[start_date, end_date]` are
/// dropped. Day-of-month anchors step from the start month by the
/// frequency's interval and clamp to short months.
pub fn occurrences_in_range(
    rule: &RecurringRule,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    if from > to {
        return Err(ScheduleError::validation(format!(
            "range start {} is after range end {}",
            from, to
        )));
    }
    if !rule.active {
        return Ok(Vec::new());
    }
    check_anchor(rule.frequency, rule.day_of_week, rule.day_of_month)?;
    if !rule.overlaps(from, to) {
        return Ok(Vec::new());
    }

    let lo = from.max(rule.start_date);
    let hi = match rule.end_date {
        Some(end) => to.min(end),
        None => to,
    };

    let dates = match rule.anchor() {
        Anchor::None => lo.iter_days().take_while(|d| *d <= hi).collect(),
        Anchor::DayOfWeek(dow) => lo
            .iter_days()
            .take_while(|d| *d <= hi)
            .filter(|d| d.weekday().num_days_from_sunday() == dow)
            .collect(),
        Anchor::DayOfMonth(dom) => {
            // check_anchor guarantees month-based frequencies here
            let interval = rule.frequency.month_interval().unwrap_or(1) as i64;
            let start_idx = month_index(rule.start_date);
            let mut out = Vec::new();
            let mut cursor = first_of_month(lo.year(), lo.month())?;
            while cursor <= hi {
                let offset = month_index(cursor) - start_idx;
                if offset >= 0 && offset % interval == 0 {
                    let due = clamp_day(cursor.year(), cursor.month(), dom)?;
                    if due >= lo && due <= hi {
                        out.push(due);
                    }
                }
                cursor = match cursor.checked_add_months(Months::new(1)) {
                    Some(next) => next,
                    None => break,
                };
            }
            out
        }
    };
    debug!(rule_id = rule.id, %from, %to, count = dates.len(), "computed occurrences");
    Ok(dates)
}

pub fn occurrences_in_month(rule: &RecurringRule, year: i32, month: u32) -> Result<Vec<NaiveDate>> {
    occurrences_in_range(rule, first_of_month(year, month)?, last_of_month(year, month)?)
}

/// Whether `a` and `b` fall in the same slot of `frequency`: the same day,
/// the same Sunday-started week, or the same calendar month.
pub fn same_slot(frequency: Frequency, a: NaiveDate, b: NaiveDate) -> bool {
    match frequency {
        Frequency::Daily => a == b,
        Frequency::Weekly => week_start(a) == week_start(b),
        _ => month_index(a) == month_index(b),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_sunday()))
}

/// Inclusive transaction window of one credit-card statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Cycle closing in `year-month`: from the day after the previous billing day
/// through this month's billing day, both clamped to month length.
///
/// The start is `min(billing_day + 1, last day of previous month)`, so for a
/// billing day of 28 or later consecutive cycles can share a day. With day 31,
/// January 31 closes the January cycle and also opens the February one, and
/// spend on that day is counted in both bills.
pub fn billing_period(billing_day: u32, year: i32, month: u32) -> Result<BillingPeriod> {
    check_day_of_month(billing_day)?;
    let end = clamp_day(year, month, billing_day)?;
    let (py, pm) = previous_month(year, month);
    let prev_last = days_in_month(py, pm)?;
    let start = NaiveDate::from_ymd_opt(py, pm, (billing_day + 1).min(prev_last))
        .ok_or_else(|| ScheduleError::validation(format!("month {}-{:02} out of range", py, pm)))?;
    Ok(BillingPeriod { start, end })
}

pub fn payment_date(payment_day: u32, year: i32, month: u32) -> Result<NaiveDate> {
    clamp_day(year, month, payment_day)
}
