// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::occurrences_in_range;
use crate::errors::{Result, ScheduleError};
use crate::models::{RecurringException, RecurringRule};
use crate::store::{ExceptionStore, RuleStore};

/// Widest window the read-only occurrence view will expand.
pub const MAX_OCCURRENCE_SPAN_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Scheduled,
    Modified,
    Skipped,
}

/// Rule amount for one date after applying any exception on that date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub original_amount: Decimal,
    pub effective_amount: Decimal,
    pub status: OccurrenceStatus,
    pub note: Option<String>,
    pub exception_id: Option<i64>,
}

impl Resolution {
    pub fn is_skipped(&self) -> bool {
        self.status == OccurrenceStatus::Skipped
    }

    pub fn is_modified(&self) -> bool {
        self.status == OccurrenceStatus::Modified
    }
}

/// Applies the exception matching `date` exactly, if any. Skip wins over an
/// override amount; a note-only exception leaves the amount untouched.
pub fn resolve(
    rule: &RecurringRule,
    date: NaiveDate,
    exceptions: &[RecurringException],
) -> Resolution {
    let hit = exceptions
        .iter()
        .find(|e| e.recurring_id == rule.id && e.date == date);
    match hit {
        None => Resolution {
            original_amount: rule.amount,
            effective_amount: rule.amount,
            status: OccurrenceStatus::Scheduled,
            note: None,
            exception_id: None,
        },
        Some(e) if e.skip => Resolution {
            original_amount: rule.amount,
            effective_amount: rule.amount,
            status: OccurrenceStatus::Skipped,
            note: e.note.clone(),
            exception_id: Some(e.id),
        },
        Some(e) => match e.amount {
            Some(amount) => Resolution {
                original_amount: rule.amount,
                effective_amount: amount,
                status: OccurrenceStatus::Modified,
                note: e.note.clone(),
                exception_id: Some(e.id),
            },
            None => Resolution {
                original_amount: rule.amount,
                effective_amount: rule.amount,
                status: OccurrenceStatus::Scheduled,
                note: e.note.clone(),
                exception_id: Some(e.id),
            },
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub original_amount: Decimal,
    pub effective_amount: Decimal,
    pub is_modified: bool,
    pub is_skipped: bool,
    pub note: Option<String>,
    pub exception: Option<RecurringException>,
}

/// Computed occurrences of a rule over `[from, to]`, without persisting
/// anything. Skipped dates stay in the list, flagged.
pub fn occurrences<S>(store: &S, rule_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Occurrence>>
where
    S: RuleStore + ExceptionStore,
{
    if (to - from).num_days() >= MAX_OCCURRENCE_SPAN_DAYS {
        return Err(ScheduleError::validation(format!(
            "occurrence window {}..{} is wider than {} days",
            from, to, MAX_OCCURRENCE_SPAN_DAYS
        )));
    }
    let rule = store
        .rule(rule_id)?
        .ok_or_else(|| ScheduleError::not_found("rule", rule_id))?;
    let dates = occurrences_in_range(&rule, from, to)?;
    let exceptions = store.exceptions_for(rule.id)?;
    Ok(dates
        .into_iter()
        .map(|date| {
            let res = resolve(&rule, date, &exceptions);
            Occurrence {
                date,
                original_amount: res.original_amount,
                effective_amount: res.effective_amount,
                is_modified: res.is_modified(),
                is_skipped: res.is_skipped(),
                note: res.note,
                exception: res
                    .exception_id
                    .and_then(|id| exceptions.iter().find(|e| e.id == id).cloned()),
            }
        })
        .collect())
}
