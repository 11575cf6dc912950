// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Lazy, idempotent materialization of recurring instances per month.
//!
//! Rows are looked up by `(recurring_id, due_date)` before insert, and the
//! insert itself ignores a conflicting row, so concurrent or repeated calls
//! converge on one instance per date.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{first_of_month, last_of_month, occurrences_in_month, same_slot};
use crate::errors::{Result, ScheduleError};
use crate::models::{EntryType, RecurringException, RecurringInstance, RecurringRule};
use crate::resolver::resolve;
use crate::store::Store;

/// A persisted instance with its exception applied. For completed rows
/// `amount` is the amount frozen at completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceView {
    pub id: i64,
    pub recurring_id: i64,
    pub rule_name: String,
    pub r#type: EntryType,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub transaction_id: Option<i64>,
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub is_modified: bool,
    pub exception_id: Option<i64>,
    pub exception_note: Option<String>,
}

fn find_or_insert<S: Store>(store: &S, rule_id: i64, due: NaiveDate) -> Result<RecurringInstance> {
    if let Some(existing) = store.instance_on(rule_id, due)? {
        return Ok(existing);
    }
    if store.insert_instance(rule_id, due)? {
        info!(rule_id, %due, "materialized instance");
    } else {
        debug!(rule_id, %due, "instance appeared concurrently; reusing it");
    }
    store
        .instance_on(rule_id, due)?
        .ok_or(ScheduleError::Storage(rusqlite::Error::QueryReturnedNoRows))
}

fn view(
    rule: &RecurringRule,
    instance: &RecurringInstance,
    exceptions: &[RecurringException],
) -> InstanceView {
    let res = resolve(rule, instance.due_date, exceptions);
    // Completed rows report what was booked, not what the rule says today.
    let amount = match instance.amount {
        Some(frozen) if instance.completed => frozen,
        _ => res.effective_amount,
    };
    InstanceView {
        id: instance.id,
        recurring_id: rule.id,
        rule_name: rule.name.clone(),
        r#type: rule.r#type,
        due_date: instance.due_date,
        completed: instance.completed,
        completed_at: instance.completed_at,
        transaction_id: instance.transaction_id,
        amount,
        original_amount: res.original_amount,
        is_modified: res.is_modified(),
        exception_id: res.exception_id,
        exception_note: res.note,
    }
}

fn materialize<S: Store>(
    store: &S,
    rule: &RecurringRule,
    year: i32,
    month: u32,
) -> Result<Vec<InstanceView>> {
    let from = first_of_month(year, month)?;
    let to = last_of_month(year, month)?;
    let completed: Vec<RecurringInstance> = store
        .instances_between(rule.id, from, to)?
        .into_iter()
        .filter(|i| i.completed)
        .collect();
    let dates = occurrences_in_month(rule, year, month)?;
    if dates.is_empty() && completed.is_empty() {
        return Ok(Vec::new());
    }

    let exceptions = store.exceptions_for(rule.id)?;
    // Completed rows stay visible whatever the rule says now.
    let mut out: Vec<InstanceView> = completed
        .iter()
        .map(|i| view(rule, i, &exceptions))
        .collect();
    for due in dates {
        // A slot already paid under an earlier schedule gets no second instance.
        if let Some(paid) = completed
            .iter()
            .find(|c| same_slot(rule.frequency, c.due_date, due))
        {
            if paid.due_date != due {
                debug!(rule_id = rule.id, %due, paid = %paid.due_date, "slot already completed");
            }
            continue;
        }
        let instance = find_or_insert(store, rule.id, due)?;
        // Skipped rows stay persisted and pending; they are just not shown.
        if resolve(rule, due, &exceptions).is_skipped() {
            continue;
        }
        out.push(view(rule, &instance, &exceptions));
    }
    out.sort_by_key(|v| v.due_date);
    Ok(out)
}

/// Ensures one instance row per occurrence of `rule_id` in `year-month` and
/// returns the visible ones ordered by due date.
pub fn ensure_instances_for_month<S: Store>(
    store: &S,
    rule_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<InstanceView>> {
    first_of_month(year, month)?;
    let rule = store
        .rule(rule_id)?
        .ok_or_else(|| ScheduleError::not_found("rule", rule_id))?;
    store.atomic(|s| materialize(s, &rule, year, month))
}

/// Month view across all rules: active rules overlapping `year-month` are
/// materialized, and completed rows of any rule are shown alongside.
pub fn instances_for_month<S: Store>(store: &S, year: i32, month: u32) -> Result<Vec<InstanceView>> {
    first_of_month(year, month)?;
    store.atomic(|s| {
        let mut all = Vec::new();
        for rule in s.rules()? {
            all.extend(materialize(s, &rule, year, month)?);
        }
        all.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.rule_name.cmp(&b.rule_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    })
}
