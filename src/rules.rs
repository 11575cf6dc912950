// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Maintenance of recurring rules and their per-date exceptions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use crate::calendar::check_anchor;
use crate::errors::{Result, ScheduleError};
use crate::models::{EntryType, NewRule, RecurringException, RecurringRule};
use crate::store::Store;

fn check_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ScheduleError::validation(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

fn validate_rule<S: Store>(store: &S, rule: &NewRule) -> Result<()> {
    if rule.name.trim().is_empty() {
        return Err(ScheduleError::validation("rule name must not be empty"));
    }
    if rule.r#type == EntryType::Transfer {
        return Err(ScheduleError::validation(
            "recurring rules are income or expense, not transfer",
        ));
    }
    check_amount(rule.amount)?;
    check_anchor(rule.frequency, rule.day_of_week, rule.day_of_month)?;
    if let Some(end) = rule.end_date {
        if end < rule.start_date {
            return Err(ScheduleError::validation(format!(
                "end date {} is before start date {}",
                end, rule.start_date
            )));
        }
    }
    if let Some(account_id) = rule.account_id {
        if store.account(account_id)?.is_none() {
            return Err(ScheduleError::not_found("account", account_id));
        }
    }
    Ok(())
}

pub fn get_rule<S: Store>(store: &S, id: i64) -> Result<RecurringRule> {
    store
        .rule(id)?
        .ok_or_else(|| ScheduleError::not_found("rule", id))
}

pub fn list_rules<S: Store>(store: &S) -> Result<Vec<RecurringRule>> {
    store.rules()
}

pub fn create_rule<S: Store>(store: &S, rule: &NewRule) -> Result<RecurringRule> {
    validate_rule(store, rule)?;
    let id = store.insert_rule(rule)?;
    info!(rule_id = id, name = %rule.name, frequency = %rule.frequency, "created recurring rule");
    get_rule(store, id)
}

/// Replaces a rule's definition. Already materialized instances keep their dates.
pub fn update_rule<S: Store>(store: &S, id: i64, rule: &NewRule) -> Result<RecurringRule> {
    validate_rule(store, rule)?;
    if !store.replace_rule(id, rule)? {
        return Err(ScheduleError::not_found("rule", id));
    }
    info!(rule_id = id, "updated recurring rule");
    get_rule(store, id)
}

pub fn set_rule_active<S: Store>(store: &S, id: i64, active: bool) -> Result<()> {
    if !store.set_rule_active(id, active)? {
        return Err(ScheduleError::not_found("rule", id));
    }
    info!(rule_id = id, active, "toggled recurring rule");
    Ok(())
}

/// Removes the rule with its instances and exceptions. Ledger rows created by
/// earlier completions stay.
pub fn delete_rule<S: Store>(store: &S, id: i64) -> Result<()> {
    let removed = store.atomic(|s| s.delete_rule(id))?;
    if !removed {
        return Err(ScheduleError::not_found("rule", id));
    }
    info!(rule_id = id, "deleted recurring rule");
    Ok(())
}

/// "Apply to future": new base amount, and every exception on or after
/// `from` is dropped so those dates fall back to it.
pub fn set_amount_from_date<S: Store>(
    store: &S,
    rule_id: i64,
    amount: Decimal,
    from: NaiveDate,
) -> Result<usize> {
    check_amount(amount)?;
    let dropped = store.atomic(|s| {
        if !s.update_rule_amount(rule_id, amount)? {
            return Err(ScheduleError::not_found("rule", rule_id));
        }
        s.delete_exceptions_from(rule_id, from)
    })?;
    info!(rule_id, %amount, %from, dropped, "applied amount to future occurrences");
    Ok(dropped)
}

/// Writes the exception keyed by `(rule_id, date)`. Skipping an occurrence
/// that is already completed is refused; reopen it first.
pub fn upsert_exception<S: Store>(
    store: &S,
    rule_id: i64,
    date: NaiveDate,
    amount: Option<Decimal>,
    note: Option<&str>,
    skip: bool,
) -> Result<RecurringException> {
    if let Some(a) = amount {
        check_amount(a)?;
    }
    get_rule(store, rule_id)?;
    if skip {
        if let Some(instance) = store.instance_on(rule_id, date)? {
            if instance.completed {
                return Err(ScheduleError::validation(format!(
                    "occurrence on {} is completed; reopen it before skipping",
                    date
                )));
            }
        }
    }
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let exception = store.upsert_exception(rule_id, date, amount, note, skip)?;
    info!(rule_id, %date, skip, exception_id = exception.id, "saved exception");
    Ok(exception)
}

pub fn delete_exception<S: Store>(store: &S, id: i64) -> Result<()> {
    if !store.delete_exception(id)? {
        return Err(ScheduleError::not_found("exception", id));
    }
    Ok(())
}

/// Returns whether an exception existed on that date.
pub fn delete_exception_on<S: Store>(store: &S, rule_id: i64, date: NaiveDate) -> Result<bool> {
    get_rule(store, rule_id)?;
    store.delete_exception_on(rule_id, date)
}
