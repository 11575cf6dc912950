// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pending/completed transitions for instances and bills.
//!
//! Completing writes a ledger transaction and links it; reopening deletes the
//! linked transaction and clears the link. Both writes of a transition run in
//! one atomic unit, ledger first.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScheduleError};
use crate::models::{EntryType, NewTransaction, RecurringInstance};
use crate::resolver::resolve;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Toggle {
    pub completed: bool,
    pub transaction_id: Option<i64>,
}

fn unlink<S: Store>(store: &S, transaction_id: Option<i64>) -> Result<()> {
    if let Some(tx_id) = transaction_id {
        if !store.delete_transaction(tx_id)? {
            debug!(transaction_id = tx_id, "linked transaction already gone");
        }
    }
    Ok(())
}

/// What completing `instance` records: the effective amount to freeze on the
/// row, and a ledger entry when there is a live account to book it against.
struct Booking {
    amount: Option<Decimal>,
    entry: Option<NewTransaction>,
}

fn booking<S: Store>(
    store: &S,
    instance: &RecurringInstance,
    now: NaiveDateTime,
) -> Result<Booking> {
    let Some(rule) = store.rule(instance.recurring_id)? else {
        warn!(
            instance_id = instance.id,
            rule_id = instance.recurring_id,
            "owning rule missing; completing without a transaction"
        );
        return Ok(Booking {
            amount: None,
            entry: None,
        });
    };
    let exceptions = store.exceptions_for(rule.id)?;
    let amount = resolve(&rule, instance.due_date, &exceptions).effective_amount;

    let account_id = match rule.account_id {
        Some(id) if store.account(id)?.is_some() => Some(id),
        Some(id) => {
            warn!(
                instance_id = instance.id,
                account_id = id,
                "linked account missing; completing without a transaction"
            );
            None
        }
        None => None,
    };
    let entry = account_id.map(|account_id| NewTransaction {
        date: now.date(),
        account_id,
        amount,
        r#type: rule.r#type,
        category_id: rule.category_id,
        transfer_to_account_id: None,
        description: rule.name.clone(),
    });
    Ok(Booking {
        amount: Some(amount),
        entry,
    })
}

/// Flips an instance between pending and completed. A completion books the
/// effective amount on `now`'s date, not on the due date, and freezes that
/// amount on the instance.
pub fn toggle_instance<S: Store>(store: &S, instance_id: i64, now: NaiveDateTime) -> Result<Toggle> {
    store.atomic(|s| {
        let instance = s
            .instance(instance_id)?
            .ok_or_else(|| ScheduleError::not_found("instance", instance_id))?;
        if instance.completed {
            unlink(s, instance.transaction_id)?;
            s.set_instance_completion(instance.id, None, None, None)?;
            info!(instance_id, "instance reopened");
            return Ok(Toggle {
                completed: false,
                transaction_id: None,
            });
        }
        let Booking { amount, entry } = booking(s, &instance, now)?;
        let tx_id = match entry {
            Some(entry) => Some(s.insert_transaction(&entry)?),
            None => None,
        };
        s.set_instance_completion(instance.id, Some(now), amount, tx_id)?;
        info!(instance_id, transaction_id = ?tx_id, "instance completed");
        Ok(Toggle {
            completed: true,
            transaction_id: tx_id,
        })
    })
}

/// Flips a bill between pending and completed. A completion books a transfer
/// from the card's linked account into the card, dated on the payment date.
pub fn toggle_bill<S: Store>(store: &S, bill_id: i64, now: NaiveDateTime) -> Result<Toggle> {
    store.atomic(|s| {
        let bill = s
            .bill(bill_id)?
            .ok_or_else(|| ScheduleError::not_found("bill", bill_id))?;
        if bill.completed {
            unlink(s, bill.transaction_id)?;
            s.set_bill_completion(bill.id, None, None)?;
            info!(bill_id, "bill reopened");
            return Ok(Toggle {
                completed: false,
                transaction_id: None,
            });
        }

        let card = s.account(bill.account_id)?;
        let source = match card.as_ref().and_then(|c| c.linked_account_id) {
            Some(id) => s.account(id)?,
            None => None,
        };
        let tx_id = match (card, source) {
            (Some(card), Some(source)) => Some(s.insert_transaction(&NewTransaction {
                date: bill.payment_date,
                account_id: source.id,
                amount: bill.amount,
                r#type: EntryType::Transfer,
                category_id: None,
                transfer_to_account_id: Some(card.id),
                description: format!("Credit card payment: {}", card.name),
            })?),
            _ => {
                warn!(bill_id, "no paying account linked; completing without a transaction");
                None
            }
        };
        s.set_bill_completion(bill.id, Some(now), tx_id)?;
        info!(bill_id, transaction_id = ?tx_id, "bill completed");
        Ok(Toggle {
            completed: true,
            transaction_id: tx_id,
        })
    })
}
