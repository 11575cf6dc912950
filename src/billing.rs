// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{billing_period, first_of_month, payment_date};
use crate::errors::{Result, ScheduleError};
use crate::models::{Account, CreditCardBill};
use crate::store::Store;

/// A bill joined with the display names of the card and its paying account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillView {
    pub id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub currency: String,
    pub linked_account_id: Option<i64>,
    pub linked_account_name: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub transaction_id: Option<i64>,
}

fn materialize_bill<S: Store>(
    store: &S,
    card: &Account,
    billing_day: u32,
    payment_day: u32,
    year: i32,
    month: u32,
) -> Result<Option<CreditCardBill>> {
    let period = billing_period(billing_day, year, month)?;
    let pay_on = payment_date(payment_day, year, month)?;
    let total = store.expense_total(card.id, period.start, period.end)?;
    debug!(account_id = card.id, start = %period.start, end = %period.end, %total, "billing period");

    let Some(existing) = store.bill_for_period(card.id, period)? else {
        if total.is_zero() {
            return Ok(None);
        }
        if store.insert_bill(card.id, period, pay_on, total)? {
            info!(account_id = card.id, end = %period.end, %total, "materialized bill");
        }
        return store
            .bill_for_period(card.id, period)?
            .ok_or(ScheduleError::Storage(rusqlite::Error::QueryReturnedNoRows))
            .map(Some);
    };

    // Completed bills are frozen at the amount that was paid.
    if existing.completed {
        return Ok(Some(existing));
    }
    if total.is_zero() {
        return Ok(None);
    }
    if existing.amount != total || existing.payment_date != pay_on {
        store.update_bill_amount(existing.id, total, pay_on)?;
        info!(bill_id = existing.id, from = %existing.amount, to = %total, "bill amount refreshed");
        return Ok(Some(CreditCardBill {
            amount: total,
            payment_date: pay_on,
            ..existing
        }));
    }
    Ok(Some(existing))
}

/// Materializes the statement closing in `year-month` for every credit
/// account with both anchor days, returning bills by payment date.
pub fn ensure_bills_for_month<S: Store>(store: &S, year: i32, month: u32) -> Result<Vec<BillView>> {
    first_of_month(year, month)?;
    store.atomic(|s| {
        let mut out = Vec::new();
        for card in s.credit_accounts()? {
            let (Some(billing_day), Some(payment_day)) = (card.billing_day, card.payment_day) else {
                debug!(account_id = card.id, "credit account without anchor days");
                continue;
            };
            let Some(bill) = materialize_bill(s, &card, billing_day, payment_day, year, month)?
            else {
                continue;
            };
            let linked_account_name = match card.linked_account_id {
                Some(id) => s.account(id)?.map(|a| a.name),
                None => None,
            };
            out.push(BillView {
                id: bill.id,
                account_id: card.id,
                account_name: card.name.clone(),
                currency: card.currency.clone(),
                linked_account_id: card.linked_account_id,
                linked_account_name,
                period_start: bill.period_start,
                period_end: bill.period_end,
                payment_date: bill.payment_date,
                amount: bill.amount,
                completed: bill.completed,
                completed_at: bill.completed_at,
                transaction_id: bill.transaction_id,
            });
        }
        out.sort_by(|a, b| {
            a.payment_date
                .cmp(&b.payment_date)
                .then_with(|| a.account_name.cmp(&b.account_name))
        });
        Ok(out)
    })
}
