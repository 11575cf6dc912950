// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence seams consumed by the scheduling core.
//!
//! Lookups return `Ok(None)` for missing rows; callers decide whether that is a
//! not-found error. Mutations that target a single row return whether a row
//! was touched.

pub mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::calendar::BillingPeriod;
use crate::errors::Result;
use crate::models::{
    Account, CreditCardBill, NewRule, NewTransaction, RecurringException, RecurringInstance,
    RecurringRule, Transaction,
};

pub trait RuleStore {
    fn rule(&self, id: i64) -> Result<Option<RecurringRule>>;
    /// All rules, ordered by name.
    fn rules(&self) -> Result<Vec<RecurringRule>>;
    fn insert_rule(&self, rule: &NewRule) -> Result<i64>;
    fn replace_rule(&self, id: i64, rule: &NewRule) -> Result<bool>;
    fn update_rule_amount(&self, id: i64, amount: Decimal) -> Result<bool>;
    fn set_rule_active(&self, id: i64, active: bool) -> Result<bool>;
    fn delete_rule(&self, id: i64) -> Result<bool>;
}

pub trait ExceptionStore {
    /// Exceptions of one rule, ordered by date.
    fn exceptions_for(&self, rule_id: i64) -> Result<Vec<RecurringException>>;
    fn exception_on(&self, rule_id: i64, date: NaiveDate) -> Result<Option<RecurringException>>;
    /// Insert or overwrite the exception keyed by `(rule_id, date)`.
    fn upsert_exception(
        &self,
        rule_id: i64,
        date: NaiveDate,
        amount: Option<Decimal>,
        note: Option<&str>,
        skip: bool,
    ) -> Result<RecurringException>;
    fn delete_exception(&self, id: i64) -> Result<bool>;
    fn delete_exception_on(&self, rule_id: i64, date: NaiveDate) -> Result<bool>;
    /// Drops every exception of `rule_id` dated on or after `from`; returns the count.
    fn delete_exceptions_from(&self, rule_id: i64, from: NaiveDate) -> Result<usize>;
}

pub trait InstanceStore {
    fn instance(&self, id: i64) -> Result<Option<RecurringInstance>>;
    fn instance_on(&self, rule_id: i64, due_date: NaiveDate) -> Result<Option<RecurringInstance>>;
    /// Inserts a pending instance unless `(rule_id, due_date)` already exists.
    /// Returns false when another writer got there first.
    fn insert_instance(&self, rule_id: i64, due_date: NaiveDate) -> Result<bool>;
    /// Instances of `rule_id` due within `[from, to]`, ordered by due date.
    fn instances_between(
        &self,
        rule_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RecurringInstance>>;
    /// `completed_at = None` means pending; `amount` is the frozen effective amount.
    fn set_instance_completion(
        &self,
        id: i64,
        completed_at: Option<NaiveDateTime>,
        amount: Option<Decimal>,
        transaction_id: Option<i64>,
    ) -> Result<()>;
    /// Completed instances, for integrity checks.
    fn completed_instances(&self) -> Result<Vec<RecurringInstance>>;
}

pub trait BillStore {
    fn bill(&self, id: i64) -> Result<Option<CreditCardBill>>;
    fn bill_for_period(
        &self,
        account_id: i64,
        period: BillingPeriod,
    ) -> Result<Option<CreditCardBill>>;
    /// Inserts a pending bill unless `(account_id, period)` already exists.
    fn insert_bill(
        &self,
        account_id: i64,
        period: BillingPeriod,
        payment_date: NaiveDate,
        amount: Decimal,
    ) -> Result<bool>;
    fn update_bill_amount(&self, id: i64, amount: Decimal, payment_date: NaiveDate) -> Result<()>;
    fn set_bill_completion(
        &self,
        id: i64,
        completed_at: Option<NaiveDateTime>,
        transaction_id: Option<i64>,
    ) -> Result<()>;
    fn completed_bills(&self) -> Result<Vec<CreditCardBill>>;
}

pub trait LedgerStore {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64>;
    fn transaction(&self, id: i64) -> Result<Option<Transaction>>;
    fn delete_transaction(&self, id: i64) -> Result<bool>;
    /// Sum of expense amounts on `account_id` dated within `[from, to]`.
    fn expense_total(&self, account_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Decimal>;
}

pub trait AccountStore {
    fn account(&self, id: i64) -> Result<Option<Account>>;
    /// Credit accounts, including those still missing an anchor day.
    fn credit_accounts(&self) -> Result<Vec<Account>>;
}

/// Everything the core needs, plus a failure-atomic boundary.
pub trait Store:
    RuleStore + ExceptionStore + InstanceStore + BillStore + LedgerStore + AccountStore
{
    /// Runs `f` so that either all of its writes land or none do.
    fn atomic<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>;
}
