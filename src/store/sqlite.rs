// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{
    AccountStore, BillStore, ExceptionStore, InstanceStore, LedgerStore, RuleStore, Store,
};
use crate::calendar::BillingPeriod;
use crate::errors::Result;
use crate::models::{
    Account, CreditCardBill, NewRule, NewTransaction, RecurringException, RecurringInstance,
    RecurringRule, Transaction,
};

/// Store backed by one SQLite connection. All row decoding happens here.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }
}

fn parsed_at<T>(r: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = r.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = r.get(idx)?;
    raw.map(|s| {
        s.parse::<Decimal>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

const RULE_COLUMNS: &str = "id, name, account_id, category_id, amount, type, frequency, \
     day_of_week, day_of_month, start_date, end_date, active, created_at, updated_at";

fn rule_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringRule> {
    Ok(RecurringRule {
        id: r.get(0)?,
        name: r.get(1)?,
        account_id: r.get(2)?,
        category_id: r.get(3)?,
        amount: parsed_at(r, 4)?,
        r#type: parsed_at(r, 5)?,
        frequency: parsed_at(r, 6)?,
        day_of_week: r.get(7)?,
        day_of_month: r.get(8)?,
        start_date: r.get(9)?,
        end_date: r.get(10)?,
        active: r.get(11)?,
        created_at: r.get(12)?,
        updated_at: r.get(13)?,
    })
}

const INSTANCE_COLUMNS: &str =
    "id, recurring_id, due_date, completed, completed_at, transaction_id, amount";

fn instance_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringInstance> {
    Ok(RecurringInstance {
        id: r.get(0)?,
        recurring_id: r.get(1)?,
        due_date: r.get(2)?,
        completed: r.get(3)?,
        completed_at: r.get(4)?,
        transaction_id: r.get(5)?,
        amount: opt_decimal_at(r, 6)?,
    })
}

const EXCEPTION_COLUMNS: &str = "id, recurring_id, date, amount, note, skip, created_at";

fn exception_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringException> {
    Ok(RecurringException {
        id: r.get(0)?,
        recurring_id: r.get(1)?,
        date: r.get(2)?,
        amount: opt_decimal_at(r, 3)?,
        note: r.get(4)?,
        skip: r.get(5)?,
        created_at: r.get(6)?,
    })
}

const BILL_COLUMNS: &str = "id, account_id, period_start, period_end, payment_date, amount, \
     completed, completed_at, transaction_id";

fn bill_from_row(r: &Row<'_>) -> rusqlite::Result<CreditCardBill> {
    Ok(CreditCardBill {
        id: r.get(0)?,
        account_id: r.get(1)?,
        period_start: r.get(2)?,
        period_end: r.get(3)?,
        payment_date: r.get(4)?,
        amount: parsed_at(r, 5)?,
        completed: r.get(6)?,
        completed_at: r.get(7)?,
        transaction_id: r.get(8)?,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, name, type, currency, billing_day, payment_day, linked_account_id";

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        name: r.get(1)?,
        r#type: parsed_at(r, 2)?,
        currency: r.get(3)?,
        billing_day: r.get(4)?,
        payment_day: r.get(5)?,
        linked_account_id: r.get(6)?,
    })
}

fn transaction_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        date: r.get(1)?,
        account_id: r.get(2)?,
        amount: parsed_at(r, 3)?,
        r#type: parsed_at(r, 4)?,
        category_id: r.get(5)?,
        transfer_to_account_id: r.get(6)?,
        description: r.get(7)?,
    })
}

impl RuleStore for SqliteStore<'_> {
    fn rule(&self, id: i64) -> Result<Option<RecurringRule>> {
        let sql = format!("SELECT {} FROM recurring WHERE id=?1", RULE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], rule_from_row)
            .optional()?)
    }

    fn rules(&self) -> Result<Vec<RecurringRule>> {
        let sql = format!("SELECT {} FROM recurring ORDER BY name, id", RULE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], rule_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert_rule(&self, rule: &NewRule) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO recurring(name, account_id, category_id, amount, type, frequency,
                                   day_of_week, day_of_month, start_date, end_date)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                rule.name,
                rule.account_id,
                rule.category_id,
                rule.amount.to_string(),
                rule.r#type.as_str(),
                rule.frequency.as_str(),
                rule.day_of_week,
                rule.day_of_month,
                rule.start_date,
                rule.end_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn replace_rule(&self, id: i64, rule: &NewRule) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE recurring SET name=?2, account_id=?3, category_id=?4, amount=?5, type=?6,
                    frequency=?7, day_of_week=?8, day_of_month=?9, start_date=?10, end_date=?11,
                    updated_at=datetime('now')
             WHERE id=?1",
            params![
                id,
                rule.name,
                rule.account_id,
                rule.category_id,
                rule.amount.to_string(),
                rule.r#type.as_str(),
                rule.frequency.as_str(),
                rule.day_of_week,
                rule.day_of_month,
                rule.start_date,
                rule.end_date,
            ],
        )?;
        Ok(changed > 0)
    }

    fn update_rule_amount(&self, id: i64, amount: Decimal) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE recurring SET amount=?2, updated_at=datetime('now') WHERE id=?1",
            params![id, amount.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn set_rule_active(&self, id: i64, active: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE recurring SET active=?2, updated_at=datetime('now') WHERE id=?1",
            params![id, active],
        )?;
        Ok(changed > 0)
    }

    fn delete_rule(&self, id: i64) -> Result<bool> {
        // Explicit so the cascade holds even on connections without foreign_keys.
        self.conn.execute(
            "DELETE FROM recurring_instances WHERE recurring_id=?1",
            params![id],
        )?;
        self.conn.execute(
            "DELETE FROM recurring_exceptions WHERE recurring_id=?1",
            params![id],
        )?;
        let changed = self
            .conn
            .execute("DELETE FROM recurring WHERE id=?1", params![id])?;
        Ok(changed > 0)
    }
}

impl ExceptionStore for SqliteStore<'_> {
    fn exceptions_for(&self, rule_id: i64) -> Result<Vec<RecurringException>> {
        let sql = format!(
            "SELECT {} FROM recurring_exceptions WHERE recurring_id=?1 ORDER BY date",
            EXCEPTION_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![rule_id], exception_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn exception_on(&self, rule_id: i64, date: NaiveDate) -> Result<Option<RecurringException>> {
        let sql = format!(
            "SELECT {} FROM recurring_exceptions WHERE recurring_id=?1 AND date=?2",
            EXCEPTION_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![rule_id, date], exception_from_row)
            .optional()?)
    }

    fn upsert_exception(
        &self,
        rule_id: i64,
        date: NaiveDate,
        amount: Option<Decimal>,
        note: Option<&str>,
        skip: bool,
    ) -> Result<RecurringException> {
        self.conn.execute(
            "INSERT INTO recurring_exceptions(recurring_id, date, amount, note, skip)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(recurring_id, date) DO UPDATE SET
                amount=excluded.amount, note=excluded.note, skip=excluded.skip",
            params![rule_id, date, amount.map(|a| a.to_string()), note, skip],
        )?;
        let sql = format!(
            "SELECT {} FROM recurring_exceptions WHERE recurring_id=?1 AND date=?2",
            EXCEPTION_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![rule_id, date], exception_from_row)?)
    }

    fn delete_exception(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM recurring_exceptions WHERE id=?1", params![id])?;
        Ok(changed > 0)
    }

    fn delete_exception_on(&self, rule_id: i64, date: NaiveDate) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM recurring_exceptions WHERE recurring_id=?1 AND date=?2",
            params![rule_id, date],
        )?;
        Ok(changed > 0)
    }

    fn delete_exceptions_from(&self, rule_id: i64, from: NaiveDate) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM recurring_exceptions WHERE recurring_id=?1 AND date>=?2",
            params![rule_id, from],
        )?)
    }
}

impl InstanceStore for SqliteStore<'_> {
    fn instance(&self, id: i64) -> Result<Option<RecurringInstance>> {
        let sql = format!(
            "SELECT {} FROM recurring_instances WHERE id=?1",
            INSTANCE_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], instance_from_row)
            .optional()?)
    }

    fn instance_on(&self, rule_id: i64, due_date: NaiveDate) -> Result<Option<RecurringInstance>> {
        let sql = format!(
            "SELECT {} FROM recurring_instances WHERE recurring_id=?1 AND due_date=?2",
            INSTANCE_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt
            .query_row(params![rule_id, due_date], instance_from_row)
            .optional()?)
    }

    fn insert_instance(&self, rule_id: i64, due_date: NaiveDate) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO recurring_instances(recurring_id, due_date) VALUES (?1,?2)
             ON CONFLICT(recurring_id, due_date) DO NOTHING",
            params![rule_id, due_date],
        )?;
        Ok(changed > 0)
    }

    fn instances_between(
        &self,
        rule_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RecurringInstance>> {
        let sql = format!(
            "SELECT {} FROM recurring_instances
             WHERE recurring_id=?1 AND due_date BETWEEN ?2 AND ?3
             ORDER BY due_date",
            INSTANCE_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![rule_id, from, to], instance_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn set_instance_completion(
        &self,
        id: i64,
        completed_at: Option<NaiveDateTime>,
        amount: Option<Decimal>,
        transaction_id: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE recurring_instances
                SET completed=?2, completed_at=?3, amount=?4, transaction_id=?5
              WHERE id=?1",
            params![
                id,
                completed_at.is_some(),
                completed_at,
                amount.map(|a| a.to_string()),
                transaction_id
            ],
        )?;
        Ok(())
    }

    fn completed_instances(&self) -> Result<Vec<RecurringInstance>> {
        let sql = format!(
            "SELECT {} FROM recurring_instances WHERE completed=1 ORDER BY due_date, id",
            INSTANCE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], instance_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl BillStore for SqliteStore<'_> {
    fn bill(&self, id: i64) -> Result<Option<CreditCardBill>> {
        let sql = format!("SELECT {} FROM credit_card_bills WHERE id=?1", BILL_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], bill_from_row)
            .optional()?)
    }

    fn bill_for_period(
        &self,
        account_id: i64,
        period: BillingPeriod,
    ) -> Result<Option<CreditCardBill>> {
        let sql = format!(
            "SELECT {} FROM credit_card_bills
             WHERE account_id=?1 AND period_start=?2 AND period_end=?3",
            BILL_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt
            .query_row(params![account_id, period.start, period.end], bill_from_row)
            .optional()?)
    }

    fn insert_bill(
        &self,
        account_id: i64,
        period: BillingPeriod,
        payment_date: NaiveDate,
        amount: Decimal,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO credit_card_bills(account_id, period_start, period_end, payment_date, amount)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(account_id, period_start, period_end) DO NOTHING",
            params![
                account_id,
                period.start,
                period.end,
                payment_date,
                amount.to_string()
            ],
        )?;
        Ok(changed > 0)
    }

    fn update_bill_amount(&self, id: i64, amount: Decimal, payment_date: NaiveDate) -> Result<()> {
        self.conn.execute(
            "UPDATE credit_card_bills SET amount=?2, payment_date=?3 WHERE id=?1 AND completed=0",
            params![id, amount.to_string(), payment_date],
        )?;
        Ok(())
    }

    fn set_bill_completion(
        &self,
        id: i64,
        completed_at: Option<NaiveDateTime>,
        transaction_id: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE credit_card_bills SET completed=?2, completed_at=?3, transaction_id=?4
             WHERE id=?1",
            params![id, completed_at.is_some(), completed_at, transaction_id],
        )?;
        Ok(())
    }

    fn completed_bills(&self) -> Result<Vec<CreditCardBill>> {
        let sql = format!(
            "SELECT {} FROM credit_card_bills WHERE completed=1 ORDER BY payment_date, id",
            BILL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], bill_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl LedgerStore for SqliteStore<'_> {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions(date, account_id, amount, type, category_id,
                                      transfer_to_account_id, description)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                tx.date,
                tx.account_id,
                tx.amount.to_string(),
                tx.r#type.as_str(),
                tx.category_id,
                tx.transfer_to_account_id,
                tx.description,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, date, account_id, amount, type, category_id,
                        transfer_to_account_id, description
                 FROM transactions WHERE id=?1",
                params![id],
                transaction_from_row,
            )
            .optional()?)
    }

    fn delete_transaction(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        Ok(changed > 0)
    }

    fn expense_total(&self, account_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Decimal> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT amount FROM transactions
             WHERE account_id=?1 AND type='expense' AND date>=?2 AND date<=?3",
        )?;
        let rows = stmt.query_map(params![account_id, from, to], |r| parsed_at::<Decimal>(r, 0))?;
        let mut total = Decimal::ZERO;
        for row in rows {
            total += row?;
        }
        Ok(total)
    }
}

impl AccountStore for SqliteStore<'_> {
    fn account(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id=?1", ACCOUNT_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], account_from_row)
            .optional()?)
    }

    fn credit_accounts(&self) -> Result<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE type='credit' ORDER BY name",
            ACCOUNT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], account_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl Store for SqliteStore<'_> {
    fn atomic<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        // Already inside an outer transaction: it owns commit and rollback.
        if !self.conn.is_autocommit() {
            return f(self);
        }
        // Dropping the guard without commit rolls back.
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}
