// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ScheduleError;

/// How often a recurring rule falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannually,
    Yearly,
}

impl Frequency {
    /// Month step for day-of-month anchored frequencies, `None` otherwise.
    pub fn month_interval(self) -> Option<u32> {
        match self {
            Frequency::Daily | Frequency::Weekly => None,
            Frequency::Monthly => Some(1),
            Frequency::Bimonthly => Some(2),
            Frequency::Quarterly => Some(3),
            Frequency::Semiannually => Some(6),
            Frequency::Yearly => Some(12),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Bimonthly => "bimonthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Semiannually => "semiannually",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "bimonthly" => Ok(Frequency::Bimonthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "semiannually" => Ok(Frequency::Semiannually),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(ScheduleError::validation(format!(
                "unknown frequency '{}'",
                other
            ))),
        }
    }
}

/// Direction of money for rules and ledger rows. Amounts are stored unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Income,
    Expense,
    Transfer,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
            EntryType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(EntryType::Income),
            "expense" => Ok(EntryType::Expense),
            "transfer" => Ok(EntryType::Transfer),
            other => Err(ScheduleError::validation(format!(
                "unknown entry type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Bank,
    Cash,
    Credit,
    Savings,
    Investment,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Bank => "bank",
            AccountType::Cash => "cash",
            AccountType::Credit => "credit",
            AccountType::Savings => "savings",
            AccountType::Investment => "investment",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank" => Ok(AccountType::Bank),
            "cash" => Ok(AccountType::Cash),
            "credit" => Ok(AccountType::Credit),
            "savings" => Ok(AccountType::Savings),
            "investment" => Ok(AccountType::Investment),
            other => Err(ScheduleError::validation(format!(
                "unknown account type '{}'",
                other
            ))),
        }
    }
}

/// Anchor of a rule inside its period. Exactly one kind per frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    None,
    /// 0 = Sunday .. 6 = Saturday
    DayOfWeek(u32),
    DayOfMonth(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub r#type: AccountType,
    pub currency: String,
    pub billing_day: Option<u32>,
    pub payment_day: Option<u32>,
    pub linked_account_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: i64,
    pub name: String,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub r#type: EntryType,
    pub frequency: Frequency,
    pub day_of_week: Option<u32>,
    pub day_of_month: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurringRule {
    pub fn anchor(&self) -> Anchor {
        match self.frequency {
            Frequency::Daily => Anchor::None,
            Frequency::Weekly => self.day_of_week.map_or(Anchor::None, Anchor::DayOfWeek),
            _ => self.day_of_month.map_or(Anchor::None, Anchor::DayOfMonth),
        }
    }

    /// True when the active window `[start_date, end_date]` touches `[from, to]`.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date.is_none_or(|end| end >= from)
    }
}

/// Caller-supplied fields for creating or replacing a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub r#type: EntryType,
    pub frequency: Frequency,
    pub day_of_week: Option<u32>,
    pub day_of_month: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringInstance {
    pub id: i64,
    pub recurring_id: i64,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub transaction_id: Option<i64>,
    /// Effective amount frozen at completion; `None` while pending.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringException {
    pub id: i64,
    pub recurring_id: i64,
    pub date: NaiveDate,
    pub amount: Option<Decimal>,
    pub note: Option<String>,
    pub skip: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardBill {
    pub id: i64,
    pub account_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub account_id: i64,
    pub amount: Decimal,
    pub r#type: EntryType,
    pub category_id: Option<i64>,
    pub transfer_to_account_id: Option<i64>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub account_id: i64,
    pub amount: Decimal,
    pub r#type: EntryType,
    pub category_id: Option<i64>,
    pub transfer_to_account_id: Option<i64>,
    pub description: String,
}
