// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::calendar::check_anchor;
use crate::store::{
    AccountStore, BillStore, InstanceStore, LedgerStore, RuleStore, SqliteStore,
};
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

/// `(issue, detail)` pairs; empty when everything is consistent.
pub fn find_issues(conn: &Connection) -> Result<Vec<(String, String)>> {
    let store = SqliteStore::new(conn);
    let mut issues = Vec::new();

    // 1) Rules whose stored anchor no longer matches their frequency
    for rule in store.rules()? {
        if let Err(e) = check_anchor(rule.frequency, rule.day_of_week, rule.day_of_month) {
            issues.push(("rule_bad_anchor".into(), format!("rule {}: {}", rule.id, e)));
        }
    }

    // 2) Completed instances: dangling or missing ledger links
    for inst in store.completed_instances()? {
        match inst.transaction_id {
            Some(tx) if store.transaction(tx)?.is_none() => issues.push((
                "instance_dangling_transaction".into(),
                format!("instance {} -> transaction {}", inst.id, tx),
            )),
            Some(_) => {}
            None => {
                let booked_account = match store.rule(inst.recurring_id)? {
                    Some(rule) => match rule.account_id {
                        Some(a) => store.account(a)?,
                        None => None,
                    },
                    None => None,
                };
                if let Some(account) = booked_account {
                    issues.push((
                        "instance_completed_unbooked".into(),
                        format!(
                            "instance {} due {} has no transaction on '{}'",
                            inst.id, inst.due_date, account.name
                        ),
                    ));
                }
            }
        }
    }

    // 3) Completed bills: same checks against the paying account
    for bill in store.completed_bills()? {
        match bill.transaction_id {
            Some(tx) if store.transaction(tx)?.is_none() => issues.push((
                "bill_dangling_transaction".into(),
                format!("bill {} -> transaction {}", bill.id, tx),
            )),
            Some(_) => {}
            None => {
                let payer = match store.account(bill.account_id)?.and_then(|c| c.linked_account_id) {
                    Some(id) => store.account(id)?,
                    None => None,
                };
                if let Some(payer) = payer {
                    issues.push((
                        "bill_completed_unbooked".into(),
                        format!(
                            "bill {} due {} has no transfer from '{}'",
                            bill.id, bill.payment_date, payer.name
                        ),
                    ));
                }
            }
        }
    }

    // 4) Credit accounts that can never produce a bill
    for card in store.credit_accounts()? {
        if card.billing_day.is_none() || card.payment_day.is_none() {
            issues.push((
                "credit_missing_anchor".into(),
                format!("account '{}' needs billing and payment days", card.name),
            ));
        }
    }

    Ok(issues)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = find_issues(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = issues.into_iter().map(|(i, d)| vec![i, d]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
