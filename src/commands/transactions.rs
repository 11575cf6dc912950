// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{EntryType, NewTransaction};
use crate::store::{LedgerStore, SqliteStore};
use crate::utils::{
    id_for_account, id_for_category, maybe_print_json, parse_date, parse_decimal, pretty_table,
};
use anyhow::{Result, bail};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let account_name = sub.get_one::<String>("account").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let r#type: EntryType = sub.get_one::<String>("type").unwrap().parse()?;
    if amount <= Decimal::ZERO {
        bail!("Amount must be positive; the type carries the sign");
    }

    let account_id = id_for_account(conn, account_name)?;
    let category_id = sub
        .get_one::<String>("category")
        .map(|c| id_for_category(conn, c))
        .transpose()?;
    let transfer_to = sub
        .get_one::<String>("to")
        .map(|a| id_for_account(conn, a))
        .transpose()?;
    match (r#type, transfer_to) {
        (EntryType::Transfer, None) => bail!("Transfers need --to"),
        (EntryType::Transfer, Some(to)) if to == account_id => {
            bail!("Cannot transfer an account to itself")
        }
        (EntryType::Income | EntryType::Expense, Some(_)) => bail!("--to only applies to transfers"),
        _ => {}
    }
    let description = sub
        .get_one::<String>("description")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let store = SqliteStore::new(conn);
    store.insert_transaction(&NewTransaction {
        date,
        account_id,
        amount,
        r#type,
        category_id,
        transfer_to_account_id: transfer_to,
        description,
    })?;
    println!(
        "Recorded {} {} on {} (acct: {})",
        r#type, amount, date, account_name
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.account.clone(),
                    r.r#type.clone(),
                    r.amount.clone(),
                    r.to_account.clone(),
                    r.category.clone(),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Account", "Type", "Amount", "To", "Category", "Description"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub account: String,
    pub r#type: String,
    pub amount: String,
    pub to_account: String,
    pub category: String,
    pub description: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, a.name, t.type, t.amount, d.name, c.name, t.description
         FROM transactions t
         LEFT JOIN accounts a ON t.account_id=a.id
         LEFT JOIN accounts d ON t.transfer_to_account_id=d.id
         LEFT JOIN categories c ON t.category_id=c.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.trim().into());
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND (a.name=? OR d.name=?)");
        params_vec.push(acct.trim().into());
        params_vec.push(acct.trim().into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let category: Option<String> = r.get(6)?;
        let to_account: Option<String> = r.get(5)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            account: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
            r#type: r.get(3)?,
            amount: r.get(4)?,
            to_account: to_account.unwrap_or_default(),
            category: category.unwrap_or_default(),
            description: r.get(7)?,
        });
    }
    Ok(data)
}
