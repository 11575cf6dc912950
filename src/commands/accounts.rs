// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_account, maybe_print_json, parse_day, pretty_table};
use anyhow::{Result, bail};
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let removed = conn.execute("DELETE FROM accounts WHERE name=?1", params![name])?;
            if removed == 0 {
                bail!("Account '{}' not found", name);
            }
            println!("Removed account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim();
    let typ = sub.get_one::<String>("type").unwrap();
    let ccy = sub.get_one::<String>("currency").unwrap().trim().to_uppercase();
    let billing_day = sub
        .get_one::<String>("billing-day")
        .map(|s| parse_day(s, 1..=31))
        .transpose()?;
    let payment_day = sub
        .get_one::<String>("payment-day")
        .map(|s| parse_day(s, 1..=31))
        .transpose()?;
    let linked = sub
        .get_one::<String>("linked")
        .map(|s| id_for_account(conn, s))
        .transpose()?;
    if typ != "credit" && (billing_day.is_some() || payment_day.is_some() || linked.is_some()) {
        bail!("--billing-day, --payment-day and --linked only apply to credit accounts");
    }
    conn.execute(
        "INSERT INTO accounts(name, type, currency, billing_day, payment_day, linked_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![name, typ, ccy, billing_day, payment_day, linked],
    )?;
    println!("Added account '{}' ({}, {})", name, typ, ccy);
    Ok(())
}

#[derive(Serialize)]
pub struct AccountRow {
    pub name: String,
    pub r#type: String,
    pub currency: String,
    pub billing_day: Option<u32>,
    pub payment_day: Option<u32>,
    pub linked: Option<String>,
}

pub fn query_rows(conn: &Connection) -> Result<Vec<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.name, a.type, a.currency, a.billing_day, a.payment_day, l.name
         FROM accounts a LEFT JOIN accounts l ON a.linked_account_id=l.id
         ORDER BY a.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(AccountRow {
            name: r.get(0)?,
            r#type: r.get(1)?,
            currency: r.get(2)?,
            billing_day: r.get(3)?,
            payment_day: r.get(4)?,
            linked: r.get(5)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let day = |d: Option<u32>| d.map(|v| v.to_string()).unwrap_or_default();
    let rows = data
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.r#type.clone(),
                a.currency.clone(),
                day(a.billing_day),
                day(a.payment_day),
                a.linked.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Name", "Type", "Currency", "Billing day", "Payment day", "Paid from"],
            rows
        )
    );
    Ok(())
}
