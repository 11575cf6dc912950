// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::{BillView, ensure_bills_for_month};
use crate::completion::toggle_bill;
use crate::store::SqliteStore;
use crate::utils::{fmt_money, maybe_print_json, parse_id, parse_month, pretty_table, yes_no};
use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::new(conn);
    match m.subcommand() {
        Some(("month", sub)) => month(&store, sub)?,
        Some(("toggle", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let t = toggle_bill(&store, id, Local::now().naive_local())?;
            match (t.completed, t.transaction_id) {
                (true, Some(tx)) => println!("Bill {} paid (transfer {})", id, tx),
                (true, None) => println!("Bill {} marked paid", id),
                (false, _) => println!("Bill {} reopened", id),
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn month_rows(store: &SqliteStore<'_>, raw: &str) -> Result<Vec<BillView>> {
    let (year, month) = parse_month(raw)?;
    ensure_bills_for_month(store, year, month)
        .with_context(|| format!("Materialize bills for {}", raw.trim()))
}

fn month(store: &SqliteStore<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let data = month_rows(store, sub.get_one::<String>("month").unwrap())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.account_name.clone(),
                format!("{} .. {}", b.period_start, b.period_end),
                b.payment_date.to_string(),
                fmt_money(&b.amount, &b.currency),
                b.linked_account_name.clone().unwrap_or_default(),
                yes_no(b.completed),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Card", "Period", "Pay by", "Amount", "Paid from", "Paid"],
            rows
        )
    );
    Ok(())
}
