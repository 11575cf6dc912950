// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{bills, recurring};
use crate::store::SqliteStore;
use anyhow::{Result, bail};
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("schedule", sub)) => export_schedule(conn, sub),
        _ => Ok(()),
    }
}

fn export_schedule(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    let month = sub.get_one::<String>("month").unwrap();
    let store = SqliteStore::new(conn);
    let instances = recurring::month_rows(&store, month, None)?;
    let bills = bills::month_rows(&store, month)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["kind", "id", "name", "type", "date", "amount", "completed"])?;
            for i in &instances {
                wtr.write_record([
                    "instance".to_string(),
                    i.id.to_string(),
                    i.rule_name.clone(),
                    i.r#type.to_string(),
                    i.due_date.to_string(),
                    i.amount.to_string(),
                    i.completed.to_string(),
                ])?;
            }
            for b in &bills {
                wtr.write_record([
                    "bill".to_string(),
                    b.id.to_string(),
                    b.account_name.clone(),
                    "transfer".to_string(),
                    b.payment_date.to_string(),
                    b.amount.to_string(),
                    b.completed.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let doc = json!({ "instances": instances, "bills": bills });
            std::fs::write(out, serde_json::to_string_pretty(&doc)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    println!(
        "Exported {} instance(s) and {} bill(s) to {}",
        instances.len(),
        bills.len(),
        out
    );
    Ok(())
}
