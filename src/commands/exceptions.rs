// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::rules;
use crate::store::{ExceptionStore, SqliteStore};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, parse_id, pretty_table, yes_no};
use anyhow::{Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::new(conn);
    match m.subcommand() {
        Some(("set", sub)) => {
            let rule_id = parse_id(sub.get_one::<String>("rule").unwrap())?;
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let amount = sub
                .get_one::<String>("amount")
                .map(|a| parse_decimal(a))
                .transpose()?;
            let note = sub.get_one::<String>("note").map(String::as_str);
            let skip = sub.get_flag("skip");
            if amount.is_none() && note.is_none() && !skip {
                bail!("Nothing to set: pass --amount, --note or --skip");
            }
            let e = rules::upsert_exception(&store, rule_id, date, amount, note, skip)?;
            println!("Saved exception {} for rule {} on {}", e.id, rule_id, date);
        }
        Some(("list", sub)) => {
            let rule_id = parse_id(sub.get_one::<String>("rule").unwrap())?;
            rules::get_rule(&store, rule_id)?;
            let data = store.exceptions_for(rule_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.date.to_string(),
                            e.amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
                            yes_no(e.skip),
                            e.note.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Amount", "Skip", "Note"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            if let Some(raw) = sub.get_one::<String>("id") {
                let id = parse_id(raw)?;
                rules::delete_exception(&store, id)?;
                println!("Removed exception {}", id);
            } else if let (Some(rule), Some(date)) =
                (sub.get_one::<String>("rule"), sub.get_one::<String>("date"))
            {
                let rule_id = parse_id(rule)?;
                let date = parse_date(date)?;
                if rules::delete_exception_on(&store, rule_id, date)? {
                    println!("Removed exception for rule {} on {}", rule_id, date);
                } else {
                    println!("No exception for rule {} on {}", rule_id, date);
                }
            } else {
                bail!("Pass --id, or --rule with --date");
            }
        }
        _ => {}
    }
    Ok(())
}
