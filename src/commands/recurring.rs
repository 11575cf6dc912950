// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::completion::toggle_instance;
use crate::materialize::{InstanceView, ensure_instances_for_month, instances_for_month};
use crate::models::NewRule;
use crate::resolver::occurrences;
use crate::rules;
use crate::store::SqliteStore;
use crate::utils::{
    id_for_account, id_for_category, maybe_print_json, parse_date, parse_day, parse_decimal,
    parse_id, parse_month, pretty_table, yes_no,
};
use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let store = SqliteStore::new(conn);
    match m.subcommand() {
        Some(("add", sub)) => {
            let rule = rules::create_rule(&store, &new_rule(conn, sub)?)?;
            println!("Added recurring rule {} '{}'", rule.id, rule.name);
        }
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let rule = rules::update_rule(&store, id, &new_rule(conn, sub)?)?;
            println!("Updated recurring rule {} '{}'", rule.id, rule.name);
        }
        Some(("list", sub)) => list(&store, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            rules::delete_rule(&store, id)?;
            println!("Removed recurring rule {}", id);
        }
        Some(("pause", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            rules::set_rule_active(&store, id, false)?;
            println!("Paused recurring rule {}", id);
        }
        Some(("resume", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            rules::set_rule_active(&store, id, true)?;
            println!("Resumed recurring rule {}", id);
        }
        Some(("set-amount", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let from = parse_date(sub.get_one::<String>("from").unwrap())?;
            let dropped = rules::set_amount_from_date(&store, id, amount, from)?;
            println!(
                "Rule {} now {} from {} ({} later override(s) removed)",
                id, amount, from, dropped
            );
        }
        Some(("occurrences", sub)) => preview(&store, sub)?,
        Some(("month", sub)) => month(&store, sub)?,
        Some(("toggle", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let t = toggle_instance(&store, id, Local::now().naive_local())?;
            if t.completed {
                match t.transaction_id {
                    Some(tx) => println!("Instance {} completed (transaction {})", id, tx),
                    None => println!("Instance {} completed", id),
                }
            } else {
                println!("Instance {} reopened", id);
            }
        }
        _ => {}
    }
    Ok(())
}

fn new_rule(conn: &Connection, sub: &clap::ArgMatches) -> Result<NewRule> {
    Ok(NewRule {
        name: sub.get_one::<String>("name").unwrap().trim().to_string(),
        account_id: sub
            .get_one::<String>("account")
            .map(|a| id_for_account(conn, a))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|c| id_for_category(conn, c))
            .transpose()?,
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        r#type: sub.get_one::<String>("type").unwrap().parse()?,
        frequency: sub.get_one::<String>("frequency").unwrap().parse()?,
        day_of_week: sub
            .get_one::<String>("day-of-week")
            .map(|d| parse_day(d, 0..=6))
            .transpose()?,
        day_of_month: sub
            .get_one::<String>("day-of-month")
            .map(|d| parse_day(d, 1..=31))
            .transpose()?,
        start_date: parse_date(sub.get_one::<String>("start").unwrap())?,
        end_date: sub
            .get_one::<String>("end")
            .map(|d| parse_date(d))
            .transpose()?,
    })
}

fn list(store: &SqliteStore<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let data = rules::list_rules(store)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|r| {
            let anchor = r
                .day_of_week
                .or(r.day_of_month)
                .map(|d| d.to_string())
                .unwrap_or_default();
            vec![
                r.id.to_string(),
                r.name.clone(),
                r.r#type.to_string(),
                format!("{:.2}", r.amount),
                r.frequency.to_string(),
                anchor,
                r.start_date.to_string(),
                r.end_date.map(|d| d.to_string()).unwrap_or_default(),
                yes_no(r.active),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Name", "Type", "Amount", "Frequency", "Day", "Start", "End", "Active"],
            rows
        )
    );
    Ok(())
}

fn preview(store: &SqliteStore<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(sub.get_one::<String>("id").unwrap())?;
    let from = parse_date(sub.get_one::<String>("from").unwrap())?;
    let to = parse_date(sub.get_one::<String>("to").unwrap())?;
    let data = occurrences(store, id, from, to)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|o| {
            let status = if o.is_skipped {
                "skipped"
            } else if o.is_modified {
                "modified"
            } else {
                ""
            };
            vec![
                o.date.to_string(),
                format!("{:.2}", o.original_amount),
                format!("{:.2}", o.effective_amount),
                status.to_string(),
                o.note.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Base", "Amount", "Status", "Note"], rows)
    );
    Ok(())
}

/// Instances for `raw` (YYYY-MM), for one rule or for every active rule.
pub fn month_rows(
    store: &SqliteStore<'_>,
    raw: &str,
    rule_id: Option<i64>,
) -> Result<Vec<InstanceView>> {
    let (year, month) = parse_month(raw)?;
    let data = match rule_id {
        Some(id) => ensure_instances_for_month(store, id, year, month),
        None => instances_for_month(store, year, month),
    };
    data.with_context(|| format!("Materialize instances for {}", raw.trim()))
}

fn month(store: &SqliteStore<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let rule_id = sub
        .get_one::<String>("id")
        .map(|id| parse_id(id))
        .transpose()?;
    let data = month_rows(store, sub.get_one::<String>("month").unwrap(), rule_id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|v| {
            vec![
                v.id.to_string(),
                v.due_date.to_string(),
                v.rule_name.clone(),
                v.r#type.to_string(),
                if v.is_modified {
                    format!("{:.2} (was {:.2})", v.amount, v.original_amount)
                } else {
                    format!("{:.2}", v.amount)
                },
                yes_no(v.completed),
                v.exception_note.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Due", "Rule", "Type", "Amount", "Done", "Note"],
            rows
        )
    );
    Ok(())
}
