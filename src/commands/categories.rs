// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_category, maybe_print_json, pretty_table};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub.get_one::<String>("name").unwrap())?,
        Some(("list", sub)) => {
            let data = query_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|c| vec![c.name.clone(), c.rules.to_string(), c.transactions.to_string()])
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Category", "Rules", "Transactions"], rows)
                );
            }
        }
        Some(("rm", sub)) => remove(conn, sub.get_one::<String>("name").unwrap())?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, raw: &str) -> Result<()> {
    let name = raw.trim();
    if name.is_empty() {
        bail!("Category name must not be empty");
    }
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        bail!("Category '{}' already exists", name);
    }
    conn.execute("INSERT INTO categories(name) VALUES (?1)", params![name])?;
    println!("Added category '{}'", name);
    Ok(())
}

/// Recurring rules keep their category for future bookings, so a category in
/// use by a rule cannot be removed. Past transactions just lose the link.
fn remove(conn: &Connection, raw: &str) -> Result<()> {
    let name = raw.trim();
    let id = id_for_category(conn, name)?;
    let mut stmt = conn.prepare("SELECT name FROM recurring WHERE category_id=?1 ORDER BY name")?;
    let rules = stmt
        .query_map(params![id], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if !rules.is_empty() {
        bail!(
            "Category '{}' is used by recurring rule(s): {}",
            name,
            rules.join(", ")
        );
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    println!("Removed category '{}'", name);
    Ok(())
}

#[derive(Serialize)]
pub struct CategoryRow {
    pub name: String,
    pub rules: i64,
    pub transactions: i64,
}

pub fn query_rows(conn: &Connection) -> Result<Vec<CategoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.name,
                (SELECT COUNT(*) FROM recurring r WHERE r.category_id=c.id),
                (SELECT COUNT(*) FROM transactions t WHERE t.category_id=c.id)
         FROM categories c
         ORDER BY c.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(CategoryRow {
            name: r.get(0)?,
            rules: r.get(1)?,
            transactions: r.get(2)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}
