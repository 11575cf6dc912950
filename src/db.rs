// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerloop", "ledgerloop"));

/// Ordered schema history. Entry `i` moves `user_version` from `i` to `i + 1`;
/// entries are append-only.
const MIGRATIONS: &[&str] = &[
    // 1: ledger basics
    r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        type TEXT NOT NULL,
        currency TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        account_id INTEGER NOT NULL,
        amount TEXT NOT NULL, -- always positive, sign implied by type
        type TEXT NOT NULL CHECK(type IN ('income','expense','transfer')),
        category_id INTEGER,
        transfer_to_account_id INTEGER,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL,
        FOREIGN KEY(transfer_to_account_id) REFERENCES accounts(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date);
    "#,
    // 2: recurring rules, their exceptions and materialized instances
    r#"
    CREATE TABLE IF NOT EXISTS recurring(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        account_id INTEGER,
        category_id INTEGER,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        frequency TEXT NOT NULL CHECK(frequency IN
            ('daily','weekly','monthly','bimonthly','quarterly','semiannually','yearly')),
        day_of_week INTEGER CHECK(day_of_week BETWEEN 0 AND 6),
        day_of_month INTEGER CHECK(day_of_month BETWEEN 1 AND 31),
        start_date TEXT NOT NULL,
        end_date TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE SET NULL,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS recurring_instances(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recurring_id INTEGER NOT NULL,
        due_date TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        completed_at TEXT,
        transaction_id INTEGER,
        UNIQUE(recurring_id, due_date),
        FOREIGN KEY(recurring_id) REFERENCES recurring(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS recurring_exceptions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recurring_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT,
        note TEXT,
        skip INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(recurring_id, date),
        FOREIGN KEY(recurring_id) REFERENCES recurring(id) ON DELETE CASCADE
    );
    "#,
    // 3: credit-card cycles
    r#"
    ALTER TABLE accounts ADD COLUMN billing_day INTEGER CHECK(billing_day BETWEEN 1 AND 31);
    ALTER TABLE accounts ADD COLUMN payment_day INTEGER CHECK(payment_day BETWEEN 1 AND 31);
    ALTER TABLE accounts ADD COLUMN linked_account_id INTEGER REFERENCES accounts(id) ON DELETE SET NULL;

    CREATE TABLE IF NOT EXISTS credit_card_bills(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        period_start TEXT NOT NULL,
        period_end TEXT NOT NULL,
        payment_date TEXT NOT NULL,
        amount TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        completed_at TEXT,
        transaction_id INTEGER,
        UNIQUE(account_id, period_start, period_end),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );
    "#,
    // 4: completed instances keep the amount they were completed at
    r#"
    ALTER TABLE recurring_instances ADD COLUMN amount TEXT;
    UPDATE recurring_instances
       SET amount=(SELECT t.amount FROM transactions t WHERE t.id=recurring_instances.transaction_id)
     WHERE completed=1;
    "#,
];

pub fn schema_version() -> usize {
    MIGRATIONS.len()
}

/// Default database location in the platform data dir.
pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerloop.sqlite"))
}

/// Opens `path` (or the default location) and brings the schema up to date.
pub fn open_or_init(path: Option<&Path>) -> Result<(Connection, PathBuf)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => db_path()?,
    };
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok((conn, path))
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    let current: usize = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let version = idx + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Apply schema migration {}", version))?;
        tx.pragma_update(None, "user_version", version as i64)?;
        tx.commit()?;
        info!(version, "applied schema migration");
    }
    debug!(version = MIGRATIONS.len(), "schema up to date");
    Ok(())
}
