// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerloop::materialize::{ensure_instances_for_month, instances_for_month};
use ledgerloop::models::{EntryType, Frequency, NewRule};
use ledgerloop::{SqliteStore, db, rules};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn monthly(name: &str, amount: i64, dom: u32, r#type: EntryType) -> NewRule {
    NewRule {
        name: name.into(),
        account_id: None,
        category_id: None,
        amount: Decimal::new(amount, 0),
        r#type,
        frequency: Frequency::Monthly,
        day_of_week: None,
        day_of_month: Some(dom),
        start_date: d(2024, 1, 1),
        end_date: None,
    }
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).unwrap()
}

#[test]
fn repeated_materialization_is_idempotent() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let rule = rules::create_rule(&store, &monthly("Rent", 1000, 1, EntryType::Expense)).unwrap();

    let first = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    let second = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM recurring_instances"), 1);
}

#[test]
fn at_most_one_instance_per_due_date() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let mut gym = monthly("Gym", 20, 1, EntryType::Expense);
    gym.frequency = Frequency::Weekly;
    gym.day_of_week = Some(1);
    gym.day_of_month = None;
    let rule = rules::create_rule(&store, &gym).unwrap();

    ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    instances_for_month(&store, 2024, 3).unwrap();
    ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM recurring_instances"), 4);
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(DISTINCT recurring_id || '@' || due_date) FROM recurring_instances"
        ),
        4
    );
}

#[test]
fn exception_added_later_changes_view_not_identity() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let rule = rules::create_rule(&store, &monthly("Salary", 1000, 1, EntryType::Income)).unwrap();

    let before = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].due_date, d(2024, 3, 1));
    assert_eq!(before[0].amount, Decimal::new(1000, 0));
    assert!(!before[0].is_modified);

    rules::upsert_exception(&store, rule.id, d(2024, 3, 1), Some(Decimal::new(1200, 0)), None, false)
        .unwrap();

    let after = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].amount, Decimal::new(1200, 0));
    assert_eq!(after[0].original_amount, Decimal::new(1000, 0));
    assert!(after[0].is_modified);
    assert!(after[0].exception_id.is_some());

    let stored: String = conn
        .query_row("SELECT amount FROM recurring WHERE id=?1", params![rule.id], |r| r.get(0))
        .unwrap();
    assert_eq!(stored, "1000");
}

#[test]
fn skipped_occurrence_is_hidden_but_kept() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let rule = rules::create_rule(&store, &monthly("Rent", 900, 1, EntryType::Expense)).unwrap();
    rules::upsert_exception(&store, rule.id, d(2024, 3, 1), None, None, true).unwrap();

    let shown = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert!(shown.is_empty());
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM recurring_instances WHERE completed=0"),
        1
    );

    rules::delete_exception_on(&store, rule.id, d(2024, 3, 1)).unwrap();
    let shown = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM recurring_instances"), 1);
}

#[test]
fn row_written_by_another_writer_is_reused() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let rule = rules::create_rule(&store, &monthly("Rent", 900, 1, EntryType::Expense)).unwrap();
    conn.execute(
        "INSERT INTO recurring_instances(recurring_id, due_date) VALUES (?1, '2024-03-01')",
        params![rule.id],
    )
    .unwrap();
    let existing = conn.last_insert_rowid();

    let shown = ensure_instances_for_month(&store, rule.id, 2024, 3).unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, existing);
}

#[test]
fn month_view_orders_by_due_date_then_name() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    rules::create_rule(&store, &monthly("Rent", 900, 1, EntryType::Expense)).unwrap();
    rules::create_rule(&store, &monthly("Salary", 3000, 15, EntryType::Income)).unwrap();
    rules::create_rule(&store, &monthly("Gym", 30, 1, EntryType::Expense)).unwrap();

    let all = instances_for_month(&store, 2024, 3).unwrap();
    let names: Vec<_> = all.iter().map(|v| v.rule_name.as_str()).collect();
    assert_eq!(names, vec!["Gym", "Rent", "Salary"]);
    assert_eq!(all[2].due_date, d(2024, 3, 15));
    assert_eq!(all[2].r#type, EntryType::Income);
}

#[test]
fn paused_and_ended_rules_are_left_out() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let paused = rules::create_rule(&store, &monthly("Paused", 10, 5, EntryType::Expense)).unwrap();
    rules::set_rule_active(&store, paused.id, false).unwrap();
    let mut ended = monthly("Ended", 10, 5, EntryType::Expense);
    ended.end_date = Some(d(2024, 2, 29));
    rules::create_rule(&store, &ended).unwrap();

    assert!(instances_for_month(&store, 2024, 3).unwrap().is_empty());
    assert!(ensure_instances_for_month(&store, paused.id, 2024, 3).unwrap().is_empty());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM recurring_instances"), 0);
}

#[test]
fn errors_distinguish_bad_input_from_missing_rule() {
    let conn = db::open_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let rule = rules::create_rule(&store, &monthly("Rent", 900, 1, EntryType::Expense)).unwrap();

    assert!(ensure_instances_for_month(&store, 42, 2024, 3).unwrap_err().is_not_found());
    assert!(ensure_instances_for_month(&store, rule.id, 2024, 13).unwrap_err().is_validation());
    assert!(instances_for_month(&store, 2024, 0).unwrap_err().is_validation());
}
