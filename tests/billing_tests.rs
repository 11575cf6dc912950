// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use ledgerloop::billing::ensure_bills_for_month;
use ledgerloop::completion::toggle_bill;
use ledgerloop::store::BillStore;
use ledgerloop::{SqliteStore, db};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(12, 0, 0).unwrap()
}

fn card(conn: &Connection, name: &str, billing: Option<u32>, payment: Option<u32>) -> i64 {
    conn.execute(
        "INSERT INTO accounts(name, type, currency, billing_day, payment_day, linked_account_id)
         VALUES (?1, 'credit', 'USD', ?2, ?3, 1)",
        params![name, billing, payment],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn spend(conn: &Connection, account_id: i64, date: &str, amount: &str, kind: &str) {
    conn.execute(
        "INSERT INTO transactions(date, account_id, amount, type) VALUES (?1, ?2, ?3, ?4)",
        params![date, account_id, amount, kind],
    )
    .unwrap();
}

fn setup() -> Connection {
    let conn = db::open_in_memory().unwrap();
    conn.execute(
        "INSERT INTO accounts(id, name, type, currency) VALUES (1, 'Checking', 'bank', 'USD')",
        [],
    )
    .unwrap();
    conn
}

fn bill_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM credit_card_bills", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn bill_sums_expenses_inside_the_cycle() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-02-20", "999", "expense"); // previous cycle
    spend(&conn, visa, "2024-02-21", "100.50", "expense");
    spend(&conn, visa, "2024-03-10", "49.50", "expense");
    spend(&conn, visa, "2024-03-12", "75", "income"); // refund, not spend
    spend(&conn, visa, "2024-03-20", "10", "expense");
    spend(&conn, visa, "2024-03-21", "999", "expense"); // next cycle
    spend(&conn, 1, "2024-03-01", "999", "expense"); // other account
    let store = SqliteStore::new(&conn);

    let bills = ensure_bills_for_month(&store, 2024, 3).unwrap();
    assert_eq!(bills.len(), 1);
    let b = &bills[0];
    assert_eq!(b.account_id, visa);
    assert_eq!(b.account_name, "Visa");
    assert_eq!(b.linked_account_id, Some(1));
    assert_eq!(b.linked_account_name.as_deref(), Some("Checking"));
    assert_eq!(b.period_start, d(2024, 2, 21));
    assert_eq!(b.period_end, d(2024, 3, 20));
    assert_eq!(b.payment_date, d(2024, 3, 5));
    assert_eq!(b.amount, Decimal::new(160, 0));
    assert!(!b.completed);
    assert_eq!(b.transaction_id, None);
}

#[test]
fn quiet_cycle_creates_no_bill() {
    let conn = setup();
    card(&conn, "Visa", Some(20), Some(5));
    let store = SqliteStore::new(&conn);
    assert!(ensure_bills_for_month(&store, 2024, 3).unwrap().is_empty());
    assert_eq!(bill_rows(&conn), 0);
}

#[test]
fn repeated_calls_reuse_the_same_bill() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-03-01", "40", "expense");
    let store = SqliteStore::new(&conn);

    let first = ensure_bills_for_month(&store, 2024, 3).unwrap();
    let second = ensure_bills_for_month(&store, 2024, 3).unwrap();
    assert_eq!(first, second);
    assert_eq!(bill_rows(&conn), 1);
}

#[test]
fn pending_bill_follows_new_spending() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-03-01", "40", "expense");
    let store = SqliteStore::new(&conn);
    let before = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);

    spend(&conn, visa, "2024-03-02", "2.25", "expense");
    let after = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);
    assert_eq!(after.id, before.id);
    assert_eq!(after.amount, Decimal::new(4225, 2));
    assert_eq!(store.bill(before.id).unwrap().unwrap().amount, Decimal::new(4225, 2));
    assert_eq!(bill_rows(&conn), 1);
}

#[test]
fn pending_bill_is_hidden_once_spending_is_gone() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-03-01", "40", "expense");
    let store = SqliteStore::new(&conn);
    let bill = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);

    conn.execute("DELETE FROM transactions WHERE account_id=?1", params![visa])
        .unwrap();
    assert!(ensure_bills_for_month(&store, 2024, 3).unwrap().is_empty());
    // the row survives so a later charge reuses it
    assert!(store.bill(bill.id).unwrap().is_some());

    spend(&conn, visa, "2024-03-03", "5", "expense");
    let back = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);
    assert_eq!(back.id, bill.id);
    assert_eq!(back.amount, Decimal::new(5, 0));
}

#[test]
fn paid_bill_keeps_its_amount() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-03-01", "40", "expense");
    let store = SqliteStore::new(&conn);
    let bill = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);
    toggle_bill(&store, bill.id, noon(d(2024, 3, 25))).unwrap();

    spend(&conn, visa, "2024-03-02", "60", "expense");
    let after = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);
    assert_eq!(after.id, bill.id);
    assert!(after.completed);
    assert_eq!(after.amount, Decimal::new(40, 0));
    assert!(after.transaction_id.is_some());
}

#[test]
fn bills_are_ordered_by_payment_date_then_card() {
    let conn = setup();
    let late = card(&conn, "Amex", Some(20), Some(25));
    let early_b = card(&conn, "Visa", Some(10), Some(3));
    let early_a = card(&conn, "Discover", Some(15), Some(3));
    for id in [late, early_b, early_a] {
        spend(&conn, id, "2024-03-05", "10", "expense");
    }
    let store = SqliteStore::new(&conn);

    let names: Vec<String> = ensure_bills_for_month(&store, 2024, 3)
        .unwrap()
        .into_iter()
        .map(|b| b.account_name)
        .collect();
    assert_eq!(names, ["Discover", "Visa", "Amex"]);
}

#[test]
fn cards_without_anchor_days_are_skipped() {
    let conn = setup();
    let no_billing = card(&conn, "NoClose", None, Some(5));
    let no_payment = card(&conn, "NoDue", Some(20), None);
    spend(&conn, no_billing, "2024-03-01", "10", "expense");
    spend(&conn, no_payment, "2024-03-01", "10", "expense");
    let store = SqliteStore::new(&conn);

    assert!(ensure_bills_for_month(&store, 2024, 3).unwrap().is_empty());
    assert_eq!(bill_rows(&conn), 0);
}

#[test]
fn month_end_billing_day_in_february() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(31), Some(31));
    spend(&conn, visa, "2024-01-31", "7", "expense");
    spend(&conn, visa, "2024-02-29", "3", "expense");
    let store = SqliteStore::new(&conn);

    let b = ensure_bills_for_month(&store, 2024, 2).unwrap().remove(0);
    assert_eq!(b.period_start, d(2024, 1, 31));
    assert_eq!(b.period_end, d(2024, 2, 29));
    assert_eq!(b.payment_date, d(2024, 2, 29));
    assert_eq!(b.amount, Decimal::new(10, 0));
}

#[test]
fn shared_day_counts_in_both_month_end_cycles() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(31), Some(31));
    spend(&conn, visa, "2024-01-31", "7", "expense");
    let store = SqliteStore::new(&conn);

    let jan = ensure_bills_for_month(&store, 2024, 1).unwrap().remove(0);
    let feb = ensure_bills_for_month(&store, 2024, 2).unwrap().remove(0);
    assert_ne!(jan.id, feb.id);
    assert_eq!(jan.amount, Decimal::new(7, 0));
    assert_eq!(feb.amount, Decimal::new(7, 0));
}

#[test]
fn cycles_in_different_months_are_separate_bills() {
    let conn = setup();
    let visa = card(&conn, "Visa", Some(20), Some(5));
    spend(&conn, visa, "2024-03-01", "10", "expense");
    spend(&conn, visa, "2024-04-01", "20", "expense");
    let store = SqliteStore::new(&conn);

    let march = ensure_bills_for_month(&store, 2024, 3).unwrap().remove(0);
    let april = ensure_bills_for_month(&store, 2024, 4).unwrap().remove(0);
    assert_ne!(march.id, april.id);
    assert_eq!(april.period_start, d(2024, 3, 21));
    assert_eq!(april.amount, Decimal::new(20, 0));
    assert_eq!(bill_rows(&conn), 2);
}

#[test]
fn invalid_month_is_rejected() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    assert!(ensure_bills_for_month(&store, 2024, 13).unwrap_err().is_validation());
    assert!(ensure_bills_for_month(&store, 2024, 0).unwrap_err().is_validation());
}
