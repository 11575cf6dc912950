// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, NaiveDate};
use ledgerloop::calendar::{
    billing_period, check_anchor, days_in_month, occurrences_in_month, occurrences_in_range,
    payment_date, same_slot,
};
use ledgerloop::models::{EntryType, Frequency, RecurringRule};
use rust_decimal::Decimal;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn rule(
    frequency: Frequency,
    day_of_week: Option<u32>,
    day_of_month: Option<u32>,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> RecurringRule {
    let stamp = d(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();
    RecurringRule {
        id: 1,
        name: "Test".into(),
        account_id: None,
        category_id: None,
        amount: Decimal::new(100, 0),
        r#type: EntryType::Expense,
        frequency,
        day_of_week,
        day_of_month,
        start_date: start,
        end_date: end,
        active: true,
        created_at: stamp,
        updated_at: stamp,
    }
}

#[test]
fn monthly_day_31_clamps_in_short_months() {
    let r = rule(Frequency::Monthly, None, Some(31), d(2023, 1, 1), None);
    assert_eq!(occurrences_in_month(&r, 2024, 2).unwrap(), vec![d(2024, 2, 29)]);
    assert_eq!(occurrences_in_month(&r, 2023, 2).unwrap(), vec![d(2023, 2, 28)]);
    assert_eq!(occurrences_in_month(&r, 2024, 4).unwrap(), vec![d(2024, 4, 30)]);
    assert_eq!(occurrences_in_month(&r, 2024, 1).unwrap(), vec![d(2024, 1, 31)]);
}

#[test]
fn monthly_yields_exactly_one_clamped_date_every_month() {
    for dom in 1..=31 {
        let r = rule(Frequency::Monthly, None, Some(dom), d(2023, 1, 1), None);
        for year in 2023..=2025 {
            for month in 1..=12 {
                let dates = occurrences_in_month(&r, year, month).unwrap();
                let last = days_in_month(year, month).unwrap();
                assert_eq!(dates.len(), 1, "dom {} in {}-{}", dom, year, month);
                assert_eq!(dates[0].day(), dom.min(last));
                assert_eq!(dates[0].month(), month);
            }
        }
    }
}

#[test]
fn weekly_matches_weekday_with_sunday_zero() {
    let mondays = rule(Frequency::Weekly, Some(1), None, d(2024, 1, 1), None);
    assert_eq!(
        occurrences_in_month(&mondays, 2024, 3).unwrap(),
        vec![d(2024, 3, 4), d(2024, 3, 11), d(2024, 3, 18), d(2024, 3, 25)]
    );
    let sundays = rule(Frequency::Weekly, Some(0), None, d(2024, 1, 1), None);
    let dates = occurrences_in_month(&sundays, 2024, 3).unwrap();
    assert_eq!(dates.first(), Some(&d(2024, 3, 3)));
    assert_eq!(dates.len(), 5);
}

#[test]
fn daily_respects_active_window() {
    let r = rule(
        Frequency::Daily,
        None,
        None,
        d(2024, 3, 10),
        Some(d(2024, 3, 12)),
    );
    assert_eq!(
        occurrences_in_month(&r, 2024, 3).unwrap(),
        vec![d(2024, 3, 10), d(2024, 3, 11), d(2024, 3, 12)]
    );
    assert!(occurrences_in_month(&r, 2024, 4).unwrap().is_empty());
    assert!(occurrences_in_month(&r, 2024, 2).unwrap().is_empty());
}

#[test]
fn quarterly_steps_from_start_month() {
    let r = rule(Frequency::Quarterly, None, Some(15), d(2024, 1, 15), None);
    assert_eq!(
        occurrences_in_range(&r, d(2024, 1, 1), d(2024, 12, 31)).unwrap(),
        vec![d(2024, 1, 15), d(2024, 4, 15), d(2024, 7, 15), d(2024, 10, 15)]
    );
    assert!(occurrences_in_month(&r, 2024, 2).unwrap().is_empty());
}

#[test]
fn bimonthly_drops_anchor_before_start_date() {
    let r = rule(Frequency::Bimonthly, None, Some(10), d(2024, 1, 20), None);
    assert_eq!(
        occurrences_in_range(&r, d(2024, 1, 1), d(2024, 6, 30)).unwrap(),
        vec![d(2024, 3, 10), d(2024, 5, 10)]
    );
}

#[test]
fn semiannual_clamps_each_target_month() {
    let r = rule(Frequency::Semiannually, None, Some(31), d(2023, 11, 30), None);
    assert_eq!(
        occurrences_in_range(&r, d(2023, 11, 1), d(2024, 6, 30)).unwrap(),
        vec![d(2023, 11, 30), d(2024, 5, 31)]
    );
}

#[test]
fn yearly_on_leap_day_falls_back_to_feb_28() {
    let r = rule(Frequency::Yearly, None, Some(29), d(2020, 2, 29), None);
    assert_eq!(
        occurrences_in_range(&r, d(2020, 1, 1), d(2024, 12, 31)).unwrap(),
        vec![
            d(2020, 2, 29),
            d(2021, 2, 28),
            d(2022, 2, 28),
            d(2023, 2, 28),
            d(2024, 2, 29)
        ]
    );
}

#[test]
fn inactive_rule_has_no_occurrences() {
    let mut r = rule(Frequency::Daily, None, None, d(2024, 1, 1), None);
    r.active = false;
    assert!(occurrences_in_month(&r, 2024, 3).unwrap().is_empty());
}

#[test]
fn calls_are_repeatable() {
    let r = rule(Frequency::Weekly, Some(5), None, d(2024, 1, 1), None);
    let a = occurrences_in_month(&r, 2024, 8).unwrap();
    let b = occurrences_in_month(&r, 2024, 8).unwrap();
    assert_eq!(a, b);
}

#[test]
fn reversed_range_is_rejected() {
    let r = rule(Frequency::Daily, None, None, d(2024, 1, 1), None);
    let err = occurrences_in_range(&r, d(2024, 3, 2), d(2024, 3, 1)).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn anchor_must_match_frequency() {
    assert!(check_anchor(Frequency::Daily, None, None).is_ok());
    assert!(check_anchor(Frequency::Weekly, Some(6), None).is_ok());
    assert!(check_anchor(Frequency::Yearly, None, Some(31)).is_ok());

    assert!(check_anchor(Frequency::Weekly, None, Some(3)).unwrap_err().is_validation());
    assert!(check_anchor(Frequency::Weekly, Some(7), None).is_err());
    assert!(check_anchor(Frequency::Monthly, Some(1), None).is_err());
    assert!(check_anchor(Frequency::Monthly, None, Some(32)).is_err());
    assert!(check_anchor(Frequency::Monthly, None, Some(0)).is_err());
    assert!(check_anchor(Frequency::Quarterly, Some(1), Some(1)).is_err());
    assert!(check_anchor(Frequency::Daily, Some(1), None).is_err());
}

#[test]
fn rule_missing_its_anchor_is_rejected() {
    let r = rule(Frequency::Monthly, None, None, d(2024, 1, 1), None);
    assert!(occurrences_in_month(&r, 2024, 3).unwrap_err().is_validation());
}

#[test]
fn billing_period_runs_day_after_previous_billing_day() {
    let p = billing_period(20, 2024, 3).unwrap();
    assert_eq!(p.start, d(2024, 2, 21));
    assert_eq!(p.end, d(2024, 3, 20));
}

#[test]
fn billing_period_clamps_both_ends() {
    let p = billing_period(31, 2024, 2).unwrap();
    assert_eq!(p.start, d(2024, 1, 31));
    assert_eq!(p.end, d(2024, 2, 29));

    let p = billing_period(30, 2024, 3).unwrap();
    assert_eq!(p.start, d(2024, 2, 29));
    assert_eq!(p.end, d(2024, 3, 30));
}

#[test]
fn billing_period_crosses_year_boundary() {
    let p = billing_period(15, 2024, 1).unwrap();
    assert_eq!(p.start, d(2023, 12, 16));
    assert_eq!(p.end, d(2024, 1, 15));
}

#[test]
fn late_billing_days_share_a_day_between_cycles() {
    let jan = billing_period(31, 2024, 1).unwrap();
    let feb = billing_period(31, 2024, 2).unwrap();
    assert_eq!(jan.end, d(2024, 1, 31));
    assert_eq!(feb.start, d(2024, 1, 31));

    let feb = billing_period(28, 2023, 2).unwrap();
    let mar = billing_period(28, 2023, 3).unwrap();
    assert_eq!(feb.end, d(2023, 2, 28));
    assert_eq!(mar.start, d(2023, 2, 28));

    // earlier billing days tile without overlap
    let feb = billing_period(20, 2024, 2).unwrap();
    let mar = billing_period(20, 2024, 3).unwrap();
    assert_eq!(feb.end.succ_opt().unwrap(), mar.start);
}

#[test]
fn slots_follow_the_frequency() {
    assert!(same_slot(Frequency::Daily, d(2024, 3, 5), d(2024, 3, 5)));
    assert!(!same_slot(Frequency::Daily, d(2024, 3, 5), d(2024, 3, 6)));
    // Sunday starts the week
    assert!(same_slot(Frequency::Weekly, d(2024, 3, 10), d(2024, 3, 16)));
    assert!(!same_slot(Frequency::Weekly, d(2024, 3, 9), d(2024, 3, 10)));
    assert!(same_slot(Frequency::Monthly, d(2024, 3, 1), d(2024, 3, 31)));
    assert!(!same_slot(Frequency::Quarterly, d(2024, 3, 31), d(2024, 4, 1)));
    assert!(!same_slot(Frequency::Yearly, d(2023, 3, 1), d(2024, 3, 1)));
}

#[test]
fn payment_date_clamps_to_month_end() {
    assert_eq!(payment_date(31, 2023, 2).unwrap(), d(2023, 2, 28));
    assert_eq!(payment_date(5, 2024, 4).unwrap(), d(2024, 4, 5));
}

#[test]
fn bad_month_and_day_are_validation_errors() {
    assert!(billing_period(20, 2024, 13).unwrap_err().is_validation());
    assert!(billing_period(0, 2024, 3).unwrap_err().is_validation());
    assert!(payment_date(32, 2024, 3).unwrap_err().is_validation());
    assert!(days_in_month(2024, 0).unwrap_err().is_validation());
}
