// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use clinicfin::engine::amortization::{
    MAX_PAYMENTS, PlanDraft, PlanTerms, compute_schedule, due_date, payment_amount,
};
use clinicfin::engine::money::{approx_eq, round_money};
use clinicfin::error::FinanceError;
use clinicfin::models::PaymentFrequency;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn terms(total: &str, down: &str, n: u32, rate: &str, freq: PaymentFrequency, first: &str) -> PlanTerms {
    PlanTerms {
        total_amount: d(total),
        down_payment: d(down),
        number_of_payments: n,
        annual_interest_rate: d(rate),
        frequency: freq,
        first_payment_date: day(first),
    }
}

#[test]
fn zero_rate_splits_financed_amount_evenly() {
    let s = compute_schedule(&terms("12000", "2000", 10, "0", PaymentFrequency::Monthly, "2025-03-01"))
        .unwrap();
    assert_eq!(s.financed_amount, d("10000"));
    assert_eq!(s.payment_amount, d("1000"));
    assert_eq!(s.total_interest, Decimal::ZERO);
    assert_eq!(s.installments.len(), 10);
    assert!(s.installments.iter().all(|i| i.scheduled_amount == d("1000")));
    assert!(s.installments.iter().all(|i| i.paid_amount.is_zero()));
    assert_eq!(s.final_date, day("2025-12-01"));
}

#[test]
fn annuity_payment_at_five_percent() {
    let s = compute_schedule(&terms("10000", "0", 6, "5", PaymentFrequency::Monthly, "2025-01-10"))
        .unwrap();
    assert_eq!(round_money(s.payment_amount), d("1691.06"));
    assert_eq!(round_money(s.total_interest), d("146.34"));
    // installments keep full precision
    assert!(s.payment_amount > d("1691.05") && s.payment_amount < d("1691.06"));
}

#[test]
fn annuity_payment_at_twelve_percent() {
    let s = compute_schedule(&terms("5000", "0", 12, "12", PaymentFrequency::Monthly, "2025-01-10"))
        .unwrap();
    assert_eq!(round_money(s.payment_amount), d("444.24"));
    assert_eq!(round_money(s.total_interest), d("330.93"));
}

#[test]
fn interest_is_payment_times_count_minus_financed() {
    let s = compute_schedule(&terms("8000", "500", 18, "9.5", PaymentFrequency::Biweekly, "2025-02-01"))
        .unwrap();
    let expected = s.payment_amount * Decimal::from(18) - s.financed_amount;
    assert_eq!(s.total_interest, expected);
    assert!(s.total_interest > Decimal::ZERO);
    let sum: Decimal = s.installments.iter().map(|i| i.scheduled_amount).sum();
    assert!(approx_eq(sum, s.financed_amount + s.total_interest, d("0.000001")));
}

#[test]
fn monthly_schedule_dates_and_numbering() {
    let s = compute_schedule(&terms("6000", "0", 12, "0", PaymentFrequency::Monthly, "2024-01-15"))
        .unwrap();
    let numbers: Vec<u32> = s.installments.iter().map(|i| i.payment_number).collect();
    assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
    assert_eq!(s.installments[0].due_date, day("2024-01-15"));
    assert_eq!(s.installments[1].due_date, day("2024-02-15"));
    assert_eq!(s.final_date, day("2024-12-15"));
    assert_eq!(s.installments.last().unwrap().due_date, s.final_date);
    assert!(s.installments.windows(2).all(|w| w[0].due_date < w[1].due_date));
}

#[test]
fn month_end_first_date_is_clamped() {
    let first = day("2024-01-31");
    assert_eq!(due_date(first, PaymentFrequency::Monthly, 1).unwrap(), day("2024-02-29"));
    assert_eq!(due_date(first, PaymentFrequency::Monthly, 2).unwrap(), day("2024-03-31"));
}

#[test]
fn weekly_and_biweekly_steps() {
    let first = day("2024-01-01");
    assert_eq!(due_date(first, PaymentFrequency::Weekly, 0).unwrap(), first);
    assert_eq!(due_date(first, PaymentFrequency::Weekly, 1).unwrap(), day("2024-01-08"));
    assert_eq!(due_date(first, PaymentFrequency::Biweekly, 1).unwrap(), day("2024-01-16"));
    assert_eq!(due_date(first, PaymentFrequency::Biweekly, 2).unwrap(), day("2024-01-31"));
}

#[test]
fn frequency_does_not_change_the_payment_amount() {
    let monthly =
        compute_schedule(&terms("9000", "0", 12, "10", PaymentFrequency::Monthly, "2025-01-01")).unwrap();
    let weekly =
        compute_schedule(&terms("9000", "0", 12, "10", PaymentFrequency::Weekly, "2025-01-01")).unwrap();
    assert_eq!(monthly.payment_amount, weekly.payment_amount);
    assert_eq!(weekly.final_date, day("2025-03-19"));
}

#[test]
fn single_payment_plan() {
    let s = compute_schedule(&terms("1500", "500", 1, "0", PaymentFrequency::Monthly, "2025-06-30"))
        .unwrap();
    assert_eq!(s.installments.len(), 1);
    assert_eq!(s.payment_amount, d("1000"));
    assert_eq!(s.final_date, day("2025-06-30"));
}

#[test]
fn schedule_is_deterministic() {
    let t = terms("10000", "1000", 24, "18", PaymentFrequency::Monthly, "2025-05-05");
    assert_eq!(compute_schedule(&t).unwrap(), compute_schedule(&t).unwrap());
}

#[test]
fn invalid_terms_are_rejected() {
    let bad = [
        terms("0", "0", 6, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("-5", "0", 6, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "0", 0, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "1000", 6, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "1500", 6, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "-1", 6, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "0", 6, "-2", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "0", MAX_PAYMENTS + 1, "0", PaymentFrequency::Monthly, "2025-01-01"),
        terms("1000", "0", u32::MAX, "12", PaymentFrequency::Weekly, "2025-01-01"),
    ];
    for t in &bad {
        match compute_schedule(t) {
            Err(FinanceError::InvalidPlanParameters(_)) => {}
            other => panic!("expected InvalidPlanParameters for {:?}, got {:?}", t, other),
        }
    }
}

#[test]
fn high_rate_over_long_term_is_computed() {
    // (1 + 200%/12)^360 is about 1.25e24; payment * growth alone would overflow
    let s = compute_schedule(&terms("1000000", "0", 360, "200", PaymentFrequency::Monthly, "2025-01-01"))
        .unwrap();
    assert_eq!(round_money(s.payment_amount), d("166666.67"));
    assert_eq!(s.installments.len(), 360);
    assert!(s.total_interest > d("58000000"));
}

#[test]
fn growth_past_decimal_range_is_an_error() {
    let t = terms("1000", "0", MAX_PAYMENTS, "1000", PaymentFrequency::Monthly, "2025-01-01");
    assert!(matches!(
        compute_schedule(&t),
        Err(FinanceError::InvalidPlanParameters(_))
    ));
    assert!(matches!(
        payment_amount(d("1000"), MAX_PAYMENTS, d("1000")),
        Err(FinanceError::InvalidPlanParameters(_))
    ));
}

#[test]
fn rate_below_monthly_precision_is_interest_free() {
    let s = compute_schedule(&terms(
        "1200",
        "0",
        12,
        "0.0000000000000000000000000001",
        PaymentFrequency::Monthly,
        "2025-01-01",
    ))
    .unwrap();
    assert_eq!(s.payment_amount, d("100"));
    assert_eq!(s.total_interest, Decimal::ZERO);
}

#[test]
fn longest_allowed_plan() {
    let s = compute_schedule(&terms("120000", "0", MAX_PAYMENTS, "0", PaymentFrequency::Monthly, "2025-01-01"))
        .unwrap();
    assert_eq!(s.installments.len(), MAX_PAYMENTS as usize);
    assert_eq!(s.payment_amount, d("100"));
    assert_eq!(s.final_date, day("2124-12-01"));
}

#[test]
fn draft_rejects_past_first_date_and_blank_patient() {
    let t = terms("3000", "0", 3, "0", PaymentFrequency::Monthly, "2025-01-10");
    let today = day("2025-01-11");
    assert!(matches!(
        PlanDraft::new("Ana Torres", t.clone()).schedule(today),
        Err(FinanceError::InvalidPlanParameters(_))
    ));
    assert!(matches!(
        PlanDraft::new("  ", t.clone()).validate(day("2025-01-01")),
        Err(FinanceError::InvalidPlanParameters(_))
    ));
    // first payment today is allowed
    let s = PlanDraft::new("Ana Torres", t).schedule(day("2025-01-10")).unwrap();
    assert_eq!(s.installments.len(), 3);
}

#[test]
fn frequency_parses_english_and_spanish() {
    assert_eq!("mensual".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::Monthly);
    assert_eq!(" Biweekly ".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::Biweekly);
    assert_eq!("semanal".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::Weekly);
    assert!("yearly".parse::<PaymentFrequency>().is_err());
}
