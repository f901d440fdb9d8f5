// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use clinicfin::engine::amortization::{PlanTerms, Schedule, compute_schedule};
use clinicfin::engine::ledger::{PaymentLedger, derive_status, payable_amount};
use clinicfin::error::FinanceError;
use clinicfin::models::{
    InstallmentStatus, PaymentFrequency, PaymentInstallment, PaymentMethod, PaymentRecord,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn schedule(total: &str, n: u32, rate: &str) -> Schedule {
    compute_schedule(&PlanTerms {
        total_amount: d(total),
        down_payment: Decimal::ZERO,
        number_of_payments: n,
        annual_interest_rate: d(rate),
        frequency: PaymentFrequency::Monthly,
        first_payment_date: day("2024-01-15"),
    })
    .unwrap()
}

fn pay(ledger: &mut PaymentLedger, n: u32, amount: &str) -> Result<PaymentInstallment, FinanceError> {
    ledger
        .record_payment(n, d(amount), PaymentMethod::Efectivo, None, day("2024-01-10"))
        .cloned()
}

#[test]
fn paying_rounded_remaining_settles_installment() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("10000", 6, "5"));
    let inst = pay(&mut ledger, 1, "1691.06").unwrap();
    assert_eq!(inst.paid_amount, d("1691.06"));
    assert_eq!(
        ledger.status_of(1, day("2024-01-10")).unwrap(),
        InstallmentStatus::Paid
    );
    assert_eq!(ledger.rows(day("2024-01-10"))[0].remaining_amount, Decimal::ZERO);
    assert_eq!(payable_amount(ledger.installment(1).unwrap()), Decimal::ZERO);
}

#[test]
fn rounded_down_installment_settles_at_the_cent() {
    // 444.2439... is shown and collected as 444.24
    let mut ledger = PaymentLedger::from_schedule(&schedule("5000", 12, "12"));
    pay(&mut ledger, 1, "444.24").unwrap();
    assert_eq!(
        ledger.status_of(1, day("2024-03-01")).unwrap(),
        InstallmentStatus::Paid
    );
    assert!(matches!(
        pay(&mut ledger, 1, "0.01"),
        Err(FinanceError::OverpaymentRejected { .. })
    ));
}

#[test]
fn sub_cent_amounts_settle_at_the_cent() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("3000", 3, "0"));
    let today = day("2024-01-10");

    // 999.994 is still short at the cent
    pay(&mut ledger, 1, "999.994").unwrap();
    assert_eq!(ledger.status_of(1, today).unwrap(), InstallmentStatus::Partial);
    assert_eq!(payable_amount(ledger.installment(1).unwrap()), d("0.01"));
    assert!(matches!(
        pay(&mut ledger, 1, "0.011"),
        Err(FinanceError::OverpaymentRejected { .. })
    ));
    // the rounded remaining amount is accepted even though it is 0.004 over
    let inst = pay(&mut ledger, 1, "0.01").unwrap();
    assert_eq!(inst.paid_amount, d("1000.004"));
    assert_eq!(ledger.status_of(1, today).unwrap(), InstallmentStatus::Paid);

    // 999.995 rounds up to the scheduled amount
    pay(&mut ledger, 2, "999.995").unwrap();
    assert_eq!(ledger.status_of(2, today).unwrap(), InstallmentStatus::Paid);
    assert_eq!(payable_amount(ledger.installment(2).unwrap()), Decimal::ZERO);

    // with no sub-cent remainder nothing above the schedule is accepted
    assert!(matches!(
        pay(&mut ledger, 3, "1000.005"),
        Err(FinanceError::OverpaymentRejected { .. })
    ));
}

#[test]
fn partial_payments_accumulate() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("10000", 6, "5"));
    pay(&mut ledger, 2, "500").unwrap();
    assert_eq!(
        ledger.status_of(2, day("2024-01-10")).unwrap(),
        InstallmentStatus::Partial
    );
    // partial stays partial after the due date
    assert_eq!(
        ledger.status_of(2, day("2024-06-01")).unwrap(),
        InstallmentStatus::Partial
    );
    let inst = pay(&mut ledger, 2, "1191.06").unwrap();
    assert_eq!(inst.paid_amount, d("1691.06"));
    assert_eq!(
        ledger.status_of(2, day("2024-06-01")).unwrap(),
        InstallmentStatus::Paid
    );
    assert_eq!(ledger.payments().len(), 2);
}

#[test]
fn overpayment_is_rejected_and_ledger_unchanged() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("10000", 6, "5"));
    let before = ledger.clone();
    match pay(&mut ledger, 1, "1691.07") {
        Err(FinanceError::OverpaymentRejected { requested, remaining }) => {
            assert_eq!(requested, d("1691.07"));
            assert_eq!(remaining, d("1691.06"));
        }
        other => panic!("expected overpayment rejection, got {:?}", other),
    }
    assert_eq!(ledger, before);

    pay(&mut ledger, 1, "1691.06").unwrap();
    let settled = ledger.clone();
    assert!(pay(&mut ledger, 1, "1").is_err());
    assert_eq!(ledger, settled);
}

#[test]
fn non_positive_amounts_and_unknown_installments_fail() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("1200", 3, "0"));
    assert!(matches!(
        pay(&mut ledger, 1, "0"),
        Err(FinanceError::InvalidPaymentAmount(_))
    ));
    assert!(matches!(
        pay(&mut ledger, 1, "-10"),
        Err(FinanceError::InvalidPaymentAmount(_))
    ));
    assert!(matches!(
        pay(&mut ledger, 4, "10"),
        Err(FinanceError::InstallmentNotFound(4))
    ));
    assert!(ledger.payments().is_empty());
}

#[test]
fn status_derivation_order() {
    let due = day("2024-01-15");
    let sched = d("400");
    assert_eq!(derive_status(due, d("0"), sched, day("2024-01-15")), InstallmentStatus::Pending);
    assert_eq!(derive_status(due, d("0"), sched, day("2024-01-16")), InstallmentStatus::Overdue);
    assert_eq!(derive_status(due, d("10"), sched, day("2024-01-16")), InstallmentStatus::Partial);
    assert_eq!(derive_status(due, d("400"), sched, day("2024-01-16")), InstallmentStatus::Paid);
}

#[test]
fn stats_are_recomputed_from_installments() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("10000", 6, "5"));
    pay(&mut ledger, 1, "1691.06").unwrap();
    let stats = ledger.stats(day("2024-03-20"));
    assert_eq!(stats.total_installments, 6);
    assert_eq!(stats.paid_installments, 1);
    assert_eq!(stats.total_paid, d("1691.06"));
    // 1/6 rounds to 17%
    assert_eq!(stats.progress, 17);
    // #2 (Feb 15) and #3 (Mar 15) are past due
    assert_eq!(stats.overdue_payments, 2);
    assert_eq!(stats.next_due, Some(day("2024-02-15")));
    let expected_remaining: Decimal = ledger.installments()[1..]
        .iter()
        .map(|i| i.scheduled_amount)
        .sum();
    assert_eq!(stats.remaining_amount, expected_remaining);
}

#[test]
fn fully_paid_plan_reports_complete() {
    let mut ledger = PaymentLedger::from_schedule(&schedule("900", 3, "0"));
    for n in 1..=3 {
        pay(&mut ledger, n, "300").unwrap();
    }
    let stats = ledger.stats(day("2030-01-01"));
    assert_eq!(stats.progress, 100);
    assert_eq!(stats.remaining_amount, Decimal::ZERO);
    assert_eq!(stats.overdue_payments, 0);
    assert_eq!(stats.next_due, None);
}

#[test]
fn replay_rebuilds_the_same_ledger() {
    let s = schedule("3000", 3, "0");
    let mut live = PaymentLedger::from_schedule(&s);
    pay(&mut live, 1, "1000").unwrap();
    pay(&mut live, 2, "250").unwrap();

    let events: Vec<PaymentRecord> = live.payments().to_vec();
    let replayed = PaymentLedger::replay(&s, events).unwrap();
    assert_eq!(replayed, live);

    let bad = vec![PaymentRecord {
        payment_number: 3,
        date: day("2024-01-10"),
        amount: d("1000.01"),
        method: PaymentMethod::Tarjeta,
        reference: Some("ref-1".into()),
    }];
    assert!(PaymentLedger::replay(&s, bad).is_err());
}
