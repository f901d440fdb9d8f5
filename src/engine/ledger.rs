// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Scheduled vs. paid tracking for the installments of one plan.

use crate::engine::amortization::Schedule;
use crate::engine::money::round_money;
use crate::error::{FinanceError, Result};
use crate::models::{InstallmentStatus, PaymentInstallment, PaymentMethod, PaymentRecord};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// An installment counts as paid once the paid amount reaches the scheduled
/// amount, either exactly or to the cent.
pub fn settles(paid: Decimal, scheduled: Decimal) -> bool {
    paid >= scheduled || round_money(paid) >= round_money(scheduled)
}

/// Status of an installment as seen on `today`. Overdue only applies to
/// installments with nothing paid yet.
pub fn derive_status(
    due_date: NaiveDate,
    paid: Decimal,
    scheduled: Decimal,
    today: NaiveDate,
) -> InstallmentStatus {
    if settles(paid, scheduled) {
        InstallmentStatus::Paid
    } else if paid > Decimal::ZERO {
        InstallmentStatus::Partial
    } else if due_date < today {
        InstallmentStatus::Overdue
    } else {
        InstallmentStatus::Pending
    }
}

/// Largest amount that may still be applied to `inst`.
pub fn payable_amount(inst: &PaymentInstallment) -> Decimal {
    if settles(inst.paid_amount, inst.scheduled_amount) {
        return Decimal::ZERO;
    }
    let remaining = inst.remaining_amount();
    remaining.max(round_money(remaining))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentView {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub scheduled_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStats {
    pub total_installments: usize,
    pub paid_installments: usize,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub progress: u32,
    pub overdue_payments: usize,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentLedger {
    installments: Vec<PaymentInstallment>,
    payments: Vec<PaymentRecord>,
}

impl PaymentLedger {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self::from_parts(schedule.installments.clone(), Vec::new())
    }

    /// Rebuild a ledger from stored state. Installments are ordered by
    /// payment number.
    pub fn from_parts(
        mut installments: Vec<PaymentInstallment>,
        payments: Vec<PaymentRecord>,
    ) -> Self {
        installments.sort_by_key(|i| i.payment_number);
        Self {
            installments,
            payments,
        }
    }

    /// Apply a stream of recorded payments to a fresh schedule.
    pub fn replay<I>(schedule: &Schedule, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = PaymentRecord>,
    {
        let mut ledger = Self::from_schedule(schedule);
        for ev in events {
            ledger.record_payment(ev.payment_number, ev.amount, ev.method, ev.reference, ev.date)?;
        }
        Ok(ledger)
    }

    pub fn installments(&self) -> &[PaymentInstallment] {
        &self.installments
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    fn position(&self, number: u32) -> Result<usize> {
        self.installments
            .iter()
            .position(|i| i.payment_number == number)
            .ok_or(FinanceError::InstallmentNotFound(number))
    }

    pub fn installment(&self, number: u32) -> Result<&PaymentInstallment> {
        Ok(&self.installments[self.position(number)?])
    }

    /// Apply `amount` to installment `number`. On error the ledger is left
    /// untouched.
    ///
    /// Amounts are settled at the cent: 999.995 against 1000 pays the
    /// installment, and up to `round_money(remaining)` is accepted, which can
    /// exceed the unrounded remaining amount by at most half a cent.
    pub fn record_payment(
        &mut self,
        number: u32,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
        date: NaiveDate,
    ) -> Result<&PaymentInstallment> {
        if amount <= Decimal::ZERO {
            return Err(FinanceError::InvalidPaymentAmount(amount));
        }
        let idx = self.position(number)?;
        let payable = payable_amount(&self.installments[idx]);
        if amount > payable {
            return Err(FinanceError::OverpaymentRejected {
                requested: amount,
                remaining: round_money(payable),
            });
        }

        let inst = &mut self.installments[idx];
        inst.paid_amount += amount;
        self.payments.push(PaymentRecord {
            payment_number: number,
            date,
            amount,
            method,
            reference,
        });
        Ok(&self.installments[idx])
    }

    pub fn status_of(&self, number: u32, today: NaiveDate) -> Result<InstallmentStatus> {
        let inst = self.installment(number)?;
        Ok(derive_status(
            inst.due_date,
            inst.paid_amount,
            inst.scheduled_amount,
            today,
        ))
    }

    pub fn rows(&self, today: NaiveDate) -> Vec<InstallmentView> {
        self.installments
            .iter()
            .map(|i| {
                let status = derive_status(i.due_date, i.paid_amount, i.scheduled_amount, today);
                // a settled installment owes nothing, even a sub-cent fraction
                let remaining_amount = if status == InstallmentStatus::Paid {
                    Decimal::ZERO
                } else {
                    i.remaining_amount().max(Decimal::ZERO)
                };
                InstallmentView {
                    payment_number: i.payment_number,
                    due_date: i.due_date,
                    scheduled_amount: i.scheduled_amount,
                    paid_amount: i.paid_amount,
                    remaining_amount,
                    status,
                }
            })
            .collect()
    }

    /// Aggregates recomputed from the installments on every call.
    pub fn stats(&self, today: NaiveDate) -> PlanStats {
        let rows = self.rows(today);
        let total_installments = rows.len();
        let paid_installments = rows
            .iter()
            .filter(|r| r.status == InstallmentStatus::Paid)
            .count();
        let total_paid = rows.iter().map(|r| r.paid_amount).sum();
        let remaining_amount = rows.iter().map(|r| r.remaining_amount).sum();
        let overdue_payments = rows
            .iter()
            .filter(|r| r.status == InstallmentStatus::Overdue)
            .count();
        let next_due = rows
            .iter()
            .find(|r| r.status != InstallmentStatus::Paid)
            .map(|r| r.due_date);
        let progress = if total_installments == 0 {
            0
        } else {
            let pct = Decimal::from(100 * paid_installments) / Decimal::from(total_installments);
            pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u32()
                .unwrap_or(0)
        };

        PlanStats {
            total_installments,
            paid_installments,
            total_paid,
            remaining_amount,
            progress,
            overdue_payments,
            next_due,
        }
    }
}
