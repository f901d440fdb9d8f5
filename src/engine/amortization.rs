// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Level-payment amortization of a financing plan.
//!
//! The periodic rate is always `annual / 100 / 12`, also for weekly and
//! biweekly plans. Every installment carries the same unrounded payment; no
//! final-period adjustment is made.

use crate::engine::money::{monthly_rate, pow_n};
use crate::error::{FinanceError, Result};
use crate::models::{PaymentFrequency, PaymentInstallment};
use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub total_amount: Decimal,
    pub down_payment: Decimal,
    pub number_of_payments: u32,
    pub annual_interest_rate: Decimal,
    pub frequency: PaymentFrequency,
    pub first_payment_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub financed_amount: Decimal,
    pub payment_amount: Decimal,
    pub total_interest: Decimal,
    pub final_date: NaiveDate,
    pub installments: Vec<PaymentInstallment>,
}

/// Longest plan accepted: 100 years of monthly payments.
pub const MAX_PAYMENTS: u32 = 1200;

fn invalid(msg: impl Into<String>) -> FinanceError {
    FinanceError::InvalidPlanParameters(msg.into())
}

impl PlanTerms {
    /// Checks the amount, term and rate preconditions. Dates are not checked
    /// here; see [`PlanDraft::validate`].
    pub fn check(&self) -> Result<()> {
        if self.total_amount <= Decimal::ZERO {
            return Err(invalid(format!(
                "total amount must be positive, got {}",
                self.total_amount
            )));
        }
        if self.number_of_payments == 0 {
            return Err(invalid("number of payments must be at least 1"));
        }
        if self.number_of_payments > MAX_PAYMENTS {
            return Err(invalid(format!(
                "number of payments cannot exceed {}, got {}",
                MAX_PAYMENTS, self.number_of_payments
            )));
        }
        if self.down_payment < Decimal::ZERO {
            return Err(invalid(format!(
                "down payment cannot be negative, got {}",
                self.down_payment
            )));
        }
        if self.down_payment >= self.total_amount {
            return Err(invalid(format!(
                "down payment {} must be less than total amount {}",
                self.down_payment, self.total_amount
            )));
        }
        if self.annual_interest_rate < Decimal::ZERO {
            return Err(invalid(format!(
                "interest rate cannot be negative, got {}",
                self.annual_interest_rate
            )));
        }
        Ok(())
    }

    pub fn financed_amount(&self) -> Decimal {
        self.total_amount - self.down_payment
    }
}

/// Due date of the installment at zero-based `index`.
///
/// Monthly offsets are calendar months counted from the first date, so a plan
/// starting on the 31st falls on the last day of shorter months and returns
/// to the 31st afterwards.
pub fn due_date(first: NaiveDate, frequency: PaymentFrequency, index: u32) -> Result<NaiveDate> {
    let next = match frequency {
        PaymentFrequency::Monthly => first.checked_add_months(Months::new(index)),
        PaymentFrequency::Biweekly => first.checked_add_days(Days::new(15 * u64::from(index))),
        PaymentFrequency::Weekly => first.checked_add_days(Days::new(7 * u64::from(index))),
    };
    next.ok_or_else(|| invalid(format!("due date #{} is out of range", index + 1)))
}

fn too_large() -> FinanceError {
    invalid("rate and term are too large to amortize")
}

/// Periodic payment for the financed amount. A rate that rounds to zero at
/// monthly precision is treated as interest-free.
pub fn payment_amount(financed: Decimal, number_of_payments: u32, annual_rate: Decimal) -> Result<Decimal> {
    let n = Decimal::from(number_of_payments);
    let rate = monthly_rate(annual_rate);
    if rate.is_zero() {
        return Ok(financed / n);
    }
    let growth = pow_n(Decimal::ONE + rate, number_of_payments).ok_or_else(too_large)?;
    // growth / (growth - 1) stays near 1, so the product below cannot blow up
    // on long terms the way financed * rate * growth would
    let factor = growth
        .checked_div(growth - Decimal::ONE)
        .ok_or_else(|| invalid(format!("interest rate {} is too small", annual_rate)))?;
    financed
        .checked_mul(rate)
        .and_then(|p| p.checked_mul(factor))
        .ok_or_else(too_large)
}

/// Computes the full payment schedule. Pure: identical terms always give an
/// identical schedule.
pub fn compute_schedule(terms: &PlanTerms) -> Result<Schedule> {
    terms.check()?;

    let financed_amount = terms.financed_amount();
    let payment_amount = payment_amount(
        financed_amount,
        terms.number_of_payments,
        terms.annual_interest_rate,
    )?;
    let total_interest = if monthly_rate(terms.annual_interest_rate).is_zero() {
        Decimal::ZERO
    } else {
        payment_amount
            .checked_mul(Decimal::from(terms.number_of_payments))
            .and_then(|total| total.checked_sub(financed_amount))
            .ok_or_else(too_large)?
    };

    let mut installments = Vec::with_capacity(terms.number_of_payments as usize);
    for i in 0..terms.number_of_payments {
        installments.push(PaymentInstallment {
            payment_number: i + 1,
            due_date: due_date(terms.first_payment_date, terms.frequency, i)?,
            scheduled_amount: payment_amount,
            paid_amount: Decimal::ZERO,
        });
    }
    let final_date = due_date(
        terms.first_payment_date,
        terms.frequency,
        terms.number_of_payments - 1,
    )?;

    log::debug!(
        "schedule: financed={} n={} rate={} payment={} interest={}",
        financed_amount,
        terms.number_of_payments,
        terms.annual_interest_rate,
        payment_amount,
        total_interest
    );

    Ok(Schedule {
        financed_amount,
        payment_amount,
        total_interest,
        final_date,
        installments,
    })
}

/// A plan being edited before it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub patient: String,
    pub budget_id: Option<i64>,
    pub terms: PlanTerms,
}

impl PlanDraft {
    pub fn new(patient: impl Into<String>, terms: PlanTerms) -> Self {
        Self {
            patient: patient.into(),
            budget_id: None,
            terms,
        }
    }

    pub fn with_budget(self, budget_id: i64) -> Self {
        Self {
            budget_id: Some(budget_id),
            ..self
        }
    }

    /// Creation-time checks: the term preconditions plus a first payment date
    /// that is not in the past.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.patient.trim().is_empty() {
            return Err(invalid("patient name is required"));
        }
        self.terms.check()?;
        if self.terms.first_payment_date < today {
            return Err(invalid(format!(
                "first payment date {} is in the past",
                self.terms.first_payment_date
            )));
        }
        Ok(())
    }

    pub fn schedule(&self, today: NaiveDate) -> Result<Schedule> {
        self.validate(today)?;
        compute_schedule(&self.terms)
    }
}
