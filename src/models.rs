// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{FinanceError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl PaymentFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFrequency::Weekly => "weekly",
            PaymentFrequency::Biweekly => "biweekly",
            PaymentFrequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentFrequency {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "semanal" => Ok(PaymentFrequency::Weekly),
            "biweekly" | "quincenal" => Ok(PaymentFrequency::Biweekly),
            "monthly" | "mensual" => Ok(PaymentFrequency::Monthly),
            other => Err(FinanceError::InvalidPlanParameters(format!(
                "unknown payment frequency '{}'",
                other
            ))),
        }
    }
}

/// Approval lifecycle of a financing plan. Plans are never deleted, only
/// cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "APROBADO")]
    Approved,
    #[serde(rename = "RECHAZADO")]
    Rejected,
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "PENDIENTE",
            PlanStatus::Approved => "APROBADO",
            PlanStatus::Rejected => "RECHAZADO",
            PlanStatus::Cancelled => "CANCELADO",
        }
    }

    pub fn transition(self, to: PlanStatus) -> Result<PlanStatus> {
        use PlanStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) => Ok(to),
            (Pending, Cancelled) | (Approved, Cancelled) => Ok(to),
            _ => Err(FinanceError::InvalidTransition {
                from: self.as_str().into(),
                to: to.as_str().into(),
            }),
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "PENDIENTE" => Ok(PlanStatus::Pending),
            "APROBADO" => Ok(PlanStatus::Approved),
            "RECHAZADO" => Ok(PlanStatus::Rejected),
            "CANCELADO" => Ok(PlanStatus::Cancelled),
            other => Err(anyhow::anyhow!("Unknown plan status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingPlan {
    pub id: i64,
    pub budget_id: Option<i64>,
    pub patient: String,
    pub total_amount: Decimal,
    pub down_payment: Decimal,
    pub number_of_payments: u32,
    pub frequency: PaymentFrequency,
    pub interest_rate: Decimal,
    pub first_payment_date: NaiveDate,
    pub payment_amount: Decimal,
    pub total_interest: Decimal,
    pub final_date: NaiveDate,
    pub status: PlanStatus,
}

impl FinancingPlan {
    pub fn financed_amount(&self) -> Decimal {
        self.total_amount - self.down_payment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "PARCIAL")]
    Partial,
    #[serde(rename = "PAGADO")]
    Paid,
    #[serde(rename = "VENCIDO")]
    Overdue,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "PENDIENTE",
            InstallmentStatus::Partial => "PARCIAL",
            InstallmentStatus::Paid => "PAGADO",
            InstallmentStatus::Overdue => "VENCIDO",
        }
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInstallment {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub scheduled_amount: Decimal,
    pub paid_amount: Decimal,
}

impl PaymentInstallment {
    pub fn remaining_amount(&self) -> Decimal {
        self.scheduled_amount - self.paid_amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Efectivo,
    Tarjeta,
    Transferencia,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "efectivo",
            PaymentMethod::Tarjeta => "tarjeta",
            PaymentMethod::Transferencia => "transferencia",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => Ok(PaymentMethod::Efectivo),
            "tarjeta" | "card" => Ok(PaymentMethod::Tarjeta),
            "transferencia" | "transfer" => Ok(PaymentMethod::Transferencia),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            other => Err(anyhow::anyhow!(
                "Unknown payment method '{}' (use efectivo|tarjeta|transferencia|cheque)",
                other
            )),
        }
    }
}

/// A payment applied to one installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_number: u32,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashSessionStatus {
    #[serde(rename = "ABIERTA")]
    Open,
    #[serde(rename = "CERRADA")]
    Closed,
}

impl CashSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashSessionStatus::Open => "ABIERTA",
            CashSessionStatus::Closed => "CERRADA",
        }
    }
}

impl FromStr for CashSessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "ABIERTA" => Ok(CashSessionStatus::Open),
            "CERRADA" => Ok(CashSessionStatus::Closed),
            other => Err(anyhow::anyhow!("Unknown cash session status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Ingreso,
    Egreso,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Ingreso => "ingreso",
            MovementKind::Egreso => "egreso",
        }
    }
}

impl FromStr for MovementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "ingreso" => Ok(MovementKind::Ingreso),
            "egreso" => Ok(MovementKind::Egreso),
            other => Err(anyhow::anyhow!("Unknown movement kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashMovement {
    pub id: i64,
    pub session_id: i64,
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub amount: Decimal,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "APROBADO")]
    Approved,
    #[serde(rename = "RECHAZADO")]
    Rejected,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Pending => "PENDIENTE",
            BudgetStatus::Approved => "APROBADO",
            BudgetStatus::Rejected => "RECHAZADO",
        }
    }

    pub fn transition(self, to: BudgetStatus) -> Result<BudgetStatus> {
        match (self, to) {
            (BudgetStatus::Pending, BudgetStatus::Approved)
            | (BudgetStatus::Pending, BudgetStatus::Rejected) => Ok(to),
            _ => Err(FinanceError::InvalidTransition {
                from: self.as_str().into(),
                to: to.as_str().into(),
            }),
        }
    }
}

impl FromStr for BudgetStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "PENDIENTE" => Ok(BudgetStatus::Pending),
            "APROBADO" => Ok(BudgetStatus::Approved),
            "RECHAZADO" => Ok(BudgetStatus::Rejected),
            other => Err(anyhow::anyhow!("Unknown budget status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
}
