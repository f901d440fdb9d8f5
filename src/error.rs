// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error type shared by the calculation engine.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinanceError {
    #[error("Invalid plan parameters: {0}")]
    InvalidPlanParameters(String),

    #[error("Payment of {requested} exceeds remaining balance {remaining}")]
    OverpaymentRejected {
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Payment amount must be positive, got {0}")]
    InvalidPaymentAmount(Decimal),

    #[error("Invalid denomination input: {0}")]
    InvalidDenominationInput(String),

    #[error("Installment #{0} not found")]
    InstallmentNotFound(u32),

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Cash session is already closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, FinanceError>;
