// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Budget (quote) totals.
//!
//! `subtotal` is already net of line discounts; `discount_total` is reported
//! alongside it and is not subtracted again.

use crate::engine::money::percent_of;
use crate::error::{FinanceError, Result};
use crate::models::BudgetItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTotal {
    pub line_subtotal: Decimal,
    pub line_discount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

fn overflow(what: &str) -> FinanceError {
    FinanceError::InvalidPlanParameters(format!("{} is too large", what))
}

pub fn line_total(item: &BudgetItem) -> Result<LineTotal> {
    let line_subtotal = item
        .quantity
        .checked_mul(item.unit_price)
        .ok_or_else(|| overflow(&format!("line '{}'", item.description)))?;
    let line_discount = percent_of(line_subtotal, item.discount_percent)
        .ok_or_else(|| overflow(&format!("discount on '{}'", item.description)))?;
    let line_total = line_subtotal
        .checked_sub(line_discount)
        .ok_or_else(|| overflow(&format!("line '{}'", item.description)))?;
    Ok(LineTotal {
        line_subtotal,
        line_discount,
        line_total,
    })
}

/// Rejects negative quantities, prices, tax and discounts outside 0..=100.
pub fn check_item(item: &BudgetItem) -> Result<()> {
    let bad = |msg: String| Err(FinanceError::InvalidPlanParameters(msg));
    if item.quantity < Decimal::ZERO {
        return bad(format!("quantity for '{}' cannot be negative", item.description));
    }
    if item.unit_price < Decimal::ZERO {
        return bad(format!("unit price for '{}' cannot be negative", item.description));
    }
    if item.discount_percent < Decimal::ZERO || item.discount_percent > Decimal::ONE_HUNDRED {
        return bad(format!(
            "discount for '{}' must be between 0 and 100, got {}",
            item.description, item.discount_percent
        ));
    }
    Ok(())
}

pub fn compute_totals(items: &[BudgetItem], tax_rate_percent: Decimal) -> Result<BudgetTotals> {
    if tax_rate_percent < Decimal::ZERO {
        return Err(FinanceError::InvalidPlanParameters(format!(
            "tax rate cannot be negative, got {}",
            tax_rate_percent
        )));
    }
    let mut subtotal = Decimal::ZERO;
    let mut discount_total = Decimal::ZERO;
    for item in items {
        check_item(item)?;
        let line = line_total(item)?;
        subtotal = subtotal
            .checked_add(line.line_total)
            .ok_or_else(|| overflow("budget subtotal"))?;
        discount_total = discount_total
            .checked_add(line.line_discount)
            .ok_or_else(|| overflow("budget discount"))?;
    }
    let tax_amount = percent_of(subtotal, tax_rate_percent).ok_or_else(|| overflow("budget tax"))?;
    let total = subtotal
        .checked_add(tax_amount)
        .ok_or_else(|| overflow("budget total"))?;
    Ok(BudgetTotals {
        subtotal,
        discount_total,
        tax_amount,
        total,
    })
}
