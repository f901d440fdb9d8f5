// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Money rounding and percentage helpers.

use rust_decimal::{Decimal, RoundingStrategy};

/// One cent, the smallest amount a payment or a count can differ by.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Round to two decimals, halves away from zero.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * pct / 100`, unrounded. `None` when the product overflows.
pub fn percent_of(amount: Decimal, pct: Decimal) -> Option<Decimal> {
    amount.checked_mul(pct)?.checked_div(HUNDRED)
}

/// Periodic rate for an annual percentage. Always monthly, whatever the
/// payment frequency of the plan.
pub fn monthly_rate(annual_pct: Decimal) -> Decimal {
    annual_pct / HUNDRED / MONTHS_PER_YEAR
}

pub fn approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// `base^n` by repeated multiplication. `None` on overflow.
pub fn pow_n(base: Decimal, n: u32) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..n {
        acc = acc.checked_mul(base)?;
    }
    Some(acc)
}
