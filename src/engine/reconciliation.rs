// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Cash counting and closing of cash-register sessions.

use crate::engine::money::CENT;
use crate::error::{FinanceError, Result};
use crate::models::{CashSessionStatus, MovementKind};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenominationKind {
    Bill,
    Coin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Denomination {
    pub kind: DenominationKind,
    pub value: Decimal,
}

const fn bill(units: u32) -> Denomination {
    Denomination {
        kind: DenominationKind::Bill,
        value: Decimal::from_parts(units, 0, 0, false, 0),
    }
}

const fn coin(units: u32, scale: u32) -> Denomination {
    Denomination {
        kind: DenominationKind::Coin,
        value: Decimal::from_parts(units, 0, 0, false, scale),
    }
}

/// Bills and coins accepted in a count, largest first.
pub const DENOMINATIONS: [Denomination; 12] = [
    bill(1000),
    bill(500),
    bill(200),
    bill(100),
    bill(50),
    bill(20),
    coin(20, 0),
    coin(10, 0),
    coin(5, 0),
    coin(2, 0),
    coin(1, 0),
    coin(5, 1),
];

static KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(bill|coin)s?_(\d+)(?:[._,](\d+))?$").expect("denomination key regex")
});

impl Denomination {
    /// Input key such as `bills_100` or `coins_0.5`.
    pub fn key(&self) -> String {
        let prefix = match self.kind {
            DenominationKind::Bill => "bills",
            DenominationKind::Coin => "coins",
        };
        format!("{}_{}", prefix, self.value.normalize())
    }

    pub fn parse_key(raw: &str) -> Result<Denomination> {
        let key = raw.trim();
        let caps = KEY_RE.captures(key).ok_or_else(|| {
            FinanceError::InvalidDenominationInput(format!("unknown denomination '{}'", key))
        })?;
        let kind = if caps[1].eq_ignore_ascii_case("bill") {
            DenominationKind::Bill
        } else {
            DenominationKind::Coin
        };
        let literal = match caps.get(3) {
            Some(frac) => format!("{}.{}", &caps[2], frac.as_str()),
            None => caps[2].to_string(),
        };
        let value = literal.parse::<Decimal>().map_err(|_| {
            FinanceError::InvalidDenominationInput(format!("unknown denomination '{}'", key))
        })?;
        DENOMINATIONS
            .iter()
            .copied()
            .find(|d| d.kind == kind && d.value == value)
            .ok_or_else(|| {
                FinanceError::InvalidDenominationInput(format!("unknown denomination '{}'", key))
            })
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Physical count of a drawer. Denominations never set count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenominationCount {
    counts: BTreeMap<String, u32>,
}

fn parse_quantity(key: &str, raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>().map_err(|_| {
        FinanceError::InvalidDenominationInput(format!(
            "quantity for {} must be a non-negative whole number, got '{}'",
            key, raw
        ))
    })
}

impl DenominationCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, denomination: Denomination, quantity: u32) {
        self.counts.insert(denomination.key(), quantity);
    }

    pub fn quantity(&self, denomination: &Denomination) -> u32 {
        self.counts.get(&denomination.key()).copied().unwrap_or(0)
    }

    /// Strict parse of `(key, quantity)` pairs. Unknown keys, negative or
    /// non-numeric quantities are rejected; blank quantities count as zero.
    pub fn parse_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut out = Self::new();
        for (key, raw) in entries {
            let denomination = Denomination::parse_key(key)?;
            let qty = parse_quantity(key, raw)?;
            let slot = out.counts.entry(denomination.key()).or_insert(0);
            *slot = slot.checked_add(qty).ok_or_else(|| {
                FinanceError::InvalidDenominationInput(format!("quantity for {} is too large", key))
            })?;
        }
        Ok(out)
    }

    /// Parse `key=quantity` arguments, e.g. `bills_100=5`.
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut pairs = Vec::with_capacity(args.len());
        for arg in args {
            let arg = arg.as_ref();
            let (k, v) = arg.split_once('=').ok_or_else(|| {
                FinanceError::InvalidDenominationInput(format!(
                    "expected key=quantity, got '{}'",
                    arg
                ))
            })?;
            pairs.push((k, v));
        }
        Self::parse_entries(pairs)
    }

    /// Non-zero lines in table order: denomination, quantity, subtotal.
    pub fn lines(&self) -> Vec<(Denomination, u32, Decimal)> {
        DENOMINATIONS
            .iter()
            .filter_map(|d| {
                let q = self.quantity(d);
                (q > 0).then(|| (*d, q, d.value * Decimal::from(q)))
            })
            .collect()
    }
}

pub fn count_denominations(counts: &DenominationCount) -> Decimal {
    DENOMINATIONS
        .iter()
        .map(|d| d.value * Decimal::from(counts.quantity(d)))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub counted_total: Decimal,
    pub expected_closing: Decimal,
    /// Positive is a surplus, negative a shortage.
    pub difference: Decimal,
    pub requires_notes: bool,
}

pub fn reconcile(counted_total: Decimal, expected_closing: Decimal) -> Reconciliation {
    reconcile_with_tolerance(counted_total, expected_closing, CENT)
}

pub fn reconcile_with_tolerance(
    counted_total: Decimal,
    expected_closing: Decimal,
    tolerance: Decimal,
) -> Reconciliation {
    let difference = counted_total - expected_closing;
    Reconciliation {
        counted_total,
        expected_closing,
        difference,
        requires_notes: difference.abs() > tolerance,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashSession {
    pub id: i64,
    pub opened_on: NaiveDate,
    pub closed_on: Option<NaiveDate>,
    pub opening_balance: Decimal,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub actual_closing: Option<Decimal>,
    pub difference: Option<Decimal>,
    pub status: CashSessionStatus,
    pub notes: Option<String>,
}

impl CashSession {
    pub fn open(id: i64, opened_on: NaiveDate, opening_balance: Decimal) -> Result<Self> {
        if opening_balance < Decimal::ZERO {
            return Err(FinanceError::InvalidDenominationInput(format!(
                "opening balance cannot be negative, got {}",
                opening_balance
            )));
        }
        Ok(Self {
            id,
            opened_on,
            closed_on: None,
            opening_balance,
            total_income: Decimal::ZERO,
            total_expense: Decimal::ZERO,
            actual_closing: None,
            difference: None,
            status: CashSessionStatus::Open,
            notes: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == CashSessionStatus::Open
    }

    pub fn expected_closing(&self) -> Decimal {
        self.opening_balance + self.total_income - self.total_expense
    }

    pub fn apply_movement(&mut self, kind: MovementKind, amount: Decimal) -> Result<()> {
        if !self.is_open() {
            return Err(FinanceError::SessionClosed);
        }
        if amount <= Decimal::ZERO {
            return Err(FinanceError::InvalidPaymentAmount(amount));
        }
        match kind {
            MovementKind::Ingreso => self.total_income += amount,
            MovementKind::Egreso => self.total_expense += amount,
        }
        Ok(())
    }

    /// `ABIERTA -> CERRADA`. The only transition; a closed session cannot be
    /// reopened.
    pub fn close(
        &mut self,
        actual_closing: Decimal,
        notes: Option<String>,
        closed_on: NaiveDate,
        tolerance: Decimal,
    ) -> Result<Reconciliation> {
        if !self.is_open() {
            return Err(FinanceError::SessionClosed);
        }
        if actual_closing < Decimal::ZERO {
            return Err(FinanceError::InvalidDenominationInput(format!(
                "actual closing cannot be negative, got {}",
                actual_closing
            )));
        }
        let rec = reconcile_with_tolerance(actual_closing, self.expected_closing(), tolerance);
        self.actual_closing = Some(actual_closing);
        self.difference = Some(rec.difference);
        self.closed_on = Some(closed_on);
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self.status = CashSessionStatus::Closed;
        Ok(rec)
    }

    /// Discrepancy notes stay editable after closing.
    pub fn annotate(&mut self, notes: impl Into<String>) {
        self.notes = Some(notes.into());
    }
}
