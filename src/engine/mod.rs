// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure calculation engine. Nothing in here touches the database or the
//! network.

pub mod amortization;
pub mod ledger;
pub mod money;
pub mod reconciliation;
pub mod totals;

pub use amortization::{PlanDraft, PlanTerms, Schedule, compute_schedule};
pub use ledger::{PaymentLedger, PlanStats, derive_status};
pub use reconciliation::{CashSession, DenominationCount, Reconciliation, count_denominations, reconcile};
pub use totals::{BudgetTotals, compute_totals};
