// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::models::CashSessionStatus;
use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

/// Consistency problems found in the stored data, as (issue, detail) pairs.
pub fn diagnose(conn: &Connection) -> Result<Vec<(String, String)>> {
    let settings = Settings::load(conn)?;
    let mut issues = Vec::new();

    // 1) Plans whose stored schedule or payments drifted
    for plan in store::list_plans(conn)? {
        let ledger = store::load_ledger(conn, plan.id)?;
        let count = ledger.installments().len();
        if count != plan.number_of_payments as usize {
            issues.push((
                "installment_count".into(),
                format!(
                    "plan {}: {} installments, expected {}",
                    plan.id, count, plan.number_of_payments
                ),
            ));
        }
        for inst in ledger.installments() {
            if inst.paid_amount > inst.scheduled_amount {
                issues.push((
                    "overpaid_installment".into(),
                    format!(
                        "plan {} #{}: paid {} of {}",
                        plan.id, inst.payment_number, inst.paid_amount, inst.scheduled_amount
                    ),
                ));
            }
        }
    }

    // 2) Cash sessions
    let sessions = store::list_sessions(conn)?;
    let open: Vec<String> = sessions
        .iter()
        .filter(|s| s.status == CashSessionStatus::Open)
        .map(|s| s.id.to_string())
        .collect();
    if open.len() > 1 {
        issues.push(("multiple_open_sessions".into(), open.join(", ")));
    }
    for s in &sessions {
        if let Some(diff) = s.difference {
            if diff.abs() > settings.discrepancy_tolerance && s.notes.is_none() {
                issues.push((
                    "unexplained_difference".into(),
                    format!("session {}: {}", s.id, diff),
                ));
            }
        }
    }
    Ok(issues)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = diagnose(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        log::warn!("doctor found {} issue(s)", issues.len());
        let rows = issues.into_iter().map(|(i, d)| vec![i, d]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
