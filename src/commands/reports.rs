// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::plans::{PlanSummary, plan_summary};
use crate::config::Settings;
use crate::models::{InstallmentStatus, MovementKind, PlanStatus};
use crate::store;
use crate::utils::{as_of, fmt_money, maybe_print_json, parse_month, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("financing", sub)) => financing(conn, sub)?,
        Some(("overdue", sub)) => overdue(conn, sub)?,
        Some(("cash", sub)) => cash(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancingReport {
    pub as_of: NaiveDate,
    pub plans: Vec<PlanSummary>,
    pub total_financed: Decimal,
    pub total_paid: Decimal,
    pub total_remaining: Decimal,
    pub overdue_payments: usize,
}

/// Portfolio of approved plans as of a date.
pub fn financing_report(conn: &Connection, as_of: NaiveDate) -> Result<FinancingReport> {
    let mut plans = Vec::new();
    for plan in store::list_plans(conn)? {
        if plan.status == PlanStatus::Approved {
            plans.push(plan_summary(conn, &plan, as_of)?);
        }
    }
    Ok(FinancingReport {
        as_of,
        total_financed: plans.iter().map(|p| p.financed_amount).sum(),
        total_paid: plans.iter().map(|p| p.stats.total_paid).sum(),
        total_remaining: plans.iter().map(|p| p.stats.remaining_amount).sum(),
        overdue_payments: plans.iter().map(|p| p.stats.overdue_payments).sum(),
        plans,
    })
}

fn financing(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let ccy = &settings.currency;
    let report = financing_report(conn, as_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
        return Ok(());
    }
    let mut rows: Vec<Vec<String>> = report
        .plans
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.patient.clone(),
                fmt_money(&p.financed_amount, ccy),
                fmt_money(&p.stats.total_paid, ccy),
                fmt_money(&p.stats.remaining_amount, ccy),
                format!("{}%", p.stats.progress),
                p.stats.overdue_payments.to_string(),
                p.stats.next_due.map(|d| d.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    rows.push(vec![
        String::new(),
        "TOTAL".into(),
        fmt_money(&report.total_financed, ccy),
        fmt_money(&report.total_paid, ccy),
        fmt_money(&report.total_remaining, ccy),
        String::new(),
        report.overdue_payments.to_string(),
        String::new(),
    ]);
    println!(
        "{}",
        pretty_table(
            &["ID", "Patient", "Financed", "Paid", "Remaining", "Progress", "Overdue", "Next due"],
            rows
        )
    );
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueRow {
    pub plan_id: i64,
    pub patient: String,
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub days_late: i64,
}

pub fn overdue_rows(conn: &Connection, as_of: NaiveDate) -> Result<Vec<OverdueRow>> {
    let mut out = Vec::new();
    for plan in store::list_plans(conn)? {
        if plan.status != PlanStatus::Approved {
            continue;
        }
        let ledger = store::load_ledger(conn, plan.id)?;
        for row in ledger.rows(as_of) {
            if row.status == InstallmentStatus::Overdue {
                out.push(OverdueRow {
                    plan_id: plan.id,
                    patient: plan.patient.clone(),
                    payment_number: row.payment_number,
                    due_date: row.due_date,
                    amount: row.remaining_amount,
                    days_late: (as_of - row.due_date).num_days(),
                });
            }
        }
    }
    out.sort_by_key(|r| (r.due_date, r.plan_id, r.payment_number));
    Ok(out)
}

fn overdue(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let rows = overdue_rows(conn, as_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        return Ok(());
    }
    let data = rows
        .iter()
        .map(|r| {
            vec![
                r.plan_id.to_string(),
                r.patient.clone(),
                r.payment_number.to_string(),
                r.due_date.to_string(),
                fmt_money(&r.amount, &settings.currency),
                r.days_late.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Plan", "Patient", "#", "Due", "Amount", "Days late"], data)
    );
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashReport {
    pub month: String,
    pub by_category: BTreeMap<String, CategoryTotals>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
}

/// Income and expenses recorded in cash sessions during `month` (YYYY-MM).
pub fn cash_report(conn: &Connection, month: &str) -> Result<CashReport> {
    let month = parse_month(month)?;
    let mut by_category: BTreeMap<String, CategoryTotals> = BTreeMap::new();
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for mv in store::list_movements(conn, Some(&month))? {
        let entry = by_category.entry(mv.category.clone()).or_default();
        match mv.kind {
            MovementKind::Ingreso => {
                entry.income += mv.amount;
                total_income += mv.amount;
            }
            MovementKind::Egreso => {
                entry.expense += mv.amount;
                total_expense += mv.amount;
            }
        }
    }
    Ok(CashReport {
        month,
        by_category,
        total_income,
        total_expense,
        net: total_income - total_expense,
    })
}

fn cash(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let ccy = &settings.currency;
    let report = cash_report(conn, sub.get_one::<String>("month").unwrap())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
        return Ok(());
    }
    let mut rows: Vec<Vec<String>> = report
        .by_category
        .iter()
        .map(|(cat, t)| vec![cat.clone(), fmt_money(&t.income, ccy), fmt_money(&t.expense, ccy)])
        .collect();
    rows.push(vec![
        "TOTAL".into(),
        fmt_money(&report.total_income, ccy),
        fmt_money(&report.total_expense, ccy),
    ]);
    println!(
        "{}",
        pretty_table(&["Category", "Income", "Expense"], rows)
    );
    println!("Net {}: {}", report.month, fmt_money(&report.net, ccy));
    Ok(())
}
