// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row mapping between the SQLite tables and the engine types. Amounts are
//! stored as TEXT and parsed back into `Decimal`.

use crate::engine::amortization::{PlanDraft, Schedule};
use crate::engine::ledger::PaymentLedger;
use crate::engine::reconciliation::CashSession;
use crate::engine::totals::{BudgetTotals, line_total};
use crate::models::{
    BudgetItem, BudgetStatus, CashMovement, FinancingPlan, MovementKind, PaymentInstallment,
    PaymentRecord, PlanStatus,
};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;

fn dec(raw: &str, what: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid {} '{}' in database", what, raw))
}

fn date(raw: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} '{}' in database", what, raw))
}

// ---- budgets ----

#[derive(Debug, Clone, Serialize)]
pub struct StoredBudget {
    pub id: i64,
    pub patient: String,
    pub created_on: NaiveDate,
    pub tax_rate: Decimal,
    pub totals: BudgetTotals,
    pub status: BudgetStatus,
    pub items: Vec<BudgetItem>,
}

pub fn insert_budget(
    conn: &Connection,
    patient: &str,
    created_on: NaiveDate,
    tax_rate: Decimal,
    items: &[BudgetItem],
    totals: &BudgetTotals,
    external_id: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO budgets(patient, created_on, tax_rate, subtotal, discount_total, tax_amount, total, external_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            patient,
            created_on.to_string(),
            tax_rate.to_string(),
            totals.subtotal.to_string(),
            totals.discount_total.to_string(),
            totals.tax_amount.to_string(),
            totals.total.to_string(),
            external_id
        ],
    )?;
    let budget_id = conn.last_insert_rowid();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO budget_items(budget_id, description, quantity, unit_price, discount_percent, line_total)
         VALUES (?1,?2,?3,?4,?5,?6)",
    )?;
    for item in items {
        stmt.execute(params![
            budget_id,
            item.description,
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.discount_percent.to_string(),
            line_total(item)?.line_total.to_string()
        ])?;
    }
    Ok(budget_id)
}

pub fn load_budget(conn: &Connection, id: i64) -> Result<StoredBudget> {
    let row = conn
        .query_row(
            "SELECT patient, created_on, tax_rate, subtotal, discount_total, tax_amount, total, status
             FROM budgets WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| anyhow!("Budget {} not found", id))?;
    let (patient, created_on, tax_rate, subtotal, discount_total, tax_amount, total, status) = row;

    let mut stmt = conn.prepare(
        "SELECT description, quantity, unit_price, discount_percent FROM budget_items
         WHERE budget_id=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut items = Vec::new();
    for row in rows {
        let (description, q, p, d) = row?;
        items.push(BudgetItem {
            description,
            quantity: dec(&q, "quantity")?,
            unit_price: dec(&p, "unit price")?,
            discount_percent: dec(&d, "discount")?,
        });
    }

    Ok(StoredBudget {
        id,
        patient,
        created_on: date(&created_on, "budget date")?,
        tax_rate: dec(&tax_rate, "tax rate")?,
        totals: BudgetTotals {
            subtotal: dec(&subtotal, "subtotal")?,
            discount_total: dec(&discount_total, "discount total")?,
            tax_amount: dec(&tax_amount, "tax amount")?,
            total: dec(&total, "total")?,
        },
        status: status.parse()?,
        items,
    })
}

pub fn set_budget_status(conn: &Connection, id: i64, status: BudgetStatus) -> Result<()> {
    conn.execute(
        "UPDATE budgets SET status=?1 WHERE id=?2",
        params![status.as_str(), id],
    )?;
    Ok(())
}

// ---- financing plans ----

const PLAN_COLUMNS: &str = "id, budget_id, patient, total_amount, down_payment, number_of_payments,
     frequency, interest_rate, first_payment_date, payment_amount, total_interest, final_date, status";

fn plan_from_row(r: &Row<'_>) -> Result<FinancingPlan> {
    let total: String = r.get(3)?;
    let down: String = r.get(4)?;
    let freq: String = r.get(6)?;
    let rate: String = r.get(7)?;
    let first: String = r.get(8)?;
    let payment: String = r.get(9)?;
    let interest: String = r.get(10)?;
    let final_date: String = r.get(11)?;
    let status: String = r.get(12)?;
    Ok(FinancingPlan {
        id: r.get(0)?,
        budget_id: r.get(1)?,
        patient: r.get(2)?,
        total_amount: dec(&total, "total amount")?,
        down_payment: dec(&down, "down payment")?,
        number_of_payments: r.get(5)?,
        frequency: freq.parse()?,
        interest_rate: dec(&rate, "interest rate")?,
        first_payment_date: date(&first, "first payment date")?,
        payment_amount: dec(&payment, "payment amount")?,
        total_interest: dec(&interest, "total interest")?,
        final_date: date(&final_date, "final date")?,
        status: status.parse()?,
    })
}

/// Stores the plan and its installments. Callers wrap this in a transaction.
pub fn insert_plan(conn: &Connection, draft: &PlanDraft, schedule: &Schedule) -> Result<i64> {
    let t = &draft.terms;
    conn.execute(
        "INSERT INTO financing_plans(budget_id, patient, total_amount, down_payment, number_of_payments,
             frequency, interest_rate, first_payment_date, payment_amount, total_interest, final_date)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            draft.budget_id,
            draft.patient.trim(),
            t.total_amount.to_string(),
            t.down_payment.to_string(),
            t.number_of_payments,
            t.frequency.as_str(),
            t.annual_interest_rate.to_string(),
            t.first_payment_date.to_string(),
            schedule.payment_amount.to_string(),
            schedule.total_interest.to_string(),
            schedule.final_date.to_string()
        ],
    )?;
    let plan_id = conn.last_insert_rowid();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO installments(plan_id, payment_number, due_date, scheduled_amount, paid_amount)
         VALUES (?1,?2,?3,?4,?5)",
    )?;
    for inst in &schedule.installments {
        stmt.execute(params![
            plan_id,
            inst.payment_number,
            inst.due_date.to_string(),
            inst.scheduled_amount.to_string(),
            inst.paid_amount.to_string()
        ])?;
    }
    Ok(plan_id)
}

pub fn load_plan(conn: &Connection, id: i64) -> Result<FinancingPlan> {
    let sql = format!("SELECT {} FROM financing_plans WHERE id=?1", PLAN_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(r) => plan_from_row(r),
        None => Err(anyhow!("Financing plan {} not found", id)),
    }
}

pub fn list_plans(conn: &Connection) -> Result<Vec<FinancingPlan>> {
    let sql = format!("SELECT {} FROM financing_plans ORDER BY id", PLAN_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(plan_from_row(r)?);
    }
    Ok(out)
}

pub fn set_plan_status(conn: &Connection, id: i64, status: PlanStatus) -> Result<()> {
    conn.execute(
        "UPDATE financing_plans SET status=?1 WHERE id=?2",
        params![status.as_str(), id],
    )?;
    Ok(())
}

pub fn load_ledger(conn: &Connection, plan_id: i64) -> Result<PaymentLedger> {
    let mut stmt = conn.prepare_cached(
        "SELECT payment_number, due_date, scheduled_amount, paid_amount
         FROM installments WHERE plan_id=?1 ORDER BY payment_number",
    )?;
    let rows = stmt.query_map(params![plan_id], |r| {
        Ok((
            r.get::<_, u32>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut installments = Vec::new();
    for row in rows {
        let (payment_number, due, scheduled, paid) = row?;
        installments.push(PaymentInstallment {
            payment_number,
            due_date: date(&due, "due date")?,
            scheduled_amount: dec(&scheduled, "scheduled amount")?,
            paid_amount: dec(&paid, "paid amount")?,
        });
    }

    let mut stmt = conn.prepare_cached(
        "SELECT payment_number, date, amount, method, reference
         FROM payments WHERE plan_id=?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![plan_id], |r| {
        Ok((
            r.get::<_, u32>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    let mut payments = Vec::new();
    for row in rows {
        let (payment_number, d, amount, method, reference) = row?;
        payments.push(PaymentRecord {
            payment_number,
            date: date(&d, "payment date")?,
            amount: dec(&amount, "payment amount")?,
            method: method.parse()?,
            reference,
        });
    }
    Ok(PaymentLedger::from_parts(installments, payments))
}

/// Persists one payment and the new paid amount of its installment.
pub fn save_payment(
    conn: &Connection,
    plan_id: i64,
    record: &PaymentRecord,
    paid_amount: Decimal,
) -> Result<()> {
    conn.execute(
        "INSERT INTO payments(plan_id, payment_number, date, amount, method, reference)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            plan_id,
            record.payment_number,
            record.date.to_string(),
            record.amount.to_string(),
            record.method.as_str(),
            record.reference
        ],
    )?;
    conn.execute(
        "UPDATE installments SET paid_amount=?1 WHERE plan_id=?2 AND payment_number=?3",
        params![paid_amount.to_string(), plan_id, record.payment_number],
    )?;
    Ok(())
}

// ---- cash sessions ----

fn movement_totals(conn: &Connection, session_id: i64) -> Result<(Decimal, Decimal)> {
    let mut stmt =
        conn.prepare_cached("SELECT kind, amount FROM cash_movements WHERE session_id=?1")?;
    let mut rows = stmt.query(params![session_id])?;
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let kind: String = r.get(0)?;
        let amount: String = r.get(1)?;
        let amount = dec(&amount, "movement amount")?;
        match kind.parse::<MovementKind>()? {
            MovementKind::Ingreso => income += amount,
            MovementKind::Egreso => expense += amount,
        }
    }
    Ok((income, expense))
}

pub fn load_session(conn: &Connection, id: i64) -> Result<CashSession> {
    let row = conn
        .query_row(
            "SELECT opened_on, closed_on, opening_balance, actual_closing, difference, status, notes
             FROM cash_sessions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, Option<String>>(6)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| anyhow!("Cash session {} not found", id))?;
    let (opened_on, closed_on, opening, actual, difference, status, notes) = row;
    let (total_income, total_expense) = movement_totals(conn, id)?;
    Ok(CashSession {
        id,
        opened_on: date(&opened_on, "opening date")?,
        closed_on: closed_on.map(|d| date(&d, "closing date")).transpose()?,
        opening_balance: dec(&opening, "opening balance")?,
        total_income,
        total_expense,
        actual_closing: actual.map(|a| dec(&a, "actual closing")).transpose()?,
        difference: difference.map(|d| dec(&d, "difference")).transpose()?,
        status: status.parse()?,
        notes,
    })
}

pub fn open_session_id(conn: &Connection) -> Result<Option<i64>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM cash_sessions WHERE status='ABIERTA' ORDER BY id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn list_sessions(conn: &Connection) -> Result<Vec<CashSession>> {
    let mut stmt = conn.prepare("SELECT id FROM cash_sessions ORDER BY id DESC")?;
    let ids = stmt.query_map([], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(load_session(conn, id?)?);
    }
    Ok(out)
}

pub fn insert_session(conn: &Connection, session: &CashSession) -> Result<i64> {
    conn.execute(
        "INSERT INTO cash_sessions(opened_on, opening_balance, status) VALUES (?1,?2,?3)",
        params![
            session.opened_on.to_string(),
            session.opening_balance.to_string(),
            session.status.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_movement(
    conn: &Connection,
    session_id: i64,
    date: NaiveDate,
    kind: MovementKind,
    amount: Decimal,
    category: &str,
    description: Option<&str>,
) -> Result<i64> {
    let inserted = conn.execute(
        "INSERT INTO cash_movements(session_id, date, kind, amount, category, description)
         SELECT ?1,?2,?3,?4,?5,?6 FROM cash_sessions WHERE id=?1 AND status='ABIERTA'",
        params![
            session_id,
            date.to_string(),
            kind.as_str(),
            amount.to_string(),
            category,
            description
        ],
    )?;
    if inserted == 0 {
        return Err(anyhow!("Cash session {} is not open", session_id));
    }
    Ok(conn.last_insert_rowid())
}

pub fn list_movements(conn: &Connection, month: Option<&str>) -> Result<Vec<CashMovement>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, date, kind, amount, category, description FROM cash_movements
         WHERE ?1 IS NULL OR substr(date,1,7)=?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![month], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, Option<String>>(6)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, session_id, d, kind, amount, category, description) = row?;
        out.push(CashMovement {
            id,
            session_id,
            date: date(&d, "movement date")?,
            kind: kind.parse()?,
            amount: dec(&amount, "movement amount")?,
            category,
            description,
        });
    }
    Ok(out)
}

/// Writes the closing state of a session. `counts` is the JSON of the
/// denomination count, kept for the audit trail.
pub fn save_closed_session(conn: &Connection, session: &CashSession, counts: &str) -> Result<()> {
    conn.execute(
        "UPDATE cash_sessions SET closed_on=?1, actual_closing=?2, difference=?3, counts=?4,
             status=?5, notes=?6
         WHERE id=?7",
        params![
            session.closed_on.map(|d| d.to_string()),
            session.actual_closing.map(|d| d.to_string()),
            session.difference.map(|d| d.to_string()),
            counts,
            session.status.as_str(),
            session.notes,
            session.id
        ],
    )?;
    Ok(())
}

pub fn save_session_notes(conn: &Connection, session: &CashSession) -> Result<()> {
    conn.execute(
        "UPDATE cash_sessions SET notes=?1 WHERE id=?2",
        params![session.notes, session.id],
    )?;
    Ok(())
}
