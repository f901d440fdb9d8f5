// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::engine::amortization::{PlanDraft, PlanTerms, Schedule, compute_schedule};
use crate::engine::ledger::{InstallmentView, PaymentLedger, PlanStats};
use crate::models::{BudgetStatus, FinancingPlan, PaymentFrequency, PlanStatus};
use crate::store;
use crate::utils::{
    as_of, fmt_money, id_arg, maybe_print_json, parse_date, parse_decimal, pretty_table, today,
};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("preview", sub)) => preview(conn, sub)?,
        Some(("create", sub)) => {
            create(conn, sub, today())?;
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("approve", sub)) => transition(conn, sub, PlanStatus::Approved)?,
        Some(("reject", sub)) => transition(conn, sub, PlanStatus::Rejected)?,
        Some(("cancel", sub)) => transition(conn, sub, PlanStatus::Cancelled)?,
        _ => {}
    }
    Ok(())
}

pub fn terms_from_args(sub: &clap::ArgMatches, total_amount: Decimal) -> Result<PlanTerms> {
    let raw_n = sub.get_one::<String>("payments").unwrap();
    let number_of_payments = raw_n
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid number of payments '{}'", raw_n))?;
    let frequency: PaymentFrequency = sub.get_one::<String>("frequency").unwrap().parse()?;
    Ok(PlanTerms {
        total_amount,
        down_payment: parse_decimal(sub.get_one::<String>("down").unwrap())?,
        number_of_payments,
        annual_interest_rate: parse_decimal(sub.get_one::<String>("rate").unwrap())?,
        frequency,
        first_payment_date: parse_date(sub.get_one::<String>("first_date").unwrap())?,
    })
}

pub fn schedule_rows(rows: &[InstallmentView], ccy: &str) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                r.payment_number.to_string(),
                r.due_date.to_string(),
                fmt_money(&r.scheduled_amount, ccy),
                fmt_money(&r.paid_amount, ccy),
                fmt_money(&r.remaining_amount, ccy),
                r.status.to_string(),
            ]
        })
        .collect()
}

const SCHEDULE_HEADERS: [&str; 6] = ["#", "Due", "Amount", "Paid", "Remaining", "Status"];

fn print_schedule_header(schedule: &Schedule, ccy: &str) {
    println!(
        "Financed {} | payment {} | interest {} | last payment {}",
        fmt_money(&schedule.financed_amount, ccy),
        fmt_money(&schedule.payment_amount, ccy),
        fmt_money(&schedule.total_interest, ccy),
        schedule.final_date
    );
}

fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let total = parse_decimal(sub.get_one::<String>("total").unwrap())?;
    let terms = terms_from_args(sub, total)?;
    let schedule = compute_schedule(&terms)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &schedule)? {
        return Ok(());
    }
    print_schedule_header(&schedule, &settings.currency);
    let ledger = PaymentLedger::from_schedule(&schedule);
    println!(
        "{}",
        pretty_table(
            &SCHEDULE_HEADERS,
            schedule_rows(&ledger.rows(terms.first_payment_date), &settings.currency)
        )
    );
    Ok(())
}

/// Validates and stores a new plan in PENDIENTE status. `today` is the
/// creation date the first payment date is checked against.
pub fn create(conn: &mut Connection, sub: &clap::ArgMatches, today: NaiveDate) -> Result<i64> {
    let settings = Settings::load(conn)?;
    let patient_arg = sub
        .get_one::<String>("patient")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let draft = match sub.get_one::<String>("budget") {
        Some(raw) => {
            let budget_id = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid budget id '{}'", raw))?;
            let budget = store::load_budget(conn, budget_id)?;
            if budget.status != BudgetStatus::Approved {
                return Err(anyhow!(
                    "Budget {} is {}; only approved budgets can be financed",
                    budget_id,
                    budget.status.as_str()
                ));
            }
            let terms = terms_from_args(sub, budget.totals.total)?;
            PlanDraft::new(patient_arg.unwrap_or(budget.patient), terms).with_budget(budget_id)
        }
        None => {
            let total = sub
                .get_one::<String>("total")
                .context("--total is required unless --budget is given")?;
            let patient = patient_arg.context("--patient is required unless --budget is given")?;
            PlanDraft::new(patient, terms_from_args(sub, parse_decimal(total)?)?)
        }
    };

    let schedule = draft.schedule(today)?;
    let tx = conn.transaction()?;
    let id = store::insert_plan(&tx, &draft, &schedule)?;
    tx.commit()?;

    log::info!(
        "plan {} created: {} installments of {}",
        id,
        draft.terms.number_of_payments,
        schedule.payment_amount
    );
    println!("Created financing plan {} for {}", id, draft.patient);
    print_schedule_header(&schedule, &settings.currency);
    Ok(id)
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub id: i64,
    pub patient: String,
    pub status: PlanStatus,
    pub financed_amount: Decimal,
    pub payment_amount: Decimal,
    pub total_interest: Decimal,
    pub final_date: NaiveDate,
    #[serde(flatten)]
    pub stats: PlanStats,
}

pub fn plan_summary(conn: &Connection, plan: &FinancingPlan, as_of: NaiveDate) -> Result<PlanSummary> {
    let ledger = store::load_ledger(conn, plan.id)?;
    Ok(PlanSummary {
        id: plan.id,
        patient: plan.patient.clone(),
        status: plan.status,
        financed_amount: plan.financed_amount(),
        payment_amount: plan.payment_amount,
        total_interest: plan.total_interest,
        final_date: plan.final_date,
        stats: ledger.stats(as_of),
    })
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let as_of = as_of(sub)?;
    let mut summaries = Vec::new();
    for plan in store::list_plans(conn)? {
        summaries.push(plan_summary(conn, &plan, as_of)?);
    }
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summaries)? {
        return Ok(());
    }
    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.patient.clone(),
                s.status.to_string(),
                fmt_money(&s.financed_amount, &settings.currency),
                fmt_money(&s.stats.total_paid, &settings.currency),
                format!("{}%", s.stats.progress),
                s.stats.overdue_payments.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Patient", "Status", "Financed", "Paid", "Progress", "Overdue"],
            rows
        )
    );
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let as_of = as_of(sub)?;
    let plan = store::load_plan(conn, id_arg(sub, "id")?)?;
    let ledger = store::load_ledger(conn, plan.id)?;
    let rows = ledger.rows(as_of);

    #[derive(Serialize)]
    struct PlanDetail<'a> {
        plan: &'a FinancingPlan,
        stats: PlanStats,
        installments: &'a [InstallmentView],
    }
    let detail = PlanDetail {
        plan: &plan,
        stats: ledger.stats(as_of),
        installments: &rows,
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        return Ok(());
    }
    let ccy = &settings.currency;
    println!(
        "Plan {} | {} | {} | {} x {} {} at {}%",
        plan.id,
        plan.patient,
        plan.status,
        plan.number_of_payments,
        fmt_money(&plan.payment_amount, ccy),
        plan.frequency,
        plan.interest_rate.normalize()
    );
    println!(
        "Total {} | down {} | financed {} | interest {}",
        fmt_money(&plan.total_amount, ccy),
        fmt_money(&plan.down_payment, ccy),
        fmt_money(&plan.financed_amount(), ccy),
        fmt_money(&plan.total_interest, ccy)
    );
    println!(
        "Paid {} | remaining {} | progress {}% | overdue {}",
        fmt_money(&detail.stats.total_paid, ccy),
        fmt_money(&detail.stats.remaining_amount, ccy),
        detail.stats.progress,
        detail.stats.overdue_payments
    );
    println!("{}", pretty_table(&SCHEDULE_HEADERS, schedule_rows(&rows, ccy)));
    Ok(())
}

fn transition(conn: &Connection, sub: &clap::ArgMatches, to: PlanStatus) -> Result<()> {
    let id = id_arg(sub, "id")?;
    let plan = store::load_plan(conn, id)?;
    let next = plan.status.transition(to)?;
    store::set_plan_status(conn, id, next)?;
    log::info!("plan {} -> {}", id, next);
    println!("Plan {} is now {}", id, next);
    Ok(())
}
