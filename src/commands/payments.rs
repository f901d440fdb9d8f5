// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::engine::ledger::derive_status;
use crate::models::{InstallmentStatus, PaymentInstallment, PaymentMethod, PlanStatus};
use crate::store;
use crate::utils::{fmt_money, id_arg, maybe_print_json, parse_date, parse_decimal, pretty_table, today};
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, TransactionBehavior};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Records one payment. The read-check-write runs in an IMMEDIATE transaction
/// so two writers cannot both apply against the same remaining balance.
pub fn record(
    conn: &mut Connection,
    sub: &clap::ArgMatches,
) -> Result<(PaymentInstallment, InstallmentStatus)> {
    let settings = Settings::load(conn)?;
    let plan_id = id_arg(sub, "plan")?;
    let raw_n = sub.get_one::<String>("installment").unwrap();
    let number = raw_n
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid installment number '{}'", raw_n))?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let method: PaymentMethod = sub.get_one::<String>("method").unwrap().parse()?;
    let reference = sub
        .get_one::<String>("reference")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let date = match sub.get_one::<String>("date") {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let plan = store::load_plan(&tx, plan_id)?;
    if plan.status != PlanStatus::Approved {
        return Err(anyhow!(
            "Plan {} is {}; payments are only accepted on approved plans",
            plan_id,
            plan.status
        ));
    }
    let mut ledger = store::load_ledger(&tx, plan_id)?;
    let updated = ledger
        .record_payment(number, amount, method, reference, date)?
        .clone();
    let record = ledger
        .payments()
        .last()
        .cloned()
        .context("payment was not recorded")?;
    store::save_payment(&tx, plan_id, &record, updated.paid_amount)?;
    tx.commit()?;

    let status = derive_status(
        updated.due_date,
        updated.paid_amount,
        updated.scheduled_amount,
        date,
    );
    log::info!(
        "plan {} installment {}: paid {} via {} -> {}",
        plan_id,
        number,
        amount,
        method,
        status
    );
    println!(
        "Recorded {} on installment #{} of plan {} ({}); remaining {}",
        fmt_money(&amount, &settings.currency),
        number,
        plan_id,
        status,
        fmt_money(&updated.remaining_amount().max(rust_decimal::Decimal::ZERO), &settings.currency)
    );
    Ok((updated, status))
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let plan_id = id_arg(sub, "plan")?;
    store::load_plan(conn, plan_id)?;
    let ledger = store::load_ledger(conn, plan_id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &ledger.payments())? {
        return Ok(());
    }
    let rows = ledger
        .payments()
        .iter()
        .map(|p| {
            vec![
                p.date.to_string(),
                p.payment_number.to_string(),
                fmt_money(&p.amount, &settings.currency),
                p.method.to_string(),
                p.reference.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Installment", "Amount", "Method", "Reference"], rows)
    );
    Ok(())
}
