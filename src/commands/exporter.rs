// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{id_arg, today};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("schedule", sub)) => export_schedule(conn, sub),
        Some(("payments", sub)) => export_payments(conn, sub),
        _ => Ok(()),
    }
}

fn format_arg(sub: &clap::ArgMatches) -> Result<String> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    match fmt.as_str() {
        "csv" | "json" => Ok(fmt),
        _ => Err(anyhow!("Unknown format: {} (use csv|json)", fmt)),
    }
}

fn export_schedule(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = format_arg(sub)?;
    let out = sub.get_one::<String>("out").unwrap();
    let plan_id = id_arg(sub, "plan")?;
    let plan = store::load_plan(conn, plan_id)?;
    let rows = store::load_ledger(conn, plan_id)?.rows(today());

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "payment_number",
                "due_date",
                "scheduled_amount",
                "paid_amount",
                "remaining_amount",
                "status",
            ])?;
            for r in &rows {
                wtr.write_record([
                    r.payment_number.to_string(),
                    r.due_date.to_string(),
                    format!("{:.2}", r.scheduled_amount),
                    format!("{:.2}", r.paid_amount),
                    format!("{:.2}", r.remaining_amount),
                    r.status.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            let items: Vec<_> = rows
                .iter()
                .map(|r| {
                    json!({
                        "payment_number": r.payment_number,
                        "due_date": r.due_date.to_string(),
                        "scheduled_amount": format!("{:.2}", r.scheduled_amount),
                        "paid_amount": format!("{:.2}", r.paid_amount),
                        "remaining_amount": format!("{:.2}", r.remaining_amount),
                        "status": r.status.as_str(),
                    })
                })
                .collect();
            let doc = json!({
                "plan_id": plan.id,
                "patient": plan.patient,
                "frequency": plan.frequency.as_str(),
                "installments": items,
            });
            std::fs::write(out, serde_json::to_string_pretty(&doc)?)?;
        }
    }
    println!("Exported schedule of plan {} to {}", plan_id, out);
    Ok(())
}

fn export_payments(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = format_arg(sub)?;
    let out = sub.get_one::<String>("out").unwrap();
    let plan_id = id_arg(sub, "plan")?;
    store::load_plan(conn, plan_id)?;
    let ledger = store::load_ledger(conn, plan_id)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["date", "payment_number", "amount", "method", "reference"])?;
            for p in ledger.payments() {
                wtr.write_record([
                    p.date.to_string(),
                    p.payment_number.to_string(),
                    p.amount.to_string(),
                    p.method.to_string(),
                    p.reference.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            std::fs::write(out, serde_json::to_string_pretty(ledger.payments())?)?;
        }
    }
    println!("Exported payments of plan {} to {}", plan_id, out);
    Ok(())
}
