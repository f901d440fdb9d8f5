// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::engine::totals::{BudgetTotals, compute_totals, line_total};
use crate::models::{BudgetItem, BudgetStatus};
use crate::store;
use crate::utils::{
    fmt_money, http_client, id_arg, maybe_print_json, parse_decimal, pretty_table, today,
};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Deserialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(conn, sub)?,
        Some(("totals", sub)) => totals(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("approve", sub)) => transition(conn, sub, BudgetStatus::Approved)?,
        Some(("reject", sub)) => transition(conn, sub, BudgetStatus::Rejected)?,
        Some(("pull", sub)) => pull(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Reads `description,quantity,unit_price[,discount_percent]` rows.
pub fn read_items_csv(path: &str) -> Result<Vec<BudgetItem>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;
    let mut items = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let rec = result?;
        let description = rec
            .get(0)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("description missing on row {}", line + 1))?
            .to_string();
        let quantity = parse_decimal(rec.get(1).context("quantity missing")?)
            .with_context(|| format!("Invalid quantity for '{}'", description))?;
        let unit_price = parse_decimal(rec.get(2).context("unit_price missing")?)
            .with_context(|| format!("Invalid unit price for '{}'", description))?;
        let discount_percent = match rec.get(3).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => parse_decimal(raw)
                .with_context(|| format!("Invalid discount for '{}'", description))?,
            None => Decimal::ZERO,
        };
        items.push(BudgetItem {
            description,
            quantity,
            unit_price,
            discount_percent,
        });
    }
    Ok(items)
}

fn tax_rate_arg(sub: &clap::ArgMatches, settings: &Settings) -> Result<Decimal> {
    match sub.get_one::<String>("tax_rate") {
        Some(raw) => parse_decimal(raw),
        None => Ok(settings.tax_rate),
    }
}

fn totals_rows(totals: &BudgetTotals, ccy: &str) -> Vec<Vec<String>> {
    vec![
        vec!["Subtotal".into(), fmt_money(&totals.subtotal, ccy)],
        vec!["Discounts".into(), fmt_money(&totals.discount_total, ccy)],
        vec!["Tax".into(), fmt_money(&totals.tax_amount, ccy)],
        vec!["Total".into(), fmt_money(&totals.total, ccy)],
    ]
}

fn item_rows(items: &[BudgetItem], ccy: &str) -> Result<Vec<Vec<String>>> {
    items
        .iter()
        .map(|i| -> Result<Vec<String>> {
            let line = line_total(i)?;
            Ok(vec![
                i.description.clone(),
                i.quantity.normalize().to_string(),
                fmt_money(&i.unit_price, ccy),
                format!("{}%", i.discount_percent.normalize()),
                fmt_money(&line.line_total, ccy),
            ])
        })
        .collect()
}

fn create(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let patient = sub.get_one::<String>("patient").unwrap().trim().to_string();
    if patient.is_empty() {
        return Err(anyhow!("Patient name is required"));
    }
    let items = read_items_csv(sub.get_one::<String>("items").unwrap().trim())?;
    if items.is_empty() {
        return Err(anyhow!("A budget needs at least one item"));
    }
    let tax_rate = tax_rate_arg(sub, &settings)?;
    let totals = compute_totals(&items, tax_rate)?;

    let tx = conn.transaction()?;
    let id = store::insert_budget(&tx, &patient, today(), tax_rate, &items, &totals, None)?;
    tx.commit()?;
    log::info!("budget {} created for {}", id, patient);
    println!(
        "Budget {} for {}: total {}",
        id,
        patient,
        fmt_money(&totals.total, &settings.currency)
    );
    Ok(())
}

fn totals(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let items = read_items_csv(sub.get_one::<String>("items").unwrap().trim())?;
    let tax_rate = tax_rate_arg(sub, &settings)?;
    let totals = compute_totals(&items, tax_rate)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &totals)? {
        println!(
            "{}",
            pretty_table(
                &["Item", "Qty", "Unit price", "Discount", "Total"],
                item_rows(&items, &settings.currency)?
            )
        );
        println!(
            "{}",
            pretty_table(&["", "Amount"], totals_rows(&totals, &settings.currency))
        );
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, created_on, patient, total, status FROM budgets ORDER BY id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, d, p, total, status) = row?;
        data.push(vec![id.to_string(), d, p, total, status]);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(&["ID", "Date", "Patient", "Total", "Status"], data)
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let budget = store::load_budget(conn, id_arg(sub, "id")?)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budget)? {
        println!(
            "Budget {} | {} | {} | {}",
            budget.id,
            budget.patient,
            budget.created_on,
            budget.status.as_str()
        );
        println!(
            "{}",
            pretty_table(
                &["Item", "Qty", "Unit price", "Discount", "Total"],
                item_rows(&budget.items, &settings.currency)?
            )
        );
        println!(
            "{}",
            pretty_table(&["", "Amount"], totals_rows(&budget.totals, &settings.currency))
        );
    }
    Ok(())
}

fn transition(conn: &Connection, sub: &clap::ArgMatches, to: BudgetStatus) -> Result<()> {
    let id = id_arg(sub, "id")?;
    let budget = store::load_budget(conn, id)?;
    let next = budget.status.transition(to)?;
    store::set_budget_status(conn, id, next)?;
    log::info!("budget {} -> {}", id, next.as_str());
    println!("Budget {} is now {}", id, next.as_str());
    Ok(())
}

/// Budget as served by `GET /api/budgets/{id}`.
#[derive(Debug, Deserialize)]
pub struct RemoteBudget {
    pub patient: String,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    pub items: Vec<BudgetItem>,
}

pub fn fetch_remote_budget(base_url: &str, id: i64) -> Result<RemoteBudget> {
    let url = format!("{}/api/budgets/{}", base_url.trim_end_matches('/'), id);
    log::debug!("GET {}", url);
    let client = http_client()?;
    let resp = client.get(&url).send()?.error_for_status()?;
    let remote: RemoteBudget = resp
        .json()
        .with_context(|| format!("Invalid budget payload from {}", url))?;
    Ok(remote)
}

/// Recomputes the totals of a fetched budget and stores it. A budget that was
/// already pulled is not stored twice.
pub fn store_remote_budget(
    conn: &mut Connection,
    remote_id: i64,
    remote: &RemoteBudget,
    settings: &Settings,
) -> Result<i64> {
    let external_id = remote_id.to_string();
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM budgets WHERE external_id=?1",
            params![external_id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Err(anyhow!(
            "Remote budget {} was already pulled as budget {}",
            remote_id,
            id
        ));
    }
    let tax_rate = remote.tax_rate.unwrap_or(settings.tax_rate);
    let totals = compute_totals(&remote.items, tax_rate)?;
    let tx = conn.transaction()?;
    let id = store::insert_budget(
        &tx,
        remote.patient.trim(),
        today(),
        tax_rate,
        &remote.items,
        &totals,
        Some(&external_id),
    )?;
    tx.commit()?;
    Ok(id)
}

fn pull(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let base = settings
        .api_base_url
        .clone()
        .context("api_base_url is not set (clinicfin config set api_base_url <url>)")?;
    let remote_id = id_arg(sub, "id")?;
    let remote = fetch_remote_budget(&base, remote_id)?;
    let id = store_remote_budget(conn, remote_id, &remote, &settings)?;
    log::info!("remote budget {} stored as {}", remote_id, id);
    println!("Pulled remote budget {} as budget {}", remote_id, id);
    Ok(())
}
