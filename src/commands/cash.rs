// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::engine::reconciliation::{
    CashSession, DenominationCount, Reconciliation, count_denominations, reconcile_with_tolerance,
};
use crate::models::MovementKind;
use crate::store;
use crate::utils::{fmt_money, id_arg, maybe_print_json, parse_date, parse_decimal, pretty_table, today};
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, TransactionBehavior};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("open", sub)) => {
            open(conn, sub)?;
        }
        Some(("income", sub)) => movement(conn, sub, MovementKind::Ingreso)?,
        Some(("expense", sub)) => movement(conn, sub, MovementKind::Egreso)?,
        Some(("count", sub)) => count(conn, sub)?,
        Some(("close", sub)) => {
            close(conn, sub)?;
        }
        Some(("annotate", sub)) => annotate(conn, sub)?,
        Some(("status", sub)) => status(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn date_arg(sub: &clap::ArgMatches) -> Result<chrono::NaiveDate> {
    match sub.get_one::<String>("date") {
        Some(raw) => parse_date(raw),
        None => Ok(today()),
    }
}

fn counts_arg(sub: &clap::ArgMatches) -> Result<DenominationCount> {
    let values: Vec<String> = sub
        .get_many::<String>("counts")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    Ok(DenominationCount::parse_args(&values)?)
}

fn current_session(conn: &Connection) -> Result<CashSession> {
    let id = store::open_session_id(conn)?
        .context("No open cash session (clinicfin cash open --opening <amount>)")?;
    store::load_session(conn, id)
}

pub fn open(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let opening = parse_decimal(sub.get_one::<String>("opening").unwrap())?;
    let date = date_arg(sub)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if let Some(id) = store::open_session_id(&tx)? {
        return Err(anyhow!("Cash session {} is still open", id));
    }
    let session = CashSession::open(0, date, opening)?;
    let id = store::insert_session(&tx, &session)?;
    tx.commit()?;
    log::info!("cash session {} opened with {}", id, opening);
    println!("Opened cash session {} with {}", id, opening);
    Ok(id)
}

fn movement(conn: &mut Connection, sub: &clap::ArgMatches, kind: MovementKind) -> Result<()> {
    let settings = Settings::load(conn)?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let category = sub.get_one::<String>("category").unwrap().trim().to_string();
    if category.is_empty() {
        return Err(anyhow!("Category is required"));
    }
    let description = sub
        .get_one::<String>("description")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    let date = date_arg(sub)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut session = current_session(&tx)?;
    session.apply_movement(kind, amount)?;
    store::insert_movement(&tx, session.id, date, kind, amount, &category, description)?;
    tx.commit()?;
    log::info!("session {}: {} {} ({})", session.id, kind.as_str(), amount, category);
    println!(
        "Recorded {} of {} in session {}; expected closing {}",
        kind.as_str(),
        fmt_money(&amount, &settings.currency),
        session.id,
        fmt_money(&session.expected_closing(), &settings.currency)
    );
    Ok(())
}

fn print_count(counts: &DenominationCount, rec: &Reconciliation, ccy: &str) {
    let rows = counts
        .lines()
        .into_iter()
        .map(|(d, q, sub)| vec![d.key(), q.to_string(), fmt_money(&sub, ccy)])
        .collect();
    println!("{}", pretty_table(&["Denomination", "Qty", "Subtotal"], rows));
    println!(
        "{}",
        pretty_table(
            &["", "Amount"],
            vec![
                vec!["Counted".into(), fmt_money(&rec.counted_total, ccy)],
                vec!["Expected".into(), fmt_money(&rec.expected_closing, ccy)],
                vec!["Difference".into(), fmt_money(&rec.difference, ccy)],
            ]
        )
    );
}

fn count(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let counts = counts_arg(sub)?;
    let session = current_session(conn)?;
    let rec = reconcile_with_tolerance(
        count_denominations(&counts),
        session.expected_closing(),
        settings.discrepancy_tolerance,
    );
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rec)? {
        print_count(&counts, &rec, &settings.currency);
    }
    Ok(())
}

/// Closes the open session with a physical count. A difference above the
/// configured tolerance needs `--notes`.
pub fn close(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<Reconciliation> {
    let settings = Settings::load(conn)?;
    let counts = counts_arg(sub)?;
    let notes = sub.get_one::<String>("notes").cloned();
    let date = date_arg(sub)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut session = current_session(&tx)?;
    let counted = count_denominations(&counts);
    let rec = session.close(counted, notes, date, settings.discrepancy_tolerance)?;
    if rec.requires_notes && session.notes.is_none() {
        return Err(anyhow!(
            "Difference of {} exceeds {}; closing notes are required (--notes)",
            rec.difference,
            settings.discrepancy_tolerance
        ));
    }
    store::save_closed_session(&tx, &session, &serde_json::to_string(&counts)?)?;
    tx.commit()?;

    if rec.requires_notes {
        log::warn!(
            "cash session {} closed with difference {}",
            session.id,
            rec.difference
        );
    } else {
        log::info!("cash session {} closed", session.id);
    }
    print_count(&counts, &rec, &settings.currency);
    println!("Closed cash session {}", session.id);
    Ok(rec)
}

fn annotate(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_arg(sub, "id")?;
    let notes = sub.get_one::<String>("notes").unwrap().trim().to_string();
    if notes.is_empty() {
        return Err(anyhow!("Notes cannot be empty"));
    }
    let mut session = store::load_session(conn, id)?;
    session.annotate(notes);
    store::save_session_notes(conn, &session)?;
    println!("Updated notes for cash session {}", id);
    Ok(())
}

fn session_row(s: &CashSession, ccy: &str) -> Vec<String> {
    let opt = |d: Option<rust_decimal::Decimal>| d.map(|v| fmt_money(&v, ccy)).unwrap_or_default();
    vec![
        s.id.to_string(),
        s.opened_on.to_string(),
        s.closed_on.map(|d| d.to_string()).unwrap_or_default(),
        s.status.as_str().to_string(),
        fmt_money(&s.opening_balance, ccy),
        fmt_money(&s.total_income, ccy),
        fmt_money(&s.total_expense, ccy),
        fmt_money(&s.expected_closing(), ccy),
        opt(s.actual_closing),
        opt(s.difference),
    ]
}

const SESSION_HEADERS: [&str; 10] = [
    "ID", "Opened", "Closed", "Status", "Opening", "Income", "Expense", "Expected", "Counted",
    "Difference",
];

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let session = current_session(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &session)? {
        println!(
            "{}",
            pretty_table(&SESSION_HEADERS, vec![session_row(&session, &settings.currency)])
        );
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let sessions = store::list_sessions(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &sessions)? {
        let rows = sessions
            .iter()
            .map(|s| session_row(s, &settings.currency))
            .collect();
        println!("{}", pretty_table(&SESSION_HEADERS, rows));
    }
    Ok(())
}
