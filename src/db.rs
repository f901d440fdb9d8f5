// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Clinicfin", "clinicfin"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("clinicfin.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    log::debug!("database ready at {}", path.display());
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient TEXT NOT NULL,
        created_on TEXT NOT NULL,
        tax_rate TEXT NOT NULL,
        subtotal TEXT NOT NULL,
        discount_total TEXT NOT NULL,
        tax_amount TEXT NOT NULL,
        total TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDIENTE'
            CHECK(status IN ('PENDIENTE','APROBADO','RECHAZADO')),
        external_id TEXT
    );

    CREATE TABLE IF NOT EXISTS budget_items(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        description TEXT NOT NULL,
        quantity TEXT NOT NULL,
        unit_price TEXT NOT NULL,
        discount_percent TEXT NOT NULL DEFAULT '0',
        line_total TEXT NOT NULL,
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS financing_plans(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER,
        patient TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        down_payment TEXT NOT NULL,
        number_of_payments INTEGER NOT NULL CHECK(number_of_payments >= 1),
        frequency TEXT NOT NULL CHECK(frequency IN ('weekly','biweekly','monthly')),
        interest_rate TEXT NOT NULL,
        first_payment_date TEXT NOT NULL,
        payment_amount TEXT NOT NULL,
        total_interest TEXT NOT NULL,
        final_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDIENTE'
            CHECK(status IN ('PENDIENTE','APROBADO','RECHAZADO','CANCELADO')),
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS installments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        plan_id INTEGER NOT NULL,
        payment_number INTEGER NOT NULL,
        due_date TEXT NOT NULL,
        scheduled_amount TEXT NOT NULL,
        paid_amount TEXT NOT NULL DEFAULT '0',
        UNIQUE(plan_id, payment_number),
        FOREIGN KEY(plan_id) REFERENCES financing_plans(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_installments_due ON installments(due_date);

    CREATE TABLE IF NOT EXISTS payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        plan_id INTEGER NOT NULL,
        payment_number INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        method TEXT NOT NULL
            CHECK(method IN ('efectivo','tarjeta','transferencia','cheque')),
        reference TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(plan_id) REFERENCES financing_plans(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS cash_sessions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        opened_on TEXT NOT NULL,
        closed_on TEXT,
        opening_balance TEXT NOT NULL,
        actual_closing TEXT,
        difference TEXT,
        counts TEXT,
        status TEXT NOT NULL DEFAULT 'ABIERTA' CHECK(status IN ('ABIERTA','CERRADA')),
        notes TEXT
    );

    CREATE TABLE IF NOT EXISTS cash_movements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('ingreso','egreso')),
        amount TEXT NOT NULL,
        category TEXT NOT NULL,
        description TEXT,
        FOREIGN KEY(session_id) REFERENCES cash_sessions(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_cash_movements_date ON cash_movements(date);
    "#,
    )?;
    Ok(())
}
