// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Settings stored in the `settings` table.

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub const KEYS: [&str; 5] = [
    "currency",
    "locale",
    "tax_rate",
    "discrepancy_tolerance",
    "api_base_url",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Display only; amounts are never converted.
    pub currency: String,
    pub locale: String,
    /// Default budget tax, percent.
    pub tax_rate: Decimal,
    /// Cash discrepancies above this need closing notes.
    pub discrepancy_tolerance: Decimal,
    pub api_base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "MXN".to_string(),
            locale: "es-MX".to_string(),
            tax_rate: Decimal::from(16),
            discrepancy_tolerance: crate::engine::money::CENT,
            api_base_url: None,
        }
    }
}

impl Settings {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut s = Settings::default();
        if let Some(v) = get_setting(conn, "currency")? {
            s.currency = v;
        }
        if let Some(v) = get_setting(conn, "locale")? {
            s.locale = v;
        }
        if let Some(v) = get_setting(conn, "tax_rate")? {
            s.tax_rate = v
                .parse()
                .with_context(|| format!("Invalid tax_rate setting '{}'", v))?;
        }
        if let Some(v) = get_setting(conn, "discrepancy_tolerance")? {
            s.discrepancy_tolerance = v
                .parse()
                .with_context(|| format!("Invalid discrepancy_tolerance setting '{}'", v))?;
        }
        s.api_base_url = get_setting(conn, "api_base_url")?;
        Ok(s)
    }
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

/// Validates and stores a setting. Unknown keys are rejected.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let key = key.trim();
    let value = value.trim();
    match key {
        "currency" => {
            if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(anyhow!("Invalid currency code '{}'", value));
            }
        }
        "tax_rate" | "discrepancy_tolerance" => {
            let d = value
                .parse::<Decimal>()
                .with_context(|| format!("Invalid decimal '{}' for {}", value, key))?;
            if d < Decimal::ZERO {
                return Err(anyhow!("{} cannot be negative", key));
            }
        }
        "locale" | "api_base_url" => {
            if value.is_empty() {
                return Err(anyhow!("{} cannot be empty", key));
            }
        }
        other => {
            return Err(anyhow!(
                "Unknown setting '{}' (known: {})",
                other,
                KEYS.join(", ")
            ));
        }
    }
    let stored = if key == "currency" {
        value.to_uppercase()
    } else {
        value.to_string()
    };
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, stored],
    )?;
    Ok(())
}
