// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{KEYS, Settings, set_setting};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            set_setting(conn, key, value)?;
            log::info!("setting {} updated", key.trim());
            println!("{} = {}", key.trim(), value.trim());
        }
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            if !KEYS.contains(&key) {
                return Err(anyhow!("Unknown setting '{}'", key));
            }
            let settings = Settings::load(conn)?;
            println!("{}", effective_value(&settings, key));
        }
        Some(("list", sub)) => {
            let settings = Settings::load(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &settings)? {
                let rows = KEYS
                    .iter()
                    .map(|k| vec![k.to_string(), effective_value(&settings, k)])
                    .collect();
                println!("{}", pretty_table(&["Key", "Value"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

fn effective_value(s: &Settings, key: &str) -> String {
    match key {
        "currency" => s.currency.clone(),
        "locale" => s.locale.clone(),
        "tax_rate" => s.tax_rate.to_string(),
        "discrepancy_tolerance" => s.discrepancy_tolerance.to_string(),
        "api_base_url" => s.api_base_url.clone().unwrap_or_default(),
        _ => String::new(),
    }
}
