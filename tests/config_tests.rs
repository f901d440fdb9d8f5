// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clinicfin::config::{Settings, get_setting, set_setting};
use clinicfin::engine::money::CENT;
use clinicfin::{cli, commands::config, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[test]
fn defaults_without_stored_settings() {
    let conn = setup();
    let s = Settings::load(&conn).unwrap();
    assert_eq!(s.currency, "MXN");
    assert_eq!(s.locale, "es-MX");
    assert_eq!(s.tax_rate, Decimal::from(16));
    assert_eq!(s.discrepancy_tolerance, CENT);
    assert_eq!(s.api_base_url, None);
}

#[test]
fn set_and_load_settings() {
    let conn = setup();
    set_setting(&conn, "currency", "usd").unwrap();
    set_setting(&conn, "tax_rate", " 8.5 ").unwrap();
    set_setting(&conn, "discrepancy_tolerance", "1").unwrap();
    set_setting(&conn, "api_base_url", "http://localhost:3000").unwrap();

    assert_eq!(get_setting(&conn, "currency").unwrap().as_deref(), Some("USD"));
    let s = Settings::load(&conn).unwrap();
    assert_eq!(s.currency, "USD");
    assert_eq!(s.tax_rate, Decimal::from_str("8.5").unwrap());
    assert_eq!(s.discrepancy_tolerance, Decimal::ONE);
    assert_eq!(s.api_base_url.as_deref(), Some("http://localhost:3000"));
}

#[test]
fn invalid_settings_are_rejected() {
    let conn = setup();
    assert!(set_setting(&conn, "currency", "pesos").is_err());
    assert!(set_setting(&conn, "tax_rate", "-1").is_err());
    assert!(set_setting(&conn, "discrepancy_tolerance", "abc").is_err());
    assert!(set_setting(&conn, "base_currency", "USD").is_err());
    assert_eq!(get_setting(&conn, "currency").unwrap(), None);
}

#[test]
fn config_set_via_cli() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from(["clinicfin", "config", "set", "locale", "en-US"]);
    if let Some(("config", config_m)) = matches.subcommand() {
        config::handle(&conn, config_m).unwrap();
    } else {
        panic!("no config subcommand");
    }
    assert_eq!(Settings::load(&conn).unwrap().locale, "en-US");

    let matches = cli::build_cli().get_matches_from(["clinicfin", "config", "get", "nope"]);
    if let Some(("config", config_m)) = matches.subcommand() {
        assert!(config::handle(&conn, config_m).is_err());
    } else {
        panic!("no config subcommand");
    }
}
