// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use env_logger::Env;

use clinicfin::{cli, commands, db};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&mut conn, sub)?,
        Some(("plan", sub)) => commands::plans::handle(&mut conn, sub)?,
        Some(("pay", sub)) => {
            commands::payments::record(&mut conn, sub)?;
        }
        Some(("payments", sub)) => commands::payments::handle(&conn, sub)?,
        Some(("cash", sub)) => commands::cash::handle(&mut conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
