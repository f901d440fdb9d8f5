// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn as_of(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("as_of")
            .long("as-of")
            .help("Evaluate statuses on this date (YYYY-MM-DD), default today"),
    )
}

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn plan_terms(cmd: Command, total_required: bool) -> Command {
    cmd.arg(
        Arg::new("total")
            .long("total")
            .required(total_required)
            .help("Total amount"),
    )
    .arg(
        Arg::new("down")
            .long("down")
            .default_value("0")
            .help("Down payment"),
    )
    .arg(
        Arg::new("payments")
            .long("payments")
            .required(true)
            .help("Number of installments"),
    )
    .arg(
        Arg::new("frequency")
            .long("frequency")
            .default_value("monthly")
            .help("weekly|biweekly|monthly"),
    )
    .arg(
        Arg::new("rate")
            .long("rate")
            .default_value("0")
            .help("Annual interest rate, percent"),
    )
    .arg(
        Arg::new("first_date")
            .long("first-date")
            .required(true)
            .help("First payment date YYYY-MM-DD"),
    )
}

fn counts_arg() -> Arg {
    Arg::new("counts")
        .num_args(0..)
        .action(ArgAction::Append)
        .help("Denomination counts, e.g. bills_100=5 coins_0.5=4")
}

pub fn build_cli() -> Command {
    Command::new("clinicfin")
        .version(crate_version!())
        .about("Financing plans, payments, cash sessions and budgets for a dental clinic")
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("budget")
                .about("Quotes for treatments")
                .subcommand(
                    Command::new("create")
                        .arg(Arg::new("patient").long("patient").required(true))
                        .arg(
                            Arg::new("items")
                                .long("items")
                                .required(true)
                                .help("CSV: description,quantity,unit_price,discount_percent"),
                        )
                        .arg(Arg::new("tax_rate").long("tax-rate").help("Tax percent")),
                )
                .subcommand(json_flags(
                    Command::new("totals")
                        .about("Compute totals without saving")
                        .arg(Arg::new("items").long("items").required(true))
                        .arg(Arg::new("tax_rate").long("tax-rate")),
                ))
                .subcommand(json_flags(Command::new("list")))
                .subcommand(json_flags(
                    Command::new("show").arg(id_arg("id", "Budget id")),
                ))
                .subcommand(Command::new("approve").arg(id_arg("id", "Budget id")))
                .subcommand(Command::new("reject").arg(id_arg("id", "Budget id")))
                .subcommand(
                    Command::new("pull")
                        .about("Fetch a budget from the Budgets API and store it")
                        .arg(id_arg("id", "Remote budget id")),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Financing plans")
                .subcommand(json_flags(plan_terms(
                    Command::new("preview").about("Show a schedule without saving"),
                    true,
                )))
                .subcommand(
                    plan_terms(Command::new("create"), false)
                        .arg(Arg::new("patient").long("patient"))
                        .arg(
                            Arg::new("budget")
                                .long("budget")
                                .help("Finance an approved budget; total is taken from it"),
                        ),
                )
                .subcommand(json_flags(as_of(Command::new("list"))))
                .subcommand(json_flags(as_of(
                    Command::new("show").arg(id_arg("id", "Plan id")),
                )))
                .subcommand(Command::new("approve").arg(id_arg("id", "Plan id")))
                .subcommand(Command::new("reject").arg(id_arg("id", "Plan id")))
                .subcommand(Command::new("cancel").arg(id_arg("id", "Plan id"))),
        )
        .subcommand(
            Command::new("pay")
                .about("Record a payment against an installment")
                .arg(id_arg("plan", "Plan id"))
                .arg(id_arg("installment", "Installment number"))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("method")
                        .long("method")
                        .default_value("efectivo")
                        .help("efectivo|tarjeta|transferencia|cheque"),
                )
                .arg(Arg::new("reference").long("reference"))
                .arg(Arg::new("date").long("date").help("Payment date, default today")),
        )
        .subcommand(
            Command::new("payments")
                .about("Payment history")
                .subcommand(json_flags(
                    Command::new("list").arg(id_arg("plan", "Plan id")),
                )),
        )
        .subcommand(
            Command::new("cash")
                .about("Cash-register sessions")
                .subcommand(
                    Command::new("open")
                        .arg(Arg::new("opening").long("opening").required(true))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("income")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("expense")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(json_flags(
                    Command::new("count")
                        .about("Count a drawer against the open session")
                        .arg(counts_arg()),
                ))
                .subcommand(
                    Command::new("close")
                        .arg(counts_arg())
                        .arg(Arg::new("notes").long("notes"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("annotate")
                        .arg(id_arg("id", "Session id"))
                        .arg(Arg::new("notes").long("notes").required(true)),
                )
                .subcommand(json_flags(Command::new("status")))
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("report")
                .about("Reports")
                .subcommand(json_flags(as_of(Command::new("financing"))))
                .subcommand(json_flags(as_of(Command::new("overdue"))))
                .subcommand(json_flags(
                    Command::new("cash").arg(Arg::new("month").long("month").required(true)),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("schedule")
                        .arg(id_arg("plan", "Plan id"))
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("payments")
                        .arg(id_arg("plan", "Plan id"))
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Check stored data for inconsistencies"))
}
