// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use clinicfin::commands::{doctor, payments, plans, reports};
use clinicfin::engine::totals::compute_totals;
use clinicfin::models::{BudgetItem, BudgetStatus, InstallmentStatus, MovementKind, PlanStatus};
use clinicfin::{cli, db, store};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn run_plan(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["clinicfin", "plan"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("plan", plan_m)) = matches.subcommand() {
        plans::handle(conn, plan_m)
    } else {
        panic!("no plan subcommand");
    }
}

fn run_pay(
    conn: &mut Connection,
    args: &[&str],
) -> anyhow::Result<(clinicfin::models::PaymentInstallment, InstallmentStatus)> {
    let mut argv = vec!["clinicfin", "pay"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("pay", pay_m)) = matches.subcommand() {
        payments::record(conn, pay_m)
    } else {
        panic!("no pay subcommand");
    }
}

/// 10000 over 6 monthly payments at 5%, first due 2099-01-15.
fn approved_plan(conn: &mut Connection) -> i64 {
    run_plan(
        conn,
        &[
            "create",
            "--patient",
            "Ana Torres",
            "--total",
            "10000",
            "--payments",
            "6",
            "--rate",
            "5",
            "--first-date",
            "2099-01-15",
        ],
    )
    .unwrap();
    let id = store::list_plans(conn).unwrap().last().unwrap().id;
    run_plan(conn, &["approve", "--id", &id.to_string()]).unwrap();
    id
}

#[test]
fn create_stores_plan_and_schedule() {
    let mut conn = setup();
    run_plan(
        &mut conn,
        &[
            "create",
            "--patient",
            "Ana Torres",
            "--total",
            "12000",
            "--down",
            "2000",
            "--payments",
            "10",
            "--first-date",
            "2099-03-01",
        ],
    )
    .unwrap();
    let plan = store::load_plan(&conn, 1).unwrap();
    assert_eq!(plan.status, PlanStatus::Pending);
    assert_eq!(plan.financed_amount(), d("10000"));
    assert_eq!(plan.payment_amount, d("1000"));
    assert_eq!(plan.total_interest, Decimal::ZERO);
    assert_eq!(plan.final_date, day("2099-12-01"));
    let ledger = store::load_ledger(&conn, 1).unwrap();
    assert_eq!(ledger.installments().len(), 10);
}

#[test]
fn create_rejects_bad_terms_and_past_dates() {
    let mut conn = setup();
    let base = ["create", "--patient", "Ana Torres", "--payments", "6"];
    let mut down_too_big = base.to_vec();
    down_too_big.extend(["--total", "1000", "--down", "1000", "--first-date", "2099-01-01"]);
    assert!(run_plan(&mut conn, &down_too_big).is_err());

    let mut past = base.to_vec();
    past.extend(["--total", "1000", "--first-date", "2000-01-01"]);
    assert!(run_plan(&mut conn, &past).is_err());

    let mut no_total = base.to_vec();
    no_total.extend(["--first-date", "2099-01-01"]);
    assert!(run_plan(&mut conn, &no_total).is_err());

    assert!(store::list_plans(&conn).unwrap().is_empty());
}

#[test]
fn plan_from_approved_budget_uses_budget_total() {
    let mut conn = setup();
    let items = vec![BudgetItem {
        description: "Implante".into(),
        quantity: d("1"),
        unit_price: d("1200"),
        discount_percent: Decimal::ZERO,
    }];
    let totals = compute_totals(&items, d("16")).unwrap();
    let budget_id =
        store::insert_budget(&conn, "Luis Rey", day("2025-01-01"), d("16"), &items, &totals, None)
            .unwrap();

    let args = [
        "create",
        "--budget",
        "1",
        "--down",
        "392",
        "--payments",
        "4",
        "--first-date",
        "2099-01-15",
    ];
    // still pending
    assert!(run_plan(&mut conn, &args).is_err());

    store::set_budget_status(&conn, budget_id, BudgetStatus::Approved).unwrap();
    run_plan(&mut conn, &args).unwrap();
    let plan = store::load_plan(&conn, 1).unwrap();
    assert_eq!(plan.budget_id, Some(budget_id));
    assert_eq!(plan.patient, "Luis Rey");
    assert_eq!(plan.total_amount, d("1392"));
    assert_eq!(plan.payment_amount, d("250"));
}

#[test]
fn plan_status_transitions() {
    let mut conn = setup();
    let id = approved_plan(&mut conn).to_string();
    assert!(run_plan(&mut conn, &["reject", "--id", &id]).is_err());
    run_plan(&mut conn, &["cancel", "--id", &id]).unwrap();
    assert_eq!(store::load_plan(&conn, 1).unwrap().status, PlanStatus::Cancelled);
    assert!(run_plan(&mut conn, &["approve", "--id", &id]).is_err());
}

#[test]
fn payments_require_an_approved_plan() {
    let mut conn = setup();
    run_plan(
        &mut conn,
        &[
            "create",
            "--patient",
            "Ana Torres",
            "--total",
            "900",
            "--payments",
            "3",
            "--first-date",
            "2099-01-15",
        ],
    )
    .unwrap();
    assert!(
        run_pay(&mut conn, &["--plan", "1", "--installment", "1", "--amount", "300"]).is_err()
    );
}

#[test]
fn pay_settles_and_rejects_overpayment() {
    let mut conn = setup();
    let id = approved_plan(&mut conn);
    let plan = id.to_string();

    let (inst, status) = run_pay(
        &mut conn,
        &[
            "--plan",
            &plan,
            "--installment",
            "1",
            "--amount",
            "1691.06",
            "--method",
            "tarjeta",
            "--reference",
            "AUTH-991",
            "--date",
            "2099-01-10",
        ],
    )
    .unwrap();
    assert_eq!(status, InstallmentStatus::Paid);
    assert_eq!(inst.paid_amount, d("1691.06"));

    let (_, status) = run_pay(
        &mut conn,
        &["--plan", &plan, "--installment", "2", "--amount", "600", "--date", "2099-01-20"],
    )
    .unwrap();
    assert_eq!(status, InstallmentStatus::Partial);

    let err = run_pay(
        &mut conn,
        &["--plan", &plan, "--installment", "2", "--amount", "1091.07"],
    );
    assert!(err.is_err());

    let ledger = store::load_ledger(&conn, id).unwrap();
    assert_eq!(ledger.payments().len(), 2);
    assert_eq!(ledger.installment(2).unwrap().paid_amount, d("600"));
    assert_eq!(ledger.payments()[0].reference.as_deref(), Some("AUTH-991"));

    assert!(
        run_pay(&mut conn, &["--plan", &plan, "--installment", "9", "--amount", "10"]).is_err()
    );
}

#[test]
fn financing_and_overdue_reports() {
    let mut conn = setup();
    let id = approved_plan(&mut conn);
    run_pay(
        &mut conn,
        &[
            "--plan",
            &id.to_string(),
            "--installment",
            "1",
            "--amount",
            "1691.06",
            "--date",
            "2099-01-15",
        ],
    )
    .unwrap();

    let report = reports::financing_report(&conn, day("2099-03-20")).unwrap();
    assert_eq!(report.plans.len(), 1);
    assert_eq!(report.total_financed, d("10000"));
    assert_eq!(report.total_paid, d("1691.06"));
    assert_eq!(report.overdue_payments, 2);
    assert_eq!(report.plans[0].stats.progress, 17);

    let overdue = reports::overdue_rows(&conn, day("2099-03-20")).unwrap();
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].payment_number, 2);
    assert_eq!(overdue[0].due_date, day("2099-02-15"));
    assert_eq!(overdue[0].days_late, 33);
    assert_eq!(overdue[1].payment_number, 3);
}

#[test]
fn cash_report_groups_by_category() {
    let conn = setup();
    conn.execute(
        "INSERT INTO cash_sessions(opened_on, opening_balance) VALUES ('2025-03-01','500')",
        [],
    )
    .unwrap();
    let date = day("2025-03-03");
    store::insert_movement(&conn, 1, date, MovementKind::Ingreso, d("800"), "consulta", None).unwrap();
    store::insert_movement(&conn, 1, date, MovementKind::Ingreso, d("200"), "consulta", None).unwrap();
    store::insert_movement(&conn, 1, date, MovementKind::Egreso, d("150"), "insumos", Some("guantes"))
        .unwrap();
    store::insert_movement(&conn, 1, day("2025-04-01"), MovementKind::Egreso, d("99"), "insumos", None)
        .unwrap();

    let report = reports::cash_report(&conn, "2025-03").unwrap();
    assert_eq!(report.total_income, d("1000"));
    assert_eq!(report.total_expense, d("150"));
    assert_eq!(report.net, d("850"));
    assert_eq!(report.by_category["consulta"].income, d("1000"));
    assert_eq!(report.by_category["insumos"].expense, d("150"));
    assert!(reports::cash_report(&conn, "2025-13").is_err());
}

#[test]
fn doctor_flags_inconsistent_data() {
    let mut conn = setup();
    let id = approved_plan(&mut conn);
    assert!(doctor::diagnose(&conn).unwrap().is_empty());

    conn.execute(
        "UPDATE installments SET paid_amount='5000' WHERE plan_id=?1 AND payment_number=1",
        params![id],
    )
    .unwrap();
    conn.execute(
        "DELETE FROM installments WHERE plan_id=?1 AND payment_number=6",
        params![id],
    )
    .unwrap();
    conn.execute_batch(
        "INSERT INTO cash_sessions(opened_on, opening_balance) VALUES ('2025-03-01','0');
         INSERT INTO cash_sessions(opened_on, opening_balance) VALUES ('2025-03-02','0');
         INSERT INTO cash_sessions(opened_on, closed_on, opening_balance, actual_closing, difference, status)
             VALUES ('2025-02-28','2025-02-28','0','10','10','CERRADA');",
    )
    .unwrap();

    let issues: Vec<String> = doctor::diagnose(&conn)
        .unwrap()
        .into_iter()
        .map(|(issue, _)| issue)
        .collect();
    assert!(issues.contains(&"installment_count".to_string()));
    assert!(issues.contains(&"overpaid_installment".to_string()));
    assert!(issues.contains(&"multiple_open_sessions".to_string()));
    assert!(issues.contains(&"unexplained_difference".to_string()));
}
