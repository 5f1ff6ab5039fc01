//! Integration tests for cuotas-core
//!
//! These tests exercise the register → card → expense → installments →
//! summaries workflow against a file-backed database.

use std::str::FromStr;

use chrono::NaiveDate;
use cuotas_core::{
    db::Database,
    models::{
        ChartFilter, ExpenseUpdate, NewBank, NewCreditCard, NewExpense, NewUser,
        PendingInstallmentsReport,
    },
    Error,
};
use rust_decimal::Decimal;
use tempfile::TempDir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn open(dir: &TempDir) -> Database {
    let path = dir.path().join("cuotas.db");
    Database::new(path.to_str().unwrap()).expect("Failed to open database")
}

#[test]
fn test_full_installment_workflow() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.seed_default_categories().unwrap();

    let user = db
        .create_user(&NewUser {
            name: "Lucía".into(),
            email: "lucia@example.com".into(),
            password: "hunter22".into(),
        })
        .unwrap();
    let bank = db
        .create_bank(
            user.id,
            &NewBank {
                name: "Santander".into(),
                country: Some("AR".into()),
            },
        )
        .unwrap();
    let card = db
        .create_credit_card(
            user.id,
            &NewCreditCard {
                bank_id: bank.id,
                name: "Visa Platinum".into(),
                number: "4111111111111111".into(),
                credit_limit: dec("500000"),
                closing_day: 28,
                due_day: 10,
            },
        )
        .unwrap();
    let category = db
        .list_categories(user.id)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Hogar")
        .unwrap();

    let expense_id = db
        .create_expense(
            user.id,
            &NewExpense {
                amount: dec("1500.75"),
                date: d(2025, 4, 14),
                description: Some("Heladera".into()),
                category_id: category.id,
                credit_card_id: Some(card.id),
                debit_card_id: None,
                installments: Some(3),
            },
        )
        .unwrap();

    // Three equal installments, one month apart
    let installments = db.list_installments_for_expense(user.id, expense_id).unwrap();
    assert_eq!(installments.len(), 3);
    assert!(installments.iter().all(|c| c.amount == dec("500.25")));

    // The annual summary reflects the schedule
    let annual = db.annual_card_summary(user.id, 2025).unwrap();
    assert_eq!(annual.cards.len(), 1);
    assert_eq!(annual.cards[0].months[3].total, dec("500.25"));
    assert_eq!(annual.cards[0].months[5].total, dec("500.25"));
    assert_eq!(annual.grand_total, dec("1500.75"));

    // Re-plan to two installments
    assert!(db
        .update_expense(
            user.id,
            expense_id,
            &ExpenseUpdate {
                installments: Some(2),
                ..Default::default()
            },
        )
        .unwrap());

    let annual = db.annual_card_summary(user.id, 2025).unwrap();
    assert_eq!(annual.cards[0].months[3].total, dec("750.38"));
    assert_eq!(annual.cards[0].months[4].total, dec("750.38"));
    assert_eq!(annual.cards[0].months[5].total, Decimal::ZERO);
    assert_eq!(annual.grand_total, dec("1500.76"));

    // As of April, the May installment is pending
    let pending: PendingInstallmentsReport = db
        .pending_future_installments(user.id, card.id, d(2025, 4, 30))
        .unwrap();
    assert_eq!(pending.expenses.len(), 1);
    assert_eq!(pending.expenses[0].pending_count, 1);
    assert_eq!(pending.grand_total, dec("750.38"));

    // Charts see the same numbers
    let monthly = db
        .monthly_totals(
            user.id,
            &ChartFilter {
                year: 2025,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(monthly[3], dec("750.38"));

    // Deleting removes it from every report
    db.delete_expense(user.id, expense_id).unwrap();
    let general = db.general_annual_summary(user.id, 2025).unwrap();
    assert_eq!(general.annual_total, Decimal::ZERO);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let user_id = {
        let db = open(&dir);
        db.create_user(&NewUser {
            name: "Pablo".into(),
            email: "pablo@example.com".into(),
            password: "hunter22".into(),
        })
        .unwrap()
        .id
    };

    // Reopening runs the migrations again without touching data
    let db = open(&dir);
    let user = db.verify_credentials("pablo@example.com", "hunter22").unwrap();
    assert_eq!(user.id, user_id);
}

#[test]
fn test_users_are_isolated() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    let alice = db
        .create_user(&NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "hunter22".into(),
        })
        .unwrap();
    let bob = db
        .create_user(&NewUser {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            password: "hunter22".into(),
        })
        .unwrap();

    let bank = db.create_global_bank("BBVA", Some("AR")).unwrap();
    let card = db
        .create_credit_card(
            alice.id,
            &NewCreditCard {
                bank_id: bank.id,
                name: "Master".into(),
                number: "5500000000000004".into(),
                credit_limit: dec("1000"),
                closing_day: 1,
                due_day: 15,
            },
        )
        .unwrap();

    assert!(matches!(
        db.get_credit_card(bob.id, card.id),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        db.delete_credit_card(bob.id, card.id),
        Err(Error::NotFound(_))
    ));

    let report = db
        .pending_future_installments(bob.id, card.id, d(2025, 1, 1))
        .unwrap();
    assert!(report.expenses.is_empty());
    assert_eq!(report.grand_total, Decimal::ZERO);
}
