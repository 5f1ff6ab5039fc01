//! Report command implementations

use anyhow::Result;
use chrono::{Datelike, Utc};
use cuotas_core::db::Database;
use cuotas_core::MONTH_NAMES;

use super::resolve_user;

/// Truncate a string to `max_len` characters, appending "..." when cut
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn cmd_report_month(db: &Database, email: &str, json: bool) -> Result<()> {
    let user = resolve_user(db, email)?;
    let today = Utc::now().date_naive();
    let totals = db.monthly_card_totals(user.id, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    println!();
    println!(
        "📅 Installments due in {} {}",
        MONTH_NAMES[today.month0() as usize],
        today.year()
    );
    println!("   ───────────────────────────────────────────");

    if totals.is_empty() {
        println!("   No cards found.");
        return Ok(());
    }

    for card in &totals {
        println!("   {:28} │ {:>12.2}", truncate(&card.card_name, 28), card.total);
    }

    Ok(())
}

pub fn cmd_report_annual(db: &Database, email: &str, year: Option<i32>, json: bool) -> Result<()> {
    let user = resolve_user(db, email)?;
    let year = year.unwrap_or_else(|| Utc::now().year());
    let summary = db.annual_card_summary(user.id, year)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("📊 Installments for {}", year);
    println!("   ───────────────────────────────────────────");

    if summary.cards.is_empty() {
        println!("   No installments due this year.");
        return Ok(());
    }

    for card in &summary.cards {
        println!();
        println!("   💳 {}", card.card_name);
        for month in card.months.iter().filter(|m| !m.total.is_zero()) {
            println!(
                "      {:12} │ {:>12.2}",
                MONTH_NAMES[(month.month - 1) as usize],
                month.total
            );
        }
        println!("      {:12} │ {:>12.2}", "Total", card.annual_total);
    }

    println!();
    println!("   Grand total: {:.2}", summary.grand_total);

    Ok(())
}

pub fn cmd_report_pending(db: &Database, email: &str, card_id: i64, json: bool) -> Result<()> {
    let user = resolve_user(db, email)?;
    let today = Utc::now().date_naive();
    let report = db.pending_future_installments(user.id, card_id, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("⏳ Pending installments (card {})", card_id);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.expenses.is_empty() {
        println!("   Nothing pending.");
        return Ok(());
    }

    println!(
        "   {:24} │ {:10} │ {:>10} │ {:>4} │ {:>12}",
        "Expense", "Date", "Each", "Left", "Total"
    );
    for row in &report.expenses {
        println!(
            "   {:24} │ {:10} │ {:>10.2} │ {:>4} │ {:>12.2}",
            truncate(row.description.as_deref().unwrap_or("-"), 24),
            row.expense_date,
            row.installment_amount,
            row.pending_count,
            row.pending_total
        );
    }
    println!();
    println!("   Total pending: {:.2}", report.grand_total);

    Ok(())
}

pub fn cmd_report_cards(db: &Database, email: &str, json: bool) -> Result<()> {
    let user = resolve_user(db, email)?;
    let today = Utc::now().date_naive();
    let cards = db.credit_card_overview(user.id, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    println!();
    println!("💳 Credit cards");
    println!("   ─────────────────────────────────────────────────────────────");

    if cards.is_empty() {
        println!("   No cards found.");
        return Ok(());
    }

    println!(
        "   {:20} │ {:>12} │ {:>12} │ {:>12} │ {:>12}",
        "Card", "Limit", "This month", "Pending", "Available"
    );
    for detail in &cards {
        println!(
            "   {:20} │ {:>12.2} │ {:>12.2} │ {:>12.2} │ {:>12.2}",
            truncate(&detail.card.name, 20),
            detail.card.credit_limit,
            detail.current_month,
            detail.pending_total,
            detail.available
        );
    }

    Ok(())
}
