//! Installment rollups: per month, per year, per card
//!
//! Every figure is computed from persisted installments, never from the
//! expense amounts. Sums run at full precision and are rounded to cents
//! only when placed in a report. An unknown or foreign card yields an empty
//! report rather than an error.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::{get_decimal, Database};
use crate::calendar::{first_of_next_month, month_bounds, year_bounds};
use crate::error::{Error, Result};
use crate::installments::round_money;
use crate::models::{
    AnnualSummary, CardAnnualSummary, CardMonthTotal, CardMonthlyBreakdown, CreditCardDetail,
    GeneralAnnualSummary, MonthBreakdown, MonthInstallmentTotal, MonthSpendTotal, PendingExpense,
    PendingInstallmentsReport,
};

/// One installment with the context the rollups group by
#[derive(Debug, Clone)]
pub(crate) struct InstallmentFact {
    pub expense_id: i64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub category_id: i64,
    pub category_name: String,
    pub card_id: i64,
    pub card_name: String,
    pub number: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid: bool,
}

fn year_range(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    year_bounds(year).ok_or_else(|| Error::Validation(format!("Invalid year: {}", year)))
}

fn month_range(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    month_bounds(date.year(), date.month())
        .ok_or_else(|| Error::InvalidData(format!("No month bounds for {}", date)))
}

/// Index 0..12 of a due date's month
fn month_index(date: NaiveDate) -> usize {
    date.month0() as usize
}

impl Database {
    /// Installments of live credit-card expenses due within `[from, to]`
    pub(crate) fn installment_facts(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        card_id: Option<i64>,
    ) -> Result<Vec<InstallmentFact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.date, e.description, e.category_id, cat.name,
                   cc.id, cc.name, i.number, i.amount, i.due_date, i.paid
            FROM installments i
            JOIN expenses e ON e.id = i.expense_id
            JOIN categories cat ON cat.id = e.category_id
            JOIN credit_cards cc ON cc.id = e.credit_card_id
            WHERE e.user_id = ?1
              AND e.deleted_at IS NULL
              AND i.due_date BETWEEN ?2 AND ?3
              AND (?4 IS NULL OR e.credit_card_id = ?4)
            ORDER BY i.due_date, e.id, i.number
            "#,
        )?;

        let facts = stmt
            .query_map(rusqlite::params![user_id, from, to, card_id], |row| {
                Ok(InstallmentFact {
                    expense_id: row.get(0)?,
                    expense_date: row.get(1)?,
                    description: row.get(2)?,
                    category_id: row.get(3)?,
                    category_name: row.get(4)?,
                    card_id: row.get(5)?,
                    card_name: row.get(6)?,
                    number: row.get(7)?,
                    amount: get_decimal(row, 8)?,
                    due_date: row.get(9)?,
                    paid: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(facts)
    }

    /// Installments due in `today`'s month, summed per card
    pub fn monthly_card_totals(&self, user_id: i64, today: NaiveDate) -> Result<Vec<CardMonthTotal>> {
        let (from, to) = month_range(today)?;
        let facts = self.installment_facts(user_id, from, to, None)?;

        let mut per_card: BTreeMap<i64, (String, Decimal)> = BTreeMap::new();
        for fact in facts {
            let entry = per_card
                .entry(fact.card_id)
                .or_insert_with(|| (fact.card_name.clone(), Decimal::ZERO));
            entry.1 += fact.amount;
        }

        let mut totals: Vec<CardMonthTotal> = per_card
            .into_iter()
            .map(|(card_id, (card_name, total))| CardMonthTotal {
                card_id,
                card_name,
                total: round_money(total),
            })
            .collect();
        totals.sort_by(|a, b| a.card_name.to_lowercase().cmp(&b.card_name.to_lowercase()));

        Ok(totals)
    }

    /// Twelve zero-filled months per card for `year`, plus a grand total
    pub fn annual_card_summary(&self, user_id: i64, year: i32) -> Result<AnnualSummary> {
        let (from, to) = year_range(year)?;
        let facts = self.installment_facts(user_id, from, to, None)?;

        let mut per_card: BTreeMap<i64, (String, [Decimal; 12])> = BTreeMap::new();
        for fact in facts {
            let entry = per_card
                .entry(fact.card_id)
                .or_insert_with(|| (fact.card_name.clone(), [Decimal::ZERO; 12]));
            entry.1[month_index(fact.due_date)] += fact.amount;
        }

        let mut grand_total = Decimal::ZERO;
        let mut cards: Vec<CardAnnualSummary> = per_card
            .into_iter()
            .map(|(card_id, (card_name, months))| {
                let annual: Decimal = months.iter().sum();
                grand_total += annual;
                CardAnnualSummary {
                    card_id,
                    card_name,
                    year,
                    months: months
                        .iter()
                        .enumerate()
                        .map(|(i, total)| MonthInstallmentTotal {
                            month: i as u32 + 1,
                            total: round_money(*total),
                        })
                        .collect(),
                    annual_total: round_money(annual),
                }
            })
            .collect();
        cards.sort_by(|a, b| a.card_name.to_lowercase().cmp(&b.card_name.to_lowercase()));

        Ok(AnnualSummary {
            cards,
            grand_total: round_money(grand_total),
        })
    }

    /// Twelve zero-filled months across every card for `year`
    pub fn general_annual_summary(&self, user_id: i64, year: i32) -> Result<GeneralAnnualSummary> {
        let (from, to) = year_range(year)?;
        let facts = self.installment_facts(user_id, from, to, None)?;

        let mut months = [Decimal::ZERO; 12];
        for fact in &facts {
            months[month_index(fact.due_date)] += fact.amount;
        }
        let annual: Decimal = months.iter().sum();

        Ok(GeneralAnnualSummary {
            year,
            months: months
                .iter()
                .enumerate()
                .map(|(i, total)| MonthSpendTotal {
                    month: i as u32 + 1,
                    total: round_money(*total),
                })
                .collect(),
            annual_total: round_money(annual),
        })
    }

    /// One card's months split into first installments (new spending) and
    /// later installments carried over from earlier expenses
    pub fn card_monthly_breakdown(
        &self,
        user_id: i64,
        card_id: i64,
        year: i32,
    ) -> Result<CardMonthlyBreakdown> {
        let (from, to) = year_range(year)?;

        let (card_name, bank_name, facts) = match self.get_credit_card(user_id, card_id) {
            Ok(card) => (
                card.name,
                card.bank_name,
                self.installment_facts(user_id, from, to, Some(card_id))?,
            ),
            Err(Error::NotFound(_)) => (String::new(), String::new(), Vec::new()),
            Err(e) => return Err(e),
        };

        let mut new_expense = [Decimal::ZERO; 12];
        let mut carry_over = [Decimal::ZERO; 12];
        for fact in &facts {
            let idx = month_index(fact.due_date);
            if fact.number == 1 {
                new_expense[idx] += fact.amount;
            } else {
                carry_over[idx] += fact.amount;
            }
        }

        let annual: Decimal = new_expense.iter().chain(carry_over.iter()).sum();
        let months = (0..12)
            .map(|i| MonthBreakdown {
                month: i as u32 + 1,
                new_expense: round_money(new_expense[i]),
                carry_over: round_money(carry_over[i]),
                total: round_money(new_expense[i] + carry_over[i]),
            })
            .collect();

        Ok(CardMonthlyBreakdown {
            card_id,
            bank_name,
            card_name,
            year,
            months,
            annual_total: round_money(annual),
        })
    }

    /// Unpaid installments of a card due from next month onwards, grouped
    /// by expense in expense-date order
    pub fn pending_future_installments(
        &self,
        user_id: i64,
        card_id: i64,
        today: NaiveDate,
    ) -> Result<PendingInstallmentsReport> {
        let from = first_of_next_month(today)
            .ok_or_else(|| Error::InvalidData(format!("No month after {}", today)))?;
        let until = NaiveDate::from_ymd_opt(9999, 12, 31)
            .ok_or_else(|| Error::InvalidData("No upper date bound".into()))?;
        let facts = self.installment_facts(user_id, from, until, Some(card_id))?;

        // expense_id -> position in `expenses`, keeps first-seen order stable
        let mut index: BTreeMap<i64, usize> = BTreeMap::new();
        let mut expenses: Vec<PendingExpense> = Vec::new();
        for fact in facts.into_iter().filter(|f| !f.paid) {
            match index.get(&fact.expense_id) {
                Some(&pos) => expenses[pos].pending_count += 1,
                None => {
                    index.insert(fact.expense_id, expenses.len());
                    expenses.push(PendingExpense {
                        expense_id: fact.expense_id,
                        description: fact.description,
                        expense_date: fact.expense_date,
                        installment_amount: fact.amount,
                        pending_count: 1,
                        pending_total: Decimal::ZERO,
                    });
                }
            }
        }

        let mut grand_total = Decimal::ZERO;
        for expense in &mut expenses {
            expense.pending_total = expense.installment_amount * Decimal::from(expense.pending_count);
            grand_total += expense.pending_total;
            expense.installment_amount = round_money(expense.installment_amount);
            expense.pending_total = round_money(expense.pending_total);
        }
        expenses.sort_by(|a, b| {
            a.expense_date
                .cmp(&b.expense_date)
                .then(a.expense_id.cmp(&b.expense_id))
        });

        Ok(PendingInstallmentsReport {
            expenses,
            grand_total: round_money(grand_total),
        })
    }

    /// Credit limit usage of one card as of `today`
    pub fn credit_card_detail(
        &self,
        user_id: i64,
        card_id: i64,
        today: NaiveDate,
    ) -> Result<CreditCardDetail> {
        let card = self.get_credit_card(user_id, card_id)?;

        let (from, to) = month_range(today)?;
        let current_month: Decimal = self
            .installment_facts(user_id, from, to, Some(card_id))?
            .iter()
            .map(|f| f.amount)
            .sum();
        let pending_total = self
            .pending_future_installments(user_id, card_id, today)?
            .grand_total;

        let current_month = round_money(current_month);
        let available = card.credit_limit - current_month - pending_total;

        Ok(CreditCardDetail {
            card,
            current_month,
            pending_total,
            available: round_money(available),
        })
    }

    /// Limit usage for every live credit card
    pub fn credit_card_overview(&self, user_id: i64, today: NaiveDate) -> Result<Vec<CreditCardDetail>> {
        self.list_credit_cards(user_id)?
            .into_iter()
            .map(|card| self.credit_card_detail(user_id, card.id, today))
            .collect()
    }
}
