//! Expense lifecycle
//!
//! Credit-card expenses own a full installment schedule. Creating such an
//! expense writes the expense row and every installment in one transaction.
//! An update that changes the amount, date or installment count replaces
//! the whole schedule in the same transaction as the expense row.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::cards::{ensure_card_owned, CardKind};
use super::categories::ensure_category_visible;
use super::installments::{delete_installments_for_expense, insert_installments};
use super::{get_decimal, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::installments::{generate, installment_label, remaining, MAX_INSTALLMENTS};
use crate::models::{
    CardExpenseFilter, CardInstallmentRow, DashboardExpense, DashboardFilter, Expense,
    ExpenseUpdate, NewExpense, Page,
};

const EXPENSE_SELECT: &str = r#"
    SELECT e.id, e.user_id, e.amount, e.date, e.description, e.category_id, cat.name,
           e.credit_card_id, e.debit_card_id, COALESCE(cc.name, dc.name),
           e.is_installment, e.total_installments, e.created_at
    FROM expenses e
    JOIN categories cat ON cat.id = e.category_id
    LEFT JOIN credit_cards cc ON cc.id = e.credit_card_id
    LEFT JOIN debit_cards dc ON dc.id = e.debit_card_id
"#;

fn row_to_expense(row: &rusqlite::Row<'_>, today: NaiveDate) -> rusqlite::Result<Expense> {
    let date: NaiveDate = row.get(3)?;
    let total_installments: u32 = row.get(11)?;
    let created_at_str: String = row.get(12)?;
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: get_decimal(row, 2)?,
        date,
        description: row.get(4)?,
        category_id: row.get(5)?,
        category_name: row.get(6)?,
        credit_card_id: row.get(7)?,
        debit_card_id: row.get(8)?,
        card_name: row.get(9)?,
        is_installment: row.get(10)?,
        total_installments,
        remaining_installments: remaining(date, total_installments, today),
        created_at: parse_datetime(&created_at_str),
    })
}

/// Stored state of an expense, as needed to apply an update
struct ExpenseRecord {
    amount: Decimal,
    date: NaiveDate,
    description: Option<String>,
    category_id: i64,
    credit_card_id: Option<i64>,
    debit_card_id: Option<i64>,
    total_installments: u32,
}

fn load_owned_expense(conn: &Connection, user_id: i64, id: i64) -> Result<ExpenseRecord> {
    conn.query_row(
        r#"
        SELECT amount, date, description, category_id, credit_card_id, debit_card_id,
               total_installments
        FROM expenses
        WHERE id = ? AND user_id = ? AND deleted_at IS NULL
        "#,
        params![id, user_id],
        |row| {
            Ok(ExpenseRecord {
                amount: get_decimal(row, 0)?,
                date: row.get(1)?,
                description: row.get(2)?,
                category_id: row.get(3)?,
                credit_card_id: row.get(4)?,
                debit_card_id: row.get(5)?,
                total_installments: row.get(6)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Expense {}", id)))
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation("Amount must be greater than zero".into()));
    }
    Ok(())
}

fn validate_single_card(credit: Option<i64>, debit: Option<i64>) -> Result<()> {
    if credit.is_some() && debit.is_some() {
        return Err(Error::Validation(
            "An expense cannot use a credit card and a debit card at the same time".into(),
        ));
    }
    Ok(())
}

/// Installment count for a credit-card expense: at least 1, at most the cap
fn effective_installments(requested: u32) -> Result<u32> {
    if requested > MAX_INSTALLMENTS {
        return Err(Error::Validation(format!(
            "Installment count cannot exceed {}",
            MAX_INSTALLMENTS
        )));
    }
    Ok(requested.max(1))
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Database {
    /// Create an expense, generating its installments when it is charged
    /// to a credit card. Returns the new expense ID.
    pub fn create_expense(&self, user_id: i64, new: &NewExpense) -> Result<i64> {
        validate_single_card(new.credit_card_id, new.debit_card_id)?;
        validate_amount(new.amount)?;

        let total = match new.credit_card_id {
            Some(_) => effective_installments(new.installments.unwrap_or(1))?,
            None => 0,
        };
        let drafts = generate(new.amount, total, new.date)?;
        let description = clean_description(new.description.as_deref());

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        ensure_category_visible(&tx, user_id, new.category_id)?;
        if let Some(card_id) = new.credit_card_id {
            ensure_card_owned(&tx, CardKind::Credit, user_id, card_id)?;
        }
        if let Some(card_id) = new.debit_card_id {
            ensure_card_owned(&tx, CardKind::Debit, user_id, card_id)?;
        }

        tx.execute(
            r#"
            INSERT INTO expenses (user_id, category_id, credit_card_id, debit_card_id, amount,
                                  date, description, is_installment, total_installments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.category_id,
                new.credit_card_id,
                new.debit_card_id,
                new.amount.to_string(),
                new.date,
                description,
                new.credit_card_id.is_some(),
                total
            ],
        )?;
        let expense_id = tx.last_insert_rowid();

        insert_installments(&tx, expense_id, &drafts)?;
        tx.commit()?;

        info!(
            expense_id,
            installments = drafts.len(),
            "Created expense"
        );
        Ok(expense_id)
    }

    /// Apply a partial update. Returns whether the installment schedule was
    /// regenerated.
    pub fn update_expense(&self, user_id: i64, id: i64, update: &ExpenseUpdate) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current = load_owned_expense(&tx, user_id, id)?;

        let amount = update.amount.unwrap_or(current.amount);
        let date = update.date.unwrap_or(current.date);
        let category_id = update.category_id.unwrap_or(current.category_id);
        let description = match &update.description {
            Some(description) => clean_description(description.as_deref()),
            None => current.description.clone(),
        };
        let credit_card_id = match update.credit_card_id {
            Some(value) => value,
            None => current.credit_card_id,
        };
        let debit_card_id = match update.debit_card_id {
            Some(value) => value,
            None => current.debit_card_id,
        };

        validate_single_card(credit_card_id, debit_card_id)?;
        validate_amount(amount)?;

        let total = match credit_card_id {
            Some(_) => {
                let requested = update
                    .installments
                    .unwrap_or(current.total_installments.max(1));
                effective_installments(requested)?
            }
            None => 0,
        };

        if category_id != current.category_id {
            ensure_category_visible(&tx, user_id, category_id)?;
        }
        if let Some(card_id) = credit_card_id.filter(|c| Some(*c) != current.credit_card_id) {
            ensure_card_owned(&tx, CardKind::Credit, user_id, card_id)?;
        }
        if let Some(card_id) = debit_card_id.filter(|c| Some(*c) != current.debit_card_id) {
            ensure_card_owned(&tx, CardKind::Debit, user_id, card_id)?;
        }

        tx.execute(
            r#"
            UPDATE expenses
            SET amount = ?, date = ?, description = ?, category_id = ?, credit_card_id = ?,
                debit_card_id = ?, is_installment = ?, total_installments = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                amount.to_string(),
                date,
                description,
                category_id,
                credit_card_id,
                debit_card_id,
                credit_card_id.is_some(),
                total,
                id,
                user_id
            ],
        )?;

        let regenerate = amount != current.amount
            || date != current.date
            || total != current.total_installments;
        if regenerate {
            let drafts = generate(amount, total, date)?;
            let removed = delete_installments_for_expense(&tx, id)?;
            insert_installments(&tx, id, &drafts)?;
            debug!(
                expense_id = id,
                removed,
                inserted = drafts.len(),
                "Regenerated installments"
            );
        }

        tx.commit()?;
        Ok(regenerate)
    }

    /// Remove an expense: its installments are deleted and the expense is
    /// soft deleted, atomically.
    pub fn delete_expense(&self, user_id: i64, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        load_owned_expense(&tx, user_id, id)?;
        delete_installments_for_expense(&tx, id)?;
        tx.execute(
            "UPDATE expenses SET deleted_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        tx.commit()?;
        debug!(expense_id = id, "Deleted expense");
        Ok(())
    }

    /// Get a live expense owned by `user_id`
    pub fn get_expense(&self, user_id: i64, id: i64, today: NaiveDate) -> Result<Expense> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "{} WHERE e.id = ? AND e.user_id = ? AND e.deleted_at IS NULL",
                EXPENSE_SELECT
            ),
            params![id, user_id],
            |row| row_to_expense(row, today),
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Expense {}", id)))
    }

    /// List live expenses, newest first
    pub fn list_expenses(&self, user_id: i64, today: NaiveDate) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE e.user_id = ? AND e.deleted_at IS NULL ORDER BY e.date DESC, e.id DESC",
            EXPENSE_SELECT
        ))?;

        let expenses = stmt
            .query_map(params![user_id], |row| row_to_expense(row, today))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Filtered, sorted, paginated expenses of one credit card.
    ///
    /// The remaining-installments filter depends on `today`, so it runs
    /// after the SQL query and before pagination.
    pub fn list_card_expenses(
        &self,
        user_id: i64,
        card_id: i64,
        filter: &CardExpenseFilter,
        today: NaiveDate,
    ) -> Result<Page<Expense>> {
        let mut conditions = vec![
            "e.user_id = ?".to_string(),
            "e.credit_card_id = ?".to_string(),
            "e.deleted_at IS NULL".to_string(),
        ];
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(user_id), Box::new(card_id)];

        if let Some(from) = filter.date_from {
            conditions.push("e.date >= ?".to_string());
            query_params.push(Box::new(from));
        }
        if let Some(to) = filter.date_to {
            conditions.push("e.date <= ?".to_string());
            query_params.push(Box::new(to));
        }
        if let Some(category_id) = filter.category_id {
            conditions.push("e.category_id = ?".to_string());
            query_params.push(Box::new(category_id));
        }

        let direction = if filter.descending { "DESC" } else { "ASC" };
        let sql = format!(
            "{} WHERE {} ORDER BY {} {}, e.id {}",
            EXPENSE_SELECT,
            conditions.join(" AND "),
            filter.sort.column(),
            direction,
            direction
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let mut expenses = stmt
            .query_map(param_refs.as_slice(), |row| row_to_expense(row, today))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if let Some(wanted) = filter.remaining {
            expenses.retain(|e| e.remaining_installments == wanted);
        }

        let total = expenses.len() as i64;
        let limit = filter.limit.max(1) as usize;
        let offset = (filter.page.max(1) as usize - 1) * limit;
        let data = expenses.into_iter().skip(offset).take(limit).collect();

        Ok(Page { data, total })
    }

    /// The most recent expenses charged to a credit card
    pub fn list_recent_card_expenses(
        &self,
        user_id: i64,
        card_id: i64,
        limit: u32,
        today: NaiveDate,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            {} WHERE e.user_id = ? AND e.credit_card_id = ? AND e.deleted_at IS NULL
            ORDER BY e.date DESC, e.id DESC
            LIMIT ?
            "#,
            EXPENSE_SELECT
        ))?;

        let expenses = stmt
            .query_map(params![user_id, card_id, limit], |row| {
                row_to_expense(row, today)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Credit-card expenses for the dashboard table
    pub fn list_dashboard_expenses(
        &self,
        user_id: i64,
        filter: &DashboardFilter,
    ) -> Result<Vec<DashboardExpense>> {
        let mut conditions = vec![
            "e.user_id = ?".to_string(),
            "e.credit_card_id IS NOT NULL".to_string(),
            "e.deleted_at IS NULL".to_string(),
        ];
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(from) = filter.date_from {
            conditions.push("e.date >= ?".to_string());
            query_params.push(Box::new(from));
        }
        if let Some(to) = filter.date_to {
            conditions.push("e.date <= ?".to_string());
            query_params.push(Box::new(to));
        }
        if let Some(category_id) = filter.category_id {
            conditions.push("e.category_id = ?".to_string());
            query_params.push(Box::new(category_id));
        }
        if let Some(card_id) = filter.card_id {
            conditions.push("e.credit_card_id = ?".to_string());
            query_params.push(Box::new(card_id));
        }

        let sql = format!(
            r#"
            SELECT e.id, e.amount, e.date, e.description, e.category_id, cat.name,
                   e.credit_card_id, cc.name, e.total_installments
            FROM expenses e
            JOIN categories cat ON cat.id = e.category_id
            JOIN credit_cards cc ON cc.id = e.credit_card_id
            WHERE {}
            ORDER BY e.date DESC, e.id DESC
            "#,
            conditions.join(" AND ")
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let expenses = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(DashboardExpense {
                    id: row.get(0)?,
                    amount: get_decimal(row, 1)?,
                    date: row.get(2)?,
                    description: row.get(3)?,
                    category_id: row.get(4)?,
                    category_name: row.get(5)?,
                    card_id: row.get(6)?,
                    card_name: row.get(7)?,
                    total_installments: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Every installment of a card's expenses, labelled `"n/N"`
    pub fn list_card_installment_rows(
        &self,
        user_id: i64,
        card_id: i64,
    ) -> Result<Vec<CardInstallmentRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.description, cat.name, e.date, i.due_date, i.amount,
                   i.number, e.total_installments, i.paid
            FROM installments i
            JOIN expenses e ON e.id = i.expense_id
            JOIN categories cat ON cat.id = e.category_id
            WHERE e.user_id = ? AND e.credit_card_id = ? AND e.deleted_at IS NULL
            ORDER BY e.date, e.id, i.number
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id, card_id], |row| {
                let number: u32 = row.get(6)?;
                let total: u32 = row.get(7)?;
                Ok(CardInstallmentRow {
                    expense_id: row.get(0)?,
                    description: row.get(1)?,
                    category_name: row.get(2)?,
                    expense_date: row.get(3)?,
                    due_date: row.get(4)?,
                    amount: get_decimal(row, 5)?,
                    label: installment_label(number, total),
                    paid: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
