//! Installment store
//!
//! Installment rows are written and removed only as a complete set per
//! expense (see `expenses`). The single per-row change is marking one paid.

use rusqlite::{params, Connection};
use tracing::debug;

use super::{get_decimal, Database};
use crate::calendar::{month_bounds, year_bounds};
use crate::error::{Error, Result};
use crate::installments::InstallmentDraft;
use crate::models::{Installment, InstallmentFilter, InstallmentListItem, Page};

fn row_to_installment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Installment> {
    Ok(Installment {
        id: row.get(0)?,
        expense_id: row.get(1)?,
        number: row.get(2)?,
        amount: get_decimal(row, 3)?,
        due_date: row.get(4)?,
        paid: row.get(5)?,
    })
}

/// Insert a generated schedule for an expense
pub(crate) fn insert_installments(
    conn: &Connection,
    expense_id: i64,
    drafts: &[InstallmentDraft],
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO installments (expense_id, number, amount, due_date) VALUES (?, ?, ?, ?)",
    )?;
    for draft in drafts {
        stmt.execute(params![
            expense_id,
            draft.number,
            draft.amount.to_string(),
            draft.due_date
        ])?;
    }
    Ok(())
}

/// Remove every installment of an expense, returning how many were removed
pub(crate) fn delete_installments_for_expense(conn: &Connection, expense_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM installments WHERE expense_id = ?",
        params![expense_id],
    )?)
}

impl Database {
    /// Installments of one owned expense, in sequence order
    pub fn list_installments_for_expense(
        &self,
        user_id: i64,
        expense_id: i64,
    ) -> Result<Vec<Installment>> {
        let conn = self.conn()?;

        let owned: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM expenses WHERE id = ? AND user_id = ? AND deleted_at IS NULL)",
            params![expense_id, user_id],
            |row| row.get(0),
        )?;
        if !owned {
            return Err(Error::NotFound(format!("Expense {}", expense_id)));
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, expense_id, number, amount, due_date, paid
            FROM installments
            WHERE expense_id = ?
            ORDER BY number
            "#,
        )?;

        let installments = stmt
            .query_map(params![expense_id], row_to_installment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(installments)
    }

    /// Mark an installment paid.
    ///
    /// Returns false without error when the installment is unknown, belongs
    /// to another user, or was already paid.
    pub fn mark_installment_paid(&self, user_id: i64, installment_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE installments SET paid = 1
            WHERE id = ?1 AND paid = 0
              AND expense_id IN (
                  SELECT id FROM expenses WHERE user_id = ?2 AND deleted_at IS NULL
              )
            "#,
            params![installment_id, user_id],
        )?;

        debug!(installment_id, changed, "Mark installment paid");
        Ok(changed > 0)
    }

    /// Filtered, paginated installment listing across the user's cards
    pub fn list_installments(
        &self,
        user_id: i64,
        filter: &InstallmentFilter,
    ) -> Result<Page<InstallmentListItem>> {
        let mut conditions = vec![
            "e.user_id = ?".to_string(),
            "e.deleted_at IS NULL".to_string(),
        ];
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(card_id) = filter.card_id {
            conditions.push("e.credit_card_id = ?".to_string());
            query_params.push(Box::new(card_id));
        }

        if let Some(month) = filter.month {
            if !(1..=12).contains(&month) {
                return Err(Error::Validation(format!("Invalid month: {}", month)));
            }
        }

        // A month without a year matches that month in every year
        if let (None, Some(month)) = (filter.year, filter.month) {
            conditions.push("CAST(strftime('%m', i.due_date) AS INTEGER) = ?".to_string());
            query_params.push(Box::new(month));
        }

        let range = match (filter.year, filter.month) {
            (Some(year), Some(month)) => Some(month_bounds(year, month).ok_or_else(|| {
                Error::Validation(format!("Invalid month: {}", month))
            })?),
            (Some(year), None) => Some(
                year_bounds(year)
                    .ok_or_else(|| Error::Validation(format!("Invalid year: {}", year)))?,
            ),
            _ => None,
        };
        if let Some((from, to)) = range {
            conditions.push("i.due_date BETWEEN ? AND ?".to_string());
            query_params.push(Box::new(from));
            query_params.push(Box::new(to));
        }

        if let Some(paid) = filter.paid {
            conditions.push("i.paid = ?".to_string());
            query_params.push(Box::new(paid));
        }

        let where_clause = conditions.join(" AND ");
        let from_clause = r#"
            FROM installments i
            JOIN expenses e ON e.id = i.expense_id
            JOIN credit_cards cc ON cc.id = e.credit_card_id
        "#;

        let conn = self.conn()?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {} WHERE {}", from_clause, where_clause),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        let limit = filter.limit.max(1) as i64;
        let offset = (filter.page.max(1) as i64 - 1) * limit;
        let mut page_params = param_refs.clone();
        page_params.push(&limit);
        page_params.push(&offset);

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT i.id, i.expense_id, i.number, i.amount, i.due_date, i.paid,
                   e.total_installments, e.description, cc.id, cc.name
            {}
            WHERE {}
            ORDER BY i.due_date, i.expense_id, i.number
            LIMIT ? OFFSET ?
            "#,
            from_clause, where_clause
        ))?;

        let data = stmt
            .query_map(page_params.as_slice(), |row| {
                Ok(InstallmentListItem {
                    installment: row_to_installment(row)?,
                    total_installments: row.get(6)?,
                    description: row.get(7)?,
                    card_id: row.get(8)?,
                    card_name: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page { data, total })
    }
}
