//! Bank operations
//!
//! Users see their own banks plus the global ones (`user_id IS NULL`), but
//! can only modify their own.

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Bank, BankUpdate, NewBank};

const BANK_COLUMNS: &str = "id, name, country, user_id, created_at";

fn row_to_bank(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bank> {
    let created_at_str: String = row.get(4)?;
    Ok(Bank {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
    })
}

/// Fail with NotFound unless the bank is global or owned by `user_id`
pub(crate) fn ensure_bank_visible(conn: &Connection, user_id: i64, bank_id: i64) -> Result<()> {
    let visible: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM banks WHERE id = ? AND (user_id = ? OR user_id IS NULL))",
        params![bank_id, user_id],
        |row| row.get(0),
    )?;
    if !visible {
        return Err(Error::NotFound(format!("Bank {}", bank_id)));
    }
    Ok(())
}

fn normalized_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Bank name is required".into()));
    }
    Ok(name.to_string())
}

impl Database {
    /// Create a bank owned by `user_id`
    pub fn create_bank(&self, user_id: i64, new: &NewBank) -> Result<Bank> {
        let name = normalized_name(&new.name)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO banks (name, country, user_id) VALUES (?, ?, ?)",
            params![name, new.country, user_id],
        )?;

        self.get_bank(user_id, conn.last_insert_rowid())
    }

    /// Create a global bank (visible to every user)
    pub fn create_global_bank(&self, name: &str, country: Option<&str>) -> Result<Bank> {
        let name = normalized_name(name)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO banks (name, country, user_id) VALUES (?, ?, NULL)",
            params![name, country],
        )?;
        let id = conn.last_insert_rowid();

        let bank = conn.query_row(
            &format!("SELECT {} FROM banks WHERE id = ?", BANK_COLUMNS),
            params![id],
            row_to_bank,
        )?;
        Ok(bank)
    }

    /// List own and global banks
    pub fn list_banks(&self, user_id: i64) -> Result<Vec<Bank>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM banks WHERE user_id = ? OR user_id IS NULL ORDER BY name",
            BANK_COLUMNS
        ))?;

        let banks = stmt
            .query_map(params![user_id], row_to_bank)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(banks)
    }

    /// Get an own or global bank
    pub fn get_bank(&self, user_id: i64, id: i64) -> Result<Bank> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM banks WHERE id = ? AND (user_id = ? OR user_id IS NULL)",
                BANK_COLUMNS
            ),
            params![id, user_id],
            row_to_bank,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Bank {}", id)))
    }

    /// Update an own bank
    pub fn update_bank(&self, user_id: i64, id: i64, update: &BankUpdate) -> Result<Bank> {
        let current = self.get_bank(user_id, id)?;
        if current.user_id != Some(user_id) {
            return Err(Error::NotFound(format!("Bank {}", id)));
        }

        let name = match &update.name {
            Some(name) => normalized_name(name)?,
            None => current.name,
        };
        let country = match &update.country {
            Some(country) => country.clone(),
            None => current.country,
        };

        let conn = self.conn()?;
        conn.execute(
            "UPDATE banks SET name = ?, country = ? WHERE id = ? AND user_id = ?",
            params![name, country, id, user_id],
        )?;

        self.get_bank(user_id, id)
    }

    /// Delete an own bank. Rejected while any card still references it.
    pub fn delete_bank(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let owned: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM banks WHERE id = ? AND user_id = ?)",
            params![id, user_id],
            |row| row.get(0),
        )?;
        if !owned {
            return Err(Error::NotFound(format!("Bank {}", id)));
        }

        let in_use: bool = conn.query_row(
            r#"
            SELECT EXISTS(SELECT 1 FROM credit_cards WHERE bank_id = ?1)
                OR EXISTS(SELECT 1 FROM debit_cards WHERE bank_id = ?1)
            "#,
            params![id],
            |row| row.get(0),
        )?;
        if in_use {
            return Err(Error::Conflict(format!(
                "Bank {} still has cards attached",
                id
            )));
        }

        conn.execute(
            "DELETE FROM banks WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(())
    }
}
