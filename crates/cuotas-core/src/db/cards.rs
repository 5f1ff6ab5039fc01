//! Credit and debit card operations
//!
//! A card is identified for duplicate purposes by its bank, its trimmed
//! lowercase name and the last four digits, among the owner's live cards.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::debug;

use super::banks::ensure_bank_visible;
use super::{get_decimal, last_four_digits, name_key, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    CreditCard, CreditCardUpdate, DebitCard, DebitCardUpdate, NewCreditCard, NewDebitCard,
};

const CREDIT_CARD_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.bank_id, b.name, c.name, c.last_four,
           c.credit_limit, c.closing_day, c.due_day, c.created_at
    FROM credit_cards c
    JOIN banks b ON b.id = c.bank_id
"#;

const DEBIT_CARD_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.bank_id, b.name, c.name, c.last_four,
           c.available_balance, c.created_at
    FROM debit_cards c
    JOIN banks b ON b.id = c.bank_id
"#;

fn row_to_credit_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<CreditCard> {
    let created_at_str: String = row.get(9)?;
    Ok(CreditCard {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank_id: row.get(2)?,
        bank_name: row.get(3)?,
        name: row.get(4)?,
        last_four: row.get(5)?,
        credit_limit: get_decimal(row, 6)?,
        closing_day: row.get(7)?,
        due_day: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_debit_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<DebitCard> {
    let created_at_str: String = row.get(7)?;
    Ok(DebitCard {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank_id: row.get(2)?,
        bank_name: row.get(3)?,
        name: row.get(4)?,
        last_four: row.get(5)?,
        available_balance: get_decimal(row, 6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

/// Which card table a shared helper works on
#[derive(Debug, Clone, Copy)]
pub(crate) enum CardKind {
    Credit,
    Debit,
}

impl CardKind {
    fn table(&self) -> &'static str {
        match self {
            Self::Credit => "credit_cards",
            Self::Debit => "debit_cards",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Credit => "Credit card",
            Self::Debit => "Debit card",
        }
    }
}

/// Fail with NotFound unless the card is live and owned by `user_id`
pub(crate) fn ensure_card_owned(
    conn: &Connection,
    kind: CardKind,
    user_id: i64,
    card_id: i64,
) -> Result<()> {
    let owned: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ? AND user_id = ? AND deleted_at IS NULL)",
            kind.table()
        ),
        params![card_id, user_id],
        |row| row.get(0),
    )?;
    if !owned {
        return Err(Error::NotFound(format!("{} {}", kind.label(), card_id)));
    }
    Ok(())
}

fn ensure_unique_fingerprint(
    conn: &Connection,
    kind: CardKind,
    user_id: i64,
    bank_id: i64,
    name: &str,
    last_four: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT name FROM {}
        WHERE user_id = ? AND bank_id = ? AND last_four = ?
          AND deleted_at IS NULL AND id != COALESCE(?, -1)
        "#,
        kind.table()
    ))?;
    let names = stmt
        .query_map(params![user_id, bank_id, last_four, exclude_id], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let key = name_key(name);
    if names.iter().any(|existing| name_key(existing) == key) {
        return Err(Error::Validation(format!(
            "{} '{}' ending in {} already exists",
            kind.label(),
            name,
            last_four
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Card name is required".into()));
    }
    Ok(name.to_string())
}

fn validate_number(number: &str) -> Result<String> {
    last_four_digits(number)
        .ok_or_else(|| Error::Validation("Card number needs at least 4 digits".into()))
}

fn validate_day(field: &str, day: u32) -> Result<u32> {
    if !(1..=31).contains(&day) {
        return Err(Error::Validation(format!(
            "{} must be a day of month between 1 and 31",
            field
        )));
    }
    Ok(day)
}

fn validate_non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() {
        return Err(Error::Validation(format!("{} cannot be negative", field)));
    }
    Ok(value)
}

impl Database {
    // ========== Credit cards ==========

    pub fn create_credit_card(&self, user_id: i64, new: &NewCreditCard) -> Result<CreditCard> {
        let name = validate_name(&new.name)?;
        let last_four = validate_number(&new.number)?;
        let limit = validate_non_negative("Credit limit", new.credit_limit)?;
        let closing_day = validate_day("Closing day", new.closing_day)?;
        let due_day = validate_day("Due day", new.due_day)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_bank_visible(&tx, user_id, new.bank_id)?;
        ensure_unique_fingerprint(
            &tx,
            CardKind::Credit,
            user_id,
            new.bank_id,
            &name,
            &last_four,
            None,
        )?;

        tx.execute(
            r#"
            INSERT INTO credit_cards (user_id, bank_id, name, last_four, credit_limit, closing_day, due_day)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.bank_id,
                name,
                last_four,
                limit.to_string(),
                closing_day,
                due_day
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_credit_card(user_id, id)
    }

    /// List live credit cards, ordered by name
    pub fn list_credit_cards(&self, user_id: i64) -> Result<Vec<CreditCard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.user_id = ? AND c.deleted_at IS NULL ORDER BY c.name COLLATE NOCASE",
            CREDIT_CARD_SELECT
        ))?;

        let cards = stmt
            .query_map(params![user_id], row_to_credit_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    pub fn get_credit_card(&self, user_id: i64, id: i64) -> Result<CreditCard> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "{} WHERE c.id = ? AND c.user_id = ? AND c.deleted_at IS NULL",
                CREDIT_CARD_SELECT
            ),
            params![id, user_id],
            row_to_credit_card,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Credit card {}", id)))
    }

    pub fn update_credit_card(
        &self,
        user_id: i64,
        id: i64,
        update: &CreditCardUpdate,
    ) -> Result<CreditCard> {
        let current = self.get_credit_card(user_id, id)?;

        let name = match &update.name {
            Some(name) => validate_name(name)?,
            None => current.name,
        };
        let last_four = match &update.number {
            Some(number) => validate_number(number)?,
            None => current.last_four,
        };
        let limit = match update.credit_limit {
            Some(limit) => validate_non_negative("Credit limit", limit)?,
            None => current.credit_limit,
        };
        let closing_day = match update.closing_day {
            Some(day) => validate_day("Closing day", day)?,
            None => current.closing_day,
        };
        let due_day = match update.due_day {
            Some(day) => validate_day("Due day", day)?,
            None => current.due_day,
        };
        let bank_id = update.bank_id.unwrap_or(current.bank_id);

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if bank_id != current.bank_id {
            ensure_bank_visible(&tx, user_id, bank_id)?;
        }
        ensure_unique_fingerprint(
            &tx,
            CardKind::Credit,
            user_id,
            bank_id,
            &name,
            &last_four,
            Some(id),
        )?;

        tx.execute(
            r#"
            UPDATE credit_cards
            SET bank_id = ?, name = ?, last_four = ?, credit_limit = ?, closing_day = ?, due_day = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                bank_id,
                name,
                last_four,
                limit.to_string(),
                closing_day,
                due_day,
                id,
                user_id
            ],
        )?;
        tx.commit()?;

        self.get_credit_card(user_id, id)
    }

    /// Soft delete a credit card. Its expenses and installments stay.
    pub fn delete_credit_card(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE credit_cards SET deleted_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Credit card {}", id)));
        }
        debug!(card_id = id, "Soft deleted credit card");
        Ok(())
    }

    // ========== Debit cards ==========

    pub fn create_debit_card(&self, user_id: i64, new: &NewDebitCard) -> Result<DebitCard> {
        let name = validate_name(&new.name)?;
        let last_four = validate_number(&new.number)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_bank_visible(&tx, user_id, new.bank_id)?;
        ensure_unique_fingerprint(
            &tx,
            CardKind::Debit,
            user_id,
            new.bank_id,
            &name,
            &last_four,
            None,
        )?;

        tx.execute(
            r#"
            INSERT INTO debit_cards (user_id, bank_id, name, last_four, available_balance)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.bank_id,
                name,
                last_four,
                new.available_balance.to_string()
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_debit_card(user_id, id)
    }

    pub fn list_debit_cards(&self, user_id: i64) -> Result<Vec<DebitCard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.user_id = ? AND c.deleted_at IS NULL ORDER BY c.name COLLATE NOCASE",
            DEBIT_CARD_SELECT
        ))?;

        let cards = stmt
            .query_map(params![user_id], row_to_debit_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    pub fn get_debit_card(&self, user_id: i64, id: i64) -> Result<DebitCard> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "{} WHERE c.id = ? AND c.user_id = ? AND c.deleted_at IS NULL",
                DEBIT_CARD_SELECT
            ),
            params![id, user_id],
            row_to_debit_card,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Debit card {}", id)))
    }

    pub fn update_debit_card(
        &self,
        user_id: i64,
        id: i64,
        update: &DebitCardUpdate,
    ) -> Result<DebitCard> {
        let current = self.get_debit_card(user_id, id)?;

        let name = match &update.name {
            Some(name) => validate_name(name)?,
            None => current.name,
        };
        let last_four = match &update.number {
            Some(number) => validate_number(number)?,
            None => current.last_four,
        };
        let balance = update.available_balance.unwrap_or(current.available_balance);
        let bank_id = update.bank_id.unwrap_or(current.bank_id);

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if bank_id != current.bank_id {
            ensure_bank_visible(&tx, user_id, bank_id)?;
        }
        ensure_unique_fingerprint(
            &tx,
            CardKind::Debit,
            user_id,
            bank_id,
            &name,
            &last_four,
            Some(id),
        )?;

        tx.execute(
            r#"
            UPDATE debit_cards
            SET bank_id = ?, name = ?, last_four = ?, available_balance = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![bank_id, name, last_four, balance.to_string(), id, user_id],
        )?;
        tx.commit()?;

        self.get_debit_card(user_id, id)
    }

    pub fn delete_debit_card(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE debit_cards SET deleted_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Debit card {}", id)));
        }
        debug!(card_id = id, "Soft deleted debit card");
        Ok(())
    }
}
