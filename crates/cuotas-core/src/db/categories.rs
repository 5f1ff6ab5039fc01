//! Category operations
//!
//! Names are unique per user, case-insensitively, across the user's own
//! categories and the global ones. Soft-deleted rows do not count.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{name_key, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryUpdate, NewCategory};

const CATEGORY_COLUMNS: &str = "id, name, description, user_id, created_at, deleted_at";

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let created_at_str: String = row.get(4)?;
    let deleted_at_str: Option<String> = row.get(5)?;
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
        deleted_at: deleted_at_str.as_deref().map(parse_datetime),
    })
}

/// Fail with NotFound unless the category is live and global or owned
pub(crate) fn ensure_category_visible(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
) -> Result<()> {
    let visible: bool = conn.query_row(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM categories
            WHERE id = ? AND (user_id = ? OR user_id IS NULL) AND deleted_at IS NULL
        )
        "#,
        params![category_id, user_id],
        |row| row.get(0),
    )?;
    if !visible {
        return Err(Error::NotFound(format!("Category {}", category_id)));
    }
    Ok(())
}

fn ensure_name_available(
    conn: &Connection,
    user_id: i64,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        SELECT name FROM categories
        WHERE (user_id = ? OR user_id IS NULL)
          AND deleted_at IS NULL
          AND id != COALESCE(?, -1)
        "#,
    )?;
    let names = stmt
        .query_map(params![user_id, exclude_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let key = name_key(name);
    if names.iter().any(|existing| name_key(existing) == key) {
        return Err(Error::Validation(format!(
            "Category '{}' already exists",
            name
        )));
    }
    Ok(())
}

fn normalized_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Category name is required".into()));
    }
    Ok(name.to_string())
}

impl Database {
    /// Create a category owned by `user_id`
    pub fn create_category(&self, user_id: i64, new: &NewCategory) -> Result<Category> {
        let name = normalized_name(&new.name)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_name_available(&tx, user_id, &name, None)?;

        tx.execute(
            "INSERT INTO categories (name, description, user_id) VALUES (?, ?, ?)",
            params![name, new.description, user_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_category(user_id, id)
    }

    /// List own and global live categories
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM categories
            WHERE (user_id = ? OR user_id IS NULL) AND deleted_at IS NULL
            ORDER BY name COLLATE NOCASE
            "#,
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map(params![user_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a live own or global category
    pub fn get_category(&self, user_id: i64, id: i64) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                r#"
                SELECT {} FROM categories
                WHERE id = ? AND (user_id = ? OR user_id IS NULL) AND deleted_at IS NULL
                "#,
                CATEGORY_COLUMNS
            ),
            params![id, user_id],
            row_to_category,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Category {}", id)))
    }

    /// Update an own category. Global categories are read-only.
    pub fn update_category(
        &self,
        user_id: i64,
        id: i64,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let current = self.get_category(user_id, id)?;
        if current.is_global() {
            return Err(Error::NotFound(format!("Category {}", id)));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let name = match &update.name {
            Some(name) => {
                let name = normalized_name(name)?;
                ensure_name_available(&tx, user_id, &name, Some(id))?;
                name
            }
            None => current.name,
        };
        let description = match &update.description {
            Some(description) => description.clone(),
            None => current.description,
        };

        tx.execute(
            "UPDATE categories SET name = ?, description = ? WHERE id = ? AND user_id = ?",
            params![name, description, id, user_id],
        )?;
        tx.commit()?;

        self.get_category(user_id, id)
    }

    /// Soft delete an own category
    pub fn delete_category(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE categories SET deleted_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Category {}", id)));
        }
        debug!(category_id = id, "Soft deleted category");
        Ok(())
    }

    /// Restore a soft-deleted own category, provided its name is still free
    pub fn restore_category(&self, user_id: i64, id: i64) -> Result<Category> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let name: Option<String> = tx
            .query_row(
                "SELECT name FROM categories WHERE id = ? AND user_id = ? AND deleted_at IS NOT NULL",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or_else(|| Error::NotFound(format!("Deleted category {}", id)))?;

        ensure_name_available(&tx, user_id, name.trim(), Some(id))?;

        tx.execute(
            "UPDATE categories SET deleted_at = NULL WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        tx.commit()?;

        self.get_category(user_id, id)
    }
}
