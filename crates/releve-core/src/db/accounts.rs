//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, Bank};

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let bank_str: Option<String> = row.get(2)?;
    let created_at_str: String = row.get(3)?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        bank: bank_str.and_then(|s| s.parse().ok()),
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create an account; names are unique
    pub fn create_account(&self, name: &str, bank: Option<Bank>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Account name cannot be empty".into()));
        }

        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?)",
            params![name],
            |row| row.get(0),
        )?;
        if exists {
            return Err(Error::InvalidData(format!(
                "Account '{}' already exists",
                name
            )));
        }

        conn.execute(
            "INSERT INTO accounts (name, bank) VALUES (?, ?)",
            params![name, bank.map(|b| b.as_str())],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, bank, created_at FROM accounts ORDER BY name")?;

        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name, bank, created_at FROM accounts WHERE id = ?",
                params![id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Get an account by exact name
    pub fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name, bank, created_at FROM accounts WHERE name = ?",
                params![name],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Delete an account and its transactions.
    ///
    /// Import records are kept; their `account_id` simply stops resolving.
    pub fn delete_account(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM accounts WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
