//! Transaction operations
//!
//! Inserts go through [`Database::insert_transaction`], which reports storage
//! rejections as a typed [`InsertError`] instead of a raw SQLite error.

use std::collections::BTreeSet;

use rusqlite::{ffi, params, ErrorCode, OptionalExtension};
use tracing::debug;

use super::{amount_key, parse_datetime, read_date, read_decimal, Database};
use crate::error::{InsertError, Result};
use crate::models::{NewTransaction, Transaction, TransactionSource};

/// Filters for listing transactions
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub account_id: Option<i64>,
    pub import_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            import_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

const TRANSACTION_COLUMNS: &str = "id, account_id, import_id, date, label, original_label, \
     amount, currency, bank_reference, source, created_at";

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let source_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        import_id: row.get(2)?,
        date: read_date(row, 3)?,
        label: row.get(4)?,
        original_label: row.get(5)?,
        amount: read_decimal(row, 6)?,
        currency: row.get(7)?,
        bank_reference: row.get(8)?,
        source: source_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

/// Column name from messages like "NOT NULL constraint failed: transactions.label"
fn failed_column(message: &str) -> Option<String> {
    let (_, columns) = message.rsplit_once(": ")?;
    let first = columns.split(',').next()?.trim();
    Some(first.rsplit('.').next().unwrap_or(first).to_string())
}

impl Database {
    /// Insert a transaction and attach tags, atomically.
    ///
    /// Either the transaction and all of `tag_ids` are stored, or nothing is.
    /// A dedup key collision is reported as [`InsertError::DuplicateKey`].
    pub fn insert_transaction(
        &self,
        tx: &NewTransaction,
        tag_ids: &BTreeSet<i64>,
    ) -> std::result::Result<i64, InsertError> {
        let mut conn = self.conn()?;
        let db_tx = conn
            .transaction()
            .map_err(|e| InsertError::Storage(e.to_string()))?;

        db_tx
            .execute(
                r#"
                INSERT INTO transactions
                    (account_id, import_id, date, label, original_label, amount,
                     currency, bank_reference, source)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    tx.account_id,
                    tx.import_id,
                    tx.date.to_string(),
                    tx.label,
                    tx.original_label,
                    amount_key(tx.amount),
                    tx.currency,
                    tx.bank_reference,
                    tx.source.as_str(),
                ],
            )
            .map_err(|e| classify_transaction_error(&db_tx, e, tx))?;
        let id = db_tx.last_insert_rowid();

        for tag_id in tag_ids {
            db_tx
                .execute(
                    "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
                    params![id, tag_id],
                )
                .map_err(|e| {
                    classify(e, || {
                        (
                            "tag_id".to_string(),
                            format!("tag {} does not exist", tag_id),
                        )
                    })
                })?;
        }

        db_tx
            .commit()
            .map_err(|e| InsertError::Storage(e.to_string()))?;

        debug!(
            "Inserted transaction {} ({} tags) for account {}",
            id,
            tag_ids.len(),
            tx.account_id
        );
        Ok(id)
    }

    /// Record a hand-entered transaction.
    ///
    /// Subject to the same dedup key as imported rows.
    pub fn create_manual_transaction(
        &self,
        tx: &NewTransaction,
    ) -> std::result::Result<i64, InsertError> {
        if tx.label.trim().is_empty() {
            return Err(InsertError::ConstraintViolation {
                field: "label".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if tx.source != TransactionSource::Manual || tx.import_id.is_some() {
            return Err(InsertError::ConstraintViolation {
                field: "source".to_string(),
                reason: "manual transactions cannot reference an import".to_string(),
            });
        }

        self.insert_transaction(tx, &BTreeSet::new())
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE (?1 IS NULL OR account_id = ?1)
              AND (?2 IS NULL OR import_id = ?2)
            ORDER BY date DESC, id DESC
            LIMIT ?3 OFFSET ?4
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(
                params![filter.account_id, filter.import_id, filter.limit, filter.offset],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions matching a filter (limit/offset ignored)
    pub fn count_transactions(&self, filter: &TransactionFilter) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE (?1 IS NULL OR account_id = ?1)
              AND (?2 IS NULL OR import_id = ?2)
            "#,
            params![filter.account_id, filter.import_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Map a failed transaction insert to a typed error.
///
/// SQLite does not say which foreign key failed, so the account is looked up
/// to tell a vanished account apart from a vanished import.
fn classify_transaction_error(
    conn: &rusqlite::Connection,
    err: rusqlite::Error,
    tx: &NewTransaction,
) -> InsertError {
    classify(err, || {
        let account_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?)",
                params![tx.account_id],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if account_exists {
            (
                "import_id".to_string(),
                format!("import {} does not exist", tx.import_id.unwrap_or_default()),
            )
        } else {
            (
                "account_id".to_string(),
                format!("account {} does not exist", tx.account_id),
            )
        }
    })
}

fn classify<F>(err: rusqlite::Error, foreign_key: F) -> InsertError
where
    F: FnOnce() -> (String, String),
{
    let rusqlite::Error::SqliteFailure(failure, message) = &err else {
        return InsertError::Storage(err.to_string());
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return InsertError::Storage(err.to_string());
    }

    let message = message.clone().unwrap_or_else(|| err.to_string());
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            InsertError::DuplicateKey
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
            let (field, reason) = foreign_key();
            InsertError::ConstraintViolation { field, reason }
        }
        ffi::SQLITE_CONSTRAINT_NOTNULL => InsertError::ConstraintViolation {
            field: failed_column(&message).unwrap_or_else(|| "unknown".to_string()),
            reason: "must not be null".to_string(),
        },
        _ => InsertError::ConstraintViolation {
            field: "transaction".to_string(),
            reason: message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_column() {
        assert_eq!(
            failed_column("NOT NULL constraint failed: transactions.label").as_deref(),
            Some("label")
        );
        assert_eq!(
            failed_column("UNIQUE constraint failed: transactions.account_id, transactions.date")
                .as_deref(),
            Some("account_id")
        );
        assert_eq!(failed_column("no colon here"), None);
    }
}
