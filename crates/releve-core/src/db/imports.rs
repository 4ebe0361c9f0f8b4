//! Import record operations
//!
//! An import moves `pending -> processing -> completed | failed`. Each step is
//! a conditional update on the current status, so a record can't skip
//! `processing` or be finished twice.

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Bank, Import, ImportStatus, ImportSummary, RowDetail, RowError};

const IMPORT_COLUMNS: &str = "id, account_id, filename, bank, status, rows_total, rows_imported, \
     rows_skipped, rows_errored, error_details, created_at, started_at, completed_at";

fn row_to_import(row: &rusqlite::Row<'_>) -> rusqlite::Result<Import> {
    let bank_str: Option<String> = row.get(3)?;
    let status_str: String = row.get(4)?;
    let error_details_json: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let started_at_str: Option<String> = row.get(11)?;
    let completed_at_str: Option<String> = row.get(12)?;

    let error_details: Vec<RowError> = serde_json::from_str(&error_details_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Import {
        id: row.get(0)?,
        account_id: row.get(1)?,
        filename: row.get(2)?,
        bank: bank_str.and_then(|s| s.parse::<Bank>().ok()),
        status: status_str.parse().unwrap_or_default(),
        rows_total: row.get(5)?,
        rows_imported: row.get(6)?,
        rows_skipped: row.get(7)?,
        rows_errored: row.get(8)?,
        error_details,
        created_at: parse_datetime(&created_at_str),
        started_at: started_at_str.as_deref().map(parse_datetime),
        completed_at: completed_at_str.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// Create a pending import record
    pub fn create_import(&self, account_id: i64, filename: &str) -> Result<Import> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO imports (account_id, filename, status) VALUES (?, ?, ?)",
            params![account_id, filename, ImportStatus::Pending.as_str()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_import(id)?
            .ok_or_else(|| Error::NotFound(format!("Import {} vanished after insert", id)))
    }

    /// Get an import by ID
    pub fn get_import(&self, id: i64) -> Result<Option<Import>> {
        let conn = self.conn()?;
        let import = conn
            .query_row(
                &format!("SELECT {} FROM imports WHERE id = ?", IMPORT_COLUMNS),
                params![id],
                row_to_import,
            )
            .optional()?;
        Ok(import)
    }

    /// List imports, newest first, optionally for one account
    pub fn list_imports(&self, account_id: Option<i64>) -> Result<Vec<Import>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM imports WHERE (?1 IS NULL OR account_id = ?1) ORDER BY id DESC",
            IMPORT_COLUMNS
        ))?;

        let imports = stmt
            .query_map(params![account_id], row_to_import)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(imports)
    }

    /// Per-row outcomes stored with a finished import
    pub fn get_import_rows(&self, id: i64) -> Result<Vec<RowDetail>> {
        let conn = self.conn()?;
        let json: Option<Option<String>> = conn
            .query_row(
                "SELECT row_details FROM imports WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            None => Err(Error::NotFound(format!("Import {} not found", id))),
            Some(None) => Ok(Vec::new()),
            Some(Some(json)) => Ok(serde_json::from_str(&json)?),
        }
    }

    /// Claim a pending import for processing.
    ///
    /// Fails if the import is not pending, which also stops two callers from
    /// processing the same import.
    pub fn mark_import_processing(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE imports
            SET status = ?, started_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = ?
            "#,
            params![
                ImportStatus::Processing.as_str(),
                id,
                ImportStatus::Pending.as_str()
            ],
        )?;

        if updated == 0 {
            return Err(self.transition_error(id, ImportStatus::Processing)?);
        }
        Ok(())
    }

    /// Record the bank format detected for an import
    pub fn set_import_bank(&self, id: i64, bank: Bank) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE imports SET bank = ? WHERE id = ?",
            params![bank.as_str(), id],
        )?;
        Ok(())
    }

    /// Write the terminal state of a processing import in one update
    pub fn finish_import(&self, id: i64, summary: &ImportSummary) -> Result<Import> {
        if !summary.status.is_terminal() {
            return Err(Error::Import(format!(
                "Cannot finish import {} with non-terminal status {}",
                id, summary.status
            )));
        }

        let error_details = serde_json::to_string(&summary.error_details)?;
        let row_details = serde_json::to_string(&summary.rows)?;

        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE imports SET
                status = ?,
                rows_total = ?,
                rows_imported = ?,
                rows_skipped = ?,
                rows_errored = ?,
                error_details = ?,
                row_details = ?,
                completed_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = ?
            "#,
            params![
                summary.status.as_str(),
                summary.rows_total(),
                summary.rows_imported,
                summary.rows_skipped,
                summary.rows_errored,
                error_details,
                row_details,
                id,
                ImportStatus::Processing.as_str(),
            ],
        )?;
        drop(conn);

        if updated == 0 {
            return Err(self.transition_error(id, summary.status)?);
        }

        self.get_import(id)?
            .ok_or_else(|| Error::NotFound(format!("Import {} not found", id)))
    }

    fn transition_error(&self, id: i64, target: ImportStatus) -> Result<Error> {
        Ok(match self.get_import(id)? {
            None => Error::NotFound(format!("Import {} not found", id)),
            Some(import) => Error::Import(format!(
                "Import {} is {}, cannot move to {}",
                id, import.status, target
            )),
        })
    }
}
