//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Bank account operations
//! - `transactions` - Transaction inserts, dedup key enforcement and listing
//! - `tags` - Tags, tagging rules and transaction-tag associations
//! - `imports` - Import records and their lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

mod accounts;
mod imports;
mod tags;
mod transactions;

#[cfg(test)]
mod tests;

pub use transactions::TransactionFilter;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Read a DATE column stored as `YYYY-MM-DD`
pub(crate) fn read_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read an amount stored as canonical decimal text
pub(crate) fn read_decimal(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    Decimal::from_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Canonical text form of an amount, so 12.30 and 12.3 share a dedup key
pub(crate) fn amount_key(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys and busy timeout are per-connection settings in SQLite
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "releve_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path
            .to_str()
            .ok_or_else(|| Error::InvalidData("Temp path is not valid UTF-8".into()))?
            .to_string();

        // Remove leftovers from an earlier run with the same pid
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the import writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                bank TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Imports (one row per uploaded statement)
            -- account_id is not a foreign key; history survives account deletion
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                bank TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
                rows_total INTEGER NOT NULL DEFAULT 0 CHECK (rows_total >= 0),
                rows_imported INTEGER NOT NULL DEFAULT 0 CHECK (rows_imported >= 0),
                rows_skipped INTEGER NOT NULL DEFAULT 0 CHECK (rows_skipped >= 0),
                rows_errored INTEGER NOT NULL DEFAULT 0 CHECK (rows_errored >= 0),
                error_details TEXT NOT NULL DEFAULT '[]',  -- JSON [{row, message}]
                row_details TEXT,                          -- JSON per-row outcomes
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                started_at DATETIME,
                completed_at DATETIME,
                CHECK (
                    status NOT IN ('completed', 'failed')
                    OR rows_total = rows_imported + rows_skipped + rows_errored
                )
            );

            CREATE INDEX IF NOT EXISTS idx_imports_account ON imports(account_id);

            -- Transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                import_id INTEGER REFERENCES imports(id) ON DELETE SET NULL,
                date DATE NOT NULL,
                label TEXT NOT NULL,
                original_label TEXT NOT NULL,
                amount TEXT NOT NULL,                      -- canonical decimal text
                currency TEXT NOT NULL DEFAULT 'EUR',
                bank_reference TEXT,
                source TEXT NOT NULL DEFAULT 'csv_import'
                    CHECK (source IN ('csv_import', 'manual')),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Dedup key
            CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_natural_key
                ON transactions(account_id, date, amount, original_label);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_import ON transactions(import_id);

            -- Tags
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                color TEXT NOT NULL DEFAULT '#6b7280',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Transaction-Tag junction (many-to-many)
            CREATE TABLE IF NOT EXISTS transaction_tags (
                transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (transaction_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_transaction_tags_tag ON transaction_tags(tag_id);

            -- Tagging rules (keyword -> tag)
            CREATE TABLE IF NOT EXISTS tagging_rules (
                id INTEGER PRIMARY KEY,
                keyword TEXT NOT NULL CHECK (length(trim(keyword)) > 0),
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                priority INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_tagging_rules_tag ON tagging_rules(tag_id);
            CREATE INDEX IF NOT EXISTS idx_tagging_rules_priority ON tagging_rules(priority DESC);
            "#,
        )?;

        debug!("Migrations applied to {}", self.db_path);
        Ok(())
    }
}
