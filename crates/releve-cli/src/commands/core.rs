//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `resolve_account` - Look up an account given on the command line
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use releve_core::db::Database;
use releve_core::models::Account;

/// Open (and migrate) the database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

/// Find an account by numeric ID, falling back to its name
pub fn resolve_account(db: &Database, id_or_name: &str) -> Result<Account> {
    if let Ok(id) = id_or_name.parse::<i64>() {
        if let Some(account) = db.get_account(id)? {
            return Ok(account);
        }
    }

    db.get_account_by_name(id_or_name)?
        .ok_or_else(|| anyhow::anyhow!("Account not found: {}", id_or_name))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;

    println!("✅ Database initialized at {}", db.path());
    println!();
    println!("Next steps:");
    println!("  1. Create an account: releve accounts add \"Compte courant\"");
    println!("  2. Import a statement: releve import --file releve.csv --account \"Compte courant\"");
    println!("  3. Start web UI: releve serve");

    Ok(())
}
