//! Account command implementations

use anyhow::Result;
use releve_core::db::Database;
use releve_core::models::Bank;

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts yet. Create one with:");
        println!("  releve accounts add \"Compte courant\" --bank boursorama");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");

    for account in accounts {
        let bank = account
            .bank
            .map(|b| b.display_name().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("   [{}] {} ({})", account.id, account.name, bank);
    }

    Ok(())
}

pub fn cmd_accounts_add(db: &Database, name: &str, bank: Option<&str>) -> Result<()> {
    let bank: Option<Bank> = bank
        .map(|b| b.parse::<Bank>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()?;

    let id = db.create_account(name, bank)?;
    println!("✅ Created account '{}' (id: {})", name.trim(), id);

    Ok(())
}

pub fn cmd_accounts_remove(db: &Database, id: i64) -> Result<()> {
    let account = db
        .get_account(id)?
        .ok_or_else(|| anyhow::anyhow!("Account {} not found", id))?;

    db.delete_account(id)?;
    println!("✅ Removed account '{}' and its transactions", account.name);

    Ok(())
}
