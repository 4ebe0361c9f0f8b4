//! Transaction command implementations

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use releve_core::db::{Database, TransactionFilter};
use releve_core::models::NewTransaction;
use rust_decimal::Decimal;

use super::{format_amount, resolve_account, truncate};

pub fn cmd_transactions_list(
    db: &Database,
    account: Option<&str>,
    import_id: Option<i64>,
    limit: i64,
) -> Result<()> {
    let account_id = account
        .map(|a| resolve_account(db, a).map(|acc| acc.id))
        .transpose()?;

    let filter = TransactionFilter {
        account_id,
        import_id,
        limit,
        offset: 0,
    };
    let transactions = db.list_transactions(&filter)?;

    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  releve import --file releve.csv --account \"Compte courant\"");
        return Ok(());
    }

    let total = db.count_transactions(&filter)?;

    println!();
    println!("📝 Transactions ({} of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let tags = db.get_transaction_tags(tx.id)?;
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(
                " [{}]",
                tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
            )
        };

        println!(
            "   {} │ {:>12} {} │ {}{}",
            tx.date,
            format_amount(tx.amount),
            tx.currency,
            truncate(&tx.label, 40),
            tags
        );
    }

    Ok(())
}

pub fn cmd_transactions_add(
    db: &Database,
    account: &str,
    date: &str,
    label: &str,
    amount: &str,
    currency: &str,
) -> Result<()> {
    let account = resolve_account(db, account)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", date))?;
    let amount = Decimal::from_str(amount.trim())
        .with_context(|| format!("Invalid amount '{}'", amount))?;

    let tx = NewTransaction::manual(account.id, date, label.trim(), amount, &currency.to_uppercase());
    let id = db.create_manual_transaction(&tx)?;

    println!(
        "✅ Added transaction {} to '{}': {} {} {}",
        id,
        account.name,
        date,
        format_amount(amount),
        tx.label
    );

    Ok(())
}
