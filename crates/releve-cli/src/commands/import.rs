//! Import command implementations

use std::path::Path;

use anyhow::{Context, Result};
use releve_core::db::Database;
use releve_core::models::{Import, ImportStatus, RowDetail, RowOutcome};
use releve_core::{ImportPipeline, ParserRegistry};

use super::{format_amount, resolve_account, truncate};

fn read_file(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))
}

pub fn cmd_detect(file: &Path) -> Result<()> {
    let content = read_file(file)?;
    let registry = ParserRegistry::default();

    match registry.detect_bank(&content) {
        Some(bank) => println!("🏦 {} ({})", bank.display_name(), bank),
        None => {
            println!("❓ Unknown CSV format");
            println!(
                "   Supported banks: {}",
                registry
                    .banks()
                    .iter()
                    .map(|b| b.display_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(())
}

pub fn cmd_import(db: &Database, file: &Path, account: &str, details: bool) -> Result<()> {
    let account = resolve_account(db, account)?;
    let content = read_file(file)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    println!("📥 Importing {} into '{}'...", filename, account.name);

    let registry = ParserRegistry::default();
    let pipeline = ImportPipeline::new(db, &registry);
    let import = pipeline.create_import(account.id, &filename)?;
    let outcome = pipeline.process_import(&import, &content)?;

    match outcome.into_result() {
        Ok(result) => {
            print_import_summary(&result.import);
            if details {
                print_rows(&result.rows);
            }
            Ok(())
        }
        Err(result) => {
            print_import_summary(&result.import);
            anyhow::bail!("Import {} failed", result.import.id)
        }
    }
}

pub fn cmd_imports_list(db: &Database, account: Option<&str>) -> Result<()> {
    let account_id = account
        .map(|a| resolve_account(db, a).map(|acc| acc.id))
        .transpose()?;
    let imports = db.list_imports(account_id)?;

    if imports.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    println!();
    println!("📥 Imports");
    println!("   ─────────────────────────────────────────────────────────────");

    for import in imports {
        let bank = import
            .bank
            .map(|b| b.display_name())
            .unwrap_or("unknown format");
        println!(
            "   [{}] {} │ {} │ {} │ {} {} │ +{} ={} !{}",
            import.id,
            import.created_at.format("%Y-%m-%d %H:%M"),
            status_icon(import.status),
            truncate(&import.filename, 24),
            bank,
            import.status,
            import.rows_imported,
            import.rows_skipped,
            import.rows_errored
        );
    }

    Ok(())
}

pub fn cmd_imports_show(db: &Database, id: i64, rows: bool) -> Result<()> {
    let import = db
        .get_import(id)?
        .ok_or_else(|| anyhow::anyhow!("Import {} not found", id))?;

    println!();
    println!("📥 Import {} - {}", import.id, import.filename);
    println!("   Account: {}", import.account_id);
    if let Some(started) = import.started_at {
        println!("   Started: {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(completed) = import.completed_at {
        println!("   Finished: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    print_import_summary(&import);

    if rows {
        print_rows(&db.get_import_rows(id)?);
    }

    Ok(())
}

fn status_icon(status: ImportStatus) -> &'static str {
    match status {
        ImportStatus::Pending => "⏳",
        ImportStatus::Processing => "🔄",
        ImportStatus::Completed => "✅",
        ImportStatus::Failed => "❌",
    }
}

fn print_import_summary(import: &Import) {
    let bank = import
        .bank
        .map(|b| b.display_name())
        .unwrap_or("unknown");

    println!(
        "{} Import {} {} ({} format)",
        status_icon(import.status),
        import.id,
        import.status,
        bank
    );
    println!("   Rows: {}", import.rows_total);
    println!("   Imported: {}", import.rows_imported);
    println!("   Skipped (duplicates): {}", import.rows_skipped);
    println!("   Errors: {}", import.rows_errored);

    if !import.error_details.is_empty() {
        println!();
        println!("   ⚠️  Errors:");
        for error in &import.error_details {
            if error.row == 0 {
                println!("      {}", error.message);
            } else {
                println!("      row {}: {}", error.row, error.message);
            }
        }
    }
}

fn print_rows(rows: &[RowDetail]) {
    if rows.is_empty() {
        return;
    }

    println!();
    println!("   Row │ Date       │ Amount          │ Status  │ Label");
    println!("   ─────────────────────────────────────────────────────────────");

    for row in rows {
        let status = match &row.outcome {
            RowOutcome::Added => "added".to_string(),
            RowOutcome::Skipped => "skipped".to_string(),
            RowOutcome::Error { error } => format!("error: {}", error),
        };
        let tags = if row.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", row.tags.join(", "))
        };

        println!(
            "   {:>3} │ {} │ {:>15} │ {} │ {}{}",
            row.row_index,
            row.date,
            format_amount(row.amount),
            status,
            truncate(&row.label, 40),
            tags
        );
    }
}
