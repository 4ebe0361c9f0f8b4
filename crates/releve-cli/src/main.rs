//! Releve CLI - Bank statement importer
//!
//! Usage:
//!   releve init                                  Initialize database
//!   releve accounts add "Compte courant"         Create an account
//!   releve import --file CSV --account NAME      Import a statement (bank auto-detected)
//!   releve serve --port 3000                     Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add { name, bank }) => {
                    commands::cmd_accounts_add(&db, &name, bank.as_deref())
                }
                Some(AccountsAction::Remove { id }) => commands::cmd_accounts_remove(&db, id),
            }
        }
        Commands::Detect { file } => commands::cmd_detect(&file),
        Commands::Import {
            file,
            account,
            details,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &file, &account, details)
        }
        Commands::Imports { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_imports_list(&db, None),
                Some(ImportsAction::List { account }) => {
                    commands::cmd_imports_list(&db, account.as_deref())
                }
                Some(ImportsAction::Show { id, rows }) => commands::cmd_imports_show(&db, id, rows),
            }
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_transactions_list(&db, None, None, 20),
                Some(TransactionsAction::List {
                    account,
                    import,
                    limit,
                }) => commands::cmd_transactions_list(&db, account.as_deref(), import, limit),
                Some(TransactionsAction::Add {
                    account,
                    date,
                    label,
                    amount,
                    currency,
                }) => commands::cmd_transactions_add(&db, &account, &date, &label, &amount, &currency),
            }
        }
        Commands::Tags { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(TagsAction::List) => commands::cmd_tags_list(&db),
                Some(TagsAction::Add { name, color }) => {
                    commands::cmd_tags_add(&db, &name, color.as_deref())
                }
                Some(TagsAction::Remove { id }) => commands::cmd_tags_remove(&db, id),
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&db),
                Some(RulesAction::Add {
                    keyword,
                    tag,
                    priority,
                }) => commands::cmd_rules_add(&db, &keyword, &tag, priority),
                Some(RulesAction::Remove { id }) => commands::cmd_rules_remove(&db, id),
                Some(RulesAction::Test { label }) => commands::cmd_rules_test(&db, &label),
            }
        }
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port).await,
    }
}
