//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Releve - Import bank statements without duplicates
#[derive(Parser)]
#[command(name = "releve")]
#[command(about = "Bank statement CSV importer with keyword tagging", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "releve.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage accounts (list, add, remove)
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Detect the bank format of a CSV file without importing it
    Detect {
        /// CSV file to inspect
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Import a bank statement CSV into an account
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account ID or name
        #[arg(short, long)]
        account: String,

        /// Print the outcome of every row
        #[arg(long)]
        details: bool,
    },

    /// Inspect past imports
    Imports {
        #[command(subcommand)]
        action: Option<ImportsAction>,
    },

    /// List or add transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage tags (list, add, remove)
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Manage tagging rules (list, add, remove, test)
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts
    List,

    /// Add an account
    Add {
        /// Account name (must be unique)
        name: String,

        /// Bank the account belongs to (boursorama, revolut, caisse_epargne)
        #[arg(short, long)]
        bank: Option<String>,
    },

    /// Remove an account and its transactions
    Remove {
        /// Account ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ImportsAction {
    /// List imports, newest first
    List {
        /// Only imports for this account (ID or name)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show one import
    Show {
        /// Import ID
        id: i64,

        /// Also print the per-row outcomes
        #[arg(long)]
        rows: bool,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List transactions, newest first
    List {
        /// Only this account (ID or name)
        #[arg(short, long)]
        account: Option<String>,

        /// Only transactions from this import
        #[arg(short, long)]
        import: Option<i64>,

        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Record a transaction by hand
    Add {
        /// Account ID or name
        #[arg(short, long)]
        account: String,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Label
        #[arg(short, long)]
        label: String,

        /// Amount, negative for expenses (e.g. -12.34)
        #[arg(long, allow_hyphen_values = true)]
        amount: String,

        /// Currency code
        #[arg(short, long, default_value = "EUR")]
        currency: String,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// List tags
    List,

    /// Add a tag
    Add {
        /// Tag name
        name: String,

        /// Color as #rrggbb
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Remove a tag (its rules go with it)
    Remove {
        /// Tag ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,

    /// Add a keyword rule
    Add {
        /// Case-insensitive substring to look for in labels
        keyword: String,

        /// Tag to assign (name or ID)
        #[arg(short, long)]
        tag: String,

        /// Higher priority rules are evaluated first
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        priority: i64,
    },

    /// Remove a rule
    Remove {
        /// Rule ID
        id: i64,
    },

    /// Show which rules match a label
    Test {
        /// Label to test
        label: String,
    },
}
