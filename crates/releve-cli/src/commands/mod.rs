//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `accounts` - Account commands (list, add, remove)
//! - `core` - Init command and shared utilities (open_db, resolve_account)
//! - `import` - Detect, import and import history commands
//! - `serve` - Web server command
//! - `tags` - Tag and tagging rule commands
//! - `transactions` - Transaction commands (list, manual add)

pub mod accounts;
pub mod core;
pub mod import;
pub mod serve;
pub mod tags;
pub mod transactions;

// Re-export command functions for main.rs
pub use accounts::*;
pub use core::*;
pub use import::*;
pub use serve::*;
pub use tags::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Colored amount: red for expenses, green for income
pub fn format_amount(amount: rust_decimal::Decimal) -> String {
    if amount.is_sign_negative() {
        format!("\x1b[31m{:.2}\x1b[0m", amount)
    } else {
        format!("\x1b[32m+{:.2}\x1b[0m", amount)
    }
}
