//! Releve Core Library
//!
//! Shared functionality for the Releve bank statement importer:
//! - Database access and migrations
//! - CSV parsers for Boursorama, Revolut and Caisse d'Epargne exports
//! - Keyword tagging rules
//! - The import pipeline that ties them together

pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod pipeline;
pub mod tags;

pub use db::{Database, TransactionFilter};
pub use error::{Error, InsertError, Result};
pub use import::{BankParser, ParseFailed, ParserRegistry};
pub use pipeline::ImportPipeline;
pub use tags::TagRuleMatcher;
