//! Data models for Releve

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency assumed when a statement format has no currency column
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Banks whose CSV exports can be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bank {
    Boursorama,
    Revolut,
    CaisseEpargne,
}

impl Bank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boursorama => "boursorama",
            Self::Revolut => "revolut",
            Self::CaisseEpargne => "caisse_epargne",
        }
    }

    /// Human-readable bank name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Boursorama => "Boursorama",
            Self::Revolut => "Revolut",
            Self::CaisseEpargne => "Caisse d'Epargne",
        }
    }
}

impl std::str::FromStr for Bank {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boursorama" | "boursobank" => Ok(Self::Boursorama),
            "revolut" => Ok(Self::Revolut),
            "caisse_epargne" | "caisseepargne" | "caisse-epargne" => Ok(Self::CaisseEpargne),
            _ => Err(format!("Unknown bank: {}", s)),
        }
    }
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account that owns transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub bank: Option<Bank>,
    pub created_at: DateTime<Utc>,
}

/// Transaction source - how it was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// Imported from a bank CSV
    #[default]
    CsvImport,
    /// Entered by hand
    Manual,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvImport => "csv_import",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "csv_import" => Ok(Self::CsvImport),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

/// One parsed statement line, normalized across bank formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub date: NaiveDate,
    /// Display label
    pub label: String,
    /// Label exactly as the bank wrote it; part of the dedup key
    pub original_label: String,
    /// Negative = expense, positive = income
    pub amount: Decimal,
    pub currency: String,
    pub bank_reference: Option<String>,
    /// Physical line in the source file, header being line 1.
    /// Every row expanded from one record shares its line.
    pub line: usize,
}

/// Attributes of a transaction about to be stored
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub import_id: Option<i64>,
    pub date: NaiveDate,
    pub label: String,
    pub original_label: String,
    pub amount: Decimal,
    pub currency: String,
    pub bank_reference: Option<String>,
    pub source: TransactionSource,
}

impl NewTransaction {
    /// Build the stored shape of an imported row
    pub fn from_row(row: &Row, account_id: i64, import_id: i64) -> Self {
        Self {
            account_id,
            import_id: Some(import_id),
            date: row.date,
            label: row.label.clone(),
            original_label: row.original_label.clone(),
            amount: row.amount,
            currency: row.currency.clone(),
            bank_reference: row.bank_reference.clone(),
            source: TransactionSource::CsvImport,
        }
    }

    /// A hand-entered transaction; its label doubles as the original label
    pub fn manual(
        account_id: i64,
        date: NaiveDate,
        label: &str,
        amount: Decimal,
        currency: &str,
    ) -> Self {
        Self {
            account_id,
            import_id: None,
            date,
            label: label.to_string(),
            original_label: label.to_string(),
            amount,
            currency: currency.to_string(),
            bank_reference: None,
            source: TransactionSource::Manual,
        }
    }
}

/// A stored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub import_id: Option<i64>,
    pub date: NaiveDate,
    pub label: String,
    pub original_label: String,
    pub amount: Decimal,
    pub currency: String,
    pub bank_reference: Option<String>,
    pub source: TransactionSource,
    pub created_at: DateTime<Utc>,
}

/// Transaction plus the tags attached to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionWithTags {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub tags: Vec<Tag>,
}

/// Classification tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Keyword rule that auto-assigns a tag to matching labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingRule {
    pub id: i64,
    /// Case-insensitive substring
    pub keyword: String,
    pub tag_id: i64,
    /// Higher is evaluated first
    pub priority: i64,
    pub created_at: DateTime<Utc>,
}

/// Rule joined with the name of the tag it assigns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingRuleWithTag {
    #[serde(flatten)]
    pub rule: TaggingRule,
    pub tag_name: String,
}

/// Import lifecycle: pending -> processing -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Pending | Self::Processing => false,
            Self::Completed | Self::Failed => true,
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown import status: {}", s)),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure tied to a CSV row (header is row 1; row 0 is a file-level summary)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

/// What happened to one parsed row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    Added,
    /// Dedup key already present
    Skipped,
    Error { error: String },
}

/// Per-row report entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDetail {
    pub row_index: usize,
    pub date: NaiveDate,
    pub label: String,
    pub amount: Decimal,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

/// A persisted import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub id: i64,
    pub account_id: i64,
    pub filename: String,
    /// Format detected while processing
    pub bank: Option<Bank>,
    pub status: ImportStatus,
    pub rows_total: i64,
    pub rows_imported: i64,
    pub rows_skipped: i64,
    pub rows_errored: i64,
    pub error_details: Vec<RowError>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Final state written to an import in one update
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub status: ImportStatus,
    pub rows_imported: i64,
    pub rows_skipped: i64,
    pub rows_errored: i64,
    pub error_details: Vec<RowError>,
    pub rows: Vec<RowDetail>,
}

impl ImportSummary {
    /// Summary of a run that never got past detection or parsing.
    ///
    /// Counters stay at zero; `summary` becomes the row-0 entry ahead of
    /// any per-row parse errors.
    pub fn failed(summary: impl Into<String>, errors: Vec<RowError>) -> Self {
        let mut error_details = Vec::with_capacity(errors.len() + 1);
        error_details.push(RowError::new(0, summary));
        error_details.extend(errors);

        Self {
            status: ImportStatus::Failed,
            error_details,
            ..Default::default()
        }
    }

    /// Fold one row's outcome into the counters
    pub fn record(&mut self, detail: RowDetail) {
        match &detail.outcome {
            RowOutcome::Added => self.rows_imported += 1,
            RowOutcome::Skipped => self.rows_skipped += 1,
            RowOutcome::Error { error } => {
                self.rows_errored += 1;
                self.error_details
                    .push(RowError::new(detail.row_index, error.clone()));
            }
        }
        self.rows.push(detail);
    }

    pub fn rows_total(&self) -> i64 {
        self.rows_imported + self.rows_skipped + self.rows_errored
    }
}

/// An import as returned to callers, with its per-row report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(flatten)]
    pub import: Import,
    pub rows: Vec<RowDetail>,
}

/// Terminal result of processing an import
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Completed(ImportResult),
    Failed(ImportResult),
}

impl ImportOutcome {
    pub fn result(&self) -> &ImportResult {
        match self {
            Self::Completed(result) | Self::Failed(result) => result,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// `Ok` for a completed import, `Err` for a failed one
    pub fn into_result(self) -> std::result::Result<ImportResult, ImportResult> {
        match self {
            Self::Completed(result) => Ok(result),
            Self::Failed(result) => Err(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn detail(row_index: usize, outcome: RowOutcome) -> RowDetail {
        RowDetail {
            row_index,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            label: "CARREFOUR".to_string(),
            amount: Decimal::from_str("-12.34").unwrap(),
            tags: vec![],
            outcome,
        }
    }

    #[test]
    fn test_bank_from_str_aliases() {
        assert_eq!(Bank::from_str("Boursorama").unwrap(), Bank::Boursorama);
        assert_eq!(Bank::from_str("caisse-epargne").unwrap(), Bank::CaisseEpargne);
        assert_eq!(
            Bank::from_str(Bank::Revolut.as_str()).unwrap(),
            Bank::Revolut
        );
        assert!(Bank::from_str("chase").is_err());
    }

    #[test]
    fn test_import_status_terminal() {
        assert!(!ImportStatus::Pending.is_terminal());
        assert!(!ImportStatus::Processing.is_terminal());
        assert!(ImportStatus::Completed.is_terminal());
        assert!(ImportStatus::Failed.is_terminal());
    }

    #[test]
    fn test_row_detail_json_shape() {
        let json = serde_json::to_value(detail(
            3,
            RowOutcome::Error {
                error: "account_id: missing".to_string(),
            },
        ))
        .unwrap();

        assert_eq!(json["row_index"], 3);
        assert_eq!(json["amount"], "-12.34");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "account_id: missing");

        let added = serde_json::to_value(detail(2, RowOutcome::Added)).unwrap();
        assert_eq!(added["status"], "added");
        assert!(added.get("error").is_none());

        let back: RowDetail = serde_json::from_value(json).unwrap();
        assert!(matches!(back.outcome, RowOutcome::Error { .. }));
    }

    #[test]
    fn test_summary_record_keeps_totals_consistent() {
        let mut summary = ImportSummary {
            status: ImportStatus::Completed,
            ..Default::default()
        };
        summary.record(detail(2, RowOutcome::Added));
        summary.record(detail(3, RowOutcome::Skipped));
        summary.record(detail(
            4,
            RowOutcome::Error {
                error: "boom".to_string(),
            },
        ));

        assert_eq!(summary.rows_total(), 3);
        assert_eq!(summary.rows_imported, 1);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.rows_errored, 1);
        assert_eq!(summary.error_details, vec![RowError::new(4, "boom")]);
        assert_eq!(summary.rows.len(), 3);
    }

    #[test]
    fn test_failed_summary_seeds_row_zero() {
        let summary = ImportSummary::failed(
            "Parse failed",
            vec![RowError::new(3, "Invalid date: 31/02/2024")],
        );

        assert_eq!(summary.status, ImportStatus::Failed);
        assert_eq!(summary.rows_total(), 0);
        assert_eq!(summary.error_details[0], RowError::new(0, "Parse failed"));
        assert_eq!(summary.error_details[1].row, 3);
    }
}
