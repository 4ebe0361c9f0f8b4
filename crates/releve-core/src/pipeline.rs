//! Import pipeline
//!
//! Drives one import from `pending` to a terminal state:
//! strip BOM, detect the bank, parse, then tag and insert each row, recording
//! what happened to it. Unknown formats and structural parse errors fail the
//! import; rows rejected by storage are counted and reported but the import
//! still completes.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, InsertError, Result};
use crate::import::{header_line, strip_bom, ParserRegistry};
use crate::models::{
    Bank, Import, ImportOutcome, ImportResult, ImportStatus, ImportSummary, NewTransaction,
    RowDetail, RowOutcome,
};
use crate::tags::TagRuleMatcher;

/// Longest header excerpt quoted in an unknown-format message
const HEADER_EXCERPT_CHARS: usize = 80;

pub struct ImportPipeline<'a> {
    db: &'a Database,
    registry: &'a ParserRegistry,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(db: &'a Database, registry: &'a ParserRegistry) -> Self {
        Self { db, registry }
    }

    /// Create a pending import for an existing account
    pub fn create_import(&self, account_id: i64, filename: &str) -> Result<Import> {
        if self.db.get_account(account_id)?.is_none() {
            return Err(Error::NotFound(format!("Account {} not found", account_id)));
        }
        let import = self.db.create_import(account_id, filename)?;
        debug!("Created import {} for account {}", import.id, account_id);
        Ok(import)
    }

    /// Bank whose format `content` matches, if any
    pub fn detect_bank(&self, content: &[u8]) -> Option<Bank> {
        self.registry.detect_bank(content)
    }

    /// Run a pending import to completion.
    ///
    /// Returns `Err` only when the import record itself cannot be driven
    /// (not pending, or the database is unavailable). Bad content ends as
    /// [`ImportOutcome::Failed`] with the reasons in `error_details`. Once
    /// the import is claimed it always ends terminal: a storage failure
    /// mid-run marks it failed before the error is returned.
    pub fn process_import(&self, import: &Import, content: &[u8]) -> Result<ImportOutcome> {
        self.db.mark_import_processing(import.id)?;
        info!(
            "Processing import {} ({}) for account {}",
            import.id, import.filename, import.account_id
        );

        match self.run(import, content) {
            Ok(summary) => self.finish(import.id, summary),
            Err(e) => {
                warn!("Import {} aborted: {}", import.id, e);
                let summary = ImportSummary::failed(format!("Import aborted: {}", e), Vec::new());
                if let Err(finish_err) = self.db.finish_import(import.id, &summary) {
                    warn!(
                        "Import {}: could not record failure: {}",
                        import.id, finish_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Everything after the claim; the caller finalizes the summary
    fn run(&self, import: &Import, content: &[u8]) -> Result<ImportSummary> {
        let content = strip_bom(content);

        let Some(parser) = self.registry.detect(content) else {
            let mut header: String = header_line(content).chars().take(HEADER_EXCERPT_CHARS).collect();
            if header.is_empty() {
                header = "<empty file>".to_string();
            }
            warn!("Import {}: unknown CSV format", import.id);
            return Ok(ImportSummary::failed(
                format!("Unknown CSV format: {}", header),
                Vec::new(),
            ));
        };

        let bank = parser.bank();
        self.db.set_import_bank(import.id, bank)?;

        let rows = match parser.parse(content) {
            Ok(rows) => rows,
            Err(failed) => {
                warn!(
                    "Import {}: {} rejected {} row(s)",
                    import.id,
                    bank.display_name(),
                    failed.errors.len()
                );
                return Ok(ImportSummary::failed(
                    format!("Parse failed ({}): {}", bank.display_name(), failed),
                    failed.errors,
                ));
            }
        };

        let matcher = TagRuleMatcher::from_db(self.db)?;
        let tag_names: HashMap<i64, String> = self
            .db
            .list_tags()?
            .into_iter()
            .map(|tag| (tag.id, tag.name))
            .collect();

        let mut summary = ImportSummary {
            status: ImportStatus::Completed,
            ..Default::default()
        };

        for row in &rows {
            let tag_ids = matcher.match_label(&row.label);
            let tx = NewTransaction::from_row(row, import.account_id, import.id);

            let outcome = match self.db.insert_transaction(&tx, &tag_ids) {
                Ok(_) => RowOutcome::Added,
                Err(InsertError::DuplicateKey) => RowOutcome::Skipped,
                Err(e) => {
                    warn!("Import {}: row {} rejected: {}", import.id, row.line, e);
                    RowOutcome::Error {
                        error: e.to_string(),
                    }
                }
            };

            summary.record(RowDetail {
                row_index: row.line,
                date: row.date,
                label: row.label.clone(),
                amount: row.amount,
                tags: resolve_tag_names(&tag_ids, &tag_names),
                outcome,
            });
        }

        info!(
            "Import {} ({}): {} added, {} skipped, {} errored",
            import.id,
            bank.display_name(),
            summary.rows_imported,
            summary.rows_skipped,
            summary.rows_errored
        );

        Ok(summary)
    }

    fn finish(&self, import_id: i64, summary: ImportSummary) -> Result<ImportOutcome> {
        let import = self.db.finish_import(import_id, &summary)?;
        let status = import.status;
        let result = ImportResult {
            import,
            rows: summary.rows,
        };

        Ok(match status {
            ImportStatus::Completed => ImportOutcome::Completed(result),
            ImportStatus::Failed => ImportOutcome::Failed(result),
            ImportStatus::Pending | ImportStatus::Processing => {
                return Err(Error::Import(format!(
                    "Import {} left in {} state",
                    import_id, status
                )))
            }
        })
    }
}

fn resolve_tag_names(tag_ids: &BTreeSet<i64>, names: &HashMap<i64, String>) -> Vec<String> {
    tag_ids
        .iter()
        .filter_map(|id| names.get(id).cloned())
        .collect()
}
