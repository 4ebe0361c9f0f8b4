//! Database tests

use super::*;
use crate::error::InsertError;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_tx(account_id: i64, label: &str, value: &str) -> NewTransaction {
        NewTransaction::manual(account_id, date(2024, 3, 1), label, amount(value), "EUR")
    }

    fn processing_import(db: &Database, account_id: i64) -> Import {
        let import = db.create_import(account_id, "releve.csv").unwrap();
        db.mark_import_processing(import.id).unwrap();
        import
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_accounts().unwrap().is_empty());
        assert!(db.list_tags().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_keys_enabled_on_every_connection() {
        let db = Database::in_memory().unwrap();
        let a = db.conn().unwrap();
        let b = db.conn().unwrap();

        for conn in [&a, &b] {
            let enabled: i64 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(enabled, 1);
        }
    }

    #[test]
    fn test_account_crud() {
        let db = Database::in_memory().unwrap();

        let id = db.create_account("Compte joint", Some(Bank::Boursorama)).unwrap();
        assert!(id > 0);

        let account = db.get_account(id).unwrap().unwrap();
        assert_eq!(account.name, "Compte joint");
        assert_eq!(account.bank, Some(Bank::Boursorama));

        let by_name = db.get_account_by_name("Compte joint").unwrap().unwrap();
        assert_eq!(by_name.id, id);

        assert!(db.create_account("Compte joint", None).is_err());
        assert!(db.create_account("   ", None).is_err());

        assert!(db.delete_account(id).unwrap());
        assert!(!db.delete_account(id).unwrap());
        assert!(db.get_account(id).unwrap().is_none());
    }

    #[test]
    fn test_tag_crud() {
        let db = Database::in_memory().unwrap();

        let id = db.create_tag("Courses", Some("#10b981")).unwrap();
        let tag = db.get_tag(id).unwrap().unwrap();
        assert_eq!(tag.color, "#10b981");

        let other = db.create_tag("Transport", None).unwrap();
        assert_eq!(db.get_tag(other).unwrap().unwrap().color, "#6b7280");

        assert!(matches!(db.create_tag("courses", None), Err(Error::Tag(_))));
        assert!(matches!(db.create_tag("Loisirs", Some("red")), Err(Error::Tag(_))));

        let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Courses", "Transport"]);

        assert!(db.delete_tag(id).unwrap());
        assert!(db.get_tag_by_name("Courses").unwrap().is_none());
    }

    #[test]
    fn test_tagging_rules_ordered_by_priority() {
        let db = Database::in_memory().unwrap();
        let tag = db.create_tag("Courses", None).unwrap();

        let low = db.create_tagging_rule("carre", tag, 5).unwrap();
        let high = db.create_tagging_rule("carrefour", tag, 10).unwrap();

        let rules = db.list_tagging_rules().unwrap();
        let ids: Vec<i64> = rules.iter().map(|r| r.rule.id).collect();
        assert_eq!(ids, vec![high, low]);
        assert_eq!(rules[0].tag_name, "Courses");

        assert!(matches!(
            db.create_tagging_rule("x", 999, 0),
            Err(Error::NotFound(_))
        ));
        assert!(db.create_tagging_rule("  ", tag, 0).is_err());

        // Deleting the tag drops its rules
        db.delete_tag(tag).unwrap();
        assert!(db.list_tagging_rules().unwrap().is_empty());
    }

    #[test]
    fn test_insert_transaction_with_tags() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();
        let a = db.create_tag("A", None).unwrap();
        let b = db.create_tag("B", None).unwrap();

        let id = db
            .insert_transaction(&new_tx(account, "CARREFOUR", "-12.34"), &BTreeSet::from([a, b]))
            .unwrap();

        let tx = db.get_transaction(id).unwrap().unwrap();
        assert_eq!(tx.amount, amount("-12.34"));
        assert_eq!(tx.date, date(2024, 3, 1));
        assert_eq!(tx.source, TransactionSource::Manual);

        let tags: Vec<String> = db
            .get_transaction_tags(id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tags, vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_key_is_typed() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();

        db.insert_transaction(&new_tx(account, "SNCF", "-45.00"), &BTreeSet::new())
            .unwrap();

        // 45.0 and 45.00 are the same amount
        let err = db
            .insert_transaction(&new_tx(account, "SNCF", "-45.0"), &BTreeSet::new())
            .unwrap_err();
        assert_eq!(err, InsertError::DuplicateKey);

        // A different original label is a different transaction
        db.insert_transaction(&new_tx(account, "SNCF (fee)", "-45.00"), &BTreeSet::new())
            .unwrap();
    }

    #[test]
    fn test_missing_account_is_constraint_violation() {
        let db = Database::in_memory().unwrap();

        let err = db
            .insert_transaction(&new_tx(42, "EDF", "-60.00"), &BTreeSet::new())
            .unwrap_err();
        assert_eq!(
            err,
            InsertError::ConstraintViolation {
                field: "account_id".to_string(),
                reason: "account 42 does not exist".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_tag_rolls_back_insert() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();

        let err = db
            .insert_transaction(&new_tx(account, "EDF", "-60.00"), &BTreeSet::from([777]))
            .unwrap_err();
        assert!(matches!(
            err,
            InsertError::ConstraintViolation { ref field, .. } if field == "tag_id"
        ));

        let filter = TransactionFilter {
            account_id: Some(account),
            ..Default::default()
        };
        assert_eq!(db.count_transactions(&filter).unwrap(), 0);
    }

    #[test]
    fn test_manual_transaction_validation() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();

        let id = db
            .create_manual_transaction(&new_tx(account, "Loyer", "-800"))
            .unwrap();
        assert_eq!(db.get_transaction(id).unwrap().unwrap().original_label, "Loyer");

        let err = db
            .create_manual_transaction(&new_tx(account, "  ", "-1"))
            .unwrap_err();
        assert!(matches!(err, InsertError::ConstraintViolation { ref field, .. } if field == "label"));

        let mut imported = new_tx(account, "Loyer", "-900");
        imported.source = TransactionSource::CsvImport;
        assert!(db.create_manual_transaction(&imported).is_err());
    }

    #[test]
    fn test_list_transactions_filters_and_pages() {
        let db = Database::in_memory().unwrap();
        let a = db.create_account("A", None).unwrap();
        let b = db.create_account("B", None).unwrap();

        for i in 1..=5 {
            let mut tx = new_tx(a, &format!("TX {}", i), "-1");
            tx.date = date(2024, 1, i);
            db.insert_transaction(&tx, &BTreeSet::new()).unwrap();
        }
        db.insert_transaction(&new_tx(b, "OTHER", "-1"), &BTreeSet::new())
            .unwrap();

        let filter = TransactionFilter {
            account_id: Some(a),
            limit: 2,
            offset: 1,
            ..Default::default()
        };
        let page = db.list_transactions(&filter).unwrap();
        let labels: Vec<&str> = page.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["TX 4", "TX 3"]);
        assert_eq!(db.count_transactions(&filter).unwrap(), 5);

        assert_eq!(
            db.count_transactions(&TransactionFilter::default()).unwrap(),
            6
        );
    }

    #[test]
    fn test_import_lifecycle() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();

        let import = db.create_import(account, "mars.csv").unwrap();
        assert_eq!(import.status, ImportStatus::Pending);
        assert!(import.started_at.is_none());

        db.mark_import_processing(import.id).unwrap();
        db.set_import_bank(import.id, Bank::Revolut).unwrap();

        let processing = db.get_import(import.id).unwrap().unwrap();
        assert_eq!(processing.status, ImportStatus::Processing);
        assert_eq!(processing.bank, Some(Bank::Revolut));
        assert!(processing.started_at.is_some());

        let mut summary = ImportSummary {
            status: ImportStatus::Completed,
            ..Default::default()
        };
        summary.record(RowDetail {
            row_index: 2,
            date: date(2024, 3, 1),
            label: "Monoprix".to_string(),
            amount: amount("-18.40"),
            tags: vec!["Courses".to_string()],
            outcome: RowOutcome::Added,
        });
        summary.record(RowDetail {
            row_index: 3,
            date: date(2024, 3, 2),
            label: "Uber".to_string(),
            amount: amount("-12"),
            tags: vec![],
            outcome: RowOutcome::Error {
                error: "account_id: account 1 does not exist".to_string(),
            },
        });

        let finished = db.finish_import(import.id, &summary).unwrap();
        assert_eq!(finished.status, ImportStatus::Completed);
        assert_eq!(finished.rows_total, 2);
        assert_eq!(finished.rows_imported, 1);
        assert_eq!(finished.rows_errored, 1);
        assert_eq!(finished.error_details, vec![RowError::new(3, "account_id: account 1 does not exist")]);
        assert!(finished.completed_at.is_some());

        let rows = db.get_import_rows(import.id).unwrap();
        assert_eq!(rows, summary.rows);
    }

    #[test]
    fn test_import_transitions_are_guarded() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();
        let import = db.create_import(account, "a.csv").unwrap();

        // Cannot finish without processing first
        let summary = ImportSummary::failed("Unknown CSV format", vec![]);
        assert!(matches!(db.finish_import(import.id, &summary), Err(Error::Import(_))));

        db.mark_import_processing(import.id).unwrap();
        assert!(matches!(db.mark_import_processing(import.id), Err(Error::Import(_))));

        let failed = db.finish_import(import.id, &summary).unwrap();
        assert_eq!(failed.status, ImportStatus::Failed);
        assert_eq!(failed.rows_total, 0);
        assert_eq!(failed.error_details[0].row, 0);

        // Terminal states are final
        assert!(db.finish_import(import.id, &summary).is_err());

        assert!(matches!(db.mark_import_processing(9999), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_finish_import_rejects_non_terminal_status() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();
        let import = processing_import(&db, account);

        let summary = ImportSummary {
            status: ImportStatus::Processing,
            ..Default::default()
        };
        assert!(db.finish_import(import.id, &summary).is_err());
    }

    #[test]
    fn test_totals_invariant_enforced_by_schema() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account("Courant", None).unwrap();
        let import = processing_import(&db, account);

        let conn = db.conn().unwrap();
        let result = conn.execute(
            "UPDATE imports SET status = 'completed', rows_total = 3, rows_imported = 1 WHERE id = ?",
            rusqlite::params![import.id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_list_imports_by_account() {
        let db = Database::in_memory().unwrap();
        let a = db.create_account("A", None).unwrap();
        let b = db.create_account("B", None).unwrap();

        let first = db.create_import(a, "1.csv").unwrap();
        let second = db.create_import(a, "2.csv").unwrap();
        db.create_import(b, "3.csv").unwrap();

        let ids: Vec<i64> = db
            .list_imports(Some(a))
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(db.list_imports(None).unwrap().len(), 3);

        assert!(db.get_import_rows(first.id).unwrap().is_empty());
        assert!(matches!(db.get_import_rows(9999), Err(Error::NotFound(_))));
    }
}
