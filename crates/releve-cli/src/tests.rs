//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use clap::Parser;
use releve_core::db::{Database, TransactionFilter};
use releve_core::models::{Bank, ImportStatus};
use tempfile::{NamedTempFile, TempDir};

use crate::cli::{Cli, Commands, RulesAction, TransactionsAction};
use crate::commands::{self, truncate};

const BOURSORAMA_CSV: &str = "dateOp;dateVal;label;category;categoryParent;supplierFound;amount;comment;accountNum;accountLabel;accountbalance
2024-03-02;2024-03-02;\"CARTE 01/03/24 CARREFOUR CITY CB*1234\";Courses;Vie quotidienne;carrefour;-12,34;;0001;Compte;100,00
2024-03-03;2024-03-03;\"CARTE 02/03/24 SNCF CB*1234\";Transport;Vie quotidienne;sncf;-45,00;;0001;Compte;55,00
";

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn count(db: &Database) -> i64 {
    db.count_transactions(&TransactionFilter::default()).unwrap()
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_import_args() {
    let cli = Cli::try_parse_from([
        "releve",
        "--db",
        "test.db",
        "import",
        "--file",
        "mars.csv",
        "--account",
        "Compte courant",
        "--details",
    ])
    .unwrap();

    assert_eq!(cli.db.to_str(), Some("test.db"));
    match cli.command {
        Commands::Import {
            file,
            account,
            details,
        } => {
            assert_eq!(file.to_str(), Some("mars.csv"));
            assert_eq!(account, "Compte courant");
            assert!(details);
        }
        _ => panic!("expected import command"),
    }
}

#[test]
fn test_parse_negative_amount_and_priority() {
    let cli = Cli::try_parse_from([
        "releve",
        "transactions",
        "add",
        "--account",
        "1",
        "--date",
        "2024-03-01",
        "--label",
        "Loyer",
        "--amount",
        "-800.00",
    ])
    .unwrap();
    match cli.command {
        Commands::Transactions {
            action: Some(TransactionsAction::Add { amount, currency, .. }),
        } => {
            assert_eq!(amount, "-800.00");
            assert_eq!(currency, "EUR");
        }
        _ => panic!("expected transactions add"),
    }

    let cli = Cli::try_parse_from(["releve", "rules", "add", "carre", "--tag", "Courses", "--priority", "-1"])
        .unwrap();
    match cli.command {
        Commands::Rules {
            action: Some(RulesAction::Add { priority, .. }),
        } => assert_eq!(priority, -1),
        _ => panic!("expected rules add"),
    }
}

#[test]
fn test_default_db_path() {
    let cli = Cli::try_parse_from(["releve", "init"]).unwrap();
    assert_eq!(cli.db.to_str(), Some("releve.db"));
    assert!(!cli.verbose);
}

// ========== Init / Accounts Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("releve.db");

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path).unwrap();
    assert_eq!(db.path(), path.to_str().unwrap());
    assert!(db.list_accounts().unwrap().is_empty());
}

#[test]
fn test_cmd_accounts_add_and_remove() {
    let db = setup_test_db();

    commands::cmd_accounts_add(&db, "Compte courant", Some("boursorama")).unwrap();
    let account = db.get_account_by_name("Compte courant").unwrap().unwrap();
    assert_eq!(account.bank, Some(Bank::Boursorama));

    assert!(commands::cmd_accounts_add(&db, "Compte courant", None).is_err());
    assert!(commands::cmd_accounts_add(&db, "Livret", Some("chase")).is_err());

    commands::cmd_accounts_list(&db).unwrap();
    commands::cmd_accounts_remove(&db, account.id).unwrap();
    assert!(commands::cmd_accounts_remove(&db, account.id).is_err());
}

#[test]
fn test_resolve_account_by_id_or_name() {
    let db = setup_test_db();
    let id = db.create_account("Revolut", Some(Bank::Revolut)).unwrap();

    assert_eq!(commands::resolve_account(&db, &id.to_string()).unwrap().id, id);
    assert_eq!(commands::resolve_account(&db, "Revolut").unwrap().id, id);
    assert!(commands::resolve_account(&db, "Inconnu").is_err());
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_detect() {
    let known = csv_file(BOURSORAMA_CSV);
    assert!(commands::cmd_detect(known.path()).is_ok());

    let unknown = csv_file("foo,bar,baz\n1,2,3\n");
    assert!(commands::cmd_detect(unknown.path()).is_ok());
}

#[test]
fn test_cmd_import_twice_skips_duplicates() {
    let db = setup_test_db();
    db.create_account("Compte courant", None).unwrap();
    let file = csv_file(BOURSORAMA_CSV);

    commands::cmd_import(&db, file.path(), "Compte courant", true).unwrap();
    assert_eq!(count(&db), 2);

    commands::cmd_import(&db, file.path(), "Compte courant", false).unwrap();
    assert_eq!(count(&db), 2);

    let imports = db.list_imports(None).unwrap();
    assert_eq!(imports.len(), 2);
    assert_eq!(imports[0].rows_skipped, 2);
    assert_eq!(imports[1].rows_imported, 2);
}

#[test]
fn test_cmd_import_unknown_format_fails() {
    let db = setup_test_db();
    db.create_account("Compte courant", None).unwrap();
    let file = csv_file("foo,bar,baz\n1,2,3\n");

    let result = commands::cmd_import(&db, file.path(), "Compte courant", false);
    assert!(result.is_err());

    let import = &db.list_imports(None).unwrap()[0];
    assert_eq!(import.status, ImportStatus::Failed);
    assert!(import.error_details[0].message.contains("Unknown CSV format"));
}

#[test]
fn test_cmd_import_unknown_account() {
    let db = setup_test_db();
    let file = csv_file(BOURSORAMA_CSV);

    let result = commands::cmd_import(&db, file.path(), "Nope", false);
    assert!(result.unwrap_err().to_string().contains("Account not found"));
    assert!(db.list_imports(None).unwrap().is_empty());
}

#[test]
fn test_cmd_imports_list_and_show() {
    let db = setup_test_db();
    db.create_account("Compte courant", None).unwrap();
    let file = csv_file(BOURSORAMA_CSV);
    commands::cmd_import(&db, file.path(), "Compte courant", false).unwrap();

    let id = db.list_imports(None).unwrap()[0].id;
    assert!(commands::cmd_imports_list(&db, None).is_ok());
    assert!(commands::cmd_imports_list(&db, Some("Compte courant")).is_ok());
    assert!(commands::cmd_imports_show(&db, id, true).is_ok());
    assert!(commands::cmd_imports_show(&db, 9999, false).is_err());
}

// ========== Transactions Command Tests ==========

#[test]
fn test_cmd_transactions_add_manual() {
    let db = setup_test_db();
    db.create_account("Compte courant", None).unwrap();

    commands::cmd_transactions_add(&db, "Compte courant", "2024-03-01", "Loyer", "-800.00", "eur")
        .unwrap();
    let tx = &db.list_transactions(&TransactionFilter::default()).unwrap()[0];
    assert_eq!(tx.label, "Loyer");
    assert_eq!(tx.currency, "EUR");
    assert_eq!(tx.amount, rust_decimal::Decimal::new(-80000, 2));

    // Same key again is rejected
    assert!(commands::cmd_transactions_add(&db, "Compte courant", "2024-03-01", "Loyer", "-800", "EUR").is_err());

    assert!(commands::cmd_transactions_add(&db, "Compte courant", "01/03/2024", "X", "-1", "EUR").is_err());
    assert!(commands::cmd_transactions_add(&db, "Compte courant", "2024-03-01", "X", "abc", "EUR").is_err());
}

#[test]
fn test_cmd_transactions_list() {
    let db = setup_test_db();
    assert!(commands::cmd_transactions_list(&db, None, None, 20).is_ok());

    db.create_account("Compte courant", None).unwrap();
    let file = csv_file(BOURSORAMA_CSV);
    commands::cmd_import(&db, file.path(), "Compte courant", false).unwrap();

    assert!(commands::cmd_transactions_list(&db, Some("Compte courant"), None, 20).is_ok());
    assert!(commands::cmd_transactions_list(&db, Some("Nope"), None, 20).is_err());
}

// ========== Tags / Rules Command Tests ==========

#[test]
fn test_cmd_tags_add_and_remove() {
    let db = setup_test_db();

    commands::cmd_tags_add(&db, "Courses", Some("#10b981")).unwrap();
    let tag = db.get_tag_by_name("Courses").unwrap().unwrap();
    assert_eq!(tag.color, "#10b981");

    assert!(commands::cmd_tags_add(&db, "Courses", None).is_err());
    assert!(commands::cmd_tags_list(&db).is_ok());

    commands::cmd_tags_remove(&db, tag.id).unwrap();
    assert!(db.get_tag(tag.id).unwrap().is_none());
}

#[test]
fn test_cmd_rules_add_by_tag_name() {
    let db = setup_test_db();
    commands::cmd_tags_add(&db, "Courses", None).unwrap();

    commands::cmd_rules_add(&db, "carrefour", "Courses", 10).unwrap();
    let rules = db.list_tagging_rules().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rule.keyword, "carrefour");
    assert_eq!(rules[0].tag_name, "Courses");

    assert!(commands::cmd_rules_add(&db, "x", "Inconnu", 0).is_err());
    assert!(commands::cmd_rules_list(&db).is_ok());
    assert!(commands::cmd_rules_test(&db, "CARREFOUR CITY").is_ok());

    commands::cmd_rules_remove(&db, rules[0].rule.id).unwrap();
    assert!(commands::cmd_rules_remove(&db, rules[0].rule.id).is_err());
}

#[test]
fn test_import_applies_rules() {
    let db = setup_test_db();
    db.create_account("Compte courant", None).unwrap();
    commands::cmd_tags_add(&db, "Transport", None).unwrap();
    commands::cmd_rules_add(&db, "sncf", "Transport", 0).unwrap();

    let file = csv_file(BOURSORAMA_CSV);
    commands::cmd_import(&db, file.path(), "Compte courant", false).unwrap();

    let txs = db.list_transactions(&TransactionFilter::default()).unwrap();
    let sncf = txs.iter().find(|t| t.label == "SNCF").unwrap();
    let tags = db.get_transaction_tags(sncf.id).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "Transport");
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is a long string", 10), "this is...");
    assert_eq!(truncate("Libellé opération", 10), "Libellé...");
}
