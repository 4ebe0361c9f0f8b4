//! Caisse d'Epargne export
//!
//! Format: `Date de comptabilisation;Libelle simplifie;Libelle operation;Reference;...;Debit;Credit;...`
//! Debits and credits live in separate columns, with comma decimals.

use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::debug;

use super::{
    field, header_starts_with, parse_amount, parse_date, parse_records, BankParser, Columns,
    DecimalStyle, ParseResult,
};
use crate::models::{Bank, Row, DEFAULT_CURRENCY};

const SIGNATURE: &str = "Date de comptabilisation;Libelle simplifie";
// Two-digit years first: %Y would read "24" as year 24
const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y"];

struct Layout {
    date: usize,
    simple_label: Option<usize>,
    operation_label: Option<usize>,
    reference: Option<usize>,
    debit: usize,
    credit: usize,
}

pub struct CaisseEpargneParser;

impl CaisseEpargneParser {
    fn layout(columns: &Columns) -> Result<Layout, String> {
        let simple_label = columns.get("Libelle simplifie");
        let operation_label = columns.get("Libelle operation");
        if simple_label.is_none() && operation_label.is_none() {
            return Err("Missing column: Libelle simplifie".to_string());
        }

        Ok(Layout {
            date: columns.require("Date de comptabilisation")?,
            simple_label,
            operation_label,
            reference: columns.get("Reference"),
            debit: columns.require("Debit")?,
            credit: columns.require("Credit")?,
        })
    }

    fn amount(layout: &Layout, record: &StringRecord) -> Result<Decimal, String> {
        let debit = field(record, Some(layout.debit))
            .map(|s| parse_amount(s, DecimalStyle::Comma))
            .transpose()?;
        let credit = field(record, Some(layout.credit))
            .map(|s| parse_amount(s, DecimalStyle::Comma))
            .transpose()?;

        match (debit, credit) {
            (Some(d), None) => Ok(-d.abs()),
            (None, Some(c)) => Ok(c.abs()),
            (Some(d), Some(c)) if c.is_zero() => Ok(-d.abs()),
            (Some(d), Some(c)) if d.is_zero() => Ok(c.abs()),
            (Some(_), Some(_)) => Err("Both debit and credit are set".to_string()),
            (None, None) => Err("Missing amount".to_string()),
        }
    }

    fn convert(layout: &Layout, record: &StringRecord) -> Result<Vec<Row>, String> {
        let date_str = field(record, Some(layout.date)).ok_or("Missing date")?;
        let date = parse_date(date_str, DATE_FORMATS)?;

        let simple = field(record, layout.simple_label);
        let operation = layout
            .operation_label
            .and_then(|i| record.get(i))
            .filter(|s| !s.trim().is_empty());

        let label = simple
            .or(operation.map(str::trim))
            .ok_or("Missing label")?
            .to_string();
        let original_label = operation
            .map(str::to_string)
            .unwrap_or_else(|| label.clone());

        Ok(vec![Row {
            date,
            label,
            original_label,
            amount: Self::amount(layout, record)?,
            currency: DEFAULT_CURRENCY.to_string(),
            bank_reference: field(record, layout.reference).map(str::to_string),
            line: 0,
        }])
    }
}

impl BankParser for CaisseEpargneParser {
    fn bank(&self) -> Bank {
        Bank::CaisseEpargne
    }

    fn detect(&self, content: &[u8]) -> bool {
        header_starts_with(content, SIGNATURE)
    }

    fn parse(&self, content: &[u8]) -> ParseResult {
        let rows = parse_records(content, b';', Self::layout, Self::convert)?;
        debug!("Parsed {} Caisse d'Epargne rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RowError;
    use chrono::NaiveDate;

    const HEADER: &str = "Date de comptabilisation;Libelle simplifie;Libelle operation;Reference;Informations complementaires;Type operation;Categorie;Sous categorie;Debit;Credit;Date operation;Date de valeur;Pointage operation";

    #[test]
    fn test_detect_caisse_epargne() {
        assert!(CaisseEpargneParser.detect(HEADER.as_bytes()));
        assert!(CaisseEpargneParser
            .detect("Date de comptabilisation;Libellé simplifié;Libellé opération\n".as_bytes()));
        assert!(!CaisseEpargneParser.detect(b"Date;Libelle;Debit;Credit\n"));
    }

    #[test]
    fn test_parse_caisse_epargne() {
        let csv = format!(
            "{}\n\
             04/03/2024;LECLERC;CB LECLERC FACT 020324;4XW2K9;;Carte bancaire;Courses;Hypermarche;-54,30;;02/03/2024;04/03/2024;0\n\
             05/03/2024;VIR MAMAN;VIR SEPA RECU DE MME DUPONT;;;Virement;Revenus;Autres;;+150,00;05/03/2024;05/03/2024;0\n",
            HEADER
        );

        let rows = CaisseEpargneParser.parse(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(rows[0].label, "LECLERC");
        assert_eq!(rows[0].original_label, "CB LECLERC FACT 020324");
        assert_eq!(rows[0].amount, Decimal::new(-5430, 2));
        assert_eq!(rows[0].bank_reference.as_deref(), Some("4XW2K9"));

        assert_eq!(rows[1].amount, Decimal::new(15000, 2));
        assert_eq!(rows[1].bank_reference, None);
    }

    #[test]
    fn test_parse_caisse_epargne_short_year() {
        let csv = format!("{}\n05/03/24;SNCF;CB SNCF;;;;;;-9,90;;;;\n", HEADER);
        let rows = CaisseEpargneParser.parse(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_caisse_epargne_positive_debit_is_negated() {
        let csv = format!("{}\n04/03/2024;SNCF;CB SNCF;;;;;;12,00;;;;\n", HEADER);
        let rows = CaisseEpargneParser.parse(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].amount, Decimal::new(-1200, 2));
    }

    #[test]
    fn test_parse_caisse_epargne_missing_amount() {
        let csv = format!("{}\n04/03/2024;SNCF;CB SNCF;;;;;;;;;;\n", HEADER);
        let failed = CaisseEpargneParser.parse(csv.as_bytes()).unwrap_err();
        assert_eq!(failed.errors, vec![RowError::new(2, "Missing amount")]);
    }

    #[test]
    fn test_parse_caisse_epargne_missing_debit_column() {
        let csv = "Date de comptabilisation;Libelle simplifie;Libelle operation;Credit\n";
        let failed = CaisseEpargneParser.parse(csv.as_bytes()).unwrap_err();
        assert_eq!(failed.errors, vec![RowError::new(1, "Missing column: Debit")]);
    }
}
