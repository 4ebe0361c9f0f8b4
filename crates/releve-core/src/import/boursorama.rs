//! Boursorama (BoursoBank) export
//!
//! Format: `dateOp;dateVal;label;category;categoryParent;supplierFound;amount;...`
//! with comma decimals, e.g. `-1 234,56`.

use std::sync::OnceLock;

use csv::StringRecord;
use regex::Regex;
use tracing::debug;

use super::{
    field, header_starts_with, parse_amount, parse_date, parse_records, BankParser, Columns,
    DecimalStyle, ParseResult,
};
use crate::models::{Bank, Row, DEFAULT_CURRENCY};

const SIGNATURE: &str = "dateOp;dateVal;label";
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

fn card_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^CARTE \d{2}/\d{2}/\d{2,4}\s+").expect("invalid card prefix regex"))
}

fn card_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+CB\*\d{4}$").expect("invalid card suffix regex"))
}

/// Display label without the card payment noise.
///
/// `CARTE 02/03/24 CARREFOUR CITY CB*1234` becomes `CARREFOUR CITY`.
fn clean_label(raw: &str) -> String {
    let label = raw.trim();
    let label = card_prefix().replace(label, "");
    let label = card_suffix().replace(&label, "");
    let label = label.trim();
    if label.is_empty() {
        raw.trim().to_string()
    } else {
        label.to_string()
    }
}

struct Layout {
    date: usize,
    label: usize,
    amount: usize,
}

pub struct BoursoramaParser;

impl BoursoramaParser {
    fn layout(columns: &Columns) -> Result<Layout, String> {
        Ok(Layout {
            date: columns.require("dateOp")?,
            label: columns.require("label")?,
            amount: columns.require("amount")?,
        })
    }

    fn convert(layout: &Layout, record: &StringRecord) -> Result<Vec<Row>, String> {
        let date_str = field(record, Some(layout.date)).ok_or("Missing date")?;
        let date = parse_date(date_str, DATE_FORMATS)?;

        // Raw label, untouched: it is part of the dedup key
        let original_label = record
            .get(layout.label)
            .filter(|s| !s.trim().is_empty())
            .ok_or("Missing label")?
            .to_string();

        let amount_str = field(record, Some(layout.amount)).ok_or("Missing amount")?;
        let amount = parse_amount(amount_str, DecimalStyle::Comma)?;

        Ok(vec![Row {
            date,
            label: clean_label(&original_label),
            original_label,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            bank_reference: None,
            line: 0,
        }])
    }
}

impl BankParser for BoursoramaParser {
    fn bank(&self) -> Bank {
        Bank::Boursorama
    }

    fn detect(&self, content: &[u8]) -> bool {
        header_starts_with(content, SIGNATURE)
    }

    fn parse(&self, content: &[u8]) -> ParseResult {
        let rows = parse_records(content, b';', Self::layout, Self::convert)?;
        debug!("Parsed {} Boursorama rows", rows.len());
        Ok(rows)
    }
}
