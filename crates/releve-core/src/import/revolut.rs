//! Revolut export
//!
//! Format: `Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance`
//!
//! Only settled (`COMPLETED`) rows are imported. A non-zero `Fee` becomes its
//! own row right after the parent, with a distinct label so the pair never
//! collides on the dedup key.

use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::debug;

use super::{
    field, header_starts_with, parse_amount, parse_date, parse_records, BankParser, Columns,
    DecimalStyle, ParseResult,
};
use crate::models::{Bank, Row, DEFAULT_CURRENCY};

const SIGNATURE: &str =
    "Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State";
const COMPLETED: &str = "COMPLETED";

/// Bank reference carried by itemized fee rows
pub const FEE_REFERENCE: &str = "fee";

struct Layout {
    started: usize,
    description: usize,
    amount: usize,
    fee: Option<usize>,
    currency: Option<usize>,
    state: usize,
}

pub struct RevolutParser;

impl RevolutParser {
    fn layout(columns: &Columns) -> Result<Layout, String> {
        Ok(Layout {
            started: columns.require("Started Date")?,
            description: columns.require("Description")?,
            amount: columns.require("Amount")?,
            fee: columns.get("Fee"),
            currency: columns.get("Currency"),
            state: columns.require("State")?,
        })
    }

    fn convert(layout: &Layout, record: &StringRecord) -> Result<Vec<Row>, String> {
        let state = field(record, Some(layout.state)).ok_or("Missing state")?;
        if !state.eq_ignore_ascii_case(COMPLETED) {
            // Pending, declined and reverted rows may still change or vanish
            return Ok(Vec::new());
        }

        let started = field(record, Some(layout.started)).ok_or("Missing date")?;
        // "2024-03-01 14:22:05": the day is all we keep
        let day = started.split_whitespace().next().unwrap_or(started);
        let date = parse_date(day, &["%Y-%m-%d"])?;

        let description = field(record, Some(layout.description))
            .ok_or("Missing description")?
            .to_string();

        let amount_str = field(record, Some(layout.amount)).ok_or("Missing amount")?;
        let amount = parse_amount(amount_str, DecimalStyle::Dot)?;

        let fee = match field(record, layout.fee) {
            Some(s) => parse_amount(s, DecimalStyle::Dot).map_err(|e| format!("Fee: {}", e))?,
            None => Decimal::ZERO,
        };

        let currency = field(record, layout.currency)
            .unwrap_or(DEFAULT_CURRENCY)
            .to_uppercase();

        let mut rows = vec![Row {
            date,
            label: description.clone(),
            original_label: description.clone(),
            amount,
            currency: currency.clone(),
            bank_reference: None,
            line: 0,
        }];

        if !fee.is_zero() {
            let fee_label = format!("{} (fee)", description);
            rows.push(Row {
                date,
                label: fee_label.clone(),
                original_label: fee_label,
                amount: -fee.abs(),
                currency,
                bank_reference: Some(FEE_REFERENCE.to_string()),
                line: 0,
            });
        }

        Ok(rows)
    }
}

impl BankParser for RevolutParser {
    fn bank(&self) -> Bank {
        Bank::Revolut
    }

    fn detect(&self, content: &[u8]) -> bool {
        header_starts_with(content, SIGNATURE)
    }

    fn parse(&self, content: &[u8]) -> ParseResult {
        let rows = parse_records(content, b',', Self::layout, Self::convert)?;
        debug!("Parsed {} Revolut rows", rows.len());
        Ok(rows)
    }
}
