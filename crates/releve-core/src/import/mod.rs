//! CSV import parsers for various bank formats
//!
//! Each supported bank gets a [`BankParser`]. The [`ParserRegistry`] holds them
//! in a fixed order and picks the first one whose detector accepts the file's
//! header line.
//!
//! Parsing is all-or-nothing: a file with any malformed row yields every row
//! error and no rows.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::models::{Bank, Row, RowError};

mod boursorama;
mod caisse_epargne;
mod revolut;

pub use boursorama::BoursoramaParser;
pub use caisse_epargne::CaisseEpargneParser;
pub use revolut::RevolutParser;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Structural failures found while parsing; no rows are returned with them
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} row(s) could not be parsed", .errors.len())]
pub struct ParseFailed {
    pub errors: Vec<RowError>,
}

pub type ParseResult = std::result::Result<Vec<Row>, ParseFailed>;

/// One bank's statement format
pub trait BankParser: Send + Sync {
    fn bank(&self) -> Bank;

    /// Whether `content` looks like this bank's export.
    ///
    /// Only the header line is inspected; the body is never parsed.
    fn detect(&self, content: &[u8]) -> bool;

    /// Parse the whole file into rows, in file order
    fn parse(&self, content: &[u8]) -> ParseResult;
}

/// Ordered set of bank parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn BankParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BoursoramaParser),
            Box::new(RevolutParser),
            Box::new(CaisseEpargneParser),
        ])
    }
}

impl ParserRegistry {
    pub fn new(parsers: Vec<Box<dyn BankParser>>) -> Self {
        Self { parsers }
    }

    /// First parser whose detector accepts the content (BOM ignored)
    pub fn detect(&self, content: &[u8]) -> Option<&dyn BankParser> {
        let content = strip_bom(content);
        let parser = self
            .parsers
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.detect(content));

        match parser {
            Some(p) => debug!("Detected {} format", p.bank()),
            None => debug!("No parser recognized header: {:?}", header_line(content)),
        }
        parser
    }

    /// Bank of the first matching parser
    pub fn detect_bank(&self, content: &[u8]) -> Option<Bank> {
        self.detect(content).map(|p| p.bank())
    }

    /// Banks in detection order
    pub fn banks(&self) -> Vec<Bank> {
        self.parsers.iter().map(|p| p.bank()).collect()
    }
}

/// Drop a leading UTF-8 byte-order mark
pub fn strip_bom(content: &[u8]) -> &[u8] {
    content.strip_prefix(UTF8_BOM).unwrap_or(content)
}

/// First line of the file, unquoted and trimmed
pub(crate) fn header_line(content: &[u8]) -> String {
    let content = strip_bom(content);
    let end = content
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(content.len());
    String::from_utf8_lossy(&content[..end])
        .trim()
        .replace('"', "")
}

/// Lowercase and strip French accents, for comparing column names
pub(crate) fn fold(s: &str) -> String {
    s.trim()
        .trim_matches('"')
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Whether the folded header line starts with the folded signature
pub(crate) fn header_starts_with(content: &[u8], signature: &str) -> bool {
    fold(&header_line(content)).starts_with(&fold(signature))
}

/// Column positions by folded header name
pub(crate) struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            // Keep the first occurrence of duplicated names
            index.entry(fold(name)).or_insert(i);
        }
        Self { index }
    }

    pub(crate) fn get(&self, name: &str) -> Option<usize> {
        self.index.get(&fold(name)).copied()
    }

    pub(crate) fn require(&self, name: &str) -> std::result::Result<usize, String> {
        self.get(name)
            .ok_or_else(|| format!("Missing column: {}", name))
    }
}

/// Trimmed, non-empty field at `idx`
pub(crate) fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// How a bank writes decimal numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecimalStyle {
    /// `1 234,56`
    Comma,
    /// `1,234.56`
    Dot,
}

/// Parse an amount into an exact decimal
pub(crate) fn parse_amount(s: &str, style: DecimalStyle) -> std::result::Result<Decimal, String> {
    let mut cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '"'))
        .collect();

    match style {
        DecimalStyle::Comma => {
            if cleaned.contains(',') {
                cleaned = cleaned.replace('.', "").replace(',', ".");
            }
        }
        DecimalStyle::Dot => cleaned = cleaned.replace(',', ""),
    }

    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return Err(format!("Invalid amount: '{}'", s.trim()));
    }

    Decimal::from_str(cleaned).map_err(|_| format!("Invalid amount: '{}'", s.trim()))
}

/// Parse a date trying each format in turn
pub(crate) fn parse_date(s: &str, formats: &[&str]) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("Invalid date: '{}'", s))
}

/// Drive a CSV file through a per-record converter.
///
/// `resolve` turns the header into whatever column layout the converter
/// needs; a failure there is reported against row 1. Row numbers are
/// physical lines, header included, so the first record is row 2. Each
/// returned [`Row`] carries the line of the record it came from.
pub(crate) fn parse_records<C, R, F>(
    content: &[u8],
    delimiter: u8,
    resolve: R,
    mut convert: F,
) -> ParseResult
where
    R: FnOnce(&Columns) -> std::result::Result<C, String>,
    F: FnMut(&C, &StringRecord) -> std::result::Result<Vec<Row>, String>,
{
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(content));

    let headers = reader.headers().map_err(|e| ParseFailed {
        errors: vec![RowError::new(1, format!("Invalid header: {}", e))],
    })?;
    let layout = resolve(&Columns::from_headers(headers)).map_err(|message| ParseFailed {
        errors: vec![RowError::new(1, message)],
    })?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let fallback_row = index + 2;
        match result {
            Ok(record) => {
                let row_number = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_row);
                match convert(&layout, &record) {
                    Ok(parsed) => rows.extend(parsed.into_iter().map(|row| Row {
                        line: row_number,
                        ..row
                    })),
                    Err(message) => errors.push(RowError::new(row_number, message)),
                }
            }
            Err(e) => {
                let row_number = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_row);
                errors.push(RowError::new(row_number, format!("Malformed CSV row: {}", e)));
            }
        }
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(ParseFailed { errors })
    }
}
