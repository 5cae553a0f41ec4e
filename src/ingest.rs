//! Batch ingestion and schema normalization
//!
//! Rows arrive either as JSON objects or as string cells under a header line.
//! Column presence, identifiers and amounts are checked strictly; a failure
//! rejects the whole batch. Boolean flags, timestamps and free-text columns are
//! normalized leniently here once so the rules only ever see typed values.

use crate::{Channel, ScoringError, Transaction};
use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use crate::rules::BatchContext;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Column names every row must carry
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "transaction_id",
    "customer_id",
    "transaction_datetime",
    "amount_in_inr",
    "channel",
    "merchant_name",
    "merchant_category",
    "merchant_city",
    "state",
    "is_international",
    "is_chip_used",
    "is_fraud",
    "card_last4",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

static CARD_LAST4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("card_last4 pattern is valid"));

/// A fully ingested batch of transactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    transactions: Vec<Transaction>,
}

impl Batch {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Ingest JSON row objects. Rows are numbered from 0 in errors.
    pub fn from_records(rows: Vec<Map<String, Value>>) -> Result<Self, ScoringError> {
        // Check structure before any value parsing so no partial batch escapes
        for (index, row) in rows.iter().enumerate() {
            if let Some(column) = REQUIRED_COLUMNS.iter().find(|c| !row.contains_key(**c)) {
                return Err(ScoringError::MissingField {
                    column: column.to_string(),
                    row: index,
                });
            }
        }

        let transactions = rows
            .iter()
            .enumerate()
            .map(|(index, row)| parse_row(index, row))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::with_capacity(transactions.len());
        for (index, tx) in transactions.iter().enumerate() {
            if !seen.insert(tx.transaction_id.as_str()) {
                return Err(ScoringError::DuplicateTransaction {
                    transaction_id: tx.transaction_id.clone(),
                    row: index,
                });
            }
        }

        debug!(records = transactions.len(), "Ingested transaction batch");
        Ok(Self { transactions })
    }

    /// Ingest delimited data already split into a header and string cells.
    pub fn from_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> Result<Self, ScoringError> {
        let headers: Vec<&str> = headers.iter().map(|h| h.as_ref().trim()).collect();
        if let Some(column) = REQUIRED_COLUMNS.iter().find(|c| !headers.contains(*c)) {
            return Err(ScoringError::MissingColumn(column.to_string()));
        }

        let mut records = Vec::with_capacity(rows.len());
        for (index, cells) in rows.iter().enumerate() {
            if cells.len() != headers.len() {
                return Err(ScoringError::MalformedRow {
                    row: index,
                    expected: headers.len(),
                    found: cells.len(),
                });
            }
            let record: Map<String, Value> = headers
                .iter()
                .zip(cells)
                .map(|(header, cell)| (header.to_string(), Value::String(cell.clone())))
                .collect();
            records.push(record);
        }

        Self::from_records(records)
    }

    /// Ingest a JSON array of row objects.
    pub fn from_json_str(json: &str) -> Result<Self, ScoringError> {
        let rows: Vec<Map<String, Value>> = serde_json::from_str(json)?;
        Self::from_records(rows)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Per-customer counts for the velocity rule
    pub fn context(&self) -> BatchContext<'_> {
        BatchContext::from_transactions(&self.transactions)
    }
}

impl From<Vec<Transaction>> for Batch {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self::new(transactions)
    }
}

/// Parse a timestamp as wall-clock time. Offsets are kept as written, not converted.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Coerce a boolean cell: JSON bools, case-insensitive `true`/`false`, and
/// `1`/`0` as number or text since delimited sources store flags as integers.
pub fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_row(index: usize, row: &Map<String, Value>) -> Result<Transaction, ScoringError> {
    let transaction_datetime = lenient_text_field(index, row, "transaction_datetime");
    let parsed_datetime = parse_datetime(&transaction_datetime);
    if parsed_datetime.is_none() {
        warn!(row = index, value = %transaction_datetime, "Unparseable transaction_datetime");
    }

    Ok(Transaction {
        transaction_id: text_field(index, row, "transaction_id")?,
        customer_id: text_field(index, row, "customer_id")?,
        transaction_datetime,
        parsed_datetime,
        amount_in_inr: amount_field(index, row)?,
        channel: Channel::from(lenient_text_field(index, row, "channel").as_str()),
        merchant_name: lenient_text_field(index, row, "merchant_name"),
        merchant_category: lenient_text_field(index, row, "merchant_category"),
        merchant_city: lenient_text_field(index, row, "merchant_city"),
        state: lenient_text_field(index, row, "state"),
        is_international: flag_field(index, row, "is_international"),
        is_chip_used: flag_field(index, row, "is_chip_used"),
        is_fraud: flag_field(index, row, "is_fraud"),
        card_last4: card_field(index, row)?,
    })
}

fn field<'a>(index: usize, row: &'a Map<String, Value>, column: &str) -> Result<&'a Value, ScoringError> {
    row.get(column).ok_or_else(|| ScoringError::MissingField {
        column: column.to_string(),
        row: index,
    })
}

fn invalid(index: usize, column: &str, reason: String) -> ScoringError {
    ScoringError::InvalidValue {
        column: column.to_string(),
        row: index,
        reason,
    }
}

fn text_field(index: usize, row: &Map<String, Value>, column: &str) -> Result<String, ScoringError> {
    match field(index, row, column)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(invalid(index, column, format!("expected text, found {}", other))),
    }
}

/// Value-level text: anything that is not text, a number or a bool becomes empty.
fn lenient_text_field(index: usize, row: &Map<String, Value>, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        other => {
            warn!(row = index, column, value = ?other, "Non-text value, treating as empty");
            String::new()
        }
    }
}

fn amount_field(index: usize, row: &Map<String, Value>) -> Result<f64, ScoringError> {
    let column = "amount_in_inr";
    let amount = match field(index, row, column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(index, column, "not a number".to_string()))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid(
            index,
            column,
            format!("amount must be a non-negative number, got {}", amount),
        ));
    }
    Ok(amount)
}

fn flag_field(index: usize, row: &Map<String, Value>, column: &str) -> Option<bool> {
    let value = row.get(column)?;
    let flag = coerce_flag(value);
    if flag.is_none() {
        warn!(row = index, column, value = %value, "Could not coerce flag, treating as unset");
    }
    flag
}

fn card_field(index: usize, row: &Map<String, Value>) -> Result<String, ScoringError> {
    let column = "card_last4";
    match field(index, row, column)? {
        Value::Number(n) => match n.as_u64() {
            Some(digits) if digits <= 9999 => Ok(format!("{:04}", digits)),
            _ => Err(invalid(index, column, format!("{} is not four digits", n))),
        },
        Value::String(s) if CARD_LAST4.is_match(s.trim()) => Ok(s.trim().to_string()),
        other => Err(invalid(index, column, format!("{} is not four digits", other))),
    }
}
