//! # Card Risk Scorer
//!
//! Rule-based fraud risk scoring for batches of credit card transactions.
//!
//! ## Features
//!
//! - **Explainable scoring**: every point in a risk score comes from a named rule
//!   with a human-readable explanation
//! - **Batch-aware velocity check**: customers with many transactions in the same
//!   batch are flagged, using per-customer counts computed once per batch
//! - **Risk tiers**: scores are capped at 100 and classified as `Normal`,
//!   `Suspicious` or `High Risk`
//! - **Strict ingestion**: missing columns and unreadable amounts reject the whole
//!   batch, while value problems inside a single rule only silence that rule
//! - **Reporting**: summaries, filters and pagination over scored batches
//!
//! ## Example
//!
//! ```
//! use card_risk_scorer::{RiskLabel, ScoringEngine};
//!
//! let engine = ScoringEngine::new();
//! let scored = engine
//!     .score_json(
//!         r#"[{
//!             "transaction_id": "TXN-1", "customer_id": "C001",
//!             "transaction_datetime": "2024-03-01 14:10:00", "amount_in_inr": 25000,
//!             "channel": "ATM", "merchant_name": "Local Store",
//!             "merchant_category": "Grocery", "merchant_city": "Pune",
//!             "state": "Maharashtra", "is_international": "TRUE",
//!             "is_chip_used": true, "is_fraud": 0, "card_last4": "4242"
//!         }]"#,
//!     )
//!     .unwrap();
//!
//! assert_eq!(scored.records()[0].risk_score, 55);
//! assert_eq!(scored.records()[0].risk_label, RiskLabel::Suspicious);
//! ```

pub mod display;
pub mod ingest;
pub mod report;
pub mod rules;

pub use ingest::{Batch, REQUIRED_COLUMNS};
pub use report::{BatchSummary, Page, TransactionFilter};
pub use rules::{BatchContext, RuleError, RuleEvaluation, RuleHit, RuleKind, RuleSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Batch-level errors. Any of these rejects the whole batch.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row} is missing required column: {column}")]
    MissingField { column: String, row: usize },

    #[error("Row {row} has {found} fields, header has {expected}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value in column {column} at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Duplicate transaction {transaction_id} at row {row}")]
    DuplicateTransaction { transaction_id: String, row: usize },

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("Unreadable batch: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payment channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum Channel {
    Online,
    Pos,
    Atm,
    Other(String),
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::Online => "Online",
            Channel::Pos => "POS",
            Channel::Atm => "ATM",
            Channel::Other(name) => name,
        }
    }
}

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        match value {
            "Online" => Channel::Online,
            "POS" => Channel::Pos,
            "ATM" => Channel::Atm,
            other => Channel::Other(other.to_string()),
        }
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.as_str().to_string()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transaction row, normalized at ingestion.
///
/// Flags that could not be coerced to a boolean are `None` and behave as unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    /// Timestamp text as supplied by the source
    pub transaction_datetime: String,
    /// `transaction_datetime` parsed as wall-clock time, if parseable
    #[serde(skip)]
    pub parsed_datetime: Option<NaiveDateTime>,
    pub amount_in_inr: f64,
    pub channel: Channel,
    pub merchant_name: String,
    pub merchant_category: String,
    pub merchant_city: String,
    pub state: String,
    pub is_international: Option<bool>,
    pub is_chip_used: Option<bool>,
    pub is_fraud: Option<bool>,
    pub card_last4: String,
}

impl Transaction {
    /// Replace the timestamp text, re-parsing it.
    pub fn set_datetime(&mut self, text: &str) {
        self.transaction_datetime = text.to_string();
        self.parsed_datetime = ingest::parse_datetime(text);
    }

    pub fn is_international(&self) -> bool {
        self.is_international == Some(true)
    }

    pub fn is_labelled_fraud(&self) -> bool {
        self.is_fraud == Some(true)
    }
}

/// Risk tier, a pure function of the capped risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLabel {
    Normal,
    Suspicious,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::HighRisk, RiskLabel::Suspicious, RiskLabel::Normal];

    /// Classify with the default thresholds (70 and 40).
    pub fn from_score(score: u8) -> Self {
        Self::with_thresholds(score, DEFAULT_HIGH_RISK_THRESHOLD, DEFAULT_SUSPICIOUS_THRESHOLD)
    }

    /// Classify highest tier first.
    pub fn with_thresholds(score: u8, high_risk: u8, suspicious: u8) -> Self {
        if score >= high_risk {
            RiskLabel::HighRisk
        } else if score >= suspicious {
            RiskLabel::Suspicious
        } else {
            RiskLabel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Normal => "Normal",
            RiskLabel::Suspicious => "Suspicious",
            RiskLabel::HighRisk => "High Risk",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction with its derived risk fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub risk_score: u8,
    /// Explanations in rule order
    pub triggered_rules: Vec<String>,
    pub risk_label: RiskLabel,
    #[serde(skip)]
    pub fired_rules: Vec<RuleKind>,
}

/// An enriched batch. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoredBatch {
    records: Vec<ScoredTransaction>,
}

impl ScoredBatch {
    pub fn records(&self) -> &[ScoredTransaction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up by id. Ingested batches have unique ids; for batches built from
    /// raw transactions the first match wins.
    pub fn get(&self, transaction_id: &str) -> Option<&ScoredTransaction> {
        self.records
            .iter()
            .find(|r| r.transaction.transaction_id == transaction_id)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_scored(&self.records)
    }

    /// Strip the derived fields.
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.records.into_iter().map(|r| r.transaction).collect()
    }

    /// Export as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

const DEFAULT_HIGH_RISK_THRESHOLD: u8 = 70;
const DEFAULT_SUSPICIOUS_THRESHOLD: u8 = 40;

/// Rule weights and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Amounts strictly above this trigger the high-amount rule
    pub high_amount_threshold: f64,
    pub high_amount_points: u32,
    pub international_points: u32,
    /// First late-night hour, inclusive
    pub late_night_start_hour: u32,
    /// End of the late-night window, exclusive
    pub late_night_end_hour: u32,
    pub late_night_points: u32,
    /// Customers with strictly more records than this in a batch trigger the velocity rule
    pub velocity_threshold: usize,
    pub velocity_points: u32,
    /// Case-insensitive substrings of merchant names
    pub suspicious_keywords: Vec<String>,
    pub suspicious_merchant_points: u32,
    pub max_score: u8,
    pub high_risk_threshold: u8,
    pub suspicious_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: 20_000.0,
            high_amount_points: 30,
            international_points: 25,
            late_night_start_hour: 0,
            late_night_end_hour: 4,
            late_night_points: 20,
            velocity_threshold: 3,
            velocity_points: 15,
            suspicious_keywords: ["unknown", "suspicious", "midnight", "foreign", "night"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            suspicious_merchant_points: 10,
            max_score: 100,
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
            suspicious_threshold: DEFAULT_SUSPICIOUS_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    /// Load overrides from JSON; omitted keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ScoringError> {
        let config: ScoringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if !self.high_amount_threshold.is_finite() || self.high_amount_threshold < 0.0 {
            return Err(ScoringError::InvalidConfig(format!(
                "high_amount_threshold must be a non-negative number, got {}",
                self.high_amount_threshold
            )));
        }
        if self.late_night_start_hour >= self.late_night_end_hour || self.late_night_end_hour > 24 {
            return Err(ScoringError::InvalidConfig(format!(
                "late-night window {}..{} is empty or outside 0..24",
                self.late_night_start_hour, self.late_night_end_hour
            )));
        }
        if self.max_score > 100 {
            return Err(ScoringError::InvalidConfig(format!(
                "max_score {} exceeds 100",
                self.max_score
            )));
        }
        if self.suspicious_threshold > self.high_risk_threshold {
            return Err(ScoringError::InvalidConfig(format!(
                "suspicious_threshold {} exceeds high_risk_threshold {}",
                self.suspicious_threshold, self.high_risk_threshold
            )));
        }
        Ok(())
    }

    pub fn classify(&self, score: u8) -> RiskLabel {
        RiskLabel::with_thresholds(score, self.high_risk_threshold, self.suspicious_threshold)
    }
}

/// Scores transaction batches
pub struct ScoringEngine {
    rules: RuleSet,
}

impl ScoringEngine {
    /// Create an engine with the default rule weights
    pub fn new() -> Self {
        Self {
            rules: RuleSet::new(),
        }
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: ScoringConfig) -> Result<Self, ScoringError> {
        Ok(Self {
            rules: RuleSet::with_config(config)?,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        self.rules.config()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn classify(&self, score: u8) -> RiskLabel {
        self.config().classify(score)
    }

    /// Score one transaction against precomputed batch context.
    pub fn score(&self, transaction: &Transaction, context: &BatchContext<'_>) -> ScoredTransaction {
        let evaluation = self.rules.evaluate(transaction, context);
        // cap after summing, never per rule
        let risk_score = evaluation.points.min(u32::from(self.config().max_score)) as u8;

        ScoredTransaction {
            transaction: transaction.clone(),
            risk_score,
            triggered_rules: evaluation.explanations(),
            risk_label: self.classify(risk_score),
            fired_rules: evaluation.hits.iter().map(|h| h.rule).collect(),
        }
    }

    /// Score every transaction of a batch, preserving input order.
    pub fn process(&self, transactions: &[Transaction]) -> Vec<ScoredTransaction> {
        let context = BatchContext::from_transactions(transactions);

        #[cfg(feature = "parallel")]
        let scored: Vec<ScoredTransaction> = {
            use rayon::prelude::*;
            transactions
                .par_iter()
                .map(|tx| self.score(tx, &context))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let scored: Vec<ScoredTransaction> = transactions
            .iter()
            .map(|tx| self.score(tx, &context))
            .collect();

        let counts = label_counts(&scored);
        info!(
            records = scored.len(),
            customers = context.customer_total(),
            high_risk = counts[&RiskLabel::HighRisk],
            suspicious = counts[&RiskLabel::Suspicious],
            normal = counts[&RiskLabel::Normal],
            "Scored transaction batch"
        );

        scored
    }

    pub fn process_batch(&self, batch: &Batch) -> ScoredBatch {
        ScoredBatch {
            records: self.process(batch.transactions()),
        }
    }

    /// Ingest raw rows and score them. Structural errors return no records.
    pub fn score_records(&self, rows: Vec<Map<String, Value>>) -> Result<ScoredBatch, ScoringError> {
        let batch = Batch::from_records(rows)?;
        Ok(self.process_batch(&batch))
    }

    /// Ingest a JSON array of row objects and score it.
    pub fn score_json(&self, json: &str) -> Result<ScoredBatch, ScoringError> {
        let batch = Batch::from_json_str(json)?;
        Ok(self.process_batch(&batch))
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Count records per risk label; every label is present.
pub(crate) fn label_counts(records: &[ScoredTransaction]) -> BTreeMap<RiskLabel, usize> {
    let mut counts: BTreeMap<RiskLabel, usize> = RiskLabel::ALL.iter().map(|l| (*l, 0)).collect();
    for record in records {
        *counts.entry(record.risk_label).or_default() += 1;
    }
    counts
}


#[cfg(test)]
mod tests {
    use super::test_support::quiet_transaction;
    use super::*;
    use serde_json::json;

    fn row(id: &str, customer: &str) -> Map<String, Value> {
        let value = json!({
            "transaction_id": id,
            "customer_id": customer,
            "transaction_datetime": "2024-03-01 14:10:00",
            "amount_in_inr": 1500.0,
            "channel": "POS",
            "merchant_name": "Local Store",
            "merchant_category": "Grocery",
            "merchant_city": "Pune",
            "state": "Maharashtra",
            "is_international": false,
            "is_chip_used": true,
            "is_fraud": 0,
            "card_last4": "4242"
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_label_boundaries() {
        assert_eq!(RiskLabel::from_score(0), RiskLabel::Normal);
        assert_eq!(RiskLabel::from_score(39), RiskLabel::Normal);
        assert_eq!(RiskLabel::from_score(40), RiskLabel::Suspicious);
        assert_eq!(RiskLabel::from_score(69), RiskLabel::Suspicious);
        assert_eq!(RiskLabel::from_score(70), RiskLabel::HighRisk);
        assert_eq!(RiskLabel::from_score(100), RiskLabel::HighRisk);
    }

    #[test]
    fn test_scenario_international_high_amount() {
        let engine = ScoringEngine::new();
        let mut tx = quiet_transaction("TXN-A", "C100");
        tx.amount_in_inr = 25_000.0;
        tx.is_international = Some(true);
        tx.channel = Channel::Atm;

        let scored = engine.process(&[tx]);
        assert_eq!(scored[0].risk_score, 55);
        assert_eq!(scored[0].risk_label, RiskLabel::Suspicious);
        assert_eq!(scored[0].triggered_rules.len(), 2);
        assert_eq!(
            scored[0].fired_rules,
            vec![RuleKind::HighAmount, RuleKind::International]
        );
    }

    #[test]
    fn test_scenario_late_night_unknown_vendor() {
        let engine = ScoringEngine::new();
        let mut tx = quiet_transaction("TXN-B", "C200");
        tx.amount_in_inr = 500.0;
        tx.channel = Channel::Online;
        tx.merchant_name = "Unknown Vendor".to_string();
        tx.set_datetime("2024-03-01 02:15:00");

        let scored = engine.process(&[tx]);
        assert_eq!(scored[0].risk_score, 30);
        assert_eq!(scored[0].risk_label, RiskLabel::Normal);
        assert_eq!(
            scored[0].triggered_rules,
            vec![
                "Late night online transaction at 02:00 hours".to_string(),
                "Suspicious merchant name: Unknown Vendor".to_string(),
            ]
        );
    }

    #[test]
    fn test_all_rules_cap_at_100() {
        let engine = ScoringEngine::new();
        let batch: Vec<Transaction> = (0..4)
            .map(|i| {
                let mut tx = quiet_transaction(&format!("TXN-{}", i), "C001");
                tx.amount_in_inr = 50_000.0;
                tx.is_international = Some(true);
                tx.channel = Channel::Online;
                tx.merchant_name = "Midnight Foreign Traders".to_string();
                tx.set_datetime("2024-03-01 00:30:00");
                tx
            })
            .collect();

        for record in engine.process(&batch) {
            assert_eq!(record.risk_score, 100);
            assert_eq!(record.risk_label, RiskLabel::HighRisk);
            assert_eq!(record.triggered_rules.len(), 5);
        }
    }

    #[test]
    fn test_cap_applies_after_aggregation() {
        let config = ScoringConfig {
            high_amount_points: 80,
            international_points: 80,
            ..Default::default()
        };
        let engine = ScoringEngine::with_config(config).unwrap();
        let mut tx = quiet_transaction("TXN-1", "C1");
        tx.amount_in_inr = 30_000.0;
        tx.is_international = Some(true);

        let scored = engine.process(&[tx]);
        assert_eq!(scored[0].risk_score, 100);
        assert_eq!(scored[0].triggered_rules.len(), 2);
    }

    #[test]
    fn test_velocity_depends_on_batch() {
        let engine = ScoringEngine::new();
        let four: Vec<Transaction> = (0..4)
            .map(|i| quiet_transaction(&format!("TXN-{}", i), "C001"))
            .collect();
        for record in engine.process(&four) {
            assert_eq!(record.risk_score, 15);
            assert!(record.triggered_rules[0].contains('4'));
        }

        let three = &four[..3];
        for record in engine.process(three) {
            assert_eq!(record.risk_score, 0);
            assert!(record.triggered_rules.is_empty());
        }
    }

    #[test]
    fn test_order_does_not_change_scores() {
        let engine = ScoringEngine::new();
        let mut batch: Vec<Transaction> = (0..5)
            .map(|i| quiet_transaction(&format!("TXN-{}", i), if i % 2 == 0 { "C1" } else { "C2" }))
            .collect();
        batch[1].amount_in_inr = 45_000.0;

        let forward = engine.process(&batch);
        batch.reverse();
        let backward = engine.process(&batch);

        for record in &forward {
            let twin = backward
                .iter()
                .find(|r| r.transaction.transaction_id == record.transaction.transaction_id)
                .unwrap();
            assert_eq!(record.risk_score, twin.risk_score);
            assert_eq!(record.triggered_rules, twin.triggered_rules);
        }
    }

    #[test]
    fn test_monotonic_in_amount() {
        let engine = ScoringEngine::new();
        let mut tx = quiet_transaction("TXN-1", "C1");
        tx.amount_in_inr = 15_000.0;
        let low = engine.process(&[tx.clone()])[0].risk_score;
        tx.amount_in_inr = 25_000.0;
        let high = engine.process(&[tx])[0].risk_score;
        assert!(high >= low);
    }

    #[test]
    fn test_rescoring_enriched_output_is_idempotent() {
        let engine = ScoringEngine::new();
        let mut rows: Vec<Map<String, Value>> =
            (0..4).map(|i| row(&format!("TXN-{}", i), "C001")).collect();
        rows[0].insert("amount_in_inr".to_string(), json!(31000));
        rows.push(row("TXN-9", "C009"));

        let first = engine.score_records(rows).unwrap();
        let exported = first.to_json().unwrap();
        assert!(exported.contains("\"risk_label\": \"Normal\""));

        let second = engine.score_json(&exported).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.records().iter().zip(second.records()) {
            assert_eq!(a.risk_score, b.risk_score);
            assert_eq!(a.triggered_rules, b.triggered_rules);
            assert_eq!(a.risk_label, b.risk_label);
        }
    }

    #[test]
    fn test_missing_amount_column_is_fatal() {
        let engine = ScoringEngine::new();
        let mut rows = vec![row("TXN-1", "C1"), row("TXN-2", "C2")];
        rows[1].remove("amount_in_inr");

        let result = engine.score_records(rows);
        assert!(matches!(
            result,
            Err(ScoringError::MissingField { ref column, row: 1 }) if column == "amount_in_inr"
        ));
    }

    #[test]
    fn test_null_timestamp_row_does_not_abort_batch() {
        let engine = ScoringEngine::new();
        let mut broken = row("TXN-1", "C1");
        broken.insert("transaction_datetime".to_string(), Value::Null);
        broken.insert("channel".to_string(), json!("Online"));
        let mut large = row("TXN-2", "C2");
        large.insert("amount_in_inr".to_string(), json!(25000));

        let scored = engine.score_records(vec![broken, large]).unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored.records()[0].risk_score, 0);
        assert_eq!(scored.records()[1].risk_score, 30);
        assert_eq!(scored.records()[1].risk_label, RiskLabel::Normal);
    }

    #[test]
    fn test_yes_is_not_international() {
        let engine = ScoringEngine::new();
        let mut yes = row("TXN-1", "C1");
        yes.insert("is_international".to_string(), json!("yes"));
        let mut upper = row("TXN-2", "C2");
        upper.insert("is_international".to_string(), json!("True"));

        let scored = engine.score_records(vec![yes, upper]).unwrap();
        assert_eq!(scored.records()[0].risk_score, 0);
        assert!(scored.records()[0].triggered_rules.is_empty());
        assert_eq!(scored.records()[1].risk_score, 25);
    }

    #[test]
    fn test_padded_channel_is_not_online() {
        let engine = ScoringEngine::new();
        let mut padded = row("TXN-1", "C1");
        padded.insert("channel".to_string(), json!(" Online "));
        padded.insert("transaction_datetime".to_string(), json!("2024-03-01 02:00:00"));
        let mut exact = padded.clone();
        exact.insert("transaction_id".to_string(), json!("TXN-2"));
        exact.insert("customer_id".to_string(), json!("C2"));
        exact.insert("channel".to_string(), json!("Online"));

        let scored = engine.score_records(vec![padded, exact]).unwrap();
        assert_eq!(scored.records()[0].risk_score, 0);
        assert_eq!(scored.records()[1].risk_score, 20);
    }

    #[test]
    fn test_bad_timestamp_only_silences_late_night_rule() {
        let engine = ScoringEngine::new();
        let mut broken = quiet_transaction("TXN-1", "C1");
        broken.channel = Channel::Online;
        broken.is_international = Some(true);
        broken.set_datetime("not a timestamp");
        let mut healthy = quiet_transaction("TXN-2", "C2");
        healthy.channel = Channel::Online;
        healthy.set_datetime("2024-03-01 03:59:59");

        let scored = engine.process(&[broken, healthy]);
        assert_eq!(scored[0].risk_score, 25);
        assert_eq!(scored[1].risk_score, 20);
    }

    #[test]
    fn test_config_validation() {
        let config = ScoringConfig {
            suspicious_threshold: 80,
            ..Default::default()
        };
        assert!(matches!(
            ScoringEngine::with_config(config),
            Err(ScoringError::InvalidConfig(_))
        ));

        let config = ScoringConfig::from_json_str(r#"{"velocity_threshold": 1}"#).unwrap();
        assert_eq!(config.velocity_threshold, 1);
        assert_eq!(config.high_amount_points, 30);

        assert!(ScoringConfig::from_json_str(r#"{"late_night_end_hour": 0}"#).is_err());
    }

    #[test]
    fn test_custom_tier_thresholds() {
        let config = ScoringConfig {
            high_risk_threshold: 50,
            suspicious_threshold: 20,
            ..Default::default()
        };
        let engine = ScoringEngine::with_config(config).unwrap();
        assert_eq!(engine.classify(55), RiskLabel::HighRisk);
        assert_eq!(engine.classify(20), RiskLabel::Suspicious);
        assert_eq!(engine.classify(19), RiskLabel::Normal);
    }

    #[test]
    fn test_scores_always_in_range() {
        let engine = ScoringEngine::new();
        let batch: Vec<Transaction> = (0..12)
            .map(|i| {
                let mut tx = quiet_transaction(&format!("TXN-{}", i), "C1");
                tx.amount_in_inr = (i as f64) * 5_000.0;
                tx.is_international = Some(i % 2 == 0);
                tx
            })
            .collect();
        for record in engine.process(&batch) {
            assert!(record.risk_score <= 100);
            assert_eq!(record.risk_label, RiskLabel::from_score(record.risk_score));
        }
    }

    #[test]
    fn test_channel_round_trip() {
        assert_eq!(Channel::from("Online"), Channel::Online);
        assert_eq!(Channel::from("online"), Channel::Other("online".to_string()));
        assert_eq!(Channel::from("UPI").to_string(), "UPI");
        assert_eq!(String::from(Channel::Atm), "ATM");
    }

    #[test]
    fn test_json_export_is_flat() {
        let engine = ScoringEngine::new();
        let scored = engine.process_batch(&Batch::new(vec![quiet_transaction("TXN-001", "C1")]));
        let json = scored.to_json().unwrap();
        assert!(json.contains("\"transaction_id\": \"TXN-001\""));
        assert!(json.contains("\"risk_score\": 0"));
        assert!(json.contains("\"triggered_rules\": []"));
        assert!(!json.contains("parsed_datetime"));
        assert!(!json.contains("fired_rules"));
    }

    #[test]
    fn test_get_returns_first_match() {
        let engine = ScoringEngine::new();
        let mut twin = quiet_transaction("TXN-001", "C2");
        twin.amount_in_inr = 30_000.0;
        let scored = engine.process_batch(&Batch::new(vec![quiet_transaction("TXN-001", "C1"), twin]));

        assert_eq!(scored.get("TXN-001").unwrap().transaction.customer_id, "C1");
        assert!(scored.get("TXN-404").is_none());
    }
}
