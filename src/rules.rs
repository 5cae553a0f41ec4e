//! Heuristic fraud rules evaluated per transaction

use crate::display::format_inr;
use crate::{Channel, ScoringConfig, ScoringError, Transaction};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// The five rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKind {
    HighAmount,
    International,
    LateNightOnline,
    Velocity,
    SuspiciousMerchant,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::HighAmount,
        RuleKind::International,
        RuleKind::LateNightOnline,
        RuleKind::Velocity,
        RuleKind::SuspiciousMerchant,
    ];
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::HighAmount => write!(f, "high_amount"),
            RuleKind::International => write!(f, "international"),
            RuleKind::LateNightOnline => write!(f, "late_night_online"),
            RuleKind::Velocity => write!(f, "velocity"),
            RuleKind::SuspiciousMerchant => write!(f, "suspicious_merchant"),
        }
    }
}

/// A triggered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleHit {
    pub rule: RuleKind,
    pub points: u32,
    pub explanation: String,
}

/// Value-level failure inside a single rule. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Unparseable transaction_datetime: {0:?}")]
    UnparseableTimestamp(String),

    #[error("Customer {0} is not part of the evaluated batch")]
    UnknownCustomer(String),
}

/// Outcome of running the rule set on one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEvaluation {
    /// Uncapped sum of triggered weights
    pub points: u32,
    pub hits: Vec<RuleHit>,
}

impl RuleEvaluation {
    fn push(&mut self, hit: RuleHit) {
        debug!(rule = %hit.rule, points = hit.points, "{}", hit.explanation);
        self.points = self.points.saturating_add(hit.points);
        self.hits.push(hit);
    }

    pub fn explanations(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.explanation.clone()).collect()
    }

    pub fn fired(&self, rule: RuleKind) -> bool {
        self.hits.iter().any(|h| h.rule == rule)
    }
}

/// Batch-wide facts computed once before any rule runs
#[derive(Debug, Clone, Default)]
pub struct BatchContext<'a> {
    customer_counts: HashMap<&'a str, usize>,
}

impl<'a> BatchContext<'a> {
    pub fn from_transactions(transactions: &'a [Transaction]) -> Self {
        let mut customer_counts = HashMap::new();
        for tx in transactions {
            *customer_counts.entry(tx.customer_id.as_str()).or_insert(0) += 1;
        }
        Self { customer_counts }
    }

    /// Records in the batch for this customer, including the record itself
    pub fn customer_count(&self, customer_id: &str) -> Option<usize> {
        self.customer_counts.get(customer_id).copied()
    }

    /// Number of distinct customers
    pub fn customer_total(&self) -> usize {
        self.customer_counts.len()
    }
}

/// The fixed rule set
#[derive(Debug, Clone)]
pub struct RuleSet {
    config: ScoringConfig,
    /// Lowercased once at construction
    keywords: Vec<String>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::from_valid_config(ScoringConfig::default())
    }

    /// Build from a custom configuration, rejecting an invalid one.
    pub fn with_config(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ScoringConfig) -> Self {
        let keywords = config
            .suspicious_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { config, keywords }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Run all five rules in order. A failing rule contributes nothing.
    pub fn evaluate(&self, transaction: &Transaction, context: &BatchContext<'_>) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::default();

        if let Some(hit) = self.check_high_amount(transaction) {
            evaluation.push(hit);
        }

        if let Some(hit) = self.check_international(transaction) {
            evaluation.push(hit);
        }

        match self.check_late_night_online(transaction) {
            Ok(Some(hit)) => evaluation.push(hit),
            Ok(None) => {}
            Err(e) => warn!(
                transaction_id = %transaction.transaction_id,
                rule = %RuleKind::LateNightOnline,
                "Rule skipped: {}", e
            ),
        }

        match self.check_velocity(transaction, context) {
            Ok(Some(hit)) => evaluation.push(hit),
            Ok(None) => {}
            Err(e) => warn!(
                transaction_id = %transaction.transaction_id,
                rule = %RuleKind::Velocity,
                "Rule skipped: {}", e
            ),
        }

        if let Some(hit) = self.check_suspicious_merchant(transaction) {
            evaluation.push(hit);
        }

        evaluation
    }

    /// Evaluate against a batch without a prebuilt context.
    pub fn evaluate_in_batch(&self, transaction: &Transaction, batch: &[Transaction]) -> RuleEvaluation {
        self.evaluate(transaction, &BatchContext::from_transactions(batch))
    }

    /// Rule 1: amount strictly above the threshold
    pub fn check_high_amount(&self, transaction: &Transaction) -> Option<RuleHit> {
        if transaction.amount_in_inr > self.config.high_amount_threshold {
            return Some(RuleHit {
                rule: RuleKind::HighAmount,
                points: self.config.high_amount_points,
                explanation: format!(
                    "High amount: {} (> {})",
                    format_inr(transaction.amount_in_inr, 2),
                    format_inr(self.config.high_amount_threshold, 0)
                ),
            });
        }
        None
    }

    /// Rule 2: international flag set
    pub fn check_international(&self, transaction: &Transaction) -> Option<RuleHit> {
        if transaction.is_international() {
            return Some(RuleHit {
                rule: RuleKind::International,
                points: self.config.international_points,
                explanation: "International transaction detected".to_string(),
            });
        }
        None
    }

    /// Rule 3: online channel inside the late-night window
    pub fn check_late_night_online(&self, transaction: &Transaction) -> Result<Option<RuleHit>, RuleError> {
        if transaction.channel != Channel::Online {
            return Ok(None);
        }

        let timestamp = transaction.parsed_datetime.ok_or_else(|| {
            RuleError::UnparseableTimestamp(transaction.transaction_datetime.clone())
        })?;
        let hour = timestamp.hour();

        if (self.config.late_night_start_hour..self.config.late_night_end_hour).contains(&hour) {
            return Ok(Some(RuleHit {
                rule: RuleKind::LateNightOnline,
                points: self.config.late_night_points,
                explanation: format!("Late night online transaction at {:02}:00 hours", hour),
            }));
        }
        Ok(None)
    }

    /// Rule 4: too many records for this customer in the batch
    pub fn check_velocity(
        &self,
        transaction: &Transaction,
        context: &BatchContext<'_>,
    ) -> Result<Option<RuleHit>, RuleError> {
        let count = context
            .customer_count(&transaction.customer_id)
            .ok_or_else(|| RuleError::UnknownCustomer(transaction.customer_id.clone()))?;

        if count > self.config.velocity_threshold {
            return Ok(Some(RuleHit {
                rule: RuleKind::Velocity,
                points: self.config.velocity_points,
                explanation: format!(
                    "Customer has {} transactions (potential velocity attack)",
                    count
                ),
            }));
        }
        Ok(None)
    }

    /// Rule 5: merchant name contains a suspicious keyword
    pub fn check_suspicious_merchant(&self, transaction: &Transaction) -> Option<RuleHit> {
        let merchant = transaction.merchant_name.to_lowercase();
        if self.keywords.iter().any(|k| merchant.contains(k.as_str())) {
            return Some(RuleHit {
                rule: RuleKind::SuspiciousMerchant,
                points: self.config.suspicious_merchant_points,
                explanation: format!("Suspicious merchant name: {}", transaction.merchant_name),
            });
        }
        None
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
