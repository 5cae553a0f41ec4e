//! Read-only views over scored batches: summaries, filters and pagination

use crate::{label_counts, Channel, RiskLabel, RuleKind, ScoredTransaction};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Headline figures for a scored batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_transactions: usize,
    pub total_amount: f64,
    pub unique_customers: usize,
    /// Records labelled fraud in the source data
    pub fraud_count: usize,
    pub genuine_count: usize,
    /// Percentage of records labelled fraud, 0 for an empty batch
    pub fraud_rate: f64,
    pub highest_amount: f64,
    pub average_risk_score: f64,
    pub label_counts: BTreeMap<RiskLabel, usize>,
    pub rule_hit_counts: BTreeMap<RuleKind, usize>,
    pub fraud_by_channel: BTreeMap<String, usize>,
    pub fraud_by_state: BTreeMap<String, usize>,
    /// Fraud records per calendar day; records without a parseable timestamp are left out
    pub fraud_by_date: BTreeMap<NaiveDate, usize>,
    /// Every merchant category, most fraud first
    pub categories: Vec<CategoryBreakdown>,
}

/// Number of categories the dashboard ranks by fraud count
pub const TOP_FRAUD_CATEGORIES: usize = 8;

/// Fraud and total counts for one merchant category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub fraud_count: usize,
    pub total_count: usize,
}

impl BatchSummary {
    pub fn from_scored(records: &[ScoredTransaction]) -> Self {
        let total_transactions = records.len();
        let mut total_amount = 0.0;
        let mut highest_amount: f64 = 0.0;
        let mut score_sum: u64 = 0;
        let mut customers = HashSet::new();
        let mut fraud_count = 0;
        let mut genuine_count = 0;
        let mut rule_hit_counts: BTreeMap<RuleKind, usize> =
            RuleKind::ALL.iter().map(|r| (*r, 0)).collect();
        let mut fraud_by_channel = BTreeMap::new();
        let mut fraud_by_state = BTreeMap::new();
        let mut fraud_by_date = BTreeMap::new();
        let mut by_category: BTreeMap<&str, CategoryBreakdown> = BTreeMap::new();

        for record in records {
            let tx = &record.transaction;
            total_amount += tx.amount_in_inr;
            highest_amount = highest_amount.max(tx.amount_in_inr);
            score_sum += u64::from(record.risk_score);
            customers.insert(tx.customer_id.as_str());

            for rule in &record.fired_rules {
                *rule_hit_counts.entry(*rule).or_default() += 1;
            }

            let category = by_category
                .entry(tx.merchant_category.as_str())
                .or_insert_with(|| CategoryBreakdown {
                    category: tx.merchant_category.clone(),
                    fraud_count: 0,
                    total_count: 0,
                });
            category.total_count += 1;

            match tx.is_fraud {
                Some(true) => {
                    fraud_count += 1;
                    category.fraud_count += 1;
                    *fraud_by_channel.entry(tx.channel.to_string()).or_default() += 1;
                    *fraud_by_state.entry(tx.state.clone()).or_default() += 1;
                    if let Some(dt) = tx.parsed_datetime {
                        *fraud_by_date.entry(dt.date()).or_default() += 1;
                    }
                }
                Some(false) => genuine_count += 1,
                None => {}
            }
        }

        // stable sort keeps categories alphabetical within equal fraud counts
        let mut categories: Vec<CategoryBreakdown> = by_category.into_values().collect();
        categories.sort_by(|a, b| b.fraud_count.cmp(&a.fraud_count));

        let (fraud_rate, average_risk_score) = if total_transactions == 0 {
            (0.0, 0.0)
        } else {
            (
                fraud_count as f64 / total_transactions as f64 * 100.0,
                score_sum as f64 / total_transactions as f64,
            )
        };

        Self {
            total_transactions,
            total_amount,
            unique_customers: customers.len(),
            fraud_count,
            genuine_count,
            fraud_rate,
            highest_amount,
            average_risk_score,
            label_counts: label_counts(records),
            rule_hit_counts,
            fraud_by_channel,
            fraud_by_state,
            fraud_by_date,
            categories,
        }
    }

    /// Categories with the most fraud, at most `TOP_FRAUD_CATEGORIES`
    pub fn top_fraud_categories(&self) -> &[CategoryBreakdown] {
        &self.categories[..self.categories.len().min(TOP_FRAUD_CATEGORIES)]
    }
}

/// Conjunctive filter over scored records. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    state: Option<String>,
    city: Option<String>,
    channel: Option<Channel>,
    risk_label: Option<RiskLabel>,
    search: Option<String>,
    date_range: Option<(NaiveDate, NaiveDate)>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn risk_label(mut self, label: RiskLabel) -> Self {
        self.risk_label = Some(label);
        self
    }

    /// Case-insensitive match on transaction id or merchant name
    pub fn search(mut self, query: &str) -> Self {
        let query = query.trim();
        self.search = if query.is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
        self
    }

    /// Inclusive on both ends. Records without a parseable timestamp never match.
    pub fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn matches(&self, record: &ScoredTransaction) -> bool {
        let tx = &record.transaction;

        if self.state.as_ref().is_some_and(|s| *s != tx.state) {
            return false;
        }
        if self.city.as_ref().is_some_and(|c| *c != tx.merchant_city) {
            return false;
        }
        if self.channel.as_ref().is_some_and(|c| *c != tx.channel) {
            return false;
        }
        if self.risk_label.is_some_and(|l| l != record.risk_label) {
            return false;
        }
        if let Some(query) = &self.search {
            if !tx.transaction_id.to_lowercase().contains(query)
                && !tx.merchant_name.to_lowercase().contains(query)
            {
                return false;
            }
        }
        if let Some((from, to)) = self.date_range {
            match tx.parsed_datetime {
                Some(dt) if dt.date() >= from && dt.date() <= to => {}
                _ => return false,
            }
        }
        true
    }

    /// Matching records in input order
    pub fn apply<'a>(&self, records: &'a [ScoredTransaction]) -> Vec<&'a ScoredTransaction> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Earliest and latest parsed dates in a batch
pub fn date_bounds(records: &[ScoredTransaction]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records
        .iter()
        .filter_map(|r| r.transaction.parsed_datetime.map(|dt| dt.date()));
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Distinct values of a text column, sorted, for filter choices
pub fn distinct_values<F>(records: &[ScoredTransaction], column: F) -> Vec<String>
where
    F: Fn(&ScoredTransaction) -> &str,
{
    let mut values: Vec<String> = records
        .iter()
        .map(|r| column(r).to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    values.sort();
    values
}

/// One page of a result list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<'a, T> Page<'a, T> {
    /// Slice out page `number`, clamped into `1..=total_pages`.
    pub fn of(items: &'a [T], number: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = items.len().div_ceil(page_size).max(1);
        let number = number.clamp(1, total_pages);
        let start = ((number - 1) * page_size).min(items.len());
        let end = (start + page_size).min(items.len());

        Self {
            items: &items[start..end],
            number,
            total_pages,
            total_items: items.len(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}
