//! Transaction scoring example
//!
//! Scores a small batch of card transactions and prints each record's risk
//! score, tier and the rules that fired, followed by a batch summary.
//!
//! Run with `RUST_LOG=card_risk_scorer=debug` to see individual rule hits.

use card_risk_scorer::display::{format_inr, mask_card};
use card_risk_scorer::report::date_bounds;
use card_risk_scorer::{Batch, Page, RiskLabel, ScoringEngine, TransactionFilter, REQUIRED_COLUMNS};

fn row(cells: [&str; 13]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("card_risk_scorer=info".parse()?),
        )
        .init();

    println!("=== Card Transaction Risk Scoring ===\n");

    let rows = vec![
        row(["TXN-1001", "C001", "2024-03-01 10:15:00", "25000", "ATM", "Local Store", "Grocery", "Pune", "Maharashtra", "TRUE", "TRUE", "0", "4242"]),
        row(["TXN-1002", "C002", "2024-03-01 02:40:00", "500", "Online", "Unknown Vendor", "Electronics", "Mumbai", "Maharashtra", "false", "false", "1", "1881"]),
        row(["TXN-1003", "C003", "2024-03-02 00:20:00", "72000", "Online", "Midnight Foreign Traders", "Jewellery", "Delhi", "Delhi", "true", "false", "1", "0007"]),
        row(["TXN-1004", "C003", "2024-03-02 00:35:00", "68000", "Online", "Midnight Foreign Traders", "Jewellery", "Delhi", "Delhi", "true", "false", "1", "0007"]),
        row(["TXN-1005", "C003", "2024-03-02 00:50:00", "1200", "POS", "Chai Point", "Food", "Delhi", "Delhi", "false", "true", "0", "0007"]),
        row(["TXN-1006", "C003", "2024-03-02 09:05:00", "850", "POS", "Chai Point", "Food", "Delhi", "Delhi", "false", "true", "0", "0007"]),
        row(["TXN-1007", "C004", "not recorded", "15000", "Online", "Big Bazaar", "Grocery", "Chennai", "Tamil Nadu", "false", "true", "0", "5521"]),
    ];

    let batch = Batch::from_table(&REQUIRED_COLUMNS, &rows)?;
    let engine = ScoringEngine::new();
    let scored = engine.process_batch(&batch);

    let page = Page::of(scored.records(), 1, 5);
    println!("Page {} of {}", page.number, page.total_pages);
    for record in page.items {
        let tx = &record.transaction;
        println!(
            "{}  {}  {:>12}  score {:>3}  {}",
            tx.transaction_id,
            mask_card(&tx.card_last4),
            format_inr(tx.amount_in_inr, 2),
            record.risk_score,
            record.risk_label
        );
        for rule in &record.triggered_rules {
            println!("    - {}", rule);
        }
    }
    println!();

    let flagged = TransactionFilter::new()
        .risk_label(RiskLabel::HighRisk)
        .apply(scored.records());
    println!("High risk transactions: {}", flagged.len());

    if let Some((from, to)) = date_bounds(scored.records()) {
        println!("Date range: {} to {}", from, to);
    }

    let summary = scored.summary();
    println!("Total amount: {}", format_inr(summary.total_amount, 2));
    println!(
        "Fraud / Genuine: {} / {} ({:.1}%)",
        summary.fraud_count, summary.genuine_count, summary.fraud_rate
    );
    println!("\nSummary JSON:\n{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
