//! Display helpers for amounts and card numbers

/// Format an INR amount with comma thousands grouping, e.g. `₹25,000.00`.
pub fn format_inr(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match fraction {
        Some(fraction) => format!("{}₹{}.{}", sign, grouped, fraction),
        None => format!("{}₹{}", sign, grouped),
    }
}

/// Mask a card for display: `****1234`.
pub fn mask_card(last4: &str) -> String {
    format!("****{}", last4)
}
