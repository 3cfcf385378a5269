//! Minor-Unit Money Helpers
//!
//! All amounts in this workspace are integer minor units. Never use f64
//! for money.

/// Human-readable rendering of a minor-unit amount.
///
/// Two-decimal currencies get a symbol where we know one; everything
/// else falls back to `"<minor units> <CODE>"`.
pub fn format_minor_units(amount: i64, currency: &str) -> String {
    match currency.to_ascii_lowercase().as_str() {
        "usd" => format!("${}.{:02}", amount / 100, (amount % 100).abs()),
        "eur" => format!("€{}.{:02}", amount / 100, (amount % 100).abs()),
        other => format!("{} {}", amount, other.to_ascii_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_formatting() {
        assert_eq!(format_minor_units(4900, "usd"), "$49.00");
        assert_eq!(format_minor_units(5, "USD"), "$0.05");
        assert_eq!(format_minor_units(0, "usd"), "$0.00");
    }

    #[test]
    fn test_unknown_currency_falls_back() {
        assert_eq!(format_minor_units(1200, "jpy"), "1200 JPY");
    }
}
