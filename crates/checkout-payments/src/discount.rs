//! Discount Codes
//!
//! Static demo code table with minor-unit quote math, plus best-effort
//! mirroring of applied codes as coupons/promotion codes on the
//! processor for tracking. The quote is authoritative; the processor
//! sync failing never invalidates it.

use serde::Serialize;

use crate::processor::ProcessorClient;

/// A recognized discount code.
#[derive(Clone, Copy, Debug)]
pub struct DiscountSpec {
    pub code: &'static str,
    pub percent_off: Option<i64>,
    pub amount_off: Option<i64>,
    pub description: &'static str,
}

const DISCOUNT_CODES: &[DiscountSpec] = &[
    DiscountSpec {
        code: "SAVE10",
        percent_off: Some(10),
        amount_off: None,
        description: "10% off",
    },
    DiscountSpec {
        code: "SAVE20",
        percent_off: Some(20),
        amount_off: None,
        description: "20% off",
    },
    DiscountSpec {
        code: "FLAT500",
        percent_off: None,
        amount_off: Some(500),
        description: "$5.00 off",
    },
    DiscountSpec {
        code: "WELCOME15",
        percent_off: Some(15),
        amount_off: None,
        description: "Welcome discount 15% off",
    },
    DiscountSpec {
        code: "FIRST25",
        percent_off: Some(25),
        amount_off: None,
        description: "First time customer 25% off",
    },
];

/// All recognized codes, for display.
pub fn all() -> &'static [DiscountSpec] {
    DISCOUNT_CODES
}

/// Case-insensitive code lookup.
pub fn find(code: &str) -> Option<&'static DiscountSpec> {
    let normalized = code.trim().to_ascii_uppercase();
    DISCOUNT_CODES.iter().find(|spec| spec.code == normalized)
}

/// A computed discount, in minor units.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub code: String,
    pub description: String,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub discounted_amount: i64,
    pub percent_off: Option<i64>,
    pub amount_off: Option<i64>,
}

impl DiscountSpec {
    /// Quote this code against an amount.
    ///
    /// Percentages round half up; fixed amounts floor the result at
    /// zero rather than going negative.
    pub fn quote(&self, original_amount: i64) -> DiscountQuote {
        let discount_amount = match (self.percent_off, self.amount_off) {
            (Some(percent), _) => (original_amount * percent + 50) / 100,
            (None, Some(amount)) => amount,
            (None, None) => 0,
        };

        DiscountQuote {
            code: self.code.to_string(),
            description: self.description.to_string(),
            original_amount,
            discount_amount,
            discounted_amount: (original_amount - discount_amount).max(0),
            percent_off: self.percent_off,
            amount_off: self.amount_off,
        }
    }
}

/// Mirror a code on the processor as a coupon + promotion code.
///
/// Returns the promotion code id when both calls go through. Any
/// failure (existing coupon, processor hiccup) is logged and the sync
/// skipped; the locally computed quote still stands.
pub async fn sync_to_processor(
    spec: &DiscountSpec,
    processor: &dyn ProcessorClient,
    currency: &str,
) -> Option<String> {
    let coupon = match processor
        .create_coupon(spec.code, spec.percent_off, spec.amount_off, currency)
        .await
    {
        Ok(coupon) => coupon,
        Err(error) => {
            tracing::debug!(code = spec.code, error = %error, "Coupon sync skipped");
            return None;
        }
    };

    match processor.create_promotion_code(&coupon.id, spec.code).await {
        Ok(promotion) => Some(promotion.id),
        Err(error) => {
            tracing::debug!(code = spec.code, error = %error, "Promotion code sync skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::MockProcessor;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(find("save10").is_some());
        assert!(find(" Save20 ").is_some());
        assert!(find("NOPE").is_none());
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 6099 = 914.85 -> 915
        let quote = find("WELCOME15").unwrap().quote(6099);
        assert_eq!(quote.discount_amount, 915);
        assert_eq!(quote.discounted_amount, 5184);
    }

    #[test]
    fn test_fixed_amount_floors_at_zero() {
        let quote = find("FLAT500").unwrap().quote(300);
        assert_eq!(quote.discount_amount, 500);
        assert_eq!(quote.discounted_amount, 0);
    }

    #[tokio::test]
    async fn test_sync_returns_promotion_code_id() {
        let processor = MockProcessor::new();
        let id = sync_to_processor(find("SAVE10").unwrap(), &processor, "usd").await;
        assert_eq!(id.as_deref(), Some("promo_coupon_SAVE10"));
    }

    #[tokio::test]
    async fn test_sync_failure_is_swallowed() {
        let processor = MockProcessor::new().with_failing_coupons();
        let id = sync_to_processor(find("SAVE10").unwrap(), &processor, "usd").await;
        assert!(id.is_none());
    }
}
