//! Membership tier pricing.

use serde::Serialize;
use storage::{MembershipStore, Money, UserId};

use crate::error::{DomainError, Result};

/// A computed rental price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Membership level the discount was taken from, if any.
    pub membership: Option<String>,
    pub duration_hours: u32,
    pub total: Money,
    pub discount: Money,
    pub final_price: Money,
}

impl PriceQuote {
    /// Prices `hours` at `hourly_rate` with a percentage discount.
    ///
    /// A total that does not fit in the money range is a validation error.
    pub fn compute(
        membership: Option<String>,
        hours: u32,
        hourly_rate: Money,
        discount_percentage: f64,
    ) -> Result<Self> {
        let out_of_range = || DomainError::validation("Invalid price_per_hour");
        let total = hourly_rate.checked_mul(hours).ok_or_else(out_of_range)?;
        let discount = total.percentage(discount_percentage);
        let final_price = total.checked_sub(discount).ok_or_else(out_of_range)?;
        Ok(Self {
            membership,
            duration_hours: hours,
            total,
            discount,
            final_price,
        })
    }
}

/// Prices rentals from the discount table of membership levels.
#[derive(Clone)]
pub struct TierPricing<S> {
    store: S,
}

impl<S: MembershipStore> TierPricing<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Prices a rental for a user at the discount of their tier.
    ///
    /// Any lookup failure degrades to no discount.
    #[tracing::instrument(skip(self))]
    pub async fn compute_tier_price(
        &self,
        user_id: UserId,
        hours: u32,
        hourly_rate: Money,
    ) -> Result<PriceQuote> {
        match self.lookup_discount(user_id).await {
            Ok((level, percentage)) => PriceQuote::compute(Some(level), hours, hourly_rate, percentage),
            Err(reason) => {
                tracing::warn!(%user_id, %reason, "tier discount unavailable, pricing without discount");
                PriceQuote::compute(None, hours, hourly_rate, 0.0)
            }
        }
    }

    /// Prices a rental at the discount of a named level.
    ///
    /// An unknown level is a validation error.
    #[tracing::instrument(skip(self))]
    pub async fn quote_for_level(
        &self,
        level: &str,
        hours: u32,
        hourly_rate: Money,
    ) -> Result<PriceQuote> {
        let percentage = self
            .store
            .discount_percentage(level)
            .await?
            .ok_or_else(|| DomainError::validation("Invalid membership level"))?;
        PriceQuote::compute(Some(level.to_string()), hours, hourly_rate, percentage)
    }

    async fn lookup_discount(&self, user_id: UserId) -> std::result::Result<(String, f64), String> {
        let level = self
            .store
            .membership_level(user_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "user has no membership level".to_string())?;
        let percentage = self
            .store
            .discount_percentage(&level)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no discount defined for level {level:?}"))?;
        Ok((level, percentage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::InMemoryStore;

    async fn pricing() -> (TierPricing<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::with_demo_fleet().await;
        store
            .set_membership_level(UserId::new(1), "VIP")
            .await
            .unwrap();
        (TierPricing::new(store.clone()), store)
    }

    #[test]
    fn test_compute_applies_percentage() {
        let quote = PriceQuote::compute(None, 5, Money::from_dollars(10), 20.0).unwrap();
        assert_eq!(quote.total, Money::from_dollars(50));
        assert_eq!(quote.discount, Money::from_dollars(10));
        assert_eq!(quote.final_price, Money::from_dollars(40));
    }

    #[test]
    fn test_compute_rejects_total_out_of_range() {
        let err = PriceQuote::compute(None, u32::MAX, Money::from_cents(i64::MAX / 2), 0.0)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid price_per_hour");
    }

    #[tokio::test]
    async fn test_tier_price_uses_user_level() {
        let (pricing, _) = pricing().await;

        let quote = pricing
            .compute_tier_price(UserId::new(1), 5, Money::from_dollars(10))
            .await
            .unwrap();
        assert_eq!(quote.membership.as_deref(), Some("VIP"));
        assert_eq!(quote.final_price, Money::from_dollars(40));
    }

    #[tokio::test]
    async fn test_tier_price_falls_back_to_no_discount() {
        let (pricing, store) = pricing().await;

        let unknown_user = pricing
            .compute_tier_price(UserId::new(99), 5, Money::from_dollars(10))
            .await
            .unwrap();
        assert_eq!(unknown_user.discount, Money::zero());
        assert_eq!(unknown_user.final_price, Money::from_dollars(50));

        store.set_fail_membership_reads(true).await;
        let failed_lookup = pricing
            .compute_tier_price(UserId::new(1), 5, Money::from_dollars(10))
            .await
            .unwrap();
        assert_eq!(failed_lookup.final_price, Money::from_dollars(50));
        assert!(failed_lookup.membership.is_none());
    }

    #[tokio::test]
    async fn test_quote_for_unknown_level_is_invalid() {
        let (pricing, _) = pricing().await;

        let quote = pricing
            .quote_for_level("Premium", 3, Money::from_dollars(20))
            .await
            .unwrap();
        assert_eq!(quote.final_price, Money::from_dollars(54));

        let err = pricing
            .quote_for_level("Platinum", 3, Money::from_dollars(20))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid membership level");
    }
}
