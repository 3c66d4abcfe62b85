// service/fee_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::MarketplaceStore, handymandb::HandymanExt},
    models::handymanmodel::PricingRule,
    service::error::ServiceError,
    utils::currency::{percent_of, round_half_up},
};

/// Platform commission used when no pricing rule is configured.
pub const DEFAULT_FEE_PERCENT: i64 = 11;

/// `amount * percent / 100` rounded to the currency unit, floored at the
/// rule minimum. Without a rule the fallback percent applies with no minimum.
pub fn apply_fee_rule(
    amount: &BigDecimal,
    rule: Option<&PricingRule>,
    fallback_percent: &BigDecimal,
    decimals: i64,
) -> BigDecimal {
    match rule {
        Some(rule) => {
            let fee = round_half_up(&percent_of(amount, &rule.fee_percent), decimals);
            if fee < rule.fee_min {
                rule.fee_min.clone()
            } else {
                fee
            }
        }
        None => round_half_up(&percent_of(amount, fallback_percent), decimals),
    }
}

#[derive(Debug, Clone)]
pub struct FeeService {
    store: Arc<dyn MarketplaceStore>,
    fallback_percent: BigDecimal,
    currency_decimals: i64,
}

impl FeeService {
    pub fn new(store: Arc<dyn MarketplaceStore>, fallback_percent: BigDecimal, currency_decimals: i64) -> Self {
        Self {
            store,
            fallback_percent,
            currency_decimals,
        }
    }

    /// Most specific active rule wins: the category's own rule, then the
    /// default (category-less) rule, then the fallback percent.
    pub async fn compute_platform_fee(
        &self,
        amount: &BigDecimal,
        category_id: Option<Uuid>,
    ) -> Result<BigDecimal, ServiceError> {
        let mut rule = None;
        if let Some(category_id) = category_id {
            rule = self.store.get_active_pricing_rule(Some(category_id)).await?;
        }
        if rule.is_none() {
            rule = self.store.get_active_pricing_rule(None).await?;
        }

        Ok(apply_fee_rule(
            amount,
            rule.as_ref(),
            &self.fallback_percent,
            self.currency_decimals,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memorydb::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> FeeService {
        FeeService::new(store, BigDecimal::from(DEFAULT_FEE_PERCENT), 0)
    }

    #[tokio::test]
    async fn test_fallback_without_rules() {
        let fees = service(Arc::new(MemoryStore::new()));
        let fee = fees.compute_platform_fee(&BigDecimal::from(10000), None).await.unwrap();
        assert_eq!(fee, BigDecimal::from(1100));

        // No minimum on the fallback
        let fee = fees.compute_platform_fee(&BigDecimal::from(100), None).await.unwrap();
        assert_eq!(fee, BigDecimal::from(11));
    }

    #[tokio::test]
    async fn test_category_rule_beats_default_rule() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        store.add_pricing_rule(None, 10, 0);
        store.add_pricing_rule(Some(plumbing.id), 15, 0);
        let fees = service(store);

        let fee = fees
            .compute_platform_fee(&BigDecimal::from(10000), Some(plumbing.id))
            .await
            .unwrap();
        assert_eq!(fee, BigDecimal::from(1500));

        let other = Uuid::new_v4();
        let fee = fees
            .compute_platform_fee(&BigDecimal::from(10000), Some(other))
            .await
            .unwrap();
        assert_eq!(fee, BigDecimal::from(1000));
    }

    #[tokio::test]
    async fn test_rule_minimum_is_a_floor() {
        let store = Arc::new(MemoryStore::new());
        store.add_pricing_rule(None, 11, 500);
        let fees = service(store);

        for amount in [1, 100, 2000, 4545] {
            let fee = fees
                .compute_platform_fee(&BigDecimal::from(amount), None)
                .await
                .unwrap();
            assert_eq!(fee, BigDecimal::from(500), "amount {}", amount);
        }

        let fee = fees
            .compute_platform_fee(&BigDecimal::from(10000), None)
            .await
            .unwrap();
        assert_eq!(fee, BigDecimal::from(1100));
    }

    #[test]
    fn test_fee_rounds_half_up_to_whole_units() {
        let fallback = BigDecimal::from(DEFAULT_FEE_PERCENT);
        // 11% of 4550 = 500.5
        assert_eq!(
            apply_fee_rule(&BigDecimal::from(4550), None, &fallback, 0),
            BigDecimal::from(501)
        );
        // 11% of 4540 = 499.4
        assert_eq!(
            apply_fee_rule(&BigDecimal::from(4540), None, &fallback, 0),
            BigDecimal::from(499)
        );
    }
}
