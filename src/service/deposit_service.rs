// service/deposit_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{SecondsFormat, Utc};
use num_traits::Zero;
use uuid::Uuid;

use crate::{
    db::{db::MarketplaceStore, depositdb::DepositExt},
    models::depositmodel::*,
    service::{error::ServiceError, fee_service::DEFAULT_FEE_PERCENT},
    utils::currency::{percent_of, round_half_up},
};

/// Outcome of a platform fee deduction.
#[derive(Debug, Clone)]
pub enum FeeDeduction {
    Deducted(DepositTransaction),
    /// Zero fee, nothing written.
    NothingDue,
    /// The balance could not cover the fee; nothing written.
    Refused { balance: BigDecimal },
}

impl FeeDeduction {
    pub fn succeeded(&self) -> bool {
        !matches!(self, FeeDeduction::Refused { .. })
    }
}

#[derive(Debug, Clone)]
pub struct DepositService {
    store: Arc<dyn MarketplaceStore>,
    currency_decimals: i64,
}

impl DepositService {
    pub fn new(store: Arc<dyn MarketplaceStore>, currency_decimals: i64) -> Self {
        Self {
            store,
            currency_decimals,
        }
    }

    /// Fee the artisan must be able to cover for a job of `service_amount`.
    pub fn required_fee(&self, service_amount: &BigDecimal) -> BigDecimal {
        round_half_up(
            &percent_of(service_amount, &BigDecimal::from(DEFAULT_FEE_PERCENT)),
            self.currency_decimals,
        )
    }

    pub async fn deposit_balance(&self, handyman_id: Uuid) -> Result<BigDecimal, ServiceError> {
        Ok(self.store.get_deposit_balance(handyman_id).await?)
    }

    pub async fn has_sufficient_deposit(
        &self,
        handyman_id: Uuid,
        service_amount: &BigDecimal,
    ) -> Result<bool, ServiceError> {
        let balance = self.deposit_balance(handyman_id).await?;
        Ok(balance >= self.required_fee(service_amount))
    }

    /// Deducts the platform fee for `service_amount` through the balance gate.
    pub async fn deduct_platform_fee(
        &self,
        handyman_id: Uuid,
        service_amount: &BigDecimal,
    ) -> Result<FeeDeduction, ServiceError> {
        let fee = self.required_fee(service_amount);
        self.deduct_fee_amount(handyman_id, &fee).await
    }

    /// Deducts an already computed fee through the same balance gate.
    pub async fn deduct_fee_amount(
        &self,
        handyman_id: Uuid,
        fee: &BigDecimal,
    ) -> Result<FeeDeduction, ServiceError> {
        if fee.is_zero() {
            return Ok(FeeDeduction::NothingDue);
        }
        if fee < &BigDecimal::zero() {
            return Err(ServiceError::Validation("Fee cannot be negative".to_string()));
        }

        let reference = format!(
            "PLATFORM_FEE:{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let outcome = self
            .store
            .debit_deposit(NewDepositTransaction {
                handyman_id,
                kind: DepositType::Deduction,
                amount: -fee.clone(),
                status: DepositStatus::Completed,
                reference: Some(reference),
            })
            .await?;

        match outcome {
            DebitOutcome::Applied(entry) => {
                tracing::info!("Deducted platform fee {} from handyman {}", fee, handyman_id);
                Ok(FeeDeduction::Deducted(entry))
            }
            DebitOutcome::Insufficient { balance } => {
                tracing::warn!(
                    "Refused platform fee {} for handyman {}: balance {}",
                    fee,
                    handyman_id,
                    balance
                );
                Ok(FeeDeduction::Refused { balance })
            }
        }
    }

    pub async fn top_up_deposit(
        &self,
        handyman_id: Uuid,
        amount: &BigDecimal,
    ) -> Result<DepositTransaction, ServiceError> {
        let entry = NewDepositTransaction {
            handyman_id,
            kind: DepositType::Deposit,
            amount: round_half_up(amount, self.currency_decimals),
            status: DepositStatus::Completed,
            reference: Some(format!("TOPUP:{}", Uuid::new_v4())),
        };
        entry.check_sign().map_err(ServiceError::Validation)?;

        let stored = self.store.insert_deposit(entry).await?;
        tracing::info!("Handyman {} topped up deposit by {}", handyman_id, stored.amount);
        Ok(stored)
    }

    pub async fn withdraw_deposit(
        &self,
        handyman_id: Uuid,
        amount: &BigDecimal,
    ) -> Result<DepositTransaction, ServiceError> {
        let amount = round_half_up(amount, self.currency_decimals);
        let entry = NewDepositTransaction {
            handyman_id,
            kind: DepositType::Withdrawal,
            amount: -amount.clone(),
            status: DepositStatus::Completed,
            reference: Some(format!("WITHDRAW:{}", Uuid::new_v4())),
        };
        entry.check_sign().map_err(ServiceError::Validation)?;

        match self.store.debit_deposit(entry).await? {
            DebitOutcome::Applied(entry) => {
                tracing::info!("Handyman {} withdrew {} from deposit", handyman_id, amount);
                Ok(entry)
            }
            DebitOutcome::Insufficient { balance } => Err(ServiceError::InsufficientFunds {
                required: amount.to_string(),
                available: balance.to_string(),
            }),
        }
    }

    pub async fn ledger(&self, handyman_id: Uuid) -> Result<Vec<DepositTransaction>, ServiceError> {
        Ok(self.store.list_deposit_transactions(handyman_id).await?)
    }
}
