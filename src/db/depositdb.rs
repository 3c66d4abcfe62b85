// db/depositdb.rs
use async_trait::async_trait;
use num_traits::Zero;
use sqlx::{types::BigDecimal, Error};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::depositmodel::*;

#[async_trait]
pub trait DepositExt {
    /// Sum of completed ledger entries.
    async fn get_deposit_balance(&self, handyman_id: Uuid) -> Result<BigDecimal, Error>;

    /// Appends a credit. Debits go through `debit_deposit`.
    async fn insert_deposit(&self, new: NewDepositTransaction) -> Result<DepositTransaction, Error>;

    /// Appends a completed debit only if the completed balance covers it,
    /// checked under an exclusive lock on the artisan's profile row. Artisans
    /// without a profile are always refused.
    async fn debit_deposit(&self, new: NewDepositTransaction) -> Result<DebitOutcome, Error>;

    /// Newest first.
    async fn list_deposit_transactions(&self, handyman_id: Uuid) -> Result<Vec<DepositTransaction>, Error>;
}

const BALANCE_QUERY: &str = r#"
    SELECT COALESCE(SUM(amount), 0)
    FROM deposit_transactions
    WHERE handyman_id = $1 AND status = 'completed'
"#;

const INSERT_QUERY: &str = r#"
    INSERT INTO deposit_transactions (handyman_id, kind, amount, status, reference)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING *
"#;

#[async_trait]
impl DepositExt for DBClient {
    async fn get_deposit_balance(&self, handyman_id: Uuid) -> Result<BigDecimal, Error> {
        sqlx::query_scalar::<_, BigDecimal>(BALANCE_QUERY)
            .bind(handyman_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_deposit(&self, new: NewDepositTransaction) -> Result<DepositTransaction, Error> {
        sqlx::query_as::<_, DepositTransaction>(INSERT_QUERY)
            .bind(new.handyman_id)
            .bind(new.kind)
            .bind(&new.amount)
            .bind(new.status)
            .bind(&new.reference)
            .fetch_one(&self.pool)
            .await
    }

    async fn debit_deposit(&self, new: NewDepositTransaction) -> Result<DebitOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM handyman_profiles WHERE user_id = $1 FOR UPDATE")
            .bind(new.handyman_id)
            .fetch_optional(&mut *tx)
            .await?;

        let balance = sqlx::query_scalar::<_, BigDecimal>(BALANCE_QUERY)
            .bind(new.handyman_id)
            .fetch_one(&mut *tx)
            .await?;

        // without a profile row there is nothing to serialize debits on
        let required = -new.amount.clone();
        if locked.is_none() || required <= BigDecimal::zero() || required > balance {
            return Ok(DebitOutcome::Insufficient { balance });
        }

        let entry = sqlx::query_as::<_, DepositTransaction>(INSERT_QUERY)
            .bind(new.handyman_id)
            .bind(new.kind)
            .bind(&new.amount)
            .bind(DepositStatus::Completed)
            .bind(&new.reference)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DebitOutcome::Applied(entry))
    }

    async fn list_deposit_transactions(&self, handyman_id: Uuid) -> Result<Vec<DepositTransaction>, Error> {
        sqlx::query_as::<_, DepositTransaction>(
            r#"
            SELECT * FROM deposit_transactions
            WHERE handyman_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(handyman_id)
        .fetch_all(&self.pool)
        .await
    }
}
