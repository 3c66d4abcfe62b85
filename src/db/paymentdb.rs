// db/paymentdb.rs
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

#[async_trait]
pub trait PaymentExt {
    /// Returns the booking's payment, creating it from `new` when absent.
    /// The flag is true when this call created the row.
    async fn get_or_create_payment(&self, new: NewPayment) -> Result<(Payment, bool), Error>;

    async fn get_payment_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, Error>;

    /// Marks the payment as being sent to its provider. Fails when it already
    /// has a reference or another caller holds a claim younger than
    /// `stale_after_secs`.
    async fn claim_payment_initiation(&self, payment_id: Uuid, stale_after_secs: i64) -> Result<bool, Error>;

    async fn release_payment_initiation(&self, payment_id: Uuid) -> Result<(), Error>;

    /// Records the provider reference and drops the claim. `None` when the
    /// payment already has a reference, which is never overwritten.
    async fn set_payment_reference(&self, payment_id: Uuid, reference: &str) -> Result<Option<Payment>, Error>;

    /// Applies `target` to the `method` payment identified by `reference`
    /// while holding its row lock. A reference belonging to another method is
    /// reported as not found. A log row is written only for an actual status
    /// change.
    async fn reconcile_payment(
        &self,
        reference: &str,
        method: PaymentMethod,
        target: PaymentStatus,
        note: &str,
    ) -> Result<ReconcileOutcome, Error>;

    async fn get_payment_logs(&self, payment_id: Uuid) -> Result<Vec<PaymentLog>, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn get_or_create_payment(&self, new: NewPayment) -> Result<(Payment, bool), Error> {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (booking_id, amount, platform_fee, method, currency)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (booking_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(new.booking_id)
        .bind(&new.amount)
        .bind(&new.platform_fee)
        .bind(new.method)
        .bind(&new.currency)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(payment) = created {
            return Ok((payment, true));
        }

        let existing = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE booking_id = $1")
            .bind(new.booking_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((existing, false))
    }

    async fn get_payment_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE transaction_id = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
    }

    async fn claim_payment_initiation(&self, payment_id: Uuid, stale_after_secs: i64) -> Result<bool, Error> {
        let claimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE payments
            SET initiating_at = NOW()
            WHERE id = $1
              AND transaction_id IS NULL
              AND (initiating_at IS NULL OR initiating_at < NOW() - make_interval(secs => $2))
            RETURNING id
            "#,
        )
        .bind(payment_id)
        .bind(stale_after_secs as f64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    async fn release_payment_initiation(&self, payment_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE payments SET initiating_at = NULL WHERE id = $1")
            .bind(payment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_payment_reference(&self, payment_id: Uuid, reference: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET transaction_id = $2, initiating_at = NULL, updated_at = NOW()
            WHERE id = $1 AND transaction_id IS NULL
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reconcile_payment(
        &self,
        reference: &str,
        method: PaymentMethod,
        target: PaymentStatus,
        note: &str,
    ) -> Result<ReconcileOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE transaction_id = $1 FOR UPDATE",
        )
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?;

        let mut payment = match locked {
            Some(payment) if payment.method == method => payment,
            _ => return Ok(ReconcileOutcome::NotFound),
        };

        if payment.status == target {
            return Ok(ReconcileOutcome::Unchanged(payment));
        }
        if !payment.status.can_transition_to(target) {
            return Ok(ReconcileOutcome::Rejected { current: payment.status });
        }

        let previous = payment.status;
        payment.apply_status(target, Utc::now());

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2, is_paid = $3, payment_date = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.status)
        .bind(payment.is_paid)
        .bind(payment.payment_date)
        .bind(payment.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        let log = sqlx::query_as::<_, PaymentLog>(
            r#"
            INSERT INTO payment_logs (payment_id, previous_status, new_status, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(previous)
        .bind(payment.status)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReconcileOutcome::Applied { payment, log })
    }

    async fn get_payment_logs(&self, payment_id: Uuid) -> Result<Vec<PaymentLog>, Error> {
        sqlx::query_as::<_, PaymentLog>(
            "SELECT * FROM payment_logs WHERE payment_id = $1 ORDER BY changed_at ASC",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
    }
}
