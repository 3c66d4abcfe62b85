// db/bookingdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::bookingmodel::*;

#[async_trait]
pub trait BookingExt {
    /// Inserts a `pending` booking together with its first timeline row.
    async fn create_booking(&self, new: NewBooking) -> Result<Booking, Error>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error>;

    /// Compare-and-set on status. Returns `None` when the booking is no longer
    /// in `from`. The timeline row and, on completion, the artisan's job counter
    /// are written in the same transaction.
    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        change: BookingChange,
    ) -> Result<Option<Booking>, Error>;

    async fn get_booking_timeline(&self, booking_id: Uuid) -> Result<Vec<BookingTimeline>, Error>;

    /// Inserts the review and recomputes the artisan's average rating.
    async fn create_review(
        &self,
        booking_id: Uuid,
        handyman_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error>;

    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, Error>;
}

#[async_trait]
impl BookingExt for DBClient {
    async fn create_booking(&self, new: NewBooking) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                client_id, handyman_id, service_id, booking_date, end_date,
                address, city, job_lat, job_lng, description, proposed_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(new.client_id)
        .bind(new.handyman_id)
        .bind(new.service_id)
        .bind(new.booking_date)
        .bind(new.end_date)
        .bind(&new.address)
        .bind(&new.city)
        .bind(new.job_location.map(|p| p.lat))
        .bind(new.job_location.map(|p| p.lng))
        .bind(&new.description)
        .bind(&new.proposed_price)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO booking_timeline (booking_id, status, at) VALUES ($1, $2, $3)")
            .bind(booking.id)
            .bind(BookingStatus::Pending)
            .bind(booking.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        change: BookingChange,
    ) -> Result<Option<Booking>, Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3,
                end_date = COALESCE($4, end_date),
                proposed_price = COALESCE($5, proposed_price),
                handyman_comment = COALESCE($6, handyman_comment),
                response_date = COALESCE($7, response_date),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(from)
        .bind(change.to)
        .bind(change.end_date)
        .bind(&change.proposed_price)
        .bind(&change.handyman_comment)
        .bind(change.response_date)
        .fetch_optional(&mut *tx)
        .await?;

        let booking = match updated {
            Some(booking) => booking,
            None => return Ok(None),
        };

        sqlx::query("INSERT INTO booking_timeline (booking_id, status) VALUES ($1, $2)")
            .bind(booking.id)
            .bind(booking.status)
            .execute(&mut *tx)
            .await?;

        if booking.status == BookingStatus::Completed {
            sqlx::query(
                r#"
                UPDATE handyman_profiles
                SET completed_jobs = completed_jobs + 1, updated_at = NOW()
                WHERE user_id = $1
                "#,
            )
            .bind(booking.handyman_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(booking))
    }

    async fn get_booking_timeline(&self, booking_id: Uuid) -> Result<Vec<BookingTimeline>, Error> {
        sqlx::query_as::<_, BookingTimeline>(
            "SELECT * FROM booking_timeline WHERE booking_id = $1 ORDER BY at ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_review(
        &self,
        booking_id: Uuid,
        handyman_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (booking_id, rating, comment)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE handyman_profiles
            SET rating = (
                    SELECT COALESCE(AVG(r.rating), 0)::float8
                    FROM reviews r
                    JOIN bookings b ON b.id = r.booking_id
                    WHERE b.handyman_id = $1
                ),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(handyman_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review)
    }

    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, Error> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }
}
