// db/trackingdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::trackingmodel::*;

#[async_trait]
pub trait TrackingExt {
    async fn insert_tracking_point(&self, new: NewTrackingPoint) -> Result<JobTracking, Error>;

    async fn latest_tracking_point(&self, booking_id: Uuid) -> Result<Option<JobTracking>, Error>;

    /// One route row per booking; later writes replace the ETA.
    async fn upsert_booking_route(
        &self,
        booking_id: Uuid,
        eta_minutes: i32,
        source: &str,
    ) -> Result<BookingRoute, Error>;

    async fn get_booking_route(&self, booking_id: Uuid) -> Result<Option<BookingRoute>, Error>;
}

#[async_trait]
impl TrackingExt for DBClient {
    async fn insert_tracking_point(&self, new: NewTrackingPoint) -> Result<JobTracking, Error> {
        sqlx::query_as::<_, JobTracking>(
            r#"
            INSERT INTO job_tracking (booking_id, handyman_id, latitude, longitude, speed, heading)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.booking_id)
        .bind(new.handyman_id)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.speed)
        .bind(new.heading)
        .fetch_one(&self.pool)
        .await
    }

    async fn latest_tracking_point(&self, booking_id: Uuid) -> Result<Option<JobTracking>, Error> {
        sqlx::query_as::<_, JobTracking>(
            "SELECT * FROM job_tracking WHERE booking_id = $1 ORDER BY ts DESC LIMIT 1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_booking_route(
        &self,
        booking_id: Uuid,
        eta_minutes: i32,
        source: &str,
    ) -> Result<BookingRoute, Error> {
        sqlx::query_as::<_, BookingRoute>(
            r#"
            INSERT INTO booking_routes (booking_id, eta_minutes, source, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (booking_id) DO UPDATE SET
                eta_minutes = EXCLUDED.eta_minutes,
                source = EXCLUDED.source,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(eta_minutes)
        .bind(source)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_booking_route(&self, booking_id: Uuid) -> Result<Option<BookingRoute>, Error> {
        sqlx::query_as::<_, BookingRoute>("SELECT * FROM booking_routes WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }
}
