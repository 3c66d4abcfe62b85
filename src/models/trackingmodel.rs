use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct JobTracking {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub handyman_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTrackingPoint {
    pub booking_id: Uuid,
    pub handyman_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BookingRoute {
    pub booking_id: Uuid,
    pub eta_minutes: i32,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}
