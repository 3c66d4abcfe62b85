// service/tracking_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{bookingdb::BookingExt, db::MarketplaceStore, trackingdb::TrackingExt},
    models::{bookingmodel::*, trackingmodel::*},
    service::error::ServiceError,
    utils::geo::GeoPoint,
};

pub const DEFAULT_AVG_SPEED_KMH: f64 = 25.0;
const MIN_SPEED_MS: f64 = 1.0;
pub const ROUTE_SOURCE_DEVICE: &str = "device";

/// Whole minutes to cover `distance_m` at `avg_kmh`, never negative.
pub fn estimate_eta_minutes(distance_m: f64, avg_kmh: f64) -> i32 {
    let speed_ms = (avg_kmh * 1000.0 / 3600.0).max(MIN_SPEED_MS);
    let minutes = (distance_m / speed_ms / 60.0).floor();
    if minutes.is_finite() && minutes > 0.0 {
        minutes.min(i32::MAX as f64) as i32
    } else {
        0
    }
}

#[derive(Debug, Clone)]
pub struct TrackingPing {
    pub location: GeoPoint,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TrackingUpdate {
    pub point: JobTracking,
    /// Absent when the booking has no job location.
    pub route: Option<BookingRoute>,
}

#[derive(Debug, Clone)]
pub struct TrackingService {
    store: Arc<dyn MarketplaceStore>,
    avg_speed_kmh: f64,
}

impl TrackingService {
    pub fn new(store: Arc<dyn MarketplaceStore>, avg_speed_kmh: f64) -> Self {
        Self {
            store,
            avg_speed_kmh,
        }
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Booking".to_string()))
    }

    pub async fn record_ping(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        ping: TrackingPing,
    ) -> Result<TrackingUpdate, ServiceError> {
        let booking = self.load_booking(booking_id).await?;

        if booking.handyman_id != actor_id {
            return Err(ServiceError::Forbidden(
                "Only the assigned handyman can share a location".to_string(),
            ));
        }
        if !matches!(booking.status, BookingStatus::Confirmed | BookingStatus::InProgress) {
            return Err(ServiceError::Validation(format!(
                "Tracking is not available for a {} booking",
                booking.status
            )));
        }

        let point = self
            .store
            .insert_tracking_point(NewTrackingPoint {
                booking_id,
                handyman_id: actor_id,
                latitude: ping.location.lat,
                longitude: ping.location.lng,
                speed: ping.speed,
                heading: ping.heading,
            })
            .await?;

        let route = self.refresh_eta(&booking).await?;
        Ok(TrackingUpdate { point, route })
    }

    /// Recomputes the ETA from the latest stored point to the job location.
    pub async fn refresh_eta(&self, booking: &Booking) -> Result<Option<BookingRoute>, ServiceError> {
        let destination = match booking.job_location() {
            Some(destination) => destination,
            None => return Ok(None),
        };
        let last = match self.store.latest_tracking_point(booking.id).await? {
            Some(last) => last,
            None => return Ok(None),
        };

        let from = GeoPoint {
            lat: last.latitude,
            lng: last.longitude,
        };
        let eta_minutes = estimate_eta_minutes(from.distance_m(&destination), self.avg_speed_kmh);
        let route = self
            .store
            .upsert_booking_route(booking.id, eta_minutes, ROUTE_SOURCE_DEVICE)
            .await?;

        tracing::debug!("Booking {} ETA {} min", booking.id, eta_minutes);
        Ok(Some(route))
    }

    /// Current route for a party of the booking; zero minutes before any ping.
    pub async fn current_eta(&self, booking_id: Uuid, actor_id: Uuid) -> Result<BookingRoute, ServiceError> {
        let booking = self.load_booking(booking_id).await?;
        if booking.party(actor_id).is_none() {
            return Err(ServiceError::Forbidden(
                "Only the booking's parties can see its ETA".to_string(),
            ));
        }

        Ok(self
            .store
            .get_booking_route(booking_id)
            .await?
            .unwrap_or_else(|| BookingRoute {
                booking_id,
                eta_minutes: 0,
                source: ROUTE_SOURCE_DEVICE.to_string(),
                updated_at: Utc::now(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memorydb::MemoryStore, models::usermodel::UserRole};

    #[test]
    fn test_eta_formula() {
        // 25 km/h is ~6.94 m/s; 5.1 km takes a bit over 12 minutes
        assert_eq!(estimate_eta_minutes(5_100.0, 25.0), 12);
        assert_eq!(estimate_eta_minutes(0.0, 25.0), 0);
        // speed is floored at 1 m/s
        assert_eq!(estimate_eta_minutes(600.0, 0.0), 10);
    }

    async fn confirmed_booking(store: &MemoryStore, job: Option<GeoPoint>) -> Booking {
        let client = store.add_user("Client", UserRole::Client);
        let handyman = store.add_handyman("Moussa", None, vec![]);
        let booking = store
            .create_booking(NewBooking {
                client_id: client,
                handyman_id: handyman,
                service_id: None,
                booking_date: Utc::now(),
                end_date: None,
                address: "Rue 10".to_string(),
                city: "Dakar".to_string(),
                job_location: job,
                description: None,
                proposed_price: None,
            })
            .await
            .unwrap();
        store
            .transition_booking(booking.id, BookingStatus::Pending, BookingChange::status(BookingStatus::Confirmed))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping_updates_single_route_row() {
        let store = Arc::new(MemoryStore::new());
        let job = GeoPoint { lat: 14.6928, lng: -17.4467 };
        let booking = confirmed_booking(&store, Some(job)).await;
        let tracking = TrackingService::new(store.clone(), DEFAULT_AVG_SPEED_KMH);

        // ~5.56 km south of the job
        let ping = TrackingPing {
            location: GeoPoint { lat: 14.6428, lng: -17.4467 },
            speed: Some(8.0),
            heading: None,
        };
        let update = tracking.record_ping(booking.id, booking.handyman_id, ping).await.unwrap();
        assert_eq!(update.route.as_ref().unwrap().eta_minutes, 13);

        let closer = TrackingPing {
            location: job,
            speed: None,
            heading: None,
        };
        tracking.record_ping(booking.id, booking.handyman_id, closer).await.unwrap();

        let eta = tracking.current_eta(booking.id, booking.client_id).await.unwrap();
        assert_eq!(eta.eta_minutes, 0);
    }

    #[tokio::test]
    async fn test_ping_without_job_location_stores_point_only() {
        let store = Arc::new(MemoryStore::new());
        let booking = confirmed_booking(&store, None).await;
        let tracking = TrackingService::new(store.clone(), DEFAULT_AVG_SPEED_KMH);

        let ping = TrackingPing {
            location: GeoPoint { lat: 14.7, lng: -17.4 },
            speed: None,
            heading: None,
        };
        let update = tracking.record_ping(booking.id, booking.handyman_id, ping).await.unwrap();
        assert!(update.route.is_none());
        assert!(store.latest_tracking_point(booking.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_only_assigned_handyman_can_ping() {
        let store = Arc::new(MemoryStore::new());
        let booking = confirmed_booking(&store, None).await;
        let tracking = TrackingService::new(store.clone(), DEFAULT_AVG_SPEED_KMH);

        let ping = TrackingPing {
            location: GeoPoint { lat: 14.7, lng: -17.4 },
            speed: None,
            heading: None,
        };
        let err = tracking.record_ping(booking.id, booking.client_id, ping).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = tracking.current_eta(Uuid::new_v4(), booking.client_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
