// service/matching_service.rs
use std::{cmp::Ordering, sync::Arc};

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{bookingdb::BookingExt, db::MarketplaceStore, handymandb::HandymanExt},
    models::{bookingmodel::Booking, handymanmodel::*},
    service::error::ServiceError,
    utils::geo::{km_to_m, BoundingBox, GeoPoint},
};

pub const DEFAULT_MATCH_RADIUS_KM: f64 = 15.0;
pub const DEFAULT_MATCH_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 15.0;
pub const DEFAULT_ALTERNATIVES_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_PRICE_TOLERANCE_PERCENT: i64 = 15;
pub const MAX_ALTERNATIVES: usize = 10;

#[derive(Debug, Serialize, Clone)]
pub struct HandymanMatch {
    pub id: Uuid,
    pub name: String,
    pub rating: f64,
    pub completed_jobs: i32,
    pub distance_m: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct NearbyService {
    #[serde(flatten)]
    pub service: Service,
    pub handyman_name: String,
    pub handyman_rating: f64,
    pub distance_m: f64,
}

/// Distance ascending, then rating and experience descending.
fn rank_handymen(a: &HandymanMatch, b: &HandymanMatch) -> Ordering {
    a.distance_m
        .total_cmp(&b.distance_m)
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| b.completed_jobs.cmp(&a.completed_jobs))
}

/// Distance ascending, rating descending, price ascending with quotes last.
fn rank_services(a: &NearbyService, b: &NearbyService) -> Ordering {
    a.distance_m
        .total_cmp(&b.distance_m)
        .then_with(|| b.handyman_rating.total_cmp(&a.handyman_rating))
        .then_with(|| match (&a.service.price, &b.service.price) {
            (Some(pa), Some(pb)) => pa.cmp(pb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

#[derive(Debug, Clone)]
pub struct MatchingService {
    store: Arc<dyn MarketplaceStore>,
}

impl MatchingService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn match_handymen(
        &self,
        origin: GeoPoint,
        category_id: Uuid,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<HandymanMatch>, ServiceError> {
        let radius_m = km_to_m(radius_km.unwrap_or(DEFAULT_MATCH_RADIUS_KM));
        let limit = limit.unwrap_or(DEFAULT_MATCH_LIMIT);
        if radius_m <= 0.0 || limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .store
            .find_handymen_nearby(BoundingBox::around(origin, radius_m), category_id)
            .await?;

        let mut matches: Vec<HandymanMatch> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let location = GeoPoint {
                    lat: candidate.latitude,
                    lng: candidate.longitude,
                };
                let distance_m = origin.distance_m(&location);
                (distance_m <= radius_m).then(|| HandymanMatch {
                    id: candidate.user_id,
                    name: candidate.display_name,
                    rating: candidate.rating,
                    completed_jobs: candidate.completed_jobs,
                    distance_m,
                })
            })
            .collect();

        matches.sort_by(rank_handymen);
        matches.truncate(limit);

        tracing::debug!(
            "Matched {} handymen for category {} within {}m",
            matches.len(),
            category_id,
            radius_m
        );
        Ok(matches)
    }

    pub async fn search_services_nearby(
        &self,
        origin: GeoPoint,
        category_id: Option<Uuid>,
        max_km: Option<f64>,
    ) -> Result<Vec<NearbyService>, ServiceError> {
        let radius_m = km_to_m(max_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM));
        let mut results = self.services_within(origin, category_id, radius_m).await?;
        results.sort_by(rank_services);
        Ok(results)
    }

    /// Comparable services near the job: same category, another artisan, and a
    /// price within the tolerance of the original unless it has no price.
    pub async fn suggest_alternatives(
        &self,
        booking: &Booking,
        tolerance_percent: Option<i64>,
        km: Option<f64>,
    ) -> Result<Vec<NearbyService>, ServiceError> {
        let service_id = booking.service_id.ok_or_else(|| {
            ServiceError::Validation("Booking has no service to compare against".to_string())
        })?;
        let origin = booking.job_location().ok_or_else(|| {
            ServiceError::Validation("Booking has no job location".to_string())
        })?;
        let original = self
            .store
            .get_service(service_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Service".to_string()))?;

        let tolerance = BigDecimal::from(tolerance_percent.unwrap_or(DEFAULT_PRICE_TOLERANCE_PERCENT))
            / BigDecimal::from(100);
        let price_window = original
            .price
            .as_ref()
            .filter(|p| **p > BigDecimal::zero())
            .map(|p| {
                let one = BigDecimal::from(1);
                (p * (&one - &tolerance), p * (&one + &tolerance))
            });

        let radius_m = km_to_m(km.unwrap_or(DEFAULT_ALTERNATIVES_RADIUS_KM));
        let mut results: Vec<NearbyService> = self
            .services_within(origin, Some(original.category_id), radius_m)
            .await?
            .into_iter()
            .filter(|candidate| {
                candidate.service.id != original.id
                    && candidate.service.handyman_id != booking.handyman_id
            })
            .filter(|candidate| match (&price_window, &candidate.service.price) {
                (None, _) => true,
                (Some((low, high)), Some(price)) => price >= low && price <= high,
                (Some(_), None) => false,
            })
            .collect();

        results.sort_by(rank_services);
        results.truncate(MAX_ALTERNATIVES);
        Ok(results)
    }

    pub async fn suggest_alternatives_for(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<NearbyService>, ServiceError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Booking".to_string()))?;
        if booking.party(actor_id).is_none() {
            return Err(ServiceError::Forbidden(
                "Only the booking's parties can see alternatives".to_string(),
            ));
        }
        self.suggest_alternatives(&booking, None, None).await
    }

    async fn services_within(
        &self,
        origin: GeoPoint,
        category_id: Option<Uuid>,
        radius_m: f64,
    ) -> Result<Vec<NearbyService>, ServiceError> {
        if radius_m <= 0.0 {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .find_services_nearby(BoundingBox::around(origin, radius_m), category_id)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let location = GeoPoint {
                    lat: row.handyman_lat,
                    lng: row.handyman_lng,
                };
                let distance_m = origin.distance_m(&location);
                (distance_m <= radius_m).then(|| NearbyService {
                    service: row.service,
                    handyman_name: row.handyman_name,
                    handyman_rating: row.handyman_rating,
                    distance_m,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memorydb::MemoryStore, models::bookingmodel::NewBooking};
    use chrono::Utc;

    // Dakar, Place de l'Indépendance
    const ORIGIN: GeoPoint = GeoPoint { lat: 14.6681, lng: -17.4313 };

    /// A point `km` kilometers due north of the origin.
    fn north_of_origin(km: f64) -> GeoPoint {
        GeoPoint {
            lat: ORIGIN.lat + (km * 1000.0 / crate::utils::geo::EARTH_RADIUS_M).to_degrees(),
            lng: ORIGIN.lng,
        }
    }

    #[tokio::test]
    async fn test_match_keeps_near_and_drops_far() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let near = store.add_handyman("Near", Some(north_of_origin(2.0)), vec![plumbing.id]);
        let _far = store.add_handyman("Far", Some(north_of_origin(20.0)), vec![plumbing.id]);
        let matching = MatchingService::new(store);

        let matches = matching
            .match_handymen(ORIGIN, plumbing.id, Some(15.0), Some(10))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, near);
        assert!((matches[0].distance_m - 2000.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn test_match_filters_skill_approval_online_and_location() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let cleaning = store.add_category("menage");

        let ok = store.add_handyman("Ok", Some(north_of_origin(1.0)), vec![plumbing.id]);
        store.add_handyman("Wrong skill", Some(north_of_origin(1.0)), vec![cleaning.id]);
        store.add_handyman("No location", None, vec![plumbing.id]);
        let offline = store.add_handyman("Offline", Some(north_of_origin(1.0)), vec![plumbing.id]);
        store.edit_profile(offline, |p| p.online = false);
        let pending = store.add_handyman("Unapproved", Some(north_of_origin(1.0)), vec![plumbing.id]);
        store.edit_profile(pending, |p| p.is_approved = false);

        let matching = MatchingService::new(store);
        let matches = matching.match_handymen(ORIGIN, plumbing.id, None, None).await.unwrap();

        assert_eq!(matches.iter().map(|m| m.id).collect::<Vec<_>>(), vec![ok]);
    }

    #[tokio::test]
    async fn test_match_ranking_and_limit() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let spot = north_of_origin(3.0);

        let veteran = store.add_handyman("Veteran", Some(spot), vec![plumbing.id]);
        store.edit_profile(veteran, |p| {
            p.rating = 4.5;
            p.completed_jobs = 40;
        });
        let rookie = store.add_handyman("Rookie", Some(spot), vec![plumbing.id]);
        store.edit_profile(rookie, |p| {
            p.rating = 4.5;
            p.completed_jobs = 3;
        });
        let star = store.add_handyman("Star", Some(spot), vec![plumbing.id]);
        store.edit_profile(star, |p| p.rating = 4.9);
        let closest = store.add_handyman("Closest", Some(north_of_origin(1.0)), vec![plumbing.id]);

        let matching = MatchingService::new(store);
        let matches = matching.match_handymen(ORIGIN, plumbing.id, None, None).await.unwrap();
        let order: Vec<Uuid> = matches.iter().map(|m| m.id).collect();
        assert_eq!(order, vec![closest, star, veteran, rookie]);

        let top_two = matching
            .match_handymen(ORIGIN, plumbing.id, None, Some(2))
            .await
            .unwrap();
        assert_eq!(top_two.len(), 2);
    }

    #[tokio::test]
    async fn test_services_nearby_orders_quotes_after_priced() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let spot = north_of_origin(2.0);
        let a = store.add_handyman("A", Some(spot), vec![plumbing.id]);
        let b = store.add_handyman("B", Some(spot), vec![plumbing.id]);
        let c = store.add_handyman("C", Some(north_of_origin(30.0)), vec![plumbing.id]);

        let quote = store.add_service(a, plumbing.id, PriceType::Quote, None);
        let cheap = store.add_service(b, plumbing.id, PriceType::Fixed, Some(4000));
        store.add_service(c, plumbing.id, PriceType::Fixed, Some(1000));

        let matching = MatchingService::new(store);
        let results = matching
            .search_services_nearby(ORIGIN, Some(plumbing.id), Some(10.0))
            .await
            .unwrap();

        let ids: Vec<Uuid> = results.iter().map(|r| r.service.id).collect();
        assert_eq!(ids, vec![cheap.id, quote.id]);
    }

    async fn booking_for(store: &MemoryStore, service: &Service, location: Option<GeoPoint>) -> Booking {
        let client = store.add_user("Client", crate::models::usermodel::UserRole::Client);
        store
            .create_booking(NewBooking {
                client_id: client,
                handyman_id: service.handyman_id,
                service_id: Some(service.id),
                booking_date: Utc::now(),
                end_date: None,
                address: "Rue 10".to_string(),
                city: "Dakar".to_string(),
                job_location: location,
                description: None,
                proposed_price: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_alternatives_respect_price_window_and_exclude_original() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let spot = north_of_origin(2.0);

        let original_handyman = store.add_handyman("Original", Some(spot), vec![plumbing.id]);
        let original = store.add_service(original_handyman, plumbing.id, PriceType::Fixed, Some(10000));
        store.add_service(original_handyman, plumbing.id, PriceType::Fixed, Some(10000));

        let other = store.add_handyman("Other", Some(spot), vec![plumbing.id]);
        let in_window = store.add_service(other, plumbing.id, PriceType::Fixed, Some(11000));
        store.add_service(other, plumbing.id, PriceType::Fixed, Some(12000));
        store.add_service(other, plumbing.id, PriceType::Quote, None);

        let booking = booking_for(&store, &original, Some(ORIGIN)).await;
        let matching = MatchingService::new(store);
        let results = matching.suggest_alternatives(&booking, None, None).await.unwrap();

        let ids: Vec<Uuid> = results.iter().map(|r| r.service.id).collect();
        assert_eq!(ids, vec![in_window.id]);
    }

    #[tokio::test]
    async fn test_alternatives_without_price_skip_price_filter() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let spot = north_of_origin(2.0);

        let original_handyman = store.add_handyman("Original", Some(spot), vec![plumbing.id]);
        let original = store.add_service(original_handyman, plumbing.id, PriceType::Quote, None);
        let other = store.add_handyman("Other", Some(spot), vec![plumbing.id]);
        store.add_service(other, plumbing.id, PriceType::Fixed, Some(50000));
        store.add_service(other, plumbing.id, PriceType::Quote, None);

        let booking = booking_for(&store, &original, Some(ORIGIN)).await;
        let matching = MatchingService::new(store);
        let results = matching.suggest_alternatives(&booking, None, None).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_alternatives_need_job_location() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = store.add_category("plomberie");
        let handyman = store.add_handyman("Original", Some(ORIGIN), vec![plumbing.id]);
        let original = store.add_service(handyman, plumbing.id, PriceType::Fixed, Some(1000));

        let booking = booking_for(&store, &original, None).await;
        let matching = MatchingService::new(store);
        let err = matching.suggest_alternatives(&booking, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
