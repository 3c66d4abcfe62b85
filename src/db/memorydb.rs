// db/memorydb.rs
//! In-memory store for service and handler tests. Every method runs under one
//! mutex, which plays the role of the row locks taken by the Postgres client.
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use num_traits::Zero;
use sqlx::{
    types::{BigDecimal, Json},
    Error,
};
use uuid::Uuid;

use super::{
    bookingdb::BookingExt, depositdb::DepositExt, handymandb::HandymanExt,
    notificationdb::NotificationExt, paymentdb::PaymentExt, trackingdb::TrackingExt,
};
use crate::{
    models::{
        bookingmodel::*, depositmodel::*, handymanmodel::*, notificationmodel::*, paymentmodel::*,
        trackingmodel::*, usermodel::*,
    },
    utils::geo::{BoundingBox, GeoPoint},
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, HandymanProfile>,
    categories: HashMap<Uuid, ServiceCategory>,
    services: HashMap<Uuid, Service>,
    pricing_rules: Vec<PricingRule>,
    bookings: HashMap<Uuid, Booking>,
    timeline: Vec<BookingTimeline>,
    reviews: Vec<Review>,
    payments: HashMap<Uuid, Payment>,
    initiation_claims: HashMap<Uuid, DateTime<Utc>>,
    payment_logs: Vec<PaymentLog>,
    deposits: Vec<DepositTransaction>,
    tracking: Vec<JobTracking>,
    routes: HashMap<Uuid, BookingRoute>,
    notifications: Vec<Notification>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, name: &str, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        self.state().users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                email: format!("{}@example.com", id),
                role,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// An approved, online artisan with the given skills and location.
    pub fn add_handyman(&self, name: &str, location: Option<GeoPoint>, skills: Vec<Uuid>) -> Uuid {
        let user_id = self.add_user(name, UserRole::Handyman);
        let now = Utc::now();
        self.state().profiles.insert(
            user_id,
            HandymanProfile {
                id: Uuid::new_v4(),
                user_id,
                bio: None,
                hourly_rate: BigDecimal::zero(),
                daily_rate: BigDecimal::zero(),
                monthly_rate: BigDecimal::zero(),
                travel_fee: BigDecimal::zero(),
                availability: Json(Availability::new()),
                is_approved: true,
                rating: 0.0,
                completed_jobs: 0,
                latitude: location.map(|p| p.lat),
                longitude: location.map(|p| p.lng),
                online: true,
                skills,
                created_at: now,
                updated_at: now,
            },
        );
        user_id
    }

    pub fn edit_profile(&self, user_id: Uuid, edit: impl FnOnce(&mut HandymanProfile)) {
        if let Some(profile) = self.state().profiles.get_mut(&user_id) {
            edit(profile);
        }
    }

    pub fn profile(&self, user_id: Uuid) -> Option<HandymanProfile> {
        self.state().profiles.get(&user_id).cloned()
    }

    pub fn add_category(&self, slug: &str) -> ServiceCategory {
        let category = ServiceCategory {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            parent_id: None,
            is_active: true,
        };
        self.state().categories.insert(category.id, category.clone());
        category
    }

    pub fn add_service(
        &self,
        handyman_id: Uuid,
        category_id: Uuid,
        price_type: PriceType,
        price: Option<i64>,
    ) -> Service {
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4(),
            handyman_id,
            category_id,
            title: "Service".to_string(),
            description: "Test service".to_string(),
            price_type,
            price: price.map(BigDecimal::from),
            duration: Some(60),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state().services.insert(service.id, service.clone());
        service
    }

    pub fn add_pricing_rule(&self, category_id: Option<Uuid>, fee_percent: i64, fee_min: i64) {
        self.state().pricing_rules.push(PricingRule {
            id: Uuid::new_v4(),
            category_id,
            fee_percent: BigDecimal::from(fee_percent),
            fee_min: BigDecimal::from(fee_min),
            active: true,
            created_at: Utc::now(),
        });
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    pub fn payment_for(&self, booking_id: Uuid) -> Option<Payment> {
        self.state()
            .payments
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned()
    }
}

#[async_trait]
impl BookingExt for MemoryStore {
    async fn create_booking(&self, new: NewBooking) -> Result<Booking, Error> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            handyman_id: new.handyman_id,
            service_id: new.service_id,
            booking_date: new.booking_date,
            end_date: new.end_date,
            address: new.address,
            city: new.city,
            job_lat: new.job_location.map(|p| p.lat),
            job_lng: new.job_location.map(|p| p.lng),
            description: new.description,
            proposed_price: new.proposed_price,
            handyman_comment: None,
            response_date: None,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state();
        state.timeline.push(BookingTimeline {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            status: BookingStatus::Pending,
            at: now,
        });
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        Ok(self.state().bookings.get(&booking_id).cloned())
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        change: BookingChange,
    ) -> Result<Option<Booking>, Error> {
        let now = Utc::now();
        let mut state = self.state();

        let booking = match state.bookings.get_mut(&booking_id) {
            Some(b) if b.status == from => b,
            _ => return Ok(None),
        };

        booking.status = change.to;
        if change.end_date.is_some() {
            booking.end_date = change.end_date;
        }
        if change.proposed_price.is_some() {
            booking.proposed_price = change.proposed_price;
        }
        if change.handyman_comment.is_some() {
            booking.handyman_comment = change.handyman_comment;
        }
        if change.response_date.is_some() {
            booking.response_date = change.response_date;
        }
        booking.updated_at = now;
        let booking = booking.clone();

        state.timeline.push(BookingTimeline {
            id: Uuid::new_v4(),
            booking_id,
            status: booking.status,
            at: now,
        });

        if booking.status == BookingStatus::Completed {
            if let Some(profile) = state.profiles.get_mut(&booking.handyman_id) {
                profile.completed_jobs += 1;
            }
        }

        Ok(Some(booking))
    }

    async fn get_booking_timeline(&self, booking_id: Uuid) -> Result<Vec<BookingTimeline>, Error> {
        Ok(self
            .state()
            .timeline
            .iter()
            .filter(|t| t.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn create_review(
        &self,
        booking_id: Uuid,
        handyman_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, Error> {
        let mut state = self.state();
        let review = Review {
            id: Uuid::new_v4(),
            booking_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());

        let ratings: Vec<i32> = state
            .reviews
            .iter()
            .filter(|r| {
                state
                    .bookings
                    .get(&r.booking_id)
                    .map(|b| b.handyman_id == handyman_id)
                    .unwrap_or(false)
            })
            .map(|r| r.rating)
            .collect();
        let average = ratings.iter().sum::<i32>() as f64 / ratings.len().max(1) as f64;

        if let Some(profile) = state.profiles.get_mut(&handyman_id) {
            profile.rating = average;
        }
        Ok(review)
    }

    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, Error> {
        Ok(self
            .state()
            .reviews
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }
}

#[async_trait]
impl PaymentExt for MemoryStore {
    async fn get_or_create_payment(&self, new: NewPayment) -> Result<(Payment, bool), Error> {
        let mut state = self.state();
        if let Some(existing) = state.payments.values().find(|p| p.booking_id == new.booking_id) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            amount: new.amount,
            platform_fee: new.platform_fee,
            method: new.method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            is_paid: false,
            currency: new.currency,
            payment_date: None,
            created_at: now,
            updated_at: now,
        };
        state.payments.insert(payment.id, payment.clone());
        Ok((payment, true))
    }

    async fn get_payment_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, Error> {
        Ok(self.payment_for(booking_id))
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, Error> {
        Ok(self
            .state()
            .payments
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(reference))
            .cloned())
    }

    async fn claim_payment_initiation(&self, payment_id: Uuid, stale_after_secs: i64) -> Result<bool, Error> {
        let mut state = self.state();
        let now = Utc::now();
        match state.payments.get(&payment_id) {
            Some(payment) if payment.transaction_id.is_none() => {}
            _ => return Ok(false),
        }
        if let Some(claimed_at) = state.initiation_claims.get(&payment_id) {
            if *claimed_at >= now - Duration::seconds(stale_after_secs) {
                return Ok(false);
            }
        }
        state.initiation_claims.insert(payment_id, now);
        Ok(true)
    }

    async fn release_payment_initiation(&self, payment_id: Uuid) -> Result<(), Error> {
        self.state().initiation_claims.remove(&payment_id);
        Ok(())
    }

    async fn set_payment_reference(&self, payment_id: Uuid, reference: &str) -> Result<Option<Payment>, Error> {
        let mut state = self.state();
        let payment = state.payments.get_mut(&payment_id).ok_or(Error::RowNotFound)?;
        if payment.transaction_id.is_some() {
            return Ok(None);
        }
        payment.transaction_id = Some(reference.to_string());
        payment.updated_at = Utc::now();
        let payment = payment.clone();
        state.initiation_claims.remove(&payment_id);
        Ok(Some(payment))
    }

    async fn reconcile_payment(
        &self,
        reference: &str,
        method: PaymentMethod,
        target: PaymentStatus,
        note: &str,
    ) -> Result<ReconcileOutcome, Error> {
        let mut state = self.state();
        let payment = match state
            .payments
            .values_mut()
            .find(|p| p.transaction_id.as_deref() == Some(reference) && p.method == method)
        {
            Some(payment) => payment,
            None => return Ok(ReconcileOutcome::NotFound),
        };

        if payment.status == target {
            return Ok(ReconcileOutcome::Unchanged(payment.clone()));
        }
        if !payment.status.can_transition_to(target) {
            return Ok(ReconcileOutcome::Rejected { current: payment.status });
        }

        let now = Utc::now();
        let previous = payment.status;
        payment.apply_status(target, now);
        let payment = payment.clone();

        let log = PaymentLog {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            previous_status: previous,
            new_status: payment.status,
            changed_at: now,
            notes: Some(note.to_string()),
        };
        state.payment_logs.push(log.clone());
        Ok(ReconcileOutcome::Applied { payment, log })
    }

    async fn get_payment_logs(&self, payment_id: Uuid) -> Result<Vec<PaymentLog>, Error> {
        Ok(self
            .state()
            .payment_logs
            .iter()
            .filter(|l| l.payment_id == payment_id)
            .cloned()
            .collect())
    }
}

fn ledger_entry(new: NewDepositTransaction, status: DepositStatus) -> DepositTransaction {
    DepositTransaction {
        id: Uuid::new_v4(),
        handyman_id: new.handyman_id,
        kind: new.kind,
        amount: new.amount,
        status,
        reference: new.reference,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl DepositExt for MemoryStore {
    async fn get_deposit_balance(&self, handyman_id: Uuid) -> Result<BigDecimal, Error> {
        let state = self.state();
        Ok(completed_balance(
            state.deposits.iter().filter(|t| t.handyman_id == handyman_id),
        ))
    }

    async fn insert_deposit(&self, new: NewDepositTransaction) -> Result<DepositTransaction, Error> {
        let status = new.status;
        let entry = ledger_entry(new, status);
        self.state().deposits.push(entry.clone());
        Ok(entry)
    }

    async fn debit_deposit(&self, new: NewDepositTransaction) -> Result<DebitOutcome, Error> {
        let mut state = self.state();
        let balance = completed_balance(
            state.deposits.iter().filter(|t| t.handyman_id == new.handyman_id),
        );

        let required = -new.amount.clone();
        let has_profile = state.profiles.contains_key(&new.handyman_id);
        if !has_profile || required <= BigDecimal::zero() || required > balance {
            return Ok(DebitOutcome::Insufficient { balance });
        }

        let entry = ledger_entry(new, DepositStatus::Completed);
        state.deposits.push(entry.clone());
        Ok(DebitOutcome::Applied(entry))
    }

    async fn list_deposit_transactions(&self, handyman_id: Uuid) -> Result<Vec<DepositTransaction>, Error> {
        Ok(self
            .state()
            .deposits
            .iter()
            .rev()
            .filter(|t| t.handyman_id == handyman_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HandymanExt for MemoryStore {
    async fn get_handyman_profile(&self, user_id: Uuid) -> Result<Option<HandymanProfile>, Error> {
        Ok(self.profile(user_id))
    }

    async fn upsert_handyman_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<HandymanProfile, Error> {
        let now = Utc::now();
        let mut state = self.state();
        let profile = state.profiles.entry(user_id).or_insert_with(|| HandymanProfile {
            id: Uuid::new_v4(),
            user_id,
            bio: None,
            hourly_rate: BigDecimal::zero(),
            daily_rate: BigDecimal::zero(),
            monthly_rate: BigDecimal::zero(),
            travel_fee: BigDecimal::zero(),
            availability: Json(Availability::new()),
            is_approved: false,
            rating: 0.0,
            completed_jobs: 0,
            latitude: None,
            longitude: None,
            online: false,
            skills: Vec::new(),
            created_at: now,
            updated_at: now,
        });

        if update.bio.is_some() {
            profile.bio = update.bio;
        }
        if let Some(rate) = update.hourly_rate {
            profile.hourly_rate = rate;
        }
        if let Some(rate) = update.daily_rate {
            profile.daily_rate = rate;
        }
        if let Some(rate) = update.monthly_rate {
            profile.monthly_rate = rate;
        }
        if let Some(fee) = update.travel_fee {
            profile.travel_fee = fee;
        }
        if let Some(availability) = update.availability {
            profile.availability = Json(availability);
        }
        if let Some(skills) = update.skills {
            profile.skills = skills;
        }
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn update_handyman_location(
        &self,
        user_id: Uuid,
        point: GeoPoint,
    ) -> Result<Option<HandymanProfile>, Error> {
        let mut state = self.state();
        Ok(state.profiles.get_mut(&user_id).map(|profile| {
            profile.latitude = Some(point.lat);
            profile.longitude = Some(point.lng);
            profile.clone()
        }))
    }

    async fn set_handyman_online(
        &self,
        user_id: Uuid,
        online: bool,
    ) -> Result<Option<HandymanProfile>, Error> {
        let mut state = self.state();
        Ok(state.profiles.get_mut(&user_id).map(|profile| {
            profile.online = online;
            profile.clone()
        }))
    }

    async fn find_handymen_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Uuid,
    ) -> Result<Vec<NearbyHandyman>, Error> {
        let state = self.state();
        Ok(state
            .profiles
            .values()
            .filter(|p| p.is_approved && p.online && p.has_skill(category_id))
            .filter_map(|p| {
                let location = p.location()?;
                if !bbox.contains(&location) {
                    return None;
                }
                Some(NearbyHandyman {
                    user_id: p.user_id,
                    display_name: state
                        .users
                        .get(&p.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    rating: p.rating,
                    completed_jobs: p.completed_jobs,
                    latitude: location.lat,
                    longitude: location.lng,
                })
            })
            .collect())
    }

    async fn find_services_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Option<Uuid>,
    ) -> Result<Vec<ServiceWithHandyman>, Error> {
        let state = self.state();
        Ok(state
            .services
            .values()
            .filter(|s| s.is_active && category_id.map_or(true, |c| s.category_id == c))
            .filter_map(|s| {
                let profile = state.profiles.get(&s.handyman_id)?;
                let location = profile.location()?;
                if !bbox.contains(&location) {
                    return None;
                }
                Some(ServiceWithHandyman {
                    service: s.clone(),
                    handyman_name: state
                        .users
                        .get(&s.handyman_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    handyman_rating: profile.rating,
                    handyman_lat: location.lat,
                    handyman_lng: location.lng,
                })
            })
            .collect())
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<ServiceCategory>, Error> {
        Ok(self.state().categories.get(&category_id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<ServiceCategory>, Error> {
        let mut categories: Vec<ServiceCategory> = self
            .state()
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
        parent_id: Option<Uuid>,
    ) -> Result<ServiceCategory, Error> {
        let category = ServiceCategory {
            id: Uuid::new_v4(),
            name,
            slug,
            description,
            parent_id,
            is_active: true,
        };
        self.state().categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, Error> {
        Ok(self.state().services.get(&service_id).cloned())
    }

    async fn create_service(&self, handyman_id: Uuid, new: NewService) -> Result<Service, Error> {
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4(),
            handyman_id,
            category_id: new.category_id,
            title: new.title,
            description: new.description,
            price_type: new.price_type,
            price: new.price,
            duration: new.duration,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state().services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn get_active_pricing_rule(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Option<PricingRule>, Error> {
        Ok(self
            .state()
            .pricing_rules
            .iter()
            .rev()
            .find(|r| r.active && r.category_id == category_id)
            .cloned())
    }
}

#[async_trait]
impl TrackingExt for MemoryStore {
    async fn insert_tracking_point(&self, new: NewTrackingPoint) -> Result<JobTracking, Error> {
        let point = JobTracking {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            handyman_id: new.handyman_id,
            latitude: new.latitude,
            longitude: new.longitude,
            speed: new.speed,
            heading: new.heading,
            ts: Utc::now(),
        };
        self.state().tracking.push(point.clone());
        Ok(point)
    }

    async fn latest_tracking_point(&self, booking_id: Uuid) -> Result<Option<JobTracking>, Error> {
        Ok(self
            .state()
            .tracking
            .iter()
            .rev()
            .find(|t| t.booking_id == booking_id)
            .cloned())
    }

    async fn upsert_booking_route(
        &self,
        booking_id: Uuid,
        eta_minutes: i32,
        source: &str,
    ) -> Result<BookingRoute, Error> {
        let route = BookingRoute {
            booking_id,
            eta_minutes,
            source: source.to_string(),
            updated_at: Utc::now(),
        };
        self.state().routes.insert(booking_id, route.clone());
        Ok(route)
    }

    async fn get_booking_route(&self, booking_id: Uuid) -> Result<Option<BookingRoute>, Error> {
        Ok(self.state().routes.get(&booking_id).cloned())
    }
}

#[async_trait]
impl NotificationExt for MemoryStore {
    async fn store_notification(&self, new: NewNotification) -> Result<Notification, Error> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            notification_type: new.notification_type.to_str().to_string(),
            message: new.message,
            is_read: false,
            ref_kind: new.reference.map(|r| r.kind),
            ref_id: new.reference.map(|r| r.id),
            created_at: Utc::now(),
        };
        self.state().notifications.push(notification.clone());
        Ok(notification)
    }
}
