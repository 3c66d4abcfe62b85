// service/booking_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt, db::MarketplaceStore, handymandb::HandymanExt, paymentdb::PaymentExt,
    },
    models::{bookingmodel::*, handymanmodel::PriceType, paymentmodel::*},
    service::{error::ServiceError, notification_service::NotificationService},
    utils::geo::GeoPoint,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub handyman_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub booking_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub address: String,
    pub city: String,
    pub job_location: Option<GeoPoint>,
    pub description: Option<String>,
    pub proposed_price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingHistory {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub timeline: Vec<BookingTimeline>,
    pub payment: Option<Payment>,
    pub payment_logs: Vec<PaymentLog>,
}

#[derive(Debug, Clone)]
pub struct BookingService {
    store: Arc<dyn MarketplaceStore>,
    notifications: NotificationService,
}

impl BookingService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Booking".to_string()))
    }

    pub async fn create_booking(
        &self,
        client_id: Uuid,
        input: CreateBooking,
    ) -> Result<Booking, ServiceError> {
        let handyman_id = match input.service_id {
            Some(service_id) => {
                let service = self
                    .store
                    .get_service(service_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Service".to_string()))?;

                if !service.is_active {
                    return Err(ServiceError::Validation(
                        "This service is not available for booking".to_string(),
                    ));
                }
                if let Some(requested) = input.handyman_id {
                    if requested != service.handyman_id {
                        return Err(ServiceError::Validation(
                            "The service does not belong to this handyman".to_string(),
                        ));
                    }
                }
                service.handyman_id
            }
            None => input.handyman_id.ok_or_else(|| {
                ServiceError::Validation("A handyman or a service is required".to_string())
            })?,
        };

        if handyman_id == client_id {
            return Err(ServiceError::Validation(
                "You cannot book your own services".to_string(),
            ));
        }
        if let Some(end_date) = input.end_date {
            if end_date < input.booking_date {
                return Err(ServiceError::Validation(
                    "End date cannot be before the start date".to_string(),
                ));
            }
        }
        if let Some(price) = &input.proposed_price {
            if price < &BigDecimal::zero() {
                return Err(ServiceError::Validation(
                    "Proposed price cannot be negative".to_string(),
                ));
            }
        }

        if self.store.get_handyman_profile(handyman_id).await?.is_none() {
            return Err(ServiceError::NotFound("Handyman".to_string()));
        }

        let booking = self
            .store
            .create_booking(NewBooking {
                client_id,
                handyman_id,
                service_id: input.service_id,
                booking_date: input.booking_date,
                end_date: input.end_date,
                address: input.address,
                city: input.city,
                job_location: input.job_location,
                description: input.description,
                proposed_price: input.proposed_price,
            })
            .await?;

        tracing::info!(
            "Booking {} created by client {} for handyman {}",
            booking.id,
            client_id,
            handyman_id
        );
        self.notifications.notify_booking_request(&booking);
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Booking, ServiceError> {
        let booking = self.load_booking(booking_id).await?;
        if booking.party(actor_id).is_none() {
            return Err(ServiceError::Forbidden(
                "You are not a party to this booking".to_string(),
            ));
        }
        Ok(booking)
    }

    /// The artisan's answer to a pending request.
    pub async fn respond(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        accept: bool,
        proposed_price: Option<BigDecimal>,
        comment: Option<String>,
    ) -> Result<Booking, ServiceError> {
        let booking = self.load_booking(booking_id).await?;
        let action = if accept {
            BookingAction::Accept
        } else {
            BookingAction::Decline
        };
        self.authorize(&booking, actor_id, action)?;

        if let Some(price) = &proposed_price {
            if price < &BigDecimal::zero() {
                return Err(ServiceError::Validation(
                    "Proposed price cannot be negative".to_string(),
                ));
            }
        }

        if accept && booking.status == BookingStatus::Pending {
            self.check_quote_price(&booking, proposed_price.as_ref()).await?;
        }

        let change = BookingChange {
            to: action.target(),
            end_date: None,
            proposed_price,
            handyman_comment: comment,
            response_date: Some(Utc::now()),
        };
        self.apply(booking, actor_id, action, change).await
    }

    pub async fn start(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Booking, ServiceError> {
        self.perform(booking_id, actor_id, BookingAction::Start).await
    }

    pub async fn complete(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Booking, ServiceError> {
        self.perform(booking_id, actor_id, BookingAction::Complete).await
    }

    pub async fn cancel(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Booking, ServiceError> {
        self.perform(booking_id, actor_id, BookingAction::Cancel).await
    }

    async fn perform(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        action: BookingAction,
    ) -> Result<Booking, ServiceError> {
        let booking = self.load_booking(booking_id).await?;
        self.authorize(&booking, actor_id, action)?;

        let mut change = BookingChange::status(action.target());
        if action == BookingAction::Complete {
            change.end_date = Some(Utc::now());
        }
        self.apply(booking, actor_id, action, change).await
    }

    fn authorize(&self, booking: &Booking, actor_id: Uuid, action: BookingAction) -> Result<(), ServiceError> {
        let party = booking.party(actor_id).ok_or_else(|| {
            ServiceError::Forbidden("You are not a party to this booking".to_string())
        })?;

        if !action.allowed_for(party) {
            return Err(ServiceError::Forbidden(format!(
                "Only the handyman can {} a booking request",
                action.to_str()
            )));
        }
        Ok(())
    }

    /// A quote service has no list price, so the artisan must name one.
    async fn check_quote_price(
        &self,
        booking: &Booking,
        proposed_price: Option<&BigDecimal>,
    ) -> Result<(), ServiceError> {
        let service_id = match booking.service_id {
            Some(service_id) => service_id,
            None => return Ok(()),
        };
        let service = match self.store.get_service(service_id).await? {
            Some(service) => service,
            None => return Ok(()),
        };
        if service.price_type != PriceType::Quote {
            return Ok(());
        }

        match proposed_price {
            Some(price) if price > &BigDecimal::zero() => Ok(()),
            _ => Err(ServiceError::Validation(
                "A positive proposed price is required to accept a quote request".to_string(),
            )),
        }
    }

    async fn apply(
        &self,
        booking: Booking,
        actor_id: Uuid,
        action: BookingAction,
        change: BookingChange,
    ) -> Result<Booking, ServiceError> {
        let requested = change.to;
        if !booking.status.can_transition_to(requested) {
            return Err(ServiceError::invalid_transition(booking.status, requested));
        }

        let updated = match self
            .store
            .transition_booking(booking.id, booking.status, change)
            .await?
        {
            Some(updated) => updated,
            None => {
                // lost the compare-and-set; report the state that won
                let current = self.load_booking(booking.id).await?;
                return Err(ServiceError::invalid_transition(current.status, requested));
            }
        };

        tracing::info!(
            "Booking {} {}: {} -> {} by {}",
            updated.id,
            action.to_str(),
            booking.status,
            updated.status,
            actor_id
        );
        self.notifications.notify_booking_status(&updated, actor_id);
        Ok(updated)
    }

    pub async fn booking_history(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
    ) -> Result<BookingHistory, ServiceError> {
        let booking = self.get_booking(booking_id, actor_id).await?;
        let timeline = self.store.get_booking_timeline(booking.id).await?;
        let payment = self.store.get_payment_by_booking(booking.id).await?;
        let payment_logs = match &payment {
            Some(payment) => self.store.get_payment_logs(payment.id).await?,
            None => Vec::new(),
        };

        Ok(BookingHistory {
            booking_id: booking.id,
            status: booking.status,
            created_at: booking.created_at,
            timeline,
            payment,
            payment_logs,
        })
    }

    pub async fn create_review(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, ServiceError> {
        let booking = self.load_booking(booking_id).await?;

        if booking.client_id != actor_id {
            return Err(ServiceError::Forbidden(
                "Only the client can review a booking".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::Validation(
                "Only completed bookings can be reviewed".to_string(),
            ));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if self.store.get_review_for_booking(booking.id).await?.is_some() {
            return Err(ServiceError::Conflict(
                "This booking has already been reviewed".to_string(),
            ));
        }

        let review = self
            .store
            .create_review(booking.id, booking.handyman_id, rating, comment)
            .await?;

        tracing::info!("Review {} left on booking {}", review.id, booking.id);
        self.notifications.notify_review_received(&booking, &review);
        Ok(review)
    }
}
