// service/notification_service.rs
use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    db::{db::MarketplaceStore, notificationdb::NotificationExt},
    models::{bookingmodel::*, notificationmodel::*, paymentmodel::Payment},
    service::error::ServiceError,
};

pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Best-effort notifications. Delivery runs on a background task and never
/// reports back to the caller; after the last failed attempt it is logged and dropped.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn MarketplaceStore>,
    retry_delay: Duration,
}

impl NotificationService {
    pub fn new(store: Arc<dyn MarketplaceStore>, retry_delay: Duration) -> Self {
        Self { store, retry_delay }
    }

    pub fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        message: String,
        reference: Option<NotificationRef>,
    ) {
        let service = self.clone();
        let new = NewNotification {
            user_id,
            notification_type,
            message,
            reference,
        };

        tokio::spawn(async move {
            service.deliver_with_retry(new).await;
        });
    }

    async fn deliver_with_retry(&self, new: NewNotification) {
        for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
            match self.deliver(new.clone()).await {
                Ok(()) => return,
                Err(e) if attempt < MAX_DELIVERY_ATTEMPTS => {
                    tracing::warn!(
                        "Notification {} for user {} failed (attempt {}/{}): {}",
                        new.notification_type.to_str(),
                        new.user_id,
                        attempt,
                        MAX_DELIVERY_ATTEMPTS,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Dropping notification {} for user {} after {} attempts: {}",
                        new.notification_type.to_str(),
                        new.user_id,
                        MAX_DELIVERY_ATTEMPTS,
                        e
                    );
                }
            }
        }
    }

    async fn deliver(&self, new: NewNotification) -> Result<(), ServiceError> {
        let stored = self.store.store_notification(new).await?;
        tracing::info!(
            "Notification {} stored for user {}",
            stored.notification_type,
            stored.user_id
        );
        Ok(())
    }

    pub fn notify_booking_request(&self, booking: &Booking) {
        self.notify(
            booking.handyman_id,
            NotificationType::BookingRequest,
            format!("New booking request for {}", booking.booking_date.format("%Y-%m-%d %H:%M")),
            Some(NotificationRef::booking(booking.id)),
        );
    }

    /// Tells the other party that `actor_id` moved the booking.
    pub fn notify_booking_status(&self, booking: &Booking, actor_id: Uuid) {
        self.notify(
            booking.counterparty(actor_id),
            NotificationType::BookingStatus,
            format!("Booking status changed to {}", booking.status),
            Some(NotificationRef::booking(booking.id)),
        );
    }

    pub fn notify_payment_received(&self, booking: &Booking, payment: &Payment) {
        self.notify(
            booking.handyman_id,
            NotificationType::PaymentReceived,
            format!("Payment of {} {} received", payment.amount, payment.currency),
            Some(NotificationRef::payment(payment.id)),
        );
    }

    pub fn notify_review_received(&self, booking: &Booking, review: &Review) {
        self.notify(
            booking.handyman_id,
            NotificationType::ReviewReceived,
            format!("You received a {}-star review", review.rating),
            Some(NotificationRef::review(review.id)),
        );
    }
}
