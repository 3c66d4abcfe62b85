use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "notification_ref_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationRefKind {
    Booking,
    Review,
    Message,
    Payment,
}

/// What a notification points at.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRef {
    pub kind: NotificationRefKind,
    pub id: Uuid,
}

impl NotificationRef {
    pub fn booking(id: Uuid) -> Self {
        NotificationRef { kind: NotificationRefKind::Booking, id }
    }

    pub fn payment(id: Uuid) -> Self {
        NotificationRef { kind: NotificationRefKind::Payment, id }
    }

    pub fn review(id: Uuid) -> Self {
        NotificationRef { kind: NotificationRefKind::Review, id }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingRequest,
    BookingStatus,
    PaymentReceived,
    ReviewReceived,
}

impl NotificationType {
    pub fn to_str(&self) -> &str {
        match self {
            NotificationType::BookingRequest => "booking_request",
            NotificationType::BookingStatus => "booking_status",
            NotificationType::PaymentReceived => "payment_received",
            NotificationType::ReviewReceived => "review_received",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub message: String,
    pub is_read: bool,
    pub ref_kind: Option<NotificationRefKind>,
    pub ref_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn reference(&self) -> Option<NotificationRef> {
        match (self.ref_kind, self.ref_id) {
            (Some(kind), Some(id)) => Some(NotificationRef { kind, id }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub message: String,
    pub reference: Option<NotificationRef>,
}
