use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{models::paymentmodel::PaymentMethod, service::payment_service::InitiatePayment};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InitiatePaymentDto {
    pub booking_id: Uuid,
    pub method: PaymentMethod,

    #[validate(range(min = 1, max = 10080, message = "Minutes must be between 1 and 10080"))]
    pub minutes: i32,

    pub category_id: Option<Uuid>,
}

impl From<InitiatePaymentDto> for InitiatePayment {
    fn from(dto: InitiatePaymentDto) -> Self {
        InitiatePayment {
            booking_id: dto.booking_id,
            method: dto.method,
            minutes: i64::from(dto.minutes),
            category_id: dto.category_id,
        }
    }
}

/// Provider callback body. Fields are optional so that a missing one is
/// reported as a bad request rather than a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookPayloadDto {
    pub provider_ref: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAckDto {
    pub payment_id: Uuid,
    pub status: String,
    pub changed: bool,
}
