use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{optional_point, validate_non_negative};
use crate::service::booking_service::CreateBooking;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingDto {
    pub handyman_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub booking_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 255, message = "Address must be between 1 and 255 characters"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "City must be between 1 and 100 characters"))]
    pub city: String,

    pub lat: Option<f64>,

    pub lng: Option<f64>,

    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,

    #[validate(custom = "validate_non_negative")]
    pub proposed_price: Option<BigDecimal>,
}

impl CreateBookingDto {
    pub fn into_request(self) -> Result<CreateBooking, String> {
        let job_location = optional_point(self.lat, self.lng)?;
        Ok(CreateBooking {
            handyman_id: self.handyman_id,
            service_id: self.service_id,
            booking_date: self.booking_date,
            end_date: self.end_date,
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            job_location,
            description: self.description,
            proposed_price: self.proposed_price,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RespondBookingDto {
    pub accept: bool,

    #[validate(custom = "validate_non_negative")]
    pub proposed_price: Option<BigDecimal>,

    #[validate(length(max = 1000, message = "Comment is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 1000, message = "Comment is too long"))]
    pub comment: Option<String>,
}
