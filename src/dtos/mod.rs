use std::borrow::Cow;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::utils::geo::GeoPoint;

pub mod bookingdtos;
pub mod depositdtos;
pub mod handymandtos;
pub mod matchingdtos;
pub mod paymentdtos;
pub mod trackingdtos;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

fn amount_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

pub fn validate_non_negative(value: &BigDecimal) -> Result<(), ValidationError> {
    if value < &BigDecimal::zero() {
        return Err(amount_error("negative_amount", "Amount cannot be negative"));
    }
    Ok(())
}

pub fn validate_positive(value: &BigDecimal) -> Result<(), ValidationError> {
    if value <= &BigDecimal::zero() {
        return Err(amount_error("non_positive_amount", "Amount must be greater than zero"));
    }
    Ok(())
}

/// Both coordinates or neither.
pub fn optional_point(lat: Option<f64>, lng: Option<f64>) -> Result<Option<GeoPoint>, String> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).map(Some),
        (None, None) => Ok(None),
        _ => Err("Latitude and longitude must be provided together".to_string()),
    }
}
