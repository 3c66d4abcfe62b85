use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PriceEstimateDto {
    #[validate(length(min = 1, max = 100, message = "Category slug is required"))]
    pub category_slug: String,

    #[validate(range(min = 1, max = 10080, message = "Minutes must be between 1 and 10080"))]
    pub minutes: i32,

    #[validate(range(min = 0.0, max = 500.0, message = "Distance must be between 0 and 500 km"))]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequestDto {
    pub category_id: Uuid,
    pub lat: f64,
    pub lng: f64,

    #[validate(range(min = 0.1, max = 100.0, message = "Radius must be between 0.1 and 100 km"))]
    pub radius_km: Option<f64>,

    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyServicesQuery {
    pub lat: f64,
    pub lng: f64,

    #[validate(range(min = 0.1, max = 100.0, message = "Radius must be between 0.1 and 100 km"))]
    pub radius_km: Option<f64>,

    pub category_id: Option<Uuid>,
}
