use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{service::tracking_service::TrackingPing, utils::geo::GeoPoint};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackingPingDto {
    pub lat: f64,

    pub lng: f64,

    #[validate(range(min = 0.0, message = "Speed cannot be negative"))]
    pub speed: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0, message = "Heading must be between 0 and 360"))]
    pub heading: Option<f64>,
}

impl TrackingPingDto {
    pub fn into_ping(self) -> Result<TrackingPing, String> {
        Ok(TrackingPing {
            location: GeoPoint::new(self.lat, self.lng)?,
            speed: self.speed,
            heading: self.heading,
        })
    }
}
