use serde::{Deserialize, Serialize};

/// Mean earth radius used for every distance in the marketplace.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("Latitude {} is out of range", lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("Longitude {} is out of range", lng));
        }
        Ok(Self { lat, lng })
    }

    /// Builds a point from two nullable columns; both must be present.
    pub fn from_columns(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }

    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        haversine_m(*self, *other)
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Coarse lat/lng window used by the stores before exact distances are computed.
/// Always a superset of the circle of `radius_m` around the center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let radius_m = radius_m.max(0.0);
        let angular = radius_m / EARTH_RADIUS_M;
        let dlat = angular.to_degrees();

        let min_lat = (center.lat - dlat).max(-90.0);
        let max_lat = (center.lat + dlat).min(90.0);

        // Widest longitude reached by the circle is asin(sin r / cos lat). When
        // that reaches a pole, or the window crosses the antimeridian, it spans
        // every longitude.
        let cos_lat = center.lat.to_radians().cos();
        let spread = if cos_lat > 0.0 { angular.sin() / cos_lat } else { f64::INFINITY };
        let reaches_pole = spread >= 1.0
            || angular >= std::f64::consts::FRAC_PI_2
            || max_lat >= 90.0
            || min_lat <= -90.0;
        let (min_lng, max_lng) = if reaches_pole {
            (-180.0, 180.0)
        } else {
            // small margin for floating point at the circle's edge
            let dlng = spread.asin().to_degrees() * (1.0 + 1e-9);
            if center.lng - dlng < -180.0 || center.lng + dlng > 180.0 {
                (-180.0, 180.0)
            } else {
                (center.lng - dlng, center.lng + dlng)
            }
        };

        Self { min_lat, max_lat, min_lng, max_lng }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}
