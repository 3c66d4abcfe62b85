use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

/// Weekday (`mon`..`sun`) to `HH:MM-HH:MM` slots.
pub type Availability = BTreeMap<String, Vec<String>>;

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

pub fn validate_availability(availability: &Availability) -> Result<(), String> {
    for (day, slots) in availability {
        if !WEEKDAYS.contains(&day.as_str()) {
            return Err(format!("Unknown weekday '{}'", day));
        }
        for slot in slots {
            let (start, end) = slot
                .split_once('-')
                .ok_or_else(|| format!("Slot '{}' must look like HH:MM-HH:MM", slot))?;
            let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
                .map_err(|_| format!("Invalid start time in slot '{}'", slot))?;
            let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
                .map_err(|_| format!("Invalid end time in slot '{}'", slot))?;
            if start >= end {
                return Err(format!("Slot '{}' ends before it starts", slot));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct HandymanProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub hourly_rate: BigDecimal,
    pub daily_rate: BigDecimal,
    pub monthly_rate: BigDecimal,
    pub travel_fee: BigDecimal,
    pub availability: Json<Availability>,
    pub is_approved: bool,
    pub rating: f64,
    pub completed_jobs: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub online: bool,
    pub skills: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HandymanProfile {
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_columns(self.latitude, self.longitude)
    }

    pub fn has_skill(&self, category_id: Uuid) -> bool {
        self.skills.contains(&category_id)
    }
}

/// Owner-editable fields. Rating, approval and the job counter are not here.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub hourly_rate: Option<BigDecimal>,
    pub daily_rate: Option<BigDecimal>,
    pub monthly_rate: Option<BigDecimal>,
    pub travel_fee: Option<BigDecimal>,
    pub availability: Option<Availability>,
    pub skills: Option<Vec<Uuid>>,
}

impl ProfileUpdate {
    pub fn check(&self) -> Result<(), String> {
        let rates = [
            ("hourly_rate", &self.hourly_rate),
            ("daily_rate", &self.daily_rate),
            ("monthly_rate", &self.monthly_rate),
            ("travel_fee", &self.travel_fee),
        ];
        for (name, rate) in rates {
            if let Some(rate) = rate {
                if rate < &BigDecimal::zero() {
                    return Err(format!("{} must not be negative", name));
                }
            }
        }
        if let Some(availability) = &self.availability {
            validate_availability(availability)?;
        }
        Ok(())
    }
}

/// Store-side candidate for matching: already approved, online, skilled and
/// inside the bounding box.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct NearbyHandyman {
    pub user_id: Uuid,
    pub display_name: String,
    pub rating: f64,
    pub completed_jobs: i32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ServiceCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "price_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Hourly,
    Fixed,
    Quote,
}

/// Quote services carry no price; hourly and fixed ones need a non-negative one.
pub fn check_service_price(price_type: PriceType, price: Option<&BigDecimal>) -> Result<(), String> {
    match (price_type, price) {
        (PriceType::Quote, None) => Ok(()),
        (PriceType::Quote, Some(_)) => Err("A quote service cannot have a fixed price".to_string()),
        (_, None) => Err("Price is required for hourly and fixed services".to_string()),
        (_, Some(p)) if p < &BigDecimal::zero() => Err("Price must not be negative".to_string()),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Service {
    pub id: Uuid,
    pub handyman_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_type: PriceType,
    pub price: Option<BigDecimal>,
    pub duration: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_type: PriceType,
    pub price: Option<BigDecimal>,
    pub duration: Option<i32>,
}

/// An active service joined with its artisan's public fields and location.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ServiceWithHandyman {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: Service,
    pub handyman_name: String,
    pub handyman_rating: f64,
    pub handyman_lat: f64,
    pub handyman_lng: f64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PricingRule {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub fee_percent: BigDecimal,
    pub fee_min: BigDecimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
