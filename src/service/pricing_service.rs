// service/pricing_service.rs
use bigdecimal::BigDecimal;
use chrono::{FixedOffset, Timelike, Utc};
use serde::Serialize;

use crate::utils::currency::round_half_up;

pub const MIN_BILLED_MINUTES: i64 = 30;
pub const MIN_PRICE: i64 = 1000;
pub const DEFAULT_BASE_RATE: i64 = 3000;
pub const DEFAULT_CATEGORY_SLUG: &str = "menage";

/// Local hours (inclusive) that carry the evening surcharge.
const SURGE_HOURS: std::ops::RangeInclusive<u32> = 18..=22;
const FREE_TRAVEL_KM: f64 = 5.0;
/// Distance surcharge, in percent per km past the free radius, and its cap.
const TRAVEL_PERCENT_PER_KM: f64 = 2.0;
const TRAVEL_PERCENT_CAP: i64 = 50;

/// Hourly base rate by category slug.
pub fn base_rate_for(slug: &str) -> BigDecimal {
    let rate = match slug {
        "menage" => 2500,
        "plomberie" => 3000,
        "electricite" => 3500,
        _ => DEFAULT_BASE_RATE,
    };
    BigDecimal::from(rate)
}

pub fn surge_factor(local_hour: u32) -> BigDecimal {
    if SURGE_HOURS.contains(&local_hour) {
        BigDecimal::new(120i32.into(), 2)
    } else {
        BigDecimal::from(1)
    }
}

/// 1.00 up to the free radius, then +2% per km, capped at 1.50.
/// Unknown distance costs nothing extra.
pub fn distance_factor(distance_m: Option<f64>) -> BigDecimal {
    let km = match distance_m {
        Some(m) if m.is_finite() && m > 0.0 => m / 1000.0,
        _ => return BigDecimal::from(1),
    };
    let extra = ((km - FREE_TRAVEL_KM).max(0.0) * TRAVEL_PERCENT_PER_KM).round() as i64;
    let percent = 100 + extra.min(TRAVEL_PERCENT_CAP);
    BigDecimal::new(percent.into(), 2)
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceEstimate {
    pub amount: BigDecimal,
    pub base_rate: BigDecimal,
    pub billed_minutes: i64,
    pub surge: BigDecimal,
    pub distance_factor: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct PricingService {
    utc_offset: FixedOffset,
    currency_decimals: i64,
}

impl PricingService {
    pub fn new(utc_offset: FixedOffset, currency_decimals: i64) -> Self {
        Self {
            utc_offset,
            currency_decimals,
        }
    }

    pub fn local_hour(&self) -> u32 {
        Utc::now().with_timezone(&self.utc_offset).hour()
    }

    pub fn estimate(&self, category_slug: &str, minutes: i64, distance_m: Option<f64>) -> PriceEstimate {
        self.estimate_at(category_slug, minutes, distance_m, self.local_hour())
    }

    /// `base * max(30, minutes)/60 * surge * distance`, rounded to the
    /// currency unit, never below the minimum price.
    pub fn estimate_at(
        &self,
        category_slug: &str,
        minutes: i64,
        distance_m: Option<f64>,
        local_hour: u32,
    ) -> PriceEstimate {
        let base_rate = base_rate_for(category_slug);
        let billed_minutes = minutes.max(MIN_BILLED_MINUTES);
        let surge = surge_factor(local_hour);
        let distance_factor = distance_factor(distance_m);

        let raw = &base_rate * BigDecimal::from(billed_minutes) / BigDecimal::from(60) * &surge
            * &distance_factor;
        let rounded = round_half_up(&raw, self.currency_decimals);
        let floor = BigDecimal::from(MIN_PRICE);
        let amount = if rounded < floor { floor } else { rounded };

        PriceEstimate {
            amount,
            base_rate,
            billed_minutes,
            surge,
            distance_factor,
        }
    }
}
