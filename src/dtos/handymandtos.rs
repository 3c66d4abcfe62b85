use std::borrow::Cow;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_non_negative;
use crate::models::handymanmodel::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileDto {
    #[validate(length(max = 2000, message = "Bio is too long"))]
    pub bio: Option<String>,

    #[validate(custom = "validate_non_negative")]
    pub hourly_rate: Option<BigDecimal>,

    #[validate(custom = "validate_non_negative")]
    pub daily_rate: Option<BigDecimal>,

    #[validate(custom = "validate_non_negative")]
    pub monthly_rate: Option<BigDecimal>,

    #[validate(custom = "validate_non_negative")]
    pub travel_fee: Option<BigDecimal>,

    pub availability: Option<Availability>,
    pub skills: Option<Vec<Uuid>>,
}

impl From<UpdateProfileDto> for ProfileUpdate {
    fn from(dto: UpdateProfileDto) -> Self {
        ProfileUpdate {
            bio: dto.bio,
            hourly_rate: dto.hourly_rate,
            daily_rate: dto.daily_rate,
            monthly_rate: dto.monthly_rate,
            travel_fee: dto.travel_fee,
            availability: dto.availability,
            skills: dto.skills,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateLocationDto {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOnlineDto {
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateServiceDto {
    pub category_id: Uuid,

    #[validate(length(min = 3, max = 150, message = "Title must be between 3 and 150 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,

    pub price_type: PriceType,

    #[validate(custom = "validate_non_negative")]
    pub price: Option<BigDecimal>,

    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration: Option<i32>,
}

impl From<CreateServiceDto> for NewService {
    fn from(dto: CreateServiceDto) -> Self {
        NewService {
            category_id: dto.category_id,
            title: dto.title.trim().to_string(),
            description: dto.description,
            price_type: dto.price_type,
            price: dto.price,
            duration: dto.duration,
        }
    }
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid || slug.starts_with('-') || slug.ends_with('-') {
        let mut error = ValidationError::new("invalid_slug");
        error.message = Some(Cow::from(
            "Slug may only contain lowercase letters, digits and inner hyphens",
        ));
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryDto {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(
        length(min = 2, max = 100, message = "Slug must be between 2 and 100 characters"),
        custom = "validate_slug"
    )]
    pub slug: String,

    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,

    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("plomberie").is_ok());
        assert!(validate_slug("petits-travaux").is_ok());
        assert!(validate_slug("Plomberie").is_err());
        assert!(validate_slug("-menage").is_err());
        assert!(validate_slug("menage ok").is_err());
    }

    #[test]
    fn test_negative_rates_are_rejected() {
        let dto = UpdateProfileDto {
            hourly_rate: Some(BigDecimal::from(-5)),
            ..Default::default()
        };
        assert!(dto.validate().is_err());

        let dto = UpdateProfileDto {
            hourly_rate: Some(BigDecimal::from(2500)),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }
}
