// db/handymandb.rs
use async_trait::async_trait;
use sqlx::{types::Json, Error};
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::handymanmodel::*,
    utils::geo::{BoundingBox, GeoPoint},
};

#[async_trait]
pub trait HandymanExt {
    async fn get_handyman_profile(&self, user_id: Uuid) -> Result<Option<HandymanProfile>, Error>;

    /// Creates the profile on first use; only the provided fields change.
    async fn upsert_handyman_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<HandymanProfile, Error>;

    async fn update_handyman_location(
        &self,
        user_id: Uuid,
        point: GeoPoint,
    ) -> Result<Option<HandymanProfile>, Error>;

    async fn set_handyman_online(
        &self,
        user_id: Uuid,
        online: bool,
    ) -> Result<Option<HandymanProfile>, Error>;

    /// Approved, online artisans with the skill whose location falls inside `bbox`.
    async fn find_handymen_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Uuid,
    ) -> Result<Vec<NearbyHandyman>, Error>;

    /// Active services whose artisan location falls inside `bbox`.
    async fn find_services_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Option<Uuid>,
    ) -> Result<Vec<ServiceWithHandyman>, Error>;

    async fn get_category(&self, category_id: Uuid) -> Result<Option<ServiceCategory>, Error>;

    async fn list_categories(&self) -> Result<Vec<ServiceCategory>, Error>;

    async fn create_category(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
        parent_id: Option<Uuid>,
    ) -> Result<ServiceCategory, Error>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, Error>;

    async fn create_service(&self, handyman_id: Uuid, new: NewService) -> Result<Service, Error>;

    /// Latest active rule for exactly this category; `None` selects the default rule.
    async fn get_active_pricing_rule(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Option<PricingRule>, Error>;
}

const PROFILE_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.bio, p.hourly_rate, p.daily_rate, p.monthly_rate,
           p.travel_fee, p.availability, p.is_approved, p.rating, p.completed_jobs,
           p.latitude, p.longitude, p.online,
           ARRAY(
               SELECT s.category_id FROM handyman_skills s WHERE s.handyman_id = p.user_id
           ) AS skills,
           p.created_at, p.updated_at
    FROM handyman_profiles p
    WHERE p.user_id = $1
"#;

#[async_trait]
impl HandymanExt for DBClient {
    async fn get_handyman_profile(&self, user_id: Uuid) -> Result<Option<HandymanProfile>, Error> {
        sqlx::query_as::<_, HandymanProfile>(PROFILE_SELECT)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_handyman_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<HandymanProfile, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO handyman_profiles (
                user_id, bio, hourly_rate, daily_rate, monthly_rate, travel_fee, availability
            )
            VALUES (
                $1, $2, COALESCE($3, 0), COALESCE($4, 0), COALESCE($5, 0), COALESCE($6, 0),
                COALESCE($7, '{}'::jsonb)
            )
            ON CONFLICT (user_id) DO UPDATE SET
                bio = COALESCE($2, handyman_profiles.bio),
                hourly_rate = COALESCE($3, handyman_profiles.hourly_rate),
                daily_rate = COALESCE($4, handyman_profiles.daily_rate),
                monthly_rate = COALESCE($5, handyman_profiles.monthly_rate),
                travel_fee = COALESCE($6, handyman_profiles.travel_fee),
                availability = COALESCE($7, handyman_profiles.availability),
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&update.bio)
        .bind(&update.hourly_rate)
        .bind(&update.daily_rate)
        .bind(&update.monthly_rate)
        .bind(&update.travel_fee)
        .bind(update.availability.map(Json))
        .execute(&mut *tx)
        .await?;

        if let Some(skills) = update.skills {
            sqlx::query("DELETE FROM handyman_skills WHERE handyman_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO handyman_skills (handyman_id, category_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(&skills)
            .execute(&mut *tx)
            .await?;
        }

        let profile = sqlx::query_as::<_, HandymanProfile>(PROFILE_SELECT)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    async fn update_handyman_location(
        &self,
        user_id: Uuid,
        point: GeoPoint,
    ) -> Result<Option<HandymanProfile>, Error> {
        let updated = sqlx::query(
            r#"
            UPDATE handyman_profiles
            SET latitude = $2, longitude = $3, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(point.lat)
        .bind(point.lng)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_handyman_profile(user_id).await
    }

    async fn set_handyman_online(
        &self,
        user_id: Uuid,
        online: bool,
    ) -> Result<Option<HandymanProfile>, Error> {
        let updated = sqlx::query(
            "UPDATE handyman_profiles SET online = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(online)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_handyman_profile(user_id).await
    }

    async fn find_handymen_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Uuid,
    ) -> Result<Vec<NearbyHandyman>, Error> {
        sqlx::query_as::<_, NearbyHandyman>(
            r#"
            SELECT p.user_id, u.name AS display_name, p.rating, p.completed_jobs,
                   p.latitude, p.longitude
            FROM handyman_profiles p
            JOIN users u ON u.id = p.user_id
            JOIN handyman_skills s ON s.handyman_id = p.user_id AND s.category_id = $5
            WHERE p.is_approved
              AND p.online
              AND p.latitude IS NOT NULL
              AND p.longitude IS NOT NULL
              AND p.latitude BETWEEN $1 AND $2
              AND p.longitude BETWEEN $3 AND $4
            "#,
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_services_nearby(
        &self,
        bbox: BoundingBox,
        category_id: Option<Uuid>,
    ) -> Result<Vec<ServiceWithHandyman>, Error> {
        sqlx::query_as::<_, ServiceWithHandyman>(
            r#"
            SELECT sv.id, sv.handyman_id, sv.category_id, sv.title, sv.description,
                   sv.price_type, sv.price, sv.duration, sv.is_active,
                   sv.created_at, sv.updated_at,
                   u.name AS handyman_name,
                   p.rating AS handyman_rating,
                   p.latitude AS handyman_lat,
                   p.longitude AS handyman_lng
            FROM services sv
            JOIN handyman_profiles p ON p.user_id = sv.handyman_id
            JOIN users u ON u.id = sv.handyman_id
            WHERE sv.is_active
              AND ($5::uuid IS NULL OR sv.category_id = $5)
              AND p.latitude IS NOT NULL
              AND p.longitude IS NOT NULL
              AND p.latitude BETWEEN $1 AND $2
              AND p.longitude BETWEEN $3 AND $4
            "#,
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<ServiceCategory>, Error> {
        sqlx::query_as::<_, ServiceCategory>("SELECT * FROM service_categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_categories(&self) -> Result<Vec<ServiceCategory>, Error> {
        sqlx::query_as::<_, ServiceCategory>(
            "SELECT * FROM service_categories WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_category(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
        parent_id: Option<Uuid>,
    ) -> Result<ServiceCategory, Error> {
        sqlx::query_as::<_, ServiceCategory>(
            r#"
            INSERT INTO service_categories (name, slug, description, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, Error> {
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_service(&self, handyman_id: Uuid, new: NewService) -> Result<Service, Error> {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (handyman_id, category_id, title, description, price_type, price, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(handyman_id)
        .bind(new.category_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.price_type)
        .bind(new.price)
        .bind(new.duration)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_active_pricing_rule(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Option<PricingRule>, Error> {
        sqlx::query_as::<_, PricingRule>(
            r#"
            SELECT * FROM pricing_rules
            WHERE active AND category_id IS NOT DISTINCT FROM $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
    }
}
