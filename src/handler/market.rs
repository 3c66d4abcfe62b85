use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::handymandb::HandymanExt,
    dtos::{handymandtos::*, matchingdtos::*, ApiResponse},
    error::HttpError,
    middleware::{admin_only, handyman_only, JWTAuthMiddeware},
    models::handymanmodel::{check_service_price, NewService},
    service::error::ServiceError,
    utils::geo::{km_to_m, GeoPoint},
    AppState,
};

/// Public price quotes.
pub fn pricing_handler() -> Router {
    Router::new().route("/estimate", post(estimate_price))
}

pub fn market_handler() -> Router {
    Router::new()
        .route("/match", post(match_handymen))
        .route("/services/nearby", get(search_services_nearby))
        .route(
            "/services",
            post(create_service).layer(middleware::from_fn(handyman_only)),
        )
        .route(
            "/categories",
            get(list_categories).merge(post(create_category).layer(middleware::from_fn(admin_only))),
        )
}

pub async fn estimate_price(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<PriceEstimateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let estimate = app_state.pricing.estimate(
        body.category_slug.trim(),
        i64::from(body.minutes),
        body.distance_km.map(km_to_m),
    );
    Ok(Json(ApiResponse::success("Price estimated", estimate)))
}

pub async fn match_handymen(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<MatchRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let origin = GeoPoint::new(body.lat, body.lng).map_err(HttpError::bad_request)?;
    let matches = app_state
        .matching
        .match_handymen(
            origin,
            body.category_id,
            body.radius_km,
            body.limit.map(|limit| limit as usize),
        )
        .await?;
    Ok(Json(ApiResponse::success("Handymen matched", matches)))
}

pub async fn search_services_nearby(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<NearbyServicesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let origin = GeoPoint::new(query.lat, query.lng).map_err(HttpError::bad_request)?;
    let services = app_state
        .matching
        .search_services_nearby(origin, query.category_id, query.radius_km)
        .await?;
    Ok(Json(ApiResponse::success("Nearby services retrieved", services)))
}

pub async fn create_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateServiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let new: NewService = body.into();
    check_service_price(new.price_type, new.price.as_ref()).map_err(HttpError::bad_request)?;

    let category = app_state
        .store
        .get_category(new.category_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| HttpError::not_found("Category not found"))?;
    if !category.is_active {
        return Err(HttpError::bad_request("Category is not active"));
    }

    if app_state
        .store
        .get_handyman_profile(auth.user.id)
        .await
        .map_err(ServiceError::from)?
        .is_none()
    {
        return Err(HttpError::bad_request(
            "Complete your handyman profile before publishing services",
        ));
    }

    let service = app_state
        .store
        .create_service(auth.user.id, new)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!("Handyman {} published service {}", auth.user.id, service.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Service created", service)),
    ))
}

pub async fn list_categories(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state
        .store
        .list_categories()
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success("Categories retrieved", categories)))
}

pub async fn create_category(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateCategoryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if let Some(parent_id) = body.parent_id {
        app_state
            .store
            .get_category(parent_id)
            .await
            .map_err(ServiceError::from)?
            .ok_or_else(|| HttpError::not_found("Parent category not found"))?;
    }

    let category = app_state
        .store
        .create_category(
            body.name.trim().to_string(),
            body.slug,
            body.description,
            body.parent_id,
        )
        .await
        .map_err(ServiceError::from)?;

    tracing::info!("Category {} created", category.slug);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Category created", category)),
    ))
}
