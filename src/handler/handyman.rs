use std::sync::Arc;

use axum::{response::IntoResponse, routing::put, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::handymandb::HandymanExt,
    dtos::{handymandtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::handymanmodel::ProfileUpdate,
    service::error::ServiceError,
    utils::geo::GeoPoint,
    AppState,
};

pub fn handyman_handler() -> Router {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/location", put(update_location))
        .route("/online", put(set_online))
}

fn profile_missing() -> HttpError {
    HttpError::not_found("Handyman profile not found, create it first")
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let update: ProfileUpdate = body.into();
    update.check().map_err(HttpError::bad_request)?;

    if let Some(skills) = &update.skills {
        for category_id in skills {
            app_state
                .store
                .get_category(*category_id)
                .await
                .map_err(ServiceError::from)?
                .ok_or_else(|| HttpError::bad_request(format!("Unknown category {}", category_id)))?;
        }
    }

    let profile = app_state
        .store
        .upsert_handyman_profile(auth.user.id, update)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!("Handyman {} updated their profile", auth.user.id);
    Ok(Json(ApiResponse::success("Profile updated", profile)))
}

pub async fn update_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateLocationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let point = GeoPoint::new(body.lat, body.lng).map_err(HttpError::bad_request)?;

    let profile = app_state
        .store
        .update_handyman_location(auth.user.id, point)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(profile_missing)?;

    tracing::debug!("Handyman {} moved to {:.5},{:.5}", auth.user.id, point.lat, point.lng);
    Ok(Json(ApiResponse::success("Location updated", profile)))
}

pub async fn set_online(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<SetOnlineDto>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .store
        .set_handyman_online(auth.user.id, body.online)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(profile_missing)?;

    let message = if profile.online { "You are online" } else { "You are offline" };
    Ok(Json(ApiResponse::success(message, profile)))
}
