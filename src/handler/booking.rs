use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{bookingdtos::*, trackingdtos::TrackingPingDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn booking_handler() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/timeline", get(get_booking_timeline))
        .route("/:booking_id/respond", put(respond_to_booking))
        .route("/:booking_id/start", put(start_booking))
        .route("/:booking_id/complete", put(complete_booking))
        .route("/:booking_id/cancel", put(cancel_booking))
        .route("/:booking_id/review", post(create_review))
        .route("/:booking_id/alternatives", get(get_alternatives))
        .route("/:booking_id/track", post(track_booking))
        .route("/:booking_id/eta", get(get_booking_eta))
}

pub async fn create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = body.into_request().map_err(HttpError::bad_request)?;
    let booking = app_state
        .bookings
        .create_booking(auth.user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Booking request sent", booking)),
    ))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.bookings.get_booking(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Booking retrieved successfully", booking)))
}

pub async fn get_booking_timeline(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state
        .bookings
        .booking_history(booking_id, auth.user.id)
        .await?;
    Ok(Json(ApiResponse::success("Booking timeline retrieved", history)))
}

pub async fn respond_to_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<RespondBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let accept = body.accept;
    let booking = app_state
        .bookings
        .respond(booking_id, auth.user.id, accept, body.proposed_price, body.comment)
        .await?;

    let message = if accept { "Booking confirmed" } else { "Booking declined" };
    Ok(Json(ApiResponse::success(message, booking)))
}

pub async fn start_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.bookings.start(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Job started", booking)))
}

pub async fn complete_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.bookings.complete(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Job completed", booking)))
}

pub async fn cancel_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.bookings.cancel(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Booking cancelled", booking)))
}

pub async fn create_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .bookings
        .create_review(booking_id, auth.user.id, body.rating, body.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review submitted", review)),
    ))
}

pub async fn get_alternatives(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let alternatives = app_state
        .matching
        .suggest_alternatives_for(booking_id, auth.user.id)
        .await?;
    Ok(Json(ApiResponse::success("Alternatives retrieved", alternatives)))
}

pub async fn track_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<TrackingPingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ping = body.into_ping().map_err(HttpError::bad_request)?;
    let update = app_state
        .tracking
        .record_ping(booking_id, auth.user.id, ping)
        .await?;
    Ok(Json(ApiResponse::success("Location recorded", update)))
}

pub async fn get_booking_eta(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let route = app_state.tracking.current_eta(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("ETA retrieved", route)))
}
