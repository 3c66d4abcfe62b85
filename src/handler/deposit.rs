use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{depositdtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn deposit_handler() -> Router {
    Router::new()
        .route("/", get(get_deposits))
        .route("/top-up", post(top_up_deposit))
        .route("/withdraw", post(withdraw_deposit))
}

pub async fn get_deposits(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let balance = app_state.deposits.deposit_balance(auth.user.id).await?;
    let transactions = app_state.deposits.ledger(auth.user.id).await?;

    Ok(Json(ApiResponse::success(
        "Deposit retrieved",
        DepositSummaryDto {
            balance,
            transactions,
        },
    )))
}

pub async fn top_up_deposit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<DepositAmountDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let entry = app_state
        .deposits
        .top_up_deposit(auth.user.id, &body.amount)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Deposit topped up", entry)),
    ))
}

pub async fn withdraw_deposit(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<DepositAmountDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let entry = app_state
        .deposits
        .withdraw_deposit(auth.user.id, &body.amount)
        .await?;
    Ok(Json(ApiResponse::success("Withdrawal recorded", entry)))
}
