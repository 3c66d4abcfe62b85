use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{paymentdtos::*, ApiResponse},
    error::{ErrorMessage, HttpError},
    middleware::{auth, JWTAuthMiddeware},
    models::paymentmodel::PaymentStatus,
    service::error::ServiceError,
    AppState,
};

pub const SIGNATURE_HEADER: &str = "x-signature";

pub fn payment_handler() -> Router {
    let protected = Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/:booking_id/cash-confirm", post(confirm_cash_payment))
        .route("/:booking_id/capture", post(capture_payment))
        .route("/:booking_id/refund", post(refund_payment))
        .layer(axum::middleware::from_fn(auth));

    Router::new()
        .merge(protected)
        .route("/webhook/:provider", post(payment_webhook))
}

pub async fn initiate_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<InitiatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let initiation = app_state
        .payments
        .initiate(auth.user.id, body.into())
        .await?;
    Ok(Json(ApiResponse::success("Payment initiated", initiation)))
}

pub async fn confirm_cash_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .payments
        .confirm_cash(booking_id, auth.user.id)
        .await?;
    Ok(Json(ApiResponse::success("Cash payment confirmed", payment)))
}

pub async fn capture_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let captured = app_state.payments.capture(booking_id, auth.user.id).await?;
    Ok(Json(ApiResponse::success("Payment captured", captured)))
}

pub async fn refund_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state.payments.refund(booking_id, &auth.user).await?;
    Ok(Json(ApiResponse::success("Payment refunded", payment)))
}

/// Hex-encoded HMAC-SHA256 of the raw body, compared in constant time.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    let expected = hex::encode(mac.finalize().into_bytes());
    ConstantTimeEq::ct_eq(
        signature.trim().to_lowercase().as_bytes(),
        expected.as_bytes(),
    )
    .into()
}

pub async fn payment_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    // cash, transfer and check never settle by webhook
    let method = match app_state.payments.webhook_method(&provider) {
        Some(method) => method,
        None => {
            tracing::warn!("Webhook for unsupported provider '{}' rejected", provider);
            return Err(HttpError::not_found("Not found"));
        }
    };

    if let Some(secret) = app_state.env.webhook_secret(method.to_str()) {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if !verify_signature(&body, signature, secret) {
            tracing::warn!("Invalid {} webhook signature received", provider);
            return Err(HttpError::unauthorized(
                ErrorMessage::InvalidWebhookSignature.to_string(),
            ));
        }
    }

    let payload: WebhookPayloadDto = serde_json::from_slice(&body)
        .map_err(|_| HttpError::bad_request("Webhook body must be a JSON object"))?;

    let (provider_ref, status) = match (payload.provider_ref, payload.status) {
        (Some(provider_ref), Some(status)) if !provider_ref.trim().is_empty() => (provider_ref, status),
        _ => return Err(HttpError::bad_request("provider_ref and status are required")),
    };
    let status: PaymentStatus = status.parse().map_err(HttpError::bad_request)?;

    let reconciliation = match app_state
        .payments
        .reconcile(method, provider_ref.trim(), status)
        .await
    {
        Ok(reconciliation) => reconciliation,
        // never reveal which references exist
        Err(ServiceError::NotFound(_)) => return Err(HttpError::not_found("Not found")),
        Err(e) => return Err(e.into()),
    };

    let ack = WebhookAckDto {
        payment_id: reconciliation.payment.id,
        status: reconciliation.payment.status.to_string(),
        changed: reconciliation.changed,
    };
    Ok((StatusCode::OK, Json(ApiResponse::success("Webhook processed", ack))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_verification() {
        let body = br#"{"provider_ref":"OM-1","status":"completed"}"#;
        let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec").unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_signature(body, &signature, "whsec"));
        assert!(verify_signature(body, &signature.to_uppercase(), "whsec"));
        assert!(!verify_signature(body, &signature, "other"));
        assert!(!verify_signature(b"{}", &signature, "whsec"));
        assert!(!verify_signature(body, "", "whsec"));
    }
}
