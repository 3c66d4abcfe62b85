use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        booking::booking_handler,
        deposit::deposit_handler,
        handyman::handyman_handler,
        market::{market_handler, pricing_handler},
        payment::payment_handler,
    },
    middleware::{auth, handyman_only},
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let handyman_routes = Router::new()
        .nest("/handyman", handyman_handler())
        .nest("/deposits", deposit_handler())
        .layer(middleware::from_fn(handyman_only))
        .layer(middleware::from_fn(auth));

    let api_route = Router::new()
        .nest("/bookings", booking_handler().layer(middleware::from_fn(auth)))
        .nest("/payments", payment_handler())
        .nest("/price", pricing_handler())
        .merge(market_handler().layer(middleware::from_fn(auth)))
        .merge(handyman_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
