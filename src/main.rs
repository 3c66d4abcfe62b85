mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::{sync::Arc, time::Duration};

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use bigdecimal::BigDecimal;
use chrono::{FixedOffset, Offset, Utc};
use config::Config;
use db::db::{DBClient, MarketplaceStore};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use service::{
    booking_service::BookingService, deposit_service::DepositService, fee_service::FeeService,
    matching_service::MatchingService, notification_service::NotificationService,
    payment_provider::PaymentGateway, payment_service::PaymentService,
    pricing_service::PricingService, tracking_service::TrackingService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub store: Arc<dyn MarketplaceStore>,
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub deposits: DepositService,
    pub matching: MatchingService,
    pub pricing: PricingService,
    pub tracking: TrackingService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MarketplaceStore>, gateway: PaymentGateway) -> Self {
        let utc_offset = FixedOffset::east_opt(config.timezone_offset_hours * 3600).unwrap_or_else(|| {
            tracing::warn!(
                "TIMEZONE_OFFSET_HOURS={} is out of range, using UTC",
                config.timezone_offset_hours
            );
            Utc.fix()
        });

        let notifications = NotificationService::new(
            store.clone(),
            Duration::from_millis(config.notification_retry_delay_ms),
        );
        let pricing = PricingService::new(utc_offset, config.currency_decimals);
        let fees = FeeService::new(
            store.clone(),
            BigDecimal::from(config.default_fee_percent),
            config.currency_decimals,
        );
        let deposits = DepositService::new(store.clone(), config.currency_decimals);

        let payments = PaymentService::new(
            store.clone(),
            gateway,
            pricing.clone(),
            fees,
            deposits.clone(),
            notifications.clone(),
            config.currency.clone(),
        );

        Self {
            bookings: BookingService::new(store.clone(), notifications),
            matching: MatchingService::new(store.clone()),
            tracking: TrackingService::new(store.clone(), config.avg_speed_kmh),
            payments,
            deposits,
            pricing,
            store,
            env: config,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tratra=debug,tower_http=info")),
        )
        .init();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::error!("🔥 Failed to run migrations: {:?}", err);
            std::process::exit(1);
        }
        tracing::info!("✅ Migrations applied");
    }

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let gateway = PaymentGateway::from_config(&config);
    let store: Arc<dyn MarketplaceStore> = Arc::new(DBClient::new(pool));
    let app_state = AppState::new(config.clone(), store, gateway);

    let app = create_router(Arc::new(app_state)).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);
    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
    }
}
