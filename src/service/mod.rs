pub mod booking_service;
pub mod deposit_service;
pub mod error;
pub mod fee_service;
pub mod matching_service;
pub mod notification_service;
pub mod payment_provider;
pub mod payment_service;
pub mod pricing_service;
pub mod tracking_service;
