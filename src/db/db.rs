// db/db.rs
use sqlx::{Pool, Postgres};

use super::{
    bookingdb::BookingExt, depositdb::DepositExt, handymandb::HandymanExt,
    notificationdb::NotificationExt, paymentdb::PaymentExt, trackingdb::TrackingExt,
};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("size", &self.pool.size())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Everything the services need from persistence. Implemented by the
/// Postgres client and by the in-memory store used in tests.
pub trait MarketplaceStore:
    BookingExt
    + PaymentExt
    + DepositExt
    + HandymanExt
    + TrackingExt
    + NotificationExt
    + Send
    + Sync
    + std::fmt::Debug
{
}

impl<T> MarketplaceStore for T where
    T: BookingExt
        + PaymentExt
        + DepositExt
        + HandymanExt
        + TrackingExt
        + NotificationExt
        + Send
        + Sync
        + std::fmt::Debug
{
}
