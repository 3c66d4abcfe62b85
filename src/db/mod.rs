pub mod bookingdb;
pub mod db;
pub mod depositdb;
pub mod handymandb;
pub mod notificationdb;
pub mod paymentdb;
pub mod trackingdb;

#[cfg(test)]
pub mod memorydb;
