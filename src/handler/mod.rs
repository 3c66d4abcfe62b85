pub mod booking;
pub mod deposit;
pub mod handyman;
pub mod market;
pub mod payment;
