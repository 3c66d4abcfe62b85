pub mod currency;
pub mod geo;
pub mod token;
