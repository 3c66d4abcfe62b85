pub mod bookingmodel;
pub mod depositmodel;
pub mod handymanmodel;
pub mod notificationmodel;
pub mod paymentmodel;
pub mod trackingmodel;
pub mod usermodel;
