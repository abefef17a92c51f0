pub mod booking;
pub mod checkout;
pub mod qr;

pub use booking::BookingService;
pub use checkout::CheckoutService;
pub use qr::QrIssuer;
