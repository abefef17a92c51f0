//! Adapters for the external payment providers.
//!
//! Each adapter builds whatever the customer's browser needs to reach the
//! provider, and turns the provider's confirmation into a
//! [`PaymentConfirmation`] for the booking service. Adapters never touch the
//! repository.

use std::time::Duration;

use crate::models::PaymentConfirmation;
use crate::utils::error::AppError;

pub mod esewa;
pub mod paypal;

pub use esewa::{EsewaCallback, EsewaCheckout, EsewaGateway};
pub use paypal::{PaypalCallback, PaypalCheckout, PaypalGateway};

pub const ESEWA_METHOD: &str = "esewa";
pub const PAYPAL_METHOD: &str = "paypal";

/// Shared outbound client; requests that exceed `timeout` fail instead of
/// holding the handler open.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(AppError::GatewayUnavailable)
}

/// Product id both providers carry for us: `ticket_<id>`.
pub fn product_id(ticket_id: i64) -> String {
    format!("ticket_{ticket_id}")
}

/// Inverse of [`product_id`]. Only plain positive decimal ids are accepted.
pub fn parse_product_id(product_id: &str) -> Option<i64> {
    product_id
        .trim()
        .strip_prefix("ticket_")
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|id| id.parse().ok())
        .filter(|id: &i64| *id > 0)
}

/// A provider-confirmed payment, ready to be recorded.
pub type VerifiedPayment = PaymentConfirmation;
