use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod checkout;
pub mod events;
pub mod festivals;
pub mod payments;
pub mod performers;
pub mod qr;
pub mod reviews;
pub mod tickets;
pub mod venues;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "boxoffice-api",
    };

    success(payload, "Health check successful")
}
