use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::PaymentConfirmation;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn list_payments(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(success(
        state.repo.list_payments().await?,
        "Payments retrieved",
    ))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let payment = state
        .repo
        .get_payment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with id '{id}' was not found")))?;
    Ok(success(payment, "Payment retrieved"))
}

/// Records a payment confirmed outside the gateway callbacks.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(confirmation): Json<PaymentConfirmation>,
) -> Result<Response, AppError> {
    let payment = state.booking.confirm_payment(&confirmation).await?;
    Ok(created(payment, "Payment confirmed"))
}
