//! Gateway entry points, as JSON for API clients and as pages for browsers.

use axum::extract::{Form, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

use crate::gateways::{EsewaCallback, PaypalCallback};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub ticket_id: i64,
}

pub async fn esewa_initiate(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Response, AppError> {
    let checkout = state.checkout.esewa_checkout(ticket_id).await?;
    Ok(success(checkout, "eSewa payment form"))
}

pub async fn esewa_callback(
    State(state): State<AppState>,
    Query(callback): Query<EsewaCallback>,
) -> Result<Response, AppError> {
    let payment = state.checkout.esewa_callback(&callback).await?;
    Ok(created(payment, "Payment successful"))
}

pub async fn paypal_initiate(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, AppError> {
    let checkout = state.checkout.paypal_checkout(request.ticket_id).await?;
    Ok(success(checkout, "PayPal payment created"))
}

pub async fn paypal_callback(
    State(state): State<AppState>,
    Query(callback): Query<PaypalCallback>,
) -> Result<Response, AppError> {
    let payment = state.checkout.paypal_callback(&callback).await?;
    Ok(created(payment, "Payment successful"))
}

pub async fn esewa_payment_page(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Response {
    match state.checkout.esewa_checkout(ticket_id).await {
        Ok(checkout) => state.pages.esewa_form(ticket_id, &checkout),
        Err(err) => state.pages.payment_failed(&err),
    }
}

pub async fn esewa_callback_page(
    State(state): State<AppState>,
    Query(callback): Query<EsewaCallback>,
) -> Response {
    match state.checkout.esewa_callback(&callback).await {
        Ok(payment) => state.pages.payment_success(&payment),
        Err(err) => state.pages.payment_failed(&err),
    }
}

pub async fn paypal_initiate_page(
    State(state): State<AppState>,
    Form(request): Form<CheckoutRequest>,
) -> Response {
    match state.checkout.paypal_checkout(request.ticket_id).await {
        Ok(checkout) => Redirect::to(&checkout.approval_url).into_response(),
        Err(err) => state.pages.payment_failed(&err),
    }
}

pub async fn paypal_callback_page(
    State(state): State<AppState>,
    Query(callback): Query<PaypalCallback>,
) -> Response {
    match state.checkout.paypal_callback(&callback).await {
        Ok(payment) => state.pages.payment_success(&payment),
        Err(err) => state.pages.payment_failed(&err),
    }
}
