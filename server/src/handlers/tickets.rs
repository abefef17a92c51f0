use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::{TicketInput, TicketUpdate};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn ticket_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Ticket with id '{id}' was not found"))
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(success(state.repo.list_tickets().await?, "Tickets retrieved"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = state
        .repo
        .get_ticket(id)
        .await?
        .ok_or_else(|| ticket_not_found(id))?;
    Ok(success(ticket, "Ticket retrieved"))
}

/// Books a seat. Sold-out events answer 400 `CAPACITY_EXCEEDED`.
pub async fn book_ticket(
    State(state): State<AppState>,
    Json(input): Json<TicketInput>,
) -> Result<Response, AppError> {
    let ticket = state.booking.book(&input).await?;
    Ok(created(ticket, "Ticket booked"))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TicketUpdate>,
) -> Result<Response, AppError> {
    input.validate()?;
    let ticket = state
        .repo
        .update_ticket(id, &input)
        .await?
        .ok_or_else(|| ticket_not_found(id))?;
    Ok(success(ticket, "Ticket updated"))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_ticket(id).await? {
        return Err(ticket_not_found(id));
    }
    tracing::info!(ticket_id = id, "Ticket deleted, seat released");
    Ok(empty_success("Ticket deleted"))
}

pub async fn ticket_qr_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let png = state.booking.qr_image(id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
