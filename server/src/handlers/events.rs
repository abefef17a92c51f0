use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use crate::models::{EventFilter, EventInput, PerformerBooking};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success, Page};

fn event_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Event with id '{id}' was not found"))
}

/// Paged event listing with the `venue`, `festival`, `search`, `upcoming`
/// and `ordering` filters.
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Response, AppError> {
    let (results, count) = state.repo.list_events(&filter).await?;
    let page = Page {
        count,
        page: filter.page(),
        page_size: filter.page_size(),
        results,
    };
    Ok(success(page, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| event_not_found(id))?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<EventInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let event = state.repo.create_event(&input).await?;
    tracing::info!(
        event_id = event.event.id,
        venue_id = event.event.venue_id,
        seats = event.event.total_seats,
        "Event created"
    );
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<EventInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let event = state
        .repo
        .update_event(id, &input)
        .await?
        .ok_or_else(|| event_not_found(id))?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_event(id).await? {
        return Err(event_not_found(id));
    }
    tracing::info!(event_id = id, "Event deleted");
    Ok(empty_success("Event deleted"))
}

pub async fn add_performer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(booking): Json<PerformerBooking>,
) -> Result<Response, AppError> {
    let event = state.repo.add_performer(id, booking.performer_id).await?;
    tracing::info!(event_id = id, performer_id = booking.performer_id, "Performer booked");
    Ok(success(event, "Performer added to event"))
}
