use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::VenueInput;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn venue_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Venue with id '{id}' was not found"))
}

pub async fn list_venues(State(state): State<AppState>) -> Result<Response, AppError> {
    let venues = state.repo.list_venues().await?;
    Ok(success(venues, "Venues retrieved"))
}

pub async fn get_venue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let venue = state
        .repo
        .get_venue(id)
        .await?
        .ok_or_else(|| venue_not_found(id))?;
    Ok(success(venue, "Venue retrieved"))
}

pub async fn create_venue(
    State(state): State<AppState>,
    Json(input): Json<VenueInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let venue = state.repo.create_venue(&input).await?;
    tracing::info!(venue_id = venue.id, "Venue created");
    Ok(created(venue, "Venue created"))
}

pub async fn update_venue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<VenueInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let venue = state
        .repo
        .update_venue(id, &input)
        .await?
        .ok_or_else(|| venue_not_found(id))?;
    Ok(success(venue, "Venue updated"))
}

pub async fn delete_venue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_venue(id).await? {
        return Err(venue_not_found(id));
    }
    tracing::info!(venue_id = id, "Venue deleted");
    Ok(empty_success("Venue deleted"))
}
