use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::FestivalInput;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn festival_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Festival with id '{id}' was not found"))
}

pub async fn list_festivals(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(success(
        state.repo.list_festivals().await?,
        "Festivals retrieved",
    ))
}

pub async fn get_festival(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let festival = state
        .repo
        .get_festival(id)
        .await?
        .ok_or_else(|| festival_not_found(id))?;
    Ok(success(festival, "Festival retrieved"))
}

pub async fn create_festival(
    State(state): State<AppState>,
    Json(input): Json<FestivalInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let festival = state.repo.create_festival(&input).await?;
    tracing::info!(festival_id = festival.id, "Festival created");
    Ok(created(festival, "Festival created"))
}

pub async fn update_festival(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<FestivalInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let festival = state
        .repo
        .update_festival(id, &input)
        .await?
        .ok_or_else(|| festival_not_found(id))?;
    Ok(success(festival, "Festival updated"))
}

/// Events of a deleted festival are kept and detached from it.
pub async fn delete_festival(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_festival(id).await? {
        return Err(festival_not_found(id));
    }
    Ok(empty_success("Festival deleted"))
}
