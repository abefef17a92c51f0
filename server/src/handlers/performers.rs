use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::PerformerInput;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn performer_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Performer with id '{id}' was not found"))
}

pub async fn list_performers(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(success(
        state.repo.list_performers().await?,
        "Performers retrieved",
    ))
}

pub async fn get_performer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let performer = state
        .repo
        .get_performer(id)
        .await?
        .ok_or_else(|| performer_not_found(id))?;
    Ok(success(performer, "Performer retrieved"))
}

pub async fn create_performer(
    State(state): State<AppState>,
    Json(input): Json<PerformerInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let performer = state.repo.create_performer(&input).await?;
    Ok(created(performer, "Performer created"))
}

pub async fn update_performer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PerformerInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let performer = state
        .repo
        .update_performer(id, &input)
        .await?
        .ok_or_else(|| performer_not_found(id))?;
    Ok(success(performer, "Performer updated"))
}

pub async fn delete_performer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_performer(id).await? {
        return Err(performer_not_found(id));
    }
    Ok(empty_success("Performer deleted"))
}
