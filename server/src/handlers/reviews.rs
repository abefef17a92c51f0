use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use crate::models::{ReviewFilter, ReviewInput};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn review_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Review with id '{id}' was not found"))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Query(filter): Query<ReviewFilter>,
) -> Result<Response, AppError> {
    let reviews = state.repo.list_reviews(&filter).await?;
    Ok(success(reviews, "Reviews retrieved"))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let review = state
        .repo
        .get_review(id)
        .await?
        .ok_or_else(|| review_not_found(id))?;
    Ok(success(review, "Review retrieved"))
}

pub async fn create_review(
    State(state): State<AppState>,
    Json(input): Json<ReviewInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let review = state.repo.create_review(&input).await?;
    tracing::info!(
        review_id = review.id,
        event_id = review.event_id,
        rating = review.rating,
        "Review created"
    );
    Ok(created(review, "Review created"))
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ReviewInput>,
) -> Result<Response, AppError> {
    input.validate()?;
    let review = state
        .repo
        .update_review(id, &input)
        .await?
        .ok_or_else(|| review_not_found(id))?;
    Ok(success(review, "Review updated"))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.delete_review(id).await? {
        return Err(review_not_found(id));
    }
    Ok(empty_success("Review deleted"))
}
