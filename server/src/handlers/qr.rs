use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::routes::AppState;
use crate::services::qr::parse_payload;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Either the ids read from a code, or the raw scanned payload.
#[derive(Debug, Deserialize)]
pub struct QrValidationRequest {
    pub ticket_id: Option<i64>,
    pub hash: Option<String>,
    pub payload: Option<String>,
}

pub async fn validate_qr(
    State(state): State<AppState>,
    Json(request): Json<QrValidationRequest>,
) -> Result<Response, AppError> {
    let (ticket_id, hash) = match (request.payload, request.ticket_id) {
        (Some(payload), _) => parse_payload(&payload)
            .map(|(id, hash)| (id, Some(hash)))
            .ok_or_else(|| AppError::ValidationError("Unrecognised QR payload".to_string()))?,
        (None, Some(id)) => (id, request.hash),
        (None, None) => {
            return Err(AppError::ValidationError(
                "ticket_id or payload is required".to_string(),
            ))
        }
    };

    let validation = state
        .booking
        .validate_ticket(ticket_id, hash.as_deref())
        .await?;
    tracing::info!(ticket_id, "Ticket validated at the door");
    let message = validation.message.clone();
    Ok(success(validation, message))
}
