use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;
use crate::utils::error::AppError;

const SEAT_NUMBER_MAX_LEN: usize = 10;
const GUEST_NAME_MAX_LEN: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub guest_name: Option<String>,
    pub seat_number: String,
    pub is_paid: bool,
    /// PNG bytes, served separately from the JSON representation.
    #[serde(skip)]
    pub qr_code: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Name shown to door staff, with everything but the first letter hidden.
    pub fn masked_holder(&self) -> String {
        match (&self.guest_name, self.user_id) {
            (Some(name), _) if !name.trim().is_empty() => mask_name(name.trim()),
            (_, Some(user_id)) => format!("User #{user_id}"),
            _ => "Guest".to_string(),
        }
    }
}

fn mask_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let hidden = chars.count().clamp(1, 8);
            format!("{first}{}", "*".repeat(hidden))
        }
        None => "Guest".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketInput {
    pub event_id: i64,
    pub seat_number: String,
    pub user_id: Option<i64>,
    pub guest_name: Option<String>,
}

impl TicketInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("seat_number", &self.seat_number, SEAT_NUMBER_MAX_LEN)?;
        if let Some(name) = &self.guest_name {
            require_text("guest_name", name, GUEST_NAME_MAX_LEN)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketUpdate {
    pub seat_number: String,
    pub guest_name: Option<String>,
}

impl TicketUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("seat_number", &self.seat_number, SEAT_NUMBER_MAX_LEN)?;
        if let Some(name) = &self.guest_name {
            require_text("guest_name", name, GUEST_NAME_MAX_LEN)?;
        }
        Ok(())
    }
}

/// Result of scanning a ticket at the door.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketValidation {
    pub valid: bool,
    pub message: String,
    pub details: TicketDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetails {
    pub ticket_id: i64,
    pub holder: String,
    pub event: String,
    pub seat_number: String,
}
