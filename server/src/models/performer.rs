use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Performer {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformerInput {
    pub name: String,
    pub bio: Option<String>,
}

impl PerformerInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name, 255)
    }
}
