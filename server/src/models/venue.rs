use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueInput {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl VenueInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name, 255)?;
        require_text("address", &self.address, 1000)?;

        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(AppError::ValidationError(
                    "latitude must be between -90 and 90".to_string(),
                ));
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(AppError::ValidationError(
                    "longitude must be between -180 and 180".to_string(),
                ));
            }
        }
        Ok(())
    }
}
