use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Festival {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub organizer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FestivalInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub organizer_id: Option<i64>,
}

impl FestivalInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title, 255)?;
        require_text("venue", &self.venue, 255)?;
        if self.end_date < self.start_date {
            return Err(AppError::ValidationError(
                "end_date must not be before start_date".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_before_start_is_rejected() {
        let input = FestivalInput {
            title: "Jazzmandu".to_string(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            venue: "Patan".to_string(),
            organizer_id: None,
        };
        assert!(matches!(input.validate(), Err(AppError::ValidationError(_))));
    }
}
