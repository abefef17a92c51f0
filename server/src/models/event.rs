use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require_money, require_text};
use crate::utils::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub venue_id: i64,
    pub price: Decimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub festival_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Seat count after changing capacity to `new_total`; already reserved
    /// seats stay reserved.
    pub fn resized_available_seats(&self, new_total: i32) -> Result<i32, AppError> {
        let reserved = self.total_seats - self.available_seats;
        let available = new_total - reserved;
        if available < 0 {
            return Err(AppError::ValidationError(format!(
                "total_seats cannot be lower than the {reserved} seats already booked"
            )));
        }
        Ok(available)
    }
}

/// An event together with its derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub event: Event,
    pub performer_ids: Vec<i64>,
    pub average_rating: f64,
}

/// Mean rating rounded to one decimal, `0.0` when nothing has been rated.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub venue_id: i64,
    pub price: Decimal,
    pub total_seats: i32,
    pub festival_id: Option<i64>,
    #[serde(default)]
    pub performer_ids: Vec<i64>,
}

impl EventInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title, 255)?;
        if self.price.is_sign_negative() {
            return Err(AppError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }
        require_money("price", self.price)?;
        if self.total_seats < 0 {
            return Err(AppError::ValidationError(
                "total_seats must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformerBooking {
    pub performer_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum EventOrdering {
    #[default]
    #[serde(rename = "date")]
    DateAsc,
    #[serde(rename = "-date")]
    DateDesc,
    #[serde(rename = "price")]
    PriceAsc,
    #[serde(rename = "-price")]
    PriceDesc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub venue: Option<i64>,
    pub festival: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub upcoming: bool,
    #[serde(default)]
    pub ordering: EventOrdering,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl EventFilter {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.page_size())
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}
