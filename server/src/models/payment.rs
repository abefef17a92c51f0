use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require_money, require_text};
use crate::utils::error::AppError;

/// Durable receipt of a confirmed external transaction. Never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub ticket_id: i64,
    pub amount: Decimal,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

/// A payment that a gateway (or an operator) has confirmed for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentConfirmation {
    pub ticket_id: i64,
    pub amount: Decimal,
    pub transaction_id: String,
    pub method: String,
}

impl PaymentConfirmation {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }
        require_money("amount", self.amount)?;
        require_text("transaction_id", &self.transaction_id, 255)?;
        require_text("method", &self.method, 50)
    }
}
