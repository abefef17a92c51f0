pub mod event;
pub mod festival;
pub mod payment;
pub mod performer;
pub mod review;
pub mod ticket;
pub mod venue;

pub use event::{Event, EventDetail, EventFilter, EventInput, EventOrdering, PerformerBooking};
pub use festival::{Festival, FestivalInput};
pub use payment::{Payment, PaymentConfirmation};
pub use performer::{Performer, PerformerInput};
pub use review::{Review, ReviewFilter, ReviewInput};
pub use ticket::{Ticket, TicketDetails, TicketInput, TicketUpdate, TicketValidation};
pub use venue::{Venue, VenueInput};

use rust_decimal::Decimal;

use crate::utils::error::AppError;

/// Money columns are NUMERIC(10, 2).
const MONEY_SCALE: u32 = 2;
const MONEY_LIMIT: i64 = 100_000_000;

/// Rejects blank text and text longer than `max` characters. The length is
/// taken as stored, surrounding whitespace included.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(AppError::ValidationError(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Rejects amounts that a money column would round or overflow.
pub(crate) fn require_money(field: &str, value: Decimal) -> Result<(), AppError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(AppError::ValidationError(format!(
            "{field} must have at most two decimal places"
        )));
    }
    if value.abs() >= Decimal::from(MONEY_LIMIT) {
        return Err(AppError::ValidationError(format!(
            "{field} must be less than {MONEY_LIMIT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_rejects_blank() {
        assert!(require_text("name", "   ", 10).is_err());
    }

    #[test]
    fn test_require_text_counts_characters() {
        assert!(require_text("seat_number", "Ä1", 2).is_ok());
        assert!(require_text("seat_number", "ABC", 2).is_err());
    }

    #[test]
    fn test_require_text_counts_padding() {
        let padded = format!("A1{}", " ".repeat(30));
        assert!(require_text("seat_number", &padded, 10).is_err());
        assert!(require_text("seat_number", " A1 ", 10).is_ok());
    }

    #[test]
    fn test_require_money_limits() {
        assert!(require_money("amount", Decimal::new(150000, 2)).is_ok());
        assert!(require_money("amount", Decimal::new(150000, 3)).is_ok());
        assert!(require_money("amount", Decimal::new(9_999_999_999, 2)).is_ok());
        assert!(require_money("amount", Decimal::new(10005, 3)).is_err());
        assert!(require_money("amount", Decimal::from(MONEY_LIMIT)).is_err());
        assert!(require_money("amount", Decimal::new(1, 28)).is_err());
    }
}
