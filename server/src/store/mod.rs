//! Persistence boundary.
//!
//! Handlers and services only see [`Repository`]. `PgRepository` is the
//! production backend; `MemoryRepository` serves local runs and tests.
//!
//! Implementations must keep two operations atomic:
//! [`Repository::book_ticket`] (seat check, seat decrement and ticket insert)
//! and [`Repository::record_payment`] (unpaid check, paid flag, QR image and
//! payment insert).

use async_trait::async_trait;

use crate::models::{
    EventDetail, EventFilter, EventInput, Festival, FestivalInput, Payment, PaymentConfirmation,
    Performer, PerformerInput, Review, ReviewFilter, ReviewInput, Ticket, TicketInput,
    TicketUpdate, Venue, VenueInput,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_venues(&self) -> StoreResult<Vec<Venue>>;
    async fn get_venue(&self, id: i64) -> StoreResult<Option<Venue>>;
    async fn create_venue(&self, input: &VenueInput) -> StoreResult<Venue>;
    async fn update_venue(&self, id: i64, input: &VenueInput) -> StoreResult<Option<Venue>>;
    async fn delete_venue(&self, id: i64) -> StoreResult<bool>;

    async fn list_performers(&self) -> StoreResult<Vec<Performer>>;
    async fn get_performer(&self, id: i64) -> StoreResult<Option<Performer>>;
    async fn create_performer(&self, input: &PerformerInput) -> StoreResult<Performer>;
    async fn update_performer(
        &self,
        id: i64,
        input: &PerformerInput,
    ) -> StoreResult<Option<Performer>>;
    async fn delete_performer(&self, id: i64) -> StoreResult<bool>;

    async fn list_festivals(&self) -> StoreResult<Vec<Festival>>;
    async fn get_festival(&self, id: i64) -> StoreResult<Option<Festival>>;
    async fn create_festival(&self, input: &FestivalInput) -> StoreResult<Festival>;
    async fn update_festival(
        &self,
        id: i64,
        input: &FestivalInput,
    ) -> StoreResult<Option<Festival>>;
    async fn delete_festival(&self, id: i64) -> StoreResult<bool>;

    /// Matching events for the requested page, plus the total match count.
    async fn list_events(&self, filter: &EventFilter) -> StoreResult<(Vec<EventDetail>, i64)>;
    async fn get_event(&self, id: i64) -> StoreResult<Option<EventDetail>>;
    /// New events start with every seat available.
    async fn create_event(&self, input: &EventInput) -> StoreResult<EventDetail>;
    async fn update_event(&self, id: i64, input: &EventInput) -> StoreResult<Option<EventDetail>>;
    async fn delete_event(&self, id: i64) -> StoreResult<bool>;
    async fn add_performer(&self, event_id: i64, performer_id: i64) -> StoreResult<EventDetail>;

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>>;
    async fn get_ticket(&self, id: i64) -> StoreResult<Option<Ticket>>;
    /// Reserves one seat and creates the ticket. Fails with
    /// `CapacityExceeded` when the event has no seats left.
    async fn book_ticket(&self, input: &TicketInput) -> StoreResult<Ticket>;
    async fn update_ticket(&self, id: i64, input: &TicketUpdate) -> StoreResult<Option<Ticket>>;
    /// Deletes an unpaid ticket and gives its seat back. Paid tickets are
    /// refused with `AlreadyPaid`.
    async fn delete_ticket(&self, id: i64) -> StoreResult<bool>;

    async fn list_payments(&self) -> StoreResult<Vec<Payment>>;
    async fn get_payment(&self, id: i64) -> StoreResult<Option<Payment>>;
    /// Marks the ticket paid, stores its QR image and inserts the payment
    /// row, all or nothing. Fails with `AlreadyPaid` if the ticket was paid
    /// in the meantime.
    async fn record_payment(
        &self,
        confirmation: &PaymentConfirmation,
        qr_png: Vec<u8>,
    ) -> StoreResult<Payment>;

    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>>;
    async fn get_review(&self, id: i64) -> StoreResult<Option<Review>>;
    async fn create_review(&self, input: &ReviewInput) -> StoreResult<Review>;
    async fn update_review(&self, id: i64, input: &ReviewInput) -> StoreResult<Option<Review>>;
    async fn delete_review(&self, id: i64) -> StoreResult<bool>;
}

pub(crate) fn event_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Event with id '{id}' was not found"))
}

pub(crate) fn ticket_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Ticket with id '{id}' was not found"))
}

pub(crate) fn no_seats(event_id: i64) -> AppError {
    AppError::CapacityExceeded(format!("No seats available for event {event_id}"))
}

pub(crate) fn already_paid(ticket_id: i64) -> AppError {
    AppError::AlreadyPaid(format!("Ticket {ticket_id} has already been paid"))
}

pub(crate) fn duplicate_transaction(transaction_id: &str) -> AppError {
    AppError::ValidationError(format!(
        "Transaction '{transaction_id}' has already been recorded"
    ))
}

pub(crate) fn missing_reference() -> AppError {
    AppError::ValidationError("A referenced record does not exist".to_string())
}
