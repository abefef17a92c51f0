//! Ticket booking and payment confirmation.
//!
//! Both operations delegate their check-and-write to the repository, which
//! performs them atomically; this layer validates input, fails fast on the
//! obvious cases and renders the QR image before anything is written.

use std::sync::Arc;

use tracing::info;

use super::qr::QrIssuer;
use crate::models::{
    Payment, PaymentConfirmation, Ticket, TicketDetails, TicketInput, TicketValidation,
};
use crate::store::Repository;
use crate::utils::error::AppError;

pub const NOT_PAID_MESSAGE: &str = "Ticket has not been paid.";
const VALID_MESSAGE: &str = "Ticket is valid.";

#[derive(Clone)]
pub struct BookingService {
    repo: Arc<dyn Repository>,
    qr: QrIssuer,
}

impl BookingService {
    pub fn new(repo: Arc<dyn Repository>, qr: QrIssuer) -> Self {
        Self { repo, qr }
    }

    pub async fn book(&self, input: &TicketInput) -> Result<Ticket, AppError> {
        input.validate()?;
        let ticket = self.repo.book_ticket(input).await?;
        info!(
            ticket_id = ticket.id,
            event_id = ticket.event_id,
            seat = %ticket.seat_number,
            "Ticket booked"
        );
        Ok(ticket)
    }

    /// Records a confirmed payment: the ticket becomes paid, gets its QR
    /// image and the payment row is inserted, or nothing changes at all.
    pub async fn confirm_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<Payment, AppError> {
        confirmation.validate()?;

        let ticket = self.ticket(confirmation.ticket_id).await?;
        if ticket.is_paid {
            return Err(AppError::AlreadyPaid(format!(
                "Ticket {} has already been paid",
                ticket.id
            )));
        }

        let qr_png = self.qr.issue(ticket.id)?;
        let payment = self.repo.record_payment(confirmation, qr_png).await?;

        info!(
            ticket_id = payment.ticket_id,
            payment_id = payment.id,
            method = %payment.payment_method,
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            "Payment confirmed"
        );
        Ok(payment)
    }

    /// Checks a scanned ticket. `hash`, when present, must be the ticket's
    /// QR token.
    pub async fn validate_ticket(
        &self,
        ticket_id: i64,
        hash: Option<&str>,
    ) -> Result<TicketValidation, AppError> {
        let ticket = self.ticket(ticket_id).await?;

        if let Some(hash) = hash {
            if !self.qr.verify(ticket.id, hash) {
                return Err(AppError::ValidationError(
                    "QR code does not match this ticket".to_string(),
                ));
            }
        }
        if !ticket.is_paid {
            return Err(AppError::ValidationError(NOT_PAID_MESSAGE.to_string()));
        }

        let event = self
            .repo
            .get_event(ticket.event_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "ticket {} references missing event {}",
                    ticket.id, ticket.event_id
                ))
            })?;

        Ok(TicketValidation {
            valid: true,
            message: VALID_MESSAGE.to_string(),
            details: TicketDetails {
                ticket_id: ticket.id,
                holder: ticket.masked_holder(),
                event: event.event.title,
                seat_number: ticket.seat_number,
            },
        })
    }

    /// QR image of a paid ticket.
    pub async fn qr_image(&self, ticket_id: i64) -> Result<Vec<u8>, AppError> {
        let ticket = self.ticket(ticket_id).await?;
        if !ticket.is_paid {
            return Err(AppError::ValidationError(NOT_PAID_MESSAGE.to_string()));
        }
        match ticket.qr_code {
            Some(png) => Ok(png),
            None => self.qr.issue(ticket.id),
        }
    }

    async fn ticket(&self, ticket_id: i64) -> Result<Ticket, AppError> {
        self.repo
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket with id '{ticket_id}' was not found")))
    }
}
