//! Gateway checkout flows: load the ticket, talk to the provider, and hand
//! a verified payment to [`BookingService::confirm_payment`].

use std::sync::Arc;

use tracing::warn;

use super::booking::BookingService;
use crate::gateways::{
    EsewaCallback, EsewaCheckout, EsewaGateway, PaypalCallback, PaypalCheckout, PaypalGateway,
    VerifiedPayment,
};
use crate::models::{Event, Payment, Ticket};
use crate::store::Repository;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct CheckoutService {
    repo: Arc<dyn Repository>,
    booking: BookingService,
    esewa: EsewaGateway,
    paypal: PaypalGateway,
}

impl CheckoutService {
    pub fn new(
        repo: Arc<dyn Repository>,
        booking: BookingService,
        esewa: EsewaGateway,
        paypal: PaypalGateway,
    ) -> Self {
        Self {
            repo,
            booking,
            esewa,
            paypal,
        }
    }

    pub async fn esewa_checkout(&self, ticket_id: i64) -> Result<EsewaCheckout, AppError> {
        let (ticket, event) = self.payable(ticket_id).await?;
        Ok(self.esewa.checkout(&ticket, &event))
    }

    pub async fn esewa_callback(&self, callback: &EsewaCallback) -> Result<Payment, AppError> {
        let verified = self.esewa.handle_callback(callback).await?;
        self.confirm(verified).await
    }

    pub async fn paypal_checkout(&self, ticket_id: i64) -> Result<PaypalCheckout, AppError> {
        let (ticket, event) = self.payable(ticket_id).await?;
        self.paypal.create_payment(&ticket, &event).await
    }

    pub async fn paypal_callback(&self, callback: &PaypalCallback) -> Result<Payment, AppError> {
        let verified = self.paypal.handle_callback(callback).await?;
        self.confirm(verified).await
    }

    async fn confirm(&self, verified: VerifiedPayment) -> Result<Payment, AppError> {
        self.booking
            .confirm_payment(&verified)
            .await
            .inspect_err(|err| {
                warn!(
                    ticket_id = verified.ticket_id,
                    transaction_id = %verified.transaction_id,
                    error = %err,
                    "Provider confirmed a payment that could not be recorded"
                )
            })
    }

    /// An unpaid ticket together with its event.
    async fn payable(&self, ticket_id: i64) -> Result<(Ticket, Event), AppError> {
        let ticket = self
            .repo
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket with id '{ticket_id}' was not found")))?;
        if ticket.is_paid {
            return Err(AppError::AlreadyPaid(format!(
                "Ticket {ticket_id} has already been paid"
            )));
        }
        let event = self
            .repo
            .get_event(ticket.event_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Event with id '{}' was not found", ticket.event_id))
            })?;
        Ok((ticket, event.event))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{EsewaConfig, PaypalConfig};
    use crate::gateways::http_client;
    use crate::models::{EventInput, TicketInput, VenueInput};
    use crate::services::qr::QrIssuer;
    use crate::store::MemoryRepository;

    async fn setup(provider: &MockServer) -> (Arc<MemoryRepository>, CheckoutService, i64) {
        let repo = Arc::new(MemoryRepository::new());
        let venue = repo
            .create_venue(&VenueInput {
                name: "Club 25".to_string(),
                address: "Thamel".to_string(),
                latitude: None,
                longitude: None,
            })
            .await
            .unwrap();
        let event = repo
            .create_event(&EventInput {
                title: "Indie Night".to_string(),
                description: String::new(),
                starts_at: Utc::now() + Duration::days(1),
                venue_id: venue.id,
                price: Decimal::new(1500, 0),
                total_seats: 5,
                festival_id: None,
                performer_ids: vec![],
            })
            .await
            .unwrap();
        let ticket = repo
            .book_ticket(&TicketInput {
                event_id: event.event.id,
                seat_number: "A1".to_string(),
                user_id: Some(4),
                guest_name: None,
            })
            .await
            .unwrap();

        let client = http_client(StdDuration::from_secs(5)).unwrap();
        let esewa = EsewaGateway::new(
            client.clone(),
            EsewaConfig {
                payment_url: format!("{}/epay/main", provider.uri()),
                verification_url: format!("{}/epay/transrec", provider.uri()),
                merchant_code: "EPAYTEST".to_string(),
                callback_url: "http://shop.test/esewa/callback".to_string(),
            },
        );
        let paypal = PaypalGateway::new(
            client,
            PaypalConfig {
                base_url: provider.uri(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                currency: "USD".to_string(),
                callback_url: "http://shop.test/paypal/callback".to_string(),
            },
        );
        let booking = BookingService::new(repo.clone(), QrIssuer::new("test-secret"));
        let service = CheckoutService::new(repo.clone(), booking, esewa, paypal);
        (repo, service, ticket.id)
    }

    fn esewa_success(ticket_id: i64) -> EsewaCallback {
        EsewaCallback {
            q: Some("su".to_string()),
            oid: Some(format!("ticket_{ticket_id}")),
            amt: Some("1500".to_string()),
            ref_id: Some("0001ABC".to_string()),
        }
    }

    #[tokio::test]
    async fn test_esewa_success_pays_ticket() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/epay/transrec"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<response><response_code>Success</response_code></response>",
            ))
            .mount(&provider)
            .await;
        let (repo, service, ticket_id) = setup(&provider).await;

        let payment = service.esewa_callback(&esewa_success(ticket_id)).await.unwrap();

        assert_eq!(payment.transaction_id, "0001ABC");
        assert_eq!(payment.payment_method, "esewa");
        assert!(repo.get_ticket(ticket_id).await.unwrap().unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_esewa_failed_verification_leaves_ticket_unpaid() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/epay/transrec"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<response><response_code>failure</response_code></response>",
            ))
            .mount(&provider)
            .await;
        let (repo, service, ticket_id) = setup(&provider).await;

        let result = service.esewa_callback(&esewa_success(ticket_id)).await;

        match result {
            Err(AppError::VerificationFailed(msg)) => {
                assert_eq!(msg, "Payment verification failed")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let ticket = repo.get_ticket(ticket_id).await.unwrap().unwrap();
        assert!(!ticket.is_paid);
        assert!(ticket.qr_code.is_none());
        assert!(repo.list_payments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_of_paid_ticket_is_refused() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/epay/transrec"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Success"))
            .mount(&provider)
            .await;
        let (_, service, ticket_id) = setup(&provider).await;
        service.esewa_callback(&esewa_success(ticket_id)).await.unwrap();

        let result = service.esewa_checkout(ticket_id).await;
        assert!(matches!(result, Err(AppError::AlreadyPaid(_))));
    }

    #[tokio::test]
    async fn test_checkout_unknown_ticket() {
        let provider = MockServer::start().await;
        let (_, service, _) = setup(&provider).await;
        let result = service.paypal_checkout(404).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_paypal_round_trip() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "T" })))
            .mount(&provider)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "PAY-9",
                "state": "created",
                "links": [{ "href": "https://paypal.test/approve", "rel": "approval_url" }]
            })))
            .mount(&provider)
            .await;
        let (repo, service, ticket_id) = setup(&provider).await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/payment/PAY-9/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "PAY-9",
                "state": "approved",
                "transactions": [{
                    "amount": { "total": "1500.00", "currency": "USD" },
                    "item_list": { "items": [{ "sku": format!("ticket_{ticket_id}") }] }
                }]
            })))
            .mount(&provider)
            .await;

        let checkout = service.paypal_checkout(ticket_id).await.unwrap();
        assert_eq!(checkout.approval_url, "https://paypal.test/approve");

        let payment = service
            .paypal_callback(&PaypalCallback {
                status: Some("success".to_string()),
                payment_id: Some(checkout.payment_id),
                payer_id: Some("PAYER".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(payment.transaction_id, "PAY-9");
        assert_eq!(payment.amount, Decimal::new(150000, 2));
        assert!(repo.get_ticket(ticket_id).await.unwrap().unwrap().is_paid);
    }
}
