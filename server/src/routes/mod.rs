use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::gateways::{EsewaGateway, PaypalGateway};
use crate::handlers::{
    checkout, events, festivals, health_check, payments, performers, qr, reviews, tickets, venues,
};
use crate::pages::Pages;
use crate::services::{BookingService, CheckoutService, QrIssuer};
use crate::store::Repository;

/// Everything a handler may need, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub booking: BookingService,
    pub checkout: CheckoutService,
    pub pages: Pages,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        qr: QrIssuer,
        esewa: EsewaGateway,
        paypal: PaypalGateway,
        pages: Pages,
    ) -> Self {
        let booking = BookingService::new(repo.clone(), qr);
        let checkout = CheckoutService::new(repo.clone(), booking.clone(), esewa, paypal);
        Self {
            repo,
            booking,
            checkout,
            pages,
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/venues",
            get(venues::list_venues).post(venues::create_venue),
        )
        .route(
            "/venues/:id",
            get(venues::get_venue)
                .put(venues::update_venue)
                .delete(venues::delete_venue),
        )
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/performers", post(events::add_performer))
        .route(
            "/performers",
            get(performers::list_performers).post(performers::create_performer),
        )
        .route(
            "/performers/:id",
            get(performers::get_performer)
                .put(performers::update_performer)
                .delete(performers::delete_performer),
        )
        .route(
            "/festivals",
            get(festivals::list_festivals).post(festivals::create_festival),
        )
        .route(
            "/festivals/:id",
            get(festivals::get_festival)
                .put(festivals::update_festival)
                .delete(festivals::delete_festival),
        )
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::book_ticket),
        )
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:id/qr-code", get(tickets::ticket_qr_code))
        .route(
            "/payments",
            get(payments::list_payments).post(payments::confirm_payment),
        )
        .route("/payments/:id", get(payments::get_payment))
        .route(
            "/checkout/esewa/initiate/:ticket_id",
            get(checkout::esewa_initiate),
        )
        .route("/checkout/esewa/callback", get(checkout::esewa_callback))
        .route("/checkout/paypal/initiate", post(checkout::paypal_initiate))
        .route("/checkout/paypal/callback", get(checkout::paypal_callback))
        .route("/qr/validate", post(qr::validate_qr))
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/payment/:ticket_id", get(checkout::esewa_payment_page))
        .route("/esewa/callback", get(checkout::esewa_callback_page))
        .route("/paypal/initiate", post(checkout::paypal_initiate_page))
        .route("/paypal/callback", get(checkout::paypal_callback_page))
}

/// `cors_origins` is the comma separated list from `Config::cors_allowed_origins`.
pub fn create_routes(state: AppState, production: bool, cors_origins: &str) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .merge(page_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(production))
        .layer(create_cors_layer(cors_origins))
}
