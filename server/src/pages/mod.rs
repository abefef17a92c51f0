//! Server-rendered pages for browser checkout flows.

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tera::{Context, Tera};

use crate::gateways::EsewaCheckout;
use crate::models::Payment;
use crate::utils::error::AppError;

const PAYMENT_FORM: &str = "payment_form.html";
const PAYMENT_RESULT: &str = "payment_result.html";

/// Pages carry one inline script and submit forms to the provider.
const PAGE_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; \
    script-src 'unsafe-inline'; form-action https: http:; frame-ancestors 'none'";

#[derive(Clone)]
pub struct Pages {
    tera: Arc<Tera>,
}

impl Pages {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                PAYMENT_FORM,
                include_str!("../../templates/payment_form.html"),
            ),
            (
                PAYMENT_RESULT,
                include_str!("../../templates/payment_result.html"),
            ),
        ])?;
        tera.autoescape_on(vec![".html"]);
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Auto-submitting form that carries the customer to eSewa.
    pub fn esewa_form(&self, ticket_id: i64, checkout: &EsewaCheckout) -> Response {
        let mut context = Context::new();
        context.insert("ticket_id", &ticket_id);
        context.insert("payment_url", &checkout.payment_url);
        context.insert("fields", &checkout.data);
        self.render(PAYMENT_FORM, &context, StatusCode::OK)
    }

    pub fn payment_success(&self, payment: &Payment) -> Response {
        let mut context = Context::new();
        context.insert("success", &true);
        context.insert("title", "Payment Successful!");
        context.insert("message", "Your ticket is confirmed.");
        context.insert("payment", payment);
        self.render(PAYMENT_RESULT, &context, StatusCode::OK)
    }

    /// Failure page for `err`, with the status the JSON API would use.
    pub fn payment_failed(&self, err: &AppError) -> Response {
        err.log();
        let title = match err {
            AppError::VerificationFailed(_) => "Payment Verification Failed!",
            AppError::GatewayRejected(_) | AppError::GatewayUnavailable(_) => "Payment Failed!",
            AppError::ValidationError(_) => "Invalid Request",
            _ => "Payment Error",
        };
        let mut context = Context::new();
        context.insert("success", &false);
        context.insert("title", title);
        context.insert("message", &err.public_message());
        self.render(PAYMENT_RESULT, &context, err.status_code())
    }

    fn render(&self, template: &str, context: &Context, status: StatusCode) -> Response {
        match self.tera.render(template, context) {
            Ok(body) => (
                status,
                [(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(PAGE_CSP))],
                Html(body),
            )
                .into_response(),
            Err(e) => {
                AppError::InternalServerError(format!("failed to render {template}: {e}"))
                    .into_response()
            }
        }
    }
}
