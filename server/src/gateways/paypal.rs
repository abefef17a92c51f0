//! PayPal REST (v1 payments) approval flow.
//!
//! A payment is created server-side, the customer approves it on PayPal and
//! is redirected back with `paymentId` and `PayerID`, and the payment is
//! then executed. Only an `approved` execution counts as paid.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{parse_product_id, product_id, VerifiedPayment, PAYPAL_METHOD};
use crate::config::PaypalConfig;
use crate::models::{Event, Ticket};
use crate::utils::error::AppError;

const APPROVED: &str = "approved";
const MAX_PROVIDER_ID_LEN: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct PaypalCheckout {
    pub payment_id: String,
    pub approval_url: String,
}

/// Query string PayPal appends to the return/cancel URLs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalCallback {
    pub status: Option<String>,
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    #[serde(rename = "PayerID")]
    pub payer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest<'a> {
    intent: &'a str,
    payer: Payer<'a>,
    redirect_urls: RedirectUrls,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    payment_method: &'a str,
}

#[derive(Debug, Serialize)]
struct RedirectUrls {
    return_url: String,
    cancel_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Transaction {
    amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    item_list: ItemList,
}

#[derive(Debug, Serialize, Deserialize)]
struct Amount {
    total: String,
    currency: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    quantity: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    payer_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaypalPayment {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Clone)]
pub struct PaypalGateway {
    client: reqwest::Client,
    config: PaypalConfig,
}

impl PaypalGateway {
    pub fn new(client: reqwest::Client, config: PaypalConfig) -> Self {
        Self { client, config }
    }

    async fn access_token(&self) -> Result<String, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.base_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::GatewayRejected(format!(
                "PayPal authentication returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Creates a sale for one ticket and returns where to send the customer.
    pub async fn create_payment(
        &self,
        ticket: &Ticket,
        event: &Event,
    ) -> Result<PaypalCheckout, AppError> {
        let token = self.access_token().await?;
        let total = event.price.round_dp(2).to_string();
        let request = CreatePaymentRequest {
            intent: "sale",
            payer: Payer {
                payment_method: "paypal",
            },
            redirect_urls: RedirectUrls {
                return_url: format!("{}?status=success", self.config.callback_url),
                cancel_url: format!("{}?status=cancel", self.config.callback_url),
            },
            transactions: vec![Transaction {
                amount: Amount {
                    total: total.clone(),
                    currency: self.config.currency.clone(),
                },
                description: Some(format!("Ticket for {}", event.title)),
                item_list: ItemList {
                    items: vec![Item {
                        name: event.title.clone(),
                        sku: product_id(ticket.id),
                        price: total,
                        currency: self.config.currency.clone(),
                        quantity: "1".to_string(),
                    }],
                },
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/payments/payment", self.config.base_url))
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(ticket_id = ticket.id, %status, %body, "PayPal refused to create payment");
            return Err(AppError::GatewayRejected(format!(
                "PayPal payment creation returned {status}"
            )));
        }

        let payment: PaypalPayment = response.json().await?;
        let approval_url = payment
            .links
            .into_iter()
            .find(|link| link.rel == "approval_url")
            .map(|link| link.href)
            .ok_or_else(|| {
                AppError::GatewayRejected("PayPal response has no approval URL".to_string())
            })?;

        debug!(ticket_id = ticket.id, payment_id = %payment.id, "PayPal payment created");
        Ok(PaypalCheckout {
            payment_id: payment.id,
            approval_url,
        })
    }

    /// Interprets the redirect and executes an approved payment.
    pub async fn handle_callback(
        &self,
        callback: &PaypalCallback,
    ) -> Result<VerifiedPayment, AppError> {
        let canceled = || AppError::ValidationError("Payment canceled or invalid".to_string());
        if callback.status.as_deref() != Some("success") {
            return Err(canceled());
        }
        let payment_id = callback
            .payment_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(canceled)?;
        let payer_id = callback
            .payer_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(canceled)?;
        self.execute_payment(payment_id, payer_id).await
    }

    pub async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
    ) -> Result<VerifiedPayment, AppError> {
        // Both ids come from the customer's redirect and end up in the
        // request path or body of an authenticated call.
        if !is_provider_id(payment_id) || !is_provider_id(payer_id) {
            warn!(payment_id, payer_id, "Rejected malformed PayPal callback ids");
            return Err(AppError::VerificationFailed(
                "Payment verification failed".to_string(),
            ));
        }

        let token = self.access_token().await?;
        let response = self
            .client
            .post(format!(
                "{}/v1/payments/payment/{payment_id}/execute",
                self.config.base_url
            ))
            .bearer_auth(&token)
            .json(&ExecuteRequest { payer_id })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            warn!(payment_id, %status, "PayPal refused to execute payment");
            return Err(AppError::VerificationFailed(
                "Payment verification failed".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::GatewayRejected(format!(
                "PayPal payment execution returned {status}"
            )));
        }

        let payment: PaypalPayment = response.json().await?;
        if payment.state != APPROVED {
            warn!(payment_id, state = %payment.state, "PayPal payment not approved");
            return Err(AppError::VerificationFailed(
                "Payment verification failed".to_string(),
            ));
        }

        let transaction = payment.transactions.first().ok_or_else(|| {
            AppError::GatewayRejected("PayPal payment has no transactions".to_string())
        })?;
        let ticket_id = transaction
            .item_list
            .items
            .iter()
            .find_map(|item| parse_product_id(&item.sku))
            .ok_or_else(|| {
                AppError::GatewayRejected("PayPal payment does not reference a ticket".to_string())
            })?;
        let amount: Decimal = transaction.amount.total.parse().map_err(|_| {
            AppError::GatewayRejected(format!(
                "PayPal returned an invalid amount '{}'",
                transaction.amount.total
            ))
        })?;

        info!(ticket_id, payment_id = %payment.id, %amount, "PayPal payment executed");
        Ok(VerifiedPayment {
            ticket_id,
            amount,
            transaction_id: payment.id,
            method: PAYPAL_METHOD.to_string(),
        })
    }
}

/// PayPal payment and payer ids are short runs of letters, digits and `-`.
fn is_provider_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PROVIDER_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
