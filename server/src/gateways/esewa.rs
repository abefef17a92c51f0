//! eSewa redirect-form integration.
//!
//! The customer's browser posts [`EsewaFormData`] to the eSewa page. eSewa
//! redirects back with `oid`, `amt` and `refId`, and the transaction is then
//! confirmed server-to-server against the verification endpoint. eSewa
//! answers with a small XML document. Any body containing `Success` counts as
//! confirmed; the document is not parsed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{parse_product_id, product_id, VerifiedPayment, ESEWA_METHOD};
use crate::config::EsewaConfig;
use crate::models::{Event, Ticket};
use crate::utils::error::AppError;

const SUCCESS_MARKER: &str = "Success";

/// Fields of the eSewa payment form, named as eSewa expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsewaFormData {
    pub amt: String,
    pub pdc: String,
    pub psc: String,
    #[serde(rename = "txAmt")]
    pub tx_amt: String,
    #[serde(rename = "tAmt")]
    pub t_amt: String,
    pub pid: String,
    pub scd: String,
    pub su: String,
    pub fu: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EsewaCheckout {
    pub payment_url: String,
    pub data: EsewaFormData,
}

/// Query string eSewa appends when redirecting back to us.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EsewaCallback {
    pub q: Option<String>,
    pub oid: Option<String>,
    pub amt: Option<String>,
    #[serde(rename = "refId")]
    pub ref_id: Option<String>,
}

#[derive(Clone)]
pub struct EsewaGateway {
    client: reqwest::Client,
    config: EsewaConfig,
}

impl EsewaGateway {
    pub fn new(client: reqwest::Client, config: EsewaConfig) -> Self {
        Self { client, config }
    }

    pub fn checkout(&self, ticket: &Ticket, event: &Event) -> EsewaCheckout {
        let amount = event.price.to_string();
        EsewaCheckout {
            payment_url: self.config.payment_url.clone(),
            data: EsewaFormData {
                amt: amount.clone(),
                pdc: "0".to_string(),
                psc: "0".to_string(),
                tx_amt: "0".to_string(),
                t_amt: amount,
                pid: product_id(ticket.id),
                scd: self.config.merchant_code.clone(),
                su: format!("{}?q=su", self.config.callback_url),
                fu: format!("{}?q=fu", self.config.callback_url),
            },
        }
    }

    /// Interprets the redirect and, for a success redirect, verifies it.
    pub async fn handle_callback(
        &self,
        callback: &EsewaCallback,
    ) -> Result<VerifiedPayment, AppError> {
        match callback.q.as_deref() {
            Some("su") => {
                let oid = required(&callback.oid, "oid")?;
                let amt = required(&callback.amt, "amt")?;
                let ref_id = required(&callback.ref_id, "refId")?;
                self.verify(oid, amt, ref_id).await
            }
            Some("fu") => Err(AppError::GatewayRejected(
                "Payment failed or was cancelled at eSewa".to_string(),
            )),
            _ => Err(AppError::ValidationError("Invalid callback".to_string())),
        }
    }

    pub async fn verify(
        &self,
        oid: &str,
        amt: &str,
        ref_id: &str,
    ) -> Result<VerifiedPayment, AppError> {
        let ticket_id = parse_product_id(oid)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown product id '{oid}'")))?;
        let amount: Decimal = amt
            .trim()
            .parse()
            .map_err(|_| AppError::ValidationError(format!("Invalid amount '{amt}'")))?;

        let response = self
            .client
            .post(&self.config.verification_url)
            .form(&[
                ("amt", amt),
                ("rid", ref_id),
                ("pid", oid),
                ("scd", self.config.merchant_code.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::GatewayRejected(format!(
                "eSewa verification returned {status}"
            )));
        }
        if !body.contains(SUCCESS_MARKER) {
            warn!(ticket_id, ref_id, "eSewa did not confirm the transaction");
            return Err(AppError::VerificationFailed(
                "Payment verification failed".to_string(),
            ));
        }

        info!(ticket_id, ref_id, %amount, "eSewa transaction verified");
        Ok(VerifiedPayment {
            ticket_id,
            amount,
            transaction_id: ref_id.to_string(),
            method: ESEWA_METHOD.to_string(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError(format!("Missing callback parameter '{name}'")))
}
