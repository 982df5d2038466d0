use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::StripeConfig;

use super::{PaymentIntent, PaymentResult, http_client};

type HmacSha256 = Hmac<Sha256>;

const API_URL: &str = "https://api.stripe.com";

/// Currencies without a minor unit; Stripe takes their amounts as-is.
const ZERO_DECIMAL: &[&str] = &["XOF", "XAF", "JPY", "KRW", "GNF", "RWF", "UGX"];

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: http_client(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    pub async fn create_transaction(&self, intent: &PaymentIntent) -> PaymentResult {
        match self.try_create(intent).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Stripe session creation failed: {}", e);
                PaymentResult::failed(format!("Stripe: {}", e))
            }
        }
    }

    async fn try_create(&self, intent: &PaymentIntent) -> Result<PaymentResult> {
        let currency = intent.currency.to_lowercase();
        let unit_amount = if ZERO_DECIMAL.contains(&intent.currency.to_uppercase().as_str()) {
            intent.amount
        } else {
            intent.amount * 100
        };

        let unit_amount = unit_amount.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("success_url", &intent.success_url),
            ("cancel_url", &intent.cancel_url),
            ("customer_email", &intent.customer_email),
            ("client_reference_id", &intent.reference),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &currency),
            ("line_items[0][price_data][unit_amount]", &unit_amount),
            (
                "line_items[0][price_data][product_data][name]",
                &intent.description,
            ),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", API_URL))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("session rejected: {}", body)));
        }

        let raw: serde_json::Value = response.json().await?;
        let session: CheckoutSessionResponse = serde_json::from_value(raw.clone())?;

        Ok(PaymentResult::redirect(session.id, session.url, Some(raw)))
    }

    /// Verify a `stripe-signature` header (`t=...,v1=...`) against the raw
    /// body. Returns `Ok(false)` when no webhook secret is configured for
    /// the tenant, letting the caller decide whether to skip or reject.
    pub fn verify_webhook_signature(&self, payload: &[u8], header: &str) -> Result<bool> {
        let secret = match &self.webhook_secret {
            Some(s) => s,
            None => return Ok(false),
        };

        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("v1", v)) => signature = Some(v),
                _ => {}
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => return Err(AppError::BadRequest("Malformed stripe-signature header".into())),
        };

        let provided = hex::decode(signature)
            .map_err(|_| AppError::BadRequest("Malformed stripe-signature header".into()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        Ok(expected.as_slice().ct_eq(provided.as_slice()).into())
    }
}
