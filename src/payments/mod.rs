mod cinetpay;
mod fedapay;
mod kkiapay;
mod paypal;
mod stripe;

pub use cinetpay::*;
pub use fedapay::*;
pub use kkiapay::*;
pub use paypal::*;
pub use stripe::*;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::StorePaymentConfig;

/// Upper bound on any single provider call. An unreachable provider must
/// not hang the webhook endpoint or the checkout request.
const PROVIDER_TIMEOUT_SECS: u64 = 20;

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
        // Construction only fails if the TLS backend cannot initialize.
        .expect("failed to build HTTP client")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Paypal,
    Stripe,
    Fedapay,
    Kkiapay,
    Cinetpay,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Paypal => "paypal",
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Fedapay => "fedapay",
            PaymentProvider::Kkiapay => "kkiapay",
            PaymentProvider::Cinetpay => "cinetpay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "paypal" => Some(PaymentProvider::Paypal),
            "stripe" => Some(PaymentProvider::Stripe),
            "fedapay" => Some(PaymentProvider::Fedapay),
            "kkiapay" => Some(PaymentProvider::Kkiapay),
            "cinetpay" => Some(PaymentProvider::Cinetpay),
            _ => None,
        }
    }
}

/// A requested, not-yet-completed payment, normalized across providers.
/// `amount` always comes from the ledger's recomputed order total, never
/// from the client.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_name: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Where the provider should POST asynchronous notifications.
    pub notify_url: String,
    pub store_id: String,
    /// Ledger order id, embedded where a provider accepts a merchant
    /// reference.
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    RequiresAction,
}

/// Normalized result of an intent creation. Adapters always return one of
/// these, never an error: failures are folded into `status: failed` with a
/// human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResult {
    /// Provider-issued transaction identifier (empty when the provider has
    /// not issued one yet, e.g. client-driven flows).
    pub transaction_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw provider payload, retained for audit logging only. Never parsed
    /// downstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl PaymentResult {
    pub fn redirect(transaction_id: String, url: String, raw: Option<serde_json::Value>) -> Self {
        Self {
            transaction_id,
            status: PaymentStatus::Pending,
            redirect_url: Some(url),
            client_token: None,
            error: None,
            raw,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            transaction_id: String::new(),
            status: PaymentStatus::Failed,
            redirect_url: None,
            client_token: None,
            error: Some(error),
            raw: None,
        }
    }
}

/// Intent Orchestrator: resolve the adapter for the requested method from
/// the tenant's credential bundle and produce a normalized result.
///
/// A method without credentials fails fast with `configuration_missing`;
/// no provider call is attempted. KkiaPay's checkout is entirely
/// client-driven, so the server only hands back the public key: a
/// deliberate short-circuit, not an error path.
pub async fn create_payment_intent(
    provider: PaymentProvider,
    config: &StorePaymentConfig,
    intent: &PaymentIntent,
) -> Result<PaymentResult> {
    match provider {
        PaymentProvider::Paypal => {
            let c = config
                .paypal
                .as_ref()
                .ok_or_else(|| AppError::ProviderNotConfigured("PayPal".into()))?;
            Ok(PaypalClient::new(c).create_transaction(intent).await)
        }
        PaymentProvider::Stripe => {
            let c = config
                .stripe
                .as_ref()
                .ok_or_else(|| AppError::ProviderNotConfigured("Stripe".into()))?;
            Ok(StripeClient::new(c).create_transaction(intent).await)
        }
        PaymentProvider::Fedapay => {
            let c = config
                .fedapay
                .as_ref()
                .ok_or_else(|| AppError::ProviderNotConfigured("FedaPay".into()))?;
            Ok(FedapayClient::new(c).create_transaction(intent).await)
        }
        PaymentProvider::Cinetpay => {
            let c = config
                .cinetpay
                .as_ref()
                .ok_or_else(|| AppError::ProviderNotConfigured("CinetPay".into()))?;
            Ok(CinetpayClient::new(c).create_transaction(intent).await)
        }
        PaymentProvider::Kkiapay => {
            let c = config
                .kkiapay
                .as_ref()
                .ok_or_else(|| AppError::ProviderNotConfigured("KkiaPay".into()))?;
            Ok(PaymentResult {
                transaction_id: String::new(),
                status: PaymentStatus::Pending,
                redirect_url: None,
                client_token: Some(c.public_key.clone()),
                error: None,
                raw: Some(serde_json::json!({ "public_key": c.public_key })),
            })
        }
    }
}
