use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::KkiapayConfig;

use super::http_client;

const LIVE_URL: &str = "https://api.kkiapay.me";
const SANDBOX_URL: &str = "https://api-sandbox.kkiapay.me";

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    #[serde(rename = "transactionId")]
    transaction_id: &'a str,
}

/// Authoritative transaction state as reported by the KkiaPay API.
#[derive(Debug, Clone, Deserialize)]
pub struct KkiapayVerification {
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    /// Widget `state` payload; carries the ledger order id when the
    /// storefront initialized the widget with one.
    #[serde(default)]
    pub state: Option<String>,
}

impl KkiapayVerification {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("SUCCESS")
    }
}

/// KkiaPay's checkout is client-driven (the browser widget takes the public
/// key); the server side of the integration is this verification client.
/// The widget's claim of success is never trusted alone; the status is
/// pulled from the API with the private key before the ledger moves.
#[derive(Debug, Clone)]
pub struct KkiapayClient {
    client: Client,
    private_key: String,
    base_url: String,
}

impl KkiapayClient {
    pub fn new(config: &KkiapayConfig) -> Self {
        Self {
            client: http_client(),
            private_key: config.private_key.clone(),
            base_url: if config.sandbox { SANDBOX_URL } else { LIVE_URL }.to_string(),
        }
    }

    pub async fn verify_transaction(&self, transaction_id: &str) -> Result<KkiapayVerification> {
        let response = self
            .client
            .post(format!("{}/api/v1/transactions/status", self.base_url))
            .header("x-api-key", &self.private_key)
            .json(&StatusRequest { transaction_id })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "status check failed: {}",
                body
            )));
        }

        let verification: KkiapayVerification = response.json().await?;
        Ok(verification)
    }
}
