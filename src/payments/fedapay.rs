use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::FedapayConfig;

use super::{PaymentIntent, PaymentResult, http_client};

const LIVE_URL: &str = "https://api.fedapay.com";
const SANDBOX_URL: &str = "https://sandbox-api.fedapay.com";

#[derive(Debug, Serialize)]
struct CreateTransactionRequest {
    description: String,
    amount: i64,
    currency: CurrencyRef,
    callback_url: String,
    customer: CustomerPayload,
}

#[derive(Debug, Serialize)]
struct CurrencyRef {
    iso: String,
}

#[derive(Debug, Serialize)]
struct CustomerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    firstname: Option<String>,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<PhonePayload>,
}

#[derive(Debug, Serialize)]
struct PhonePayload {
    number: String,
}

// FedaPay wraps response bodies under a "v1/<entity>" key.
#[derive(Debug, Deserialize)]
struct CreateTransactionResponse {
    #[serde(rename = "v1/transaction")]
    transaction: TransactionBody,
}

#[derive(Debug, Deserialize)]
struct TransactionBody {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    url: String,
}

#[derive(Debug, Clone)]
pub struct FedapayClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl FedapayClient {
    pub fn new(config: &FedapayConfig) -> Self {
        Self {
            client: http_client(),
            secret_key: config.secret_key.clone(),
            base_url: if config.sandbox { SANDBOX_URL } else { LIVE_URL }.to_string(),
        }
    }

    pub async fn create_transaction(&self, intent: &PaymentIntent) -> PaymentResult {
        match self.try_create(intent).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("FedaPay transaction creation failed: {}", e);
                PaymentResult::failed(format!("FedaPay: {}", e))
            }
        }
    }

    /// Create the transaction, then request its payment token. The token
    /// call returns the hosted payment page URL.
    async fn try_create(&self, intent: &PaymentIntent) -> Result<PaymentResult> {
        let request = CreateTransactionRequest {
            description: intent.description.clone(),
            amount: intent.amount,
            currency: CurrencyRef {
                iso: intent.currency.to_uppercase(),
            },
            callback_url: intent.success_url.clone(),
            customer: CustomerPayload {
                firstname: intent.customer_name.clone(),
                email: intent.customer_email.clone(),
                phone_number: intent
                    .customer_phone
                    .clone()
                    .map(|number| PhonePayload { number }),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/transactions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("transaction rejected: {}", body)));
        }

        let raw: serde_json::Value = response.json().await?;
        let created: CreateTransactionResponse = serde_json::from_value(raw.clone())?;
        let transaction_id = created.transaction.id.to_string();

        let token_response = self
            .client
            .post(format!(
                "{}/v1/transactions/{}/token",
                self.base_url, transaction_id
            ))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await?;

        if !token_response.status().is_success() {
            let body = token_response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("token generation failed: {}", body)));
        }

        let token: TokenResponse = token_response.json().await?;

        Ok(PaymentResult::redirect(transaction_id, token.url, Some(raw)))
    }
}
