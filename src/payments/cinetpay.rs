use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::CinetpayConfig;

use super::{PaymentIntent, PaymentResult, http_client};

const API_URL: &str = "https://api-checkout.cinetpay.com";

#[derive(Debug, Serialize)]
struct CreatePaymentRequest {
    apikey: String,
    site_id: String,
    transaction_id: String,
    amount: i64,
    currency: String,
    description: String,
    customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_phone_number: Option<String>,
    notify_url: String,
    return_url: String,
    channels: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<PaymentData>,
}

#[derive(Debug, Deserialize)]
struct PaymentData {
    payment_url: String,
}

#[derive(Debug, Clone)]
pub struct CinetpayClient {
    client: Client,
    api_key: String,
    site_id: String,
}

impl CinetpayClient {
    pub fn new(config: &CinetpayConfig) -> Self {
        Self {
            client: http_client(),
            api_key: config.api_key.clone(),
            site_id: config.site_id.clone(),
        }
    }

    pub async fn create_transaction(&self, intent: &PaymentIntent) -> PaymentResult {
        match self.try_create(intent).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("CinetPay payment creation failed: {}", e);
                PaymentResult::failed(format!("CinetPay: {}", e))
            }
        }
    }

    async fn try_create(&self, intent: &PaymentIntent) -> Result<PaymentResult> {
        // CinetPay has no server-issued id at creation time: the merchant
        // supplies the transaction id, which later comes back in the
        // cpm_trans_id webhook field.
        let transaction_id = format!("CP-{}", Uuid::new_v4());

        let request = CreatePaymentRequest {
            apikey: self.api_key.clone(),
            site_id: self.site_id.clone(),
            transaction_id: transaction_id.clone(),
            amount: intent.amount,
            currency: intent.currency.to_uppercase(),
            description: intent.description.clone(),
            customer_email: intent.customer_email.clone(),
            customer_name: intent.customer_name.clone(),
            customer_phone_number: intent.customer_phone.clone(),
            notify_url: intent.notify_url.clone(),
            return_url: intent.success_url.clone(),
            channels: "ALL".to_string(),
            metadata: Some(intent.reference.clone()),
        };

        let response = self
            .client
            .post(format!("{}/v2/payment", API_URL))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("payment rejected: {}", body)));
        }

        let raw: serde_json::Value = response.json().await?;
        let payment: CreatePaymentResponse = serde_json::from_value(raw.clone())?;

        if payment.code != "201" {
            return Err(AppError::Provider(format!(
                "payment rejected: {} ({})",
                payment.message.unwrap_or_default(),
                payment.code
            )));
        }

        let payment_url = payment
            .data
            .ok_or_else(|| AppError::Provider("no payment data in response".into()))?
            .payment_url;

        Ok(PaymentResult::redirect(transaction_id, payment_url, Some(raw)))
    }
}
