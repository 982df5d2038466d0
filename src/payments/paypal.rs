use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PaypalConfig;

use super::{PaymentIntent, PaymentResult, http_client};

const LIVE_URL: &str = "https://api-m.paypal.com";
const SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";

/// Currencies PayPal accepts directly. Anything else is converted to USD at
/// the tenant-configured rate before the order is created.
const SUPPORTED_CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "CAD", "AUD", "CHF", "JPY"];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    intent: String,
    purchase_units: Vec<PurchaseUnit>,
    application_context: ApplicationContext,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    reference_id: String,
    description: String,
    amount: Amount,
}

#[derive(Debug, Serialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct ApplicationContext {
    return_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
    links: Vec<OrderLink>,
}

#[derive(Debug, Deserialize)]
struct OrderLink {
    rel: String,
    href: String,
}

#[derive(Debug, Clone)]
pub struct PaypalClient {
    client: Client,
    client_id: String,
    secret: String,
    base_url: String,
    usd_rate: f64,
}

impl PaypalClient {
    pub fn new(config: &PaypalConfig) -> Self {
        Self {
            client: http_client(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            base_url: if config.sandbox { SANDBOX_URL } else { LIVE_URL }.to_string(),
            usd_rate: config.usd_rate,
        }
    }

    pub async fn create_transaction(&self, intent: &PaymentIntent) -> PaymentResult {
        match self.try_create(intent).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("PayPal order creation failed: {}", e);
                PaymentResult::failed(format!("PayPal: {}", e))
            }
        }
    }

    /// Client-credentials token exchange. First of the two calls this
    /// adapter makes per intent.
    async fn access_token(&self) -> Result<String> {
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.secret));
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .header("Authorization", format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("token exchange failed: {}", body)));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn try_create(&self, intent: &PaymentIntent) -> Result<PaymentResult> {
        let token = self.access_token().await?;
        let (currency_code, value) = self.adapt_amount(intent);

        let request = CreateOrderRequest {
            intent: "CAPTURE".to_string(),
            purchase_units: vec![PurchaseUnit {
                reference_id: intent.reference.clone(),
                description: intent.description.clone(),
                amount: Amount {
                    currency_code,
                    value,
                },
            }],
            application_context: ApplicationContext {
                return_url: intent.success_url.clone(),
                cancel_url: intent.cancel_url.clone(),
            },
        };

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("order rejected: {}", body)));
        }

        let raw: serde_json::Value = response.json().await?;
        let order: CreateOrderResponse = serde_json::from_value(raw.clone())?;

        let approve_url = order
            .links
            .iter()
            .find(|l| l.rel == "approve")
            .map(|l| l.href.clone())
            .ok_or_else(|| AppError::Provider("no approve link in order response".into()))?;

        Ok(PaymentResult::redirect(order.id, approve_url, Some(raw)))
    }

    /// PayPal has no XOF support: convert at the tenant-configured rate.
    /// The amount shown on the PayPal page then differs from the canonical
    /// order currency, so every conversion is logged with the rate used.
    fn adapt_amount(&self, intent: &PaymentIntent) -> (String, String) {
        let currency = intent.currency.to_uppercase();
        if SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            return (currency, format!("{:.2}", intent.amount as f64));
        }

        let converted = intent.amount as f64 / self.usd_rate;
        tracing::warn!(
            order = %intent.reference,
            rate = self.usd_rate,
            original = intent.amount,
            currency = %currency,
            "converting to USD for PayPal; displayed amount differs from order currency"
        );
        ("USD".to_string(), format!("{:.2}", converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(rate: f64) -> PaypalClient {
        PaypalClient::new(&PaypalConfig {
            client_id: "cid".into(),
            secret: "sec".into(),
            sandbox: true,
            usd_rate: rate,
        })
    }

    fn intent(amount: i64, currency: &str) -> PaymentIntent {
        PaymentIntent {
            amount,
            currency: currency.into(),
            description: "Order test".into(),
            customer_email: "a@b.test".into(),
            customer_phone: None,
            customer_name: None,
            success_url: "https://shop.test/ok".into(),
            cancel_url: "https://shop.test/ko".into(),
            notify_url: "https://shop.test/webhook".into(),
            store_id: "s1".into(),
            reference: "o1".into(),
        }
    }

    #[test]
    fn xof_converts_to_usd_at_configured_rate() {
        let (currency, value) = client(655.957).adapt_amount(&intent(65596, "XOF"));
        assert_eq!(currency, "USD");
        assert_eq!(value, "100.00");
    }

    #[test]
    fn supported_currency_passes_through() {
        let (currency, value) = client(655.957).adapt_amount(&intent(25, "EUR"));
        assert_eq!(currency, "EUR");
        assert_eq!(value, "25.00");
    }
}
