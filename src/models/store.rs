use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    /// ISO currency code all catalog prices and order totals are in.
    pub currency: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateStore {
    pub name: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "XOF".to_string()
}

// ---- Per-provider credential sets -------------------------------------
//
// One struct per provider, holding exactly the fields that provider's
// adapter needs. Serialized to JSON and sealed with envelope encryption
// before storage; absence of a set means the provider is disabled for the
// store.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaypalConfig {
    pub client_id: String,
    pub secret: String,
    #[serde(default)]
    pub sandbox: bool,
    /// XOF per USD, used when converting stores priced in XOF. Kept in
    /// config rather than code so the rate is auditable per tenant.
    #[serde(default = "default_usd_rate")]
    pub usd_rate: f64,
}

fn default_usd_rate() -> f64 {
    // CFA franc peg to the euro, expressed against USD
    655.957
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    #[serde(default)]
    pub publishable_key: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FedapayConfig {
    pub secret_key: String,
    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KkiapayConfig {
    /// Handed to the browser widget; never used for verification.
    pub public_key: String,
    /// Server-side key for the authenticated status check.
    pub private_key: String,
    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinetpayConfig {
    pub api_key: String,
    pub site_id: String,
}

/// The per-tenant provider credential bundle, assembled from one encrypted
/// row per provider. Read-only to the reconciliation engine.
#[derive(Debug, Clone, Default)]
pub struct StorePaymentConfig {
    pub paypal: Option<PaypalConfig>,
    pub stripe: Option<StripeConfig>,
    pub fedapay: Option<FedapayConfig>,
    pub kkiapay: Option<KkiapayConfig>,
    pub cinetpay: Option<CinetpayConfig>,
}

/// Masked view returned by the settings read endpoint: which providers are
/// configured, never the secrets themselves.
#[derive(Debug, Serialize)]
pub struct PaymentConfigSummary {
    pub paypal: bool,
    pub stripe: bool,
    pub fedapay: bool,
    pub kkiapay: bool,
    pub cinetpay: bool,
}

impl From<&StorePaymentConfig> for PaymentConfigSummary {
    fn from(config: &StorePaymentConfig) -> Self {
        Self {
            paypal: config.paypal.is_some(),
            stripe: config.stripe.is_some(),
            fedapay: config.fedapay.is_some(),
            kkiapay: config.kkiapay.is_some(),
            cinetpay: config.cinetpay.is_some(),
        }
    }
}
