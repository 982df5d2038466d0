//! Provider identification and event decoding for inbound webhooks.
//!
//! Five independent providers POST to the same endpoint, each with its own
//! loosely-specified payload shape. Identification is signature-based where
//! a provider sends a signature header, shape-based otherwise, evaluated in
//! a fixed priority order so structurally-overlapping payloads cannot be
//! claimed by the wrong provider. A new provider is added by appending a
//! rule, not by nesting another conditional.

use axum::http::HeaderMap;
use serde_json::Value;

use crate::payments::PaymentProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSuccess,
    /// Recognized provider, but not an event this engine acts on.
    Other,
}

#[derive(Debug, Clone)]
pub struct ClassifiedEvent {
    pub provider: PaymentProvider,
    pub kind: EventKind,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Classification {
    Event(ClassifiedEvent),
    /// Legacy form-encoded notification: acknowledged, never processed.
    FormEncoded,
    /// Valid JSON matching no known provider shape.
    Unidentified,
}

struct DecodedEvent {
    kind: EventKind,
    correlation_id: Option<String>,
}

type Predicate = fn(&Value, &HeaderMap) -> bool;
type Decoder = fn(&Value) -> DecodedEvent;

struct Rule {
    provider: PaymentProvider,
    matches: Predicate,
    decode: Decoder,
}

/// Priority order matters: PayPal's event envelope is the most specific,
/// the two signature-header rules come next, and the bare shape-based rules
/// go last.
static RULES: &[Rule] = &[
    Rule {
        provider: PaymentProvider::Paypal,
        matches: paypal_matches,
        decode: paypal_decode,
    },
    Rule {
        provider: PaymentProvider::Stripe,
        matches: stripe_matches,
        decode: stripe_decode,
    },
    Rule {
        provider: PaymentProvider::Fedapay,
        matches: fedapay_matches,
        decode: fedapay_decode,
    },
    Rule {
        provider: PaymentProvider::Kkiapay,
        matches: kkiapay_matches,
        decode: kkiapay_decode,
    },
    Rule {
        provider: PaymentProvider::Cinetpay,
        matches: cinetpay_matches,
        decode: cinetpay_decode,
    },
];

/// Identify the sender of a raw webhook body and decode the event.
///
/// Legacy form-encoded bodies are sniffed before any JSON parsing; a body
/// that is neither form-encoded nor valid JSON is a parse error the caller
/// reports as a bad request.
pub fn classify(
    body: &[u8],
    headers: &HeaderMap,
) -> std::result::Result<Classification, serde_json::Error> {
    if looks_form_encoded(body) {
        return Ok(Classification::FormEncoded);
    }

    let value: Value = serde_json::from_slice(body)?;
    for rule in RULES {
        if (rule.matches)(&value, headers) {
            let decoded = (rule.decode)(&value);
            return Ok(Classification::Event(ClassifiedEvent {
                provider: rule.provider,
                kind: decoded.kind,
                correlation_id: decoded.correlation_id,
            }));
        }
    }
    Ok(Classification::Unidentified)
}

/// Substring sniff for `key=value&key=value` bodies. Some older gateways
/// still deliver these; they carry no JSON to classify.
fn looks_form_encoded(body: &[u8]) -> bool {
    let trimmed: &[u8] = {
        let start = body.iter().position(|b| !b.is_ascii_whitespace());
        match start {
            Some(i) => &body[i..],
            None => return false,
        }
    };
    !matches!(trimmed.first(), Some(b'{') | Some(b'[') | Some(b'"'))
        && trimmed.contains(&b'=')
}

/// Json string, or number coerced to its decimal form. Provider ids come
/// back as either depending on the gateway.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---- PayPal -----------------------------------------------------------

fn paypal_matches(value: &Value, _headers: &HeaderMap) -> bool {
    value
        .get("event_type")
        .and_then(Value::as_str)
        .map(|t| t.starts_with("PAYMENT.") || t.starts_with("CHECKOUT."))
        .unwrap_or(false)
}

fn paypal_decode(value: &Value) -> DecodedEvent {
    let event_type = value.get("event_type").and_then(Value::as_str).unwrap_or("");
    if event_type != "PAYMENT.CAPTURE.COMPLETED" {
        return DecodedEvent {
            kind: EventKind::Other,
            correlation_id: None,
        };
    }

    let resource = value.get("resource");
    // The order reference on the capture resource when present, else the
    // capture id itself.
    let correlation_id = resource
        .and_then(|r| {
            r.get("supplementary_data")
                .and_then(|s| s.get("related_ids"))
                .and_then(|ids| ids.get("order_id"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .or_else(|| {
            resource
                .and_then(|r| r.get("id"))
                .and_then(Value::as_str)
                .map(String::from)
        });

    DecodedEvent {
        kind: EventKind::PaymentSuccess,
        correlation_id,
    }
}

// ---- Stripe -----------------------------------------------------------

fn stripe_matches(_value: &Value, headers: &HeaderMap) -> bool {
    headers.contains_key("stripe-signature")
}

fn stripe_decode(value: &Value) -> DecodedEvent {
    let event_type = value.get("type").and_then(Value::as_str).unwrap_or("");
    if event_type != "checkout.session.completed" {
        return DecodedEvent {
            kind: EventKind::Other,
            correlation_id: None,
        };
    }

    let correlation_id = value
        .get("data")
        .and_then(|d| d.get("object"))
        .and_then(|o| o.get("id"))
        .and_then(Value::as_str)
        .map(String::from);

    DecodedEvent {
        kind: EventKind::PaymentSuccess,
        correlation_id,
    }
}

// ---- FedaPay ----------------------------------------------------------

fn fedapay_matches(value: &Value, headers: &HeaderMap) -> bool {
    if headers.contains_key("x-fedapay-signature") {
        return true;
    }
    // Shape fallback: a currency-bearing entity object plus an event name.
    let entity_has_currency = value
        .get("entity")
        .and_then(Value::as_object)
        .map(|e| e.contains_key("currency") || e.contains_key("currency_id"))
        .unwrap_or(false);
    entity_has_currency && value.get("name").is_some()
}

fn fedapay_decode(value: &Value) -> DecodedEvent {
    let name = value.get("name").and_then(Value::as_str).unwrap_or("");
    if name != "transaction.approved" {
        return DecodedEvent {
            kind: EventKind::Other,
            correlation_id: None,
        };
    }

    let correlation_id = value
        .get("entity")
        .and_then(|e| e.get("id"))
        .and_then(coerce_string);

    DecodedEvent {
        kind: EventKind::PaymentSuccess,
        correlation_id,
    }
}

// ---- KkiaPay ----------------------------------------------------------

fn kkiapay_matches(value: &Value, _headers: &HeaderMap) -> bool {
    value.get("transactionId").is_some()
        && value
            .get("isPaymentSucces")
            .map(Value::is_boolean)
            .unwrap_or(false)
}

fn kkiapay_decode(value: &Value) -> DecodedEvent {
    let succeeded = value
        .get("isPaymentSucces")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !succeeded {
        return DecodedEvent {
            kind: EventKind::Other,
            correlation_id: None,
        };
    }

    DecodedEvent {
        kind: EventKind::PaymentSuccess,
        correlation_id: value.get("transactionId").and_then(coerce_string),
    }
}

// ---- CinetPay ---------------------------------------------------------

fn cinetpay_matches(value: &Value, _headers: &HeaderMap) -> bool {
    value.get("cpm_trans_id").is_some()
}

fn cinetpay_decode(value: &Value) -> DecodedEvent {
    let result_code = value.get("cpm_result").and_then(Value::as_str).unwrap_or("");
    if result_code != "00" {
        return DecodedEvent {
            kind: EventKind::Other,
            correlation_id: None,
        };
    }

    DecodedEvent {
        kind: EventKind::PaymentSuccess,
        correlation_id: value.get("cpm_trans_id").and_then(coerce_string),
    }
}
