//! The activation HTTP client and request/outcome types.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::ActivationConfig;

/// Backend response code that signals a successful activation. Anything
/// else, or a transport failure, is a failure outcome.
const SUCCESS_RESPONSE_CODE: &str = "00";

/// Fallback message when the backend rejects without a detail string.
const GENERIC_FAILURE_MESSAGE: &str = "Activation failed";

/// One activation attempt, as validated by the tool dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationAttempt {
    /// Last 4 digits of the card.
    pub card_last4: String,
    /// Expiry in caller-facing MMYY order.
    pub expiry_mmyy: String,
    /// Optional national identity number for additional verification.
    pub cnic: Option<String>,
}

/// Normalized result of an activation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    /// Raw upstream payload, kept for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationRequestBody {
    service_header: ServiceHeader,
    transaction_info: TransactionInfo,
    activation_request: ActivationPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceHeader {
    channel: String,
    processing_type: &'static str,
    auth_info: AuthInfo,
    from_region_info: RegionInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthInfo {
    username: String,
    password: String,
    authentication_type: &'static str,
    auth_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionInfo {
    bic_code: String,
    country_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionInfo {
    transaction_type: &'static str,
    transaction_sub_type: &'static str,
    reference_id: String,
    transaction_date: String,
    transaction_time: String,
    transmission_date_time: String,
    stan: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationPayload {
    pan: String,
    expiry: String,
    is_mask_card: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cnic: Option<String>,
}

/// Client for the bank's debit-card activation service.
#[derive(Debug, Clone)]
pub struct ActivationClient {
    http: reqwest::Client,
    config: ActivationConfig,
}

impl ActivationClient {
    pub fn new(config: ActivationConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build activation HTTP client");
        Self { http, config }
    }

    /// Sends one activation request and maps the response to an outcome.
    ///
    /// Exactly one outbound request per call; transport failures are
    /// returned as failure outcomes, never as errors.
    pub async fn activate(&self, attempt: &ActivationAttempt) -> ActivationOutcome {
        let reference_id = generate_reference_id();
        let body = self.build_request(attempt, &reference_id);

        tracing::info!(
            reference_id = %reference_id,
            pan = %body.activation_request.pan,
            "calling card activation service"
        );

        let response = match self
            .http
            .post(&self.config.endpoint_url)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, "activation transport failure: {}", e);
                return ActivationOutcome {
                    success: false,
                    message: e.to_string(),
                    response_code: None,
                    details: Some(serde_json::json!({ "error": e.to_string() })),
                };
            }
        };

        let payload: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, "activation response unreadable: {}", e);
                return ActivationOutcome {
                    success: false,
                    message: e.to_string(),
                    response_code: None,
                    details: Some(serde_json::json!({ "error": e.to_string() })),
                };
            }
        };

        let outcome = interpret_response(payload);
        tracing::info!(
            reference_id = %reference_id,
            success = outcome.success,
            response_code = outcome.response_code.as_deref().unwrap_or("-"),
            "activation service responded"
        );
        outcome
    }

    fn build_request(
        &self,
        attempt: &ActivationAttempt,
        reference_id: &str,
    ) -> ActivationRequestBody {
        let (date, time, transmission) = transaction_datetime();

        ActivationRequestBody {
            service_header: ServiceHeader {
                channel: self.config.channel.clone(),
                processing_type: "SYNCHRONOUS",
                auth_info: AuthInfo {
                    username: self.config.username.clone(),
                    password: self.config.password.clone(),
                    authentication_type: "password",
                    auth_key: self.config.auth_key.clone(),
                },
                from_region_info: RegionInfo {
                    bic_code: self.config.bic_code.clone(),
                    country_code: self.config.country_code.clone(),
                },
            },
            transaction_info: TransactionInfo {
                transaction_type: "DEBIT_CARD",
                transaction_sub_type: "ACTIVATION",
                reference_id: reference_id.to_string(),
                transaction_date: date,
                transaction_time: time,
                transmission_date_time: transmission,
                stan: generate_stan(),
            },
            activation_request: ActivationPayload {
                pan: masked_pan(&self.config.pan_prefix, &attempt.card_last4),
                expiry: expiry_yymm(&attempt.expiry_mmyy),
                is_mask_card: "Y",
                cnic: attempt.cnic.clone(),
            },
        }
    }
}

/// Maps the backend's response shape to an [`ActivationOutcome`], keeping
/// the raw payload for diagnostics.
fn interpret_response(payload: serde_json::Value) -> ActivationOutcome {
    let header = payload.get("responseHeader");
    let response_code = header
        .and_then(|h| h.get("responseCode"))
        .and_then(|c| c.as_str())
        .map(|c| c.to_string());

    if response_code.as_deref() == Some(SUCCESS_RESPONSE_CODE) {
        ActivationOutcome {
            success: true,
            message: "Card activated successfully".to_string(),
            response_code,
            details: Some(payload),
        }
    } else {
        let message = header
            .and_then(|h| h.get("responseDetails"))
            .and_then(|d| d.get(0))
            .and_then(|m| m.as_str())
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
            .to_string();
        ActivationOutcome {
            success: false,
            message,
            response_code,
            details: Some(payload),
        }
    }
}

/// Builds the masked PAN: the configured BIN, six mask characters, and the
/// last 4 digits. The full PAN is never known to this system.
fn masked_pan(prefix: &str, last4: &str) -> String {
    format!("{prefix}******{last4}")
}

/// Converts a caller-facing MMYY expiry to the backend's YYMM order.
/// Inputs that are not exactly 4 characters pass through unchanged; the
/// dispatcher has already validated the length by the time this runs.
fn expiry_yymm(mmyy: &str) -> String {
    let chars: Vec<char> = mmyy.chars().collect();
    match chars.as_slice() {
        [m1, m2, y1, y2] => format!("{y1}{y2}{m1}{m2}"),
        _ => mmyy.to_string(),
    }
}

/// A fresh reference identifier per request; the backend treats it as an
/// idempotency/audit key, so it must never repeat.
fn generate_reference_id() -> String {
    format!(
        "REF{}{}",
        Utc::now().timestamp_millis(),
        &Uuid::new_v4().simple().to_string()[..9]
    )
}

/// A 6-digit system trace audit number.
fn generate_stan() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// The current moment in the three formats the backend requires:
/// `YYYY-MM-DD`, `HH:MM:SS`, and the combined transmission timestamp.
fn transaction_datetime() -> (String, String, String) {
    let now = Utc::now();
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M:%S").to_string();
    let transmission = format!("{date}T{time}");
    (date, time, transmission)
}
