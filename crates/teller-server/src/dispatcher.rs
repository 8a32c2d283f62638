//! Validates and executes agent-invoked function calls.
//!
//! Every invocation produces a [`ToolOutcome`] — validation failures,
//! unknown functions, and backend rejections are all reported back into the
//! conversation so the agent can speak the result; nothing here ever takes
//! the call down.

use serde::{Deserialize, Serialize};
use teller_activation::{ActivationAttempt, ActivationClient, ActivationOutcome};
use teller_agent::ACTIVATE_DEBIT_CARD;

/// Result of one tool invocation, serialized as the function-call output.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// Machine-readable failure tag; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Spoken back to the caller by the agent.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolOutcome {
    fn failure(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error),
            message: message.into(),
            response_code: None,
            details: None,
        }
    }
}

impl From<ActivationOutcome> for ToolOutcome {
    fn from(outcome: ActivationOutcome) -> Self {
        Self {
            success: outcome.success,
            error: (!outcome.success).then_some("activation_failed"),
            message: outcome.message,
            response_code: outcome.response_code,
            details: outcome.details,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActivationArgs {
    #[serde(default)]
    card_last4: String,
    #[serde(default)]
    expiry_mmyy: String,
    #[serde(default)]
    cnic: Option<String>,
}

/// Executes one tool invocation.
///
/// Field validation happens here, before any network traffic: a malformed
/// invocation never reaches the activation backend. Well-formed invocations
/// make exactly one backend request — there is no retry, since an
/// activation must not be silently re-attempted.
pub async fn dispatch(activation: &ActivationClient, name: &str, raw_arguments: &str) -> ToolOutcome {
    if name != ACTIVATE_DEBIT_CARD {
        tracing::warn!(%name, "unknown function requested");
        return ToolOutcome::failure(
            "unknown_function",
            format!("Unknown function: {name}. Only '{ACTIVATE_DEBIT_CARD}' is available."),
        );
    }

    let args: ActivationArgs = match serde_json::from_str(raw_arguments) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!("tool arguments did not parse: {}", e);
            return ToolOutcome::failure("invalid_arguments", "Tool arguments were not valid JSON.");
        }
    };

    if args.card_last4.chars().count() != 4 {
        return ToolOutcome::failure(
            "invalid_card_last4",
            "Card last 4 digits are required and must be exactly 4 digits.",
        );
    }
    if args.expiry_mmyy.chars().count() != 4 {
        return ToolOutcome::failure(
            "invalid_expiry",
            "Card expiry is required in MMYY format (e.g. '0626' for June 2026).",
        );
    }

    let attempt = ActivationAttempt {
        card_last4: args.card_last4,
        expiry_mmyy: args.expiry_mmyy,
        cnic: args.cnic.filter(|c| !c.is_empty()),
    };
    activation.activate(&attempt).await.into()
}
