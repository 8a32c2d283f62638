//! The tool catalog declared to the agent.
//!
//! Only one tool exists: verbal debit-card activation. Keypad-based
//! verification tools are deliberately absent; the line runs fully verbal.

/// Name of the card activation tool.
pub const ACTIVATE_DEBIT_CARD: &str = "activate_debit_card";

/// Returns the function definitions declared in the session configuration.
pub fn tool_catalog() -> Vec<serde_json::Value> {
    vec![serde_json::json!({
        "type": "function",
        "name": ACTIVATE_DEBIT_CARD,
        "description": "Activate the customer's debit card. Call this AFTER the customer has verbally provided and you have verified: (1) their card's last 4 digits, and (2) the expiry date.",
        "parameters": {
            "type": "object",
            "properties": {
                "card_last4": {
                    "type": "string",
                    "description": "The last 4 digits of the customer's card (e.g. '1155')"
                },
                "expiry_mmyy": {
                    "type": "string",
                    "description": "The card expiry date in MMYY format (e.g. '0626' for June 2026)"
                },
                "cnic": {
                    "type": "string",
                    "description": "Optional: customer's national identity number for additional verification"
                }
            },
            "required": ["card_last4", "expiry_mmyy"]
        }
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_contains_only_the_activation_tool() {
        let catalog = tool_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0]["name"], ACTIVATE_DEBIT_CARD);
        assert_eq!(
            catalog[0]["parameters"]["required"],
            serde_json::json!(["card_last4", "expiry_mmyy"])
        );
    }
}
