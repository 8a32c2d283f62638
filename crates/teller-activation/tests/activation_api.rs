//! Integration tests for the activation client against a mock backend.

use teller_activation::{ActivationAttempt, ActivationClient, ActivationConfig};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn attempt() -> ActivationAttempt {
    ActivationAttempt {
        card_last4: "1155".to_string(),
        expiry_mmyy: "0626".to_string(),
        cnic: None,
    }
}

fn client_for(server: &MockServer) -> ActivationClient {
    ActivationClient::new(ActivationConfig {
        endpoint_url: format!("{}/activation", server.uri()),
        username: "voicebot".to_string(),
        bic_code: "TESTBIC".to_string(),
        country_code: "TESTLAND".to_string(),
        ..ActivationConfig::default()
    })
}

#[tokio::test]
async fn backend_success_code_maps_to_success_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activation"))
        .and(body_partial_json(serde_json::json!({
            "activationRequest": {
                "pan": "540375******1155",
                "expiry": "2606",
                "isMaskCard": "Y"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseHeader": { "responseCode": "00" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).activate(&attempt()).await;
    assert!(outcome.success);
    assert_eq!(outcome.response_code.as_deref(), Some("00"));
    assert_eq!(outcome.message, "Card activated successfully");
}

#[tokio::test]
async fn backend_rejection_maps_to_failure_with_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseHeader": {
                "responseCode": "14",
                "responseDetails": ["Invalid card number"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).activate(&attempt()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Invalid card number");
    assert_eq!(outcome.response_code.as_deref(), Some("14"));
}

#[tokio::test]
async fn transport_failure_maps_to_failure_outcome() {
    // Point at a server that is no longer listening.
    let server = MockServer::start().await;
    let client = client_for(&server);
    drop(server);

    let outcome = client.activate(&attempt()).await;
    assert!(!outcome.success);
    assert!(outcome.response_code.is_none());
    assert!(outcome.details.is_some());
}

#[tokio::test]
async fn consecutive_requests_carry_distinct_audit_stamps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseHeader": { "responseCode": "00" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.activate(&attempt()).await;
    client.activate(&attempt()).await;

    let requests = server
        .received_requests()
        .await
        .expect("request recording should be enabled");
    assert_eq!(requests.len(), 2);

    let stamp = |body: &[u8]| -> (String, String) {
        let v: serde_json::Value = serde_json::from_slice(body).expect("body should be JSON");
        (
            v["transactionInfo"]["referenceId"]
                .as_str()
                .expect("referenceId should be present")
                .to_string(),
            v["transactionInfo"]["stan"]
                .as_str()
                .expect("stan should be present")
                .to_string(),
        )
    };

    let (ref_a, stan_a) = stamp(&requests[0].body);
    let (ref_b, stan_b) = stamp(&requests[1].body);
    assert_ne!(ref_a, ref_b, "reference ids are idempotency keys and must differ");
    // STANs are 6-digit random values; equality is possible but the format must hold.
    assert_eq!(stan_a.len(), 6);
    assert_eq!(stan_b.len(), 6);
}
