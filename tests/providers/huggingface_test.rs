//! Hosted inference provider: wire format, loading detection, HTTP round trip.

use std::time::Duration;

use sift::providers::huggingface::{build_request, parse_response, HuggingFaceProvider};
use sift::providers::{http_client, CompletionRequest, LlmProvider, ProviderError};

use super::http_response_test::serve_once;

fn request() -> CompletionRequest {
    CompletionRequest {
        system: Some("Classify.".to_owned()),
        prompt: "Invoice #1".to_owned(),
        max_tokens: Some(256),
        temperature: Some(0.1),
    }
}

fn provider(base_url: String) -> HuggingFaceProvider {
    let client = http_client(Duration::from_secs(5)).expect("client should build");
    HuggingFaceProvider::new(base_url, "org/model".to_owned(), "hf_test".to_owned(), client)
}

#[test]
fn request_folds_system_prompt_into_inputs() {
    let body = build_request(&request());
    assert_eq!(body.inputs, "Classify.\n\nInvoice #1");
    assert_eq!(body.parameters.max_new_tokens, Some(256));
    assert!(!body.parameters.return_full_text);

    let json = serde_json::to_value(&body).expect("serializes");
    assert_eq!(json["parameters"]["return_full_text"], false);
}

#[test]
fn endpoint_joins_model_path() {
    let p = provider("https://inference.example/".to_owned());
    assert_eq!(p.endpoint(), "https://inference.example/models/org/model");
    assert!(!format!("{p:?}").contains("hf_test"));
}

#[test]
fn parses_array_and_object_payloads() {
    let array = parse_response(200, r#"[{"generated_text":"[]"}]"#, "m").expect("array");
    assert_eq!(array.text, "[]");
    assert_eq!(array.model, "m");

    let object = parse_response(200, r#"{"generated_text":"ok"}"#, "m").expect("object");
    assert_eq!(object.text, "ok");
}

#[test]
fn loading_payload_is_model_loading() {
    let body = r#"{"error":"Model org/model is currently loading","estimated_time":20.5}"#;
    match parse_response(503, body, "m") {
        Err(ProviderError::ModelLoading { estimated_secs }) => {
            assert_eq!(estimated_secs, Some(20.5));
        }
        other => panic!("expected ModelLoading, got {other:?}"),
    }
}

#[test]
fn other_errors_are_http_status() {
    match parse_response(401, r#"{"error":"Authorization header is invalid"}"#, "m") {
        Err(ProviderError::HttpStatus { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[test]
fn empty_array_is_parse_error() {
    assert!(matches!(
        parse_response(200, "[]", "m"),
        Err(ProviderError::Parse(_))
    ));
}

#[tokio::test]
async fn complete_round_trip() {
    let url = serve_once("200 OK", r#"[{"generated_text":"[{\"type\":\"task\"}]"}]"#).await;
    let response = provider(url).complete(request()).await;
    match response {
        Ok(r) => assert_eq!(r.text, r#"[{"type":"task"}]"#),
        Err(err) => panic!("completion should succeed: {err}"),
    }
}

#[tokio::test]
async fn complete_reports_loading_model() {
    let url = serve_once(
        "503 Service Unavailable",
        r#"{"error":"Model org/model is currently loading","estimated_time":12.0}"#,
    )
    .await;
    let response = provider(url).complete(request()).await;
    assert!(matches!(response, Err(ProviderError::ModelLoading { .. })));
}
