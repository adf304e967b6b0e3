//! Verify resolution and response interpretation against the JSON decision
//! tables stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON, not raw strings, so field ordering
//! does not cause false negatives.

use std::time::Duration;

use onfleet_core::dispatch::interpret;
use onfleet_core::{ApiError, ApiResponse, CallDescriptor, HttpMethod, HttpResponse, Resolver};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(70_000);

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

/// Descriptors hold `'static` paths; vectors are loaded once per test run.
fn leak(s: &str) -> &'static str {
    s.to_string().leak()
}

fn descriptor(v: &serde_json::Value) -> CallDescriptor {
    let mut d = CallDescriptor::new(parse_method(v["method"].as_str().unwrap()), leak(v["path"].as_str().unwrap()));
    if let Some(alt) = v["alt_path"].as_str() {
        d = d.with_alt_path(leak(alt));
    }
    if v["query_params"].as_bool().unwrap_or(false) {
        d = d.with_query_params();
    }
    if v["delivery_manifest"].as_bool().unwrap_or(false) {
        d = d.with_delivery_manifest();
    }
    if let Some(ms) = v["timeout_ms"].as_u64() {
        d = d.with_timeout_ms(ms);
    }
    d
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_test_vectors() {
    let raw = include_str!("../../test-vectors/resolve.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    let resolver = Resolver {
        base_url,
        headers: &[],
        default_timeout: DEFAULT_TIMEOUT,
    };

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let d = descriptor(&case["descriptor"]);
        let args = case["args"].as_array().unwrap();
        let expected = &case["expected_request"];

        let req = resolver.resolve(&d, args).unwrap();
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{base_url}{}", expected["url"].as_str().unwrap()), "{name}: url");

        match req.body.as_deref() {
            Some(body) => {
                let body: serde_json::Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be present"),
        }

        let timeout = expected["timeout_ms"]
            .as_u64()
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        assert_eq!(req.timeout, timeout, "{name}: timeout");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let method = parse_method(case["method"].as_str().unwrap());
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = interpret(method, response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            let kind_matches = match expected_error.as_str().unwrap() {
                "RateLimit" => matches!(err, ApiError::RateLimit(_)),
                "Permission" => matches!(err, ApiError::Permission(_)),
                "Service" => matches!(err, ApiError::Service(_)),
                "Http" => matches!(err, ApiError::Http(_)),
                "Generic" => matches!(err, ApiError::Generic { .. }),
                other => panic!("{name}: unknown expected_error: {other}"),
            };
            assert!(kind_matches, "{name}: got {err:?}");
            assert_eq!(err.code(), case["expected_code"].as_i64(), "{name}: code");
        } else if let Some(status) = case.get("expected_status") {
            assert_eq!(
                result.unwrap(),
                ApiResponse::Status(status.as_u64().unwrap() as u16),
                "{name}: status"
            );
        } else {
            assert_eq!(result.unwrap(), ApiResponse::Json(case["expected_result"].clone()), "{name}: result");
        }
    }
}
