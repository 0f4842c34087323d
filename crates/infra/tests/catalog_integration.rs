//! Integration tests for the endpoint catalog loader
//!
//! Loads catalog files from disk and drives a call with the loaded settings.

use polycall_domain::{PolycallError, Protocol, Timeout};
use polycall_infra::config;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_load_catalog_from_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("polycall.toml");
    std::fs::write(
        &path,
        r#"
[connection]
insecure_skip_verify = true
ca_cert_path = "/etc/polycall/ca.pem"

[[endpoints]]
friendly_name = "users"
url = "https://api.example.com/users"
type = "rest"
timeout_ms = -1

[[endpoints]]
friendly_name = "profiles"
url = "profiles.internal:50051"
type = "grpc"
method_name = "/profiles.ProfileService/Get"
max_retries = 3
"#,
    )
    .expect("Failed to write catalog");

    let catalog = config::load(Some(&path)).expect("Catalog should load");

    assert!(catalog.connection.insecure_skip_verify);
    assert_eq!(
        catalog.connection.ca_cert_path.as_deref(),
        Some(std::path::Path::new("/etc/polycall/ca.pem"))
    );

    let users = catalog.get("users").expect("users endpoint");
    assert_eq!(users.timeout, Timeout::Unbounded);

    let profiles = catalog.get("profiles").expect("profiles endpoint");
    assert_eq!(profiles.protocol, Protocol::Grpc);
    assert_eq!(profiles.max_retries, 3);
    assert_eq!(profiles.method_name.as_deref(), Some("/profiles.ProfileService/Get"));
}

#[test]
fn test_load_catalog_rejects_blank_url() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("polycall.json");
    std::fs::write(
        &path,
        json!({ "endpoints": [{ "friendly_name": "broken", "url": "", "type": "soap" }] })
            .to_string(),
    )
    .expect("Failed to write catalog");

    let err = config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, PolycallError::Validation(_)), "unexpected error: {err:?}");
}

#[test]
fn test_load_catalog_with_unknown_protocol() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("polycall.json");
    std::fs::write(
        &path,
        r#"{ "endpoints": [{ "friendly_name": "x", "url": "http://x", "type": "graphql" }] }"#,
    )
    .expect("Failed to write catalog");

    let err = config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, PolycallError::Config(_)));
}

#[tokio::test]
async fn test_catalog_endpoint_can_be_called() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("polycall.json");
    let catalog_json = json!({
        "endpoints": [{ "friendly_name": "health", "url": server.uri(), "type": "rest" }]
    });
    std::fs::write(&path, catalog_json.to_string()).expect("Failed to write catalog");

    let catalog = config::load(Some(&path)).expect("Catalog should load");
    let endpoint = catalog.get("health").expect("health endpoint");

    let result = polycall_infra::call_endpoint(endpoint, None, Some(&catalog.connection))
        .await
        .expect("call should succeed");
    assert_eq!(result.body, json!({ "ok": true }));
}
