mod common;

use std::time::{Duration, Instant};

use crm_admin_client::config::RetryPolicy;
use crm_admin_client::error::Error;
use crm_admin_client::fetch::ApiClient;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{options, UNREACHABLE};

fn initializing() -> ResponseTemplate {
    ResponseTemplate::new(503).set_body_json(json!({
        "success": false,
        "initializing": true,
        "error": "Database is initializing"
    }))
}

#[tokio::test]
async fn retries_while_database_initializes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(initializing())
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "users": []})))
        .mount(&server)
        .await;

    let policy = RetryPolicy::exponential(Duration::from_millis(50), 3);
    let client = ApiClient::new(&options(&server.uri()).with_retry(policy.clone())).unwrap();

    let started = Instant::now();
    let users: Vec<Value> = client.get("/users").execute_field("users").await.unwrap();
    let elapsed = started.elapsed();

    assert!(users.is_empty());
    assert!(elapsed >= policy.total_delay(), "waited only {:?}", elapsed);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn gives_up_after_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(initializing())
        .expect(4)
        .mount(&server)
        .await;

    let client = ApiClient::new(&options(&server.uri())).unwrap();
    let err = client.get("/health").execute_value().await.unwrap_err();

    assert!(matches!(err, Error::Status { status: 503, .. }));
}

#[tokio::test]
async fn other_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/promotions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/promotions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&options(&server.uri())).unwrap();

    let err = client.get("/promotions").execute_value().await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, ref body } if body == "maintenance window"));

    let err = client.post("/promotions").execute_value().await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 500, ref body } if body == "boom"));
}

#[tokio::test]
async fn sends_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/claim-number"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&options(&server.uri())).unwrap();
    client
        .post("/claim-number")
        .json(&json!({"phoneNumber": "555-0100"}))
        .unwrap()
        .execute_value()
        .await
        .unwrap();
}

#[tokio::test]
async fn success_false_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "Username already exists"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&options(&server.uri())).unwrap();
    let err = client.post("/users").execute_value().await.unwrap_err();
    assert!(matches!(err, Error::Rejected(ref m) if m == "Username already exists"));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client =
        ApiClient::new(&options(&server.uri()).with_request_timeout(Duration::from_millis(200))).unwrap();
    let err = client.get("/users").execute_value().await.unwrap_err();

    assert!(matches!(err, Error::Timeout { ref path } if path == "/users"));
    assert!(err.to_string().starts_with("Server not responding"));
}

#[tokio::test]
async fn long_running_calls_get_the_extended_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok"}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(
        &options(&server.uri())
            .with_request_timeout(Duration::from_millis(100))
            .with_long_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    assert!(matches!(client.get("/health").execute_value().await, Err(Error::Timeout { .. })));
    let body = client.get("/health").long_running().execute_value().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unreachable_backend_is_reported_with_instructions() {
    let client = ApiClient::new(&options(UNREACHABLE)).unwrap();
    let err = client.get("/users").execute_value().await.unwrap_err();

    assert!(matches!(err, Error::BackendUnavailable { .. }));
    assert!(err.is_transient());
    assert!(err.to_string().contains("Backend not running"));
}
