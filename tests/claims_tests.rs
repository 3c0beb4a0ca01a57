mod common;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use crm_admin_client::claims::{Identity, NumberClaims};
use crm_admin_client::error::Error;
use crm_admin_client::models::ClaimType;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{harness, harness_with, options, start_time, Harness, UNREACHABLE};

fn me() -> Identity {
    Identity::new("agent-1", Some("Alex"))
}

fn claims_body(expires_in_secs: i64) -> serde_json::Value {
    let now = start_time();
    json!({
        "success": true,
        "claims": [
            {
                "phoneNumber": "555-0100",
                "claimedBy": "agent-1",
                "claimedByName": "Alex",
                "claimedAt": now.to_rfc3339(),
                "expiresAt": (now + ChronoDuration::seconds(expires_in_secs)).to_rfc3339()
            },
            {
                "phoneNumber": "555-0200",
                "claimedBy": "agent-2",
                "claimedByName": "Blair",
                "claimType": "customer",
                "claimedAt": now.to_rfc3339(),
                "expiresAt": (now + ChronoDuration::seconds(expires_in_secs)).to_rfc3339()
            }
        ]
    })
}

async fn with_snapshot(server: &MockServer, expires_in_secs: i64) -> (Harness, NumberClaims) {
    Mock::given(method("GET"))
        .and(path("/number-claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claims_body(expires_in_secs)))
        .mount(server)
        .await;

    let h = harness(&server.uri());
    let claims = NumberClaims::new(h.service.clone(), me());
    assert!(claims.refresh().await);
    (h, claims)
}

#[tokio::test]
async fn claim_expires_exactly_at_expiry() {
    let server = MockServer::start().await;
    let (h, claims) = with_snapshot(&server, 120).await;

    assert!(claims.is_number_claimed("555-0100"));
    assert!(claims.is_claimed_by_me("555-0100"));
    assert!(claims.is_number_claimed("555-0200"));
    assert!(!claims.is_claimed_by_me("555-0200"));
    assert!(!claims.is_number_claimed("555-0300"));

    h.clock.advance(ChronoDuration::seconds(119));
    assert!(claims.is_number_claimed("555-0100"));

    h.clock.advance(ChronoDuration::seconds(1));
    assert!(!claims.is_number_claimed("555-0100"));
    assert!(!claims.is_claimed_by_me("555-0100"));
    assert!(claims.active_claims().is_empty());
}

#[tokio::test]
async fn failed_refresh_keeps_last_snapshot() {
    let server = MockServer::start().await;
    let (_h, claims) = with_snapshot(&server, 300).await;

    server.reset().await;
    assert!(!claims.refresh().await);
    assert_eq!(claims.active_claims().len(), 2);
}

#[tokio::test]
async fn claim_conflict_names_the_holder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/claim-number"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "error": "Number already claimed",
            "claimedBy": "agent-2",
            "claimedByName": "Blair"
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let claims = NumberClaims::new(h.service.clone(), me());
    let err = claims
        .claim_number("555-0200", Some("cust-9"), Some(ClaimType::Customer))
        .await
        .unwrap_err();

    match err {
        Error::AlreadyClaimed { phone, claimed_by } => {
            assert_eq!(phone, "555-0200");
            assert_eq!(claimed_by, "Blair");
        }
        other => panic!("expected AlreadyClaimed, got {other:?}"),
    }
    assert!(!claims.is_number_claimed("555-0200"));
}

#[tokio::test]
async fn successful_claim_is_visible_immediately() {
    let server = MockServer::start().await;
    let now = start_time();
    Mock::given(method("POST"))
        .and(path("/claim-number"))
        .and(body_partial_json(json!({"phoneNumber": "555-0400", "claimedBy": "agent-1", "claimType": "client"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "claim": {
                "phoneNumber": "555-0400",
                "claimedBy": "agent-1",
                "claimedAt": now.to_rfc3339(),
                "expiresAt": (now + ChronoDuration::minutes(5)).to_rfc3339()
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let claims = NumberClaims::new(h.service.clone(), me());
    let claim = claims
        .claim_number("555-0400", Some("c-4"), Some(ClaimType::Client))
        .await
        .unwrap();

    assert_eq!(claim.claimed_by, "agent-1");
    assert!(claims.is_claimed_by_me("555-0400"));
}

#[tokio::test]
async fn claiming_offline_fails_without_fallback() {
    let h = harness(UNREACHABLE);
    let claims = NumberClaims::new(h.service.clone(), me());

    let err = claims.claim_number("555-0500", None, None).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable { .. }));
    assert!(!claims.is_number_claimed("555-0500"));
}

#[tokio::test]
async fn release_is_silent_and_drops_own_claim() {
    let server = MockServer::start().await;
    let (_h, claims) = with_snapshot(&server, 300).await;
    Mock::given(method("POST"))
        .and(path("/release-number"))
        .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
        .mount(&server)
        .await;

    claims.release_number("555-0100").await;
    claims.release_number("555-0200").await;

    assert!(!claims.is_number_claimed("555-0100"));
    assert!(claims.is_number_claimed("555-0200"));
}

#[tokio::test]
async fn extend_pushes_expiry_out() {
    let server = MockServer::start().await;
    let (h, claims) = with_snapshot(&server, 60).await;
    let now = start_time();
    Mock::given(method("POST"))
        .and(path("/extend-number-claim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "claim": {
                "phoneNumber": "555-0100",
                "claimedBy": "agent-1",
                "claimedAt": now.to_rfc3339(),
                "expiresAt": (now + ChronoDuration::minutes(10)).to_rfc3339()
            }
        })))
        .mount(&server)
        .await;

    claims.extend_claim("555-0100").await.unwrap();
    h.clock.advance(ChronoDuration::minutes(5));
    assert!(claims.is_claimed_by_me("555-0100"));
    assert!(!claims.is_number_claimed("555-0200"));
}

#[tokio::test]
async fn background_refresh_picks_up_claims() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/number-claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claims_body(300)))
        .mount(&server)
        .await;

    let h = harness_with(options(&server.uri()).with_claim_refresh_interval(Duration::from_millis(50)));
    let claims = NumberClaims::new(h.service.clone(), me());
    let handle = claims.spawn_refresh();

    let mut seen = false;
    for _ in 0..40 {
        if claims.is_number_claimed("555-0200") {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    drop(handle);
    assert!(seen);
}

#[tokio::test]
async fn refresh_waits_for_the_configured_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/number-claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claims_body(300)))
        .mount(&server)
        .await;

    let h = harness_with(options(&server.uri()).with_claim_refresh_interval(Duration::from_secs(3600)));
    let claims = NumberClaims::new(h.service.clone(), me());
    let handle = claims.spawn_refresh();

    // the first tick is immediate, the next one is an hour away
    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(handle);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn extend_refusal_is_passed_through() {
    let server = MockServer::start().await;
    let (_h, claims) = with_snapshot(&server, 60).await;
    Mock::given(method("POST"))
        .and(path("/extend-number-claim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Number is not claimed by you"
        })))
        .mount(&server)
        .await;

    let err = claims.extend_claim("555-0100").await.unwrap_err();
    assert!(matches!(err, Error::Rejected(ref m) if m == "Number is not claimed by you"));
    assert!(claims.is_claimed_by_me("555-0100"));
}

#[tokio::test]
async fn conflict_never_names_the_caller() {
    let server = MockServer::start().await;
    let (_h, claims) = with_snapshot(&server, 300).await;
    Mock::given(method("POST"))
        .and(path("/claim-number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Number already claimed"
        })))
        .mount(&server)
        .await;

    let err = claims.claim_number("555-0100", None, None).await.unwrap_err();
    match err {
        Error::AlreadyClaimed { claimed_by, .. } => assert_eq!(claimed_by, "another agent"),
        other => panic!("expected AlreadyClaimed, got {other:?}"),
    }

    let err = claims.claim_number("555-0200", None, None).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyClaimed { ref claimed_by, .. } if claimed_by == "Blair"));
}

#[tokio::test]
async fn unrelated_rejections_are_not_conflicts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/claim-number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Number must be claimed from an assigned list"
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let claims = NumberClaims::new(h.service.clone(), me());
    let err = claims.claim_number("555-0600", None, None).await.unwrap_err();
    assert!(matches!(err, Error::Rejected(_)));
}
