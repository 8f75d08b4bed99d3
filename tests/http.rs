//! HTTP surface integration tests (`spec.md` §6), built directly against
//! the `axum::Router` with `tower::ServiceExt::oneshot` — no network port
//! bound, an in-memory `sqlx::SqlitePool` standing in for the catalog
//! database (`SPEC_FULL.md` §12 "Test tooling").
//!
//! These exercise only the paths that don't require a live file-backend
//! SSH host or cloud API credential: the liveness probes, the read-only
//! catalog endpoints, and the validation-rejection path (which runs before
//! a persistence session is ever opened).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use shimiko::config::ConfigFile;
use shimiko::db;
use shimiko::reconcile::Reconciler;
use shimiko::web;

/// A throwaway on-disk catalog (`db::connect` already creates the schema),
/// matching the teacher's own pattern of backing tests with a real
/// `tempfile`-provided path rather than a bare in-process mock.
async fn memory_pool() -> SqlitePool {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    let pool = db::connect(path.to_str().unwrap()).await.unwrap();
    // Leak the path so the backing file outlives the pool for the test's
    // duration; the OS reclaims it when the process exits.
    std::mem::forget(path);
    pool
}

fn test_config() -> ConfigFile {
    ConfigFile {
        zone_name: "example.com".to_string(),
        ..ConfigFile::default()
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"msg": "OK"}));
}

#[tokio::test]
async fn healthz_liveness_alias_reports_ok() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(Request::get("/healthz/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_serves_the_static_page() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_an_empty_catalog_returns_an_empty_array() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(Request::get("/v1/dns-records").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"records": []}));
}

#[tokio::test]
async fn showing_a_record_that_does_not_exist_is_a_404() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(
            Request::get("/v1/dns-records/A/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// `spec.md` §8 end-to-end scenario 2: a name ending with the zone is
/// rejected with 400 before any persistence session is opened, so this
/// needs no file-backend or cloud-API credentials configured.
#[tokio::test]
async fn upserting_a_name_ending_with_the_zone_is_rejected_with_400() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let body = json!({
        "record": {
            "name": "foo.example.com",
            "type": "A",
            "ttl": 300,
            "records": ["10.0.0.1"],
        }
    });

    let response = router
        .oneshot(
            Request::post("/v1/dns-records/A/foo.example.com")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "ERROR");
    let messages = parsed["validation"].as_array().unwrap();
    assert!(messages
        .iter()
        .any(|m| m == "The name 'foo.example.com' should not end with the zone name."));
}

#[tokio::test]
async fn upserting_an_unsupported_type_is_rejected_with_400() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let body = json!({
        "record": {
            "name": "foo",
            "type": "ZZZ",
            "ttl": 300,
            "records": ["10.0.0.1"],
        }
    });

    let response = router
        .oneshot(
            Request::post("/v1/dns-records/ZZZ/foo")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn path_type_mismatch_is_rejected_before_validation() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let body = json!({
        "record": {
            "name": "foo",
            "type": "A",
            "ttl": 300,
            "records": ["10.0.0.1"],
        }
    });

    let response = router
        .oneshot(
            Request::post("/v1/dns-records/AAAA/foo")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn acme_dns_health_is_always_ok() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(Request::get("/acme-dns/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn acme_dns_register_returns_the_fixed_empty_credential_tuple() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let response = router
        .oneshot(
            Request::post("/acme-dns/register")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["username"], "");
    assert_eq!(parsed["password"], "");
    assert_eq!(parsed["fulldomain"], "");
    assert_eq!(parsed["subdomain"], "");
}

/// `spec.md` §6: `/acme-dns/update` must validate the constructed TXT
/// record before upserting it, same as the `/v1/dns-records` CRUD path.
/// An uppercase subdomain produces a name that fails the RFC 1123 hostname
/// check, and must be rejected before any session (and thus any
/// file-backend/cloud-API I/O) is ever opened.
#[tokio::test]
async fn acme_dns_update_rejects_a_name_that_fails_validation() {
    let router = web::build(Reconciler::new(memory_pool().await, test_config()));

    let body = json!({"subdomain": "WWW", "txt": "abc123"});

    let response = router
        .oneshot(
            Request::post("/acme-dns/update")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = body_json(response).await;
    assert!(parsed["validation"].as_array().unwrap().iter().any(|m| {
        m.as_str().unwrap().contains("not a valid RFC 1123 hostname")
    }));
}
