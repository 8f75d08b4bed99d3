//! HTTP surface (`spec.md` §6, external collaborator per §1): thin JSON
//! CRUD for the record catalog plus the acme-dns-compatible helper
//! endpoints, built with `axum` and `tower-http` the way the teacher's own
//! `web/mod.rs` assembles its router — a `with_state` application over a
//! layered `Router`, minus the OAuth2/OIDC/session/templating machinery
//! this system has no use for (`SPEC_FULL.md` §11).

pub mod acme_dns;
pub mod dns_records;

use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::reconcile::Reconciler;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across every handler: just the reconciler,
/// which already owns the catalog pool and the backend configuration
/// (`spec.md` §4.6/§4.7).
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "msg": "OK" }))
}

/// Assembles the full router: the index page, liveness probes, the
/// `/v1/dns-records` catalog CRUD, and the `/acme-dns/*` helper endpoints,
/// wrapped in request tracing and response compression (`SPEC_FULL.md`
/// §11, §12).
pub fn build(reconciler: Reconciler) -> Router {
    let state = AppState { reconciler };

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/healthz/liveness", get(healthz))
        .route(
            "/v1/dns-records",
            get(dns_records::index)
                .post(dns_records::upsert_batch)
                .put(dns_records::upsert_batch)
                .patch(dns_records::upsert_batch)
                .delete(dns_records::delete_batch),
        )
        .route("/v1/dns-records/refresh", post(dns_records::refresh))
        .route(
            "/v1/dns-records/{type}/{name}",
            get(dns_records::show)
                .post(dns_records::upsert_one)
                .put(dns_records::upsert_one)
                .patch(dns_records::upsert_one)
                .delete(dns_records::delete_one),
        )
        .route("/acme-dns/health", get(acme_dns::health))
        .route("/acme-dns/register", post(acme_dns::register))
        .route("/acme-dns/update", post(acme_dns::update))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
