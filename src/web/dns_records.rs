//! JSON CRUD for the record catalog (`spec.md` §6, grounded byte-for-byte
//! in the response shapes of `server/server_routes.go`'s
//! `indexDNSRecords`/`upsertDNSRecords`/`deleteDNSRecords`/`showDNSRecord`/
//! `upsertDNSRecord`/`deleteDNSRecord`). The handlers here are the thin
//! JSON-over-HTTP shell; all of the actual mutation logic lives in
//! [`crate::session::Session`] and the validation in [`crate::validation`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::catalog::DNSRecord;
use crate::db::records;
use crate::validation;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct RecordsBody {
    records: Vec<DNSRecord>,
}

#[derive(Deserialize)]
pub struct RecordBody {
    record: DNSRecord,
}

#[derive(Serialize)]
struct IndexResponse {
    records: Vec<DNSRecord>,
}

#[derive(Serialize)]
struct ShowResponse {
    record: DNSRecord,
}

#[derive(Serialize)]
struct MsgResponse {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ResultEntry {
    record: DNSRecord,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<Vec<String>>,
}

#[derive(Serialize, Default)]
struct BatchResponse {
    results: Vec<ResultEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn internal_error(msg: &str, error: impl std::fmt::Display) -> Response {
    error!(%error, msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MsgResponse {
            msg: msg.to_string(),
            error: Some(error.to_string()),
        }),
    )
        .into_response()
}

/// `GET /v1/dns-records`.
pub async fn index(State(state): State<AppState>) -> Response {
    match records::list_active(&state.reconciler.pool()).await {
        Ok(records) => Json(IndexResponse { records }).into_response(),
        Err(e) => internal_error("error retrieving DNSRecords", e),
    }
}

/// `POST`/`PUT`/`PATCH /v1/dns-records`: upsert a batch.
pub async fn upsert_batch(State(state): State<AppState>, Json(body): Json<RecordsBody>) -> Response {
    let zone_name = state.reconciler.config().zone_name.clone();
    let mut session = match state.reconciler.open_session().await {
        Ok(session) => session,
        Err(e) => return internal_error("failed to start persistence session", e),
    };

    let mut response = BatchResponse::default();
    let mut has_error = false;
    let mut fails_validation = false;

    for record in body.records {
        let messages = validation::validate(&record, &zone_name);
        if !messages.is_empty() {
            fails_validation = true;
            response.results.push(ResultEntry {
                record,
                status: "ERROR",
                error: None,
                validation: Some(messages),
            });
            continue;
        }

        match session.upsert(record.clone()).await {
            Ok(saved) => response.results.push(ResultEntry {
                record: saved,
                status: "OK",
                error: None,
                validation: None,
            }),
            Err(e) => {
                has_error = true;
                error!(error = %e, name = %record.name, rtype = %record.rtype, "error upserting DNSRecord");
                response.results.push(ResultEntry {
                    record,
                    status: "ERROR",
                    error: Some(e.to_string()),
                    validation: None,
                });
            }
        }
    }

    if let Err(e) = session.finish().await {
        error!(error = %e, "failed to finish persistence session");
        has_error = true;
        response.error = Some(e.to_string());
    }

    let status = if has_error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else if fails_validation {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

/// `DELETE /v1/dns-records`: delete a batch.
pub async fn delete_batch(State(state): State<AppState>, Json(body): Json<RecordsBody>) -> Response {
    let mut session = match state.reconciler.open_session().await {
        Ok(session) => session,
        Err(e) => return internal_error("failed to start persistence session", e),
    };

    let mut response = BatchResponse::default();
    let mut has_error = false;

    for record in body.records {
        match session.delete(&record.name, &record.rtype).await {
            Ok(()) => response.results.push(ResultEntry {
                record,
                status: "OK",
                error: None,
                validation: None,
            }),
            Err(e) => {
                has_error = true;
                error!(error = %e, name = %record.name, rtype = %record.rtype, "error deleting DNSRecord");
                response.results.push(ResultEntry {
                    record,
                    status: "ERROR",
                    error: Some(e.to_string()),
                    validation: None,
                });
            }
        }
    }

    if let Err(e) = session.finish().await {
        error!(error = %e, "failed to finish persistence session");
        has_error = true;
        response.error = Some(e.to_string());
    }

    let status = if has_error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

/// `POST /v1/dns-records/refresh`: trigger a full, synchronous reconcile.
pub async fn refresh(State(state): State<AppState>) -> Response {
    state.reconciler.reconcile_all().await;
    (
        StatusCode::OK,
        Json(MsgResponse {
            msg: "OK".to_string(),
            error: None,
        }),
    )
        .into_response()
}

/// `GET /v1/dns-records/{type}/{name}`.
pub async fn show(
    State(state): State<AppState>,
    Path((rtype, name)): Path<(String, String)>,
) -> Response {
    match records::get_by_name_type(&state.reconciler.pool(), &name, &rtype).await {
        Ok(Some(record)) => Json(ShowResponse { record }).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(MsgResponse {
                msg: "not found".to_string(),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => internal_error("error looking up DNS record", e),
    }
}

/// `POST`/`PUT`/`PATCH /v1/dns-records/{type}/{name}`: upsert one.
pub async fn upsert_one(
    State(state): State<AppState>,
    Path((rtype, name)): Path<(String, String)>,
    Json(body): Json<RecordBody>,
) -> Response {
    let record = body.record;
    if record.rtype != rtype {
        return (
            StatusCode::BAD_REQUEST,
            Json(ResultEntry {
                record,
                status: "ERROR",
                error: Some("record in body does not match the type specified in the URL path".to_string()),
                validation: None,
            }),
        )
            .into_response();
    }
    if record.name != name {
        return (
            StatusCode::BAD_REQUEST,
            Json(ResultEntry {
                record,
                status: "ERROR",
                error: Some("record in body does not match the name specified in the URL path".to_string()),
                validation: None,
            }),
        )
            .into_response();
    }

    let zone_name = state.reconciler.config().zone_name.clone();
    let messages = validation::validate(&record, &zone_name);
    if !messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ResultEntry {
                record,
                status: "ERROR",
                error: None,
                validation: Some(messages),
            }),
        )
            .into_response();
    }

    let mut session = match state.reconciler.open_session().await {
        Ok(session) => session,
        Err(e) => return internal_error("failed to start persistence session", e),
    };

    let saved = match session.upsert(record.clone()).await {
        Ok(saved) => saved,
        Err(e) => {
            error!(error = %e, name = %record.name, rtype = %record.rtype, "error upserting DNSRecord");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResultEntry {
                    record,
                    status: "ERROR",
                    error: Some(e.to_string()),
                    validation: None,
                }),
            )
                .into_response();
        }
    };

    if let Err(e) = session.finish().await {
        error!(error = %e, "failed to finish persistence session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ResultEntry {
                record: saved,
                status: "ERROR",
                error: Some(e.to_string()),
                validation: None,
            }),
        )
            .into_response();
    }

    Json(ResultEntry {
        record: saved,
        status: "OK",
        error: None,
        validation: None,
    })
    .into_response()
}

/// `DELETE /v1/dns-records/{type}/{name}`.
pub async fn delete_one(
    State(state): State<AppState>,
    Path((rtype, name)): Path<(String, String)>,
) -> Response {
    let mut session = match state.reconciler.open_session().await {
        Ok(session) => session,
        Err(e) => return internal_error("failed to start persistence session", e),
    };

    let record = DNSRecord {
        id: 0,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        deleted_at: None,
        name,
        rtype,
        ttl: 0,
        records: Vec::new(),
    };

    if let Err(e) = session.delete(&record.name, &record.rtype).await {
        error!(error = %e, name = %record.name, rtype = %record.rtype, "error deleting DNSRecord");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ResultEntry {
                record,
                status: "ERROR",
                error: Some(e.to_string()),
                validation: None,
            }),
        )
            .into_response();
    }

    if let Err(e) = session.finish().await {
        error!(error = %e, "failed to finish persistence session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ResultEntry {
                record,
                status: "ERROR",
                error: Some(e.to_string()),
                validation: None,
            }),
        )
            .into_response();
    }

    Json(ResultEntry {
        record,
        status: "OK",
        error: None,
        validation: None,
    })
    .into_response()
}
