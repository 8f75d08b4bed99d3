//! The acme-dns-compatible helper endpoints (`spec.md` §6). No Go
//! precedent survives in the retrieved source tree — `/acme-dns/*` exists
//! only as prose in the specification — so these handlers follow the
//! acme-dns reference protocol's request/response shapes directly rather
//! than imitating a particular file.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ShimikoError;
use crate::web::AppState;

#[derive(Serialize)]
struct MsgResponse {
    msg: &'static str,
}

/// `GET /acme-dns/health`: always OK, no catalog access.
pub async fn health() -> Json<MsgResponse> {
    Json(MsgResponse { msg: "OK" })
}

#[derive(Serialize)]
struct RegisterResponse {
    username: &'static str,
    password: &'static str,
    fulldomain: &'static str,
    subdomain: &'static str,
    allowfrom: Vec<String>,
}

/// `POST /acme-dns/register`: acme-dns clients use this to provision a
/// dedicated credential/subdomain pair before ever calling `/update`. This
/// system has exactly one zone and no per-client credentials, so it returns
/// the fixed empty-string tuple `spec.md` §6 describes — a no-op that
/// satisfies clients expecting the registration round-trip to succeed.
pub async fn register() -> Json<RegisterResponse> {
    Json(RegisterResponse {
        username: "",
        password: "",
        fulldomain: "",
        subdomain: "",
        allowfrom: Vec::new(),
    })
}

#[derive(Deserialize)]
pub struct UpdateBody {
    subdomain: String,
    txt: String,
}

#[derive(Serialize)]
struct UpdateResponse {
    txt: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ValidationErrorResponse {
    error: &'static str,
    validation: Vec<String>,
}

const ACME_CHALLENGE_PREFIX: &str = "_acme-challenge.";

/// Normalizes an acme-dns `subdomain` into the catalog's relative owner
/// name: strip the managed zone's suffix (an acme-dns client commonly
/// submits the FQDN), then prefix `_acme-challenge.` if not already
/// present (`spec.md` §6).
fn normalize_subdomain(subdomain: &str, zone_name: &str) -> String {
    let suffix = format!(".{zone_name}");
    let stripped = subdomain
        .strip_suffix(&suffix)
        .or_else(|| subdomain.strip_suffix(zone_name))
        .unwrap_or(subdomain);

    if stripped.starts_with(ACME_CHALLENGE_PREFIX) {
        stripped.to_string()
    } else {
        format!("{ACME_CHALLENGE_PREFIX}{stripped}")
    }
}

/// `POST /acme-dns/update`: publishes the ACME DNS-01 challenge value as a
/// quoted `TXT` record through the ordinary session pipeline, using the
/// shallow-session optimisation (`spec.md` §9) when the record already
/// exists. The constructed record is validated before it's upserted
/// (`spec.md` §6 "construct a TXT record... validate it, and upsert"),
/// mirroring `dns_records.rs`'s 400-on-validation-failure pattern.
pub async fn update(State(state): State<AppState>, Json(body): Json<UpdateBody>) -> Response {
    let name = normalize_subdomain(&body.subdomain, &state.reconciler.config().zone_name);
    let value = format!("\"{}\"", body.txt);

    match state.reconciler.publish_txt_record(&name, value.clone()).await {
        Ok(()) => Json(UpdateResponse { txt: body.txt }).into_response(),
        Err(ShimikoError::Validation(messages)) => (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorResponse {
                error: "validation failed",
                validation: messages,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, subdomain = %body.subdomain, "error publishing acme-dns challenge");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_label_gets_the_challenge_prefix() {
        assert_eq!(normalize_subdomain("www", "example.com"), "_acme-challenge.www");
    }

    #[test]
    fn fqdn_has_the_zone_suffix_stripped_first() {
        assert_eq!(
            normalize_subdomain("www.example.com", "example.com"),
            "_acme-challenge.www"
        );
    }

    #[test]
    fn already_prefixed_subdomain_is_left_alone() {
        assert_eq!(
            normalize_subdomain("_acme-challenge.www", "example.com"),
            "_acme-challenge.www"
        );
    }

    #[test]
    fn apex_acme_challenge_normalizes_to_the_bare_prefix() {
        assert_eq!(normalize_subdomain("example.com", "example.com"), "_acme-challenge.");
    }
}
