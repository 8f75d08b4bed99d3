//! TLS certificate acquisition helper (`spec.md` §1, external collaborator;
//! `SPEC_FULL.md` §11a). Grounded in `original_source/shimiko/server/tls.go`:
//! a persistent ECDSA private key is read from disk or generated once, and
//! the certificate itself is either obtained via ACME DNS-01 (publishing the
//! challenge through [`crate::reconcile::Reconciler::publish_txt_record`])
//! or, with no ACME directory configured, self-signed. Either way an
//! existing certificate on disk is reused unless it is within 40 days of
//! expiring or no longer covers the configured domains — the Go original's
//! reuse check.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use instant_acme::{
    Account, AuthorizationStatus, ChallengeType, Identifier, NewAccount, NewOrder, OrderStatus,
};
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, KeyPair, SanType};
use time::{Duration as AsnDuration, OffsetDateTime};
use tracing::{debug, info, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::config::ConfigFile;
use crate::error::ShimikoError;
use crate::reconcile::Reconciler;

/// `tls.go`'s reuse threshold: regenerate once fewer than this many days of
/// validity remain.
const REUSE_THRESHOLD_DAYS: i64 = 40;
const SELF_SIGNED_VALIDITY_DAYS: i64 = 3650;
const CHALLENGE_POLL_INTERVAL: StdDuration = StdDuration::from_secs(3);

/// A certificate/key pair ready to hand to `axum_server::tls_rustls::RustlsConfig`.
pub struct CertificateBundle {
    pub cert_pem: String,
    pub key_pem: String,
}

fn key_path(config: &ConfigFile) -> PathBuf {
    Path::new(&config.certs_path).join("shimiko.key")
}

fn cert_path(config: &ConfigFile) -> PathBuf {
    Path::new(&config.certs_path).join("shimiko.crt")
}

/// A sidecar file recording exactly which domains the on-disk certificate
/// covers, read back alongside the PEM to answer "does this still match the
/// configured SAN list" without re-deriving it from the X.509 extension
/// (`DESIGN.md` documents this simplification of `tls.go`'s SAN walk).
fn domains_path(config: &ConfigFile) -> PathBuf {
    Path::new(&config.certs_path).join("shimiko.domains")
}

/// `tls.go`'s `GetOrGeneratePrivateKey`: read the persistent ECDSA P256 key
/// from disk, or generate and persist a new one.
fn get_or_generate_private_key(config: &ConfigFile) -> Result<KeyPair, ShimikoError> {
    let path = key_path(config);
    if let Ok(pem) = std::fs::read_to_string(&path) {
        debug!(path = %path.display(), "reusing existing private key");
        return KeyPair::from_pem(&pem).map_err(|e| ShimikoError::Tls(e.to_string()));
    }

    info!(path = %path.display(), "generating a new private key");
    let key_pair =
        KeyPair::generate(&rcgen::PKCS_ECDSA_P256_SHA256).map_err(|e| ShimikoError::Tls(e.to_string()))?;
    std::fs::write(&path, key_pair.serialize_pem())?;
    Ok(key_pair)
}

/// Checks whether the certificate on disk is still usable: present,
/// covering exactly `domains`, and with more than `REUSE_THRESHOLD_DAYS` of
/// validity left.
fn existing_certificate_is_reusable(config: &ConfigFile, domains: &[String]) -> bool {
    let Ok(recorded) = std::fs::read_to_string(domains_path(config)) else {
        return false;
    };
    let recorded: Vec<&str> = recorded.lines().collect();
    if recorded != domains {
        return false;
    }

    let Ok(cert_pem) = std::fs::read_to_string(cert_path(config)) else {
        return false;
    };
    let Ok(parsed) = pem::parse(cert_pem.as_bytes()) else {
        return false;
    };
    let Ok((_, cert)) = X509Certificate::from_der(parsed.contents()) else {
        return false;
    };

    let not_after = cert.validity().not_after.timestamp();
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let days_left = (not_after - now) / (24 * 60 * 60);
    days_left > REUSE_THRESHOLD_DAYS
}

fn persist(config: &ConfigFile, domains: &[String], bundle: &CertificateBundle) -> Result<(), ShimikoError> {
    std::fs::write(cert_path(config), &bundle.cert_pem)?;
    std::fs::write(domains_path(config), domains.join("\n"))?;
    Ok(())
}

fn san_entries(domains: &[String]) -> Vec<SanType> {
    domains
        .iter()
        .map(|d| match d.parse::<std::net::IpAddr>() {
            Ok(ip) => SanType::IpAddress(ip),
            Err(_) => SanType::DnsName(d.clone()),
        })
        .collect()
}

/// Self-signed fallback (`tls.go`'s `GetOrGenerateSelfSignedCert`): a
/// 3650-day certificate over the configured domains, signed by the
/// persistent key.
fn generate_self_signed(config: &ConfigFile, domains: &[String], key_pair: KeyPair) -> Result<CertificateBundle, ShimikoError> {
    let mut params = CertificateParams::new(Vec::<String>::new());
    params.not_before = OffsetDateTime::now_utc();
    params.not_after = OffsetDateTime::now_utc() + AsnDuration::days(SELF_SIGNED_VALIDITY_DAYS);
    params.subject_alt_names = san_entries(domains);

    let mut dn = DistinguishedName::new();
    if let Some(primary) = domains.first() {
        dn.push(DnType::CommonName, primary.clone());
    }
    params.distinguished_name = dn;
    params.key_pair = Some(key_pair);

    let cert = Certificate::from_params(params).map_err(|e| ShimikoError::Tls(e.to_string()))?;
    let cert_pem = cert.serialize_pem().map_err(|e| ShimikoError::Tls(e.to_string()))?;
    let key_pem = cert.serialize_private_key_pem();

    Ok(CertificateBundle { cert_pem, key_pem })
}

/// ACME DNS-01 issuance (`tls.go`'s `GetOrGenerateACMECert`): publishes the
/// challenge TXT record through the reconciler's ordinary session pipeline
/// rather than a bespoke DNS client, per `SPEC_FULL.md` §11a.
async fn generate_acme_cert(
    config: &ConfigFile,
    domains: &[String],
    key_pair: KeyPair,
    reconciler: &Reconciler,
) -> Result<CertificateBundle, ShimikoError> {
    let acme_url = config
        .acme_url
        .clone()
        .ok_or_else(|| ShimikoError::Config("SHIMIKO_ACME_URL is required when SHIMIKO_ACME_EMAIL is set".to_string()))?;
    let email = config.acme_email.clone().expect("checked by caller");

    let (account, _credentials) = Account::create(
        &NewAccount {
            contact: &[&format!("mailto:{email}")],
            terms_of_service_agreed: true,
            only_return_existing: false,
        },
        &acme_url,
        None,
    )
    .await
    .map_err(|e| ShimikoError::Tls(format!("acme account creation failed: {e}")))?;

    let identifiers: Vec<Identifier> = domains.iter().map(|d| Identifier::Dns(d.clone())).collect();
    let mut order = account
        .new_order(&NewOrder { identifiers: &identifiers })
        .await
        .map_err(|e| ShimikoError::Tls(format!("acme new order failed: {e}")))?;

    let authorizations = order
        .authorizations()
        .await
        .map_err(|e| ShimikoError::Tls(format!("acme authorizations failed: {e}")))?;

    for authz in &authorizations {
        if authz.status == AuthorizationStatus::Valid {
            continue;
        }
        let Identifier::Dns(domain) = &authz.identifier;
        let challenge = authz
            .challenges
            .iter()
            .find(|c| c.r#type == ChallengeType::Dns01)
            .ok_or_else(|| ShimikoError::Tls(format!("no dns-01 challenge offered for {domain}")))?;

        let digest = order.key_authorization(challenge).dns_value();
        let name = normalize_acme_name(domain, &config.zone_name);
        reconciler.publish_txt_record(&name, format!("\"{digest}\"")).await?;

        order
            .set_challenge_ready(&challenge.url)
            .await
            .map_err(|e| ShimikoError::Tls(format!("acme set_challenge_ready failed: {e}")))?;
    }

    loop {
        let state = order
            .refresh()
            .await
            .map_err(|e| ShimikoError::Tls(format!("acme order refresh failed: {e}")))?;
        match state.status {
            OrderStatus::Pending | OrderStatus::Processing => {
                tokio::time::sleep(CHALLENGE_POLL_INTERVAL).await;
            }
            OrderStatus::Ready | OrderStatus::Valid => break,
            OrderStatus::Invalid => {
                return Err(ShimikoError::Tls("acme order became invalid".to_string()));
            }
        }
    }

    let mut params = CertificateParams::new(domains.to_vec());
    params.distinguished_name = DistinguishedName::new();
    params.key_pair = Some(key_pair);
    let csr_cert = Certificate::from_params(params).map_err(|e| ShimikoError::Tls(e.to_string()))?;
    let csr_der = csr_cert
        .serialize_request_der()
        .map_err(|e| ShimikoError::Tls(e.to_string()))?;

    order
        .finalize(&csr_der)
        .await
        .map_err(|e| ShimikoError::Tls(format!("acme finalize failed: {e}")))?;

    let cert_chain_pem = loop {
        match order
            .certificate()
            .await
            .map_err(|e| ShimikoError::Tls(format!("acme certificate fetch failed: {e}")))?
        {
            Some(chain) => break chain,
            None => tokio::time::sleep(CHALLENGE_POLL_INTERVAL).await,
        }
    };

    Ok(CertificateBundle {
        cert_pem: cert_chain_pem,
        key_pem: csr_cert.serialize_private_key_pem(),
    })
}

fn normalize_acme_name(domain: &str, zone_name: &str) -> String {
    let suffix = format!(".{zone_name}");
    let relative = domain.strip_suffix(&suffix).unwrap_or(domain);
    format!("_acme-challenge.{relative}")
}

/// Returns a ready-to-serve certificate bundle, generating or renewing it as
/// needed. Called once at `server` startup and again on each reconcile tick
/// so certificate freshness rides the existing reconcile-interval loop
/// rather than a dedicated renewal scheduler (`SPEC_FULL.md` §11a).
pub async fn ensure_certificate(config: &ConfigFile, reconciler: &Reconciler) -> Result<CertificateBundle, ShimikoError> {
    let domains = config.cert_domains.clone();
    if domains.is_empty() {
        return Err(ShimikoError::Config(
            "SHIMIKO_CERT_DOMAINS must name at least one domain when HTTPS is enabled".to_string(),
        ));
    }

    if existing_certificate_is_reusable(config, &domains) {
        let cert_pem = std::fs::read_to_string(cert_path(config))?;
        let key_pem = std::fs::read_to_string(key_path(config))?;
        debug!("reusing existing certificate");
        return Ok(CertificateBundle { cert_pem, key_pem });
    }

    let bundle = if config.acme_email.is_some() {
        match generate_acme_cert(config, &domains, get_or_generate_private_key(config)?, reconciler).await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "acme issuance failed, falling back to self-signed");
                generate_self_signed(config, &domains, get_or_generate_private_key(config)?)?
            }
        }
    } else {
        generate_self_signed(config, &domains, get_or_generate_private_key(config)?)?
    };

    persist(config, &domains, &bundle)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acme_name_normalization_strips_zone_and_adds_prefix() {
        assert_eq!(
            normalize_acme_name("www.example.com", "example.com"),
            "_acme-challenge.www"
        );
    }

    #[test]
    fn reuse_check_fails_closed_with_no_certificate_on_disk() {
        let config = ConfigFile {
            certs_path: "/nonexistent/shimiko-tls-test".to_string(),
            cert_domains: vec!["example.com".to_string()],
            ..ConfigFile::default()
        };
        assert!(!existing_certificate_is_reusable(&config, &config.cert_domains));
    }
}
