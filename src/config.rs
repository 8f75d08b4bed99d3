//! Process configuration, read exclusively from the environment (`spec.md`
//! §6 "Environment variables"). Mirrors the teacher's `ConfigFile` shape and
//! its "parse into a typed struct with defaults" idiom, but drops the
//! teacher's JSON-file `config::File` source: the specification names
//! environment variables as the sole configuration surface.

use std::str::FromStr;

use config::Environment;
use gethostname::gethostname;
use serde::{Deserialize, Serialize};

use crate::error::ShimikoError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    /// SQLite file path; default `./shimiko.sqlite3`.
    pub database_path: String,
    /// Plain-HTTP port; default `8080`.
    pub http_port: u16,
    /// HTTPS port; `0` disables.
    pub https_port: u16,
    /// Directory for cert/key files; default `.`.
    pub certs_path: String,
    /// If set, use ACME; else self-signed.
    pub acme_email: Option<String>,
    /// ACME directory URL.
    pub acme_url: Option<String>,
    /// Comma-separated SAN list, parsed from `SHIMIKO_CERT_DOMAINS`.
    pub cert_domains: Vec<String>,
    /// Reconcile period in seconds; `0` disables.
    pub reconcile_interval: u64,
    /// The single zone this instance manages.
    pub zone_name: String,
    /// Fixed remote path for the zone file on each file-backend host.
    pub zone_file_path: String,
    /// File-backend hosts, in priority order (first is the load source).
    pub file_backend_hosts: Vec<String>,
    /// SSH username for file-backend hosts.
    pub vyos_username: Option<String>,
    /// SSH password for file-backend hosts.
    pub vyos_password: Option<String>,
    /// Cloud DNS API base URL.
    pub api_base_url: Option<String>,
    /// Cloud DNS API token.
    pub api_token: Option<String>,
    /// Cloud DNS API zone identifier.
    pub api_zone_id: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            database_path: "./shimiko.sqlite3".to_string(),
            http_port: 8080,
            https_port: 0,
            certs_path: ".".to_string(),
            acme_email: None,
            acme_url: None,
            cert_domains: vec![],
            reconcile_interval: 300,
            zone_name: gethostname().into_string().unwrap_or_default(),
            zone_file_path: "/etc/coredns/zone".to_string(),
            file_backend_hosts: vec![],
            vyos_username: None,
            vyos_password: None,
            api_base_url: None,
            api_token: None,
            api_zone_id: None,
        }
    }
}

impl ConfigFile {
    /// Loads configuration from `SHIMIKO_*` environment variables layered
    /// over the defaults above. Comma-separated list fields
    /// (`cert_domains`, `file_backend_hosts`) use `config`'s list-separator
    /// support. `VYOS_USERNAME`/`VYOS_PASSWORD` are the two SSH-transport
    /// credentials `spec.md` §6 names without the `SHIMIKO_` prefix, so they
    /// are applied as a direct, unprefixed override after the rest of the
    /// struct is deserialized rather than folded into the prefixed source.
    pub fn load() -> Result<Self, ShimikoError> {
        let defaults = ConfigFile::default();
        let builder = config::Config::builder()
            .set_default("database_path", defaults.database_path)?
            .set_default("http_port", defaults.http_port as i64)?
            .set_default("https_port", defaults.https_port as i64)?
            .set_default("certs_path", defaults.certs_path)?
            .set_default("cert_domains", Vec::<String>::new())?
            .set_default("reconcile_interval", defaults.reconcile_interval as i64)?
            .set_default("zone_name", defaults.zone_name)?
            .set_default("zone_file_path", defaults.zone_file_path)?
            .set_default("file_backend_hosts", Vec::<String>::new())?
            .add_source(
                Environment::with_prefix("SHIMIKO")
                    .list_separator(",")
                    .try_parsing(true)
                    .with_list_parse_key("cert_domains")
                    .with_list_parse_key("file_backend_hosts"),
            );

        let config = builder
            .build()
            .map_err(|e| ShimikoError::Config(format!("failed to build config: {e}")))?;

        let mut parsed: ConfigFile = config
            .try_deserialize()
            .map_err(|e| ShimikoError::Config(format!("failed to deserialize config: {e}")))?;

        if let Ok(username) = std::env::var("VYOS_USERNAME") {
            parsed.vyos_username = Some(username);
        }
        if let Ok(password) = std::env::var("VYOS_PASSWORD") {
            parsed.vyos_password = Some(password);
        }

        Ok(parsed)
    }

    pub fn http_listener_address(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }

    pub fn https_listener_address(&self) -> String {
        format!("0.0.0.0:{}", self.https_port)
    }
}

impl From<config::ConfigError> for ShimikoError {
    fn from(error: config::ConfigError) -> Self {
        ShimikoError::Config(error.to_string())
    }
}

impl FromStr for ConfigFile {
    type Err = ShimikoError;

    /// Parses a dotenv-style `KEY=VALUE` file body, used by `--config` for
    /// local development (`spec.md` §6, teacher's `cli.rs` file-location
    /// convention). Real environment variables always take precedence.
    fn from_str(body: &str) -> Result<Self, Self::Err> {
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value.trim());
                }
            }
        }
        ConfigFile::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ConfigFile::default();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.https_port, 0);
        assert_eq!(config.reconcile_interval, 300);
    }

    #[test]
    fn listener_addresses_bind_on_all_interfaces() {
        let config = ConfigFile::default();
        assert_eq!(config.http_listener_address(), "0.0.0.0:8080");
    }
}
