//! Crate-wide error type.
//!
//! Mirrors the teacher's `GoatNsError`: a flat enum of `From`-convertible
//! leaf errors rather than a tree of nested error types, plus an aggregate
//! variant for the session's "both sides failed" case (`spec.md` §4.6, §7).

use std::fmt::Display;

use crate::zonefile::{ParseError, SoaError};

#[derive(Debug)]
pub enum ShimikoError {
    /// Config values missing or unparseable at startup.
    Config(String),
    /// A zone-file failed to lex.
    Lex(String),
    Parse(ParseError),
    /// The SOA record couldn't be located or bumped.
    Soa(SoaError),
    /// A record failed validation; carries the full message list (`spec.md` §4.8).
    Validation(Vec<String>),
    /// The requested record wasn't found.
    NotFound,
    /// sqlite / catalog errors.
    Database(sqlx::Error),
    /// SSH/SCP transport errors talking to a file-backend host.
    Ssh(String),
    /// The cloud DNS API returned an error or couldn't be reached.
    Api(String),
    /// Certificate acquisition/generation failed.
    Tls(String),
    Io(std::io::Error),
    /// Multiple independent failures joined together (file + API, or
    /// several records in one reconcile pass). `spec.md` §7 "Aggregated errors".
    Aggregate(Vec<ShimikoError>),
    Other(String),
}

impl ShimikoError {
    /// Collapses a list of errors into `None` (empty), a single error, or
    /// `Some(Aggregate(..))`, per `spec.md` §4.6/§4.7's "join errors" rule.
    pub fn aggregate(errors: Vec<ShimikoError>) -> Option<ShimikoError> {
        match errors.len() {
            0 => None,
            1 => errors.into_iter().next(),
            _ => Some(ShimikoError::Aggregate(errors)),
        }
    }
}

impl Display for ShimikoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShimikoError::Config(msg) => write!(f, "configuration error: {msg}"),
            ShimikoError::Lex(msg) => write!(f, "lex error: {msg}"),
            ShimikoError::Parse(err) => write!(f, "parse error: {err}"),
            ShimikoError::Soa(err) => write!(f, "SOA error: {err}"),
            ShimikoError::Validation(msgs) => write!(f, "validation failed: {}", msgs.join("; ")),
            ShimikoError::NotFound => write!(f, "not found"),
            ShimikoError::Database(err) => write!(f, "database error: {err}"),
            ShimikoError::Ssh(msg) => write!(f, "ssh transport error: {msg}"),
            ShimikoError::Api(msg) => write!(f, "cloud API error: {msg}"),
            ShimikoError::Tls(msg) => write!(f, "TLS certificate error: {msg}"),
            ShimikoError::Io(err) => write!(f, "io error: {err}"),
            ShimikoError::Aggregate(errors) => {
                let joined = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "multiple errors: {joined}")
            }
            ShimikoError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ShimikoError {}

impl From<std::io::Error> for ShimikoError {
    fn from(error: std::io::Error) -> Self {
        ShimikoError::Io(error)
    }
}

impl From<sqlx::Error> for ShimikoError {
    fn from(error: sqlx::Error) -> Self {
        ShimikoError::Database(error)
    }
}

impl From<reqwest::Error> for ShimikoError {
    fn from(error: reqwest::Error) -> Self {
        ShimikoError::Api(error.to_string())
    }
}

impl From<regex::Error> for ShimikoError {
    fn from(error: regex::Error) -> Self {
        ShimikoError::Other(format!("internal regex error: {error}"))
    }
}

impl From<ParseError> for ShimikoError {
    fn from(error: ParseError) -> Self {
        ShimikoError::Parse(error)
    }
}

impl From<SoaError> for ShimikoError {
    fn from(error: SoaError) -> Self {
        ShimikoError::Soa(error)
    }
}

impl From<openssh::Error> for ShimikoError {
    fn from(error: openssh::Error) -> Self {
        ShimikoError::Ssh(error.to_string())
    }
}
