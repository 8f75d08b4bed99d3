//! Shimiko: a small DNS control plane that publishes one record catalog to
//! a zone-file-driven authoritative server and a hosted cloud DNS API at
//! once, plus an ACME DNS-01 helper endpoint for publishing challenge TXT
//! records through the same pipeline.

#[macro_use]
extern crate lazy_static;

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod enums;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod session;
pub mod tls;
pub mod validation;
pub mod web;
pub mod zonefile;

pub use error::ShimikoError;
