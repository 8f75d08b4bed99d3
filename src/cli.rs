//! CLI surface: `spec.md` §6 names exactly two subcommands, `server` and
//! `sync`, plus a shared `--config` flag (teacher's `cli.rs` convention).

use clap::{Parser, Subcommand};

#[derive(Parser, Clone)]
pub struct SharedOpts {
    /// Optional dotenv-style file read before the real environment, so real
    /// env vars always win (`SPEC_FULL.md` §12 "CLI").
    #[clap(short, long, help = "Configuration file")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP listener, optional HTTPS listener, and the reconcile loop.
    Server {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
    /// One-shot: load every catalog record and push it to both backends, then exit.
    Sync {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
}

#[derive(Parser)]
#[command(name = "shimiko", arg_required_else_help(true))]
/// A small DNS control plane that publishes one record catalog to a
/// zone-file-driven authoritative server and a cloud DNS API at once.
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> Option<String> {
        match &self.command {
            Commands::Server { sopt } | Commands::Sync { sopt } => sopt.config.clone(),
        }
    }
}
