//! Binary entry point: parses the CLI, loads configuration, and dispatches
//! to either the long-running `server` command or the one-shot `sync`
//! command (`spec.md` §6).

use clap::Parser;
use shimiko::cli::{Cli, Commands};
use shimiko::config::ConfigFile;
use shimiko::error::ShimikoError;
use shimiko::reconcile::Reconciler;
use shimiko::{db, logging, tls, web};
use tracing::{error, info};

fn load_config(cli: &Cli) -> Result<ConfigFile, ShimikoError> {
    match cli.config_path() {
        Some(path) => {
            let body = std::fs::read_to_string(shellexpand::tilde(&path).as_ref())?;
            body.parse()
        }
        None => ConfigFile::load(),
    }
}

#[tokio::main]
async fn main() -> Result<(), ShimikoError> {
    logging::init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let pool = db::connect(&config.database_path).await?;
    let reconciler = Reconciler::new(pool, config.clone());

    match cli.command {
        Commands::Sync { .. } => {
            info!("running one-shot sync");
            reconciler.sync_once().await?;
            Ok(())
        }
        Commands::Server { .. } => run_server(config, reconciler).await,
    }
}

async fn run_server(config: ConfigFile, reconciler: Reconciler) -> Result<(), ShimikoError> {
    let router = web::build(reconciler.clone());

    let http_handle = tokio::spawn({
        let router = router.clone();
        let address = config.http_listener_address();
        async move {
            info!(address, "starting plain-HTTP listener");
            let listener = tokio::net::TcpListener::bind(&address).await?;
            axum::serve(listener, router.into_make_service()).await
        }
    });

    let https_handle = if config.https_port != 0 {
        let bundle = tls::ensure_certificate(&config, &reconciler).await?;
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem(
            bundle.cert_pem.into_bytes(),
            bundle.key_pem.into_bytes(),
        )
        .await
        .map_err(|e| ShimikoError::Tls(e.to_string()))?;

        let address = config.https_listener_address();
        let router = router.clone();
        Some(tokio::spawn(async move {
            info!(address, "starting HTTPS listener");
            axum_server::bind_rustls(address.parse().expect("valid socket address"), tls_config)
                .serve(router.into_make_service())
                .await
        }))
    } else {
        None
    };

    let reconciler_handle = tokio::spawn(reconciler.spawn_background_loop());

    let http_outcome = match http_handle.await {
        Ok(inner) => inner.map_err(ShimikoError::from),
        Err(e) => {
            error!(error = %e, "http listener task panicked");
            Err(ShimikoError::Other(e.to_string()))
        }
    };

    if let Some(https_handle) = https_handle {
        match https_handle.await {
            Ok(Err(e)) => error!(error = %e, "https listener exited with an error"),
            Err(e) => error!(error = %e, "https listener task panicked"),
            Ok(Ok(())) => {}
        }
    }

    match reconciler_handle.await {
        Ok(Err(e)) => error!(error = %e, "reconcile loop exited with an error"),
        Err(e) => error!(error = %e, "reconcile loop task panicked"),
        Ok(Ok(())) => {}
    }

    http_outcome
}
