//! Zarr Gateway - authorizing HTTP access to array datasets.
//!
//! This binary parses the configuration, wires the storage backends and the
//! authorizer together and starts the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zarr_gateway::{
    auth::{AllowAll, AuthorizationScheme, Authorizer, BasicAuthorizer, FractalServerAuthorizer},
    config::Config,
    create_s3_client,
    server::{create_router, RouterConfig},
    S3ObjectStore, Storage,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    log_configuration(&config);

    let authorizer = match build_authorizer(&config) {
        Ok(authorizer) => authorizer,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Create S3 client
    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let storage = Storage::with_object_store(Arc::new(S3ObjectStore::new(s3_client)));

    let router = create_router(storage, authorizer, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();
    let base = config.normalized_base_path();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  Liveness:  http://{}{}alive", addr, base);
    info!("  Data:      http://{}{}files/<path or s3://bucket/key>", addr, base);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "zarr_gateway=debug,tower_http=debug"
    } else {
        "zarr_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log the effective configuration; secrets are never printed.
fn log_configuration(config: &Config) {
    info!("Zarr Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Base path: {}", config.normalized_base_path());
    info!("  Authorization scheme: {}", config.authorization_scheme);

    match config.authorization_scheme {
        AuthorizationScheme::FractalServer => {
            if let Some(ref url) = config.fractal_server_url {
                info!("  Upstream user server: {}", url);
            }
            info!(
                "  Auth cache: {} entries, {}s expiration",
                config.auth_cache_size, config.cache_expiration_time
            );
            info!("  Session cookie: {}", config.auth_cookie_name);
        }
        AuthorizationScheme::TestingBasicAuth => {
            warn!("  Auth: single fixed Basic user - do not use in production");
            if let Some(ref username) = config.testing_username {
                info!("  Testing username: {}", username);
            }
            info!("  Testing password: ***");
        }
        AuthorizationScheme::None => {
            warn!("  Auth: DISABLED - every readable file is publicly accessible");
        }
    }

    match config.s3_endpoint {
        Some(ref endpoint) => info!("  S3 endpoint: {}", endpoint),
        None => info!("  S3 endpoint: AWS default"),
    }
    info!("  S3 region: {}", config.s3_region);

    if let Some(ref viewer) = config.vizarr_static_files_path {
        info!("  Viewer static files: {}", viewer);
    }
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }
}

/// Build the authorizer selected by the configuration.
fn build_authorizer(config: &Config) -> Result<Arc<dyn Authorizer>, String> {
    let authorizer: Arc<dyn Authorizer> = match config.authorization_scheme {
        AuthorizationScheme::FractalServer => {
            let url = config.upstream_url()?;
            let authorizer = FractalServerAuthorizer::new(
                url,
                Duration::from_secs(config.cache_expiration_time),
                config.auth_cache_size,
            )
            .with_cookie_name(config.auth_cookie_name.clone());
            Arc::new(authorizer)
        }
        AuthorizationScheme::TestingBasicAuth => {
            let username = config.testing_username.clone().unwrap_or_default();
            let password = config.testing_password.clone().unwrap_or_default();
            Arc::new(BasicAuthorizer::new(username, password))
        }
        AuthorizationScheme::None => Arc::new(AllowAll),
    };

    Ok(authorizer)
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.base_path.clone());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref viewer) = config.vizarr_static_files_path {
        router_config = router_config.with_viewer(viewer);
    }

    router_config.with_tracing(!config.no_tracing)
}

/// Resolve on Ctrl-C, SIGTERM or SIGQUIT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
            (Ok(mut sigterm), Ok(mut sigquit)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigquit.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Received shutdown signal, draining connections");
}
