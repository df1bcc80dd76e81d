use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{error, info, warn};

use catalog_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);
    api::handlers::health::init_start_time();

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Photo files live on local disk and are served back under the public prefix
    let storage = Arc::new(api::storage::LocalFileStorage::new(
        &cfg.storage_root,
        &cfg.public_url_prefix,
    ));
    tokio::fs::create_dir_all(storage.root())
        .await
        .with_context(|| format!("failed to create storage root {}", storage.root().display()))?;

    let app_state = api::AppState::new(db_arc, storage.clone(), cfg.clone());

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    };

    let public_prefix = normalize_mount_path(&cfg.public_url_prefix);
    let mut app: Router = api::app_router(app_state);
    if let Some(prefix) = public_prefix {
        info!(prefix = %prefix, root = %storage.root().display(), "Serving photo files");
        app = app.nest_service(&prefix, ServeDir::new(storage.root()));
    }
    let app = app.layer(CompressionLayer::new()).layer(cors_layer);

    // Bind and serve
    let host: std::net::IpAddr = cfg
        .host
        .parse()
        .with_context(|| format!("invalid bind host {:?}", cfg.host))?;
    let addr = SocketAddr::from((host, cfg.port));
    info!("catalog-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("catalog-api stopped");
    Ok(())
}

/// Only path prefixes can be mounted locally; absolute URLs point at a CDN.
fn normalize_mount_path(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') && trimmed.len() > 1 {
        Some(trimmed.to_string())
    } else {
        None
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
