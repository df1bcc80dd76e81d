//! Catalog API library
//!
//! Product photo galleries: ordered photos with a single primary photo per
//! product, uploads, whole-gallery sync and storefront reads.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::Router;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::storage::FileStorage;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn FileStorage>,
        config: config::AppConfig,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), storage.clone(), &config);
        Self {
            db,
            config,
            services,
            storage,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API: admin gallery management and storefront reads
pub fn api_v1_routes(config: &config::AppConfig) -> Router<AppState> {
    let admin_products = Router::new()
        .merge(handlers::products::product_routes())
        .merge(handlers::photos::photo_routes(config.upload_body_limit()));

    Router::new()
        .nest("/admin/products", admin_products)
        .nest("/public", handlers::public::public_routes())
}

/// Full application router with request ids, HTTP tracing and timeouts.
pub fn app_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes(&state.config))
        .merge(openapi::swagger_ui())
        .layer(TimeoutLayer::new(timeout))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::services::*;
    pub use crate::storage::*;
    pub use crate::tracing::*;
}
