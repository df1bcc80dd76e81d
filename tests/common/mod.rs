#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use bytes::Bytes;
use catalog_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{product, product_photo},
    services::{NewProduct, PhotoStore},
    storage::InMemoryFileStorage,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const MULTIPART_BOUNDARY: &str = "catalog-test-boundary";

/// Smallest byte strings the upload checks accept as each format.
pub fn png_bytes() -> Bytes {
    Bytes::from_static(&[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ])
}

pub fn jpeg_bytes() -> Bytes {
    Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00])
}

pub fn gif_bytes() -> Bytes {
    Bytes::from_static(b"GIF89a\x01\x00\x01\x00\x00\x00\x00")
}

/// Application state backed by an in-memory SQLite database and in-memory
/// file storage.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub storage: Arc<InMemoryFileStorage>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        adjust(&mut cfg);

        // every pooled connection to sqlite::memory: would be its own database
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let storage = Arc::new(InMemoryFileStorage::new());
        let state = AppState::new(Arc::new(pool), storage.clone(), cfg);
        let router = catalog_api::app_router(state.clone());

        Self {
            router,
            state,
            storage,
        }
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.state.services.photos
    }

    pub async fn seed_product(&self, name: &str) -> product::Model {
        self.seed_product_with_status(name, true).await
    }

    pub async fn seed_product_with_status(&self, name: &str, active: bool) -> product::Model {
        self.state
            .services
            .catalog
            .create_product(NewProduct {
                name: name.to_string(),
                description: None,
                brand_id: None,
                active,
            })
            .await
            .expect("seed product for tests")
    }

    /// Stores a file and appends it as a photo, the way an accepted upload would.
    pub async fn seed_photo(&self, product_id: Uuid, description: &str) -> product_photo::Model {
        use catalog_api::storage::FileStorage;

        let path = self
            .storage
            .store(png_bytes(), "seed.png")
            .await
            .expect("store seed file");
        self.photos()
            .append(product_id, path, Some(description.to_string()))
            .await
            .expect("append seed photo")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn upload(&self, uri: &str, form: MultipartForm) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(form.finish()))
            .expect("failed to build multipart request");
        self.send(request).await
    }
}

/// Reads a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                MULTIPART_BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        self.body
    }
}
