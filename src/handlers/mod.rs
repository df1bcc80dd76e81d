pub mod common;
pub mod gallery;
pub mod health;
pub mod photos;
pub mod products;
pub mod public;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::product_photo,
    services::{CatalogService, PhotoStore, UploadIngestion, UploadLimits},
    storage::FileStorage,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub photos: Arc<PhotoStore>,
    pub uploads: Arc<UploadIngestion>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, storage: Arc<dyn FileStorage>, config: &AppConfig) -> Self {
        let photos = PhotoStore::new(db_pool.clone(), storage.clone(), config.description_max_len);
        let uploads = UploadIngestion::new(photos.clone(), storage, UploadLimits::from(config));
        let catalog = CatalogService::new(db_pool, photos.clone());

        Self {
            photos: Arc::new(photos),
            uploads: Arc::new(uploads),
            catalog: Arc::new(catalog),
        }
    }
}

/// Photo as rendered to API clients
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "products/0b7c9a52-5d6e-4bb4-9d0c-3f1f1f0e2a11.jpg")]
    pub path: String,
    #[schema(example = "/storage/products/0b7c9a52-5d6e-4bb4-9d0c-3f1f1f0e2a11.jpg")]
    pub image_url: String,
    pub description: Option<String>,
    pub is_primary: bool,
    #[schema(example = 1)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhotoResponse {
    pub fn from_model(photo: product_photo::Model, storage: &dyn FileStorage) -> Self {
        Self {
            image_url: storage.public_url(&photo.path),
            id: photo.id,
            product_id: photo.product_id,
            path: photo.path,
            description: photo.description,
            is_primary: photo.is_primary,
            position: photo.position,
            created_at: photo.created_at,
            updated_at: photo.updated_at,
        }
    }

    pub fn from_models(photos: Vec<product_photo::Model>, storage: &dyn FileStorage) -> Vec<Self> {
        photos
            .into_iter()
            .map(|photo| Self::from_model(photo, storage))
            .collect()
    }
}
