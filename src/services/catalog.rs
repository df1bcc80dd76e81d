use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{in_transaction, DbPool},
    entities::product::{self, Entity as Product},
    errors::ServiceError,
    services::photo_store::PhotoStore,
};

/// Input for a new product
#[derive(Debug, Clone, Validate)]
pub struct NewProduct {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub brand_id: Option<Uuid>,
    pub active: bool,
}

/// The slice of product lifecycle the gallery depends on: products own
/// galleries, and deleting one takes its photos and files with it.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    photos: PhotoStore,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, photos: PhotoStore) -> Self {
        Self { db, photos }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        let input = NewProduct {
            name: input.name.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            ..input
        };
        input.validate()?;

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            brand_id: Set(input.brand_id),
            name: Set(input.name),
            description: Set(input.description),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Like `get_product`, but inactive products are reported as missing.
    #[instrument(skip(self))]
    pub async fn get_active_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let found = self.get_product(id).await?;
        if !found.active {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        Ok(found)
    }

    /// Deletes the product and its photo records in one transaction, then
    /// removes the photo files.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<usize, ServiceError> {
        let paths = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                if Product::find_by_id(id).one(txn).await?.is_none() {
                    return Err(ServiceError::NotFound(format!("Product {} not found", id)));
                }
                let paths = PhotoStore::delete_records(txn, id).await?;
                Product::delete_by_id(id).exec(txn).await?;
                Ok(paths)
            })
        })
        .await?;

        let removed = paths.len();
        self.photos.discard_files(&paths).await;
        info!(product_id = %id, photos_removed = removed, "Product deleted");
        Ok(removed)
    }
}
