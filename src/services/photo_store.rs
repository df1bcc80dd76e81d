use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{in_transaction, DbPool},
    entities::{
        product::Entity as Product,
        product_photo::{self, Column as PhotoColumn, Entity as ProductPhoto},
    },
    errors::ServiceError,
    services::gallery_sync::{validate_sync, PhotoUpdate, MAX_POSITION},
    storage::FileStorage,
};

/// A stored file waiting to become a photo record
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub path: String,
    pub description: Option<String>,
}

/// Outcome of removing one photo
#[derive(Debug, Clone)]
pub struct RemovedPhoto {
    pub deleted_photo_id: Uuid,
    /// Primary photo after the removal, `None` when the gallery is now empty
    pub new_primary: Option<product_photo::Model>,
}

/// Owns every mutation of a product's photo gallery.
///
/// Each operation runs in one transaction and leaves the gallery with exactly
/// one primary photo (or none when empty) and distinct positions. Mutations
/// start by locking the product row, so writers to one gallery take turns
/// even under READ COMMITTED. Backing
/// files of removed photos are deleted after the transaction commits; a
/// failed file delete is logged and counted but does not undo the removal.
#[derive(Clone)]
pub struct PhotoStore {
    db: Arc<DbPool>,
    storage: Arc<dyn FileStorage>,
    description_max_len: usize,
}

impl PhotoStore {
    pub fn new(db: Arc<DbPool>, storage: Arc<dyn FileStorage>, description_max_len: usize) -> Self {
        Self {
            db,
            storage,
            description_max_len,
        }
    }

    pub fn description_max_len(&self) -> usize {
        self.description_max_len
    }

    /// Fails with `NotFound` unless the product exists.
    pub async fn ensure_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        find_product(&*self.db, product_id).await
    }

    /// Adds one photo at the end of the gallery.
    ///
    /// The photo becomes primary when the gallery has no primary yet, which
    /// is exactly the case for a product without photos.
    #[instrument(skip(self, path, description))]
    pub async fn append(
        &self,
        product_id: Uuid,
        path: String,
        description: Option<String>,
    ) -> Result<product_photo::Model, ServiceError> {
        let mut appended = self
            .append_batch(product_id, vec![NewPhoto { path, description }])
            .await?;
        appended
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Photo append returned no rows".to_string()))
    }

    /// Adds photos in the given order at positions `max + 1 ..= max + n`.
    #[instrument(skip(self, photos), fields(count = photos.len()))]
    pub async fn append_batch(
        &self,
        product_id: Uuid,
        photos: Vec<NewPhoto>,
    ) -> Result<Vec<product_photo::Model>, ServiceError> {
        let max_len = self.description_max_len;
        let photos = photos
            .into_iter()
            .map(|photo| {
                Ok(NewPhoto {
                    description: normalize_description(photo.description, max_len)?,
                    ..photo
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let inserted = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;

                let last_position = ProductPhoto::find()
                    .filter(PhotoColumn::ProductId.eq(product_id))
                    .order_by_desc(PhotoColumn::Position)
                    .one(txn)
                    .await?
                    .map(|photo| photo.position)
                    .unwrap_or(0);
                let positions = next_positions(last_position, photos.len())?;
                let mut needs_primary = find_primary(txn, product_id).await?.is_none();

                let now = Utc::now();
                let mut inserted = Vec::with_capacity(photos.len());
                for (position, photo) in positions.zip(photos) {
                    let model = product_photo::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        path: Set(photo.path),
                        description: Set(photo.description),
                        is_primary: Set(needs_primary),
                        position: Set(position),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    needs_primary = false;
                    inserted.push(model);
                }
                Ok(inserted)
            })
        })
        .await?;

        counter!("catalog_photos.appended", inserted.len() as u64);
        info!(
            product_id = %product_id,
            count = inserted.len(),
            first_position = ?inserted.first().map(|photo| photo.position),
            "Photos appended"
        );
        Ok(inserted)
    }

    /// Makes `photo_id` the product's only primary photo.
    #[instrument(skip(self))]
    pub async fn promote(
        &self,
        product_id: Uuid,
        photo_id: Uuid,
    ) -> Result<product_photo::Model, ServiceError> {
        let promoted = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;
                let photo = find_owned_photo(txn, product_id, photo_id).await?;
                let now = Utc::now();

                ProductPhoto::update_many()
                    .col_expr(PhotoColumn::IsPrimary, Expr::value(false))
                    .col_expr(PhotoColumn::UpdatedAt, Expr::value(now))
                    .filter(PhotoColumn::ProductId.eq(product_id))
                    .filter(PhotoColumn::Id.ne(photo_id))
                    .filter(PhotoColumn::IsPrimary.eq(true))
                    .exec(txn)
                    .await?;

                if photo.is_primary {
                    return Ok(photo);
                }

                let mut active: product_photo::ActiveModel = photo.into();
                active.is_primary = Set(true);
                active.updated_at = Set(now);
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        info!(product_id = %product_id, photo_id = %photo_id, "Primary photo changed");
        Ok(promoted)
    }

    /// Deletes one photo, renumbers the rest to 1..N and, when the primary
    /// was removed, promotes the photo that is now first.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: Uuid, photo_id: Uuid) -> Result<RemovedPhoto, ServiceError> {
        let (removed, new_primary) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;
                let photo = find_owned_photo(txn, product_id, photo_id).await?;
                ProductPhoto::delete_by_id(photo.id).exec(txn).await?;

                let remaining = compact_positions(txn, product_id).await?;
                let current_primary = remaining.iter().find(|p| p.is_primary).cloned();
                let new_primary = match current_primary {
                    Some(primary) => Some(primary),
                    None => match remaining.into_iter().next() {
                        Some(first) => {
                            let mut active: product_photo::ActiveModel = first.into();
                            active.is_primary = Set(true);
                            active.updated_at = Set(Utc::now());
                            Some(active.update(txn).await?)
                        }
                        None => None,
                    },
                };
                Ok((photo, new_primary))
            })
        })
        .await?;

        info!(
            product_id = %product_id,
            photo_id = %photo_id,
            new_primary = ?new_primary.as_ref().map(|photo| photo.id),
            "Photo removed"
        );
        self.discard_files(&[removed.path]).await;

        Ok(RemovedPhoto {
            deleted_photo_id: removed.id,
            new_primary,
        })
    }

    /// Applies a full-gallery submission, or nothing if any rule is broken.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn reorder_and_sync(
        &self,
        product_id: Uuid,
        updates: Vec<PhotoUpdate>,
    ) -> Result<Vec<product_photo::Model>, ServiceError> {
        let max_len = self.description_max_len;
        let synced = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;
                let current = photos_in_order(txn, product_id).await?;

                if let Err(violations) = validate_sync(&current, &updates, max_len) {
                    return Err(ServiceError::InvalidGallery(violations));
                }

                let now = Utc::now();
                let mut by_id: HashMap<Uuid, product_photo::Model> =
                    current.into_iter().map(|photo| (photo.id, photo)).collect();
                let mut synced = Vec::with_capacity(updates.len());
                for update in updates {
                    let Some(photo) = by_id.remove(&update.id) else {
                        continue;
                    };
                    let description = normalize_description(update.description, max_len)?;
                    if photo.position == update.position
                        && photo.is_primary == update.is_primary
                        && photo.description == description
                    {
                        synced.push(photo);
                        continue;
                    }
                    let mut active: product_photo::ActiveModel = photo.into();
                    active.position = Set(update.position);
                    active.is_primary = Set(update.is_primary);
                    active.description = Set(description);
                    active.updated_at = Set(now);
                    synced.push(active.update(txn).await?);
                }
                synced.sort_by_key(|photo| photo.position);
                Ok(synced)
            })
        })
        .await
        .map_err(|err| {
            if let ServiceError::InvalidGallery(violations) = &err {
                counter!("catalog_photos.sync_rejected", 1);
                warn!(
                    product_id = %product_id,
                    rules = ?violations.iter().map(|v| v.rule()).collect::<Vec<_>>(),
                    "Gallery sync rejected"
                );
            }
            err
        })?;

        info!(product_id = %product_id, count = synced.len(), "Gallery synced");
        Ok(synced)
    }

    /// Photos of a product ordered by position.
    #[instrument(skip(self))]
    pub async fn list(&self, product_id: Uuid) -> Result<Vec<product_photo::Model>, ServiceError> {
        let db = &*self.db;
        find_product(db, product_id).await?;
        photos_in_order(db, product_id).await
    }

    /// The product's primary photo, `None` when it has no photos.
    #[instrument(skip(self))]
    pub async fn primary(
        &self,
        product_id: Uuid,
    ) -> Result<Option<product_photo::Model>, ServiceError> {
        let db = &*self.db;
        find_product(db, product_id).await?;
        find_primary(db, product_id).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, photo_id: Uuid) -> Result<product_photo::Model, ServiceError> {
        ProductPhoto::find_by_id(photo_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Photo {} not found", photo_id)))
    }

    #[instrument(skip(self, description))]
    pub async fn update_description(
        &self,
        product_id: Uuid,
        photo_id: Uuid,
        description: Option<String>,
    ) -> Result<product_photo::Model, ServiceError> {
        let description = normalize_description(description, self.description_max_len)?;
        let updated = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;
                let photo = find_owned_photo(txn, product_id, photo_id).await?;
                let mut active: product_photo::ActiveModel = photo.into();
                active.description = Set(description);
                active.updated_at = Set(Utc::now());
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        debug!(product_id = %product_id, photo_id = %photo_id, "Photo description updated");
        Ok(updated)
    }

    /// Deletes every photo of a product and then their backing files.
    #[instrument(skip(self))]
    pub async fn remove_all(&self, product_id: Uuid) -> Result<usize, ServiceError> {
        let paths = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                lock_product(txn, product_id).await?;
                Self::delete_records(txn, product_id).await
            })
        })
        .await?;

        let count = paths.len();
        self.discard_files(&paths).await;
        info!(product_id = %product_id, count, "All product photos removed");
        Ok(count)
    }

    /// Deletes the photo rows of a product on `conn` and returns their file
    /// paths. Callers delete the files once their transaction has committed.
    pub async fn delete_records<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
    ) -> Result<Vec<String>, ServiceError> {
        let paths = ProductPhoto::find()
            .filter(PhotoColumn::ProductId.eq(product_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|photo| photo.path)
            .collect();

        ProductPhoto::delete_many()
            .filter(PhotoColumn::ProductId.eq(product_id))
            .exec(conn)
            .await?;

        Ok(paths)
    }

    /// Best-effort removal of backing files whose records are already gone.
    pub async fn discard_files(&self, paths: &[String]) {
        for path in paths {
            match self.storage.delete(path).await {
                Ok(true) => debug!(path = %path, "Photo file deleted"),
                Ok(false) => warn!(path = %path, "Photo file was already missing"),
                Err(e) => {
                    counter!("catalog_photos.file_delete_failures", 1);
                    warn!(path = %path, error = %e, "Failed to delete photo file");
                }
            }
        }
    }
}

/// Trims a description, maps blank to `None` and enforces the length limit.
pub(crate) fn normalize_description(
    description: Option<String>,
    max_len: usize,
) -> Result<Option<String>, ServiceError> {
    let Some(description) = description else {
        return Ok(None);
    };
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(ServiceError::ValidationError(format!(
            "Description cannot exceed {} characters",
            max_len
        )));
    }
    Ok(Some(trimmed.to_string()))
}

async fn find_product<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> Result<(), ServiceError> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

/// `SELECT .. FOR UPDATE` on the product row; SQLite has no row locks and
/// relies on its single writer instead.
pub(crate) fn product_lock_query(product_id: Uuid) -> Select<Product> {
    Product::find_by_id(product_id).lock_exclusive()
}

async fn lock_product<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> Result<(), ServiceError> {
    product_lock_query(product_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

/// Positions for `count` photos appended after `last`, refused when they
/// would pass [`MAX_POSITION`].
fn next_positions(
    last: i32,
    count: usize,
) -> Result<std::ops::RangeInclusive<i32>, ServiceError> {
    let first = last.checked_add(1);
    let end = i32::try_from(count)
        .ok()
        .and_then(|count| last.checked_add(count));
    match (first, end) {
        (Some(first), Some(end)) if end <= MAX_POSITION => Ok(first..=end),
        _ => Err(ServiceError::ValidationError(format!(
            "Gallery has no room for {} more photo(s) after position {}; positions cannot exceed {}",
            count, last, MAX_POSITION
        ))),
    }
}

/// A photo that does not belong to the product is reported the same way as
/// a photo that does not exist.
async fn find_owned_photo<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    photo_id: Uuid,
) -> Result<product_photo::Model, ServiceError> {
    ProductPhoto::find_by_id(photo_id)
        .filter(PhotoColumn::ProductId.eq(product_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Photo {} not found for product {}",
                photo_id, product_id
            ))
        })
}

async fn find_primary<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Option<product_photo::Model>, ServiceError> {
    Ok(ProductPhoto::find()
        .filter(PhotoColumn::ProductId.eq(product_id))
        .filter(PhotoColumn::IsPrimary.eq(true))
        .order_by_asc(PhotoColumn::Position)
        .one(conn)
        .await?)
}

async fn photos_in_order<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Vec<product_photo::Model>, ServiceError> {
    Ok(ProductPhoto::find()
        .filter(PhotoColumn::ProductId.eq(product_id))
        .order_by_asc(PhotoColumn::Position)
        .order_by_asc(PhotoColumn::CreatedAt)
        .all(conn)
        .await?)
}

/// Rewrites positions to 1..N keeping the current order.
async fn compact_positions<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Vec<product_photo::Model>, ServiceError> {
    let photos = photos_in_order(conn, product_id).await?;
    let now = Utc::now();
    let mut compacted = Vec::with_capacity(photos.len());
    for (index, photo) in photos.into_iter().enumerate() {
        let position = index as i32 + 1;
        if photo.position == position {
            compacted.push(photo);
            continue;
        }
        let mut active: product_photo::ActiveModel = photo.into();
        active.position = Set(position);
        active.updated_at = Set(now);
        compacted.push(active.update(conn).await?);
    }
    Ok(compacted)
}
