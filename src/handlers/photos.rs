use std::collections::BTreeMap;

use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::{
        common::{
            created_response, map_service_error, normalize_optional_string, success_response,
            success_with_message,
        },
        gallery, PhotoResponse,
    },
    services::{upload_ingestion::RejectedUpload, IncomingUpload},
    AppState,
};

/// Admin photo routes, nested under `/admin/products`
pub fn photo_routes(upload_body_limit: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route("/:id/photos", post(upload_photos))
        .route("/:id/upload-photo", post(upload_photo))
        .layer(DefaultBodyLimit::max(upload_body_limit));

    Router::new()
        .route("/:id/photos", get(list_photos))
        .route("/:id/photos/gallery", put(gallery::sync_gallery))
        .route(
            "/:id/photos/:photo_id",
            put(update_photo).delete(delete_photo),
        )
        .route("/:id/photos/:photo_id/primary", put(set_primary_photo))
        .merge(uploads)
}

/// Body for editing a photo's description
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePhotoRequest {
    /// New description; blank or `null` clears it
    #[schema(example = "Side view")]
    pub description: Option<String>,
}

/// Result of a batch upload
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadPhotosResponse {
    /// Photos created, in upload order
    pub photos: Vec<PhotoResponse>,
    /// Files that were turned away
    pub rejected: Vec<RejectedUpload>,
}

/// Result of deleting a photo
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletePhotoResponse {
    pub deleted_photo_id: Uuid,
    /// Primary photo after the deletion, `null` when no photos remain
    pub new_primary: Option<PhotoResponse>,
}

/// List a product's photos in display order
#[utoipa::path(
    get,
    path = "/api/v1/admin/products/{id}/photos",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Photos in position order", body = crate::ApiResponse<Vec<PhotoResponse>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn list_photos(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photos = state
        .services
        .photos
        .list(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PhotoResponse::from_models(
        photos,
        state.storage.as_ref(),
    )))
}

/// Upload several photos at once
///
/// Multipart form with files under `photos` / `photos[]` and optional
/// descriptions under `descriptions[N]` (or `descriptions[]` in file order).
/// Invalid files are reported in `rejected`; the rest are appended after the
/// current last photo.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/photos",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content_type = "multipart/form-data", description = "photos[] files with optional descriptions[]"),
    responses(
        (status = 201, description = "Photos uploaded", body = crate::ApiResponse<UploadPhotosResponse>),
        (status = 400, description = "Malformed request or too many files", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "No file was accepted", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn upload_photos(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let uploads = read_batch_form(multipart).await?;
    debug!(product_id = %id, files = uploads.len(), "Batch upload received");

    let report = state
        .services
        .uploads
        .ingest(id, uploads)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(UploadPhotosResponse {
        photos: PhotoResponse::from_models(report.accepted, state.storage.as_ref()),
        rejected: report.rejected,
    }))
}

/// Upload a single photo
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/upload-photo",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content_type = "multipart/form-data", description = "image file with optional description"),
    responses(
        (status = 201, description = "Photo uploaded", body = crate::ApiResponse<PhotoResponse>),
        (status = 400, description = "Invalid file", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut image = None;
    let mut description = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                image = Some((file_name, content_type, bytes));
            }
            "description" => description = Some(field.text().await?),
            other => debug!(field = other, "Ignoring unexpected multipart field"),
        }
    }

    let (file_name, content_type, bytes) = image.ok_or_else(|| {
        ApiError::ValidationError("The image field is required".to_string())
    })?;
    let upload = IncomingUpload {
        file_name,
        content_type,
        bytes,
        description: normalize_optional_string(description),
    };

    let photo = state
        .services
        .uploads
        .ingest_single(id, upload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(PhotoResponse::from_model(
        photo,
        state.storage.as_ref(),
    )))
}

/// Make a photo the product's primary photo
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/photos/{photo_id}/primary",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    responses(
        (status = 200, description = "Primary photo updated", body = crate::ApiResponse<PhotoResponse>),
        (status = 404, description = "Photo not found for this product", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn set_primary_photo(
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .services
        .photos
        .promote(id, photo_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        PhotoResponse::from_model(photo, state.storage.as_ref()),
        "Primary photo updated",
    ))
}

/// Edit a photo's description
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/photos/{photo_id}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    request_body = UpdatePhotoRequest,
    responses(
        (status = 200, description = "Photo updated", body = crate::ApiResponse<PhotoResponse>),
        (status = 400, description = "Description too long", body = crate::errors::ErrorResponse),
        (status = 404, description = "Photo not found for this product", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn update_photo(
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdatePhotoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .services
        .photos
        .update_description(id, photo_id, payload.description)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PhotoResponse::from_model(
        photo,
        state.storage.as_ref(),
    )))
}

/// Delete a photo and its file
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}/photos/{photo_id}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    responses(
        (status = 200, description = "Photo deleted", body = crate::ApiResponse<DeletePhotoResponse>),
        (status = 404, description = "Photo not found for this product", body = crate::errors::ErrorResponse)
    ),
    tag = "Photos"
)]
pub async fn delete_photo(
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .services
        .photos
        .remove(id, photo_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        DeletePhotoResponse {
            deleted_photo_id: removed.deleted_photo_id,
            new_primary: removed
                .new_primary
                .map(|photo| PhotoResponse::from_model(photo, state.storage.as_ref())),
        },
        "Photo deleted",
    ))
}

/// Collects the files of a batch form and pairs each with its description.
async fn read_batch_form(mut multipart: Multipart) -> Result<Vec<IncomingUpload>, ApiError> {
    let mut files: Vec<(String, Option<String>, Bytes)> = Vec::new();
    let mut indexed_descriptions = BTreeMap::new();
    let mut ordered_descriptions = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photos" || name.starts_with("photos[") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            files.push((file_name, content_type, bytes));
        } else if name == "descriptions" || name.starts_with("descriptions[") {
            let text = field.text().await?;
            match description_index(&name) {
                Some(index) => {
                    indexed_descriptions.insert(index, text);
                }
                None => ordered_descriptions.push(text),
            }
        } else {
            debug!(field = %name, "Ignoring unexpected multipart field");
        }
    }

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(index, (file_name, content_type, bytes))| {
            let description = indexed_descriptions
                .remove(&index)
                .or_else(|| ordered_descriptions.get(index).cloned());
            IncomingUpload {
                file_name,
                content_type,
                bytes,
                description: normalize_optional_string(description),
            }
        })
        .collect())
}

/// `descriptions[3]` -> `Some(3)`; `descriptions[]` and `descriptions` -> `None`
fn description_index(name: &str) -> Option<usize> {
    name.strip_prefix("descriptions[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
