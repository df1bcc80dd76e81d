use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::{
        common::{map_service_error, success_with_message},
        PhotoResponse,
    },
    services::PhotoUpdate,
    AppState,
};

/// Desired final state of a product's whole gallery
#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "photos": [
        {"id": "2f1c1c52-8f5e-4a43-9a0e-0d6f8f5c2c11", "position": 1, "is_primary": true, "description": "Front"},
        {"id": "8a3e6c0b-1b3d-4c55-a0b0-6f0e0e4f1a22", "position": 2, "is_primary": false, "description": null}
    ]
}))]
pub struct GallerySyncRequest {
    /// Every photo of the product, each exactly once
    pub photos: Vec<PhotoUpdate>,
}

/// Reorder photos, pick the primary and edit descriptions in one step
///
/// The submission is applied completely or not at all. A rejected submission
/// lists every violated rule in `errors`, e.g. `exactly_one_primary` and
/// `unique_positions`.
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/photos/gallery",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = GallerySyncRequest,
    responses(
        (status = 200, description = "Gallery updated", body = crate::ApiResponse<Vec<PhotoResponse>>),
        (status = 400, description = "Malformed body", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Gallery rules violated", body = crate::errors::ErrorResponse)
    ),
    tag = "Gallery"
)]
pub async fn sync_gallery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<GallerySyncRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let photos = state
        .services
        .photos
        .reorder_and_sync(id, request.photos)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        PhotoResponse::from_models(photos, state.storage.as_ref()),
        "Gallery updated",
    ))
}
