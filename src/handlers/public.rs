//! Read-only storefront routes. Photos of inactive products are hidden as if
//! the product did not exist.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{
    errors::{ApiError, ServiceError},
    handlers::{
        common::{map_service_error, success_response},
        PhotoResponse,
    },
    AppState,
};

/// Storefront routes, nested under `/public`
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:id/photos", get(list_product_photos))
        .route("/products/:id/photos/primary", get(primary_product_photo))
        .route("/product-photos/:photo_id", get(get_product_photo))
}

/// Photos of an active product in display order
#[utoipa::path(
    get,
    path = "/api/v1/public/products/{id}/photos",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Photos in position order", body = crate::ApiResponse<Vec<PhotoResponse>>),
        (status = 404, description = "Product not found or inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn list_product_photos(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .get_active_product(id)
        .await
        .map_err(map_service_error)?;
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

/// Primary photo of an active product
#[utoipa::path(
    get,
    path = "/api/v1/public/products/{id}/photos/primary",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Primary photo", body = crate::ApiResponse<PhotoResponse>),
        (status = 404, description = "Product not found, inactive, or without photos", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn primary_product_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .get_active_product(id)
        .await
        .map_err(map_service_error)?;
    let photo = state
        .services
        .photos
        .primary(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Product {} has no photos", id)))?;

    Ok(success_response(PhotoResponse::from_model(
        photo,
        state.storage.as_ref(),
    )))
}

/// A single photo, if its product is active
#[utoipa::path(
    get,
    path = "/api/v1/public/product-photos/{photo_id}",
    params(("photo_id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo", body = crate::ApiResponse<PhotoResponse>),
        (status = 404, description = "Photo not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Storefront"
)]
pub async fn get_product_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .services
        .photos
        .get(photo_id)
        .await
        .map_err(map_service_error)?;
    state
        .services
        .catalog
        .get_active_product(photo.product_id)
        .await
        .map_err(|_| {
            map_service_error(ServiceError::NotFound(format!(
                "Photo {} not found",
                photo_id
            )))
        })?;

    Ok(success_response(PhotoResponse::from_model(
        photo,
        state.storage.as_ref(),
    )))
}
