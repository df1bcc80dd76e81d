use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::product,
    errors::ApiError,
    handlers::{
        common::{
            created_response, map_service_error, normalize_optional_string, success_response,
            success_with_message, validate_input,
        },
        PhotoResponse,
    },
    services::NewProduct,
    AppState,
};

/// Admin product routes, nested under `/admin/products`
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", get(get_product).delete(delete_product))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Oak dining chair")]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub brand_id: Option<Uuid>,
    /// Defaults to `true`
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub brand_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Gallery in position order
    pub photos: Vec<PhotoResponse>,
}

impl ProductResponse {
    fn new(product: product::Model, photos: Vec<PhotoResponse>) -> Self {
        Self {
            id: product.id,
            brand_id: product.brand_id,
            name: product.name,
            description: product.description,
            active: product.active,
            created_at: product.created_at,
            updated_at: product.updated_at,
            photos,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteProductResponse {
    pub deleted_product_id: Uuid,
    pub photos_removed: usize,
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    validate_input(&payload)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::ValidationError(
            "Product name cannot be blank".to_string(),
        ));
    }

    let product = state
        .services
        .catalog
        .create_product(NewProduct {
            name,
            description: normalize_optional_string(payload.description),
            brand_id: payload.brand_id,
            active: payload.active.unwrap_or(true),
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductResponse::new(product, Vec::new())))
}

/// Get a product with its gallery
#[utoipa::path(
    get,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    let photos = state
        .services
        .photos
        .list(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::new(
        product,
        PhotoResponse::from_models(photos, state.storage.as_ref()),
    )))
}

/// Delete a product together with its photos and their files
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = crate::ApiResponse<DeleteProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photos_removed = state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        DeleteProductResponse {
            deleted_product_id: id,
            photos_removed,
        },
        "Product deleted",
    ))
}
