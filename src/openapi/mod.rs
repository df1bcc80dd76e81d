use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = r#"
# Catalog Photo Gallery API

Back-office and storefront endpoints for product photo galleries.

## Gallery rules

- A product with photos has exactly one primary photo; a product without photos has none.
- Photo positions are unique within a product and start at 1.
- Deleting the primary photo promotes the photo that is first after deletion.
- Deleting a photo renumbers the remaining photos to 1..N.

## Error Handling

Errors share one JSON shape. Rule violations list every failed rule in `errors`:

```json
{
  "error": "Unprocessable Entity",
  "message": "Gallery update rejected: 2 rule(s) violated",
  "errors": [
    {"field": "photos", "rule": "exactly_one_primary", "message": "Gallery must have exactly one primary photo (found 2)"},
    {"field": "photos", "rule": "unique_positions", "message": "Photo positions must be unique (position 1 is used 2 times)"}
  ],
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Products that own photo galleries"),
        (name = "Photos", description = "Uploading, promoting, editing and deleting photos"),
        (name = "Gallery", description = "Whole-gallery reorder and sync"),
        (name = "Storefront", description = "Public read-only photo endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::delete_product,

        // Photos
        crate::handlers::photos::list_photos,
        crate::handlers::photos::upload_photos,
        crate::handlers::photos::upload_photo,
        crate::handlers::photos::set_primary_photo,
        crate::handlers::photos::update_photo,
        crate::handlers::photos::delete_photo,

        // Gallery
        crate::handlers::gallery::sync_gallery,

        // Storefront
        crate::handlers::public::list_product_photos,
        crate::handlers::public::primary_product_photo,
        crate::handlers::public::get_product_photo,

        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::handlers::PhotoResponse,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::DeleteProductResponse,
            crate::handlers::photos::UpdatePhotoRequest,
            crate::handlers::photos::UploadPhotosResponse,
            crate::handlers::photos::DeletePhotoResponse,
            crate::handlers::gallery::GallerySyncRequest,
            crate::services::gallery_sync::PhotoUpdate,
            crate::services::upload_ingestion::RejectedUpload,
            crate::handlers::health::HealthResponse,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::FieldError
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_gallery_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Catalog API"));
        assert!(json.contains("/api/v1/admin/products/{id}/photos/gallery"));
        assert!(json.contains("/api/v1/public/products/{id}/photos/primary"));
        assert!(json.contains("exactly_one_primary"));
    }
}
