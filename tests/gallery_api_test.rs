mod common;

use axum::http::{Method, Request, StatusCode};
use common::{json_body, jpeg_bytes, png_bytes, MultipartForm, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn create_and_fetch_product() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({ "name": "  Oak chair ", "description": "Solid oak" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], "Oak chair");
    assert_eq!(body["data"]["active"], true);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, &format!("/api/v1/admin/products/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["photos"], json!([]));
}

#[tokio::test]
async fn blank_product_name_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn single_upload_then_list_shows_one_primary_photo() {
    let app = TestApp::new().await;
    let product = app.seed_product("Lamp").await;

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/upload-photo", product.id),
            MultipartForm::new()
                .file("image", "lamp.png", "image/png", &png_bytes())
                .text("description", "Lit at night"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["position"], 1);
    assert_eq!(body["data"]["is_primary"], true);
    assert_eq!(body["data"]["description"], "Lit at night");
    let image_url = body["data"]["image_url"].as_str().unwrap();
    assert!(image_url.starts_with("/storage/products/"));
    assert!(image_url.ends_with(".png"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/admin/products/{}/photos", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let photos = body["data"].as_array().unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0]["position"], 1);
    assert_eq!(photos[0]["is_primary"], true);
}

#[tokio::test]
async fn single_upload_with_invalid_file_is_a_bad_request() {
    let app = TestApp::new().await;
    let product = app.seed_product("Lamp").await;

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/upload-photo", product.id),
            MultipartForm::new().file("image", "notes.txt", "text/plain", b"hello"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.storage.is_empty());

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/upload-photo", product.id),
            MultipartForm::new().text("description", "no file"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_upload_pairs_descriptions_and_reports_rejections() {
    let app = TestApp::new().await;
    let product = app.seed_product("Chair").await;
    app.seed_photo(product.id, "existing").await;

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/photos", product.id),
            MultipartForm::new()
                .file("photos[]", "front.jpg", "image/jpeg", &jpeg_bytes())
                .file("photos[]", "broken.png", "image/png", b"not an image")
                .file("photos[]", "side.png", "image/png", &png_bytes())
                .text("descriptions[0]", "Front")
                .text("descriptions[2]", "Side"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;

    let photos = body["data"]["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["position"], 2);
    assert_eq!(photos[0]["description"], "Front");
    assert_eq!(photos[0]["is_primary"], false);
    assert_eq!(photos[1]["position"], 3);
    assert_eq!(photos[1]["description"], "Side");

    let rejected = body["data"]["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["index"], 1);
    assert_eq!(rejected[0]["file_name"], "broken.png");
}

#[tokio::test]
async fn batch_upload_with_only_invalid_files_is_unprocessable() {
    let app = TestApp::new().await;
    let product = app.seed_product("Chair").await;

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/photos", product.id),
            MultipartForm::new().file("photos", "banner.bmp", "image/bmp", b"BM\x00\x00"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    let errors = body["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e["field"] == "photos[0]"));
}

#[tokio::test]
async fn upload_to_unknown_product_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .upload(
            &format!("/api/v1/admin/products/{}/photos", Uuid::new_v4()),
            MultipartForm::new().file("photos[]", "a.png", "image/png", &png_bytes()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn promote_and_delete_through_the_api() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk").await;
    let a = app.seed_photo(product.id, "a").await;
    let b = app.seed_photo(product.id, "b").await;
    let c = app.seed_photo(product.id, "c").await;
    let base = format!("/api/v1/admin/products/{}/photos", product.id);

    let response = app
        .request(Method::PUT, &format!("{base}/{}/primary", b.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["is_primary"], true);

    let response = app
        .request(Method::DELETE, &format!("{base}/{}", b.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["deleted_photo_id"], b.id.to_string());
    assert_eq!(body["data"]["new_primary"]["id"], a.id.to_string());
    assert_eq!(body["data"]["new_primary"]["position"], 1);

    let listed = json_body(app.request(Method::GET, &base, None).await).await;
    let ids: Vec<_> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["id"].as_str().unwrap().to_string(), p["position"].clone()))
        .collect();
    assert_eq!(
        ids,
        vec![(a.id.to_string(), json!(1)), (c.id.to_string(), json!(2))]
    );
}

#[tokio::test]
async fn photo_routes_hide_photos_of_other_products() {
    let app = TestApp::new().await;
    let owner = app.seed_product("Owner").await;
    let other = app.seed_product("Other").await;
    let photo = app.seed_photo(owner.id, "a").await;

    let response = app
        .request(
            Method::PUT,
            &format!(
                "/api/v1/admin/products/{}/photos/{}/primary",
                other.id, photo.id
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}/photos/{}", other.id, photo.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.storage.contains(&photo.path));
}

#[tokio::test]
async fn gallery_sync_with_two_primaries_is_rejected_with_every_rule() {
    let app = TestApp::new().await;
    let product = app.seed_product("Sofa").await;
    let a = app.seed_photo(product.id, "a").await;
    let b = app.seed_photo(product.id, "b").await;
    let uri = format!("/api/v1/admin/products/{}/photos/gallery", product.id);
    let before = app.photos().list(product.id).await.unwrap();

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({
                "photos": [
                    { "id": a.id, "position": 1, "is_primary": true },
                    { "id": b.id, "position": 1, "is_primary": true }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    let rules: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["rule"].as_str().unwrap().to_string())
        .collect();
    assert!(rules.contains(&"exactly_one_primary".to_string()));
    assert!(rules.contains(&"unique_positions".to_string()));
    assert!(body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("exactly one primary photo"));

    let listed = app.photos().list(product.id).await.unwrap();
    assert_eq!(listed, before);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({
                "photos": [
                    { "id": a.id, "position": 2, "is_primary": false },
                    { "id": b.id, "position": 1, "is_primary": true, "description": "Hero" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Gallery updated");
    assert_eq!(body["data"][0]["id"], b.id.to_string());
    assert_eq!(body["data"][0]["description"], "Hero");
    assert_eq!(body["data"][1]["id"], a.id.to_string());
}

#[tokio::test]
async fn gallery_sync_with_malformed_body_is_a_bad_request() {
    let app = TestApp::new().await;
    let product = app.seed_product("Sofa").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/products/{}/photos/gallery", product.id),
            Some(json!({ "photos": [{ "id": "not-a-uuid" }] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storefront_hides_inactive_products() {
    let app = TestApp::new().await;
    let live = app.seed_product("Live").await;
    let hidden = app.seed_product_with_status("Hidden", false).await;
    let live_photo = app.seed_photo(live.id, "a").await;
    let hidden_photo = app.seed_photo(hidden.id, "b").await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/public/products/{}/photos/primary", live.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["data"]["id"],
        live_photo.id.to_string()
    );

    for uri in [
        format!("/api/v1/public/products/{}/photos", hidden.id),
        format!("/api/v1/public/products/{}/photos/primary", hidden.id),
        format!("/api/v1/public/product-photos/{}", hidden_photo.id),
    ] {
        let response = app.request(Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn storefront_primary_of_empty_gallery_is_not_found() {
    let app = TestApp::new().await;
    let product = app.seed_product("Empty").await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/public/products/{}/photos/primary", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_product_cascades_to_photos() {
    let app = TestApp::new().await;
    let product = app.seed_product("Bed").await;
    let photo = app.seed_photo(product.id, "a").await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/products/{}", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["photos_removed"], 1);
    assert!(!app.storage.contains(&photo.path));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/public/product-photos/{}", photo.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_is_echoed_on_errors() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/admin/products/{}", Uuid::new_v4()))
        .header("x-request-id", "req-test-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-test-42"
    );
    let body = json_body(response).await;
    assert_eq!(body["request_id"], "req-test-42");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]
        .get("/api/v1/admin/products/{id}/photos/gallery")
        .is_some());
}
