mod common;

use axum::http::{Method, StatusCode};
use common::{FilePart, TestApp, json_request, multipart_request, request};
use serde_json::json;
use shop_api::services::{
    product_service::featured_limit,
    upload_service::{build_file_name, extension_for},
};
use uuid::Uuid;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

fn product_fields(category: &str) -> Vec<(&'static str, String)> {
    vec![
        ("name", "Desk Lamp".to_string()),
        ("description", "Warm light".to_string()),
        ("brand", "Lumen".to_string()),
        ("price", "40".to_string()),
        ("category", category.to_string()),
        ("countInStock", "7".to_string()),
        ("isFeatured", "true".to_string()),
    ]
}

fn as_refs<'a>(fields: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[tokio::test]
async fn create_product_stores_image_and_serves_it() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Lighting").await;

    let fields = product_fields(&category.to_string());
    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/v1/products",
            Some(&token),
            &as_refs(&fields),
            &[("image", "desk lamp.png", "image/png", PNG)],
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let product = &body["data"]["product"];
    assert_eq!(product["name"], "Desk Lamp");
    assert_eq!(product["price"], 40);
    assert_eq!(product["countInStock"], 7);
    assert_eq!(product["isFeatured"], true);
    assert_eq!(product["category"]["name"], "Lighting");

    let image = product["image"].as_str().expect("image url");
    let prefix = "http://localhost:3000/public/uploads/";
    assert!(image.starts_with(prefix), "{image}");
    let file_name = &image[prefix.len()..];
    assert!(file_name.starts_with("desk-lamp.png-"));
    assert!(file_name.ends_with(".png"));
    assert_eq!(app.uploaded_files(), vec![file_name.to_string()]);

    let (status, bytes) = app
        .send_raw(request(
            Method::GET,
            &format!("/public/uploads/{file_name}"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, PNG);
}

#[tokio::test]
async fn unsupported_file_type_is_rejected_before_writing() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Docs").await;

    let fields = product_fields(&category.to_string());
    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/v1/products",
            Some(&token),
            &as_refs(&fields),
            &[("image", "notes.txt", "text/plain", &b"hello"[..])],
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid image type");
    assert!(app.uploaded_files().is_empty());
    assert_eq!(app.state.repos.products.count().await.expect("count"), 0);
}

#[tokio::test]
async fn create_product_requires_known_category_and_a_file() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Tools").await;

    let unknown = product_fields(&Uuid::new_v4().to_string());
    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/v1/products",
            Some(&token),
            &as_refs(&unknown),
            &[("image", "a.png", "image/png", PNG)],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Category");

    let known = product_fields(&category.to_string());
    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/v1/products",
            Some(&token),
            &as_refs(&known),
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No File");
    assert!(app.uploaded_files().is_empty());
}

#[tokio::test]
async fn product_lookup_update_and_delete() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let tools = app.create_category("Tools").await;
    let garden = app.create_category("Garden").await;
    let hammer = app.create_product(tools, "Hammer", 12, false).await;

    let (status, body) = app
        .send(request(Method::GET, &format!("/api/v1/products/{}", hammer.id), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["product"]["category"]["name"], "Tools");

    let (status, body) = app
        .send(request(Method::GET, "/api/v1/products/xyz", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Product ID");

    let (status, _) = app
        .send(request(Method::GET, &format!("/api/v1/products/{}", Uuid::new_v4()), None))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let uri = format!("/api/v1/products/{}", hammer.id);
    let (status, body) = app
        .send(json_request(
            Method::PUT,
            &uri,
            Some(&token),
            json!({ "price": 15, "category": garden }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["product"]["price"], 15);
    assert_eq!(body["data"]["product"]["name"], "Hammer");
    assert_eq!(body["data"]["product"]["category"]["name"], "Garden");

    let (status, body) = app
        .send(json_request(Method::PUT, &uri, Some(&token), json!({ "price": 20 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Category");

    let (status, _) = app
        .send(json_request(
            Method::PUT,
            &format!("/api/v1/products/{}", Uuid::new_v4()),
            Some(&token),
            json!({ "category": tools }),
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = app.send(request(Method::DELETE, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product has been deleted");

    let (status, _) = app.send(request(Method::DELETE, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_filters_by_category_and_counts() {
    let app = TestApp::new();
    let books = app.create_category("Books").await;
    let music = app.create_category("Music").await;
    app.create_product(books, "Novel", 9, true).await;
    app.create_product(books, "Atlas", 30, false).await;
    app.create_product(music, "Vinyl", 25, true).await;

    let (_, body) = app.send(request(Method::GET, "/api/v1/products", None)).await;
    assert_eq!(body["data"]["products"].as_array().map(Vec::len), Some(3));

    let (status, body) = app
        .send(request(
            Method::GET,
            &format!("/api/v1/products?categories={books}"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["products"]
        .as_array()
        .expect("products")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Novel") && names.contains(&"Atlas"));

    let (_, body) = app
        .send(request(
            Method::GET,
            &format!("/api/v1/products?categories={books},{music}"),
            None,
        ))
        .await;
    assert_eq!(body["data"]["products"].as_array().map(Vec::len), Some(3));

    let (status, _) = app
        .send(request(Method::GET, "/api/v1/products?categories=nope", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .send(request(Method::GET, "/api/v1/products/get/count", None))
        .await;
    assert_eq!(body["data"]["count"], 3);

    let (_, body) = app
        .send(request(Method::GET, "/api/v1/products/get/featured/1", None))
        .await;
    assert_eq!(body["data"]["productFeatured"].as_array().map(Vec::len), Some(1));

    let (_, body) = app
        .send(request(Method::GET, "/api/v1/products/get/featured/0", None))
        .await;
    let featured = body["data"]["productFeatured"].as_array().expect("featured");
    assert_eq!(featured.len(), 2);
    assert!(featured.iter().all(|p| p["isFeatured"] == true));

    let (status, body) = app
        .send(request(Method::GET, "/api/v1/products/get/featured/many", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid count");
}

#[tokio::test]
async fn gallery_upload_replaces_images() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Art").await;
    let print = app.create_product(category, "Print", 50, false).await;
    let uri = format!("/api/v1/products/gallery-images/{}", print.id);

    let (status, body) = app
        .send(multipart_request(
            Method::PUT,
            &uri,
            Some(&token),
            &[],
            &[
                ("images", "front.png", "image/png", PNG),
                ("images", "back.jpg", "image/jpeg", PNG),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let images = body["data"]["product"]["images"].as_array().expect("images");
    assert_eq!(images.len(), 2);
    assert!(images[1].as_str().is_some_and(|url| url.ends_with(".jpeg")));
    assert_eq!(app.uploaded_files().len(), 2);
}

#[tokio::test]
async fn gallery_upload_rejects_bad_input_without_writing() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Art").await;
    let print = app.create_product(category, "Print", 50, false).await;
    let uri = format!("/api/v1/products/gallery-images/{}", print.id);

    let mixed: [FilePart<'_>; 2] = [
        ("images", "ok.png", "image/png", PNG),
        ("images", "bad.gif", "image/gif", PNG),
    ];
    let (status, body) = app
        .send(multipart_request(Method::PUT, &uri, Some(&token), &[], &mixed))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid image type");

    let too_many: Vec<FilePart<'_>> = (0..11)
        .map(|_| ("images", "p.png", "image/png", PNG))
        .collect();
    let (status, _) = app
        .send(multipart_request(Method::PUT, &uri, Some(&token), &[], &too_many))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/api/v1/products/gallery-images/{}", Uuid::new_v4()),
            Some(&token),
            &[],
            &[("images", "ok.png", "image/png", PNG)],
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert!(app.uploaded_files().is_empty());
}

#[tokio::test]
async fn category_lifecycle() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/categories",
            Some(&token),
            json!({ "name": "Sports", "color": "#00ff00", "icon": "ball" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["category"]["id"].as_str().expect("id").to_string();
    let uri = format!("/api/v1/categories/{id}");

    let (status, body) = app
        .send(json_request(Method::PUT, &uri, Some(&token), json!({ "name": "Outdoors" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"]["name"], "Outdoors");
    assert_eq!(body["data"]["category"]["icon"], "ball");

    let (_, body) = app.send(request(Method::GET, "/api/v1/categories", None)).await;
    assert_eq!(body["data"]["categoryList"].as_array().map(Vec::len), Some(1));

    let (status, body) = app.send(request(Method::DELETE, &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "category has been deleted");

    let (status, _) = app.send(request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn file_names_replace_spaces_and_keep_the_original_name() {
    assert_eq!(
        build_file_name("my summer photo.png", "png", 1_700_000_000_000, 0),
        "my-summer-photo.png-1700000000000.png"
    );
    assert_eq!(build_file_name("../../etc/passwd", "jpg", 1, 0), "passwd-1.jpg");
    assert_eq!(build_file_name("", "jpeg", 2, 0), "image-2.jpeg");
}

#[test]
fn file_names_within_one_request_stay_distinct() {
    let first = build_file_name("image.jpg", "jpeg", 5, 0);
    let second = build_file_name("image.jpg", "jpeg", 5, 1);
    assert_eq!(first, "image.jpg-5.jpeg");
    assert_eq!(second, "image.jpg-5-1.jpeg");
}

#[tokio::test]
async fn gallery_parts_with_the_same_name_are_all_kept() {
    let app = TestApp::new();
    let (_, token) = app.admin_token().await;
    let category = app.create_category("Phones").await;
    let phone = app.create_product(category, "Phone", 300, false).await;

    let (status, body) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/api/v1/products/gallery-images/{}", phone.id),
            Some(&token),
            &[],
            &[
                ("images", "image.jpg", "image/jpeg", PNG),
                ("images", "image.jpg", "image/jpeg", &b"second"[..]),
                ("images", "image.jpg", "image/jpeg", &b"third"[..]),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let images: Vec<&str> = body["data"]["product"]["images"]
        .as_array()
        .expect("images")
        .iter()
        .filter_map(|url| url.as_str())
        .collect();
    assert_eq!(images.len(), 3);
    assert_ne!(images[0], images[1]);
    assert_ne!(images[1], images[2]);
    assert_ne!(images[0], images[2]);
    assert_eq!(app.uploaded_files().len(), 3);
}

#[tokio::test]
async fn featured_count_beyond_the_store_range_is_capped() {
    let app = TestApp::new();
    let category = app.create_category("Sale").await;
    app.create_product(category, "Kettle", 20, true).await;
    app.create_product(category, "Toaster", 35, true).await;

    let (status, body) = app
        .send(request(
            Method::GET,
            "/api/v1/products/get/featured/18446744073709551615",
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["productFeatured"].as_array().map(Vec::len), Some(2));

    let (status, body) = app
        .send(request(
            Method::GET,
            "/api/v1/products/get/featured/18446744073709551616",
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid count");
}

#[test]
fn featured_limit_parsing() {
    assert_eq!(featured_limit("0").expect("zero"), None);
    assert_eq!(featured_limit(" 3 ").expect("three"), Some(3));
    assert_eq!(
        featured_limit(&u64::MAX.to_string()).expect("max"),
        Some(i64::MAX as u64)
    );
    assert!(featured_limit("-1").is_err());
    assert!(featured_limit("ten").is_err());
}

#[test]
fn only_png_and_jpeg_are_accepted() {
    assert_eq!(extension_for("image/png"), Some("png"));
    assert_eq!(extension_for("image/jpeg"), Some("jpeg"));
    assert_eq!(extension_for("image/jpg"), Some("jpg"));
    assert_eq!(extension_for("image/gif"), None);
    assert_eq!(extension_for("text/plain"), None);
}
