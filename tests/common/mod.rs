#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use shop_api::{
    app::build_app,
    config::AppConfig,
    models::{NewProduct, NewUser, Product, User},
    repository::Repositories,
    services::auth_service::issue_token,
    state::AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";
pub const HOST: &str = "localhost:3000";
const BOUNDARY: &str = "shop-api-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    // Held so the directory lives as long as the app.
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");
        let state = AppState::new(test_config(upload_dir.path()), Repositories::in_memory());
        let app = build_app(state.clone());
        Self {
            app,
            state,
            upload_dir,
        }
    }

    pub fn uploads(&self) -> PathBuf {
        self.upload_dir.path().to_path_buf()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(req).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn send_raw(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(req).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        (status, bytes.to_vec())
    }

    pub async fn admin_token(&self) -> (User, String) {
        let user = self.create_user("admin@example.com", true).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn create_user(&self, email: &str, is_admin: bool) -> User {
        self.state
            .repos
            .users
            .create(NewUser {
                name: email.split('@').next().unwrap_or("user").to_string(),
                email: email.to_string(),
                password_hash: "not-a-real-hash".into(),
                phone: "555-0100".into(),
                is_admin,
                street: String::new(),
                apartment: String::new(),
                zip: String::new(),
                city: String::new(),
                country: String::new(),
            })
            .await
            .expect("user created")
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_token(&self.state.config, user).expect("token issued")
    }

    pub async fn create_category(&self, name: &str) -> Uuid {
        self.state
            .repos
            .categories
            .create(shop_api::models::NewCategory {
                name: name.to_string(),
                color: Some("#ff0000".into()),
                icon: None,
            })
            .await
            .expect("category created")
            .id
    }

    pub async fn create_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: i64,
        is_featured: bool,
    ) -> Product {
        self.state
            .repos
            .products
            .create(NewProduct {
                name: name.to_string(),
                description: format!("{name} description"),
                rich_description: String::new(),
                image: String::new(),
                brand: "Acme".into(),
                price,
                category_id,
                count_in_stock: 5,
                rating: 4.5,
                num_reviews: 2,
                is_featured,
            })
            .await
            .expect("product created")
    }
}

pub fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        api_prefix: "/api/v1".into(),
        jwt_secret: SECRET.into(),
        token_ttl_hours: 24,
        upload_dir: upload_dir.to_path_buf(),
        max_body_bytes: 5 * 1024 * 1024,
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// One uploaded file part: (form field, file name, mime type, contents).
pub type FilePart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

pub fn multipart_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[FilePart<'_>],
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, mime, contents) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    builder(method, uri, token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, HOST);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}
