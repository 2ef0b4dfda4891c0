mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{SECRET, TestApp, json_request, request};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use shop_api::{
    dto::auth::Claims,
    models::NewUser,
    middleware::auth::is_public,
    services::auth_service::{decode_token, is_revoked},
};

fn register_body(email: &str, password: &str) -> serde_json::Value {
    json!({
        "name": "Ada",
        "email": email,
        "password": password,
        "phone": "555-0101",
        "city": "London",
        "country": "UK"
    })
}

#[tokio::test]
async fn register_stores_a_hash_and_never_exposes_it() {
    let app = TestApp::new();

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/register",
            None,
            register_body("Ada@Example.com", "s3cret"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let stored = app
        .state
        .repos
        .users
        .find_by_email("ada@example.com")
        .await
        .expect("lookup")
        .expect("user stored");
    assert_ne!(stored.password_hash, "s3cret");
    assert!(stored.password_hash.starts_with("$argon2"));

    let (_, token) = app.admin_token().await;
    let (status, body) = app
        .send(request(Method::GET, "/api/v1/users", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"]["users"].as_array().expect("user list");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = TestApp::new();
    let body = register_body("dup@example.com", "pw");

    let (status, _) = app
        .send(json_request(Method::POST, "/api/v1/users/register", None, body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(json_request(Method::POST, "/api/v1/users/register", None, body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is already taken");
}

#[tokio::test]
async fn incomplete_register_body_is_a_bad_request() {
    let app = TestApp::new();

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/register",
            None,
            json!({ "name": "Ada", "email": "ada@example.com" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| m.contains("password")));

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": 42 }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.state.repos.users.count().await.expect("count"), 0);
}

#[tokio::test]
async fn store_rejects_a_second_user_with_the_same_email() {
    let app = TestApp::new();
    app.create_user("twice@example.com", false).await;

    let err = app
        .state
        .repos
        .users
        .create(NewUser {
            name: "Again".into(),
            email: "twice@example.com".into(),
            password_hash: "x".into(),
            phone: String::new(),
            is_admin: false,
            street: String::new(),
            apartment: String::new(),
            zip: String::new(),
            city: String::new(),
            country: String::new(),
        })
        .await
        .expect_err("duplicate email");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Email is already taken");
}

#[tokio::test]
async fn login_issues_token_only_for_matching_password() {
    let app = TestApp::new();
    app.send(json_request(
        Method::POST,
        "/api/v1/users/register",
        None,
        register_body("login@example.com", "right-password"),
    ))
    .await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": "login@example.com", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid Credential");

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": "nobody@example.com", "password": "x" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The user was not Found");

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": "login@example.com", "password": "right-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], "login@example.com");

    let token = body["data"]["token"].as_str().expect("token");
    let claims = decode_token(SECRET, token).expect("valid token");
    let stored = app
        .state
        .repos
        .users
        .find_by_email("login@example.com")
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(claims.user_id, stored.user.id.to_string());
    assert!(!claims.is_admin);
    assert!(claims.exp > claims.iat);
}

#[tokio::test]
async fn catalog_reads_are_public_but_writes_need_a_token() {
    let app = TestApp::new();

    for uri in [
        "/api/v1/products",
        "/api/v1/products/get/count",
        "/api/v1/categories",
        "/health",
    ] {
        let (status, _) = app.send(request(Method::GET, uri, None)).await;
        assert_eq!(status, StatusCode::OK, "GET {uri}");
    }

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/categories",
            None,
            json!({ "name": "Books" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "The User is not authorized");

    for (method, uri) in [
        (Method::GET, "/api/v1/orders"),
        (Method::GET, "/api/v1/users"),
        (Method::GET, "/api/v1/users/get/count"),
        (Method::DELETE, "/api/v1/products/00000000-0000-0000-0000-000000000000"),
    ] {
        let (status, _) = app.send(request(method.clone(), uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn non_admin_tokens_are_refused_everywhere_protected() {
    let app = TestApp::new();
    let customer = app.create_user("customer@example.com", false).await;
    let token = app.token_for(&customer);

    let (status, _) = app
        .send(request(Method::GET, "/api/v1/orders", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request(
            Method::POST,
            "/api/v1/categories",
            Some(&token),
            json!({ "name": "Toys" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, admin) = app.admin_token().await;
    let (status, _) = app
        .send(request(Method::GET, "/api/v1/orders", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_forged_and_malformed_tokens_are_rejected() {
    let app = TestApp::new();
    let (admin, _) = app.admin_token().await;
    let now = Utc::now().timestamp() as usize;

    let expired = encode(
        &Header::default(),
        &Claims {
            user_id: admin.id.to_string(),
            is_admin: true,
            iat: now - 7200,
            exp: now - 3600,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode");

    let forged = encode(
        &Header::default(),
        &Claims {
            user_id: admin.id.to_string(),
            is_admin: true,
            iat: now,
            exp: now + 3600,
        },
        &EncodingKey::from_secret(b"someone-else"),
    )
    .expect("encode");

    for token in [expired.as_str(), forged.as_str(), "not-a-jwt"] {
        let (status, _) = app
            .send(request(Method::GET, "/api/v1/orders", Some(token)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let basic = axum::http::Request::builder()
        .uri("/api/v1/orders")
        .header("authorization", "Basic YWRtaW46YWRtaW4=")
        .body(axum::body::Body::empty())
        .expect("request");
    let (status, _) = app.send(basic).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test]
fn allow_list_matches_whole_path_segments() {
    let prefix = "/api/v1";
    assert!(is_public(prefix, &Method::GET, "/api/v1/products"));
    assert!(is_public(prefix, &Method::GET, "/api/v1/products/get/featured/3"));
    assert!(is_public(prefix, &Method::OPTIONS, "/api/v1/categories/abc"));
    assert!(is_public(prefix, &Method::GET, "/public/uploads/a.png"));
    assert!(is_public(prefix, &Method::POST, "/api/v1/users/login"));
    assert!(is_public(prefix, &Method::POST, "/api/v1/users/register"));

    assert!(!is_public(prefix, &Method::GET, "/api/v1/productsextra"));
    assert!(!is_public(prefix, &Method::POST, "/api/v1/products"));
    assert!(!is_public(prefix, &Method::PUT, "/api/v1/categories/abc"));
    assert!(!is_public(prefix, &Method::GET, "/api/v1/orders"));
    assert!(!is_public(prefix, &Method::GET, "/api/v1/users"));
}

#[test]
fn only_admin_claims_survive_revocation() {
    let claims = |is_admin| Claims {
        user_id: "u".into(),
        is_admin,
        iat: 0,
        exp: 0,
    };
    assert!(is_revoked(&claims(false)));
    assert!(!is_revoked(&claims(true)));
}
