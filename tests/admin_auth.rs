mod support;

use axum::{
    body::Body,
    http::{Request, header},
};
use serde_json::json;

use shopfront::domain::types::AdminRole;
use shopfront::infra::http::SESSION_COOKIE;
use support::{ADMIN_TOKEN, EDITOR_PASSWORD, OWNER_PASSWORD, TestApp, body_json, get, json_request};

fn set_cookie(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let app = TestApp::new();

    let (status, body) = app.call(get("/api/admin/products", None)).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .call(get("/api/admin/products", Some("not-a-token")))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn login_sets_session_cookie_usable_for_later_requests() {
    let app = TestApp::new();
    app.repos
        .seed_admin("owner", OWNER_PASSWORD, AdminRole::Owner)
        .await;

    let response = app
        .send(json_request(
            "POST",
            "/api/admin/login",
            None,
            json!({ "username": "owner", "password": OWNER_PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), 200);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    let body = body_json(response).await;
    assert_eq!(body["admin"]["username"], "owner");
    assert_eq!(body["admin"]["role"], "owner");
    assert!(body["admin"].get("password_hash").is_none());

    let session = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/admin/me")
        .header(header::COOKIE, session)
        .body(Body::empty())
        .unwrap();
    let (status, me) = app.call(request).await;
    assert_eq!(status, 200);
    assert_eq!(me["username"], "owner");
    assert!(me["last_login_at"].is_string());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new();
    app.repos
        .seed_admin("owner", OWNER_PASSWORD, AdminRole::Owner)
        .await;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/admin/login",
            None,
            json!({ "username": "owner", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .call(json_request("POST", "/api/admin/login", None, json!({})))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn login_is_unavailable_without_signing_secret() {
    let app = TestApp::builder().without_jwt_secret().build();
    app.repos
        .seed_admin("owner", OWNER_PASSWORD, AdminRole::Owner)
        .await;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/admin/login",
            None,
            json!({ "username": "owner", "password": OWNER_PASSWORD }),
        ))
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "auth_not_configured");

    // The legacy token keeps working.
    let (status, _) = app.call(get("/api/admin/me", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn logout_always_clears_the_cookie() {
    let app = TestApp::new();
    let response = app
        .send(json_request("POST", "/api/admin/logout", None, json!({})))
        .await;

    assert_eq!(response.status(), 200);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(body_json(response).await["ok"], true);
}

#[tokio::test]
async fn stale_session_cookie_is_cleared_on_rejection() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/admin/me")
        .header(
            header::COOKIE,
            format!("{SESSION_COOKIE}=expired.jwt.value"),
        )
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), 401);
    assert!(set_cookie(&response).contains("Max-Age=0"));
}

#[tokio::test]
async fn legacy_token_acts_as_owner() {
    let app = TestApp::new();
    let (status, me) = app.call(get("/api/admin/me", Some(ADMIN_TOKEN))).await;

    assert_eq!(status, 200);
    assert_eq!(me["role"], "owner");
    assert_eq!(me["username"], "admin-token");
}

#[tokio::test]
async fn editors_can_read_but_not_change_settings() {
    let app = TestApp::new();
    app.repos
        .seed_admin("editor", EDITOR_PASSWORD, AdminRole::Editor)
        .await;
    let token = app.login("editor", EDITOR_PASSWORD).await;

    let (status, settings) = app.call(get("/api/admin/settings", Some(&token))).await;
    assert_eq!(status, 200);
    assert_eq!(settings["booking_enabled"], true);

    let (status, body) = app
        .call(json_request(
            "PATCH",
            "/api/admin/settings",
            Some(&token),
            json!({ "booking_enabled": false }),
        ))
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "forbidden");

    // Editors still manage content.
    let (status, _) = app
        .call(json_request(
            "POST",
            "/api/admin/blog",
            Some(&token),
            json!({ "title": "Editor Post", "content": "x" }),
        ))
        .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn owner_settings_change_takes_effect_for_bookings() {
    let app = TestApp::new();
    app.repos
        .seed_admin("owner", OWNER_PASSWORD, AdminRole::Owner)
        .await;
    let token = app.login("owner", OWNER_PASSWORD).await;

    let (status, settings) = app
        .call(json_request(
            "PATCH",
            "/api/admin/settings",
            Some(&token),
            json!({ "booking_enabled": false, "opening_hours": "Mon-Fri 9-18" }),
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(settings["booking_enabled"], false);
    assert_eq!(settings["opening_hours"], "Mon-Fri 9-18");
    assert_eq!(settings["business_name"], "Shopfront");

    let (status, _) = app
        .call(json_request(
            "POST",
            "/api/appointments",
            None,
            json!({
                "customer_name": "Ana",
                "customer_email": "ana@example.com",
                "customer_phone": "123",
                "service": "Diagnostics",
                "preferred_date": "2026-11-03"
            }),
        ))
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .call(json_request(
            "PATCH",
            "/api/admin/settings",
            Some(&token),
            json!({ "contact_email": "nope" }),
        ))
        .await;
    assert_eq!(status, 400);
}
