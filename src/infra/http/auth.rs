//! Admin session handling: login/logout handlers and the guard in front of
//! every other `/api/admin` route.

use std::time::Duration;

use axum::{
    Extension, Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::application::auth::{AdminPrincipal, AuthError};

use super::{HttpState, error::ApiError, extract::ApiJson};

pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub secure: bool,
    pub ttl: Duration,
}

impl SessionConfig {
    fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::try_from(self.ttl).unwrap_or(time::Duration::hours(8));
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// Expires immediately, whether or not the client sent a session.
    fn cleared_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth
        .login(&payload.username, &payload.password)
        .await?;
    let jar = jar.add(state.session.session_cookie(outcome.token.clone()));
    Ok((jar, Json(outcome)))
}

/// Always succeeds; the client is told to drop the cookie.
pub async fn logout(State(state): State<HttpState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(state.session.cleared_cookie());
    (jar, Json(json!({ "ok": true })))
}

pub async fn me(
    State(state): State<HttpState>,
    Extension(principal): Extension<AdminPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.auth.profile(&principal).await?;
    Ok(Json(profile))
}

pub async fn require_admin(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return ApiError::from(AuthError::MissingCredentials).into_response();
    };

    let principal = match state.auth.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => {
            let mut response = ApiError::from(err).into_response();
            if has_session_cookie(request.headers()) {
                let jar = CookieJar::new().add(state.session.cleared_cookie());
                response = (jar, response).into_response();
            }
            return response;
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

/// `Authorization: Bearer` wins over the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .is_some()
}
