//! Response cache middleware for public GET routes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::response::{ResponseCache, should_store_response};

pub(crate) const CACHE_STATUS_HEADER: &str = "x-cache";

pub async fn response_cache_layer(
    State(cache): State<ResponseCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseCache::key_for(request.uri().path(), request.uri().query());

    if let Some(mut cached) = cache.get(&key).await {
        debug!(target = "shopfront::cache::response", key = %key, "hit");
        cached
            .headers_mut()
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("hit"));
        return cached;
    }

    let generation = cache.generation();
    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    let mut response = match cache.store_response(&key, response, generation).await {
        Ok((response, stored)) => {
            if !stored {
                debug!(
                    target = "shopfront::cache::response",
                    key = %key,
                    "invalidated while rendering; not stored"
                );
            }
            response
        }
        Err((response, err)) => {
            warn!(
                target = "shopfront::cache::response",
                key = %key,
                error = %err,
                "failed to cache response"
            );
            return response;
        }
    };
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    response
}
