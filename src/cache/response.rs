use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::sync::RwLock;

/// Rendered public GET responses keyed by `path` or `path?query`.
///
/// Entries live for at most `ttl`. Every invalidation bumps a generation
/// counter; a response rendered before the bump is not stored.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedResponse>>>,
    generation: Arc<AtomicU64>,
    limit: usize,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            limit: limit.max(1),
            ttl,
        }
    }

    pub fn key_for(path: &str, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => format!("{path}?{query}"),
            _ => path.to_string(),
        }
    }

    /// Capture before rendering and hand back to [`store_response`](Self::store_response).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, key: &str) -> Option<Response<Body>> {
        let now = Instant::now();
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    return Some(entry.clone().into_response());
                }
                Some(_) => {}
            }
        }

        let mut guard = self.entries.write().await;
        if guard
            .get(key)
            .is_some_and(|entry| entry.is_expired(now, self.ttl))
        {
            guard.remove(key);
        }
        None
    }

    /// Inserts `response`, evicting expired entries and then the oldest one
    /// when the cache is full.
    pub async fn put(&self, key: String, response: CachedResponse) {
        let mut guard = self.entries.write().await;
        self.make_room(&mut guard, &key);
        guard.insert(key, response);
    }

    /// Buffers and stores `response` unless an invalidation happened after
    /// `generation` was captured.
    pub async fn store_response(
        &self,
        key: &str,
        response: Response,
        generation: u64,
    ) -> Result<(Response, bool), (Response, CacheStoreError)> {
        let (rebuilt, cached) = buffer_response(response).await?;
        let mut guard = self.entries.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok((rebuilt, false));
        }
        self.make_room(&mut guard, key);
        guard.insert(key.to_string(), cached);
        Ok((rebuilt, true))
    }

    /// Drop every entry for `path`, whatever its query string.
    pub async fn invalidate_path(&self, path: &str) -> usize {
        let with_query = format!("{path}?");
        let mut guard = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = guard.len();
        guard.retain(|key, _| key != path && !key.starts_with(&with_query));
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn make_room(&self, entries: &mut HashMap<String, CachedResponse>, key: &str) {
        if entries.len() < self.limit || entries.contains_key(key) {
            return;
        }
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        if entries.len() < self.limit {
            return;
        }
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(oldest) = oldest {
            entries.remove(&oldest);
        }
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    inserted_at: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            status,
            headers,
            body,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only plain successful responses without cookies are reusable.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            Ok((Response::from_parts(parts, Body::from(bytes)), cached))
        }
        Err(error) => Err((
            Response::from_parts(parts, Body::empty()),
            CacheStoreError::Buffer(error.to_string()),
        )),
    }
}
