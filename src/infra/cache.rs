//! Time-boxed response cache for the global feed.
//!
//! An explicit, injected component rather than a framework decorator:
//! entries expire on read after a configured TTL and the only early
//! invalidation is an operator-driven `flush()`. Writes to the entity
//! store never touch the cache, so staleness inside the TTL window is
//! expected behavior.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::counter;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

struct CacheEntry {
    stored_at: Instant,
    response: CachedResponse,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return the cached response for `key` while its TTL has not
    /// elapsed. Expiry is checked on read; stale entries stay in the
    /// map until overwritten or flushed.
    pub async fn get(&self, key: &str) -> Option<Response<Body>> {
        let guard = self.entries.read().await;
        let entry = guard.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.response.clone().into_response())
    }

    pub async fn put(&self, key: String, response: CachedResponse) {
        let mut guard = self.entries.write().await;
        guard.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                response,
            },
        );
    }

    pub async fn store_response(
        &self,
        key: &str,
        response: Response,
    ) -> Result<Response, (Response, CacheStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, cached)) => {
                self.put(key.to_string(), cached).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Drop every entry immediately, regardless of remaining TTL.
    pub async fn flush(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
        counter!("lenta_response_cache_flush_total").increment(1);
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &axum::http::HeaderMap, body: Bytes) -> Self {
        let mut stored_headers = Vec::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            stored_headers.push((name.clone(), value.clone()));
        }

        Self {
            status,
            headers: stored_headers,
            body,
        }
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

pub fn should_store_response(response: &Response) -> bool {
    use axum::http::header;

    if !response.status().is_success() {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    true
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}

/// Middleware for the cached routes. The cache key is the request path
/// only: the `page` query parameter deliberately does not participate,
/// so every page of the global feed collapses onto one cached entry.
pub async fn response_cache_layer(
    State(cache): State<ResponseCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = request.uri().path().to_string();

    if let Some(cached) = cache.get(&key).await {
        counter!("lenta_response_cache_hit_total").increment(1);
        debug!(target = "lenta::cache", outcome = "hit", key = %key, "serving cached response");
        return cached;
    }

    counter!("lenta_response_cache_miss_total").increment(1);
    debug!(target = "lenta::cache", outcome = "miss", key = %key, "executing handler");

    let response = next.run(request).await;

    if !should_store_response(&response) {
        return response;
    }

    match cache.store_response(&key, response).await {
        Ok(rebuilt) => rebuilt,
        Err((rebuilt, error)) => {
            debug!(target = "lenta::cache", error = %error, key = %key, "response not cached");
            rebuilt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn cached_body(body: &str) -> CachedResponse {
        CachedResponse::new(StatusCode::OK, &HeaderMap::new(), Bytes::from(body.to_string()))
    }

    #[tokio::test]
    async fn entry_lives_inside_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(20));
        cache.put("/".to_string(), cached_body("feed")).await;
        assert!(cache.get("/").await.is_some());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.put("/".to_string(), cached_body("feed")).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.get("/").await.is_none());
    }

    #[tokio::test]
    async fn flush_clears_live_entries() {
        let cache = ResponseCache::new(Duration::from_secs(20));
        cache.put("/".to_string(), cached_body("feed")).await;
        cache.flush().await;
        assert!(cache.get("/").await.is_none());
    }

    #[test]
    fn error_responses_are_not_stored() {
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .expect("response");
        assert!(!should_store_response(&response));
    }

    #[test]
    fn set_cookie_responses_are_not_stored() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::SET_COOKIE, "lenta_session=x")
            .body(Body::empty())
            .expect("response");
        assert!(!should_store_response(&response));
    }
}
