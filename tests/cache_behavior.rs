use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use http_body_util::BodyExt;
use lenta::infra::cache::{ResponseCache, response_cache_layer};
use tower::ServiceExt;

/// A router whose handler renders a fresh body on every invocation, so
/// the render counter tells cached and uncached responses apart.
fn counting_app(cache: ResponseCache) -> (Router, Arc<AtomicUsize>) {
    let renders = Arc::new(AtomicUsize::new(0));

    let handler_renders = renders.clone();
    let handler = move || {
        let renders = handler_renders.clone();
        async move {
            let n = renders.fetch_add(1, Ordering::SeqCst) + 1;
            format!("render {n}")
        }
    };

    let app = Router::new()
        .route("/", get(handler.clone()).post(handler))
        .layer(from_fn_with_state(cache, response_cache_layer));
    (app, renders)
}

async fn fetch(app: &Router, method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(body.to_vec()).expect("utf8 body"))
}

#[tokio::test]
async fn repeat_requests_inside_ttl_share_one_render() {
    let (app, renders) = counting_app(ResponseCache::new(Duration::from_secs(20)));

    let (status, first) = fetch(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, "render 1");

    let (_, second) = fetch(&app, "GET", "/").await;
    assert_eq!(second, "render 1");
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_string_does_not_split_the_cache_key() {
    let (app, renders) = counting_app(ResponseCache::new(Duration::from_secs(20)));

    let (_, first) = fetch(&app, "GET", "/").await;
    // A later page of the same path collapses onto the same entry.
    let (_, paged) = fetch(&app, "GET", "/?page=2").await;
    assert_eq!(paged, first);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entries_render_again() {
    let (app, renders) = counting_app(ResponseCache::new(Duration::from_millis(10)));

    let (_, first) = fetch(&app, "GET", "/").await;
    assert_eq!(first, "render 1");

    tokio::time::sleep(Duration::from_millis(25)).await;

    let (_, second) = fetch(&app, "GET", "/").await;
    assert_eq!(second, "render 2");
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn flush_invalidates_before_the_ttl_elapses() {
    let cache = ResponseCache::new(Duration::from_secs(20));
    let (app, renders) = counting_app(cache.clone());

    let (_, first) = fetch(&app, "GET", "/").await;
    assert_eq!(first, "render 1");

    cache.flush().await;

    let (_, second) = fetch(&app, "GET", "/").await;
    assert_eq!(second, "render 2");
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_get_requests_bypass_the_cache() {
    let (app, renders) = counting_app(ResponseCache::new(Duration::from_secs(20)));

    let (_, first) = fetch(&app, "POST", "/").await;
    let (_, second) = fetch(&app, "POST", "/").await;
    assert_eq!(first, "render 1");
    assert_eq!(second, "render 2");

    // The POSTs stored nothing, so the first GET renders fresh.
    let (_, third) = fetch(&app, "GET", "/").await;
    assert_eq!(third, "render 3");
    assert_eq!(renders.load(Ordering::SeqCst), 3);
}
