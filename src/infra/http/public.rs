use std::{io::ErrorKind, sync::Arc};

use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        feed::FeedService,
        follows::FollowService,
        pagination::PageNumber,
        posts::PostComposer,
        repos::SessionsRepo,
    },
    domain::posts::preview,
    infra::{
        cache::{ResponseCache, response_cache_layer},
        db::PostgresRepositories,
        media::{MediaStorage, MediaStorageError},
    },
    presentation::views::{
        FeedPageView, GroupTemplate, IndexTemplate, PostDetailTemplate, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth::{Viewer, require_login, resolve_viewer},
    db_health_response, follows, posts,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub composer: Arc<PostComposer>,
    pub sessions: Arc<dyn SessionsRepo>,
    pub db: Arc<PostgresRepositories>,
    pub media: Arc<MediaStorage>,
    pub cache: ResponseCache,
    pub media_max_request_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // The global feed is the only cached surface; its key ignores the
    // page query, matching the long-standing behavior of the site.
    let cached_routes = Router::new().route("/", get(index)).layer(
        middleware::from_fn_with_state(state.cache.clone(), response_cache_layer),
    );

    let public_routes = Router::new()
        .route("/group/{slug}", get(group_posts))
        .route("/profile/{username}", get(profile))
        .route("/posts/{post_id}", get(post_detail))
        .route("/media/{*path}", get(serve_media))
        .route("/healthz/db", get(health))
        .route("/internal/cache/flush", post(flush_cache));

    let protected_routes = Router::new()
        .route("/follow", get(follows::follow_index))
        .route("/create", get(posts::create_form).post(posts::create_submit))
        .route(
            "/posts/{post_id}/edit",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{post_id}/comment", post(posts::add_comment))
        .route("/profile/{username}/follow", post(follows::follow))
        .route("/profile/{username}/unfollow", post(follows::unfollow))
        .route_layer(middleware::from_fn(require_login))
        .layer(DefaultBodyLimit::max(state.media_max_request_bytes));

    cached_routes
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, resolve_viewer))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn number(&self) -> PageNumber {
        PageNumber::from_query(self.page.as_deref())
    }
}

async fn index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.number()).await {
        Ok(context) => render_template_response(
            IndexTemplate {
                viewer: viewer.context(),
                feed: FeedPageView::from_page(context.page, "/"),
            },
            StatusCode::OK,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group_posts(&slug, query.number()).await {
        Ok(context) => {
            let base_path = format!("/group/{}", context.group.slug);
            render_template_response(
                GroupTemplate {
                    viewer: viewer.context(),
                    group: context.group.into(),
                    feed: FeedPageView::from_page(context.page, base_path),
                },
                StatusCode::OK,
            )
        }
        Err(crate::application::feed::FeedError::GroupNotFound) => {
            render_not_found_response(viewer.context())
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer_id = viewer.user().map(|user| user.id);

    match state.feed.profile(&username, viewer_id, query.number()).await {
        Ok(context) => {
            let is_self = viewer
                .user()
                .is_some_and(|user| user.id == context.author.id);
            let base_path = format!("/profile/{}", context.author.username);
            render_template_response(
                ProfileTemplate {
                    viewer: viewer.context(),
                    author_username: context.author.username,
                    post_count: context.post_count,
                    following: context.following,
                    is_self,
                    feed: FeedPageView::from_page(context.page, base_path),
                },
                StatusCode::OK,
            )
        }
        Err(crate::application::feed::FeedError::AuthorNotFound) => {
            render_not_found_response(viewer.context())
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
) -> Response {
    let Ok(post_id) = post_id.parse::<Uuid>() else {
        return render_not_found_response(viewer.context());
    };

    match state.feed.post_detail(post_id).await {
        Ok(context) => {
            let can_edit = viewer
                .user()
                .is_some_and(|user| user.id == context.post.author_id);
            render_template_response(
                PostDetailTemplate {
                    viewer: viewer.context(),
                    title_preview: preview(&context.post.text).to_string(),
                    post: context.post.into(),
                    author_post_count: context.author_post_count,
                    can_edit,
                    comments: context.comments.into_iter().map(Into::into).collect(),
                },
                StatusCode::OK,
            )
        }
        Err(crate::application::feed::FeedError::PostNotFound) => {
            render_not_found_response(viewer.context())
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(MediaStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(MediaStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored media",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn flush_cache(State(state): State<HttpState>) -> Response {
    state.cache.flush().await;
    info!(target = "lenta::http::cache", "response cache flushed");
    StatusCode::NO_CONTENT.into_response()
}

async fn not_found(Extension(viewer): Extension<Viewer>) -> Response {
    render_not_found_response(viewer.context())
}
