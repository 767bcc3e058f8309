//! Follow graph handlers: the following feed and edge mutations.

use axum::{
    Extension,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{error::HttpError, follows::FollowError},
    presentation::views::{FeedPageView, FollowTemplate, render_not_found_response, render_template_response},
};

use super::{
    auth::{Viewer, login_redirect},
    public::{HttpState, PageQuery},
};

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let Some(user) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };

    match state.feed.follow_index(user.id, query.number()).await {
        Ok(context) => render_template_response(
            FollowTemplate {
                viewer: viewer.context(),
                feed: FeedPageView::from_page(context.page, "/follow"),
            },
            StatusCode::OK,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn follow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    let Some(follower) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };

    match state.follows.follow(&follower, &username).await {
        Ok(()) => Redirect::to("/follow").into_response(),
        Err(FollowError::AuthorNotFound) => render_not_found_response(viewer.context()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Unlike `follow`, unfollowing an author the viewer does not follow is
/// an error and renders the not-found page.
pub(super) async fn unfollow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    let Some(follower) = viewer.user().cloned() else {
        return login_redirect(&uri);
    };

    match state.follows.unfollow(&follower, &username).await {
        Ok(()) => Redirect::to("/follow").into_response(),
        Err(FollowError::AuthorNotFound) | Err(FollowError::FollowNotFound) => {
            render_not_found_response(viewer.context())
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}
