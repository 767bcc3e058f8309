//! Session resolution and the login guard for state-changing routes.
//!
//! Sessions are created by an external authentication frontend; this
//! layer only resolves the session cookie to a user row. An invalid or
//! missing cookie downgrades the request to anonymous rather than
//! failing it; the guard on protected routes turns anonymous into a
//! login redirect.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;
use url::form_urlencoded::Serializer;

use crate::application::error::ErrorReport;
use crate::domain::entities::UserRecord;
use crate::presentation::views::ViewerContext;

use super::public::HttpState;

pub const SESSION_COOKIE: &str = "lenta_session";

/// The resolved viewer of the current request, attached as an extension
/// by `resolve_viewer`.
#[derive(Clone)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }

    pub fn context(&self) -> ViewerContext {
        match &self.0 {
            Some(user) => ViewerContext::named(user.username.clone()),
            None => ViewerContext::anonymous(),
        }
    }
}

/// Resolve the session cookie into a `Viewer` extension. Session lookup
/// failures are logged and treated as anonymous so a database hiccup on
/// the sessions table does not take down public pages.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = match session_token(request.headers()) {
        Some(token) => match state.sessions.find_user_by_token(&token).await {
            Ok(user) => user,
            Err(err) => {
                warn!(
                    target = "lenta::http::auth",
                    error = %err,
                    "session lookup failed; treating request as anonymous"
                );
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(Viewer(user));
    next.run(request).await
}

/// Reject anonymous requests on protected routes with a redirect into
/// the external login flow, preserving the original path.
pub async fn require_login(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<Viewer>() {
        Some(viewer) if viewer.user().is_some() => next.run(request).await,
        _ => login_redirect(request.uri()),
    }
}

pub fn login_redirect(uri: &Uri) -> Response {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(uri.path());
    let query = Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let target = format!("/auth/login?{query}");
    let mut response = Redirect::to(&target).into_response();
    ErrorReport::from_message(
        "infra::http::auth::require_login",
        StatusCode::SEE_OTHER,
        "login required",
    )
    .attach(&mut response);
    response
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_token_extracted_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; lenta_session=abc123; lang=ru"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("lenta_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn missing_cookie_header_yields_no_token() {
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn login_redirect_preserves_path_and_query() {
        let uri: Uri = "/posts/42/comment?page=2".parse().expect("uri");
        let response = login_redirect(&uri);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        assert_eq!(location, "/auth/login?next=%2Fposts%2F42%2Fcomment%3Fpage%3D2");
    }

    #[test]
    fn login_redirect_round_trips_through_query_decoding() {
        let uri: Uri = "/posts/42/edit?page=2&tab=a+b".parse().expect("uri");
        let response = login_redirect(&uri);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header");

        let query = location.split_once('?').expect("query").1;
        let next = url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == "next")
            .map(|(_, value)| value.into_owned())
            .expect("next parameter");
        assert_eq!(next, "/posts/42/edit?page=2&tab=a+b");
    }
}
