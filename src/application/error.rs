use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::feed::FeedError, application::follows::FollowError, infra::error::InfraError,
};

/// Diagnostic chain attached to error responses so the logging
/// middleware can report failures without leaking detail to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::GroupNotFound => HttpError::new(
                "application::error::feed_error",
                StatusCode::NOT_FOUND,
                "Group not found",
                "Requested group slug did not match any group",
            ),
            FeedError::AuthorNotFound => HttpError::new(
                "application::error::feed_error",
                StatusCode::NOT_FOUND,
                "Author not found",
                "Requested username did not match any user",
            ),
            FeedError::PostNotFound => HttpError::new(
                "application::error::feed_error",
                StatusCode::NOT_FOUND,
                "Post not found",
                "Requested post id did not match any post",
            ),
            FeedError::Repo(err) => HttpError::from_error(
                "application::error::feed_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            ),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        match error {
            FollowError::AuthorNotFound => HttpError::new(
                "application::error::follow_error",
                StatusCode::NOT_FOUND,
                "Author not found",
                "Follow target username did not match any user",
            ),
            FollowError::FollowNotFound => HttpError::new(
                "application::error::follow_error",
                StatusCode::NOT_FOUND,
                "Follow edge not found",
                "Unfollow requested for an author the viewer does not follow",
            ),
            FollowError::Repo(err) => HttpError::from_error(
                "application::error::follow_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            ),
        }
    }
}

/// Top-level failure type for the binary's startup and serve loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
