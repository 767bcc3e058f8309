//! Request correlation and response outcome logging.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const LOG_TARGET: &str = "lenta::http::response";

/// Correlation data assigned before any handler runs and mirrored onto
/// the response for downstream consumers.
#[derive(Clone, Copy)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub started: Instant,
}

impl RequestContext {
    fn assign() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started: Instant::now(),
        }
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::assign();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log every response outcome: served pages at debug, client errors at
/// warn, server errors at error. Failure events drain the `ErrorReport`
/// a handler attached so diagnostics reach the log without reaching the
/// client.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .copied()
        .unwrap_or_else(RequestContext::assign);

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = ctx.started.elapsed().as_millis() as u64;

    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms = elapsed_ms,
            request_id = %ctx.request_id,
            "request served",
        );
        return response;
    }

    let (source, detail, chain) =
        failure_details(response.extensions_mut().remove::<ErrorReport>());

    if status.is_server_error() {
        error!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?chain,
            request_id = %ctx.request_id,
            "request failed",
        );
    } else {
        warn!(
            target = LOG_TARGET,
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?chain,
            request_id = %ctx.request_id,
            "client request error",
        );
    }

    response
}

fn failure_details(report: Option<ErrorReport>) -> (&'static str, String, Vec<String>) {
    let Some(report) = report else {
        return ("unknown", "no diagnostic available".to_string(), Vec::new());
    };

    let detail = report
        .messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());
    (report.source, detail, report.messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn failure_details_prefer_the_outermost_message() {
        let report = ErrorReport::from_message(
            "infra::http::test",
            StatusCode::INTERNAL_SERVER_ERROR,
            "top-level failure",
        );
        let (source, detail, chain) = failure_details(Some(report));
        assert_eq!(source, "infra::http::test");
        assert_eq!(detail, "top-level failure");
        assert_eq!(chain, vec!["top-level failure".to_string()]);
    }

    #[test]
    fn missing_report_yields_placeholder_diagnostics() {
        let (source, detail, chain) = failure_details(None);
        assert_eq!(source, "unknown");
        assert_eq!(detail, "no diagnostic available");
        assert!(chain.is_empty());
    }
}
