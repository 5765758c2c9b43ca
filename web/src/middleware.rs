//! Request correlation and the boundary fallback.
//!
//! Every request gets an `X-Correlation-ID` (taken from the request or freshly
//! generated), a tracing span carrying it, and the same header on the response.

use crate::error::AppError;
use helpdesk_core::TicketError;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id of a request, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

/// Tag the request and its response with a correlation id.
pub async fn correlation_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    request.extensions_mut().insert(CorrelationId(id));

    let span = tracing::info_span!(
        "request",
        correlation_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
        user_id = tracing::field::Empty,
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }
    response
}

/// Answer for every route the router does not know.
///
/// Indistinguishable from an access denial, so a prober cannot tell a missing
/// route from a refused one.
#[allow(clippy::unused_async)]
pub async fn deny_unknown_route() -> AppError {
    TicketError::forbidden("access denied").into()
}
