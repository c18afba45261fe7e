//! Request correlation ids.
//!
//! An id forwarded by the proxy in `x-request-id` is reused when it looks
//! sane; otherwise a UUID v4 is minted. The id is recorded on the request
//! span, tagged on the Sentry scope, exposed to handlers as [`RequestId`]
//! and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_FORWARDED_LEN: usize = 128;

/// The id assigned to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Accept a forwarded id only if it is short, non-empty visible ASCII.
fn forwarded_id(value: &HeaderValue) -> Option<String> {
    let value = value.to_str().ok()?.trim();
    let sane = !value.is_empty()
        && value.len() <= MAX_FORWARDED_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    sane.then(|| value.to_owned())
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(forwarded_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
