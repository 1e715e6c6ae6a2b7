//! Response rewriting middleware
//!
//! - `asset_middleware`: rewrites HTML, ajax JSON and CSS bodies
//! - `response_headers_middleware`: default domain redirect, robots and CORS headers

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{
        header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST, LOCATION, ORIGIN},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::stream::{self, StreamExt};

use crate::core::ContentKind;
use crate::parsers::html::charset_from_content_type;
use crate::response::ROBOTS_HEADER_VALUE;
use crate::site_prefix::RequestContext;

use super::types::AppState;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or_default().trim())
        .filter(|value| !value.is_empty())
}

/// Host the client used: `X-Forwarded-Host`, then `Host`, then the URI.
pub fn request_host(request: &Request) -> String {
    header_str(request.headers(), X_FORWARDED_HOST)
        .or_else(|| header_str(request.headers(), HOST.as_str()))
        .or_else(|| request.uri().host())
        .unwrap_or("localhost")
        .to_string()
}

/// Builds the per-request context the rewrite engine works with.
pub fn request_context(request: &Request) -> RequestContext {
    let scheme = header_str(request.headers(), X_FORWARDED_PROTO)
        .or_else(|| request.uri().scheme_str())
        .unwrap_or("http");

    RequestContext::new(request.uri().path(), scheme, &request_host(request))
}

pub async fn asset_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.manager.is_active() {
        return next.run(request).await;
    }

    let ctx = request_context(&request);
    let is_get = request.method() == Method::GET;
    let response = next.run(request).await;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let kind = ContentKind::from_content_type(&content_type);
    let rewritable = match kind {
        ContentKind::Html | ContentKind::Css => is_get,
        ContentKind::Json => true,
        ContentKind::Xml | ContentKind::Other => false,
    };

    if !rewritable
        || is_encoded(response.headers())
        || is_too_large(response.headers(), state.max_body_size)
        || response.body().size_hint().lower() > state.max_body_size as u64
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match buffer_body(body, state.max_body_size).await {
        Buffered::Complete(bytes) => bytes,
        Buffered::TooLarge(body) => {
            tracing::debug!(path = %ctx.path, "Response body over the size limit, not rewriting");
            return Response::from_parts(parts, body);
        }
        Buffered::Failed(e) => {
            tracing::error!(path = %ctx.path, "Failed to buffer response body: {}", e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    match state
        .manager
        .rewrite_body_as(kind, charset_from_content_type(&content_type), &bytes, &ctx)
    {
        Some(rewritten) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

enum Buffered {
    Complete(Bytes),
    /// The limit was hit; the body is rebuilt from what was read plus the rest.
    TooLarge(Body),
    Failed(axum::Error),
}

/// Reads `body` into memory up to `limit` bytes.
async fn buffer_body(body: Body, limit: usize) -> Buffered {
    let mut chunks = body.into_data_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Buffered::Failed(e),
        };

        if buffer.len() + chunk.len() > limit {
            let read: Vec<Result<Bytes, axum::Error>> = vec![Ok(Bytes::from(buffer)), Ok(chunk)];
            return Buffered::TooLarge(Body::from_stream(stream::iter(read).chain(chunks)));
        }
        buffer.extend_from_slice(&chunk);
    }

    Buffered::Complete(Bytes::from(buffer))
}

fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|encoding| !encoding.eq_ignore_ascii_case("identity"))
}

fn is_too_large(headers: &HeaderMap, max_body_size: usize) -> bool {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
        .is_some_and(|length| length > max_body_size)
}

pub async fn response_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let host = request_host(&request);
    let origin = header_str(request.headers(), ORIGIN.as_str()).map(str::to_string);

    let mut response = next.run(request).await;

    if !response.status().is_redirection() {
        if let Some(location) = state.policy.redirect_location(&host, &path, query.as_deref()) {
            match HeaderValue::from_str(&location) {
                Ok(location) => {
                    tracing::debug!(host = %host, "Redirecting to the default proxy domain");
                    response = (StatusCode::FOUND, [(LOCATION, location)]).into_response();
                }
                Err(e) => tracing::warn!("Invalid redirect location '{}': {}", location, e),
            }
        }
    }

    if state.policy.robots_header(&path) {
        response
            .headers_mut()
            .insert(X_ROBOTS_TAG, HeaderValue::from_static(ROBOTS_HEADER_VALUE));
    }

    if let Some(origin) = origin.filter(|origin| state.policy.allows_origin(origin)) {
        if let Ok(value) = HeaderValue::from_str(&origin) {
            response
                .headers_mut()
                .insert("access-control-allow-origin", value);
        }
    }

    response
}
