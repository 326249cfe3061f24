//! Request plumbing shared by every route: ids and access logging, rate
//! limiting, body size checks and the 404 fallback.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::envelope::Envelope;
use crate::rate_limit::RateDecision;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Tags the request and response with a fresh id and writes one access log
/// line per request.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let value = HeaderValue::from_str(&id).ok();
    if let Some(value) = &value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(req).await;
    if let Some(value) = value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        request_id = %id,
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn set_rate_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
}

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    let decision = state.rate_limiter.check(&key).await;

    if !decision.allowed {
        tracing::warn!("rate limit exceeded for {key}");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Envelope::coded(
                "RATE_LIMITED",
                "Too many requests, please try again later.",
            ),
        )
            .into_response();
        set_rate_headers(response.headers_mut(), &decision);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after));
        return response;
    }

    let mut response = next.run(req).await;
    set_rate_headers(response.headers_mut(), &decision);
    response
}

/// Rejects declared bodies over the configured limit before they are read.
/// Chunked bodies are capped by `DefaultBodyLimit` at extraction time.
pub async fn limit_body(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if declared.is_some_and(|len| len > state.settings.body_limit) {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Envelope::coded(
                "PAYLOAD_TOO_LARGE",
                format!("Request body exceeds {} bytes", state.settings.body_limit),
            ),
        )
            .into_response();
    }
    next.run(req).await
}

pub async fn not_found(method: Method, uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Envelope::coded(
            "NOT_FOUND",
            format!("Route {} {} not found", method, uri.path()),
        ),
    )
        .into_response()
}
