//! HTTP caching middleware
#![allow(dead_code)] // Used as middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::IntoResponse};

/// Stamps responses with a Cache-Control header. A max age of zero turns
/// into `no-store`, which is what test servers run with.
pub async fn http_cache(
    State(max_age_sec): State<usize>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let response = next.run(request).await.into_response();

    let header_value = if max_age_sec == 0 {
        "no-store".to_string()
    } else {
        format!("max-age={}", max_age_sec)
    };

    let (mut parts, body) = response.into_parts();
    parts
        .headers
        .insert("Cache-Control", header_value.parse().unwrap());

    axum::http::Response::from_parts(parts, body)
}
