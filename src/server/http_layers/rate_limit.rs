//! Rate limiting for the credential endpoints, built on tower-governor.
//!
//! Login and register are limited per client IP; everything else rides on
//! the request logging middleware's metrics without throttling.

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tower_governor::{key_extractor::KeyExtractor, GovernorError};
use tracing::warn;

/// Sustained login/register attempts per second per IP
pub const LOGIN_PER_SECOND: u64 = 2;

/// Burst allowance on top of the sustained login rate
pub const LOGIN_BURST: u32 = 10;

/// Extracts the peer IP address from ConnectInfo for IP-based limiting
#[derive(Clone)]
pub struct IpKeyExtractor;

impl KeyExtractor for IpKeyExtractor {
    type Key = SocketAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Logs violations and maps governor errors to responses
pub fn rate_limit_error_handler(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { .. } => {
            warn!("Rate limit exceeded on credential endpoint");
            StatusCode::TOO_MANY_REQUESTS.into_response()
        }
        other => {
            warn!("Rate limiting error: {:?}", other);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
