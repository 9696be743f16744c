use super::state::ServerState;
use crate::user::{Role, SessionTokenValue, UserIdentity};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// The resolved caller of a request. Handlers take this by value; nothing in
/// the core ever reaches for ambient "current user" state.
#[derive(Debug)]
pub struct Session {
    pub identity: UserIdentity,
    pub token: String,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.identity.id
    }

    pub fn is_admin(&self) -> bool {
        self.identity.role == Role::Admin
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    CookieJar::from_request_parts(parts, ctx)
        .await
        .ok()?
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| v.as_bytes().to_owned())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No session token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let token_value = SessionTokenValue(token.clone());
    let session_token = match ctx.accounts.get_session(&token_value) {
        Ok(Some(session_token)) => {
            // Update last_used; not critical for authentication, continue on
            // failure
            if let Err(e) = ctx.accounts.touch_session(&token_value) {
                debug!("Failed to update session token last_used: {}", e);
            }
            session_token
        }
        Ok(None) => {
            debug!("Session token not found in database");
            return None;
        }
        Err(e) => {
            debug!("Failed to read session token: {}", e);
            return None;
        }
    };

    let identity = match ctx.user_store.find_by_id(&session_token.user_id) {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            debug!(
                "Session token {} points at a deleted identity",
                session_token.user_id
            );
            return None;
        }
        Err(e) => {
            debug!("Failed to resolve session identity: {}", e);
            return None;
        }
    };

    Some(Session {
        identity,
        token: session_token.value.0,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}
