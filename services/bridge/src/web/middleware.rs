//! services/bridge/src/web/middleware.rs
//!
//! Authentication middleware for protecting the service routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::web::state::AppState;

/// Requires `Authorization: Bearer <BRIDGE_API_KEY>` when a key is configured.
///
/// With no key configured every request passes through.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !key_matches(header, expected) {
        warn!(path = %req.uri().path(), "Rejected service call with a missing or wrong API key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}

/// Checks an `Authorization` header value against the configured key.
///
/// The scheme is matched case-insensitively and the token in constant time.
fn key_matches(header: Option<&str>, expected: &str) -> bool {
    let Some((scheme, token)) = header.and_then(|v| v.trim().split_once(' ')) else {
        return false;
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return false;
    }
    let token = token.trim().as_bytes();
    let expected = expected.as_bytes();
    token.len() == expected.len() && token.ct_eq(expected).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert!(key_matches(Some("Bearer letmein"), "letmein"));
        assert!(key_matches(Some("bearer letmein"), "letmein"));
        assert!(key_matches(Some("BEARER  letmein "), "letmein"));
    }

    #[test]
    fn wrong_or_missing_keys_are_rejected() {
        assert!(!key_matches(None, "letmein"));
        assert!(!key_matches(Some("letmein"), "letmein"));
        assert!(!key_matches(Some("Basic letmein"), "letmein"));
        assert!(!key_matches(Some("Bearer letmeout"), "letmein"));
        assert!(!key_matches(Some("Bearer letmein2"), "letmein"));
        assert!(!key_matches(Some("Bearer "), "letmein"));
    }
}
