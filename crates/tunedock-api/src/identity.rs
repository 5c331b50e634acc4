//! Caller identity resolution and admin authorization.
//!
//! Callers are identified by the `x-client-id` header; the raw hint is
//! sanitized before anything else sees it. Owner reassignment is a separate,
//! operator-only path authorized by the `x-admin-token` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use tunedock_core::sanitize::resolve_identity;

/// Request header carrying the caller's identity hint.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Request header carrying the operator admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Sanitized caller identity, resolved from the `x-client-id` header.
///
/// Resolution is total: a missing or unusable header resolves to the shared
/// public identity, never to a rejection.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub String);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let hint = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(CallerIdentity(resolve_identity(hint)))
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check the `x-admin-token` header against the configured token.
///
/// An unconfigured token refuses everyone; there is no default credential.
pub fn admin_token_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| secure_compare(provided, expected))
}
