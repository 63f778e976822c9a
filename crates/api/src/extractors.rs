//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use ballotbox_common::AppError;
use ballotbox_core::Actor;

/// Authenticated voter extractor.
///
/// Rejects with `401 UNAUTHORIZED` when the auth middleware did not resolve
/// a bearer token.
#[derive(Debug, Clone)]
pub struct AuthVoter(pub Actor);

impl<S> FromRequestParts<S> for AuthVoter
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthVoter)
            .ok_or(AppError::Unauthorized)
    }
}
