use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{Actor, Claims};
use crate::error::AppError;

/// Extractor for routes that require a logged-in caller. The JWT middleware has
/// already verified the token; this only turns its claims into an [`Actor`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().ok_or_else(|| {
            AppError::Unauthorized("You must be logged in to perform this action".to_string())
        })?;

        Ok(AuthUser(Actor::try_from(claims)?))
    }
}
