use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;
use infra::Store;

/// Validates a `Bearer` token when one is present and stores its claims in the
/// request extensions. Requests without a token pass through; handlers that need
/// a caller use [`crate::auth::AuthUser`].
pub async fn jwt_middleware<S: Store>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(auth_header) = request.headers().get(AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let claims = state.jwt_service().verify_token(token)?;
                request.extensions_mut().insert::<Claims>(claims);
            }
        }
    }

    Ok(next.run(request).await)
}
