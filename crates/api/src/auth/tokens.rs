use chrono::{Duration, Utc};
use rand::distr::Alphanumeric;
use rand::RngExt;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use infra::models::TokenPurpose;
use infra::repos::CreateUserToken;
use infra::Store;

/// Only the SHA-256 of a one-time token is stored; the raw value goes out by mail.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_raw_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Issues a fresh token for `purpose`, superseding any unused one, and returns the raw value.
pub async fn issue_token<S: Store>(
    store: &S,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl: Duration,
) -> Result<String, AppError> {
    let raw_token = generate_raw_token();

    store
        .create_user_token(CreateUserToken {
            user_id,
            purpose,
            token_hash: hash_token(&raw_token),
            expires_at: Utc::now() + ttl,
        })
        .await?;

    Ok(raw_token)
}

/// Consumes a raw token. `None` when it is unknown, used or expired.
pub async fn redeem_token<S: Store>(
    store: &S,
    raw_token: &str,
    purpose: TokenPurpose,
) -> Result<Option<Uuid>, AppError> {
    Ok(store
        .consume_user_token(&hash_token(raw_token), purpose)
        .await?)
}
