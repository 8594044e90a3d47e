use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Result, Row};
use uuid::Uuid;

use crate::models::TokenPurpose;

#[derive(Debug, Clone)]
pub struct CreateUserToken {
    pub user_id: Uuid,
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: &CreateUserToken) -> Result<Uuid> {
    let row = sqlx::query(
        "INSERT INTO user_tokens (user_id, purpose, token_hash, expires_at) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(data.user_id)
    .bind(data.purpose)
    .bind(&data.token_hash)
    .bind(data.expires_at)
    .fetch_one(executor)
    .await?;

    Ok(row.get("id"))
}

/// Marks a valid token used and returns its owner. A token can only be consumed once.
pub async fn consume_valid<'e>(
    executor: impl PgExecutor<'e>,
    token_hash: &str,
    purpose: TokenPurpose,
) -> Result<Option<Uuid>> {
    let row = sqlx::query(
        r#"
        UPDATE user_tokens
        SET used_at = NOW()
        WHERE token_hash = $1 AND purpose = $2 AND used_at IS NULL AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(token_hash)
    .bind(purpose)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|r| r.get("user_id")))
}

pub async fn invalidate_for_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    purpose: TokenPurpose,
) -> Result<()> {
    sqlx::query(
        "UPDATE user_tokens SET used_at = NOW() WHERE user_id = $1 AND purpose = $2 AND used_at IS NULL",
    )
    .bind(user_id)
    .bind(purpose)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn delete_expired<'e>(executor: impl PgExecutor<'e>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM user_tokens WHERE expires_at < NOW()")
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
