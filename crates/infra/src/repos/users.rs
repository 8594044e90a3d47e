use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::{PlayerSummary, UserRole, UserRow};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, address, dob, gender, profile_pic_url, is_profile_complete, is_verified, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn summaries_by_ids<'e>(
    executor: impl PgExecutor<'e>,
    ids: &[Uuid],
) -> Result<Vec<PlayerSummary>> {
    sqlx::query_as::<_, PlayerSummary>("SELECT id, name, email FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Emails are stored lowercase; callers normalise before lookup.
pub async fn get_by_email<'e>(
    executor: impl PgExecutor<'e>,
    email: &str,
) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateUser) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>(&format!(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.password_hash)
    .bind(data.role)
    .fetch_one(executor)
    .await
}

/// Persist every mutable field of `user`.
pub async fn save<'e>(executor: impl PgExecutor<'e>, user: &UserRow) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>(&format!(
        r#"
        UPDATE users
        SET name = $2,
            email = $3,
            password_hash = $4,
            role = $5,
            phone = $6,
            address = $7,
            dob = $8,
            gender = $9,
            profile_pic_url = $10,
            is_profile_complete = $11,
            is_verified = $12,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(user.dob)
    .bind(user.gender)
    .bind(&user.profile_pic_url)
    .bind(user.is_profile_complete)
    .bind(user.is_verified)
    .fetch_one(executor)
    .await
}
