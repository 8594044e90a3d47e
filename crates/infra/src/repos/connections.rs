use chrono::NaiveDate;
use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::{ConnectionRow, ConnectionStatus};

const CONNECTION_COLUMNS: &str = "id, turf, date, created_by, max_players, players, sport, contact_number, email, message, status, created_at";

#[derive(Debug, Clone)]
pub struct CreateConnection {
    pub turf: String,
    pub date: NaiveDate,
    pub created_by: Uuid,
    pub max_players: i32,
    pub sport: String,
    pub contact_number: String,
    pub email: String,
    pub message: String,
    pub status: ConnectionStatus,
}

/// The creator is always the first player.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    data: &CreateConnection,
) -> Result<ConnectionRow> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        r#"
        INSERT INTO connections (turf, date, created_by, max_players, players, sport, contact_number, email, message, status)
        VALUES ($1, $2, $3, $4, ARRAY[$3]::UUID[], $5, $6, $7, $8, $9)
        RETURNING {CONNECTION_COLUMNS}
        "#
    ))
    .bind(&data.turf)
    .bind(data.date)
    .bind(data.created_by)
    .bind(data.max_players)
    .bind(&data.sport)
    .bind(&data.contact_number)
    .bind(&data.email)
    .bind(&data.message)
    .bind(data.status)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<ConnectionRow>> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<ConnectionRow>> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn update_players<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    players: &[Uuid],
    status: ConnectionStatus,
) -> Result<ConnectionRow> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        r#"
        UPDATE connections SET players = $2, status = $3
        WHERE id = $1
        RETURNING {CONNECTION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(players)
    .bind(status)
    .fetch_one(executor)
    .await
}

pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM connections WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_open<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<ConnectionRow>> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM connections WHERE status = 'open' ORDER BY created_at DESC"
    ))
    .fetch_all(executor)
    .await
}

/// Connections the user created or joined.
pub async fn list_for_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Vec<ConnectionRow>> {
    sqlx::query_as::<_, ConnectionRow>(&format!(
        r#"
        SELECT {CONNECTION_COLUMNS}
        FROM connections
        WHERE created_by = $1 OR $1 = ANY(players)
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await
}
