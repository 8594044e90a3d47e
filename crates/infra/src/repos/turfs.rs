use std::collections::HashMap;

use sqlx::{PgConnection, PgExecutor, Result};
use uuid::Uuid;

use crate::models::{Slot, TurfRow};

const TURF_COLUMNS: &str =
    "id, owner_id, name, price, description, address, city, state, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateTurf {
    pub owner_id: Uuid,
    pub name: String,
    pub price: i32,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTurf {
    pub name: Option<String>,
    pub price: Option<i32>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TurfFilter {
    pub owner_id: Option<Uuid>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SlotWithTurf {
    turf_id: Uuid,
    #[sqlx(flatten)]
    slot: Slot,
}

async fn load_slots(conn: &mut PgConnection, turfs: &mut [TurfRow]) -> Result<()> {
    if turfs.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = turfs.iter().map(|t| t.id).collect();

    let rows = sqlx::query_as::<_, SlotWithTurf>(
        "SELECT turf_id, label, booked FROM turf_slots WHERE turf_id = ANY($1) ORDER BY position ASC",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_turf: HashMap<Uuid, Vec<Slot>> = HashMap::new();
    for row in rows {
        by_turf.entry(row.turf_id).or_default().push(row.slot);
    }
    for turf in turfs.iter_mut() {
        turf.slots = by_turf.remove(&turf.id).unwrap_or_default();
    }
    Ok(())
}

/// Insert a turf and its slots. Run inside a transaction.
pub async fn create(conn: &mut PgConnection, data: CreateTurf) -> Result<TurfRow> {
    let mut turf = sqlx::query_as::<_, TurfRow>(&format!(
        r#"
        INSERT INTO turfs (owner_id, name, price, description, address, city, state)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {TURF_COLUMNS}
        "#
    ))
    .bind(data.owner_id)
    .bind(&data.name)
    .bind(data.price)
    .bind(&data.description)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.state)
    .fetch_one(&mut *conn)
    .await?;

    for (position, label) in data.slots.iter().enumerate() {
        insert_slot(&mut *conn, turf.id, label, position as i32, false).await?;
    }
    load_slots(conn, std::slice::from_mut(&mut turf)).await?;

    Ok(turf)
}

pub async fn get_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<TurfRow>> {
    let turf = sqlx::query_as::<_, TurfRow>(&format!(
        "SELECT {TURF_COLUMNS} FROM turfs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    with_slots(conn, turf).await
}

/// Lock the turf row for the rest of the transaction. Every slot mutation goes through this lock.
pub async fn get_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<TurfRow>> {
    let turf = sqlx::query_as::<_, TurfRow>(&format!(
        "SELECT {TURF_COLUMNS} FROM turfs WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    with_slots(conn, turf).await
}

async fn with_slots(conn: &mut PgConnection, turf: Option<TurfRow>) -> Result<Option<TurfRow>> {
    match turf {
        Some(mut turf) => {
            load_slots(conn, std::slice::from_mut(&mut turf)).await?;
            Ok(Some(turf))
        }
        None => Ok(None),
    }
}

pub async fn list(conn: &mut PgConnection, filter: &TurfFilter) -> Result<Vec<TurfRow>> {
    let mut query = sqlx::QueryBuilder::new(format!("SELECT {TURF_COLUMNS} FROM turfs WHERE 1=1"));

    if let Some(owner_id) = filter.owner_id {
        query.push(" AND owner_id = ");
        query.push_bind(owner_id);
    }

    if let Some(city) = &filter.city {
        query.push(" AND LOWER(city) = ");
        query.push_bind(city.to_lowercase());
    }

    if let Some(state) = &filter.state {
        query.push(" AND LOWER(state) = ");
        query.push_bind(state.to_lowercase());
    }

    query.push(" ORDER BY created_at DESC");

    let mut turfs: Vec<TurfRow> = query
        .build_query_as::<TurfRow>()
        .fetch_all(&mut *conn)
        .await?;

    load_slots(conn, &mut turfs).await?;
    Ok(turfs)
}

pub async fn distinct_states<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT state FROM turfs WHERE state IS NOT NULL AND state <> '' ORDER BY state",
    )
    .fetch_all(executor)
    .await
}

pub async fn distinct_cities<'e>(executor: impl PgExecutor<'e>, state: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT city FROM turfs
        WHERE LOWER(state) = $1 AND city IS NOT NULL AND city <> ''
        ORDER BY city
        "#,
    )
    .bind(state.to_lowercase())
    .fetch_all(executor)
    .await
}

pub async fn update(conn: &mut PgConnection, id: Uuid, data: UpdateTurf) -> Result<Option<TurfRow>> {
    let turf = sqlx::query_as::<_, TurfRow>(&format!(
        r#"
        UPDATE turfs
        SET name = COALESCE($2, name),
            price = COALESCE($3, price),
            description = COALESCE($4, description),
            address = COALESCE($5, address),
            city = COALESCE($6, city),
            state = COALESCE($7, state),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {TURF_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&data.name)
    .bind(data.price)
    .bind(&data.description)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.state)
    .fetch_optional(&mut *conn)
    .await?;

    with_slots(conn, turf).await
}

pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM turfs WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_slot<'e>(
    executor: impl PgExecutor<'e>,
    turf_id: Uuid,
    label: &str,
    position: i32,
    booked: bool,
) -> Result<()> {
    sqlx::query("INSERT INTO turf_slots (turf_id, label, booked, position) VALUES ($1, $2, $3, $4)")
        .bind(turf_id)
        .bind(label)
        .bind(booked)
        .bind(position)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn next_slot_position<'e>(executor: impl PgExecutor<'e>, turf_id: Uuid) -> Result<i32> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM turf_slots WHERE turf_id = $1",
    )
    .bind(turf_id)
    .fetch_one(executor)
    .await
}

pub async fn delete_slot<'e>(executor: impl PgExecutor<'e>, turf_id: Uuid, label: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM turf_slots WHERE turf_id = $1 AND label = $2")
        .bind(turf_id)
        .bind(label)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false when the slot no longer exists.
pub async fn set_slot_booked<'e>(
    executor: impl PgExecutor<'e>,
    turf_id: Uuid,
    label: &str,
    booked: bool,
) -> Result<bool> {
    let result = sqlx::query("UPDATE turf_slots SET booked = $3 WHERE turf_id = $1 AND label = $2")
        .bind(turf_id)
        .bind(label)
        .bind(booked)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
