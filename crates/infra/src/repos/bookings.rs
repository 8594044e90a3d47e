use chrono::NaiveDate;
use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::{BookingRow, BookingStatus, OwnerBookingRow, UserBookingRow};

const BOOKING_COLUMNS: &str = "id, turf_id, user_id, user_name, user_email, user_phone, date, slot, status, payment_session_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub turf_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub date: NaiveDate,
    pub slot: String,
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, data: &CreateBooking) -> Result<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        INSERT INTO bookings (turf_id, user_id, user_name, user_email, user_phone, date, slot, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(data.turf_id)
    .bind(data.user_id)
    .bind(&data.user_name)
    .bind(&data.user_email)
    .bind(&data.user_phone)
    .bind(data.date)
    .bind(&data.slot)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// The booking currently holding (turf, date, slot), if any.
pub async fn find_active<'e>(
    executor: impl PgExecutor<'e>,
    turf_id: Uuid,
    date: NaiveDate,
    slot: &str,
) -> Result<Option<BookingRow>> {
    sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE turf_id = $1 AND date = $2 AND slot = $3 AND status <> 'cancelled'
        "#
    ))
    .bind(turf_id)
    .bind(date)
    .bind(slot)
    .fetch_optional(executor)
    .await
}

/// Active bookings for a slot label across all dates.
pub async fn count_active_for_slot<'e>(
    executor: impl PgExecutor<'e>,
    turf_id: Uuid,
    slot: &str,
) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE turf_id = $1 AND slot = $2 AND status <> 'cancelled'",
    )
    .bind(turf_id)
    .bind(slot)
    .fetch_one(executor)
    .await
}

pub async fn active_slots_on<'e>(
    executor: impl PgExecutor<'e>,
    turf_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT slot FROM bookings WHERE turf_id = $1 AND date = $2 AND status <> 'cancelled'",
    )
    .bind(turf_id)
    .bind(date)
    .fetch_all(executor)
    .await
}

pub async fn update_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: BookingStatus,
) -> Result<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        UPDATE bookings SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_one(executor)
    .await
}

pub async fn set_payment_session<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    session_id: &str,
) -> Result<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        UPDATE bookings SET payment_session_id = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(session_id)
    .fetch_one(executor)
    .await
}

pub async fn list_for_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Vec<UserBookingRow>> {
    sqlx::query_as::<_, UserBookingRow>(
        r#"
        SELECT b.id, b.turf_id, b.user_id, b.user_name, b.user_email, b.user_phone, b.date, b.slot,
               b.status, b.payment_session_id, b.created_at, b.updated_at,
               t.name AS turf_name, t.price AS turf_price, t.city AS turf_city
        FROM bookings b
        LEFT JOIN turfs t ON t.id = b.turf_id
        WHERE b.user_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Pending and confirmed bookings on turfs owned by `owner_id`.
pub async fn list_for_owner<'e>(
    executor: impl PgExecutor<'e>,
    owner_id: Uuid,
) -> Result<Vec<OwnerBookingRow>> {
    sqlx::query_as::<_, OwnerBookingRow>(
        r#"
        SELECT b.id, b.turf_id, b.user_id, b.user_name, b.user_email, b.user_phone, b.date, b.slot,
               b.status, b.payment_session_id, b.created_at, b.updated_at,
               t.name AS turf_name,
               u.name AS account_name, u.email AS account_email, u.phone AS account_phone
        FROM bookings b
        JOIN turfs t ON t.id = b.turf_id
        LEFT JOIN users u ON u.id = b.user_id
        WHERE t.owner_id = $1 AND b.status IN ('pending', 'confirmed')
        ORDER BY b.date ASC, b.slot ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}
