use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::email_service::booking_confirmed_html;
use crate::services::reservations::{Contact, OwnerBookingView, ReserveRequest};
use crate::services::spawn_email;
use crate::state::AppState;
use infra::models::{BookingRow, UserBookingRow};
use infra::Store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveBody {
    pub turf_id: Uuid,
    pub date: NaiveDate,
    pub slot: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// POST /bookings
pub async fn reserve<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<ReserveBody>,
) -> Result<(StatusCode, Json<BookingRow>), AppError> {
    let booking = state
        .reservations()
        .reserve(
            &actor,
            ReserveRequest {
                turf_id: body.turf_id,
                date: body.date,
                slot: body.slot,
                contact: Contact {
                    name: body.name,
                    email: body.email,
                    phone: body.phone,
                },
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /bookings/mine
pub async fn list_mine<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<UserBookingRow>>, AppError> {
    Ok(Json(state.reservations().list_for_user(&actor).await?))
}

/// GET /bookings/owner
pub async fn list_for_owner<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<OwnerBookingView>>, AppError> {
    Ok(Json(state.reservations().list_for_owner(&actor).await?))
}

/// POST /bookings/{id}/cancel
pub async fn cancel<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingRow>, AppError> {
    Ok(Json(state.reservations().cancel(&actor, booking_id).await?))
}

/// POST /bookings/{id}/confirm
pub async fn confirm<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingRow>, AppError> {
    let booking = state.reservations().confirm(&actor, booking_id).await?;

    match (&booking.user_email, state.store.get_turf(booking.turf_id).await) {
        (Some(email), Ok(Some(turf))) => spawn_email(
            state.email_service().cloned(),
            email.clone(),
            "Your booking is confirmed".to_string(),
            booking_confirmed_html(
                booking.user_name.as_deref().unwrap_or("there"),
                &turf.name,
                &booking.date.to_string(),
                &booking.slot,
            ),
        ),
        _ => debug!(booking_id = %booking.id, "No confirmation mail sent"),
    }

    Ok(Json(booking))
}
