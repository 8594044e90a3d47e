use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::payment_service::{CheckoutRequest, PaymentError, PaymentService};
use crate::state::AppState;
use infra::models::BookingRow;
use infra::Store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub booking_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
    pub booking_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentBody {
    pub session_id: String,
}

fn payments<S: Store>(state: &AppState<S>) -> Result<&PaymentService, AppError> {
    state
        .payment_service()
        .ok_or_else(|| AppError::Unavailable("Payments are not configured".to_string()))
}

fn processor_unavailable(e: PaymentError) -> AppError {
    error!("Payment processor error: {}", e);
    AppError::Unavailable("Payment processor is unavailable, please retry".to_string())
}

/// POST /payments/checkout
pub async fn checkout<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let (booking, turf) = state.reservations().payable(&actor, body.booking_id).await?;

    let session = payments(&state)?
        .create_session(&CheckoutRequest {
            booking_id: booking.id,
            amount_minor: i64::from(turf.price) * 100,
            product_name: turf.name.clone(),
            description: format!("Booking slot: {} on {}", booking.slot, booking.date),
        })
        .await
        .map_err(processor_unavailable)?;

    state
        .reservations()
        .attach_payment_session(&actor, booking.id, &session.session_id)
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.session_id,
        url: session.redirect_url,
        booking_id: booking.id,
    }))
}

/// POST /payments/confirm
///
/// Called by the frontend after the processor redirects back. The session is
/// looked up at the processor, so the caller's word is never trusted.
pub async fn confirm_payment<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<ConfirmPaymentBody>,
) -> Result<Json<BookingRow>, AppError> {
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::BadRequest("sessionId is required".to_string()));
    }

    let session = payments(&state)?
        .retrieve_session(session_id)
        .await
        .map_err(processor_unavailable)?;

    if !session.is_paid() {
        warn!(session_id = %session.id, status = %session.payment_status, "Payment not completed");
        return Err(AppError::BadRequest("Payment has not been completed".to_string()));
    }

    let booking_id = session.booking_id().ok_or_else(|| {
        AppError::BadRequest("Payment session is not linked to a booking".to_string())
    })?;

    let booking = state
        .reservations()
        .mark_paid(booking_id, Some(&session.id))
        .await?;

    Ok(Json(booking))
}
