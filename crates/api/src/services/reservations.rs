//! Reservation coordinator: the only code path that creates bookings or moves
//! them between statuses.
//!
//! Every mutation is a single store transaction that locks the booking row
//! (when there is one) and then the turf row, so two requests for the same
//! (turf, date, slot) can never both succeed and a failed request leaves no
//! partial writes behind.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::permissions::{can_manage_turf, owns_booking};
use crate::auth::Actor;
use crate::config::StoreConfig;
use crate::error::AppError;
use crate::services::retry::run_with_retry;
use infra::models::{BookingRow, BookingStatus, OwnerBookingRow, Slot, TurfRow, UserBookingRow};
use infra::repos::CreateBooking;
use infra::{Store, StoreError, StoreTx};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub turf_id: Uuid,
    pub date: NaiveDate,
    pub slot: String,
    pub contact: Contact,
}

/// A pending or confirmed booking as shown to the owner of the turf.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerBookingView {
    pub id: Uuid,
    pub turf_id: Uuid,
    pub turf_name: String,
    pub date: NaiveDate,
    pub slot: String,
    pub status: BookingStatus,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
}

impl From<OwnerBookingRow> for OwnerBookingView {
    fn from(row: OwnerBookingRow) -> Self {
        fn pick(own: Option<String>, account: Option<String>) -> String {
            own.filter(|v| !v.trim().is_empty())
                .or(account.filter(|v| !v.trim().is_empty()))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }

        Self {
            id: row.booking.id,
            turf_id: row.booking.turf_id,
            turf_name: row.turf_name,
            date: row.booking.date,
            slot: row.booking.slot,
            status: row.booking.status,
            user_name: pick(row.booking.user_name, row.account_name),
            user_email: pick(row.booking.user_email, row.account_email),
            user_phone: pick(row.booking.user_phone, row.account_phone),
        }
    }
}

/// Outcome of checking a requested status change against the booking lifecycle.
#[derive(Debug, PartialEq, Eq)]
enum Transition {
    Apply,
    /// The booking is already in the requested state and re-applying it is harmless.
    Unchanged,
}

fn check_transition(from: BookingStatus, to: BookingStatus) -> Result<Transition, AppError> {
    use BookingStatus::*;

    match (from, to) {
        (Pending, Confirmed | Paid | Cancelled) | (Confirmed, Paid | Cancelled) => {
            Ok(Transition::Apply)
        }
        (Confirmed, Confirmed) | (Paid, Paid) => Ok(Transition::Unchanged),
        (Cancelled, Cancelled) => Err(AppError::Conflict(
            "Booking is already cancelled".to_string(),
        )),
        (Cancelled, _) => Err(AppError::Conflict("Booking is cancelled".to_string())),
        (Paid, Cancelled) => Err(AppError::Conflict(
            "Paid bookings cannot be cancelled".to_string(),
        )),
        (Paid, _) => Err(AppError::Conflict("Booking is already paid".to_string())),
        (from, to) => Err(AppError::Conflict(format!(
            "Cannot move a {from:?} booking to {to:?}"
        ))),
    }
}

fn ensure_payable(booking: &BookingRow) -> Result<(), AppError> {
    match booking.status {
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
        status => Err(AppError::Conflict(format!(
            "A {status:?} booking cannot be paid"
        ))),
    }
}

fn require_non_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ReservationCoordinator<S: Store> {
    store: S,
    config: StoreConfig,
}

impl<S: Store> ReservationCoordinator<S> {
    pub fn new(store: S, config: StoreConfig) -> Self {
        Self { store, config }
    }

    /// Reserves `slot` on `date` for the caller. The booking starts out `Pending`.
    pub async fn reserve(&self, actor: &Actor, request: ReserveRequest) -> Result<BookingRow, AppError> {
        let slot = request.slot.trim().to_string();
        require_non_blank(&slot, "Slot")?;
        require_non_blank(&request.contact.name, "Name")?;
        require_non_blank(&request.contact.email, "Email")?;
        require_non_blank(&request.contact.phone, "Phone")?;

        let data = CreateBooking {
            turf_id: request.turf_id,
            user_id: actor.user_id,
            user_name: Some(request.contact.name.trim().to_string()),
            user_email: Some(request.contact.email.trim().to_string()),
            user_phone: Some(request.contact.phone.trim().to_string()),
            date: request.date,
            slot,
        };

        let booking = run_with_retry(&self.config, "reserve", || self.reserve_once(&data)).await?;

        info!(
            booking_id = %booking.id,
            turf_id = %booking.turf_id,
            date = %booking.date,
            slot = %booking.slot,
            "Slot reserved"
        );
        Ok(booking)
    }

    async fn reserve_once(&self, data: &CreateBooking) -> Result<BookingRow, AppError> {
        let mut tx = self.store.begin().await?;

        let turf = tx
            .lock_turf(data.turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;

        if turf.slot(&data.slot).is_none() {
            return Err(AppError::NotFound("Slot not found".to_string()));
        }

        if tx
            .active_booking(turf.id, data.date, &data.slot)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Slot already booked".to_string()));
        }

        let booking = match tx.insert_booking(data.clone()).await {
            Ok(booking) => booking,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AppError::Conflict("Slot already booked".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        tx.set_slot_booked(turf.id, &data.slot, true).await?;
        tx.commit().await?;

        Ok(booking)
    }

    /// Cancels one of the caller's own bookings and releases its slot.
    pub async fn cancel(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingRow, AppError> {
        let booking =
            run_with_retry(&self.config, "cancel", || self.cancel_once(actor, booking_id)).await?;

        info!(booking_id = %booking.id, slot = %booking.slot, "Booking cancelled");
        Ok(booking)
    }

    async fn cancel_once(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingRow, AppError> {
        let mut tx = self.store.begin().await?;

        // Someone else's booking is reported as missing rather than forbidden.
        let booking = tx
            .lock_booking(booking_id)
            .await?
            .filter(|b| owns_booking(actor, b))
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        check_transition(booking.status, BookingStatus::Cancelled)?;
        let cancelled = tx
            .update_booking_status(booking.id, BookingStatus::Cancelled)
            .await?;

        match tx.lock_turf(booking.turf_id).await? {
            Some(turf) if turf.slot(&booking.slot).is_some() => {
                let still_held = tx.count_active_bookings(turf.id, &booking.slot).await? > 0;
                tx.set_slot_booked(turf.id, &booking.slot, still_held).await?;
            }
            Some(_) => debug!(booking_id = %booking.id, "Slot no longer exists, nothing to release"),
            None => debug!(booking_id = %booking.id, "Turf no longer exists, nothing to release"),
        }

        tx.commit().await?;
        Ok(cancelled)
    }

    /// Owner (or admin) acceptance of a pending booking.
    pub async fn confirm(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingRow, AppError> {
        let booking =
            run_with_retry(&self.config, "confirm", || self.confirm_once(actor, booking_id)).await?;

        info!(booking_id = %booking.id, "Booking confirmed");
        Ok(booking)
    }

    async fn confirm_once(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingRow, AppError> {
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let turf = tx
            .lock_turf(booking.turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;

        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can confirm its bookings".to_string(),
            ));
        }

        let booking = match check_transition(booking.status, BookingStatus::Confirmed)? {
            Transition::Apply => {
                tx.update_booking_status(booking.id, BookingStatus::Confirmed)
                    .await?
            }
            Transition::Unchanged => booking,
        };

        tx.commit().await?;
        Ok(booking)
    }

    /// A booking of the caller that can still be paid for, with its turf.
    pub async fn payable(&self, actor: &Actor, booking_id: Uuid) -> Result<(BookingRow, TurfRow), AppError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .filter(|b| owns_booking(actor, b))
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        ensure_payable(&booking)?;

        let turf = self
            .store
            .get_turf(booking.turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;

        Ok((booking, turf))
    }

    /// Stores a newly issued checkout session on the booking. The status is
    /// checked again under the booking lock, so a booking cancelled while the
    /// session was being created is left untouched.
    pub async fn attach_payment_session(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        session_id: &str,
    ) -> Result<BookingRow, AppError> {
        run_with_retry(&self.config, "attach_payment_session", || {
            self.attach_once(actor, booking_id, session_id)
        })
        .await
    }

    async fn attach_once(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        session_id: &str,
    ) -> Result<BookingRow, AppError> {
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .filter(|b| owns_booking(actor, b))
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        ensure_payable(&booking)?;

        let booking = tx.set_booking_payment_session(booking.id, session_id).await?;
        tx.commit().await?;

        debug!(booking_id = %booking.id, session_id, "Checkout session recorded");
        Ok(booking)
    }

    /// Records a completed payment. The booking id comes from the processor's
    /// session, so any session issued for the booking is accepted; the one that
    /// was paid becomes the recorded session.
    pub async fn mark_paid(
        &self,
        booking_id: Uuid,
        session_id: Option<&str>,
    ) -> Result<BookingRow, AppError> {
        let booking = run_with_retry(&self.config, "mark_paid", || {
            self.mark_paid_once(booking_id, session_id)
        })
        .await?;

        info!(booking_id = %booking.id, "Booking marked paid");
        Ok(booking)
    }

    async fn mark_paid_once(
        &self,
        booking_id: Uuid,
        session_id: Option<&str>,
    ) -> Result<BookingRow, AppError> {
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let booking = match check_transition(booking.status, BookingStatus::Paid)? {
            Transition::Apply => {
                let paid = tx.update_booking_status(booking.id, BookingStatus::Paid).await?;
                match session_id {
                    Some(id) if paid.payment_session_id.as_deref() != Some(id) => {
                        tx.set_booking_payment_session(paid.id, id).await?
                    }
                    _ => paid,
                }
            }
            Transition::Unchanged => booking,
        };

        tx.commit().await?;
        Ok(booking)
    }

    pub async fn list_for_user(&self, actor: &Actor) -> Result<Vec<UserBookingRow>, AppError> {
        Ok(self.store.list_bookings_for_user(actor.user_id).await?)
    }

    pub async fn list_for_owner(&self, actor: &Actor) -> Result<Vec<OwnerBookingView>, AppError> {
        let rows = self.store.list_bookings_for_owner(actor.user_id).await?;
        Ok(rows.into_iter().map(OwnerBookingView::from).collect())
    }

    /// The turf's slots with `booked` computed from the ledger for one date.
    pub async fn availability(&self, turf_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, AppError> {
        let turf = self
            .store
            .get_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;

        let taken = self.store.booked_slots_on(turf_id, date).await?;

        Ok(turf
            .slots
            .into_iter()
            .map(|slot| Slot {
                booked: taken.contains(&slot.time),
                time: slot.time,
            })
            .collect())
    }

    /// Recomputes every slot's `booked` flag of a turf from the ledger.
    pub async fn rebuild_slot_cache(&self, actor: &Actor, turf_id: Uuid) -> Result<TurfRow, AppError> {
        run_with_retry(&self.config, "rebuild_slot_cache", || {
            self.rebuild_once(actor, turf_id)
        })
        .await
    }

    async fn rebuild_once(&self, actor: &Actor, turf_id: Uuid) -> Result<TurfRow, AppError> {
        let mut tx = self.store.begin().await?;

        let turf = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;

        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can rebuild its slots".to_string(),
            ));
        }

        let mut changed = 0;
        for slot in &turf.slots {
            let held = tx.count_active_bookings(turf.id, &slot.time).await? > 0;
            if held != slot.booked {
                tx.set_slot_booked(turf.id, &slot.time, held).await?;
                changed += 1;
            }
        }

        let rebuilt = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;
        tx.commit().await?;

        info!(turf_id = %turf_id, changed, "Slot cache rebuilt");
        Ok(rebuilt)
    }
}
