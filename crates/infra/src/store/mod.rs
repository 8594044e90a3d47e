//! Persistence seam used by the API.
//!
//! [`Store`] covers reads and single-statement writes. Anything that must check
//! state and then mutate it goes through a [`StoreTx`] unit of work: rows fetched
//! with the `lock_*` methods stay locked until [`StoreTx::commit`], and dropping a
//! transaction without committing discards every write made through it.

use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    BookingRow, BookingStatus, ConnectionRow, ConnectionStatus, OwnerBookingRow, PlayerSummary,
    TokenPurpose, TurfRow, UserBookingRow, UserRow,
};
use crate::repos::{
    CreateBooking, CreateConnection, CreateTurf, CreateUser, CreateUserToken, TurfFilter,
    UpdateTurf,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock contention or pool exhaustion; the operation can be retried.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return StoreError::Transient("timed out acquiring a connection".to_string());
        }
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                    return StoreError::Transient(db.message().to_string());
                }
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::UniqueViolation(
                        db.constraint().unwrap_or("unique").to_string(),
                    );
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    fn begin(&self) -> impl Future<Output = StoreResult<Self::Tx>> + Send;

    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;

    // Identity

    fn find_user_by_id(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<UserRow>>> + Send;

    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<UserRow>>> + Send;

    /// Fails with [`StoreError::UniqueViolation`] when the email is taken.
    fn create_user(&self, data: CreateUser) -> impl Future<Output = StoreResult<UserRow>> + Send;

    fn save_user(&self, user: &UserRow) -> impl Future<Output = StoreResult<UserRow>> + Send;

    /// Unknown ids are skipped.
    fn player_summaries(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = StoreResult<Vec<PlayerSummary>>> + Send;

    /// Stores a new one-time token, invalidating unused tokens of the same purpose.
    fn create_user_token(
        &self,
        data: CreateUserToken,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Marks a valid token used and returns the user it belongs to.
    fn consume_user_token(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> impl Future<Output = StoreResult<Option<Uuid>>> + Send;

    fn invalidate_user_tokens(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_expired_tokens(&self) -> impl Future<Output = StoreResult<u64>> + Send;

    // Catalog

    fn create_turf(&self, data: CreateTurf) -> impl Future<Output = StoreResult<TurfRow>> + Send;

    fn get_turf(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<TurfRow>>> + Send;

    fn list_turfs(
        &self,
        filter: TurfFilter,
    ) -> impl Future<Output = StoreResult<Vec<TurfRow>>> + Send;

    fn update_turf(
        &self,
        id: Uuid,
        data: UpdateTurf,
    ) -> impl Future<Output = StoreResult<Option<TurfRow>>> + Send;

    fn delete_turf(&self, id: Uuid) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Distinct non-empty states across all turfs, sorted.
    fn list_turf_states(&self) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// Distinct non-empty cities of turfs in `state` (case-insensitive), sorted.
    fn list_turf_cities(
        &self,
        state: &str,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    // Ledger

    fn get_booking(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<BookingRow>>> + Send;

    fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<UserBookingRow>>> + Send;

    fn list_bookings_for_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<OwnerBookingRow>>> + Send;

    /// Slot labels held by an active booking on `date`.
    fn booked_slots_on(
        &self,
        turf_id: Uuid,
        date: NaiveDate,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    // Connections

    fn insert_connection(
        &self,
        data: CreateConnection,
    ) -> impl Future<Output = StoreResult<ConnectionRow>> + Send;

    fn get_connection(
        &self,
        id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<ConnectionRow>>> + Send;

    fn list_open_connections(&self) -> impl Future<Output = StoreResult<Vec<ConnectionRow>>> + Send;

    fn list_connections_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<ConnectionRow>>> + Send;
}

pub trait StoreTx: Send + Sized {
    fn lock_turf(&mut self, id: Uuid) -> impl Future<Output = StoreResult<Option<TurfRow>>> + Send;

    /// Appends a slot to a locked turf.
    fn insert_slot(
        &mut self,
        turf_id: Uuid,
        label: &str,
        booked: bool,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn remove_slot(
        &mut self,
        turf_id: Uuid,
        label: &str,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Returns false when the slot does not exist.
    fn set_slot_booked(
        &mut self,
        turf_id: Uuid,
        label: &str,
        booked: bool,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    fn active_booking(
        &mut self,
        turf_id: Uuid,
        date: NaiveDate,
        slot: &str,
    ) -> impl Future<Output = StoreResult<Option<BookingRow>>> + Send;

    /// Active bookings for `slot` on any date.
    fn count_active_bookings(
        &mut self,
        turf_id: Uuid,
        slot: &str,
    ) -> impl Future<Output = StoreResult<i64>> + Send;

    fn insert_booking(
        &mut self,
        data: CreateBooking,
    ) -> impl Future<Output = StoreResult<BookingRow>> + Send;

    fn lock_booking(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<BookingRow>>> + Send;

    fn update_booking_status(
        &mut self,
        id: Uuid,
        status: BookingStatus,
    ) -> impl Future<Output = StoreResult<BookingRow>> + Send;

    /// Records the checkout session most recently issued for a locked booking.
    fn set_booking_payment_session(
        &mut self,
        id: Uuid,
        session_id: &str,
    ) -> impl Future<Output = StoreResult<BookingRow>> + Send;

    fn lock_connection(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<ConnectionRow>>> + Send;

    fn update_connection_players(
        &mut self,
        id: Uuid,
        players: &[Uuid],
        status: ConnectionStatus,
    ) -> impl Future<Output = StoreResult<ConnectionRow>> + Send;

    fn delete_connection(&mut self, id: Uuid) -> impl Future<Output = StoreResult<bool>> + Send;

    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;
}
