use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    BookingRow, BookingStatus, ConnectionRow, ConnectionStatus, OwnerBookingRow, PlayerSummary,
    TokenPurpose, TurfRow, UserBookingRow, UserRow,
};
use crate::repos::{
    bookings, connections, turfs, user_tokens, users, CreateBooking, CreateConnection, CreateTurf,
    CreateUser, CreateUserToken, TurfFilter, UpdateTurf,
};

use super::{Store, StoreResult, StoreTx};

/// Postgres-backed store. Units of work are `READ COMMITTED` transactions that
/// serialize on row locks taken with `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

impl Store for PgStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> StoreResult<PgStoreTx> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTx { tx })
    }

    async fn ping(&self) -> StoreResult<()> {
        let _one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        Ok(users::get_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        Ok(users::get_by_email(&self.pool, email).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<UserRow> {
        Ok(users::create(&self.pool, data).await?)
    }

    async fn save_user(&self, user: &UserRow) -> StoreResult<UserRow> {
        Ok(users::save(&self.pool, user).await?)
    }

    async fn player_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<PlayerSummary>> {
        Ok(users::summaries_by_ids(&self.pool, ids).await?)
    }

    async fn create_user_token(&self, data: CreateUserToken) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        user_tokens::invalidate_for_user(&mut *tx, data.user_id, data.purpose).await?;
        user_tokens::create(&mut *tx, &data).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn consume_user_token(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> StoreResult<Option<Uuid>> {
        Ok(user_tokens::consume_valid(&self.pool, token_hash, purpose).await?)
    }

    async fn invalidate_user_tokens(&self, user_id: Uuid, purpose: TokenPurpose) -> StoreResult<()> {
        Ok(user_tokens::invalidate_for_user(&self.pool, user_id, purpose).await?)
    }

    async fn delete_expired_tokens(&self) -> StoreResult<u64> {
        Ok(user_tokens::delete_expired(&self.pool).await?)
    }

    async fn create_turf(&self, data: CreateTurf) -> StoreResult<TurfRow> {
        let mut tx = self.pool.begin().await?;
        let turf = turfs::create(&mut tx, data).await?;
        tx.commit().await?;
        Ok(turf)
    }

    async fn get_turf(&self, id: Uuid) -> StoreResult<Option<TurfRow>> {
        let mut conn = self.pool.acquire().await?;
        Ok(turfs::get_by_id(&mut conn, id).await?)
    }

    async fn list_turfs(&self, filter: TurfFilter) -> StoreResult<Vec<TurfRow>> {
        let mut conn = self.pool.acquire().await?;
        Ok(turfs::list(&mut conn, &filter).await?)
    }

    async fn update_turf(&self, id: Uuid, data: UpdateTurf) -> StoreResult<Option<TurfRow>> {
        let mut conn = self.pool.acquire().await?;
        Ok(turfs::update(&mut conn, id, data).await?)
    }

    async fn delete_turf(&self, id: Uuid) -> StoreResult<bool> {
        Ok(turfs::delete(&self.pool, id).await?)
    }

    async fn list_turf_states(&self) -> StoreResult<Vec<String>> {
        Ok(turfs::distinct_states(&self.pool).await?)
    }

    async fn list_turf_cities(&self, state: &str) -> StoreResult<Vec<String>> {
        Ok(turfs::distinct_cities(&self.pool, state).await?)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<BookingRow>> {
        Ok(bookings::get_by_id(&self.pool, id).await?)
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<UserBookingRow>> {
        Ok(bookings::list_for_user(&self.pool, user_id).await?)
    }

    async fn list_bookings_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnerBookingRow>> {
        Ok(bookings::list_for_owner(&self.pool, owner_id).await?)
    }

    async fn booked_slots_on(&self, turf_id: Uuid, date: NaiveDate) -> StoreResult<Vec<String>> {
        Ok(bookings::active_slots_on(&self.pool, turf_id, date).await?)
    }

    async fn insert_connection(&self, data: CreateConnection) -> StoreResult<ConnectionRow> {
        Ok(connections::insert(&self.pool, &data).await?)
    }

    async fn get_connection(&self, id: Uuid) -> StoreResult<Option<ConnectionRow>> {
        Ok(connections::get_by_id(&self.pool, id).await?)
    }

    async fn list_open_connections(&self) -> StoreResult<Vec<ConnectionRow>> {
        Ok(connections::list_open(&self.pool).await?)
    }

    async fn list_connections_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConnectionRow>> {
        Ok(connections::list_for_user(&self.pool, user_id).await?)
    }
}

impl StoreTx for PgStoreTx {
    async fn lock_turf(&mut self, id: Uuid) -> StoreResult<Option<TurfRow>> {
        Ok(turfs::get_for_update(&mut self.tx, id).await?)
    }

    async fn insert_slot(&mut self, turf_id: Uuid, label: &str, booked: bool) -> StoreResult<()> {
        let position = turfs::next_slot_position(&mut *self.tx, turf_id).await?;
        turfs::insert_slot(&mut *self.tx, turf_id, label, position, booked).await?;
        Ok(())
    }

    async fn remove_slot(&mut self, turf_id: Uuid, label: &str) -> StoreResult<bool> {
        Ok(turfs::delete_slot(&mut *self.tx, turf_id, label).await?)
    }

    async fn set_slot_booked(&mut self, turf_id: Uuid, label: &str, booked: bool) -> StoreResult<bool> {
        Ok(turfs::set_slot_booked(&mut *self.tx, turf_id, label, booked).await?)
    }

    async fn active_booking(
        &mut self,
        turf_id: Uuid,
        date: NaiveDate,
        slot: &str,
    ) -> StoreResult<Option<BookingRow>> {
        Ok(bookings::find_active(&mut *self.tx, turf_id, date, slot).await?)
    }

    async fn count_active_bookings(&mut self, turf_id: Uuid, slot: &str) -> StoreResult<i64> {
        Ok(bookings::count_active_for_slot(&mut *self.tx, turf_id, slot).await?)
    }

    async fn insert_booking(&mut self, data: CreateBooking) -> StoreResult<BookingRow> {
        Ok(bookings::insert(&mut *self.tx, &data).await?)
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<BookingRow>> {
        Ok(bookings::get_for_update(&mut *self.tx, id).await?)
    }

    async fn update_booking_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<BookingRow> {
        Ok(bookings::update_status(&mut *self.tx, id, status).await?)
    }

    async fn set_booking_payment_session(&mut self, id: Uuid, session_id: &str) -> StoreResult<BookingRow> {
        Ok(bookings::set_payment_session(&mut *self.tx, id, session_id).await?)
    }

    async fn lock_connection(&mut self, id: Uuid) -> StoreResult<Option<ConnectionRow>> {
        Ok(connections::get_for_update(&mut *self.tx, id).await?)
    }

    async fn update_connection_players(
        &mut self,
        id: Uuid,
        players: &[Uuid],
        status: ConnectionStatus,
    ) -> StoreResult<ConnectionRow> {
        Ok(connections::update_players(&mut *self.tx, id, players, status).await?)
    }

    async fn delete_connection(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(connections::delete(&mut *self.tx, id).await?)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
