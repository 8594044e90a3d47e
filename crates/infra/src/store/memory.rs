use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    BookingRow, BookingStatus, ConnectionRow, ConnectionStatus, OwnerBookingRow, PlayerSummary,
    Slot, TokenPurpose, TurfRow, UserBookingRow, UserRow, UserTokenRow,
};
use crate::repos::{
    CreateBooking, CreateConnection, CreateTurf, CreateUser, CreateUserToken, TurfFilter,
    UpdateTurf,
};

use super::{Store, StoreError, StoreResult, StoreTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRow>,
    tokens: Vec<UserTokenRow>,
    turfs: HashMap<Uuid, TurfRow>,
    bookings: HashMap<Uuid, BookingRow>,
    connections: HashMap<Uuid, ConnectionRow>,
}

impl MemoryState {
    fn active_booking(&self, turf_id: Uuid, date: NaiveDate, slot: &str) -> Option<&BookingRow> {
        self.bookings.values().find(|b| {
            b.turf_id == turf_id && b.date == date && b.slot == slot && b.status.is_active()
        })
    }
}

fn row_not_found() -> StoreError {
    StoreError::Database(sqlx::Error::RowNotFound)
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a Option<String>>) -> Vec<String> {
    let mut out: Vec<String> = values
        .filter_map(|v| v.as_deref())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

/// Process-local store. Units of work hold one mutex for their whole lifetime and
/// operate on a copy of the state that replaces the original on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl Store for MemoryStore {
    type Tx = MemoryStoreTx;

    async fn begin(&self) -> StoreResult<MemoryStoreTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryStoreTx { guard, working })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<UserRow> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = UserRow {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            phone: None,
            address: None,
            dob: None,
            gender: None,
            profile_pic_url: None,
            is_profile_complete: false,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &UserRow) -> StoreResult<UserRow> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let stored = state.users.get_mut(&user.id).ok_or_else(row_not_found)?;
        *stored = UserRow {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn player_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<PlayerSummary>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|u| PlayerSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .collect())
    }

    async fn create_user_token(&self, data: CreateUserToken) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for token in state.tokens.iter_mut() {
            if token.user_id == data.user_id && token.purpose == data.purpose && token.used_at.is_none() {
                token.used_at = Some(now);
            }
        }
        state.tokens.push(UserTokenRow {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            purpose: data.purpose,
            token_hash: data.token_hash,
            expires_at: data.expires_at,
            used_at: None,
            created_at: now,
        });
        Ok(())
    }

    async fn consume_user_token(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> StoreResult<Option<Uuid>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let token = state.tokens.iter_mut().find(|t| {
            t.token_hash == token_hash && t.purpose == purpose && t.used_at.is_none() && t.expires_at > now
        });

        Ok(token.map(|t| {
            t.used_at = Some(now);
            t.user_id
        }))
    }

    async fn invalidate_user_tokens(&self, user_id: Uuid, purpose: TokenPurpose) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for token in state.tokens.iter_mut() {
            if token.user_id == user_id && token.purpose == purpose && token.used_at.is_none() {
                token.used_at = Some(now);
            }
        }
        Ok(())
    }

    async fn delete_expired_tokens(&self) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let before = state.tokens.len();
        state.tokens.retain(|t| t.expires_at >= now);
        Ok((before - state.tokens.len()) as u64)
    }

    async fn create_turf(&self, data: CreateTurf) -> StoreResult<TurfRow> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let turf = TurfRow {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name,
            price: data.price,
            description: data.description,
            address: data.address,
            city: data.city,
            state: data.state,
            created_at: now,
            updated_at: now,
            slots: data
                .slots
                .into_iter()
                .map(|time| Slot { time, booked: false })
                .collect(),
        };
        state.turfs.insert(turf.id, turf.clone());
        Ok(turf)
    }

    async fn get_turf(&self, id: Uuid) -> StoreResult<Option<TurfRow>> {
        Ok(self.state.lock().await.turfs.get(&id).cloned())
    }

    async fn list_turfs(&self, filter: TurfFilter) -> StoreResult<Vec<TurfRow>> {
        let field_matches = |value: &Option<String>, wanted: &Option<String>| match wanted {
            Some(wanted) => value
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(wanted)),
            None => true,
        };

        let state = self.state.lock().await;
        let mut turfs: Vec<TurfRow> = state
            .turfs
            .values()
            .filter(|t| filter.owner_id.map_or(true, |owner| t.owner_id == owner))
            .filter(|t| field_matches(&t.city, &filter.city) && field_matches(&t.state, &filter.state))
            .cloned()
            .collect();
        newest_first(&mut turfs, |t| t.created_at);
        Ok(turfs)
    }

    async fn update_turf(&self, id: Uuid, data: UpdateTurf) -> StoreResult<Option<TurfRow>> {
        let mut state = self.state.lock().await;
        let Some(turf) = state.turfs.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            turf.name = name;
        }
        if let Some(price) = data.price {
            turf.price = price;
        }
        if data.description.is_some() {
            turf.description = data.description;
        }
        if data.address.is_some() {
            turf.address = data.address;
        }
        if data.city.is_some() {
            turf.city = data.city;
        }
        if data.state.is_some() {
            turf.state = data.state;
        }
        turf.updated_at = Utc::now();
        Ok(Some(turf.clone()))
    }

    async fn delete_turf(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.lock().await.turfs.remove(&id).is_some())
    }

    async fn list_turf_states(&self) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(distinct_sorted(state.turfs.values().map(|t| &t.state)))
    }

    async fn list_turf_cities(&self, wanted: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(distinct_sorted(
            state
                .turfs
                .values()
                .filter(|t| t.state.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(wanted)))
                .map(|t| &t.city),
        ))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<BookingRow>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<UserBookingRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<UserBookingRow> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .map(|b| {
                let turf = state.turfs.get(&b.turf_id);
                UserBookingRow {
                    booking: b.clone(),
                    turf_name: turf.map(|t| t.name.clone()),
                    turf_price: turf.map(|t| t.price),
                    turf_city: turf.and_then(|t| t.city.clone()),
                }
            })
            .collect();
        newest_first(&mut rows, |r| r.booking.created_at);
        Ok(rows)
    }

    async fn list_bookings_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnerBookingRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<OwnerBookingRow> = state
            .bookings
            .values()
            .filter(|b| matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed))
            .filter_map(|b| {
                let turf = state.turfs.get(&b.turf_id).filter(|t| t.owner_id == owner_id)?;
                let account = state.users.get(&b.user_id);
                Some(OwnerBookingRow {
                    booking: b.clone(),
                    turf_name: turf.name.clone(),
                    account_name: account.map(|u| u.name.clone()),
                    account_email: account.map(|u| u.email.clone()),
                    account_phone: account.and_then(|u| u.phone.clone()),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.booking.date, &a.booking.slot).cmp(&(b.booking.date, &b.booking.slot))
        });
        Ok(rows)
    }

    async fn booked_slots_on(&self, turf_id: Uuid, date: NaiveDate) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.turf_id == turf_id && b.date == date && b.status.is_active())
            .map(|b| b.slot.clone())
            .collect())
    }

    async fn insert_connection(&self, data: CreateConnection) -> StoreResult<ConnectionRow> {
        let mut state = self.state.lock().await;
        let connection = ConnectionRow {
            id: Uuid::new_v4(),
            turf: data.turf,
            date: data.date,
            created_by: data.created_by,
            max_players: data.max_players,
            players: vec![data.created_by],
            sport: data.sport,
            contact_number: data.contact_number,
            email: data.email,
            message: data.message,
            status: data.status,
            created_at: Utc::now(),
        };
        state.connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn get_connection(&self, id: Uuid) -> StoreResult<Option<ConnectionRow>> {
        Ok(self.state.lock().await.connections.get(&id).cloned())
    }

    async fn list_open_connections(&self) -> StoreResult<Vec<ConnectionRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<ConnectionRow> = state
            .connections
            .values()
            .filter(|c| c.status == ConnectionStatus::Open)
            .cloned()
            .collect();
        newest_first(&mut rows, |c| c.created_at);
        Ok(rows)
    }

    async fn list_connections_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConnectionRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<ConnectionRow> = state
            .connections
            .values()
            .filter(|c| c.created_by == user_id || c.has_player(user_id))
            .cloned()
            .collect();
        newest_first(&mut rows, |c| c.created_at);
        Ok(rows)
    }
}

impl StoreTx for MemoryStoreTx {
    async fn lock_turf(&mut self, id: Uuid) -> StoreResult<Option<TurfRow>> {
        Ok(self.working.turfs.get(&id).cloned())
    }

    async fn insert_slot(&mut self, turf_id: Uuid, label: &str, booked: bool) -> StoreResult<()> {
        let turf = self.working.turfs.get_mut(&turf_id).ok_or_else(row_not_found)?;
        if turf.slot(label).is_some() {
            return Err(StoreError::UniqueViolation("turf_slots_pkey".to_string()));
        }
        turf.slots.push(Slot {
            time: label.to_string(),
            booked,
        });
        Ok(())
    }

    async fn remove_slot(&mut self, turf_id: Uuid, label: &str) -> StoreResult<bool> {
        let Some(turf) = self.working.turfs.get_mut(&turf_id) else {
            return Ok(false);
        };
        let before = turf.slots.len();
        turf.slots.retain(|s| s.time != label);
        Ok(turf.slots.len() < before)
    }

    async fn set_slot_booked(&mut self, turf_id: Uuid, label: &str, booked: bool) -> StoreResult<bool> {
        let slot = self
            .working
            .turfs
            .get_mut(&turf_id)
            .and_then(|t| t.slots.iter_mut().find(|s| s.time == label));

        Ok(match slot {
            Some(slot) => {
                slot.booked = booked;
                true
            }
            None => false,
        })
    }

    async fn active_booking(
        &mut self,
        turf_id: Uuid,
        date: NaiveDate,
        slot: &str,
    ) -> StoreResult<Option<BookingRow>> {
        Ok(self.working.active_booking(turf_id, date, slot).cloned())
    }

    async fn count_active_bookings(&mut self, turf_id: Uuid, slot: &str) -> StoreResult<i64> {
        let count = self
            .working
            .bookings
            .values()
            .filter(|b| b.turf_id == turf_id && b.slot == slot && b.status.is_active())
            .count();
        Ok(count as i64)
    }

    async fn insert_booking(&mut self, data: CreateBooking) -> StoreResult<BookingRow> {
        if self
            .working
            .active_booking(data.turf_id, data.date, &data.slot)
            .is_some()
        {
            return Err(StoreError::UniqueViolation("bookings_active_slot_key".to_string()));
        }

        let now = Utc::now();
        let booking = BookingRow {
            id: Uuid::new_v4(),
            turf_id: data.turf_id,
            user_id: data.user_id,
            user_name: data.user_name,
            user_email: data.user_email,
            user_phone: data.user_phone,
            date: data.date,
            slot: data.slot,
            status: BookingStatus::Pending,
            payment_session_id: None,
            created_at: now,
            updated_at: now,
        };
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<BookingRow>> {
        Ok(self.working.bookings.get(&id).cloned())
    }

    async fn update_booking_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<BookingRow> {
        let booking = self.working.bookings.get_mut(&id).ok_or_else(row_not_found)?;
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn set_booking_payment_session(&mut self, id: Uuid, session_id: &str) -> StoreResult<BookingRow> {
        let booking = self.working.bookings.get_mut(&id).ok_or_else(row_not_found)?;
        booking.payment_session_id = Some(session_id.to_string());
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn lock_connection(&mut self, id: Uuid) -> StoreResult<Option<ConnectionRow>> {
        Ok(self.working.connections.get(&id).cloned())
    }

    async fn update_connection_players(
        &mut self,
        id: Uuid,
        players: &[Uuid],
        status: ConnectionStatus,
    ) -> StoreResult<ConnectionRow> {
        let connection = self.working.connections.get_mut(&id).ok_or_else(row_not_found)?;
        connection.players = players.to_vec();
        connection.status = status;
        Ok(connection.clone())
    }

    async fn delete_connection(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.working.connections.remove(&id).is_some())
    }

    async fn commit(self) -> StoreResult<()> {
        let MemoryStoreTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
