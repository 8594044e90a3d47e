//! Group formation: players post a game looking for teammates and others join
//! until it is full. Joins lock the connection row so the member list can never
//! grow past `max_players` or contain the same user twice.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::permissions::can_delete_connection;
use crate::auth::Actor;
use crate::config::StoreConfig;
use crate::error::AppError;
use crate::services::retry::run_with_retry;
use infra::models::{ConnectionRow, ConnectionStatus, PlayerSummary};
use infra::repos::CreateConnection;
use infra::{Store, StoreTx};

#[derive(Debug, Clone)]
pub struct NewConnection {
    pub turf: String,
    pub date: NaiveDate,
    pub max_players: i32,
    pub sport: String,
    pub contact_number: String,
    pub email: String,
    pub message: Option<String>,
}

/// A connection as listed, with the name and email of its creator and players.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    #[serde(flatten)]
    pub connection: ConnectionRow,
    pub player_details: Vec<PlayerSummary>,
    pub creator: Option<PlayerSummary>,
}

fn capacity(connection: &ConnectionRow) -> usize {
    usize::try_from(connection.max_players).unwrap_or(0)
}

fn status_for(players: usize, capacity: usize) -> ConnectionStatus {
    if players >= capacity {
        ConnectionStatus::Full
    } else {
        ConnectionStatus::Open
    }
}

#[derive(Clone)]
pub struct ConnectionCoordinator<S: Store> {
    store: S,
    config: StoreConfig,
}

impl<S: Store> ConnectionCoordinator<S> {
    pub fn new(store: S, config: StoreConfig) -> Self {
        Self { store, config }
    }

    /// The creator is the first player. A game for one is full from the start.
    pub async fn create(&self, actor: &Actor, input: NewConnection) -> Result<ConnectionRow, AppError> {
        if input.max_players < 1 {
            return Err(AppError::BadRequest(
                "maxPlayers must be at least 1".to_string(),
            ));
        }
        for (value, field) in [
            (&input.turf, "Turf"),
            (&input.sport, "Sport"),
            (&input.contact_number, "Contact number"),
            (&input.email, "Email"),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{field} is required")));
            }
        }

        let connection = self
            .store
            .insert_connection(CreateConnection {
                turf: input.turf.trim().to_string(),
                date: input.date,
                created_by: actor.user_id,
                max_players: input.max_players,
                sport: input.sport.trim().to_string(),
                contact_number: input.contact_number.trim().to_string(),
                email: input.email.trim().to_string(),
                message: input.message.unwrap_or_default(),
                status: status_for(1, input.max_players as usize),
            })
            .await?;

        info!(connection_id = %connection.id, max_players = connection.max_players, "Connection created");
        Ok(connection)
    }

    pub async fn join(&self, actor: &Actor, connection_id: Uuid) -> Result<ConnectionRow, AppError> {
        let connection = run_with_retry(&self.config, "join_connection", || {
            self.join_once(actor, connection_id)
        })
        .await?;

        info!(
            connection_id = %connection.id,
            players = connection.players.len(),
            full = connection.status == ConnectionStatus::Full,
            "Player joined connection"
        );
        Ok(connection)
    }

    async fn join_once(&self, actor: &Actor, connection_id: Uuid) -> Result<ConnectionRow, AppError> {
        let mut tx = self.store.begin().await?;

        let connection = tx
            .lock_connection(connection_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;

        if connection.has_player(actor.user_id) {
            return Err(AppError::Conflict(
                "You have already joined this connection".to_string(),
            ));
        }

        let capacity = capacity(&connection);
        if connection.status == ConnectionStatus::Full || connection.players.len() >= capacity {
            return Err(AppError::Conflict("Connection is full".to_string()));
        }

        let mut players = connection.players;
        players.push(actor.user_id);
        let status = status_for(players.len(), capacity);

        let updated = tx
            .update_connection_players(connection_id, &players, status)
            .await?;
        tx.commit().await?;

        Ok(updated)
    }

    pub async fn get(&self, connection_id: Uuid) -> Result<ConnectionRow, AppError> {
        self.store
            .get_connection(connection_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))
    }

    pub async fn list_open(&self) -> Result<Vec<ConnectionView>, AppError> {
        let rows = self.store.list_open_connections().await?;
        self.with_players(rows).await
    }

    /// Connections the caller created or joined.
    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<ConnectionView>, AppError> {
        let rows = self.store.list_connections_for_user(actor.user_id).await?;
        self.with_players(rows).await
    }

    /// Resolves every creator and player with one lookup. Deleted accounts
    /// are left out of `player_details`.
    async fn with_players(&self, rows: Vec<ConnectionRow>) -> Result<Vec<ConnectionView>, AppError> {
        let mut ids: Vec<Uuid> = rows
            .iter()
            .flat_map(|c| c.players.iter().copied().chain([c.created_by]))
            .collect();
        ids.sort();
        ids.dedup();

        let people: HashMap<Uuid, PlayerSummary> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .player_summaries(&ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|connection| ConnectionView {
                player_details: connection
                    .players
                    .iter()
                    .filter_map(|id| people.get(id).cloned())
                    .collect(),
                creator: people.get(&connection.created_by).cloned(),
                connection,
            })
            .collect())
    }

    pub async fn delete(&self, actor: &Actor, connection_id: Uuid) -> Result<(), AppError> {
        run_with_retry(&self.config, "delete_connection", || {
            self.delete_once(actor, connection_id)
        })
        .await?;

        info!(connection_id = %connection_id, "Connection deleted");
        Ok(())
    }

    async fn delete_once(&self, actor: &Actor, connection_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;

        let connection = tx
            .lock_connection(connection_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;

        if !can_delete_connection(actor, &connection) {
            return Err(AppError::Forbidden(
                "Only the creator can delete this connection".to_string(),
            ));
        }

        tx.delete_connection(connection_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
