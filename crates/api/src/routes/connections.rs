use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::connections::{ConnectionView, NewConnection};
use crate::state::AppState;
use infra::models::ConnectionRow;
use infra::Store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionBody {
    pub turf: String,
    pub date: NaiveDate,
    pub max_players: i32,
    pub sport: String,
    pub contact_number: String,
    pub email: String,
    pub message: Option<String>,
}

/// POST /connections
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateConnectionBody>,
) -> Result<(StatusCode, Json<ConnectionRow>), AppError> {
    let connection = state
        .connections()
        .create(
            &actor,
            NewConnection {
                turf: body.turf,
                date: body.date,
                max_players: body.max_players,
                sport: body.sport,
                contact_number: body.contact_number,
                email: body.email,
                message: body.message,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(connection)))
}

/// GET /connections/open
pub async fn list_open<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ConnectionView>>, AppError> {
    Ok(Json(state.connections().list_open().await?))
}

/// GET /connections/mine
pub async fn list_mine<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<ConnectionView>>, AppError> {
    Ok(Json(state.connections().list_mine(&actor).await?))
}

/// GET /connections/{id}
pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ConnectionRow>, AppError> {
    Ok(Json(state.connections().get(connection_id).await?))
}

/// POST /connections/{id}/join
pub async fn join<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ConnectionRow>, AppError> {
    Ok(Json(state.connections().join(&actor, connection_id).await?))
}

/// DELETE /connections/{id}
pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.connections().delete(&actor, connection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
