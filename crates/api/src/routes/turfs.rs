use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::services::catalog::{NewTurf, TurfDetail};
use crate::state::AppState;
use infra::models::{Slot, TurfRow};
use infra::repos::{TurfFilter, UpdateTurf};
use infra::Store;

#[derive(Deserialize)]
pub struct CreateTurfRequest {
    pub name: String,
    pub price: i32,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub slots: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateTurfRequest {
    pub name: Option<String>,
    pub price: Option<i32>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct ListTurfsQuery {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct AddSlotRequest {
    pub time: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub turf_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

/// GET /turfs
pub async fn list_turfs<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListTurfsQuery>,
) -> Result<Json<Vec<TurfRow>>, AppError> {
    let filter = TurfFilter {
        owner_id: None,
        city: query.city.filter(|c| !c.trim().is_empty()),
        state: query.state.filter(|s| !s.trim().is_empty()),
    };
    Ok(Json(state.catalog().list_turfs(filter).await?))
}

/// GET /turfs/states
pub async fn list_states<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.catalog().list_states().await?))
}

/// GET /turfs/cities/{state}
pub async fn list_cities<S: Store>(
    State(state): State<AppState<S>>,
    Path(region): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.catalog().list_cities(&region).await?))
}

/// POST /turfs
pub async fn create_turf<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateTurfRequest>,
) -> Result<(StatusCode, Json<TurfRow>), AppError> {
    let turf = state
        .catalog()
        .create_turf(
            &actor,
            NewTurf {
                name: body.name,
                price: body.price,
                description: body.description,
                address: body.address,
                city: body.city,
                state: body.state,
                slots: body.slots,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(turf)))
}

/// GET /turfs/mine
pub async fn list_my_turfs<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<TurfRow>>, AppError> {
    Ok(Json(state.catalog().list_my_turfs(&actor).await?))
}

/// GET /turfs/{id}
pub async fn get_turf<S: Store>(
    State(state): State<AppState<S>>,
    Path(turf_id): Path<Uuid>,
) -> Result<Json<TurfDetail>, AppError> {
    Ok(Json(state.catalog().get_turf(turf_id).await?))
}

/// PUT /turfs/{id}
pub async fn update_turf<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(turf_id): Path<Uuid>,
    Json(body): Json<UpdateTurfRequest>,
) -> Result<Json<TurfRow>, AppError> {
    let changes = UpdateTurf {
        name: body.name,
        price: body.price,
        description: body.description,
        address: body.address,
        city: body.city,
        state: body.state,
    };
    Ok(Json(
        state.catalog().update_turf(&actor, turf_id, changes).await?,
    ))
}

/// DELETE /turfs/{id}
pub async fn delete_turf<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(turf_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_turf(&actor, turf_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /turfs/{id}/slots
pub async fn add_slot<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(turf_id): Path<Uuid>,
    Json(body): Json<AddSlotRequest>,
) -> Result<(StatusCode, Json<TurfRow>), AppError> {
    let turf = state.catalog().add_slot(&actor, turf_id, &body.time).await?;
    Ok((StatusCode::CREATED, Json(turf)))
}

/// DELETE /turfs/{id}/slots/{label}
pub async fn remove_slot<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path((turf_id, label)): Path<(Uuid, String)>,
) -> Result<Json<TurfRow>, AppError> {
    Ok(Json(
        state.catalog().remove_slot(&actor, turf_id, &label).await?,
    ))
}

/// GET /turfs/{id}/availability?date=YYYY-MM-DD
pub async fn availability<S: Store>(
    State(state): State<AppState<S>>,
    Path(turf_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let slots = state
        .reservations()
        .availability(turf_id, query.date)
        .await?;

    Ok(Json(AvailabilityResponse {
        turf_id,
        date: query.date,
        slots,
    }))
}

/// POST /turfs/{id}/rebuild-slots
pub async fn rebuild_slots<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(actor): AuthUser,
    Path(turf_id): Path<Uuid>,
) -> Result<Json<TurfRow>, AppError> {
    Ok(Json(
        state
            .reservations()
            .rebuild_slot_cache(&actor, turf_id)
            .await?,
    ))
}
