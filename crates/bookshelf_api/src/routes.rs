//! Resource controllers: one route group per entity under `/api/{Resource}`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bookshelf_core::{Entity, EntityId, EntityService, SqliteEntityRepository};
use rusqlite::Connection;
use log::warn;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// JSON array of `{"Property","Operator","Value"}` criteria.
    pub filters: Option<String>,
}

/// Registers the five CRUD routes for `E` on `router`.
pub fn resource_routes<E: Entity>(router: Router<AppState>) -> Router<AppState> {
    let collection = format!("/api/{}", E::RESOURCE);
    let item = format!("{collection}/:id");

    router
        .route(&collection, get(list::<E>).post(create::<E>))
        .route(
            &item,
            get(get_by_id::<E>).put(update::<E>).delete(delete_by_id::<E>),
        )
}

/// Table shapes are checked once in `Database::from_connection`.
fn service<E: Entity>(conn: &Connection) -> EntityService<E, SqliteEntityRepository<'_, E>> {
    EntityService::new(SqliteEntityRepository::new(conn))
}

/// Ids that are not UUIDs never match a route, so they report 404.
fn parse_id<E: Entity>(raw: &str) -> Result<EntityId, ApiError> {
    EntityId::parse_str(raw.trim())
        .map_err(|_| ApiError::NotFound(format!("{} not found: {raw}", E::RESOURCE)))
}

async fn create<E: Entity>(
    State(state): State<AppState>,
    body: Result<Json<E>, JsonRejection>,
) -> Result<(StatusCode, Json<E>), ApiError> {
    let Json(entity) = body?;
    let created = state
        .db
        .run(move |conn| Ok(service::<E>(conn).create(entity)?))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list<E: Entity>(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<E>>, ApiError> {
    let Query(params) = query?;
    let entities = state
        .db
        .run(move |conn| Ok(service::<E>(conn).list(params.filters.as_deref())?))
        .await?;
    Ok(Json(entities))
}

async fn get_by_id<E: Entity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<E>, ApiError> {
    let id = parse_id::<E>(&raw_id)?;
    let entity = state
        .db
        .run(move |conn| Ok(service::<E>(conn).get(id)?))
        .await?;
    entity
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} not found: {id}", E::RESOURCE)))
}

async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<E>, JsonRejection>,
) -> Result<Json<E>, ApiError> {
    let id = parse_id::<E>(&raw_id)?;
    let Json(updated) = body?;
    let stored = state
        .db
        .run(move |conn| Ok(service::<E>(conn).update(id, &updated)?))
        .await?;
    Ok(Json(stored))
}

async fn delete_by_id<E: Entity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id::<E>(&raw_id)?;
    state
        .db
        .run(move |conn| Ok(service::<E>(conn).delete(id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Host name and primary local address of the serving machine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAddress {
    pub host_name: String,
    pub my_ip: String,
}

/// `GET /api/Author/myip`.
pub async fn my_ip() -> Result<Json<HostAddress>, ApiError> {
    let host_name = hostname::get()
        .map_err(|err| ApiError::Internal(format!("host name lookup failed: {err}")))?
        .to_string_lossy()
        .into_owned();

    // Hosts with only a loopback interface report the loopback address.
    let address = local_ip_address::local_ip().unwrap_or_else(|err| {
        warn!("event=local_ip_lookup module=api status=fallback error={err}");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    });

    Ok(Json(HostAddress {
        host_name,
        my_ip: address.to_string(),
    }))
}
