use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::ErrorBody, AppState, City, Error};

#[utoipa::path(
    get,
    path = "/api/city",
    responses(
        (status = OK, description = "All known cities ordered by id", body = Vec<City>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read cities", body = ErrorBody)
    ))]
pub async fn list_cities(State(state): State<Arc<AppState>>) -> Result<Json<Vec<City>>, Error> {
    Ok(Json(state.store.list_cities().await?))
}

#[utoipa::path(
    get,
    path = "/api/city/{id}",
    params(
        ("id" = i64, Path, description = "City id"),
    ),
    responses(
        (status = OK, description = "Found city", body = City),
        (status = NOT_FOUND, description = "No city with this id", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read city", body = ErrorBody)
    ))]
pub async fn get_city(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<City>, Error> {
    state
        .store
        .get_city(id)
        .await?
        .map(Json)
        .ok_or(Error::UnknownCity(id))
}
