use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{
    error::ErrorBody,
    query::{self, attach_cities, parse_date, SortAndPage, WeatherFilter, DEFAULT_PAGE_SIZE},
    AppState, Error, NewObservation, Observation,
};

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day of the range, ISO-8601 date or date-time
    pub start_date: String,
    /// Last day of the range (inclusive), ISO-8601 date or date-time
    pub end_date: String,
    pub city_id: i64,
}

impl RangeQuery {
    pub fn filter(&self) -> Result<WeatherFilter, Error> {
        WeatherFilter::new(
            parse_date(&self.start_date)?,
            parse_date(&self.end_date)?,
            self.city_id,
        )
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub start_date: String,
    pub end_date: String,
    pub city_id: i64,
    /// One of date, temperature, rain, wind
    pub sort_column: Option<String>,
    /// asc or desc; anything else resets to date asc
    #[serde(alias = "sortDirection")]
    pub sort_order: Option<String>,
    /// Zero based page index
    #[serde(alias = "pageIndex")]
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    fn filter(&self) -> Result<WeatherFilter, Error> {
        WeatherFilter::new(
            parse_date(&self.start_date)?,
            parse_date(&self.end_date)?,
            self.city_id,
        )
    }

    fn sort_and_page(&self) -> Result<SortAndPage, Error> {
        SortAndPage::resolve(
            self.sort_column.as_deref(),
            self.sort_order.as_deref(),
            self.page_number.unwrap_or(0),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[utoipa::path(
    get,
    path = "/api/weather/filtered",
    params(PageQuery),
    responses(
        (status = OK, description = "One sorted page of the city's observations", body = Vec<Observation>),
        (status = BAD_REQUEST, description = "Invalid date range, sort column or page size", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query observations", body = ErrorBody)
    ))]
pub async fn filtered_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Vec<Observation>>, Error> {
    let filter = params.filter()?;
    let sort_and_page = params.sort_and_page()?;

    let mut rows = query::page(state.store.as_ref(), &filter, &sort_and_page).await?;
    let cities = state.store.list_cities().await?;
    attach_cities(&mut rows, &cities);

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/weather",
    params(RangeQuery),
    responses(
        (status = OK, description = "Every observation of the city in the range", body = Vec<Observation>),
        (status = BAD_REQUEST, description = "Invalid date range", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query observations", body = ErrorBody)
    ))]
pub async fn list_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<Observation>>, Error> {
    let filter = params.filter()?;

    let mut rows = query::list(state.store.as_ref(), &filter).await?;
    let cities = state.store.list_cities().await?;
    attach_cities(&mut rows, &cities);

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/weather/count",
    params(RangeQuery),
    responses(
        (status = OK, description = "Number of observations of the city in the range", body = u64),
        (status = BAD_REQUEST, description = "Invalid date range", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to count observations", body = ErrorBody)
    ))]
pub async fn count_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<u64>, Error> {
    let filter = params.filter()?;
    Ok(Json(query::count(state.store.as_ref(), &filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/weather/seed",
    params(RangeQuery),
    responses(
        (status = OK, description = "Number of days written", body = usize),
        (status = BAD_REQUEST, description = "Invalid date range", body = ErrorBody),
        (status = NOT_FOUND, description = "City not found", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to store generated weather", body = ErrorBody)
    ))]
pub async fn seed_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<usize>, Error> {
    let filter = params.filter()?;
    info!(
        "generating weather for city {} from {} to {}",
        filter.city_id(),
        filter.start_date(),
        filter.end_date()
    );

    let written = state
        .seeder
        .seed(filter.start_date(), filter.end_date(), filter.city_id())
        .await?;

    Ok(Json(written))
}

#[utoipa::path(
    get,
    path = "/api/weather/{id}",
    params(
        ("id" = i64, Path, description = "Observation id"),
    ),
    responses(
        (status = OK, description = "Found observation", body = Observation),
        (status = NOT_FOUND, description = "No observation with this id", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read observation", body = ErrorBody)
    ))]
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Observation>, Error> {
    state
        .store
        .get_observation(id)
        .await?
        .map(Json)
        .ok_or(Error::ObservationNotFound(id))
}

#[utoipa::path(
    post,
    path = "/api/weather",
    request_body = NewObservation,
    responses(
        (status = CREATED, description = "Stored observation", body = Observation),
        (status = BAD_REQUEST, description = "Negative rain or wind", body = ErrorBody),
        (status = NOT_FOUND, description = "City not found", body = ErrorBody),
        (status = CONFLICT, description = "City already has an observation for this date", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to store observation", body = ErrorBody)
    ))]
pub async fn create_weather(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewObservation>,
) -> Result<(StatusCode, Json<Observation>), Error> {
    body.validate()?;
    if state.store.get_city(body.city_id).await?.is_none() {
        return Err(Error::UnknownCity(body.city_id));
    }

    let stored = state.store.insert_observation(body).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    put,
    path = "/api/weather/{id}",
    params(
        ("id" = i64, Path, description = "Observation id"),
    ),
    request_body = Observation,
    responses(
        (status = NO_CONTENT, description = "Observation updated"),
        (status = BAD_REQUEST, description = "Id mismatch or negative rain or wind", body = ErrorBody),
        (status = NOT_FOUND, description = "Observation or city not found", body = ErrorBody),
        (status = CONFLICT, description = "City already has another observation for this date", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to update observation", body = ErrorBody)
    ))]
pub async fn update_weather(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<Observation>,
) -> Result<StatusCode, Error> {
    if id != body.id {
        return Err(Error::IdMismatch {
            path: id,
            body: body.id,
        });
    }
    NewObservation::from(&body).validate()?;
    if state.store.get_city(body.city_id).await?.is_none() {
        return Err(Error::UnknownCity(body.city_id));
    }

    if state.store.update_observation(body).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::ObservationNotFound(id))
    }
}

#[utoipa::path(
    delete,
    path = "/api/weather/{id}",
    params(
        ("id" = i64, Path, description = "Observation id"),
    ),
    responses(
        (status = NO_CONTENT, description = "Observation deleted"),
        (status = NOT_FOUND, description = "No observation with this id", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to delete observation", body = ErrorBody)
    ))]
pub async fn delete_weather(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    if state.store.delete_observation(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::ObservationNotFound(id))
    }
}
