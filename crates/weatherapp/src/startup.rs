use crate::{
    count_weather, create_weather, delete_weather, error, filtered_weather, get_city,
    get_weather, list_cities, list_weather, query, routes, seed_weather,
    seeding::{SeasonalRanges, Seeder},
    update_weather, City, NewObservation, Observation, WeatherStore,
};
use anyhow::{anyhow, bail};
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::{path::Path, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};
use weatherapp_core::path_exists;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WeatherStore>,
    pub seeder: Arc<Seeder>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn WeatherStore>,
        ranges: SeasonalRanges,
        rng_seed: Option<u64>,
    ) -> Self {
        let seeder = Arc::new(Seeder::with_seed(store.clone(), ranges, rng_seed));
        Self { store, seeder }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::weather::weather_routes::filtered_weather,
        routes::weather::weather_routes::list_weather,
        routes::weather::weather_routes::count_weather,
        routes::weather::weather_routes::seed_weather,
        routes::weather::weather_routes::get_weather,
        routes::weather::weather_routes::create_weather,
        routes::weather::weather_routes::update_weather,
        routes::weather::weather_routes::delete_weather,
        routes::cities::city_routes::list_cities,
        routes::cities::city_routes::get_city,
    ),
    components(
        schemas(
            Observation,
            NewObservation,
            City,
            error::ErrorBody,
            query::SortColumn,
            query::SortDirection,
        )
    ),
    tags(
        (name = "weather archive api", description = "daily temperature, rain and wind per city, with synthetic history generation")
    )
)]
struct ApiDoc;

/// Built-in table unless a replacement file is configured
pub fn load_seasonal_ranges(path: Option<&str>) -> anyhow::Result<SeasonalRanges> {
    match path {
        None => Ok(SeasonalRanges::default()),
        Some(path) if !path_exists(path) => bail!("seasonal ranges file not found: {}", path),
        Some(path) => {
            info!("Loading seasonal ranges from: {}", path);
            SeasonalRanges::from_file(Path::new(path))
                .map_err(|e| anyhow!("invalid seasonal ranges in {}: {:#}", path, e))
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/api/weather", get(list_weather).post(create_weather))
        .route("/api/weather/filtered", get(filtered_weather))
        .route("/api/weather/count", get(count_weather))
        .route("/api/weather/seed", get(seed_weather).post(seed_weather))
        .route(
            "/api/weather/{id}",
            get(get_weather).put(update_weather).delete(delete_weather),
        )
        .route("/api/city", get(list_cities))
        .route("/api/city/{id}", get(get_city))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default()
        .to_owned();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
