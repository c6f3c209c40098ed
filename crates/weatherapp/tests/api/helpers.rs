use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use hyper::{header, Method};
use mockall::mock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use time::Date;
use tower::ServiceExt;
use weatherapp::{
    app, seeding::SeasonalRanges, AppState, City, Database, Error, NewObservation, Observation,
    WeatherStore,
};

mock! {
    pub WeatherAccess {}
    #[async_trait]
    impl WeatherStore for WeatherAccess {
        async fn get_city(&self, city_id: i64) -> Result<Option<City>, Error>;
        async fn list_cities(&self) -> Result<Vec<City>, Error>;
        async fn find_by_city_and_date(
            &self,
            city_id: i64,
            date: Date,
        ) -> Result<Option<Observation>, Error>;
        async fn upsert(&self, observation: NewObservation) -> Result<Observation, Error>;
        async fn query_by_city_and_date_range(
            &self,
            city_id: i64,
            start: Date,
            end: Date,
        ) -> Result<Vec<Observation>, Error>;
        async fn count_by_city_and_date_range(
            &self,
            city_id: i64,
            start: Date,
            end: Date,
        ) -> Result<u64, Error>;
        async fn get_observation(&self, id: i64) -> Result<Option<Observation>, Error>;
        async fn insert_observation(&self, observation: NewObservation) -> Result<Observation, Error>;
        async fn update_observation(&self, observation: Observation) -> Result<bool, Error>;
        async fn delete_observation(&self, id: i64) -> Result<bool, Error>;
    }
}

pub struct TestApp {
    pub app: Router,
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    pub async fn get<T: DeserializeOwned>(&self, uri: &str) -> (StatusCode, T) {
        let (status, body) = self.send(Method::GET, uri, None).await;
        let parsed = serde_json::from_slice(&body)
            .unwrap_or_else(|e| panic!("{uri} returned {status} with unexpected body: {e}"));
        (status, parsed)
    }
}

pub async fn spawn_app(store: Arc<dyn WeatherStore>) -> TestApp {
    let state = AppState::new(store, SeasonalRanges::default(), Some(42));
    TestApp { app: app(state) }
}

pub async fn spawn_app_with_db() -> (TestApp, Arc<Database>) {
    let db = Arc::new(Database::in_memory().await.expect("in-memory database"));
    let test_app = spawn_app(db.clone()).await;
    (test_app, db)
}

pub fn storage_failure() -> Error {
    Error::Storage(anyhow::anyhow!("disk I/O error"))
}
