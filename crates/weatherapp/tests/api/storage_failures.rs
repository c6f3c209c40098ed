use crate::helpers::{spawn_app, storage_failure, MockWeatherAccess};
use hyper::StatusCode;
use mockall::predicate::eq;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use weatherapp::{City, Observation};

fn oulu() -> City {
    City {
        id: 1,
        name: String::from("Oulu"),
    }
}

#[tokio::test]
async fn count_surfaces_storage_errors_as_server_errors() {
    let mut weather_data = MockWeatherAccess::new();
    weather_data
        .expect_count_by_city_and_date_range()
        .times(1)
        .returning(|_, _, _| Err(storage_failure()));

    let test_app = spawn_app(Arc::new(weather_data)).await;
    let (status, body) = test_app
        .get::<Value>("/api/weather/count?startDate=2022-01-01&endDate=2022-01-03&cityId=1")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("disk I/O error"));
}

#[tokio::test]
async fn invalid_requests_never_reach_storage() {
    // no expectations: any storage call would panic the mock
    let test_app = spawn_app(Arc::new(MockWeatherAccess::new())).await;

    let (status, _) = test_app
        .get::<Value>("/api/weather/filtered?startDate=2022-01-05&endDate=2022-01-01&cityId=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .get::<Value>(
            "/api/weather/filtered?startDate=2022-01-01&endDate=2022-01-05&cityId=1&sortColumn=humidity&sortOrder=desc",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .get::<Value>(
            "/api/weather/filtered?startDate=2022-01-01&endDate=2022-01-05&cityId=1&sortColumn=humidity",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .get::<Value>("/api/weather/seed?startDate=2022-01-05&endDate=2022-01-01&cityId=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn seeding_stops_at_first_failed_write_without_rollback() {
    let mut weather_data = MockWeatherAccess::new();
    weather_data
        .expect_get_city()
        .with(eq(1))
        .times(1)
        .returning(|_| Ok(Some(oulu())));
    // one count up front, never a lookup per day
    weather_data
        .expect_count_by_city_and_date_range()
        .times(1)
        .returning(|_, _, _| Ok(0));

    let next_id = AtomicI64::new(1);
    weather_data
        .expect_upsert()
        .times(2)
        .returning(move |observation| {
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            if id == 2 {
                return Err(storage_failure());
            }
            Ok(Observation {
                id,
                date: observation.date,
                temperature: observation.temperature,
                rain: observation.rain,
                wind: observation.wind,
                city_id: observation.city_id,
                city: None,
            })
        });
    // no delete expectations: a rollback attempt would panic the mock

    let test_app = spawn_app(Arc::new(weather_data)).await;
    let (status, _) = test_app
        .get::<Value>("/api/weather/seed?startDate=2022-01-01&endDate=2022-01-10&cityId=1")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn page_joins_cities_fetched_separately() {
    let mut weather_data = MockWeatherAccess::new();
    weather_data
        .expect_query_by_city_and_date_range()
        .times(1)
        .returning(|city_id, start, _| {
            Ok(vec![Observation {
                id: 10,
                date: start,
                temperature: -8.0,
                rain: 3.0,
                wind: 2.0,
                city_id,
                city: None,
            }])
        });
    weather_data
        .expect_list_cities()
        .times(1)
        .returning(|| Ok(vec![oulu()]));

    let test_app = spawn_app(Arc::new(weather_data)).await;
    let (status, rows) = test_app
        .get::<Vec<Observation>>("/api/weather/filtered?startDate=2022-01-01&endDate=2022-01-03&cityId=1")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].city, Some(oulu()));
}
