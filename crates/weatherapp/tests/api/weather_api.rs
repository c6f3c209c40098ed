use crate::helpers::spawn_app_with_db;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use time::macros::date;
use weatherapp::{City, Observation, WeatherStore};

const JANUARY: &str = "startDate=2022-01-01&endDate=2022-01-03&cityId=1";

#[tokio::test]
async fn seeded_days_can_be_counted_and_listed() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, written) = test_app
        .get::<usize>(&format!("/api/weather/seed?{JANUARY}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(written, 3);

    let (status, count) = test_app
        .get::<u64>(&format!("/api/weather/count?{JANUARY}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count, 3);

    let (status, rows) = test_app
        .get::<Vec<Observation>>(&format!("/api/weather?{JANUARY}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!((-30.0..=0.0).contains(&row.temperature), "{row:?}");
        assert_eq!(row.city.as_ref().map(|c| c.name.as_str()), Some("Oulu"));
    }
}

#[tokio::test]
async fn seeding_accepts_iso_timestamps_and_post() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, body) = test_app
        .send(
            Method::POST,
            "/api/weather/seed?startDate=2022-07-01T00:00:00.000Z&endDate=2022-07-31T00:00:00.000Z&cityId=2",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<usize>(&body).unwrap(), 31);
}

#[tokio::test]
async fn reseeding_keeps_one_row_per_day() {
    let (test_app, db) = spawn_app_with_db().await;
    let range = "startDate=2022-02-20&endDate=2022-03-10&cityId=3";

    let (_, first) = test_app.get::<usize>(&format!("/api/weather/seed?{range}")).await;
    let (_, second) = test_app.get::<usize>(&format!("/api/weather/seed?{range}")).await;
    assert_eq!(first, 19);
    assert_eq!(first, second);

    let rows = db
        .query_by_city_and_date_range(3, date!(2022 - 01 - 01), date!(2022 - 12 - 31))
        .await
        .unwrap();
    let unique_days: HashSet<_> = rows.iter().map(|r| (r.city_id, r.date)).collect();
    assert_eq!(rows.len(), 19);
    assert_eq!(unique_days.len(), 19);
}

#[tokio::test]
async fn seeding_rejects_bad_input() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, body) = test_app
        .get::<Value>("/api/weather/seed?startDate=2022-01-01&endDate=2022-01-03&cityId=99")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "city 99 not found");

    let (status, _) = test_app
        .get::<Value>("/api/weather/seed?startDate=2022-01-03&endDate=2022-01-01&cityId=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .get::<Value>("/api/weather/seed?startDate=tomorrow&endDate=2022-01-01&cityId=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn page_sorted_by_temperature_descending() {
    let (test_app, _db) = spawn_app_with_db().await;
    for (day, temperature) in [("2022-01-01", -20.0), ("2022-01-02", -4.5), ("2022-01-03", -11.0)] {
        let (status, _) = test_app
            .send(
                Method::POST,
                "/api/weather",
                Some(json!({
                    "date": day,
                    "temperature": temperature,
                    "rain": 1.0,
                    "wind": 2.0,
                    "cityId": 1
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, rows) = test_app
        .get::<Vec<Observation>>(&format!(
            "/api/weather/filtered?{JANUARY}&sortColumn=temperature&sortOrder=desc&pageNumber=0&pageSize=2"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let temperatures: Vec<f64> = rows.iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![-4.5, -11.0]);
}

#[tokio::test]
async fn unknown_sort_column_is_a_client_error() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, body) = test_app
        .get::<Value>(&format!(
            "/api/weather/filtered?{JANUARY}&sortColumn=humidity&sortOrder=asc"
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown sort column: humidity");

    for order in ["", "&sortOrder=", "&sortOrder=sideways"] {
        let (status, body) = test_app
            .get::<Value>(&format!(
                "/api/weather/filtered?{JANUARY}&sortColumn=humidity{order}"
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "sortOrder {order:?}");
        assert_eq!(body["error"], "unknown sort column: humidity");
    }
}

#[tokio::test]
async fn sort_column_without_direction_sorts_ascending() {
    let (test_app, _db) = spawn_app_with_db().await;
    let range = "startDate=2022-10-01&endDate=2022-10-20&cityId=3";
    test_app.get::<usize>(&format!("/api/weather/seed?{range}")).await;

    let (status, rows) = test_app
        .get::<Vec<Observation>>(&format!(
            "/api/weather/filtered?{range}&sortColumn=temperature&pageSize=20"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), 20);
    for pair in rows.windows(2) {
        assert!(pair[0].temperature <= pair[1].temperature, "{pair:?}");
    }
}

#[tokio::test]
async fn count_rejects_inverted_range() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, _) = test_app
        .get::<Value>("/api/weather/count?startDate=2022-01-03&endDate=2022-01-01&cityId=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pages_add_up_to_count_and_run_out_empty() {
    let (test_app, _db) = spawn_app_with_db().await;
    let range = "startDate=2022-04-01&endDate=2022-04-25&cityId=4";
    test_app.get::<usize>(&format!("/api/weather/seed?{range}")).await;

    let (_, count) = test_app.get::<u64>(&format!("/api/weather/count?{range}")).await;
    assert_eq!(count, 25);

    let mut seen = Vec::new();
    for page in 0..4 {
        let (status, rows) = test_app
            .get::<Vec<Observation>>(&format!(
                "/api/weather/filtered?{range}&sortColumn=rain&sortOrder=asc&pageNumber={page}&pageSize=7"
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        seen.extend(rows);
    }
    assert_eq!(seen.len() as u64, count);
    for pair in seen.windows(2) {
        assert!(pair[0].rain <= pair[1].rain);
    }

    let (status, rows) = test_app
        .get::<Vec<Observation>>(&format!(
            "/api/weather/filtered?{range}&sortColumn=rain&sortOrder=asc&pageNumber=4&pageSize=7"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn empty_sort_direction_defaults_to_date_ascending() {
    let (test_app, _db) = spawn_app_with_db().await;
    let range = "startDate=2022-09-01&endDate=2022-09-12&cityId=5";
    test_app.get::<usize>(&format!("/api/weather/seed?{range}")).await;

    let (status, rows) = test_app
        .get::<Vec<Observation>>(&format!(
            "/api/weather/filtered?{range}&sortColumn=wind&sortOrder=&pageSize=12"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), 12);
    for pair in rows.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }

    let (status, _) = test_app
        .get::<Value>(&format!("/api/weather/filtered?{range}&pageSize=0"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn observation_crud_round_trip() {
    let (test_app, _db) = spawn_app_with_db().await;
    let new_row = json!({
        "date": "2022-05-05",
        "temperature": 12.5,
        "rain": 30.0,
        "wind": 4.0,
        "cityId": 2
    });

    let (status, body) = test_app
        .send(Method::POST, "/api/weather", Some(new_row.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Observation = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.date, date!(2022 - 05 - 05));

    let (status, _) = test_app
        .send(Method::POST, "/api/weather", Some(new_row))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) = test_app
        .get::<Observation>(&format!("/api/weather/{}", created.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let mut changed = created.clone();
    changed.temperature = 15.0;
    let (status, _) = test_app
        .send(
            Method::PUT,
            &format!("/api/weather/{}", created.id + 1),
            Some(serde_json::to_value(&changed).unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .send(
            Method::PUT,
            &format!("/api/weather/{}", created.id),
            Some(serde_json::to_value(&changed).unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, fetched) = test_app
        .get::<Observation>(&format!("/api/weather/{}", created.id))
        .await;
    assert_eq!(fetched.temperature, 15.0);

    let (status, _) = test_app
        .send(Method::DELETE, &format!("/api/weather/{}", created.id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = test_app
        .get::<Value>(&format!("/api/weather/{}", created.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = test_app
        .send(Method::DELETE, &format!("/api/weather/{}", created.id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_observations_are_rejected() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, _) = test_app
        .send(
            Method::POST,
            "/api/weather",
            Some(json!({
                "date": "2022-05-05",
                "temperature": 12.5,
                "rain": -1.0,
                "wind": 4.0,
                "cityId": 2
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app
        .send(
            Method::POST,
            "/api/weather",
            Some(json!({
                "date": "2022-05-05",
                "temperature": 12.5,
                "rain": 1.0,
                "wind": 4.0,
                "cityId": 77
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cities_are_listed_and_looked_up() {
    let (test_app, _db) = spawn_app_with_db().await;

    let (status, cities) = test_app.get::<Vec<City>>("/api/city").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cities.len(), 5);
    assert_eq!(cities[0].name, "Oulu");

    let (status, city) = test_app.get::<City>("/api/city/5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(city.name, "Tampere");

    let (status, _) = test_app.get::<Value>("/api/city/6").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
