pub mod sqlite;

pub use sqlite::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};
use utoipa::ToSchema;

use crate::Error;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Day granularity format used for the `date` column and JSON payloads
pub const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// One day's weather record for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: i64,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "2022-01-01")]
    pub date: Date,
    pub temperature: f64,
    pub rain: f64,
    pub wind: f64,
    pub city_id: i64,
    /// Filled in by the caller after the query, never by storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
}

/// An observation that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewObservation {
    #[serde(with = "iso_date")]
    #[schema(value_type = String, format = Date, example = "2022-01-01")]
    pub date: Date,
    pub temperature: f64,
    pub rain: f64,
    pub wind: f64,
    pub city_id: i64,
}

impl NewObservation {
    /// Rain and wind are magnitudes and can't go below zero
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("temperature", self.temperature),
            ("rain", self.rain),
            ("wind", self.wind),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidObservation(format!("{name} must be a number")));
            }
        }
        if self.rain < 0.0 {
            return Err(Error::InvalidObservation(String::from(
                "rain can not be negative",
            )));
        }
        if self.wind < 0.0 {
            return Err(Error::InvalidObservation(String::from(
                "wind can not be negative",
            )));
        }
        Ok(())
    }
}

impl From<&Observation> for NewObservation {
    fn from(value: &Observation) -> Self {
        NewObservation {
            date: value.date,
            temperature: value.temperature,
            rain: value.rain,
            wind: value.wind,
            city_id: value.city_id,
        }
    }
}

/// Persistence of cities and observations.
///
/// Observation rows are owned here; the generator and the query pipeline only
/// compute values and results on top of these calls.
#[async_trait]
pub trait WeatherStore: Sync + Send {
    async fn get_city(&self, city_id: i64) -> Result<Option<City>, Error>;
    async fn list_cities(&self) -> Result<Vec<City>, Error>;
    async fn find_by_city_and_date(
        &self,
        city_id: i64,
        date: Date,
    ) -> Result<Option<Observation>, Error>;
    /// Insert, or overwrite the values of the row already stored for the same
    /// (city, date). The id of an existing row is preserved.
    async fn upsert(&self, observation: NewObservation) -> Result<Observation, Error>;
    /// All rows for the city with `start <= date <= end`, in date order
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
    /// Returns false when no row has the given id
    async fn update_observation(&self, observation: Observation) -> Result<bool, Error>;
    /// Returns false when no row has the given id
    async fn delete_observation(&self, id: i64) -> Result<bool, Error>;
}
