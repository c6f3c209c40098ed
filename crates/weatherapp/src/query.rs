//! Filtering, sorting and paging of stored observations.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap, str::FromStr};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};
use utoipa::ToSchema;

use crate::{City, Error, Observation, WeatherStore};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Accepts a plain `YYYY-MM-DD`, an RFC 3339 timestamp, or a timestamp without
/// offset. Only the calendar date is kept.
pub fn parse_date(value: &str) -> Result<Date, Error> {
    let value = value.trim();
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .or_else(|_| OffsetDateTime::parse(value, &Rfc3339).map(|dt| dt.date()))
        .or_else(|_| {
            PrimitiveDateTime::parse(
                value,
                format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            )
            .map(|dt| dt.date())
        })
        .or_else(|_| {
            PrimitiveDateTime::parse(
                value,
                format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
            )
            .map(|dt| dt.date())
        })
        .map_err(|_| Error::InvalidRange(format!("unparseable date: {value}")))
}

/// Selects one city's observations between two days, both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherFilter {
    start_date: Date,
    end_date: Date,
    city_id: i64,
}

impl WeatherFilter {
    pub fn new(start_date: Date, end_date: Date, city_id: i64) -> Result<Self, Error> {
        if start_date > end_date {
            return Err(Error::InvalidRange(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            city_id,
        })
    }

    pub fn start_date(&self) -> Date {
        self.start_date
    }

    pub fn end_date(&self) -> Date {
        self.end_date
    }

    pub fn city_id(&self) -> i64 {
        self.city_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    #[default]
    Date,
    Temperature,
    Rain,
    Wind,
}

impl FromStr for SortColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortColumn::Date),
            "temperature" => Ok(SortColumn::Temperature),
            "rain" => Ok(SortColumn::Rain),
            "wind" => Ok(SortColumn::Wind),
            _ => Err(Error::UnknownSortColumn(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortAndPage {
    pub column: SortColumn,
    pub direction: SortDirection,
    pub page_index: u32,
    pub page_size: u32,
}

impl Default for SortAndPage {
    fn default() -> Self {
        Self {
            column: SortColumn::Date,
            direction: SortDirection::Asc,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SortAndPage {
    /// Normalizes a raw sort request.
    ///
    /// An absent direction means ascending. An empty or unrecognized one means
    /// no active sort and resets the request to date ascending. A non-empty
    /// column is always checked, so an unknown one is an error either way.
    pub fn resolve(
        column: Option<&str>,
        direction: Option<&str>,
        page_index: u32,
        page_size: u32,
    ) -> Result<Self, Error> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }

        let column = column
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(SortColumn::from_str)
            .transpose()?;
        let direction = match direction {
            None => Some(SortDirection::Asc),
            Some(raw) => SortDirection::parse(raw.trim()),
        };
        let (column, direction) = match direction {
            Some(direction) => (column.unwrap_or_default(), direction),
            None => (SortColumn::Date, SortDirection::Asc),
        };

        Ok(Self {
            column,
            direction,
            page_index,
            page_size,
        })
    }
}

fn compare(column: SortColumn, a: &Observation, b: &Observation) -> Ordering {
    match column {
        SortColumn::Date => a.date.cmp(&b.date),
        SortColumn::Temperature => a.temperature.total_cmp(&b.temperature),
        SortColumn::Rain => a.rain.total_cmp(&b.rain),
        SortColumn::Wind => a.wind.total_cmp(&b.wind),
    }
}

/// Orders by the column in the given direction; equal values fall back to id
/// ascending whatever the direction.
pub fn sort_observations(rows: &mut [Observation], column: SortColumn, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let primary = match direction {
            SortDirection::Asc => compare(column, a, b),
            SortDirection::Desc => compare(column, b, a),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

/// Rows of the zero based page; past the last page this is empty
pub fn paginate(rows: Vec<Observation>, page_index: u32, page_size: u32) -> Vec<Observation> {
    let offset = (page_index as usize).saturating_mul(page_size as usize);
    rows.into_iter()
        .skip(offset)
        .take(page_size as usize)
        .collect()
}

/// Attaches each row's city from a separately fetched city list
pub fn attach_cities(rows: &mut [Observation], cities: &[City]) {
    let by_id: HashMap<i64, &City> = cities.iter().map(|c| (c.id, c)).collect();
    for row in rows {
        row.city = by_id.get(&row.city_id).map(|c| (*c).clone());
    }
}

pub async fn count(store: &dyn WeatherStore, filter: &WeatherFilter) -> Result<u64, Error> {
    store
        .count_by_city_and_date_range(filter.city_id, filter.start_date, filter.end_date)
        .await
}

pub async fn page(
    store: &dyn WeatherStore,
    filter: &WeatherFilter,
    sort_and_page: &SortAndPage,
) -> Result<Vec<Observation>, Error> {
    let mut rows = list(store, filter).await?;
    sort_observations(&mut rows, sort_and_page.column, sort_and_page.direction);
    Ok(paginate(rows, sort_and_page.page_index, sort_and_page.page_size))
}

/// Every matching row in storage order, which is date order for this store
pub async fn list(
    store: &dyn WeatherStore,
    filter: &WeatherFilter,
) -> Result<Vec<Observation>, Error> {
    store
        .query_by_city_and_date_range(filter.city_id, filter.start_date, filter.end_date)
        .await
}
