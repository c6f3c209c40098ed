//! Synthetic weather history.
//!
//! [`WeatherGenerator`] produces the series, [`Seeder`] merges it into a
//! [`WeatherStore`] one row at a time.

mod generator;
mod seasonal;

pub use generator::*;
pub use seasonal::*;

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use time::Date;
use tokio::sync::Mutex;

use crate::{db::NewObservation, Error, WeatherStore};

pub struct Seeder {
    generator: WeatherGenerator,
    store: Arc<dyn WeatherStore>,
    rng: Mutex<StdRng>,
}

impl Seeder {
    pub fn new(store: Arc<dyn WeatherStore>, ranges: SeasonalRanges, rng: StdRng) -> Self {
        Self {
            generator: WeatherGenerator::new(ranges),
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Seeded from a fixed value when given, otherwise from OS entropy
    pub fn with_seed(
        store: Arc<dyn WeatherStore>,
        ranges: SeasonalRanges,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(store, ranges, rng)
    }

    /// Regenerates every day of `start..=end` for the city and returns the
    /// number of rows written.
    ///
    /// Existing rows keep their id and get new values. Rows written before a
    /// storage failure stay written.
    pub async fn seed(&self, start: Date, end: Date, city_id: i64) -> Result<usize, Error> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let city = self
            .store
            .get_city(city_id)
            .await?
            .ok_or(Error::UnknownCity(city_id))?;

        let days = {
            let mut rng = self.rng.lock().await;
            self.generator.generate(&mut *rng, start, end)?
        };

        // rows already present in the range are the ones the upserts overwrite
        let existing = self
            .store
            .count_by_city_and_date_range(city.id, start, end)
            .await?;

        for day in &days {
            let stored = self
                .store
                .upsert(NewObservation {
                    date: day.date,
                    temperature: day.reading.temperature,
                    rain: day.reading.rain,
                    wind: day.reading.wind,
                    city_id: city.id,
                })
                .await?;
            debug!("seeded {:?}", stored);
        }

        let updated = usize::try_from(existing).map_or(days.len(), |n| n.min(days.len()));
        let inserted = days.len() - updated;
        info!(
            "seeded {} days for {} ({} to {}): {} inserted, {} updated",
            days.len(),
            city.name,
            start,
            end,
            inserted,
            updated
        );

        Ok(days.len())
    }
}
