use rand::Rng;
use time::Date;

use super::seasonal::SeasonalRanges;
use crate::Error;

/// Largest day-to-day step of any quantity, in hundredths
pub const MAX_STEP_HUNDREDTHS: i32 = 500;

/// Largest day-to-day step of any quantity
pub const MAX_STEP: f64 = MAX_STEP_HUNDREDTHS as f64 / 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub wind: f64,
    pub rain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedDay {
    pub date: Date,
    pub reading: Reading,
}

/// Bounded random walk over days: each value is yesterday's value plus a small
/// uniform step, clamped into that month's seasonal bounds.
#[derive(Debug, Clone, Default)]
pub struct WeatherGenerator {
    ranges: SeasonalRanges,
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn step<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    f64::from(rng.gen_range(-MAX_STEP_HUNDREDTHS..=MAX_STEP_HUNDREDTHS)) / 100.0
}

impl WeatherGenerator {
    pub fn new(ranges: SeasonalRanges) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &SeasonalRanges {
        &self.ranges
    }

    /// Unconstrained starting point of a walk; the first generated day clamps it
    pub fn initial_reading<R: Rng + ?Sized>(rng: &mut R) -> Reading {
        Reading {
            temperature: f64::from(rng.gen_range(-30..=30)),
            wind: f64::from(rng.gen_range(0..=20)),
            rain: f64::from(rng.gen_range(0..=20)),
        }
    }

    /// Unclamped successor of `previous`
    pub fn perturb<R: Rng + ?Sized>(rng: &mut R, previous: &Reading) -> Reading {
        Reading {
            temperature: round_hundredths(previous.temperature + step(rng)),
            wind: round_hundredths(previous.wind + step(rng)),
            rain: round_hundredths(previous.rain + step(rng)),
        }
    }

    pub fn clamp(&self, date: Date, reading: Reading) -> Reading {
        let range = self.ranges.for_month(date.month());
        Reading {
            temperature: range.temperature.clamp(reading.temperature),
            wind: range.wind.clamp(reading.wind),
            rain: range.rain.clamp(reading.rain),
        }
    }

    pub fn next_reading<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        date: Date,
        previous: &Reading,
    ) -> Reading {
        self.clamp(date, Self::perturb(rng, previous))
    }

    /// One reading per day from `start` to `end` inclusive, in date order
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        start: Date,
        end: Date,
    ) -> Result<Vec<GeneratedDay>, Error> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let days = usize::try_from((end - start).whole_days())
            .map_or(0, |span| span.saturating_add(1));
        let mut generated = Vec::with_capacity(days);
        let mut previous = Self::initial_reading(rng);
        let mut date = start;

        loop {
            let reading = self.next_reading(rng, date, &previous);
            generated.push(GeneratedDay { date, reading });
            previous = reading;

            match date.next_day() {
                Some(next) if next <= end => date = next,
                _ => break,
            }
        }

        Ok(generated)
    }
}
