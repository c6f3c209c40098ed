use serde::Deserialize;
use std::path::Path;
use time::Month;

/// Inclusive `[low, high]` interval, written as a two element array in TOML
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(f64, f64)")]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl From<(f64, f64)> for Bounds {
    fn from((low, high): (f64, f64)) -> Self {
        Bounds { low, high }
    }
}

impl Bounds {
    pub const fn new(low: f64, high: f64) -> Self {
        Bounds { low, high }
    }

    /// Pins a value that left the interval to the edge it crossed
    pub fn clamp(&self, value: f64) -> f64 {
        if value > self.high {
            self.high
        } else if value < self.low {
            self.low
        } else {
            value
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MonthRange {
    /// Calendar month, 1 = January
    pub month: u8,
    pub temperature: Bounds,
    pub wind: Bounds,
    pub rain: Bounds,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SeasonalRangeError {
    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u8),
    #[error("month {0} is listed more than once")]
    DuplicateMonth(u8),
    #[error("month {0} has no range")]
    MissingMonth(u8),
    #[error("month {month}: {quantity} low bound {low} is above high bound {high}")]
    InvertedBounds {
        month: u8,
        quantity: &'static str,
        low: f64,
        high: f64,
    },
    #[error("month {month}: {quantity} bounds must be finite numbers")]
    NonFiniteBounds { month: u8, quantity: &'static str },
    #[error("month {month}: {quantity} can not go below zero")]
    NegativeMagnitude { month: u8, quantity: &'static str },
}

#[derive(Debug, Deserialize)]
struct SeasonalRangesFile {
    months: Vec<MonthRange>,
}

/// Month specific bounds that keep generated weather plausible.
///
/// Always holds exactly one entry per calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalRanges {
    months: [MonthRange; 12],
}

const fn month_range(
    month: u8,
    temperature: (f64, f64),
    wind: (f64, f64),
    rain: (f64, f64),
) -> MonthRange {
    MonthRange {
        month,
        temperature: Bounds::new(temperature.0, temperature.1),
        wind: Bounds::new(wind.0, wind.1),
        rain: Bounds::new(rain.0, rain.1),
    }
}

const FINNISH_CLIMATE: [MonthRange; 12] = [
    month_range(1, (-30.0, 0.0), (0.0, 10.0), (0.0, 50.0)),
    month_range(2, (-25.0, 5.0), (0.0, 10.0), (5.0, 50.0)),
    month_range(3, (-20.0, 5.0), (0.0, 10.0), (5.0, 50.0)),
    month_range(4, (-10.0, 15.0), (0.0, 10.0), (10.0, 50.0)),
    month_range(5, (0.0, 25.0), (0.0, 10.0), (20.0, 60.0)),
    month_range(6, (5.0, 30.0), (0.0, 10.0), (30.0, 80.0)),
    month_range(7, (10.0, 30.0), (0.0, 10.0), (40.0, 100.0)),
    month_range(8, (10.0, 30.0), (0.0, 10.0), (40.0, 90.0)),
    month_range(9, (0.0, 15.0), (0.0, 10.0), (30.0, 80.0)),
    month_range(10, (-10.0, 10.0), (0.0, 10.0), (20.0, 75.0)),
    month_range(11, (-20.0, 5.0), (0.0, 10.0), (15.0, 70.0)),
    month_range(12, (-25.0, 5.0), (0.0, 10.0), (10.0, 60.0)),
];

impl Default for SeasonalRanges {
    fn default() -> Self {
        SeasonalRanges {
            months: FINNISH_CLIMATE,
        }
    }
}

impl SeasonalRanges {
    /// Builds a table from entries in any order
    pub fn new(entries: Vec<MonthRange>) -> Result<Self, SeasonalRangeError> {
        let mut slots: [Option<MonthRange>; 12] = [None; 12];

        for entry in entries {
            if !(1..=12).contains(&entry.month) {
                return Err(SeasonalRangeError::InvalidMonth(entry.month));
            }
            for (quantity, bounds) in [
                ("temperature", entry.temperature),
                ("wind", entry.wind),
                ("rain", entry.rain),
            ] {
                if !bounds.low.is_finite() || !bounds.high.is_finite() {
                    return Err(SeasonalRangeError::NonFiniteBounds {
                        month: entry.month,
                        quantity,
                    });
                }
                if bounds.low > bounds.high {
                    return Err(SeasonalRangeError::InvertedBounds {
                        month: entry.month,
                        quantity,
                        low: bounds.low,
                        high: bounds.high,
                    });
                }
            }
            for (quantity, bounds) in [("wind", entry.wind), ("rain", entry.rain)] {
                if bounds.low < 0.0 {
                    return Err(SeasonalRangeError::NegativeMagnitude {
                        month: entry.month,
                        quantity,
                    });
                }
            }

            let slot = &mut slots[usize::from(entry.month - 1)];
            if slot.is_some() {
                return Err(SeasonalRangeError::DuplicateMonth(entry.month));
            }
            *slot = Some(entry);
        }

        let mut months = FINNISH_CLIMATE;
        for (index, slot) in slots.into_iter().enumerate() {
            // index < 12, so the cast can't truncate
            months[index] = slot.ok_or(SeasonalRangeError::MissingMonth(index as u8 + 1))?;
        }

        Ok(SeasonalRanges { months })
    }

    /// Loads a `[[months]]` TOML table replacing the built-in one
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file: SeasonalRangesFile = weatherapp_core::load_toml(path)?;
        Ok(Self::new(file.months)?)
    }

    pub fn for_month(&self, month: Month) -> &MonthRange {
        &self.months[usize::from(u8::from(month) - 1)]
    }

    pub fn months(&self) -> &[MonthRange; 12] {
        &self.months
    }
}
