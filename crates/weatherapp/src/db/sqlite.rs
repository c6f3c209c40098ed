use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::{future::Future, path::Path, str::FromStr, time::Duration};
use time::Date;
use tokio::{
    fs::create_dir_all,
    sync::{mpsc, oneshot},
};

use super::{City, NewObservation, Observation, WeatherStore, DATE_FORMAT};
use crate::Error;

type WriteOperation = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

/// Funnels every write through one task so SQLite only ever sees a single writer
pub struct DatabaseWriter {
    write_tx: mpsc::UnboundedSender<WriteOperation>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for DatabaseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseWriter {
    pub fn new() -> Self {
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<WriteOperation>();

        let handle = tokio::spawn(async move {
            while let Some(future) = write_rx.recv().await {
                future.await;
            }
        });

        Self {
            write_tx,
            _handle: handle,
        }
    }

    pub async fn execute<T, F, Fut>(&self, pool: SqlitePool, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqlitePool) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel::<Result<T>>();

        let write_op = Box::pin(async move {
            let result = operation(pool).await;
            let _ = result_tx.send(result);
        });

        self.write_tx
            .send(write_op)
            .map_err(|_| anyhow::anyhow!("Database writer channel closed"))?;

        result_rx
            .await
            .map_err(|_| anyhow::anyhow!("Failed to receive write result"))?
    }
}

pub struct Database {
    pool: SqlitePool,
    writer: DatabaseWriter,
}

const OBSERVATION_COLUMNS: &str = "id, date, temperature, rain, wind, city_id";

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        let db_path = format!("{}/weather.sqlite", path);

        if let Some(parent) = Path::new(&db_path).parent() {
            create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory: {parent:?}"))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
            .create_if_missing(true)
            .pragma("journal_mode", "WAL")
            .pragma("synchronous", "NORMAL")
            .pragma("busy_timeout", "5000")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let db = Self::from_pool(pool).await?;
        info!("SQLite database initialized at: {}", db_path);
        Ok(db)
    }

    /// Private database living as long as the returned value, used by tests
    pub async fn in_memory() -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:")?.pragma("foreign_keys", "ON");

        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to create in-memory database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self {
            pool,
            writer: DatabaseWriter::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database connectivity check failed")?;
        Ok(())
    }

    /// Flush the WAL into the main database file before shutdown
    pub async fn checkpoint(&self) {
        match sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&self.pool)
            .await
        {
            Ok(_) => info!("WAL checkpoint completed successfully"),
            Err(e) => log::error!("WAL checkpoint failed: {}", e),
        }
    }
}

fn format_date(date: Date) -> Result<String> {
    date.format(DATE_FORMAT)
        .with_context(|| format!("Failed to format date {date:?}"))
}

fn row_to_observation(row: &SqliteRow) -> Result<Observation> {
    let date: String = row.try_get("date")?;
    Ok(Observation {
        id: row.try_get("id")?,
        date: Date::parse(&date, DATE_FORMAT)
            .with_context(|| format!("Stored date is not YYYY-MM-DD: {date}"))?,
        temperature: row.try_get("temperature")?,
        rain: row.try_get("rain")?,
        wind: row.try_get("wind")?,
        city_id: row.try_get("city_id")?,
        city: None,
    })
}

fn rows_to_observations(rows: Vec<SqliteRow>) -> Result<Vec<Observation>> {
    rows.iter().map(row_to_observation).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl WeatherStore for Database {
    async fn get_city(&self, city_id: i64) -> Result<Option<City>, Error> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM city WHERE id = ?")
            .bind(city_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, name)| City { id, name }))
    }

    async fn list_cities(&self) -> Result<Vec<City>, Error> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM city ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| City { id, name })
            .collect())
    }

    async fn find_by_city_and_date(
        &self,
        city_id: i64,
        date: Date,
    ) -> Result<Option<Observation>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM weather WHERE city_id = ? AND date = ?"
        ))
        .bind(city_id)
        .bind(format_date(date)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_observation).transpose()?)
    }

    async fn upsert(&self, observation: NewObservation) -> Result<Observation, Error> {
        let pool = self.pool.clone();
        let date = format_date(observation.date)?;

        let stored = self
            .writer
            .execute(pool, move |pool| async move {
                let row = sqlx::query(&format!(
                    "INSERT INTO weather (date, temperature, rain, wind, city_id)
                     VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT (city_id, date) DO UPDATE SET
                        temperature = excluded.temperature,
                        rain = excluded.rain,
                        wind = excluded.wind
                     RETURNING {OBSERVATION_COLUMNS}"
                ))
                .bind(&date)
                .bind(observation.temperature)
                .bind(observation.rain)
                .bind(observation.wind)
                .bind(observation.city_id)
                .fetch_one(&pool)
                .await
                .with_context(|| {
                    format!(
                        "Failed to upsert weather for city {} on {}",
                        observation.city_id, date
                    )
                })?;

                row_to_observation(&row)
            })
            .await?;

        Ok(stored)
    }

    async fn query_by_city_and_date_range(
        &self,
        city_id: i64,
        start: Date,
        end: Date,
    ) -> Result<Vec<Observation>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM weather
             WHERE city_id = ? AND date >= ? AND date <= ?
             ORDER BY date, id"
        ))
        .bind(city_id)
        .bind(format_date(start)?)
        .bind(format_date(end)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows_to_observations(rows)?)
    }

    async fn count_by_city_and_date_range(
        &self,
        city_id: i64,
        start: Date,
        end: Date,
    ) -> Result<u64, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM weather WHERE city_id = ? AND date >= ? AND date <= ?",
        )
        .bind(city_id)
        .bind(format_date(start)?)
        .bind(format_date(end)?)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).context("Negative row count")?)
    }

    async fn get_observation(&self, id: i64) -> Result<Option<Observation>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM weather WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_observation).transpose()?)
    }

    async fn insert_observation(&self, observation: NewObservation) -> Result<Observation, Error> {
        let pool = self.pool.clone();
        let date = format_date(observation.date)?;

        self.writer
            .execute(pool, move |pool| async move {
                let result = sqlx::query(&format!(
                    "INSERT INTO weather (date, temperature, rain, wind, city_id)
                     VALUES (?, ?, ?, ?, ?)
                     RETURNING {OBSERVATION_COLUMNS}"
                ))
                .bind(&date)
                .bind(observation.temperature)
                .bind(observation.rain)
                .bind(observation.wind)
                .bind(observation.city_id)
                .fetch_one(&pool)
                .await;

                match result {
                    Ok(row) => Ok(row_to_observation(&row).map_err(Error::Storage)),
                    Err(e) if is_unique_violation(&e) => Ok(Err(Error::DuplicateObservation {
                        city_id: observation.city_id,
                        date: observation.date,
                    })),
                    Err(e) => Err(anyhow::Error::from(e).context("Failed to insert weather")),
                }
            })
            .await?
    }

    async fn update_observation(&self, observation: Observation) -> Result<bool, Error> {
        let pool = self.pool.clone();
        let date = format_date(observation.date)?;

        self.writer
            .execute(pool, move |pool| async move {
                let result = sqlx::query(
                    "UPDATE weather
                     SET date = ?, temperature = ?, rain = ?, wind = ?, city_id = ?
                     WHERE id = ?",
                )
                .bind(&date)
                .bind(observation.temperature)
                .bind(observation.rain)
                .bind(observation.wind)
                .bind(observation.city_id)
                .bind(observation.id)
                .execute(&pool)
                .await;

                match result {
                    Ok(done) => Ok(Ok(done.rows_affected() > 0)),
                    Err(e) if is_unique_violation(&e) => Ok(Err(Error::DuplicateObservation {
                        city_id: observation.city_id,
                        date: observation.date,
                    })),
                    Err(e) => Err(anyhow::Error::from(e).context("Failed to update weather")),
                }
            })
            .await?
    }

    async fn delete_observation(&self, id: i64) -> Result<bool, Error> {
        let pool = self.pool.clone();

        let deleted = self
            .writer
            .execute(pool, move |pool| async move {
                let done = sqlx::query("DELETE FROM weather WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await
                    .context("Failed to delete weather")?;
                Ok(done.rows_affected() > 0)
            })
            .await?;

        Ok(deleted)
    }
}
