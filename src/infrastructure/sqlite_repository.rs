// SQLite repository implementation
use crate::application::contribution_repository::{ContributionRepository, PutOutcome};
use crate::domain::contribution::{ContributionSeries, Identity};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS contribution_data (
    user TEXT NOT NULL,
    year INTEGER NOT NULL,
    importer TEXT NOT NULL,
    contributions TEXT NOT NULL,
    PRIMARY KEY (user, year, importer)
);";

/// Stores one row per (user, year, importer) with the series as a JSON object.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create contribution_data table")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("database connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }
}

#[async_trait]
impl ContributionRepository for SqliteRepository {
    async fn get(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
    ) -> Result<Option<ContributionSeries>> {
        let user = user.to_string();
        let json: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT contributions FROM contribution_data
                         WHERE user = ?1 AND year = ?2 AND importer = ?3",
                        params![user, year, identity.importer()],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        json.map(|json| {
            serde_json::from_str(&json)
                .with_context(|| format!("Corrupt contributions for {} {}", year, identity))
        })
        .transpose()
    }

    async fn put(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
        series: &ContributionSeries,
    ) -> Result<PutOutcome> {
        let user = user.to_string();
        let json = serde_json::to_string(series)?;

        let inserted = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "INSERT INTO contribution_data (user, year, importer, contributions)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (user, year, importer) DO NOTHING",
                    params![user, year, identity.importer(), json],
                )?)
            })
            .await?;

        Ok(if inserted == 0 {
            PutOutcome::Conflict
        } else {
            PutOutcome::Stored
        })
    }

    async fn list_years(&self, user: &str) -> Result<Vec<i32>> {
        let user = user.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT year FROM contribution_data WHERE user = ?1 ORDER BY year",
            )?;
            let years = stmt
                .query_map(params![user], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i32>>>()?;
            Ok(years)
        })
        .await
    }
}
