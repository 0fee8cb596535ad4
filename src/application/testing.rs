// In-memory collaborators for application tests
use crate::application::contribution_fetcher::{ContributionFetcher, Credential};
use crate::application::contribution_repository::{ContributionRepository, PutOutcome};
use crate::domain::contribution::{ContributionSeries, DayCount, Identity};
use crate::domain::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn series_from(year: i32, counts: &[u32]) -> ContributionSeries {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    ContributionSeries::from_days(
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| DayCount::new(start + chrono::Days::new(i as u64), *c)),
    )
}

#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<HashMap<(String, i32, Identity), ContributionSeries>>,
    /// Simulates a concurrent writer winning every insert
    always_conflict: bool,
}

impl MemoryRepository {
    pub fn conflicting() -> Self {
        Self {
            always_conflict: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, user: &str, year: i32, identity: Identity, series: ContributionSeries) {
        self.rows
            .lock()
            .unwrap()
            .insert((user.to_string(), year, identity), series);
    }

    pub fn stored(&self, user: &str, year: i32, identity: Identity) -> Option<ContributionSeries> {
        self.rows
            .lock()
            .unwrap()
            .get(&(user.to_string(), year, identity))
            .cloned()
    }
}

#[async_trait]
impl ContributionRepository for MemoryRepository {
    async fn get(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
    ) -> anyhow::Result<Option<ContributionSeries>> {
        Ok(self.stored(user, year, identity))
    }

    async fn put(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
        series: &ContributionSeries,
    ) -> anyhow::Result<PutOutcome> {
        if self.always_conflict {
            return Ok(PutOutcome::Conflict);
        }
        let mut rows = self.rows.lock().unwrap();
        let key = (user.to_string(), year, identity);
        if rows.contains_key(&key) {
            return Ok(PutOutcome::Conflict);
        }
        rows.insert(key, series.clone());
        Ok(PutOutcome::Stored)
    }

    async fn list_years(&self, user: &str) -> anyhow::Result<Vec<i32>> {
        let rows = self.rows.lock().unwrap();
        let years: BTreeSet<i32> = rows
            .keys()
            .filter(|(u, _, _)| u == user)
            .map(|(_, year, _)| *year)
            .collect();
        Ok(years.into_iter().collect())
    }
}

/// Serves a fixed series per credential token and counts calls.
#[derive(Default)]
pub struct StaticFetcher {
    responses: Mutex<HashMap<String, Result<ContributionSeries, FetchError>>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn respond(&self, token: &str, response: Result<ContributionSeries, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(token.to_string(), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContributionFetcher for StaticFetcher {
    async fn fetch(
        &self,
        credential: &Credential,
        _user: &str,
        _year: i32,
    ) -> Result<ContributionSeries, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(credential.token())
            .cloned()
            .unwrap_or(Err(FetchError::Network("no response configured".to_string())))
    }
}
