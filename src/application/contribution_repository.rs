// Repository trait for imported contribution calendars
use crate::domain::contribution::{ContributionSeries, Identity};
use async_trait::async_trait;

/// Result of storing a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// A series already exists for (user, year, identity); the stored one is untouched
    Conflict,
}

#[async_trait]
pub trait ContributionRepository: Send + Sync {
    /// Get the series imported for (user, year, identity), if any
    async fn get(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
    ) -> anyhow::Result<Option<ContributionSeries>>;

    /// Store a series. Never overwrites; a duplicate key reports `Conflict`
    async fn put(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
        series: &ContributionSeries,
    ) -> anyhow::Result<PutOutcome>;

    /// Distinct years with at least one imported series, ascending
    async fn list_years(&self, user: &str) -> anyhow::Result<Vec<i32>>;
}
