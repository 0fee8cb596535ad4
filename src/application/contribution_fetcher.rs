// Fetcher trait for remote contribution calendars
use crate::domain::contribution::ContributionSeries;
use crate::domain::error::FetchError;
use async_trait::async_trait;
use std::fmt;

/// Bearer token used against the remote calendar.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[async_trait]
pub trait ContributionFetcher: Send + Sync {
    /// Fetch one calendar year of per-day counts for `user` as seen by `credential`
    async fn fetch(
        &self,
        credential: &Credential,
        user: &str,
        year: i32,
    ) -> Result<ContributionSeries, FetchError>;
}
