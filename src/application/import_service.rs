// Import service - Use case for importing a user's calendar year
use crate::application::contribution_fetcher::{ContributionFetcher, Credential};
use crate::application::contribution_repository::{ContributionRepository, PutOutcome};
use crate::domain::contribution::Identity;
use crate::domain::error::{FetchError, SkylineError, SkylineResult};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Contribution calendars do not go back further than this.
pub const FIRST_IMPORTABLE_YEAR: i32 = 2005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    NotImported,
    /// One identity is stored and the other is not
    Importing,
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported { imported: Vec<Identity> },
    AlreadyImported,
}

#[derive(Clone)]
pub struct ImportService {
    repository: Arc<dyn ContributionRepository>,
    fetcher: Arc<dyn ContributionFetcher>,
    bot_credential: Credential,
}

impl ImportService {
    pub fn new(
        repository: Arc<dyn ContributionRepository>,
        fetcher: Arc<dyn ContributionFetcher>,
        bot_credential: Credential,
    ) -> Self {
        Self {
            repository,
            fetcher,
            bot_credential,
        }
    }

    /// Only completed years since the first calendar year can be imported
    pub fn validate_year(year: i32, current_year: i32) -> SkylineResult<()> {
        if year < FIRST_IMPORTABLE_YEAR {
            return Err(SkylineError::InvalidYear {
                year,
                reason: format!("year must be {} or later", FIRST_IMPORTABLE_YEAR),
            });
        }
        if year >= current_year {
            return Err(SkylineError::InvalidYear {
                year,
                reason: "only completed years can be imported".to_string(),
            });
        }
        Ok(())
    }

    pub async fn import_state(&self, user: &str, year: i32) -> SkylineResult<ImportState> {
        let missing = self.missing_identities(user, year).await?;
        Ok(match missing.len() {
            0 => ImportState::Imported,
            n if n == Identity::ALL.len() => ImportState::NotImported,
            _ => ImportState::Importing,
        })
    }

    /// Import whichever identities are not stored yet for (user, year).
    ///
    /// Both passes are attempted even if the first fails, so a retry only has
    /// to re-run the pass that is still missing.
    pub async fn import_year(
        &self,
        user: &str,
        year: i32,
        user_credential: &Credential,
    ) -> SkylineResult<ImportOutcome> {
        Self::validate_year(year, Utc::now().year())?;

        let missing = self.missing_identities(user, year).await?;
        if missing.is_empty() {
            tracing::info!(user, year, "Contributions already imported");
            return Ok(ImportOutcome::AlreadyImported);
        }

        let mut imported = Vec::new();
        let mut failure = None;

        for identity in missing {
            let credential = match identity {
                Identity::Personal => user_credential,
                Identity::All => &self.bot_credential,
            };

            match self.import_pass(user, year, identity, credential).await {
                Ok(PutOutcome::Stored) => imported.push(identity),
                Ok(PutOutcome::Conflict) => {
                    tracing::warn!(
                        user,
                        year,
                        %identity,
                        "Contributions imported concurrently, keeping stored series"
                    );
                }
                Err(err) => {
                    tracing::warn!(user, year, %identity, error = %err, "Import pass failed");
                    failure.get_or_insert(err);
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        if imported.is_empty() {
            Ok(ImportOutcome::AlreadyImported)
        } else {
            Ok(ImportOutcome::Imported { imported })
        }
    }

    async fn missing_identities(&self, user: &str, year: i32) -> SkylineResult<Vec<Identity>> {
        let mut missing = Vec::new();
        for identity in Identity::ALL {
            if self.repository.get(user, year, identity).await?.is_none() {
                missing.push(identity);
            }
        }
        Ok(missing)
    }

    async fn import_pass(
        &self,
        user: &str,
        year: i32,
        identity: Identity,
        credential: &Credential,
    ) -> SkylineResult<PutOutcome> {
        tracing::info!(user, year, %identity, "Importing contributions");

        if credential.is_empty() {
            return Err(FetchError::Unauthorized.into());
        }

        let series = self.fetcher.fetch(credential, user, year).await?;
        let outcome = self.repository.put(user, year, identity, &series).await?;

        if outcome == PutOutcome::Stored {
            tracing::info!(
                user,
                year,
                %identity,
                days = series.len(),
                total_contributions = series.total(),
                "Imported contributions"
            );
        }

        Ok(outcome)
    }
}
