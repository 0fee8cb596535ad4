// Contribution calendar domain models
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Credential a series was imported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// Counts visible to the user's own credential
    Personal,
    /// Counts visible to the bot identity, including organizational activity
    All,
}

impl Identity {
    /// Import passes run in this order.
    pub const ALL: [Identity; 2] = [Identity::Personal, Identity::All];

    /// Importer tag used by the storage layer.
    pub fn importer(&self) -> &'static str {
        match self {
            Identity::Personal => "user",
            Identity::All => "bot",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Personal => f.write_str("personal"),
            Identity::All => f.write_str("all"),
        }
    }
}

/// Which slice of activity a model renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionView {
    #[default]
    All,
    Personal,
    Work,
}

impl ContributionView {
    /// Series that must be present to compute this view.
    pub fn required_identities(&self) -> &'static [Identity] {
        match self {
            ContributionView::All => &[Identity::All],
            ContributionView::Personal => &[Identity::Personal],
            ContributionView::Work => &[Identity::Personal, Identity::All],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ContributionView::All => "All",
            ContributionView::Personal => "Personal",
            ContributionView::Work => "Work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
}

impl DayCount {
    pub fn new(date: NaiveDate, count: u32) -> Self {
        Self { date, count }
    }
}

/// Per-day counts for one (user, year, identity), ordered by date.
///
/// Serialized as a JSON object keyed by ISO date, which is also the storage format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributionSeries {
    days: BTreeMap<NaiveDate, u32>,
}

impl ContributionSeries {
    /// Later entries for an already-seen date replace earlier ones.
    pub fn from_days(days: impl IntoIterator<Item = DayCount>) -> Self {
        Self {
            days: days.into_iter().map(|d| (d.date, d.count)).collect(),
        }
    }

    pub fn days(&self) -> impl Iterator<Item = DayCount> + '_ {
        self.days.iter().map(|(date, count)| DayCount::new(*date, *count))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.days.values().map(|c| u64::from(*c)).sum()
    }

    /// True when both series enumerate exactly the same dates.
    pub fn same_dates(&self, other: &ContributionSeries) -> bool {
        self.days.len() == other.days.len() && self.days.keys().eq(other.days.keys())
    }
}
