// Calendar aggregation - merges identity series into one padded day sequence
use crate::domain::contribution::{ContributionSeries, ContributionView, Identity};
use crate::domain::error::{SkylineError, SkylineResult};
use chrono::{Datelike, NaiveDate};

pub const DAYS_PER_WEEK: usize = 7;

/// Series loaded for one year. Either identity may be absent.
#[derive(Debug, Clone)]
pub struct YearContributions {
    pub year: i32,
    pub personal: Option<ContributionSeries>,
    pub all: Option<ContributionSeries>,
}

impl YearContributions {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            personal: None,
            all: None,
        }
    }

    pub fn series(&self, identity: Identity) -> Option<&ContributionSeries> {
        match identity {
            Identity::Personal => self.personal.as_ref(),
            Identity::All => self.all.as_ref(),
        }
    }

    pub fn set_series(&mut self, identity: Identity, series: ContributionSeries) {
        match identity {
            Identity::Personal => self.personal = Some(series),
            Identity::All => self.all = Some(series),
        }
    }

    fn require(&self, identity: Identity) -> SkylineResult<&ContributionSeries> {
        self.series(identity).ok_or(SkylineError::MissingSeries {
            year: self.year,
            identity,
        })
    }
}

/// Day counts padded at the front so index 0 sits in weekday column 0.
///
/// Entries are `None` only in the leading run; counts may be negative when a
/// Work view under-counts, and are rejected later by the grid planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedDaySequence {
    entries: Vec<Option<i64>>,
}

impl PaddedDaySequence {
    pub fn padded(
        leading_gap: usize,
        counts: impl IntoIterator<Item = i64>,
    ) -> SkylineResult<Self> {
        Self::from_entries(
            std::iter::repeat_n(None, leading_gap)
                .chain(counts.into_iter().map(Some))
                .collect(),
        )
    }

    /// Validates that absent entries form a single run at the front, shorter than a week.
    pub fn from_entries(entries: Vec<Option<i64>>) -> SkylineResult<Self> {
        let gap = entries.iter().take_while(|e| e.is_none()).count();

        if let Some(index) = entries[gap..].iter().position(|e| e.is_none()) {
            return Err(SkylineError::MalformedSequence(format!(
                "absent day at index {} follows a present day",
                gap + index
            )));
        }
        if gap >= DAYS_PER_WEEK && gap < entries.len() {
            return Err(SkylineError::MalformedSequence(format!(
                "leading gap of {} days spans a whole week",
                gap
            )));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Option<i64>] {
        &self.entries
    }

    pub fn leading_gap(&self) -> usize {
        self.entries.iter().take_while(|e| e.is_none()).count()
    }
}

/// Number of padding days before `first`: ISO weekday (Mon=1..Sun=7) mod 7,
/// so Sunday lands in row 0.
pub fn leading_gap(first: NaiveDate) -> usize {
    (first.weekday().number_from_monday() % 7) as usize
}

/// Per-date counts of one year for the requested view, in date order.
pub fn view_counts(
    year: &YearContributions,
    view: ContributionView,
) -> SkylineResult<Vec<(NaiveDate, i64)>> {
    let counts = match view {
        ContributionView::All => year
            .require(Identity::All)?
            .days()
            .map(|d| (d.date, i64::from(d.count)))
            .collect(),
        ContributionView::Personal => year
            .require(Identity::Personal)?
            .days()
            .map(|d| (d.date, i64::from(d.count)))
            .collect(),
        ContributionView::Work => {
            let personal = year.require(Identity::Personal)?;
            let all = year.require(Identity::All)?;
            if !all.same_dates(personal) {
                return Err(SkylineError::MisalignedSeries { year: year.year });
            }
            all.days()
                .zip(personal.days())
                .map(|(a, p)| (a.date, i64::from(a.count) - i64::from(p.count)))
                .collect()
        }
    };

    Ok(counts)
}

/// Concatenates the view of every year in ascending year order and pads the front.
pub fn aggregate(
    years: &[YearContributions],
    view: ContributionView,
) -> SkylineResult<PaddedDaySequence> {
    let mut ordered: Vec<&YearContributions> = years.iter().collect();
    ordered.sort_by_key(|y| y.year);

    let mut days = Vec::new();
    for year in ordered {
        days.extend(view_counts(year, view)?);
    }

    let gap = days.first().map(|(date, _)| leading_gap(*date)).unwrap_or(0);
    tracing::debug!(days = days.len(), gap, ?view, "Aggregated contribution calendar");

    PaddedDaySequence::padded(gap, days.into_iter().map(|(_, count)| count))
}
