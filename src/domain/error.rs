// Error taxonomy shared by every layer
use crate::domain::contribution::Identity;
use std::fmt;

/// Kernel stage that failed while realising a grid plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryStage {
    Plinth,
    Tower,
    Label,
    Assembly,
    Export,
}

impl fmt::Display for GeometryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryStage::Plinth => "plinth",
            GeometryStage::Tower => "tower",
            GeometryStage::Label => "label",
            GeometryStage::Assembly => "assembly",
            GeometryStage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Failure of a remote calendar fetch. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("remote calendar rate limit exceeded")]
    RateLimited,
    #[error("remote calendar rejected the credential")]
    Unauthorized,
    #[error("remote calendar request failed: {0}")]
    Network(String),
    #[error("remote calendar returned an unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SkylineError {
    #[error("{identity} contributions not found for year {year}")]
    MissingSeries { year: i32, identity: Identity },

    #[error("personal and all contributions for year {year} do not cover the same dates")]
    MisalignedSeries { year: i32 },

    #[error("day sequence contains no days")]
    EmptySequence,

    #[error("day {index} has negative contribution count {count}")]
    InvalidRange { index: usize, count: i64 },

    #[error("malformed day sequence: {0}")]
    MalformedSequence(String),

    #[error("geometry build failed at {stage} stage: {message}")]
    GeometryBuildFailed { stage: GeometryStage, message: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid year {year}: {reason}")]
    InvalidYear { year: i32, reason: String },

    #[error("end year {end} is before start year {start}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for SkylineError {
    fn from(err: anyhow::Error) -> Self {
        SkylineError::Storage(err)
    }
}

impl SkylineError {
    pub fn geometry(stage: GeometryStage, err: impl fmt::Display) -> Self {
        SkylineError::GeometryBuildFailed {
            stage,
            message: err.to_string(),
        }
    }
}

pub type SkylineResult<T> = Result<T, SkylineError>;
