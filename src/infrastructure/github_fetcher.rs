// GitHub GraphQL contribution calendar client
use crate::application::contribution_fetcher::{ContributionFetcher, Credential};
use crate::domain::contribution::{ContributionSeries, DayCount};
use crate::domain::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::json;

const CONTRIBUTIONS_QUERY: &str = r#"
query ($user: String!, $start: DateTime!, $end: DateTime!) {
    user(login: $user) {
        contributionsCollection(from: $start, to: $end) {
            contributionCalendar {
                weeks {
                    contributionDays {
                        date
                        contributionCount
                    }
                }
            }
        }
    }
}
"#;

const USER_AGENT: &str = concat!("skyline/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    user: Option<QueryUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryUser {
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Deserialize)]
struct ContributionCalendar {
    weeks: Vec<CalendarWeek>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarWeek {
    contribution_days: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarDay {
    date: NaiveDate,
    contribution_count: u32,
}

#[derive(Debug, Clone)]
pub struct GithubContributionFetcher {
    client: reqwest::Client,
    graphql_url: String,
}

impl GithubContributionFetcher {
    pub fn new(graphql_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            graphql_url,
        }
    }

    fn request_body(user: &str, year: i32) -> serde_json::Value {
        json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": {
                "user": user,
                "start": format!("{}-01-01T00:00:00Z", year),
                "end": format!("{}-12-31T23:59:59Z", year),
            }
        })
    }
}

#[async_trait]
impl ContributionFetcher for GithubContributionFetcher {
    async fn fetch(
        &self,
        credential: &Credential,
        user: &str,
        year: i32,
    ) -> Result<ContributionSeries, FetchError> {
        let response = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(credential.token())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&Self::request_body(user, year))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if let Some(err) = status_error(response.status(), response.headers()) {
            tracing::warn!(user, year, status = %response.status(), "GitHub rejected calendar query");
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let series = parse_calendar(&body)?;

        tracing::debug!(
            user,
            year,
            days = series.len(),
            total_contributions = series.total(),
            "Fetched contribution calendar"
        );

        Ok(series)
    }
}

/// Classifies a non-success HTTP status. `None` means the body should be parsed.
fn status_error(status: StatusCode, headers: &HeaderMap) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let quota_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);

    Some(match status {
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::FORBIDDEN if quota_exhausted => FetchError::RateLimited,
        other => FetchError::Network(format!("unexpected status {}", other)),
    })
}

fn parse_calendar(body: &str) -> Result<ContributionSeries, FetchError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::InvalidResponse(format!("undecodable body: {}", e)))?;

    if !response.errors.is_empty() {
        if response
            .errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
        {
            return Err(FetchError::RateLimited);
        }
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(FetchError::InvalidResponse(messages.join("; ")));
    }

    let user = response
        .data
        .and_then(|d| d.user)
        .ok_or_else(|| FetchError::InvalidResponse("user not found".to_string()))?;

    let days = user
        .contributions_collection
        .contribution_calendar
        .weeks
        .into_iter()
        .flat_map(|w| w.contribution_days)
        .map(|d| DayCount::new(d.date, d.contribution_count));

    let series = ContributionSeries::from_days(days);
    if series.is_empty() {
        return Err(FetchError::InvalidResponse(
            "calendar contains no days".to_string(),
        ));
    }
    Ok(series)
}
