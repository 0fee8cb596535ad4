// HTTP request handlers
use crate::application::import_service::{ImportOutcome, ImportState};
use crate::application::model_service::ModelRequest;
use crate::domain::contribution::ContributionView;
use crate::infrastructure::http_response::{accepts_brotli, mesh_response};
use crate::presentation::app_state::AppState;
use crate::presentation::auth::AuthenticatedUser;
use crate::presentation::error::AppError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub start_year: i32,
    pub end_year: Option<i32>,
    #[serde(default)]
    pub contributions: ContributionView,
    #[serde(default)]
    pub include_labels: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Import the caller's calendar for a completed year
pub async fn import_year(
    user: AuthenticatedUser,
    Path(year): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportOutcome>, AppError> {
    let credential = user.require_credential()?;
    let outcome = state
        .import_service
        .import_year(&user.login, year, credential)
        .await?;
    Ok(Json(outcome))
}

/// Whether a year is not imported, half imported or complete
pub async fn import_status(
    user: AuthenticatedUser,
    Path(year): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportState>, AppError> {
    let import_state = state.import_service.import_state(&user.login, year).await?;
    Ok(Json(import_state))
}

/// Render the caller's skyline as a mesh download
pub async fn download_model(
    user: AuthenticatedUser,
    Query(query): Query<ModelQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let download = state
        .model_service
        .build_model(ModelRequest {
            user: user.login,
            start_year: query.start_year,
            end_year: query.end_year,
            view: query.contributions,
            include_labels: query.include_labels,
        })
        .await?;

    let compress = accepts_brotli(&headers);
    Ok(
        match mesh_response(
            download.bytes,
            &download.filename,
            download.content_type,
            compress,
        )
        .await
        {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
    )
}

/// Years with at least one stored series for the caller
pub async fn imported_years(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<i32>>, AppError> {
    let years = state.model_service.imported_years(&user.login).await?;
    Ok(Json(years))
}

pub async fn work_contributions_available(
    user: AuthenticatedUser,
    Path(year): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<bool>, AppError> {
    let available = state
        .model_service
        .work_contributions_available(&user.login, year)
        .await?;
    Ok(Json(available))
}
