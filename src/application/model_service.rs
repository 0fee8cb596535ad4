// Model service - Use case for rendering a user's skyline
use crate::application::contribution_repository::ContributionRepository;
use crate::application::geometry_kernel::MeshFormat;
use crate::application::model_assembler::ModelGenerator;
use crate::domain::calendar::{self, YearContributions};
use crate::domain::contribution::{ContributionView, Identity};
use crate::domain::error::{GeometryStage, SkylineError, SkylineResult};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub user: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub view: ContributionView,
    pub include_labels: bool,
}

/// A rendered model ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct MeshDownload {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct ModelService {
    repository: Arc<dyn ContributionRepository>,
    generator: Arc<dyn ModelGenerator>,
}

impl ModelService {
    pub fn new(
        repository: Arc<dyn ContributionRepository>,
        generator: Arc<dyn ModelGenerator>,
    ) -> Self {
        Self {
            repository,
            generator,
        }
    }

    pub async fn build_model(&self, request: ModelRequest) -> SkylineResult<MeshDownload> {
        let start_year = request.start_year;
        let end_year = request.end_year.unwrap_or(start_year);
        if end_year < start_year {
            return Err(SkylineError::InvalidYearRange {
                start: start_year,
                end: end_year,
            });
        }

        let years = self
            .load_years(&request.user, start_year, end_year, request.view)
            .await?;
        let days = calendar::aggregate(&years, request.view)?;

        let label = request
            .include_labels
            .then(|| model_label(&request.user, start_year, end_year, request.view));
        let include_month_labels = request.include_labels;

        // Mesh generation is CPU bound; keep it off the async workers
        let generator = self.generator.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            generator.generate(&days, label.as_deref(), include_month_labels)
        })
        .await
        .map_err(|e| SkylineError::geometry(GeometryStage::Assembly, e))??;

        tracing::info!(
            user = %request.user,
            start_year,
            end_year,
            view = ?request.view,
            bytes = bytes.len(),
            "Generated skyline model"
        );

        let format = MeshFormat::Stl;
        Ok(MeshDownload {
            bytes,
            filename: model_filename(&request.user, start_year, end_year, format),
            content_type: format.content_type(),
        })
    }

    pub async fn imported_years(&self, user: &str) -> SkylineResult<Vec<i32>> {
        Ok(self.repository.list_years(user).await?)
    }

    /// True when both series exist for the year and differ on at least one day
    pub async fn work_contributions_available(&self, user: &str, year: i32) -> SkylineResult<bool> {
        let personal = self.repository.get(user, year, Identity::Personal).await?;
        let all = self.repository.get(user, year, Identity::All).await?;

        Ok(match (personal, all) {
            (Some(personal), Some(all)) => personal != all,
            _ => false,
        })
    }

    /// Load only the series the view needs, year by year in ascending order.
    async fn load_years(
        &self,
        user: &str,
        start_year: i32,
        end_year: i32,
        view: ContributionView,
    ) -> SkylineResult<Vec<YearContributions>> {
        let mut years = Vec::new();

        for year in start_year..=end_year {
            let mut contributions = YearContributions::new(year);
            for identity in view.required_identities() {
                let series = self
                    .repository
                    .get(user, year, *identity)
                    .await?
                    .ok_or(SkylineError::MissingSeries {
                        year,
                        identity: *identity,
                    })?;
                contributions.set_series(*identity, series);
            }
            years.push(contributions);
        }

        Ok(years)
    }
}

pub fn model_label(user: &str, start_year: i32, end_year: i32, view: ContributionView) -> String {
    let years = if start_year == end_year {
        start_year.to_string()
    } else {
        format!("{}-{}", start_year, end_year)
    };
    format!("{}\n{} - {} Contributions", user, years, view.title())
}

pub fn model_filename(user: &str, start_year: i32, end_year: i32, format: MeshFormat) -> String {
    format!("{}-{}-{}.{}", user, start_year, end_year, format.extension())
}
