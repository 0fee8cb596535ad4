// Model assembler - realises a grid plan through the geometry kernel
use crate::application::geometry_kernel::{GeometryKernel, MeshFormat};
use crate::domain::calendar::PaddedDaySequence;
use crate::domain::error::{GeometryStage, SkylineError, SkylineResult};
use crate::domain::grid::{self, BASE_HEIGHT, GridPlan, SQUARE_SIZE};
use bytes::Bytes;

/// How far label text stands proud of its face.
pub const EMBOSS_DEPTH: f64 = 1.0;

/// Entry point that turns a day sequence into serialized mesh bytes.
pub trait ModelGenerator: Send + Sync {
    fn generate(
        &self,
        days: &PaddedDaySequence,
        label: Option<&str>,
        include_month_labels: bool,
    ) -> SkylineResult<Bytes>;
}

pub struct ModelAssembler<K> {
    kernel: K,
    format: MeshFormat,
}

impl<K: GeometryKernel> ModelAssembler<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            format: MeshFormat::Stl,
        }
    }

    /// Build the plinth, emboss its labels and add every tower to one compound.
    pub fn assemble(&self, plan: &GridPlan) -> SkylineResult<K::Solid> {
        let kernel = &self.kernel;

        let mut plinth = kernel
            .extrude(&plan.outline, BASE_HEIGHT)
            .map_err(|e| SkylineError::geometry(GeometryStage::Plinth, e))?;

        let towers = plan
            .towers
            .iter()
            .map(|tower| {
                tracing::trace!(
                    row = tower.row,
                    column = tower.column,
                    height = tower.height,
                    "Placing tower"
                );
                kernel
                    .cuboid(SQUARE_SIZE, SQUARE_SIZE, tower.height)
                    .map(|solid| kernel.translate(solid, tower.origin.coords))
                    .map_err(|e| SkylineError::geometry(GeometryStage::Tower, e))
            })
            .collect::<SkylineResult<Vec<_>>>()?;

        for anchor in &plan.labels {
            plinth = kernel
                .emboss_text(plinth, anchor, EMBOSS_DEPTH)
                .map_err(|e| SkylineError::geometry(GeometryStage::Label, e))?;
        }

        towers.into_iter().try_fold(plinth, |model, tower| {
            kernel
                .union(model, tower)
                .map_err(|e| SkylineError::geometry(GeometryStage::Assembly, e))
        })
    }
}

impl<K: GeometryKernel> ModelGenerator for ModelAssembler<K> {
    fn generate(
        &self,
        days: &PaddedDaySequence,
        label: Option<&str>,
        include_month_labels: bool,
    ) -> SkylineResult<Bytes> {
        let plan = grid::plan(days, label, include_month_labels)?;
        tracing::debug!(
            columns = plan.columns,
            first_day_row = plan.first_day_row,
            last_day_row = plan.last_day_row,
            towers = plan.towers.len(),
            labels = plan.labels.len(),
            "Planned skyline grid"
        );

        let model = self.assemble(&plan)?;

        self.kernel
            .export(&model, self.format)
            .map_err(|e| SkylineError::geometry(GeometryStage::Export, e))
    }
}
