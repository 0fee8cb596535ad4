// Geometry kernel trait - the solid-modelling operations a skyline needs
use crate::domain::grid::LabelAnchor;
use bytes::Bytes;
use nalgebra::{Point2, Vector3};

/// Exchange formats a kernel can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// Binary triangulated STL
    Stl,
}

impl MeshFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "model/stl",
        }
    }
}

pub trait GeometryKernel: Send + Sync {
    type Solid: Send;

    /// Solid from a closed planar polygon in the XY plane, from z = 0 up to `height`
    fn extrude(&self, polygon: &[Point2<f64>], height: f64) -> anyhow::Result<Self::Solid>;

    /// Axis-aligned box with one corner at the origin
    fn cuboid(&self, width: f64, depth: f64, height: f64) -> anyhow::Result<Self::Solid>;

    fn translate(&self, solid: Self::Solid, offset: Vector3<f64>) -> Self::Solid;

    /// Assemble two solids into one compound
    fn union(&self, base: Self::Solid, other: Self::Solid) -> anyhow::Result<Self::Solid>;

    /// Raise the anchor's text `depth` above its face
    fn emboss_text(
        &self,
        solid: Self::Solid,
        anchor: &LabelAnchor,
        depth: f64,
    ) -> anyhow::Result<Self::Solid>;

    fn export(&self, solid: &Self::Solid, format: MeshFormat) -> anyhow::Result<Bytes>;
}
