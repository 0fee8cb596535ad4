// Triangle mesh geometry kernel - lyon tessellated extrusions, rusttype labels, STL export

use crate::application::geometry_kernel::{GeometryKernel, MeshFormat};
use crate::domain::grid::{LabelAnchor, LabelFace};
use anyhow::{Context, Result, anyhow, ensure};
use bytes::Bytes;
use lyon::algorithms::aabb::bounding_box;
use lyon::math::{Point, Transform, point};
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use nalgebra::{Point2, Point3, Rotation3, Vector3};
use rusttype::{Font, OutlineBuilder, Scale};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, SeekFrom};

const TESSELLATION_TOLERANCE: f32 = 0.01;
/// Pixel size text is laid out at before being fitted into its anchor box.
const LAYOUT_SCALE: f32 = 64.0;
/// Vertices closer than this (in model units) are welded together.
const WELD_PRECISION: f64 = 1e4;

pub type Triangle = [Point3<f64>; 3];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Counter-clockwise quad `a b c d` as two triangles.
    fn quad(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, d: Point3<f64>) {
        self.triangles.push([a, b, c]);
        self.triangles.push([a, c, d]);
    }

    fn map(mut self, f: impl Fn(Point3<f64>) -> Point3<f64>) -> Self {
        for triangle in &mut self.triangles {
            *triangle = triangle.map(&f);
        }
        self
    }
}

fn face_normal(triangle: &Triangle) -> Vector3<f64> {
    let [a, b, c] = triangle;
    (b - a)
        .cross(&(c - a))
        .try_normalize(0.0)
        .unwrap_or_else(Vector3::zeros)
}

/// Twice the signed area of the planar triangle `a b c`; positive when counter-clockwise.
fn signed_area(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b - a).perp(&(c - a))
}

/// Solids are outward facing, counter-clockwise triangle soups. `union` concatenates
/// them without a boolean merge.
pub struct MeshKernel {
    font: Option<Font<'static>>,
}

impl MeshKernel {
    pub fn new(font: Option<Font<'static>>) -> Self {
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn label_mesh(&self, anchor: &LabelAnchor, depth: f64) -> Result<Mesh> {
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| anyhow!("no font available to render {:?}", anchor.text))?;

        let path = text_path(font, &anchor.text);
        let bounds = bounding_box(path.iter());
        ensure!(
            bounds.width() > 0.0 && bounds.height() > 0.0,
            "text {:?} has no visible outline",
            anchor.text
        );

        let center = bounds.center();
        let fit = (anchor.width as f32 / bounds.width()).min(anchor.height as f32 / bounds.height());
        let path = path.transformed(
            &Transform::translation(-center.x, -center.y).then_scale(fit, fit),
        );

        let spin = Rotation3::from_axis_angle(&Vector3::z_axis(), anchor.rotation_deg.to_radians());
        let rotation = face_basis(anchor.face) * spin;
        let origin = anchor.center;

        let text = extrude_path(&path, depth)?;
        tracing::debug!(
            kind = ?anchor.kind,
            text = %anchor.text,
            triangles = text.len(),
            "Built label mesh"
        );

        Ok(text.map(|p| origin + rotation * p.coords))
    }
}

impl GeometryKernel for MeshKernel {
    type Solid = Mesh;

    fn extrude(&self, polygon: &[Point2<f64>], height: f64) -> Result<Mesh> {
        let mesh = extrude_path(&polygon_path(polygon)?, height)?;
        tracing::debug!(points = polygon.len(), triangles = mesh.len(), "Extruded polygon");
        Ok(mesh)
    }

    fn cuboid(&self, width: f64, depth: f64, height: f64) -> Result<Mesh> {
        ensure!(
            width > 0.0 && depth > 0.0 && height > 0.0,
            "cuboid dimensions must be positive, got {}x{}x{}",
            width,
            depth,
            height
        );

        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let (w, d, h) = (width, depth, height);
        let mut mesh = Mesh::default();

        mesh.quad(p(0., 0., 0.), p(0., d, 0.), p(w, d, 0.), p(w, 0., 0.));
        mesh.quad(p(0., 0., h), p(w, 0., h), p(w, d, h), p(0., d, h));
        mesh.quad(p(0., 0., 0.), p(w, 0., 0.), p(w, 0., h), p(0., 0., h));
        mesh.quad(p(0., d, 0.), p(0., d, h), p(w, d, h), p(w, d, 0.));
        mesh.quad(p(0., 0., 0.), p(0., 0., h), p(0., d, h), p(0., d, 0.));
        mesh.quad(p(w, 0., 0.), p(w, d, 0.), p(w, d, h), p(w, 0., h));

        Ok(mesh)
    }

    fn translate(&self, solid: Mesh, offset: Vector3<f64>) -> Mesh {
        solid.map(|p| p + offset)
    }

    fn union(&self, mut base: Mesh, other: Mesh) -> Result<Mesh> {
        base.triangles.extend(other.triangles);
        Ok(base)
    }

    fn emboss_text(&self, solid: Mesh, anchor: &LabelAnchor, depth: f64) -> Result<Mesh> {
        let text = self.label_mesh(anchor, depth)?;
        self.union(solid, text)
    }

    fn export(&self, solid: &Mesh, format: MeshFormat) -> Result<Bytes> {
        match format {
            MeshFormat::Stl => write_stl(solid),
        }
    }
}

/// Maps text-local axes onto the face: reading direction, text up, face normal.
fn face_basis(face: LabelFace) -> Rotation3<f64> {
    match face {
        LabelFace::Top => Rotation3::identity(),
        LabelFace::StartWall => {
            Rotation3::from_basis_unchecked(&[Vector3::x(), Vector3::z(), -Vector3::y()])
        }
    }
}

fn polygon_path(polygon: &[Point2<f64>]) -> Result<Path> {
    ensure!(
        polygon.len() >= 3,
        "polygon needs at least 3 points, got {}",
        polygon.len()
    );

    let mut builder = Path::builder();
    builder.begin(point(polygon[0].x as f32, polygon[0].y as f32));
    for p in &polygon[1..] {
        builder.line_to(point(p.x as f32, p.y as f32));
    }
    builder.close();
    Ok(builder.build())
}

/// Caps reuse the fill triangulation; walls follow its boundary edges, so holes stay closed.
fn extrude_path(path: &Path, height: f64) -> Result<Mesh> {
    ensure!(height > 0.0, "extrusion height must be positive, got {}", height);

    let mut buffers: VertexBuffers<Point, u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            path,
            &FillOptions::tolerance(TESSELLATION_TOLERANCE).with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| vertex.position()),
        )
        .map_err(|e| anyhow!("tessellation failed: {:?}", e))?;

    // the tessellator may emit one position several times
    let mut welded: Vec<Point2<f64>> = Vec::new();
    let mut lookup: HashMap<(i64, i64), usize> = HashMap::new();
    let ids: Vec<usize> = buffers
        .vertices
        .iter()
        .map(|v| {
            let p = Point2::new(f64::from(v.x), f64::from(v.y));
            let key = (
                (p.x * WELD_PRECISION).round() as i64,
                (p.y * WELD_PRECISION).round() as i64,
            );
            *lookup.entry(key).or_insert_with(|| {
                welded.push(p);
                welded.len() - 1
            })
        })
        .collect();

    let mut faces = Vec::with_capacity(buffers.indices.len() / 3);
    for tri in buffers.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| ids[i as usize]);
        if a == b || b == c || a == c {
            continue;
        }
        if signed_area(welded[a], welded[b], welded[c]) >= 0.0 {
            faces.push([a, b, c]);
        } else {
            faces.push([a, c, b]);
        }
    }
    ensure!(!faces.is_empty(), "shape has no area");

    let mut edges: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for [a, b, c] in &faces {
        for edge in [(*a, *b), (*b, *c), (*c, *a)] {
            *edges.entry(edge).or_default() += 1;
        }
    }

    let at = |i: usize, z: f64| Point3::new(welded[i].x, welded[i].y, z);
    let mut mesh = Mesh::default();

    for [a, b, c] in &faces {
        mesh.triangles.push([at(*a, height), at(*b, height), at(*c, height)]);
        mesh.triangles.push([at(*a, 0.0), at(*c, 0.0), at(*b, 0.0)]);
    }

    // an edge with no partner running the other way lies on the outline,
    // with the shape's interior on its left
    for (&(a, b), &count) in &edges {
        if count > edges.get(&(b, a)).copied().unwrap_or(0) {
            mesh.quad(at(a, 0.0), at(b, 0.0), at(b, height), at(a, height));
        }
    }

    Ok(mesh)
}

/// Collects glyph outlines into a lyon path, flipping rusttype's downward y axis.
struct GlyphOutline {
    builder: lyon::path::Builder,
    offset: rusttype::Point<f32>,
    open: bool,
}

impl GlyphOutline {
    fn at(&self, x: f32, y: f32) -> Point {
        point(x + self.offset.x, -(y + self.offset.y))
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        let at = self.at(x, y);
        self.builder.begin(at);
        self.open = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = self.at(x, y);
        self.builder.line_to(to);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let ctrl = self.at(x1, y1);
        let to = self.at(x, y);
        self.builder.quadratic_bezier_to(ctrl, to);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let ctrl1 = self.at(x1, y1);
        let ctrl2 = self.at(x2, y2);
        let to = self.at(x, y);
        self.builder.cubic_bezier_to(ctrl1, ctrl2, to);
    }

    fn close(&mut self) {
        if self.open {
            self.builder.end(true);
            self.open = false;
        }
    }
}

/// Outline of `text` with every line centred horizontally and lines stacked downwards.
fn text_path(font: &Font<'_>, text: &str) -> Path {
    let scale = Scale::uniform(LAYOUT_SCALE);
    let v_metrics = font.v_metrics(scale);
    let line_height = v_metrics.ascent - v_metrics.descent + v_metrics.line_gap;

    let mut outline = GlyphOutline {
        builder: Path::builder(),
        offset: rusttype::point(0.0, 0.0),
        open: false,
    };

    for (row, line) in text.lines().enumerate() {
        let glyphs: Vec<_> = font.layout(line, scale, rusttype::point(0.0, 0.0)).collect();
        let width = glyphs
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        let baseline = row as f32 * line_height;

        for glyph in &glyphs {
            let position = glyph.position();
            outline.offset = rusttype::point(position.x - width / 2.0, position.y + baseline);
            glyph.unpositioned().build_outline(&mut outline);
            outline.close();
        }
    }

    outline.builder.build()
}

fn write_stl(mesh: &Mesh) -> Result<Bytes> {
    ensure!(!mesh.is_empty(), "cannot export an empty mesh");

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|t| {
            let n = face_normal(t);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: t.map(|p| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])),
            }
        })
        .collect();

    // anonymous file, removed by the OS once dropped
    let mut file = tempfile::tempfile().context("Failed to create temporary STL file")?;
    stl_io::write_stl(&mut file, triangles.iter()).context("Failed to write STL")?;
    file.seek(SeekFrom::Start(0))?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .context("Failed to read back STL")?;

    tracing::debug!(triangles = triangles.len(), bytes = bytes.len(), "Exported STL");
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::PaddedDaySequence;
    use crate::domain::grid::{self, BASE_HEIGHT, LabelKind, SQUARE_SIZE};
    use std::io::Cursor;

    fn kernel() -> MeshKernel {
        MeshKernel::new(None)
    }

    /// Axis-aligned bounds as `(min, max)`.
    fn bounds(mesh: &Mesh) -> (Point3<f64>, Point3<f64>) {
        let mut points = mesh.triangles.iter().flatten();
        let first = *points.next().unwrap();
        points.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)))
    }

    fn key(p: &Point3<f64>) -> (i64, i64, i64) {
        let q = |v: f64| (v * 1e6).round() as i64;
        (q(p.x), q(p.y), q(p.z))
    }

    /// Every directed edge is matched by one running the other way.
    fn is_closed(mesh: &Mesh) -> bool {
        let mut edges: HashMap<_, i64> = HashMap::new();
        for [a, b, c] in &mesh.triangles {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((key(u), key(v))).or_default() += 1;
                *edges.entry((key(v), key(u))).or_default() -= 1;
            }
        }
        edges.values().all(|n| *n == 0)
    }

    /// Positive for outward facing triangles.
    fn volume(mesh: &Mesh) -> f64 {
        mesh.triangles
            .iter()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_cuboid_is_closed_and_outward() {
        let mesh = kernel().cuboid(10.0, 10.0, 3.0).unwrap();

        assert_eq!(mesh.len(), 12);
        assert!(is_closed(&mesh));
        assert!((volume(&mesh) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_cuboid_rejects_zero_height() {
        assert!(kernel().cuboid(10.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_translate_moves_bounds() {
        let k = kernel();
        let mesh = k.cuboid(10.0, 10.0, 4.0).unwrap();
        let moved = k.translate(mesh, Vector3::new(-35.0, 5.0, BASE_HEIGHT));

        let (min, max) = bounds(&moved);
        assert_eq!(min, Point3::new(-35.0, 5.0, 5.0));
        assert_eq!(max, Point3::new(-25.0, 15.0, 9.0));
    }

    #[test]
    fn test_extrude_square() {
        let mesh = kernel().extrude(&square(0.0, 0.0, 10.0), 5.0).unwrap();

        assert!(is_closed(&mesh));
        assert!((volume(&mesh) - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_extrude_clockwise_polygon_faces_outward() {
        let mut points = square(0.0, 0.0, 10.0);
        points.reverse();
        let mesh = kernel().extrude(&points, 2.0).unwrap();

        assert!(is_closed(&mesh));
        assert!((volume(&mesh) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_extrude_full_year_plinth() {
        let days = PaddedDaySequence::padded(5, vec![1; 365]).unwrap();
        let plan = grid::plan(&days, None, false).unwrap();

        let mesh = kernel().extrude(&plan.outline, BASE_HEIGHT).unwrap();
        let (min, max) = bounds(&mesh);

        assert!(is_closed(&mesh));
        let expected = 365.0 * SQUARE_SIZE * SQUARE_SIZE * BASE_HEIGHT;
        assert!((volume(&mesh) - expected).abs() < 1e-3);
        assert_eq!((min.z, max.z), (0.0, BASE_HEIGHT));
        assert_eq!((min.x, max.x), (-35.0, 35.0));
    }

    #[test]
    fn test_extrude_shape_with_hole() {
        let mut builder = Path::builder();
        builder.begin(point(0.0, 0.0));
        builder.line_to(point(10.0, 0.0));
        builder.line_to(point(10.0, 10.0));
        builder.line_to(point(0.0, 10.0));
        builder.close();
        builder.begin(point(3.0, 3.0));
        builder.line_to(point(3.0, 7.0));
        builder.line_to(point(7.0, 7.0));
        builder.line_to(point(7.0, 3.0));
        builder.close();
        let path: Path = builder.build();

        let mesh = extrude_path(&path, 1.0).unwrap();

        assert!(is_closed(&mesh));
        assert!((volume(&mesh) - (100.0 - 16.0)).abs() < 1e-4);
    }

    #[test]
    fn test_extrude_rejects_degenerate_input() {
        let k = kernel();
        assert!(k.extrude(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], 1.0).is_err());
        assert!(k.extrude(&square(0.0, 0.0, 1.0), 0.0).is_err());
    }

    #[test]
    fn test_union_keeps_both_solids() {
        let k = kernel();
        let a = k.cuboid(1.0, 1.0, 1.0).unwrap();
        let b = k.translate(k.cuboid(1.0, 1.0, 2.0).unwrap(), Vector3::new(5.0, 0.0, 0.0));

        let both = k.union(a, b).unwrap();
        assert_eq!(both.len(), 24);
        assert!(is_closed(&both));
        assert!((volume(&both) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_emboss_without_font_fails() {
        let k = kernel();
        let base = k.cuboid(70.0, 30.0, BASE_HEIGHT).unwrap();
        let anchor = LabelAnchor {
            kind: LabelKind::StartMonth,
            text: "JAN".to_string(),
            face: LabelFace::Top,
            center: Point3::new(35.0, 5.0, BASE_HEIGHT),
            rotation_deg: 90.0,
            width: 40.0,
            height: 6.0,
        };

        let err = k.emboss_text(base, &anchor, 1.0).unwrap_err();
        assert!(err.to_string().contains("no font"));
    }

    #[test]
    fn test_start_wall_points_outward() {
        let basis = face_basis(LabelFace::StartWall);
        assert!((basis * Vector3::z() - (-Vector3::y())).norm() < 1e-12);
        assert!((basis * Vector3::x() - Vector3::x()).norm() < 1e-12);
        assert!((basis.matrix().determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_export_reads_back_as_closed_stl() {
        let k = kernel();
        let mesh = k.cuboid(10.0, 10.0, 7.0).unwrap();

        let bytes = k.export(&mesh, MeshFormat::Stl).unwrap();
        assert_eq!(bytes.len(), 84 + 50 * 12);

        let stl = stl_io::read_stl(&mut Cursor::new(bytes.as_ref())).unwrap();
        assert_eq!(stl.faces.len(), 12);
        assert!(stl.validate().is_ok());
    }

    #[test]
    fn test_export_rejects_empty_mesh() {
        assert!(kernel().export(&Mesh::default(), MeshFormat::Stl).is_err());
    }

    fn system_font() -> Option<Font<'static>> {
        let settings = crate::infrastructure::config::LabelSettings {
            font_family: "Sans".to_string(),
            font_path: None,
        };
        crate::infrastructure::label_font::load_label_font(&settings).unwrap()
    }

    #[test]
    fn test_emboss_with_system_font() {
        let Some(font) = system_font() else {
            // no fonts installed on this machine
            return;
        };

        let k = MeshKernel::new(Some(font));
        let base = k.cuboid(70.0, 30.0, BASE_HEIGHT).unwrap();
        let base_len = base.len();
        let anchor = LabelAnchor {
            kind: LabelKind::Title,
            text: "octocat\n2021 - All Contributions".to_string(),
            face: LabelFace::StartWall,
            center: Point3::new(35.0, 0.0, BASE_HEIGHT / 2.0),
            rotation_deg: 0.0,
            width: 49.0,
            height: 3.5,
        };

        let text = k.label_mesh(&anchor, 1.0).unwrap();
        let (min, max) = bounds(&text);
        assert!((min.y - -1.0).abs() < 1e-4);
        assert!(max.y.abs() < 1e-4);
        assert!(min.x >= 35.0 - 24.5 - 1e-3 && max.x <= 35.0 + 24.5 + 1e-3);
        assert!(min.z >= 2.5 - 1.75 - 1e-3 && max.z <= 2.5 + 1.75 + 1e-3);

        let mesh = k.emboss_text(base, &anchor, 1.0).unwrap();
        assert_eq!(mesh.len(), base_len + text.len());
    }

    #[test]
    fn test_month_captions_land_on_their_columns() {
        let Some(font) = system_font() else {
            return;
        };
        let k = MeshKernel::new(Some(font));

        // 2021: column 0 only covers x in [15, 35], the plinth spans y in [-265, 265]
        let days = PaddedDaySequence::padded(5, vec![1; 365]).unwrap();
        let plan = grid::plan(&days, None, true).unwrap();
        let half_length = SQUARE_SIZE * plan.columns as f64 / 2.0;

        for anchor in &plan.labels {
            let (min, max) = bounds(&k.label_mesh(anchor, 1.0).unwrap());
            let (x_range, y_range) = match anchor.kind {
                LabelKind::StartMonth => ((15.0, 35.0), (-half_length, -half_length + SQUARE_SIZE)),
                _ => ((-35.0, 25.0), (half_length - SQUARE_SIZE, half_length)),
            };

            assert!(min.x >= x_range.0 - 1e-3 && max.x <= x_range.1 + 1e-3, "{:?}", anchor.text);
            assert!(min.y >= y_range.0 - 1e-3 && max.y <= y_range.1 + 1e-3, "{:?}", anchor.text);
            assert!((min.z - BASE_HEIGHT).abs() < 1e-4);
            assert!((max.z - (BASE_HEIGHT + 1.0)).abs() < 1e-4);
        }
    }
}
