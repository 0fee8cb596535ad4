// Grid geometry planner - plinth outline, tower placements and label anchors

use crate::domain::calendar::{DAYS_PER_WEEK, PaddedDaySequence};
use crate::domain::error::{SkylineError, SkylineResult};
use nalgebra::{Point2, Point3};
use std::ops::Range;

/// Planar edge length of one day cell.
pub const SQUARE_SIZE: f64 = 10.0;
/// Height of the plinth under every tower.
pub const BASE_HEIGHT: f64 = 5.0;

const ROWS: f64 = DAYS_PER_WEEK as f64;
const TITLE_FILL: f64 = 0.7;
const CAPTION_HEIGHT: f64 = SQUARE_SIZE * 0.6;
pub const START_MONTH_CAPTION: &str = "JAN";
pub const END_MONTH_CAPTION: &str = "DEC";

/// Ordered polygon builder that silently drops a point equal to the previous one.
#[derive(Debug, Default)]
pub struct OutlineBuilder {
    points: Vec<Point2<f64>>,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64, y: f64) -> &mut Self {
        let point = Point2::new(x, y);
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
        self
    }

    /// Closes the ring. The closing point is implicit, so a last point equal to the
    /// first is dropped as well.
    pub fn build(mut self) -> Vec<Point2<f64>> {
        while self.points.len() > 1 && self.points.last() == self.points.first() {
            self.points.pop();
        }
        self.points
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TowerPlacement {
    pub row: usize,
    pub column: usize,
    /// Corner of the footprint with the smallest x and y, at the top of the plinth
    pub origin: Point3<f64>,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Title,
    StartMonth,
    EndMonth,
}

/// Planar face of the plinth a label is embossed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFace {
    /// Upward face at `z = BASE_HEIGHT`
    Top,
    /// Vertical end wall at the column-0 edge, facing -y
    StartWall,
}

/// Where and how a piece of text sits on the model.
///
/// `center` lies on the face. `width` runs along the text's reading direction
/// and `height` across it, both before `rotation_deg` is applied about the face normal.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub kind: LabelKind,
    pub text: String,
    pub face: LabelFace,
    pub center: Point3<f64>,
    pub rotation_deg: f64,
    pub width: f64,
    pub height: f64,
}

/// Geometry of one model, built fresh for every request.
#[derive(Debug, Clone)]
pub struct GridPlan {
    pub columns: usize,
    pub first_day_row: usize,
    pub last_day_row: usize,
    pub outline: Vec<Point2<f64>>,
    pub towers: Vec<TowerPlacement>,
    pub labels: Vec<LabelAnchor>,
}

impl GridPlan {
    /// Translation that centres the grid on the origin.
    fn offset(columns: usize) -> (f64, f64) {
        (-SQUARE_SIZE * ROWS / 2.0, -SQUARE_SIZE * columns as f64 / 2.0)
    }
}

/// Plans the plinth outline, towers and labels for `days`.
pub fn plan(
    days: &PaddedDaySequence,
    label: Option<&str>,
    include_month_labels: bool,
) -> SkylineResult<GridPlan> {
    let entries = days.entries();
    let first_index = days.leading_gap();
    if first_index == entries.len() {
        return Err(SkylineError::EmptySequence);
    }

    if let Some((index, count)) = entries
        .iter()
        .enumerate()
        .find_map(|(i, e)| e.filter(|c| *c < 0).map(|c| (i, c)))
    {
        return Err(SkylineError::InvalidRange { index, count });
    }

    let n = entries.len();
    let columns = n.div_ceil(DAYS_PER_WEEK);
    let first_day_row = first_index % DAYS_PER_WEEK;
    let last_day_row = (n - 1) % DAYS_PER_WEEK;
    let (dx, dy) = GridPlan::offset(columns);

    let outline = outline(columns, first_day_row, last_day_row)
        .into_iter()
        .map(|p| Point2::new(p.x * SQUARE_SIZE + dx, p.y * SQUARE_SIZE + dy))
        .collect();

    let towers = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Some(count) if *count > 0 => {
                let row = index % DAYS_PER_WEEK;
                let column = index / DAYS_PER_WEEK;
                Some(TowerPlacement {
                    row,
                    column,
                    origin: Point3::new(
                        row as f64 * SQUARE_SIZE + dx,
                        column as f64 * SQUARE_SIZE + dy,
                        BASE_HEIGHT,
                    ),
                    height: *count as f64,
                })
            }
            _ => None,
        })
        .collect();

    let mut labels = Vec::new();
    if let Some(text) = label {
        labels.push(title_anchor(text, columns, first_day_row));
    }
    if include_month_labels {
        labels.extend(month_anchors(columns, first_day_row, last_day_row));
    }

    Ok(GridPlan {
        columns,
        first_day_row,
        last_day_row,
        outline,
        towers,
        labels,
    })
}

/// Outline corners in cell units (x = row, y = column) before centring.
///
/// Column 0 may start part way down and the last column may stop part way down,
/// so the ring carries a notch at each of those corners.
fn outline(columns: usize, first_day_row: usize, last_day_row: usize) -> Vec<Point2<f64>> {
    let cols = columns as f64;
    let first = first_day_row as f64;
    let last_end = (last_day_row + 1) as f64;
    let mut builder = OutlineBuilder::new();

    if columns == 1 {
        builder
            .push(first, 0.0)
            .push(last_end, 0.0)
            .push(last_end, 1.0)
            .push(first, 1.0);
        return builder.build();
    }

    builder
        .push(first, 0.0)
        .push(ROWS, 0.0)
        .push(ROWS, cols - 1.0)
        .push(last_end, cols - 1.0)
        .push(last_end, cols)
        .push(0.0, cols)
        .push(0.0, 1.0)
        .push(first, 1.0);
    builder.build()
}

/// Centre x and extent of the cells `rows` cover within one column.
fn row_band(rows: Range<usize>, columns: usize) -> (f64, f64) {
    let (dx, _) = GridPlan::offset(columns);
    let span = rows.len() as f64 * SQUARE_SIZE;
    (rows.start as f64 * SQUARE_SIZE + span / 2.0 + dx, span)
}

fn title_anchor(text: &str, columns: usize, first_day_row: usize) -> LabelAnchor {
    let (_, dy) = GridPlan::offset(columns);
    // column 0 only spans the populated rows, so centre on those
    let (center_x, span) = row_band(first_day_row..DAYS_PER_WEEK, columns);

    LabelAnchor {
        kind: LabelKind::Title,
        text: text.to_string(),
        face: LabelFace::StartWall,
        center: Point3::new(center_x, dy, BASE_HEIGHT / 2.0),
        rotation_deg: 0.0,
        width: span * TITLE_FILL,
        height: BASE_HEIGHT * TITLE_FILL,
    }
}

/// Captions on the top face of the first and last columns.
///
/// Each one is centred on the rows its column covers. Turned by 90 or 270 degrees the
/// text reads along y, so `width` is bounded by one cell and `height` by the row band.
fn month_anchors(columns: usize, first_day_row: usize, last_day_row: usize) -> [LabelAnchor; 2] {
    let (_, dy) = GridPlan::offset(columns);
    let caption = |kind, text: &str, column: usize, rows: Range<usize>, rotation_deg: f64| {
        let (center_x, span) = row_band(rows, columns);
        LabelAnchor {
            kind,
            text: text.to_string(),
            face: LabelFace::Top,
            center: Point3::new(
                center_x,
                dy + (column as f64 + 0.5) * SQUARE_SIZE,
                BASE_HEIGHT,
            ),
            rotation_deg,
            width: SQUARE_SIZE * TITLE_FILL,
            height: (span * TITLE_FILL).min(CAPTION_HEIGHT),
        }
    };

    [
        caption(
            LabelKind::StartMonth,
            START_MONTH_CAPTION,
            0,
            first_day_row..DAYS_PER_WEEK,
            90.0,
        ),
        caption(
            LabelKind::EndMonth,
            END_MONTH_CAPTION,
            columns - 1,
            0..last_day_row + 1,
            270.0,
        ),
    ]
}
