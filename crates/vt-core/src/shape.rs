//! Shape: an ordered curve list with cached derived geometry.
//!
//! The curve list is the only source of truth. The bounding box, the
//! spatial index, the vertex list, the topology graph and the fill regions
//! are rebuilt by every mutating method before it returns, so readers never
//! see them stale. Serialization carries the persistent fields only and
//! rebuilds the caches on load.

use crate::config::CoreConfig;
use crate::curve::{Curve, Projection};
use crate::error::GeometryError;
use crate::fit;
use crate::id::ObjectId;
use crate::model::{FillStyle, StrokeStyle};
use crate::morph::{self, PathCmd};
use crate::spatial::SpatialIndex;
use kurbo::{BezPath, Point, Rect, Shape as _};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Range;

/// Distance under which curve endpoints merge into one vertex.
pub const VERTEX_EPSILON: f64 = 0.5;

/// Samples taken per curve when refitting in `Smooth` mode.
const SMOOTH_SAMPLES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimplifyMode {
    /// Polyline-simplify the endpoint sequence, then rebuild straight segments.
    #[default]
    Corners,
    /// Refit the whole outline through `fit::fit_curve`.
    Smooth,
}

/// Vertex classification by the number of incident curve ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Open,
    PassThrough,
    TJunction,
    Crossing,
    /// More than four curve ends. Handled as coincident crossings and
    /// reported through `Shape::warnings`.
    Overloaded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub point: Point,
    /// Curves that start here.
    pub starts: SmallVec<[usize; 2]>,
    /// Curves that end here.
    pub ends: SmallVec<[usize; 2]>,
}

impl Vertex {
    pub fn degree(&self) -> usize {
        self.starts.len() + self.ends.len()
    }

    pub fn kind(&self) -> VertexKind {
        match self.degree() {
            0 | 1 => VertexKind::Open,
            2 => VertexKind::PassThrough,
            3 => VertexKind::TJunction,
            4 => VertexKind::Crossing,
            _ => VertexKind::Overloaded,
        }
    }

    fn splits_regions(&self) -> bool {
        matches!(self.kind(), VertexKind::Crossing | VertexKind::Overloaded)
    }
}

/// A sub-loop of the outline, as indices into the shape's curve list in
/// traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub curves: Vec<usize>,
}

// ─── Shape ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ShapeRecord", into = "ShapeRecord")]
pub struct Shape {
    /// Unique per concrete curve-list instance.
    pub instance_id: ObjectId,
    /// Logical identity shared by every time-variant of this shape.
    pub shape_id: ObjectId,
    /// Variant number within the `shape_id` group.
    pub shape_index: u32,
    pub fill: FillStyle,
    pub stroke: StrokeStyle,
    pub filled: bool,
    pub stroked: bool,

    curves: Vec<Curve>,

    // Derived
    config: CoreConfig,
    bbox: Rect,
    index: SpatialIndex,
    vertices: Vec<Vertex>,
    graph: UnGraph<Point, usize>,
    regions: Vec<Region>,
    warnings: Vec<GeometryError>,
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.instance_id == other.instance_id
            && self.shape_id == other.shape_id
            && self.shape_index == other.shape_index
            && self.fill == other.fill
            && self.stroke == other.stroke
            && self.filled == other.filled
            && self.stroked == other.stroked
            && self.curves == other.curves
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}

impl Shape {
    /// An empty shape with fresh ids.
    pub fn new() -> Self {
        Self::with_ids(ObjectId::random(), ObjectId::random())
    }

    pub fn with_ids(shape_id: ObjectId, instance_id: ObjectId) -> Self {
        Self {
            instance_id,
            shape_id,
            shape_index: 0,
            fill: FillStyle::default(),
            stroke: StrokeStyle::default(),
            filled: false,
            stroked: true,
            curves: Vec::new(),
            config: CoreConfig::default(),
            bbox: Rect::ZERO,
            index: SpatialIndex::new(Rect::ZERO),
            vertices: Vec::new(),
            graph: UnGraph::default(),
            regions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a shape from an existing curve list.
    pub fn from_curves(shape_id: ObjectId, curves: Vec<Curve>) -> Self {
        let mut shape = Self::with_ids(shape_id, ObjectId::random());
        shape.set_curves(curves);
        shape
    }

    /// Adopt tolerances from `cfg` and rebuild the derived caches.
    pub fn apply_config(&mut self, cfg: &CoreConfig) {
        self.config = cfg.clone();
        self.index = SpatialIndex::with_capacity(self.bbox, cfg.index_capacity);
        self.refresh();
    }

    /// Tolerances used for vertex merging, indexing and simplification.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Union of all curve bounding boxes; `Rect::ZERO` when empty.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Degeneracies found by the last vertex pass.
    pub fn warnings(&self) -> &[GeometryError] {
        &self.warnings
    }

    /// Vertex/curve graph: one node per vertex, one edge per curve.
    pub fn topology(&self) -> &UnGraph<Point, usize> {
        &self.graph
    }

    /// Number of disconnected pieces in the outline.
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    // ─── Curve editing ───────────────────────────────────────────────────

    pub fn add_curve(&mut self, curve: Curve) {
        let i = self.curves.len();
        self.curves.push(curve);
        let b = curve.bbox();
        self.bbox = if i == 0 { b } else { self.bbox.union(b) };
        self.index.insert(b, i);
        self.update_vertices();
    }

    /// Straight segment from the current end point (or the origin for an
    /// empty shape) to `(x, y)`.
    pub fn add_line(&mut self, x: f64, y: f64) {
        let from = self.curves.last().map_or(Point::ZERO, |c| c.end);
        self.add_curve(Curve::line(from, Point::new(x, y), self.stroke.color));
    }

    pub fn clear(&mut self) {
        self.curves.clear();
        self.refresh();
    }

    pub fn set_curves(&mut self, curves: Vec<Curve>) {
        self.curves = curves;
        self.refresh();
    }

    /// Swap one curve, returning the old one. Out-of-range indices are ignored.
    pub fn replace_curve(&mut self, i: usize, curve: Curve) -> Option<Curve> {
        let slot = self.curves.get_mut(i)?;
        let old = std::mem::replace(slot, curve);
        self.refresh();
        Some(old)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        if self.curves.is_empty() {
            return;
        }
        for c in &mut self.curves {
            c.translate(dx, dy);
        }
        self.refresh();
    }

    /// Replace the curves with a fit through `points`.
    ///
    /// # Errors
    /// `EmptyPointList` when fewer than two distinct points are given; the
    /// shape is left unchanged.
    pub fn from_points(&mut self, points: &[Point], error_tolerance: f64) -> Result<(), GeometryError> {
        let segments = fit::fit_curve(points, error_tolerance)?;
        let color = self.stroke.color;
        self.curves = segments
            .iter()
            .map(|s| Curve::new(s[0], s[1], s[2], s[3], color))
            .collect();
        self.refresh();
        Ok(())
    }

    // ─── Simplification ──────────────────────────────────────────────────

    pub fn simplify(&mut self, mode: SimplifyMode) {
        let cfg = self.config.clone();
        self.simplify_with(mode, &cfg);
    }

    /// Simplify each subpath, then split every curve at its crossings with
    /// the rest of the outline.
    pub fn simplify_with(&mut self, mode: SimplifyMode, cfg: &CoreConfig) {
        if self.curves.is_empty() {
            return;
        }
        let before = self.curves.len();
        let mut out = Vec::with_capacity(before);
        for range in self.subpaths() {
            let run = &self.curves[range];
            let color = run[0].color;
            match mode {
                SimplifyMode::Corners => {
                    let pts: Vec<Point> = std::iter::once(run[0].start)
                        .chain(run.iter().map(|c| c.end))
                        .collect();
                    let kept = fit::simplify_polyline(&pts, cfg.corner_tolerance);
                    if kept.len() < 2 {
                        out.extend_from_slice(run);
                    } else {
                        out.extend(kept.windows(2).map(|w| Curve::line(w[0], w[1], color)));
                    }
                }
                SimplifyMode::Smooth => {
                    let mut pts = Vec::with_capacity(run.len() * SMOOTH_SAMPLES + 1);
                    for c in run {
                        for s in 0..SMOOTH_SAMPLES {
                            pts.push(c.evaluate(s as f64 / SMOOTH_SAMPLES as f64));
                        }
                    }
                    pts.push(run[run.len() - 1].end);
                    match fit::fit_curve(&pts, cfg.fit_error_tolerance) {
                        Ok(segments) => out.extend(
                            segments
                                .iter()
                                .map(|s| Curve::new(s[0], s[1], s[2], s[3], color)),
                        ),
                        Err(e) => {
                            log::warn!("smooth refit of {} skipped: {e}", self.instance_id);
                            out.extend_from_slice(run);
                        }
                    }
                }
            }
        }
        self.curves = out;
        self.refresh();
        self.resolve_crossings(cfg.intersection_tolerance);
        log::debug!(
            "simplified {} ({mode:?}): {before} -> {} curves",
            self.instance_id,
            self.curves.len()
        );
    }

    /// Split every curve at all of its interior intersection parameters,
    /// found through the spatial index. Returns the number of cuts made.
    pub fn resolve_crossings(&mut self, eps: f64) -> usize {
        let n = self.curves.len();
        let mut cuts: Vec<Vec<f64>> = vec![Vec::new(); n];
        let interior = |t: f64| t > eps && t < 1.0 - eps;

        for i in 0..n {
            let ci = self.curves[i];
            for (a, b) in ci.self_intersections(eps) {
                cuts[i].extend([a, b]);
            }
            for j in self.index.query(ci.bbox()) {
                if j <= i {
                    continue;
                }
                for (ti, tj) in ci.intersects(&self.curves[j], eps) {
                    if interior(ti) {
                        cuts[i].push(ti);
                    }
                    if interior(tj) {
                        cuts[j].push(tj);
                    }
                }
            }
        }

        let mut total = 0;
        let mut out = Vec::with_capacity(n);
        for (curve, mut ts) in self.curves.iter().zip(cuts) {
            ts.retain(|t| interior(*t));
            ts.sort_by(f64::total_cmp);
            ts.dedup_by(|a, b| (*a - *b).abs() < eps);
            total += ts.len();
            out.extend(curve.split_many(&ts));
        }
        if total > 0 {
            log::trace!("{}: split at {total} crossings", self.instance_id);
            self.curves = out;
            self.refresh();
        }
        total
    }

    // ─── Derived geometry ────────────────────────────────────────────────

    /// Rebuild bbox and spatial index from scratch, then vertices/regions.
    fn refresh(&mut self) {
        self.bbox = self
            .curves
            .iter()
            .map(Curve::bbox)
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);
        let capacity = self.index.capacity();
        self.index = SpatialIndex::with_capacity(self.bbox, capacity);
        for (i, c) in self.curves.iter().enumerate() {
            self.index.insert(c.bbox(), i);
        }
        self.update_vertices();
    }

    /// Merge curve endpoints into vertices, classify them, rebuild the
    /// topology graph and split the outline into regions.
    pub fn update_vertices(&mut self) {
        debug_assert_eq!(
            self.curves.iter().map(Curve::bbox).reduce(|a, b| a.union(b)).unwrap_or(Rect::ZERO),
            self.bbox,
            "bbox out of sync with curves"
        );

        self.vertices.clear();
        self.warnings.clear();
        let eps = self.config.vertex_epsilon;

        let mut start_vertex = Vec::with_capacity(self.curves.len());
        let mut end_vertex = Vec::with_capacity(self.curves.len());
        for (i, c) in self.curves.iter().enumerate() {
            if c.is_degenerate(1e-9) {
                log::warn!("{}: curve {i} has zero length", self.instance_id);
                self.warnings.push(GeometryError::DegenerateCurve { index: i });
            }
            let s = merge_vertex(&mut self.vertices, c.start, eps);
            self.vertices[s].starts.push(i);
            start_vertex.push(s);
            let e = merge_vertex(&mut self.vertices, c.end, eps);
            self.vertices[e].ends.push(i);
            end_vertex.push(e);
        }

        for v in &self.vertices {
            if v.kind() == VertexKind::Overloaded {
                log::warn!(
                    "{}: vertex at ({:.2}, {:.2}) joins {} curve ends",
                    self.instance_id,
                    v.point.x,
                    v.point.y,
                    v.degree()
                );
                self.warnings.push(GeometryError::UnsupportedVertex {
                    x: v.point.x,
                    y: v.point.y,
                    degree: v.degree(),
                });
            }
        }

        let mut graph = UnGraph::with_capacity(self.vertices.len(), self.curves.len());
        let nodes: Vec<NodeIndex> = self.vertices.iter().map(|v| graph.add_node(v.point)).collect();
        for i in 0..self.curves.len() {
            graph.add_edge(nodes[start_vertex[i]], nodes[end_vertex[i]], i);
        }
        self.graph = graph;

        self.regions = self.split_regions(&start_vertex, &end_vertex);
    }

    /// Walk curves in order. Each revisit of a crossing vertex cuts the loop
    /// traced since the previous visit off into its own region.
    fn split_regions(&self, start_vertex: &[usize], end_vertex: &[usize]) -> Vec<Region> {
        let mut regions = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut visits: HashMap<usize, usize> = HashMap::new();

        for i in 0..self.curves.len() {
            if i > 0 && start_vertex[i] != end_vertex[i - 1] {
                if !current.is_empty() {
                    regions.push(Region {
                        curves: std::mem::take(&mut current),
                    });
                }
                visits.clear();
            }
            if current.is_empty() && self.vertices[start_vertex[i]].splits_regions() {
                visits.insert(start_vertex[i], 0);
            }

            current.push(i);
            let v = end_vertex[i];
            if !self.vertices[v].splits_regions() {
                continue;
            }
            match visits.get(&v) {
                Some(&pos) if pos < current.len() => {
                    let cut: Vec<usize> = current.drain(pos..).collect();
                    regions.push(Region { curves: cut });
                }
                _ => {
                    visits.insert(v, current.len());
                }
            }
        }
        if !current.is_empty() {
            regions.push(Region { curves: current });
        }
        regions
    }

    /// Index ranges of maximal runs of end-to-start connected curves.
    pub fn subpaths(&self) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let mut begin = 0;
        for i in 1..self.curves.len() {
            if self.curves[i - 1].end.distance(self.curves[i].start) > self.config.vertex_epsilon {
                out.push(begin..i);
                begin = i;
            }
        }
        if !self.curves.is_empty() {
            out.push(begin..self.curves.len());
        }
        out
    }

    // ─── Paths and hit testing ───────────────────────────────────────────

    /// Outline as path commands, each subpath explicitly closed.
    pub fn closed_commands(&self) -> Vec<PathCmd> {
        let mut cmds = Vec::with_capacity(self.curves.len() + 2);
        for cmd in morph::curves_to_commands(&self.curves) {
            if matches!(cmd, PathCmd::MoveTo(_)) && !cmds.is_empty() {
                cmds.push(PathCmd::Close);
            }
            cmds.push(cmd);
        }
        if !cmds.is_empty() {
            cmds.push(PathCmd::Close);
        }
        cmds
    }

    /// Closed path for filling.
    pub fn to_bezpath(&self) -> BezPath {
        morph::commands_to_bezpath(&self.closed_commands())
    }

    /// Open path for stroking.
    pub fn to_stroke_path(&self) -> BezPath {
        morph::commands_to_bezpath(&morph::curves_to_commands(&self.curves))
    }

    /// Non-zero winding containment against the closed outline.
    pub fn contains_point(&self, p: Point) -> bool {
        if self.curves.is_empty() || !self.bbox.contains(p) {
            return false;
        }
        self.to_bezpath().winding(p) != 0
    }

    /// Nearest curve within `tolerance` (plus half the stroke width) of `p`.
    pub fn stroke_hit(&self, p: Point, tolerance: f64) -> Option<(usize, Projection)> {
        let reach = tolerance + self.stroke.line_width / 2.0;
        self.index
            .query_point(p, reach)
            .into_iter()
            .map(|i| (i, self.curves[i].project(p)))
            .filter(|(_, proj)| proj.distance <= reach)
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
    }

    // ─── Copies and variants ─────────────────────────────────────────────

    /// Independent copy: fresh instance id and fresh shape id.
    pub fn duplicate(&self) -> Shape {
        let mut copy = self.clone();
        copy.instance_id = ObjectId::random();
        copy.shape_id = ObjectId::random();
        copy
    }

    /// Another time-variant of the same logical shape.
    pub fn variant(&self, shape_index: u32) -> Shape {
        let mut copy = self.clone();
        copy.instance_id = ObjectId::random();
        copy.shape_index = shape_index;
        copy
    }

    /// Transient blend of two matched variants at `t`. Neither input is
    /// touched; image fills are kept from `self`.
    pub fn lerp_shape(&self, other: &Shape, t: f64) -> Shape {
        let stroke = self.stroke.lerp(&other.stroke, t);
        let curves = morph::morph_curves(&self.curves, &other.curves, t, stroke.color);
        let mut out = Shape::with_ids(self.shape_id, self.instance_id);
        out.shape_index = self.shape_index;
        out.fill = self.fill.lerp(&other.fill, t);
        out.stroke = stroke;
        out.filled = self.filled;
        out.stroked = self.stroked;
        out.config = self.config.clone();
        out.index = SpatialIndex::with_capacity(Rect::ZERO, self.config.index_capacity);
        out.set_curves(curves);
        out
    }
}

fn merge_vertex(vertices: &mut Vec<Vertex>, p: Point, eps: f64) -> usize {
    if let Some(i) = vertices.iter().position(|v| v.point.distance(p) <= eps) {
        return i;
    }
    vertices.push(Vertex {
        point: p,
        starts: SmallVec::new(),
        ends: SmallVec::new(),
    });
    vertices.len() - 1
}

// ─── Serialization ──────────────────────────────────────────────────────

/// Persistent subset of `Shape`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShapeRecord {
    instance_id: ObjectId,
    shape_id: ObjectId,
    #[serde(default)]
    shape_index: u32,
    curves: Vec<Curve>,
    #[serde(default)]
    fill: FillStyle,
    #[serde(default)]
    stroke: StrokeStyle,
    #[serde(default)]
    filled: bool,
    #[serde(default = "default_true")]
    stroked: bool,
}

fn default_true() -> bool {
    true
}

impl From<ShapeRecord> for Shape {
    fn from(r: ShapeRecord) -> Self {
        let mut shape = Shape::with_ids(r.shape_id, r.instance_id);
        shape.shape_index = r.shape_index;
        shape.fill = r.fill;
        shape.stroke = r.stroke;
        shape.filled = r.filled;
        shape.stroked = r.stroked;
        shape.set_curves(r.curves);
        shape
    }
}

impl From<Shape> for ShapeRecord {
    fn from(s: Shape) -> Self {
        ShapeRecord {
            instance_id: s.instance_id,
            shape_id: s.shape_id,
            shape_index: s.shape_index,
            curves: s.curves,
            fill: s.fill,
            stroke: s.stroke,
            filled: s.filled,
            stroked: s.stroked,
        }
    }
}
