//! Cubic curve segment and its geometric queries.
//!
//! A `Curve` is four control points plus a stroke color. Its bounding box is
//! the control-point hull box, not the tight extrema box; every consumer
//! (spatial index, shape bbox, hit testing) uses the same loose bound.

use crate::model::Color;
use kurbo::{CubicBez, ParamCurve, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Default parameter-space distance under which two intersection
/// solutions are considered the same.
pub const INTERSECTION_EPSILON: f64 = 0.01;

/// Subdivision stops once both parameter spans are below this.
const MIN_PARAM_SPAN: f64 = 1e-3;
const MAX_SUBDIVISION_DEPTH: usize = 20;
/// Padding on sub-curve boxes so tangential touches are not missed.
const BBOX_SLOP: f64 = 1e-3;
/// Upper bound on raw solutions collected before coalescing. Coincident
/// curves would otherwise produce one solution per leaf.
const MAX_RAW_SOLUTIONS: usize = 256;

const PROJECT_SAMPLES: usize = 10;
const PROJECT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub start: Point,
    pub cp1: Point,
    pub cp2: Point,
    pub end: Point,
    pub color: Color,
}

/// Result of projecting a point onto a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub t: f64,
    pub point: Point,
    pub distance: f64,
}

impl Curve {
    pub fn new(start: Point, cp1: Point, cp2: Point, end: Point, color: Color) -> Self {
        Self {
            start,
            cp1,
            cp2,
            end,
            color,
        }
    }

    /// A straight segment expressed as a cubic with control points at the
    /// thirds, so it joins its neighbours with the smallest possible rounding.
    pub fn line(a: Point, b: Point, color: Color) -> Self {
        Self::new(a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b, color)
    }

    pub fn from_cubic(c: CubicBez, color: Color) -> Self {
        Self::new(c.p0, c.p1, c.p2, c.p3, color)
    }

    pub fn to_cubic(&self) -> CubicBez {
        CubicBez::new(self.start, self.cp1, self.cp2, self.end)
    }

    pub fn points(&self) -> [Point; 4] {
        [self.start, self.cp1, self.cp2, self.end]
    }

    /// Control-point bounding box.
    pub fn bbox(&self) -> Rect {
        Rect::from_points(self.start, self.end)
            .union_pt(self.cp1)
            .union_pt(self.cp2)
    }

    pub fn evaluate(&self, t: f64) -> Point {
        self.to_cubic().eval(t)
    }

    /// True when all four control points sit within `eps` of the start.
    pub fn is_degenerate(&self, eps: f64) -> bool {
        self.points()
            .iter()
            .all(|p| p.distance(self.start) <= eps)
    }

    pub fn reversed(&self) -> Curve {
        Curve::new(self.end, self.cp2, self.cp1, self.start, self.color)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        let d = Vec2::new(dx, dy);
        self.start += d;
        self.cp1 += d;
        self.cp2 += d;
        self.end += d;
    }

    /// De Casteljau subdivision at `t`. The left half ends exactly where the
    /// right half starts.
    pub fn split(&self, t: f64) -> (Curve, Curve) {
        let p01 = self.start.lerp(self.cp1, t);
        let p12 = self.cp1.lerp(self.cp2, t);
        let p23 = self.cp2.lerp(self.end, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let mid = p012.lerp(p123, t);
        (
            Curve::new(self.start, p01, p012, mid, self.color),
            Curve::new(mid, p123, p23, self.end, self.color),
        )
    }

    /// Split at several parameters at once. `ts` need not be sorted; values
    /// outside the open interval (0, 1) are ignored.
    pub fn split_many(&self, ts: &[f64]) -> Vec<Curve> {
        let mut ts: Vec<f64> = ts
            .iter()
            .copied()
            .filter(|t| *t > 0.0 && *t < 1.0)
            .collect();
        ts.sort_by(f64::total_cmp);
        ts.dedup();

        let mut pieces = Vec::with_capacity(ts.len() + 1);
        let mut rest = *self;
        let mut consumed = 0.0;
        for t in ts {
            // Re-map the absolute parameter onto what is left of the curve.
            let local = (t - consumed) / (1.0 - consumed);
            let (left, right) = rest.split(local);
            pieces.push(left);
            rest = right;
            consumed = t;
        }
        pieces.push(rest);
        pieces
    }

    /// Closest point on the curve: coarse sampling, then ternary refinement
    /// around the best sample.
    pub fn project(&self, p: Point) -> Projection {
        let cubic = self.to_cubic();
        let dist2 = |t: f64| cubic.eval(t).distance_squared(p);

        let mut best_t = 0.0;
        let mut best_d = f64::INFINITY;
        for i in 0..=PROJECT_SAMPLES {
            let t = i as f64 / PROJECT_SAMPLES as f64;
            let d = dist2(t);
            if d < best_d {
                best_d = d;
                best_t = t;
            }
        }

        let step = 1.0 / PROJECT_SAMPLES as f64;
        let mut lo = (best_t - step).max(0.0);
        let mut hi = (best_t + step).min(1.0);
        while hi - lo > PROJECT_TOLERANCE {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            if dist2(m1) < dist2(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let mut t = (lo + hi) / 2.0;
        if dist2(t) > best_d {
            t = best_t;
        }
        let point = cubic.eval(t);
        Projection {
            t,
            point,
            distance: point.distance(p),
        }
    }

    /// All parameter pairs `(t_self, t_other)` where the two curves meet.
    /// Solutions closer than `eps` in both parameters are coalesced.
    pub fn intersects(&self, other: &Curve, eps: f64) -> Vec<(f64, f64)> {
        let mut raw = Vec::new();
        subdivide_intersections(
            &self.to_cubic(),
            (0.0, 1.0),
            &other.to_cubic(),
            (0.0, 1.0),
            0,
            &mut raw,
        );
        coalesce(raw, eps)
    }

    /// Parameters where the curve crosses itself. A cubic has at most one
    /// loop; its crossing is reported as `(t_a, t_b)` with `t_a < t_b`, both
    /// in `[0, 1]` and more than `eps` apart.
    pub fn self_intersections(&self, eps: f64) -> Vec<(f64, f64)> {
        // With B(t) = a t³ + b t² + c t + d, B(s) = B(t) for s ≠ t reduces to
        // a (u² - v) + b u + c = 0, where u = s + t and v = s t.
        let [p0, p1, p2, p3] = self.points().map(Point::to_vec2);
        let a = -p0 + p1 * 3.0 - p2 * 3.0 + p3;
        let b = p0 * 3.0 - p1 * 6.0 + p2 * 3.0;
        let c = (p1 - p0) * 3.0;

        // Near-quadratic or straight curves have no loop.
        let hull = (p1 - p0).hypot() + (p2 - p1).hypot() + (p3 - p2).hypot();
        let aa = a.hypot2();
        let ab = a.cross(b);
        if aa == 0.0 || ab.abs() <= 1e-9 * hull * hull {
            return Vec::new();
        }
        let u = -a.cross(c) / ab;
        let v = u * u + (b * u + c).dot(a) / aa;
        let disc = u * u - 4.0 * v;
        if disc <= 0.0 {
            return Vec::new();
        }
        let root = disc.sqrt();
        let (ta, tb) = ((u - root) / 2.0, (u + root) / 2.0);
        let unit = 0.0..=1.0;
        let meets = self.evaluate(ta).distance(self.evaluate(tb)) <= 1e-6 * hull.max(1.0);
        if unit.contains(&ta) && unit.contains(&tb) && tb - ta > eps && meets {
            log::trace!("self crossing at {ta:.4} / {tb:.4}");
            vec![(ta, tb)]
        } else {
            Vec::new()
        }
    }
}

fn boxes_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn hull_box(c: &CubicBez) -> Rect {
    Rect::from_points(c.p0, c.p3)
        .union_pt(c.p1)
        .union_pt(c.p2)
        .inflate(BBOX_SLOP, BBOX_SLOP)
}

fn subdivide_intersections(
    a: &CubicBez,
    a_range: (f64, f64),
    b: &CubicBez,
    b_range: (f64, f64),
    depth: usize,
    out: &mut Vec<(f64, f64)>,
) {
    if out.len() >= MAX_RAW_SOLUTIONS || !boxes_overlap(hull_box(a), hull_box(b)) {
        return;
    }

    let a_span = a_range.1 - a_range.0;
    let b_span = b_range.1 - b_range.0;
    if depth >= MAX_SUBDIVISION_DEPTH || (a_span < MIN_PARAM_SPAN && b_span < MIN_PARAM_SPAN) {
        out.push((
            (a_range.0 + a_range.1) / 2.0,
            (b_range.0 + b_range.1) / 2.0,
        ));
        return;
    }

    let a_mid = (a_range.0 + a_range.1) / 2.0;
    let b_mid = (b_range.0 + b_range.1) / 2.0;
    let a_halves = [
        (a.subsegment(0.0..0.5), (a_range.0, a_mid)),
        (a.subsegment(0.5..1.0), (a_mid, a_range.1)),
    ];
    let b_halves = [
        (b.subsegment(0.0..0.5), (b_range.0, b_mid)),
        (b.subsegment(0.5..1.0), (b_mid, b_range.1)),
    ];
    for (sa, ra) in &a_halves {
        for (sb, rb) in &b_halves {
            subdivide_intersections(sa, *ra, sb, *rb, depth + 1, out);
        }
    }
}

fn coalesce(mut raw: Vec<(f64, f64)>, eps: f64) -> Vec<(f64, f64)> {
    raw.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.total_cmp(&y.1)));
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(raw.len());
    for (t1, t2) in raw {
        let dup = out
            .iter()
            .any(|(u1, u2)| (u1 - t1).abs() < eps && (u2 - t2).abs() < eps);
        if !dup {
            out.push((t1, t2));
        }
    }
    out
}
