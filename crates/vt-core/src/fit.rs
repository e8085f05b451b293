//! Polyline simplification and cubic curve fitting for freehand input.
//!
//! - `simplify_polyline`: radial-distance filter, then Ramer–Douglas–Peucker.
//!   Used by the "corners" simplify mode.
//! - `fit_curve`: least-squares cubic fitting with Newton
//!   reparameterization (Schneider, Graphics Gems 1990). Every input point
//!   ends up within `error_tolerance` of the returned curve sequence.

use crate::error::GeometryError;
use kurbo::{Point, Vec2};

/// Newton passes attempted before a segment is split.
const MAX_REPARAM_ITERATIONS: usize = 20;
/// Splitting deeper than this accepts whatever the last fit produced.
const MAX_FIT_DEPTH: usize = 32;

// ─── Polyline simplification ────────────────────────────────────────────

/// Drop points that add less than `tolerance` of deviation. Endpoints are
/// always kept.
pub fn simplify_polyline(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let sq_tol = tolerance * tolerance;
    let radial = simplify_radial(points, sq_tol);
    simplify_douglas_peucker(&radial, sq_tol)
}

fn simplify_radial(points: &[Point], sq_tol: f64) -> Vec<Point> {
    let mut out = vec![points[0]];
    let mut prev = points[0];
    for &p in &points[1..] {
        if p.distance_squared(prev) > sq_tol {
            out.push(p);
            prev = p;
        }
    }
    let last = points[points.len() - 1];
    if prev != last {
        out.push(last);
    }
    out
}

fn simplify_douglas_peucker(points: &[Point], sq_tol: f64) -> Vec<Point> {
    let last = points.len() - 1;
    let mut out = vec![points[0]];
    dp_step(points, 0, last, sq_tol, &mut out);
    out.push(points[last]);
    out
}

fn dp_step(points: &[Point], first: usize, last: usize, sq_tol: f64, out: &mut Vec<Point>) {
    let mut max_sq = sq_tol;
    let mut index = None;
    for i in first + 1..last {
        let d = sq_segment_distance(points[i], points[first], points[last]);
        if d > max_sq {
            max_sq = d;
            index = Some(i);
        }
    }
    if let Some(i) = index {
        if i - first > 1 {
            dp_step(points, first, i, sq_tol, out);
        }
        out.push(points[i]);
        if last - i > 1 {
            dp_step(points, i, last, sq_tol, out);
        }
    }
}

fn sq_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 == 0.0 {
        return p.distance_squared(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance_squared(a + ab * t)
}

// ─── Curve fitting ──────────────────────────────────────────────────────

/// Fit a minimal sequence of cubic segments through `points`.
///
/// # Errors
/// `GeometryError::EmptyPointList` when fewer than two distinct points remain.
pub fn fit_curve(points: &[Point], error_tolerance: f64) -> Result<Vec<[Point; 4]>, GeometryError> {
    let mut pts: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    if pts.len() < 2 {
        return Err(GeometryError::EmptyPointList(pts.len()));
    }

    let n = pts.len();
    let left = unit(pts[1] - pts[0]);
    let right = unit(pts[n - 2] - pts[n - 1]);
    let mut out = Vec::new();
    fit_cubic(&pts, left, right, error_tolerance.max(1e-6), 0, &mut out);
    log::trace!("fit {} points into {} cubics", n, out.len());
    Ok(out)
}

fn fit_cubic(
    pts: &[Point],
    tan1: Vec2,
    tan2: Vec2,
    error: f64,
    depth: usize,
    out: &mut Vec<[Point; 4]>,
) {
    let first = pts[0];
    let last = pts[pts.len() - 1];
    if pts.len() == 2 {
        let dist = first.distance(last) / 3.0;
        out.push([first, first + tan1 * dist, last + tan2 * dist, last]);
        return;
    }

    let mut u = chord_length_parameterize(pts);
    let mut bez = generate_bezier(pts, &u, tan1, tan2);
    let (mut max_err, mut split) = max_error(pts, &bez, &u);
    if max_err <= error || depth >= MAX_FIT_DEPTH {
        out.push(bez);
        return;
    }

    // Close enough that reparameterizing may converge without a split.
    if max_err <= error * 4.0 {
        for _ in 0..MAX_REPARAM_ITERATIONS {
            let u_prime = reparameterize(&bez, pts, &u);
            bez = generate_bezier(pts, &u_prime, tan1, tan2);
            (max_err, split) = max_error(pts, &bez, &u_prime);
            if max_err <= error {
                out.push(bez);
                return;
            }
            u = u_prime;
        }
    }

    let split = split.clamp(1, pts.len() - 2);
    let mut center = unit(pts[split - 1] - pts[split + 1]);
    if center == Vec2::ZERO {
        center = unit(pts[split - 1] - pts[split]);
    }
    fit_cubic(&pts[..=split], tan1, center, error, depth + 1, out);
    fit_cubic(&pts[split..], -center, tan2, error, depth + 1, out);
}

fn generate_bezier(pts: &[Point], u: &[f64], tan1: Vec2, tan2: Vec2) -> [Point; 4] {
    let first = pts[0];
    let last = pts[pts.len() - 1];

    let mut c = [[0.0f64; 2]; 2];
    let mut x = [0.0f64; 2];
    for (p, &t) in pts.iter().zip(u) {
        let mt = 1.0 - t;
        let b0 = mt * mt * mt;
        let b1 = 3.0 * t * mt * mt;
        let b2 = 3.0 * t * t * mt;
        let b3 = t * t * t;
        let a0 = tan1 * b1;
        let a1 = tan2 * b2;
        c[0][0] += a0.dot(a0);
        c[0][1] += a0.dot(a1);
        c[1][1] += a1.dot(a1);
        let tmp = p.to_vec2() - (first.to_vec2() * (b0 + b1) + last.to_vec2() * (b2 + b3));
        x[0] += a0.dot(tmp);
        x[1] += a1.dot(tmp);
    }
    c[1][0] = c[0][1];

    let det_c0_c1 = c[0][0] * c[1][1] - c[1][0] * c[0][1];
    let det_c0_x = c[0][0] * x[1] - c[1][0] * x[0];
    let det_x_c1 = x[0] * c[1][1] - x[1] * c[0][1];
    let (mut alpha_l, mut alpha_r) = if det_c0_c1.abs() < 1e-12 {
        (0.0, 0.0)
    } else {
        (det_x_c1 / det_c0_c1, det_c0_x / det_c0_c1)
    };

    let seg_len = first.distance(last);
    let eps = 1e-6 * seg_len;
    if alpha_l < eps || alpha_r < eps {
        alpha_l = seg_len / 3.0;
        alpha_r = seg_len / 3.0;
    }
    [first, first + tan1 * alpha_l, last + tan2 * alpha_r, last]
}

fn chord_length_parameterize(pts: &[Point]) -> Vec<f64> {
    let mut u = Vec::with_capacity(pts.len());
    u.push(0.0);
    for i in 1..pts.len() {
        let prev = u[i - 1];
        u.push(prev + pts[i].distance(pts[i - 1]));
    }
    let total = u[u.len() - 1];
    if total > 0.0 {
        for v in u.iter_mut() {
            *v /= total;
        }
    }
    u
}

fn max_error(pts: &[Point], bez: &[Point; 4], u: &[f64]) -> (f64, usize) {
    let mut max = 0.0;
    let mut split = pts.len() / 2;
    for i in 1..pts.len() - 1 {
        let d = eval(bez, u[i]).distance(pts[i]);
        if d > max {
            max = d;
            split = i;
        }
    }
    (max, split)
}

fn reparameterize(bez: &[Point; 4], pts: &[Point], u: &[f64]) -> Vec<f64> {
    pts.iter()
        .zip(u)
        .map(|(&p, &t)| newton_root(bez, p, t))
        .collect()
}

fn newton_root(bez: &[Point; 4], p: Point, t: f64) -> f64 {
    let d = eval(bez, t) - p;
    let d1 = deriv1(bez, t);
    let d2 = deriv2(bez, t);
    let numerator = d.dot(d1);
    let denominator = d1.dot(d1) + d.dot(d2);
    if denominator.abs() < 1e-12 {
        t
    } else {
        (t - numerator / denominator).clamp(0.0, 1.0)
    }
}

fn eval(b: &[Point; 4], t: f64) -> Point {
    let mt = 1.0 - t;
    let v = b[0].to_vec2() * (mt * mt * mt)
        + b[1].to_vec2() * (3.0 * mt * mt * t)
        + b[2].to_vec2() * (3.0 * mt * t * t)
        + b[3].to_vec2() * (t * t * t);
    v.to_point()
}

fn deriv1(b: &[Point; 4], t: f64) -> Vec2 {
    let mt = 1.0 - t;
    (b[1] - b[0]) * (3.0 * mt * mt) + (b[2] - b[1]) * (6.0 * mt * t) + (b[3] - b[2]) * (3.0 * t * t)
}

fn deriv2(b: &[Point; 4], t: f64) -> Vec2 {
    let mt = 1.0 - t;
    let a = b[2].to_vec2() - b[1].to_vec2() * 2.0 + b[0].to_vec2();
    let c = b[3].to_vec2() - b[2].to_vec2() * 2.0 + b[1].to_vec2();
    a * (6.0 * mt) + c * (6.0 * t)
}

fn unit(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len > 0.0 { v / len } else { Vec2::ZERO }
}
