//! Path morphing between two outlines with possibly different segment counts.
//!
//! Both command lists are normalized to the same length by splitting
//! segments of the shorter one, command kinds are promoted to match, and
//! every coordinate is blended. Output at `t = 0` traces the first outline,
//! at `t = 1` the second.

use crate::curve::Curve;
use crate::model::Color;
use kurbo::{BezPath, PathEl, Point};

/// Distance under which consecutive curves are treated as one subpath.
const JOIN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

impl PathCmd {
    fn end(&self, subpath_start: Point) -> Point {
        match *self {
            PathCmd::MoveTo(p) | PathCmd::LineTo(p) | PathCmd::QuadTo(_, p) => p,
            PathCmd::CubicTo(_, _, p) => p,
            PathCmd::Close => subpath_start,
        }
    }

    fn points_from(&self, start: Point) -> Vec<Point> {
        match *self {
            PathCmd::LineTo(p) => vec![start, p],
            PathCmd::QuadTo(c, p) => vec![start, c, p],
            PathCmd::CubicTo(c1, c2, p) => vec![start, c1, c2, p],
            PathCmd::MoveTo(p) => vec![p],
            PathCmd::Close => vec![start],
        }
    }

    fn from_points(pts: &[Point]) -> PathCmd {
        match *pts {
            [_, p] => PathCmd::LineTo(p),
            [_, c, p] => PathCmd::QuadTo(c, p),
            [_, c1, c2, p] => PathCmd::CubicTo(c1, c2, p),
            _ => PathCmd::LineTo(pts.last().copied().unwrap_or(Point::ZERO)),
        }
    }

    /// Re-express `self` (drawn from `start`) with the kind of `target`.
    fn promote_to(&self, target: &PathCmd, start: Point) -> PathCmd {
        let end = self.end(start);
        match (self, target) {
            (_, PathCmd::MoveTo(_)) => PathCmd::MoveTo(end),
            (_, PathCmd::Close) => *self,
            (_, PathCmd::LineTo(_)) => PathCmd::LineTo(end),
            (PathCmd::MoveTo(p), PathCmd::QuadTo(..)) => PathCmd::QuadTo(*p, *p),
            (PathCmd::MoveTo(p), PathCmd::CubicTo(..)) => PathCmd::CubicTo(*p, *p, *p),
            (PathCmd::LineTo(p), PathCmd::QuadTo(..)) => PathCmd::QuadTo(start.midpoint(*p), *p),
            (PathCmd::LineTo(p), PathCmd::CubicTo(..)) => {
                PathCmd::CubicTo(start.lerp(*p, 1.0 / 3.0), start.lerp(*p, 2.0 / 3.0), *p)
            }
            (PathCmd::QuadTo(..), PathCmd::QuadTo(..)) => *self,
            (PathCmd::QuadTo(c, p), PathCmd::CubicTo(..)) => {
                let (c1, c2) = elevate(start, *c, *p);
                PathCmd::CubicTo(c1, c2, *p)
            }
            (PathCmd::CubicTo(c1, c2, p), PathCmd::QuadTo(..)) => {
                let c = ((c1.to_vec2() + c2.to_vec2()) * 3.0 - start.to_vec2() - p.to_vec2()) / 4.0;
                PathCmd::QuadTo(c.to_point(), *p)
            }
            (PathCmd::CubicTo(..), PathCmd::CubicTo(..)) => *self,
            (PathCmd::Close, _) => PathCmd::LineTo(end).promote_to(target, start),
        }
    }
}

/// Quadratic → cubic degree elevation.
fn elevate(start: Point, c: Point, end: Point) -> (Point, Point) {
    (start.lerp(c, 2.0 / 3.0), end.lerp(c, 2.0 / 3.0))
}

// ─── Curves ⇄ commands ──────────────────────────────────────────────────

/// Every curve becomes a `CubicTo`; a `MoveTo` opens each subpath.
pub fn curves_to_commands(curves: &[Curve]) -> Vec<PathCmd> {
    let mut cmds = Vec::with_capacity(curves.len() + 1);
    let mut prev_end: Option<Point> = None;
    for c in curves {
        let joined = prev_end.is_some_and(|p| p.distance(c.start) <= JOIN_EPSILON);
        if !joined {
            cmds.push(PathCmd::MoveTo(c.start));
        }
        cmds.push(PathCmd::CubicTo(c.cp1, c.cp2, c.end));
        prev_end = Some(c.end);
    }
    cmds
}

/// Lines and quadratics come back as cubics; `Close` adds the closing line
/// when the subpath is still open.
pub fn commands_to_curves(cmds: &[PathCmd], color: Color) -> Vec<Curve> {
    let mut curves = Vec::with_capacity(cmds.len());
    let mut cur = Point::ZERO;
    let mut start = Point::ZERO;
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(p) => {
                cur = p;
                start = p;
            }
            PathCmd::LineTo(p) => {
                curves.push(Curve::line(cur, p, color));
                cur = p;
            }
            PathCmd::QuadTo(c, p) => {
                let (c1, c2) = elevate(cur, c, p);
                curves.push(Curve::new(cur, c1, c2, p, color));
                cur = p;
            }
            PathCmd::CubicTo(c1, c2, p) => {
                curves.push(Curve::new(cur, c1, c2, p, color));
                cur = p;
            }
            PathCmd::Close => {
                if cur.distance(start) > JOIN_EPSILON {
                    curves.push(Curve::line(cur, start, color));
                }
                cur = start;
            }
        }
    }
    curves
}

pub fn commands_to_bezpath(cmds: &[PathCmd]) -> BezPath {
    let mut path = BezPath::new();
    for cmd in cmds {
        path.push(match *cmd {
            PathCmd::MoveTo(p) => PathEl::MoveTo(p),
            PathCmd::LineTo(p) => PathEl::LineTo(p),
            PathCmd::QuadTo(c, p) => PathEl::QuadTo(c, p),
            PathCmd::CubicTo(c1, c2, p) => PathEl::CurveTo(c1, c2, p),
            PathCmd::Close => PathEl::ClosePath,
        });
    }
    path
}

// ─── Interpolation ──────────────────────────────────────────────────────

/// Blend two command sequences at `t`. The result always has the length of
/// the longer input (plus a trailing `Close` when both inputs end closed).
pub fn interpolate_commands(a: &[PathCmd], b: &[PathCmd], t: f64) -> Vec<PathCmd> {
    let close_a = matches!(a.last(), Some(PathCmd::Close));
    let close_b = matches!(b.last(), Some(PathCmd::Close));
    let mut a = lower_closes(strip_close(a));
    let mut b = lower_closes(strip_close(b));

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Vec::new(),
        (true, false) => a.push(start_as_move(&b)),
        (false, true) => b.push(start_as_move(&a)),
        (false, false) => {}
    }

    if a.len() < b.len() {
        a = extend(&a, b.len());
    } else if b.len() < a.len() {
        b = extend(&b, a.len());
    }
    debug_assert_eq!(a.len(), b.len());

    let mut out = Vec::with_capacity(a.len() + 1);
    let mut cur = Point::ZERO;
    for (ca, cb) in a.iter().zip(&b) {
        out.push(blend(&ca.promote_to(cb, cur), cb, t));
        cur = ca.end(cur);
    }

    if close_a && close_b {
        out.push(PathCmd::Close);
    }
    out
}

/// Morph two curve lists directly.
pub fn morph_curves(a: &[Curve], b: &[Curve], t: f64, color: Color) -> Vec<Curve> {
    let cmds = interpolate_commands(&curves_to_commands(a), &curves_to_commands(b), t);
    commands_to_curves(&cmds, color)
}

fn strip_close(cmds: &[PathCmd]) -> &[PathCmd] {
    match cmds.split_last() {
        Some((PathCmd::Close, rest)) => rest,
        _ => cmds,
    }
}

fn start_as_move(cmds: &[PathCmd]) -> PathCmd {
    PathCmd::MoveTo(cmds[0].end(Point::ZERO))
}

/// Interior `Close`s become explicit lines so every command has an end point
/// independent of subpath bookkeeping.
fn lower_closes(cmds: &[PathCmd]) -> Vec<PathCmd> {
    let mut out = Vec::with_capacity(cmds.len());
    let mut start = Point::ZERO;
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(p) => {
                start = p;
                out.push(*cmd);
            }
            PathCmd::Close => out.push(PathCmd::LineTo(start)),
            _ => out.push(*cmd),
        }
    }
    out
}

fn blend(a: &PathCmd, b: &PathCmd, t: f64) -> PathCmd {
    let l = |p: Point, q: Point| p.lerp(q, t);
    match (*a, *b) {
        (PathCmd::MoveTo(p), PathCmd::MoveTo(q)) => PathCmd::MoveTo(l(p, q)),
        (PathCmd::LineTo(p), PathCmd::LineTo(q)) => PathCmd::LineTo(l(p, q)),
        (PathCmd::QuadTo(c, p), PathCmd::QuadTo(d, q)) => PathCmd::QuadTo(l(c, d), l(p, q)),
        (PathCmd::CubicTo(c1, c2, p), PathCmd::CubicTo(d1, d2, q)) => {
            PathCmd::CubicTo(l(c1, d1), l(c2, d2), l(p, q))
        }
        _ => *a,
    }
}

/// Split segments of `cmds` until it has `target_len` commands. The first
/// command is kept; each later segment is split into as many pieces as the
/// reference segments that map onto it.
fn extend(cmds: &[PathCmd], target_len: usize) -> Vec<PathCmd> {
    let own_segments = cmds.len() - 1;
    let ref_segments = target_len - 1;
    let mut out = Vec::with_capacity(target_len);
    out.push(cmds[0]);
    let mut cur = cmds[0].end(Point::ZERO);

    if own_segments == 0 {
        out.extend(std::iter::repeat_n(PathCmd::LineTo(cur), ref_segments));
        return out;
    }

    let ratio = own_segments as f64 / ref_segments as f64;
    let mut counts = vec![0usize; own_segments];
    for i in 0..ref_segments {
        let slot = ((ratio * i as f64).floor() as usize).min(own_segments - 1);
        counts[slot] += 1;
    }

    for (cmd, &count) in cmds[1..].iter().zip(&counts) {
        out.extend(split_command(cur, cmd, count));
        cur = cmd.end(cur);
    }
    out
}

fn split_command(start: Point, cmd: &PathCmd, count: usize) -> Vec<PathCmd> {
    if count <= 1 {
        return vec![*cmd; count];
    }
    match cmd {
        PathCmd::MoveTo(_) | PathCmd::Close => vec![*cmd; count],
        _ => {
            let mut pieces = Vec::with_capacity(count);
            let mut rest = cmd.points_from(start);
            for i in 0..count - 1 {
                let t = 1.0 / (count - i) as f64;
                let (left, right) = de_casteljau(&rest, t);
                pieces.push(PathCmd::from_points(&left));
                rest = right;
            }
            pieces.push(PathCmd::from_points(&rest));
            pieces
        }
    }
}

/// Split a Bézier of any degree at `t`.
fn de_casteljau(points: &[Point], t: f64) -> (Vec<Point>, Vec<Point>) {
    let mut left = Vec::with_capacity(points.len());
    let mut right = Vec::with_capacity(points.len());
    let mut level = points.to_vec();
    while !level.is_empty() {
        left.push(level[0]);
        right.push(level[level.len() - 1]);
        level = level.windows(2).map(|w| w[0].lerp(w[1], t)).collect();
    }
    right.reverse();
    (left, right)
}
