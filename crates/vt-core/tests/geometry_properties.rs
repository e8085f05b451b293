//! Property checks over pseudo-random geometry.
//!
//! A small LCG keeps every run deterministic.

use kurbo::{Point, Rect, Vec2};
use vt_core::curve::Curve;
use vt_core::id::ObjectId;
use vt_core::model::Color;
use vt_core::shape::{Shape, SimplifyMode};
use vt_core::spatial::{SpatialIndex, intersects};

struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn point(&mut self, extent: f64) -> Point {
        Point::new(self.range(-extent, extent), self.range(-extent, extent))
    }

    fn curve(&mut self, extent: f64) -> Curve {
        Curve::new(
            self.point(extent),
            self.point(extent),
            self.point(extent),
            self.point(extent),
            Color::BLACK,
        )
    }
}

fn union_of(curves: &[Curve]) -> Rect {
    curves.iter().map(Curve::bbox).reduce(|a, b| a.union(b)).unwrap_or(Rect::ZERO)
}

// ─── Curve ───────────────────────────────────────────────────────────────

#[test]
fn split_halves_meet_on_the_curve() {
    let mut rng = Lcg(7);
    for _ in 0..200 {
        let c = rng.curve(500.0);
        let t = rng.next_f64();
        let (left, right) = c.split(t);
        let on = c.evaluate(t);
        assert_eq!(left.end, right.start);
        assert!(left.end.distance(on) < 1e-9, "split point {:?} off curve {:?}", left.end, on);
        assert_eq!(left.start, c.start);
        assert_eq!(right.end, c.end);
    }
}

// ─── Shape bbox ──────────────────────────────────────────────────────────

#[test]
fn shape_bbox_tracks_every_edit() {
    let mut rng = Lcg(11);
    let mut shape = Shape::with_ids(ObjectId::intern("prop-bbox"), ObjectId::intern("prop-bbox-0"));
    for step in 0..60 {
        match step % 5 {
            0 | 1 => shape.add_curve(rng.curve(200.0)),
            2 => {
                let p = rng.point(300.0);
                shape.add_line(p.x, p.y);
            }
            3 if !shape.is_empty() => {
                let i = (rng.next_f64() * shape.curves().len() as f64) as usize;
                shape.replace_curve(i.min(shape.curves().len() - 1), rng.curve(400.0));
            }
            _ => {
                let mut curves = shape.curves().to_vec();
                curves.pop();
                shape.set_curves(curves);
            }
        }
        assert_eq!(shape.bbox(), union_of(shape.curves()), "after step {step}");
    }

    shape.simplify(SimplifyMode::Corners);
    assert_eq!(shape.bbox(), union_of(shape.curves()));
    shape.simplify(SimplifyMode::Smooth);
    assert_eq!(shape.bbox(), union_of(shape.curves()));
    shape.clear();
    assert_eq!(shape.bbox(), Rect::ZERO);
}

// ─── SpatialIndex ────────────────────────────────────────────────────────

#[test]
fn index_query_has_no_false_negatives() {
    let mut rng = Lcg(42);
    let mut index = SpatialIndex::with_capacity(Rect::new(0.0, 0.0, 10.0, 10.0), 3);
    let mut boxes = Vec::new();

    for i in 0..300 {
        // Grow outward so the boundary has to re-root several times.
        let extent = 10.0 + i as f64 * 5.0;
        let p = rng.point(extent);
        let b = Rect::from_points(p, p + Vec2::new(rng.range(0.0, 40.0), rng.range(0.0, 40.0)));
        index.insert(b, i);
        boxes.push(b);

        if i % 10 == 0 {
            let q = rng.point(extent);
            let range = Rect::from_points(q, q + Vec2::new(rng.range(1.0, 300.0), rng.range(1.0, 300.0)));
            let hits = index.query(range);
            for (j, b) in boxes.iter().enumerate() {
                if intersects(*b, range) {
                    assert!(hits.contains(&j), "box {j} {b:?} missing from query {range:?}");
                }
            }
        }
    }
    assert_eq!(index.len(), 300);
}
