//! Adaptive quad-partition over curve bounding boxes.
//!
//! Stores curve *indices*, not curves, so callers re-resolve against the
//! live curve list. Indices are invalid the moment the owning shape's curve
//! list changes; `Shape` rebuilds its index on every mutation.
//!
//! Inserting a box outside the boundary never fails: the tree is re-rooted
//! under a parent twice its size (toward the new box) until it fits. A box
//! that straddles quadrant lines is stored in every quadrant it touches, so
//! queries have no false negatives.

use kurbo::{Point, Rect};

/// Curves per node before it subdivides.
pub const DEFAULT_CAPACITY: usize = 4;
/// Past this depth a node keeps everything it is given.
const MAX_DEPTH: usize = 16;
/// Bound on consecutive re-roots for one insert.
const MAX_REROOTS: usize = 64;

#[derive(Debug, Clone)]
struct Node {
    boundary: Rect,
    items: Vec<(usize, Rect)>,
    /// NW, NE, SW, SE (y grows downward).
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(boundary: Rect) -> Self {
        Node {
            boundary,
            items: Vec::new(),
            children: None,
        }
    }

    fn quadrants(b: Rect) -> [Rect; 4] {
        let c = b.center();
        [
            Rect::new(b.x0, b.y0, c.x, c.y),
            Rect::new(c.x, b.y0, b.x1, c.y),
            Rect::new(b.x0, c.y, c.x, b.y1),
            Rect::new(c.x, c.y, b.x1, b.y1),
        ]
    }

    fn subdivide(&mut self, depth: usize, capacity: usize) {
        let [nw, ne, sw, se] = Self::quadrants(self.boundary);
        self.children = Some(Box::new([
            Node::new(nw),
            Node::new(ne),
            Node::new(sw),
            Node::new(se),
        ]));
        for (idx, bbox) in std::mem::take(&mut self.items) {
            self.insert_into_children(idx, bbox, depth, capacity);
        }
    }

    fn insert_into_children(&mut self, idx: usize, bbox: Rect, depth: usize, capacity: usize) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if intersects(child.boundary, bbox) {
                    child.insert(idx, bbox, depth + 1, capacity);
                }
            }
        }
    }

    fn insert(&mut self, idx: usize, bbox: Rect, depth: usize, capacity: usize) {
        debug_assert!(intersects(self.boundary, bbox));

        if self.children.is_none() {
            if self.items.len() < capacity || depth >= MAX_DEPTH {
                self.items.push((idx, bbox));
                return;
            }
            self.subdivide(depth, capacity);
        }
        self.insert_into_children(idx, bbox, depth, capacity);
    }

    fn query(&self, range: Rect, out: &mut Vec<usize>) {
        if !intersects(self.boundary, range) {
            return;
        }
        out.extend(
            self.items
                .iter()
                .filter(|(_, bbox)| intersects(*bbox, range))
                .map(|(idx, _)| *idx),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(range, out);
            }
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(Node::count_nodes).sum())
    }
}

/// Quadtree over curve bounding boxes for hit testing and intersection
/// candidate lookup.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: Node,
    capacity: usize,
    len: usize,
}

impl SpatialIndex {
    pub fn new(boundary: Rect) -> Self {
        Self::with_capacity(boundary, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(boundary: Rect, capacity: usize) -> Self {
        Self {
            root: Node::new(normalize_boundary(boundary)),
            capacity: capacity.max(1),
            len: 0,
        }
    }

    pub fn boundary(&self) -> Rect {
        self.root.boundary
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of inserted curve indices.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total node count (root included). Mostly useful to observe subdivision.
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Insert a curve's bbox under `curve_index`. Never fails.
    pub fn insert(&mut self, bbox: Rect, curve_index: usize) {
        self.len += 1;
        if !is_finite(bbox) {
            log::warn!("spatial index: non-finite bbox for curve {curve_index}, parked at root");
            self.root.items.push((curve_index, bbox));
            return;
        }

        let mut reroots = 0;
        while !contains(self.root.boundary, bbox) && reroots < MAX_REROOTS {
            self.reroot_toward(bbox);
            reroots += 1;
        }
        self.root.insert(curve_index, bbox, 0, self.capacity);
    }

    /// Every curve index whose bbox intersects `range`, sorted and
    /// deduplicated. May contain false positives, never false negatives.
    pub fn query(&self, range: Rect) -> Vec<usize> {
        let mut found = Vec::new();
        self.root.query(range, &mut found);
        // Parked non-finite boxes never intersect anything; nothing to add.
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Curves whose bbox lies within `tolerance` of `p`.
    pub fn query_point(&self, p: Point, tolerance: f64) -> Vec<usize> {
        let tol = tolerance.max(0.0);
        self.query(Rect::new(p.x - tol, p.y - tol, p.x + tol, p.y + tol))
    }

    /// Reset to a single empty node over the same boundary.
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.boundary);
        self.len = 0;
    }

    /// Make the current root one quadrant of a parent twice its size,
    /// extending toward `bbox`.
    fn reroot_toward(&mut self, bbox: Rect) {
        let b = self.root.boundary;
        let (w, h) = (b.width(), b.height());
        let grow_left = bbox.x0 < b.x0;
        let grow_up = bbox.y0 < b.y0;

        let new_boundary = Rect::new(
            if grow_left { b.x0 - w } else { b.x0 },
            if grow_up { b.y0 - h } else { b.y0 },
            if grow_left { b.x1 } else { b.x1 + w },
            if grow_up { b.y1 } else { b.y1 + h },
        );
        log::debug!("spatial index: re-rooting {b:?} -> {new_boundary:?}");

        // Old root sits opposite the growth direction.
        let slot = match (grow_left, grow_up) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        let old = std::mem::replace(&mut self.root, Node::new(new_boundary));
        let quads = Node::quadrants(new_boundary);
        let mut children = quads.map(Node::new);
        debug_assert!(rect_approx_eq(quads[slot], old.boundary));
        children[slot] = old;
        self.root.children = Some(Box::new(children));
    }
}

// ─── Rect helpers ──────────────────────────────────────────────────────────

/// Closed-interval overlap test (touching edges count).
pub fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Whether `outer` fully contains `inner`.
pub fn contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.x1 <= outer.x1 && inner.y0 >= outer.y0 && inner.y1 <= outer.y1
}

fn is_finite(r: Rect) -> bool {
    r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()
}

fn rect_approx_eq(a: Rect, b: Rect) -> bool {
    let eps = 1e-9 * (1.0 + a.width().abs() + a.height().abs());
    (a.x0 - b.x0).abs() <= eps
        && (a.y0 - b.y0).abs() <= eps
        && (a.x1 - b.x1).abs() <= eps
        && (a.y1 - b.y1).abs() <= eps
}

fn normalize_boundary(b: Rect) -> Rect {
    let b = b.abs();
    if !is_finite(b) {
        return Rect::new(0.0, 0.0, 1.0, 1.0);
    }
    Rect::new(b.x0, b.y0, b.x1.max(b.x0 + 1.0), b.y1.max(b.y0 + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Rect {
        Rect::new(x, y, x + s, y + s)
    }

    #[test]
    fn insert_and_query() {
        let mut idx = SpatialIndex::new(square(0.0, 0.0, 100.0));
        idx.insert(square(10.0, 10.0, 10.0), 0);
        idx.insert(square(30.0, 30.0, 10.0), 1);
        idx.insert(square(60.0, 60.0, 10.0), 2);

        let hits = idx.query(Rect::new(15.0, 15.0, 35.0, 35.0));
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn subdivides_on_overflow() {
        let mut idx = SpatialIndex::with_capacity(square(0.0, 0.0, 100.0), 2);
        for (i, x) in [5.0, 30.0, 60.0, 85.0].into_iter().enumerate() {
            idx.insert(square(x, x, 5.0), i);
        }
        assert!(idx.node_count() > 1);
        assert_eq!(idx.query(square(0.0, 0.0, 100.0)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn straddling_box_found_from_every_side() {
        let mut idx = SpatialIndex::with_capacity(square(0.0, 0.0, 100.0), 1);
        idx.insert(square(10.0, 10.0, 5.0), 0);
        idx.insert(Rect::new(40.0, 40.0, 60.0, 60.0), 1);
        for probe in [square(41.0, 41.0, 1.0), square(58.0, 58.0, 1.0), square(41.0, 58.0, 1.0)] {
            assert!(idx.query(probe).contains(&1), "missed straddler at {probe:?}");
        }
    }

    #[test]
    fn reroots_toward_outside_box() {
        let mut idx = SpatialIndex::new(square(0.0, 0.0, 100.0));
        idx.insert(square(10.0, 10.0, 5.0), 0);
        idx.insert(Rect::new(-350.0, 20.0, -340.0, 30.0), 1);

        let b = idx.boundary();
        assert!(b.x0 <= -350.0);
        assert!(contains(b, square(0.0, 0.0, 100.0)));
        assert_eq!(idx.query(Rect::new(-360.0, 0.0, 20.0, 40.0)), vec![0, 1]);
        assert_eq!(idx.query(square(10.0, 10.0, 1.0)), vec![0]);
    }

    #[test]
    fn clear_keeps_boundary() {
        let mut idx = SpatialIndex::new(square(0.0, 0.0, 100.0));
        idx.insert(square(150.0, 150.0, 10.0), 0);
        let grown = idx.boundary();
        idx.clear();
        assert!(idx.is_empty());
        assert_eq!(idx.boundary(), grown);
        assert!(idx.query(grown).is_empty());
    }

    #[test]
    fn randomized_queries_have_no_false_negatives() {
        // Small LCG so the sequence is reproducible.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64) / (u32::MAX as f64 / 2.0)
        };

        let mut idx = SpatialIndex::with_capacity(square(0.0, 0.0, 50.0), 3);
        let mut boxes = Vec::new();
        for i in 0..300 {
            let x = next() * 800.0 - 400.0;
            let y = next() * 800.0 - 400.0;
            let w = next() * 40.0;
            let h = next() * 40.0;
            let b = Rect::new(x, y, x + w, y + h);
            idx.insert(b, i);
            boxes.push(b);
        }
        assert_eq!(idx.len(), 300);

        for _ in 0..200 {
            let x = next() * 900.0 - 450.0;
            let y = next() * 900.0 - 450.0;
            let range = Rect::new(x, y, x + next() * 120.0, y + next() * 120.0);
            let found = idx.query(range);
            for (i, b) in boxes.iter().enumerate() {
                if intersects(*b, range) {
                    assert!(found.contains(&i), "false negative for {i}");
                }
            }
        }
    }
}
