//! Legacy per-index frame track.
//!
//! Cells are either absent or hold a `Frame`. Keyframe cells carry a full
//! snapshot (per-child transform keys plus shapes); every other cell links
//! to its bracketing keyframes by index and computes its content from them.
//! Links are rebuilt by `update_frame_next_and_prev` after every structural
//! edit, so they never point at a cell that is no longer a keyframe.

use crate::id::ObjectId;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Numeric transform keys of one child (`"x"`, `"y"`, `"rotation"`, …).
pub type ChildKeys = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Keyframe,
    /// Transform keys blend linearly between the bracketing keyframes.
    Motion,
    /// Shapes morph between the bracketing keyframes.
    Shape,
    /// Plain copy of the preceding keyframe.
    Normal,
}

impl FrameKind {
    pub fn is_tween(self) -> bool {
        matches!(self, FrameKind::Motion | FrameKind::Shape)
    }
}

/// Index-based back-references to the bracketing keyframe cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweenLink {
    pub prev_index: usize,
    /// `None` for a `Normal` run after the last keyframe.
    pub next_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: ObjectId,
    pub kind: FrameKind,
    #[serde(default)]
    pub keys: HashMap<ObjectId, ChildKeys>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub link: Option<TweenLink>,
}

impl Frame {
    pub fn keyframe(keys: HashMap<ObjectId, ChildKeys>, shapes: Vec<Shape>) -> Self {
        Self {
            id: ObjectId::with_prefix("frame"),
            kind: FrameKind::Keyframe,
            keys,
            shapes,
            link: None,
        }
    }

    fn linked(kind: FrameKind, link: TweenLink) -> Self {
        Self {
            id: ObjectId::with_prefix("frame"),
            kind,
            keys: HashMap::new(),
            shapes: Vec::new(),
            link: Some(link),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        self.kind == FrameKind::Keyframe
    }
}

/// Computed content of a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSnapshot {
    pub keys: HashMap<ObjectId, ChildKeys>,
    pub shapes: Vec<Shape>,
}

impl FrameSnapshot {
    fn of(frame: &Frame) -> Self {
        Self {
            keys: frame.keys.clone(),
            shapes: frame.shapes.clone(),
        }
    }

    pub fn key(&self, child: ObjectId, param: &str) -> Option<f64> {
        self.keys.get(&child)?.get(param).copied()
    }
}

// ─── Track ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyFrameTrack {
    cells: Vec<Option<Frame>>,
}

impl Default for LegacyFrameTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyFrameTrack {
    /// A track with one empty keyframe at index 0.
    pub fn new() -> Self {
        Self {
            cells: vec![Some(Frame::keyframe(HashMap::new(), Vec::new()))],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&Frame> {
        self.cells.get(index)?.as_ref()
    }

    pub fn kind(&self, index: usize) -> Option<FrameKind> {
        self.cell(index).map(|f| f.kind)
    }

    pub fn keyframe_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_ref().is_some_and(Frame::is_keyframe))
            .map(|(i, _)| i)
            .collect()
    }

    /// Greatest keyframe index ≤ `index`.
    pub fn prev_keyframe(&self, index: usize) -> Option<usize> {
        let end = index.min(self.cells.len().checked_sub(1)?);
        (0..=end).rev().find(|&i| self.is_keyframe(i))
    }

    /// Least keyframe index > `index`.
    pub fn next_keyframe(&self, index: usize) -> Option<usize> {
        (index + 1..self.cells.len()).find(|&i| self.is_keyframe(i))
    }

    fn is_keyframe(&self, index: usize) -> bool {
        self.cell(index).is_some_and(Frame::is_keyframe)
    }

    // ─── Reading ─────────────────────────────────────────────────────────

    /// Content of cell `index`: keyframes return themselves, tweens blend
    /// their bracketing keyframes, everything else copies the preceding
    /// keyframe.
    pub fn get_frame(&self, index: usize) -> FrameSnapshot {
        let Some(frame) = self.cell(index) else {
            return self.held(index);
        };
        let link = match (frame.kind, frame.link) {
            (FrameKind::Keyframe, _) => return FrameSnapshot::of(frame),
            (FrameKind::Normal, _) | (_, None) => return self.held(index),
            (_, Some(link)) => link,
        };
        let (Some(prev), Some(next)) = (
            self.cell(link.prev_index).filter(|f| f.is_keyframe()),
            link.next_index.and_then(|n| self.cell(n)).filter(|f| f.is_keyframe()),
        ) else {
            debug_assert!(false, "tween cell {index} has stale links {link:?}");
            return self.held(index);
        };
        let next_index = link.next_index.unwrap_or(link.prev_index);
        let span = next_index.saturating_sub(link.prev_index).max(1) as f64;
        let t = index.saturating_sub(link.prev_index) as f64 / span;

        match frame.kind {
            FrameKind::Motion => FrameSnapshot {
                keys: blend_keys(&prev.keys, &next.keys, t),
                shapes: prev.shapes.clone(),
            },
            FrameKind::Shape => FrameSnapshot {
                keys: prev.keys.clone(),
                shapes: morph_shapes(&prev.shapes, &next.shapes, t),
            },
            FrameKind::Keyframe | FrameKind::Normal => FrameSnapshot::of(prev),
        }
    }

    fn held(&self, index: usize) -> FrameSnapshot {
        self.prev_keyframe(index)
            .and_then(|i| self.cell(i))
            .map(FrameSnapshot::of)
            .unwrap_or_default()
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Turn cell `index` into a keyframe holding what it currently shows.
    /// A keyframe dropped into a tween span splits it into two spans of
    /// the same kind. Returns false when `index` already is a keyframe.
    pub fn add_keyframe(&mut self, index: usize) -> bool {
        if self.is_keyframe(index) {
            return false;
        }
        let snapshot = self.get_frame(index);
        let span_kind = self.kind(index).unwrap_or(FrameKind::Normal);
        if index >= self.cells.len() {
            self.cells.resize(index + 1, None);
        }
        let shapes = snapshot
            .shapes
            .iter()
            .map(|s| s.variant(s.shape_index))
            .collect();
        self.cells[index] = Some(Frame::keyframe(snapshot.keys, shapes));

        if let Some(prev) = self.prev_keyframe(index.saturating_sub(1)).filter(|&p| p < index) {
            self.update_frame_next_and_prev(prev, span_kind);
        }
        self.update_frame_next_and_prev(index, span_kind);
        log::debug!("frame track: keyframe added at {index}");
        true
    }

    /// Write one child's keys into keyframe `index`. Returns the keys it
    /// replaced, or `None` when the cell is not a keyframe.
    pub fn set_keys(&mut self, index: usize, child: ObjectId, keys: ChildKeys) -> Option<Option<ChildKeys>> {
        let frame = self.keyframe_mut(index)?;
        Some(frame.keys.insert(child, keys))
    }

    /// Replace keyframe `index`'s shapes, returning the old list.
    pub fn set_shapes(&mut self, index: usize, shapes: Vec<Shape>) -> Option<Vec<Shape>> {
        let frame = self.keyframe_mut(index)?;
        Some(std::mem::replace(&mut frame.shapes, shapes))
    }

    fn keyframe_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.cells
            .get_mut(index)?
            .as_mut()
            .filter(|f| f.is_keyframe())
    }

    pub fn create_motion_tween(&mut self, index: usize) -> bool {
        self.create_tween(index, FrameKind::Motion)
    }

    pub fn create_shape_tween(&mut self, index: usize) -> bool {
        self.create_tween(index, FrameKind::Shape)
    }

    /// Tweens need a keyframe on both sides of `index`.
    fn create_tween(&mut self, index: usize, kind: FrameKind) -> bool {
        match (self.prev_keyframe(index), self.next_keyframe(index)) {
            (Some(_), Some(_)) => {
                self.update_frame_next_and_prev(index, kind);
                true
            }
            _ => {
                log::warn!("frame track: no keyframe pair around {index} for a {kind:?} tween");
                false
            }
        }
    }

    pub fn remove_tween(&mut self, index: usize) {
        self.update_frame_next_and_prev(index, FrameKind::Normal);
    }

    /// Relink every cell strictly between the keyframes enclosing `index`
    /// as `kind`. Without a following keyframe the run up to the end of the
    /// track becomes `Normal`; without a preceding one it is cleared.
    pub fn update_frame_next_and_prev(&mut self, index: usize, kind: FrameKind) {
        let next = self.next_keyframe(index);
        let end = next.unwrap_or(self.cells.len());
        self.relink(self.prev_keyframe(index), next, end, kind);
    }

    fn relink(&mut self, prev: Option<usize>, next: Option<usize>, end: usize, kind: FrameKind) {
        debug_assert!(kind != FrameKind::Keyframe);
        match prev {
            None => {
                for cell in &mut self.cells[..end] {
                    *cell = None;
                }
            }
            Some(p) => {
                let kind = if next.is_some() { kind } else { FrameKind::Normal };
                let link = TweenLink {
                    prev_index: p,
                    next_index: next,
                };
                for cell in &mut self.cells[p + 1..end] {
                    *cell = Some(Frame::linked(kind, link));
                }
            }
        }
        self.trim();
    }

    /// Delete cell `index` and re-derive what stands there from its
    /// neighbours: `Motion` if either is motion, else `Shape` if either is
    /// a shape tween, else `Normal` if both exist, else nothing.
    pub fn delete_frame(&mut self, index: usize) -> Option<Frame> {
        let removed = self.cells.get_mut(index)?.take()?;
        let left = index.checked_sub(1).and_then(|i| self.kind(i));
        let right = self.kind(index + 1);
        let either = |k: FrameKind| left == Some(k) || right == Some(k);

        let derived = if either(FrameKind::Motion) {
            Some(FrameKind::Motion)
        } else if either(FrameKind::Shape) {
            Some(FrameKind::Shape)
        } else if left.is_some() && right.is_some() {
            Some(FrameKind::Normal)
        } else {
            None
        };

        match derived {
            Some(kind) => self.update_frame_next_and_prev(index, kind),
            None if removed.is_keyframe() => {
                // Cells after the previous keyframe relink up to the next
                // keyframe, or up to the removed cell when none follows.
                // Without a previous keyframe they are cleared instead.
                let prev = self.prev_keyframe(index);
                let next = self.next_keyframe(index);
                let kind = index
                    .checked_sub(1)
                    .and_then(|i| self.kind(i))
                    .filter(|k| *k != FrameKind::Keyframe)
                    .unwrap_or(FrameKind::Normal);
                self.relink(prev, next, next.unwrap_or(index), kind);
            }
            None => self.trim(),
        }
        log::debug!("frame track: deleted {:?} at {index} ({derived:?})", removed.kind);
        Some(removed)
    }

    fn trim(&mut self) {
        while matches!(self.cells.last(), Some(None)) {
            self.cells.pop();
        }
    }
}

/// Blend every numeric key present on both sides; keys only in `a` are
/// held.
fn blend_keys(
    a: &HashMap<ObjectId, ChildKeys>,
    b: &HashMap<ObjectId, ChildKeys>,
    t: f64,
) -> HashMap<ObjectId, ChildKeys> {
    a.iter()
        .map(|(child, keys)| {
            let other = b.get(child);
            let blended = keys
                .iter()
                .map(|(k, &v)| {
                    let w = other.and_then(|o| o.get(k)).map_or(v, |&w| v + (w - v) * t);
                    (k.clone(), w)
                })
                .collect();
            (*child, blended)
        })
        .collect()
}

/// Morph shapes matched by `shape_id`; unmatched shapes contribute nothing.
pub fn morph_shapes(a: &[Shape], b: &[Shape], t: f64) -> Vec<Shape> {
    a.iter()
        .filter_map(|sa| {
            let sb = b.iter().find(|s| s.shape_id == sa.shape_id)?;
            Some(sa.lerp_shape(sb, t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use crate::model::Color;
    use kurbo::Point;
    use pretty_assertions::assert_eq;

    fn link(prev: usize, next: Option<usize>) -> Option<TweenLink> {
        Some(TweenLink {
            prev_index: prev,
            next_index: next,
        })
    }

    fn motion_2_to_8() -> LegacyFrameTrack {
        let mut track = LegacyFrameTrack::new();
        assert!(track.add_keyframe(2));
        assert!(track.add_keyframe(8));
        assert!(track.create_motion_tween(2));
        track
    }

    fn x_keys(x: f64) -> ChildKeys {
        ChildKeys::from([("x".to_string(), x)])
    }

    #[test]
    fn motion_tween_links_every_inner_cell() {
        let track = motion_2_to_8();
        for i in 3..=7 {
            let cell = track.cell(i).unwrap();
            assert_eq!(cell.kind, FrameKind::Motion, "cell {i}");
            assert_eq!(cell.link, link(2, Some(8)));
        }
        assert_eq!(track.kind(1), Some(FrameKind::Normal));
        assert_eq!(track.keyframe_indices(), vec![0, 2, 8]);
    }

    #[test]
    fn deleting_last_keyframe_relinks_to_normal() {
        let mut track = motion_2_to_8();
        let removed = track.delete_frame(8).unwrap();
        assert!(removed.is_keyframe());
        for i in 3..=7 {
            let cell = track.cell(i).unwrap();
            assert_eq!(cell.kind, FrameKind::Normal, "cell {i}");
            assert_eq!(cell.link, link(2, None));
        }
        assert_eq!(track.keyframe_indices(), vec![0, 2]);
    }

    #[test]
    fn deleting_inner_keyframe_extends_motion() {
        let mut track = motion_2_to_8();
        assert!(track.add_keyframe(12));
        track.delete_frame(8);
        for i in 3..=11 {
            let cell = track.cell(i).unwrap();
            assert_eq!(cell.kind, FrameKind::Motion, "cell {i}");
            assert_eq!(cell.link, link(2, Some(12)));
        }
    }

    #[test]
    fn deleting_isolated_cell_removes_it() {
        let mut track = LegacyFrameTrack::new();
        track.add_keyframe(3);
        track.delete_frame(3);
        assert_eq!(track.len(), 3);
        assert!(track.cell(3).is_none());
        assert_eq!(track.keyframe_indices(), vec![0]);
        assert_eq!(track.cell(2).unwrap().link, link(0, None));
    }

    #[test]
    fn deleting_first_keyframe_clears_up_to_next() {
        let mut track = LegacyFrameTrack::new();
        assert!(track.add_keyframe(4));
        assert_eq!(track.cell(2).unwrap().link, link(0, Some(4)));

        assert!(track.delete_frame(0).unwrap().is_keyframe());
        for i in 0..4 {
            assert!(track.cell(i).is_none(), "cell {i}");
        }
        assert_eq!(track.len(), 5);
        assert_eq!(track.keyframe_indices(), vec![4]);
    }

    #[test]
    fn motion_cells_blend_keys() {
        let mut track = motion_2_to_8();
        let hero = ObjectId::intern("hero");
        track.set_keys(2, hero, x_keys(0.0));
        track.set_keys(8, hero, x_keys(60.0));
        assert_eq!(track.get_frame(5).key(hero, "x"), Some(30.0));
        assert_eq!(track.get_frame(8).key(hero, "x"), Some(60.0));
        // Normal span before keyframe 2 holds keyframe 0, which has no keys.
        assert_eq!(track.get_frame(1).key(hero, "x"), None);
    }

    #[test]
    fn set_keys_rejects_tween_cells() {
        let mut track = motion_2_to_8();
        assert_eq!(track.set_keys(4, ObjectId::intern("hero"), x_keys(1.0)), None);
    }

    #[test]
    fn keyframe_inside_tween_splits_span() {
        let mut track = motion_2_to_8();
        assert!(track.add_keyframe(5));
        assert_eq!(track.cell(3).unwrap().link, link(2, Some(5)));
        assert_eq!(track.cell(6).unwrap().kind, FrameKind::Motion);
        assert_eq!(track.cell(6).unwrap().link, link(5, Some(8)));
    }

    #[test]
    fn tween_needs_two_keyframes() {
        let mut track = LegacyFrameTrack::new();
        track.add_keyframe(4);
        assert!(!track.create_shape_tween(4));
        assert!(track.create_shape_tween(0));
        assert_eq!(track.kind(2), Some(FrameKind::Shape));
        track.remove_tween(2);
        assert_eq!(track.kind(2), Some(FrameKind::Normal));
    }

    #[test]
    fn shape_tween_morphs_matched_shapes_only() {
        let mut track = LegacyFrameTrack::new();
        let outline = ObjectId::intern("outline");
        let mut a = Shape::from_curves(
            outline,
            vec![Curve::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Color::BLACK)],
        );
        a.stroke.line_width = 2.0;
        let mut b = a.variant(1);
        b.stroke.line_width = 6.0;
        let stray = Shape::from_curves(ObjectId::intern("stray"), a.curves().to_vec());

        track.set_shapes(0, vec![a, stray]);
        track.add_keyframe(4);
        track.set_shapes(4, vec![b]);
        assert!(track.create_shape_tween(0));

        let mid = track.get_frame(2);
        assert_eq!(mid.shapes.len(), 1);
        assert_eq!(mid.shapes[0].shape_id, outline);
        assert_eq!(mid.shapes[0].stroke.line_width, 4.0);
    }

    #[test]
    fn absent_cells_fall_back_to_previous_keyframe() {
        let mut track = LegacyFrameTrack::new();
        let hero = ObjectId::intern("hero");
        track.set_keys(0, hero, x_keys(7.0));
        assert_eq!(track.get_frame(40).key(hero, "x"), Some(7.0));
    }
}
