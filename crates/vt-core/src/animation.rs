//! Keyframes, per-parameter curves and the parameter-key → curve map.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    /// Keep the keyframe's value until the next keyframe.
    Hold,
}

/// The segment mode that starts at a keyframe is that keyframe's
/// `interpolation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub value: f64,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Keyframe {
    pub fn new(time: f64, value: f64, interpolation: Interpolation) -> Self {
        Self {
            time,
            value,
            interpolation,
        }
    }

    pub fn linear(time: f64, value: f64) -> Self {
        Self::new(time, value, Interpolation::Linear)
    }

    pub fn hold(time: f64, value: f64) -> Self {
        Self::new(time, value, Interpolation::Hold)
    }
}

// ─── ParameterCurve ─────────────────────────────────────────────────────

/// Time-sorted keyframes for one animatable parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterCurve {
    keyframes: Vec<Keyframe>,
}

impl ParameterCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Insert keeping time order. A keyframe at an already-used time goes
    /// after the existing ones, so it wins as the bracketing `prev`.
    pub fn add_keyframe(&mut self, kf: Keyframe) {
        let at = self.keyframes.partition_point(|k| k.time <= kf.time);
        self.keyframes.insert(at, kf);
        self.debug_check_sorted();
    }

    /// Remove the first keyframe equal to `kf`.
    pub fn remove_keyframe(&mut self, kf: &Keyframe) -> Option<Keyframe> {
        let at = self.keyframes.iter().position(|k| k == kf)?;
        Some(self.keyframes.remove(at))
    }

    /// Remove the last keyframe at exactly `time`.
    pub fn remove_at(&mut self, time: f64) -> Option<Keyframe> {
        let at = self.keyframes.iter().rposition(|k| k.time == time)?;
        Some(self.keyframes.remove(at))
    }

    pub fn keyframe_at(&self, time: f64) -> Option<&Keyframe> {
        self.keyframes.iter().rev().find(|k| k.time == time)
    }

    /// Change the segment mode of the keyframe at `time`, returning the
    /// previous mode.
    pub fn set_interpolation(&mut self, time: f64, mode: Interpolation) -> Option<Interpolation> {
        let kf = self.keyframes.iter_mut().rev().find(|k| k.time == time)?;
        Some(std::mem::replace(&mut kf.interpolation, mode))
    }

    /// `prev`: greatest time ≤ `time`. `next`: least time > `time`.
    pub fn bracket(&self, time: f64) -> (Option<&Keyframe>, Option<&Keyframe>) {
        let split = self.keyframes.partition_point(|k| k.time <= time);
        let prev = split.checked_sub(1).map(|i| &self.keyframes[i]);
        (prev, self.keyframes.get(split))
    }

    /// `None` without keyframes; clamp-extends past either end.
    pub fn interpolate(&self, time: f64) -> Option<f64> {
        match self.bracket(time) {
            (None, None) => None,
            (Some(k), None) | (None, Some(k)) => Some(k.value),
            (Some(prev), Some(next)) => Some(blend(prev, next, time)),
        }
    }

    fn debug_check_sorted(&self) {
        debug_assert!(
            self.keyframes.windows(2).all(|w| w[0].time <= w[1].time),
            "keyframes out of time order"
        );
    }
}

fn blend(prev: &Keyframe, next: &Keyframe, time: f64) -> f64 {
    match prev.interpolation {
        Interpolation::Hold => prev.value,
        Interpolation::Linear => {
            let span = next.time - prev.time;
            if span <= 0.0 {
                return prev.value;
            }
            prev.value + (next.value - prev.value) * (time - prev.time) / span
        }
    }
}

// ─── Parameter keys ─────────────────────────────────────────────────────

/// Builders for the parameter-key strings.
pub mod keys {
    use crate::id::ObjectId;

    /// Transform parameter names of an animated child.
    pub const TRANSFORM_PARAMS: [&str; 5] = ["x", "y", "rotation", "scale_x", "scale_y"];

    /// `"<child>.<param>"`
    pub fn child(child: ObjectId, param: &str) -> String {
        format!("{child}.{param}")
    }

    pub fn exists(shape_id: ObjectId) -> String {
        format!("shape.{shape_id}.exists")
    }

    pub fn z_order(shape_id: ObjectId) -> String {
        format!("shape.{shape_id}.zOrder")
    }

    pub fn shape_index(shape_id: ObjectId) -> String {
        format!("shape.{shape_id}.shapeIndex")
    }

    /// Split `"<child>.<param>"`. Shape keys yield `None`.
    pub fn parse_child(key: &str) -> Option<(&str, &str)> {
        if key.starts_with("shape.") {
            return None;
        }
        key.rsplit_once('.')
    }

    /// The shape id inside a `"shape.<id>.<param>"` key.
    pub fn parse_shape(key: &str) -> Option<(&str, &str)> {
        key.strip_prefix("shape.")?.rsplit_once('.')
    }
}

// ─── AnimationData ──────────────────────────────────────────────────────

/// Parameter key → curve, for one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationData {
    curves: BTreeMap<String, ParameterCurve>,
}

impl AnimationData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curve(&self, key: &str) -> Option<&ParameterCurve> {
        self.curves.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn add_keyframe(&mut self, key: &str, kf: Keyframe) {
        log::trace!("keyframe {key} @ {} = {}", kf.time, kf.value);
        self.curves.entry(key.to_string()).or_default().add_keyframe(kf);
    }

    /// Remove by identity. A curve left without keyframes is dropped.
    pub fn remove_keyframe(&mut self, key: &str, kf: &Keyframe) -> Option<Keyframe> {
        let curve = self.curves.get_mut(key)?;
        let removed = curve.remove_keyframe(kf);
        if curve.is_empty() {
            self.curves.remove(key);
        }
        removed
    }

    pub fn remove_keyframe_at(&mut self, key: &str, time: f64) -> Option<Keyframe> {
        let curve = self.curves.get_mut(key)?;
        let removed = curve.remove_at(time);
        if curve.is_empty() {
            self.curves.remove(key);
        }
        removed
    }

    pub fn set_interpolation(&mut self, key: &str, time: f64, mode: Interpolation) -> Option<Interpolation> {
        self.curves.get_mut(key)?.set_interpolation(time, mode)
    }

    pub fn interpolate(&self, key: &str, time: f64) -> Option<f64> {
        self.curves.get(key)?.interpolate(time)
    }

    pub fn insert_curve(&mut self, key: String, curve: ParameterCurve) -> Option<ParameterCurve> {
        if curve.is_empty() {
            return self.curves.remove(&key);
        }
        self.curves.insert(key, curve)
    }

    pub fn remove_curve(&mut self, key: &str) -> Option<ParameterCurve> {
        self.curves.remove(key)
    }

    /// Every curve whose key mentions `id` as a path segment.
    pub fn curves_for(&self, id: ObjectId) -> Vec<(String, ParameterCurve)> {
        self.curves
            .iter()
            .filter(|(k, _)| mentions(k, id))
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect()
    }

    /// Rename keys referencing `old` so they reference `new`. Returns the
    /// number of curves moved.
    pub fn remap_ids(&mut self, old: ObjectId, new: ObjectId) -> usize {
        let moved: Vec<String> = self.curves.keys().filter(|k| mentions(k, old)).cloned().collect();
        for key in &moved {
            if let Some(curve) = self.curves.remove(key) {
                self.curves.insert(rewrite(key, old, new), curve);
            }
        }
        moved.len()
    }

    /// Copy the curves referencing `old` under keys referencing `new`.
    pub fn copy_ids(&mut self, old: ObjectId, new: ObjectId) -> usize {
        let copies = self.curves_for(old);
        let n = copies.len();
        for (key, curve) in copies {
            self.curves.insert(rewrite(&key, old, new), curve);
        }
        n
    }
}

fn mentions(key: &str, id: ObjectId) -> bool {
    key.split('.').any(|seg| seg == id.as_str())
}

fn rewrite(key: &str, old: ObjectId, new: ObjectId) -> String {
    key.split('.')
        .map(|seg| if seg == old.as_str() { new.as_str() } else { seg })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ramp(mode: Interpolation) -> ParameterCurve {
        let mut c = ParameterCurve::new();
        c.add_keyframe(Keyframe::new(10.0, 100.0, Interpolation::Linear));
        c.add_keyframe(Keyframe::new(0.0, 0.0, mode));
        c
    }

    #[test]
    fn linear_midpoint() {
        assert_eq!(ramp(Interpolation::Linear).interpolate(5.0), Some(50.0));
    }

    #[test]
    fn hold_keeps_previous_value() {
        let c = ramp(Interpolation::Hold);
        assert_eq!(c.interpolate(5.0), Some(0.0));
        assert_eq!(c.interpolate(9.999), Some(0.0));
        assert_eq!(c.interpolate(10.0), Some(100.0));
    }

    #[test]
    fn clamps_outside_range() {
        let c = ramp(Interpolation::Linear);
        assert_eq!(c.interpolate(-3.0), Some(0.0));
        assert_eq!(c.interpolate(42.0), Some(100.0));
    }

    #[test]
    fn empty_curve_is_none() {
        assert_eq!(ParameterCurve::new().interpolate(1.0), None);
        assert_eq!(AnimationData::new().interpolate("missing.x", 1.0), None);
    }

    #[test]
    fn inserts_stay_sorted() {
        let mut c = ParameterCurve::new();
        for t in [5.0, 1.0, 9.0, 3.0, 5.0] {
            c.add_keyframe(Keyframe::linear(t, t * 2.0));
        }
        let times: Vec<f64> = c.keyframes().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0, 5.0, 9.0]);
    }

    #[test]
    fn later_duplicate_wins_as_prev() {
        let mut c = ParameterCurve::new();
        c.add_keyframe(Keyframe::hold(0.0, 1.0));
        c.add_keyframe(Keyframe::hold(0.0, 7.0));
        assert_eq!(c.interpolate(0.0), Some(7.0));
    }

    #[test]
    fn remove_by_identity() {
        let mut anim = AnimationData::new();
        let a = Keyframe::linear(0.0, 1.0);
        let b = Keyframe::linear(1.0, 2.0);
        anim.add_keyframe("c.x", a);
        anim.add_keyframe("c.x", b);
        assert_eq!(anim.remove_keyframe("c.x", &a), Some(a));
        assert_eq!(anim.remove_keyframe("c.x", &a), None);
        assert_eq!(anim.curve("c.x").map(|c| c.len()), Some(1));
        anim.remove_keyframe("c.x", &b);
        assert!(anim.curve("c.x").is_none());
    }

    #[test]
    fn set_interpolation_returns_previous() {
        let mut anim = AnimationData::new();
        anim.add_keyframe("c.x", Keyframe::linear(0.0, 0.0));
        anim.add_keyframe("c.x", Keyframe::linear(10.0, 10.0));
        let prev = anim.set_interpolation("c.x", 0.0, Interpolation::Hold);
        assert_eq!(prev, Some(Interpolation::Linear));
        assert_eq!(anim.interpolate("c.x", 5.0), Some(0.0));
        assert_eq!(anim.set_interpolation("c.x", 3.0, Interpolation::Hold), None);
    }

    #[test]
    fn remap_rewrites_child_and_shape_keys() {
        let old = ObjectId::intern("star");
        let new = ObjectId::intern("star-copy");
        let mut anim = AnimationData::new();
        anim.add_keyframe(&keys::child(old, "x"), Keyframe::linear(0.0, 3.0));
        anim.add_keyframe(&keys::z_order(old), Keyframe::hold(0.0, 1.0));
        anim.add_keyframe("other.x", Keyframe::linear(0.0, 9.0));

        assert_eq!(anim.remap_ids(old, new), 2);
        let names: Vec<&str> = anim.keys().collect();
        assert_eq!(names, vec!["other.x", "shape.star-copy.zOrder", "star-copy.x"]);
        assert_eq!(anim.interpolate("star-copy.x", 0.0), Some(3.0));
    }

    #[test]
    fn copy_keeps_original_keys() {
        let old = ObjectId::intern("petal");
        let new = ObjectId::intern("petal-2");
        let mut anim = AnimationData::new();
        anim.add_keyframe(&keys::exists(old), Keyframe::hold(0.0, 1.0));
        assert_eq!(anim.copy_ids(old, new), 1);
        assert_eq!(anim.interpolate(&keys::exists(old), 0.0), Some(1.0));
        assert_eq!(anim.interpolate(&keys::exists(new), 0.0), Some(1.0));
    }

    #[test]
    fn key_parsing() {
        assert_eq!(keys::parse_child("hero.x"), Some(("hero", "x")));
        assert_eq!(keys::parse_child("shape.s1.zOrder"), None);
        assert_eq!(keys::parse_shape("shape.s1.zOrder"), Some(("s1", "zOrder")));
    }
}
