//! Layer: shapes, animated children and both animation representations.
//!
//! Parameter curves (`AnimationData`) and the legacy frame track coexist.
//! Which one a child transform key is read from is recorded per key in
//! `authority`; keys never written through the curve side stay
//! frame-authoritative. Shape visibility, paint order and variant
//! selection are driven by the curve side.

use crate::animation::{AnimationData, Interpolation, Keyframe, ParameterCurve, keys};
use crate::frames::{ChildKeys, FrameKind, FrameSnapshot, LegacyFrameTrack};
use crate::id::ObjectId;
use crate::shape::Shape;
use kurbo::Affine;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

// ─── Transform ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Transform {
    pub fn get(&self, param: &str) -> Option<f64> {
        match param {
            "x" => Some(self.x),
            "y" => Some(self.y),
            "rotation" => Some(self.rotation),
            "scale_x" => Some(self.scale_x),
            "scale_y" => Some(self.scale_y),
            _ => None,
        }
    }

    pub fn set(&mut self, param: &str, value: f64) -> bool {
        let slot = match param {
            "x" => &mut self.x,
            "y" => &mut self.y,
            "rotation" => &mut self.rotation,
            "scale_x" => &mut self.scale_x,
            "scale_y" => &mut self.scale_y,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn to_keys(&self) -> ChildKeys {
        keys::TRANSFORM_PARAMS
            .iter()
            .filter_map(|p| Some((p.to_string(), self.get(p)?)))
            .collect()
    }

    pub fn to_affine(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// An animated child object placed on the layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
}

impl Child {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            name: String::new(),
            transform: Transform::default(),
        }
    }
}

/// Which representation a parameter key is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Curves,
    Frames,
}

// ─── Shape-variant selection ─────────────────────────────────────────────

/// One entry of the variant-selection result.
#[derive(Debug, Clone, Copy)]
pub enum VisibleShape<'a> {
    /// A concrete, directly editable instance.
    Instance { shape: &'a Shape, z_order: f64 },
    /// Mid-morph between two variants; paint-only.
    Morph {
        from: &'a Shape,
        to: &'a Shape,
        t: f64,
        z_order: f64,
    },
}

impl<'a> VisibleShape<'a> {
    pub fn z_order(&self) -> f64 {
        match self {
            VisibleShape::Instance { z_order, .. } | VisibleShape::Morph { z_order, .. } => *z_order,
        }
    }

    pub fn shape_id(&self) -> ObjectId {
        match self {
            VisibleShape::Instance { shape, .. } => shape.shape_id,
            VisibleShape::Morph { from, .. } => from.shape_id,
        }
    }

    /// Borrow an instance or synthesize the morph outline.
    pub fn resolve(&self) -> Cow<'a, Shape> {
        match *self {
            VisibleShape::Instance { shape, .. } => Cow::Borrowed(shape),
            VisibleShape::Morph { from, to, t, .. } => Cow::Owned(from.lerp_shape(to, t)),
        }
    }
}

/// A shape taken out of a layer together with the curves that only it used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedShape {
    pub position: usize,
    pub shape: Shape,
    pub curves: Vec<(String, ParameterCurve)>,
}

// ─── Layer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub animation: AnimationData,
    #[serde(default)]
    pub frames: LegacyFrameTrack,
    #[serde(default)]
    authority: BTreeMap<String, Authority>,
}

fn default_visible() -> bool {
    true
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self::with_id(ObjectId::with_prefix("layer"), name)
    }

    pub fn with_id(id: ObjectId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            visible: true,
            children: Vec::new(),
            shapes: Vec::new(),
            animation: AnimationData::new(),
            frames: LegacyFrameTrack::new(),
            authority: BTreeMap::new(),
        }
    }

    // ─── Authority ───────────────────────────────────────────────────────

    pub fn authority(&self, key: &str) -> Authority {
        self.authority.get(key).copied().unwrap_or(Authority::Frames)
    }

    /// The explicitly recorded authority, if any.
    pub fn explicit_authority(&self, key: &str) -> Option<Authority> {
        self.authority.get(key).copied()
    }

    /// Set or clear (`None`) an explicit authority, returning the old entry.
    pub fn set_authority(&mut self, key: &str, authority: Option<Authority>) -> Option<Authority> {
        match authority {
            Some(a) => self.authority.insert(key.to_string(), a),
            None => self.authority.remove(key),
        }
    }

    /// Write a keyframe on the curve side and make the key
    /// curve-authoritative. Returns the previous explicit authority.
    pub fn add_curve_keyframe(&mut self, key: &str, kf: Keyframe) -> Option<Authority> {
        self.animation.add_keyframe(key, kf);
        self.set_authority(key, Some(Authority::Curves))
    }

    // ─── Children ────────────────────────────────────────────────────────

    pub fn child(&self, id: ObjectId) -> Option<&Child> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn child_mut(&mut self, id: ObjectId) -> Option<&mut Child> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    pub fn add_child(&mut self, child: Child) {
        self.children.push(child);
    }

    /// Transform of `child` at `time`, each component read from the
    /// representation that is authoritative for it. Components with no
    /// animation fall back to the child's base transform.
    pub fn child_transform(&self, child: ObjectId, time: f64, frame_duration: f64) -> Option<Transform> {
        let base = self.child(child)?.transform;
        let mut out = base;
        let mut snapshot: Option<FrameSnapshot> = None;
        for param in keys::TRANSFORM_PARAMS {
            let key = keys::child(child, param);
            let value = match self.authority(&key) {
                Authority::Curves => self.animation.interpolate(&key, time),
                Authority::Frames => snapshot
                    .get_or_insert_with(|| self.frames.get_frame(frame_index(time, frame_duration)))
                    .key(child, param),
            };
            if let Some(v) = value {
                out.set(param, v);
            }
        }
        Some(out)
    }

    /// Copy a child and every curve keyed on it under a fresh id.
    pub fn duplicate_child(&mut self, id: ObjectId) -> Option<ObjectId> {
        let mut copy = self.child(id)?.clone();
        copy.id = ObjectId::random();
        let copied: Vec<String> = self
            .animation
            .curves_for(id)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        self.animation.copy_ids(id, copy.id);
        for key in copied {
            if let Some((_, param)) = keys::parse_child(&key)
                && let Some(authority) = self.authority.get(&key).copied()
            {
                self.authority.insert(keys::child(copy.id, param), authority);
            }
        }
        let new_id = copy.id;
        self.children.push(copy);
        Some(new_id)
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    pub fn shape(&self, instance_id: ObjectId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.instance_id == instance_id)
    }

    pub fn shape_mut(&mut self, instance_id: ObjectId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.instance_id == instance_id)
    }

    /// Every variant sharing `shape_id`, in layer order.
    pub fn variants(&self, shape_id: ObjectId) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(move |s| s.shape_id == shape_id)
    }

    /// One past the highest z-order any shape was given.
    pub fn next_z_order(&self) -> f64 {
        self.animation
            .keys()
            .filter(|k| keys::parse_shape(k).is_some_and(|(_, p)| p == "zOrder"))
            .filter_map(|k| self.animation.curve(k))
            .flat_map(|c| c.keyframes().iter().map(|kf| kf.value))
            .reduce(f64::max)
            .map_or(0.0, |z| z + 1.0)
    }

    /// Add an instance and the keyframes that make it visible from `time`:
    /// `exists = 1`, its `shapeIndex`, and a fresh `zOrder` for a new
    /// `shape_id`. Returns the keyframes written.
    pub fn add_shape(&mut self, shape: Shape, time: f64) -> Vec<(String, Keyframe)> {
        let id = shape.shape_id;
        let mut added = vec![
            (keys::exists(id), Keyframe::hold(time, 1.0)),
            (keys::shape_index(id), Keyframe::hold(time, f64::from(shape.shape_index))),
        ];
        if self.animation.curve(&keys::z_order(id)).is_none() {
            added.push((keys::z_order(id), Keyframe::hold(time, self.next_z_order())));
        }
        for (key, kf) in &added {
            self.animation.add_keyframe(key, *kf);
        }
        log::debug!("layer {}: added shape {} ({id})", self.id, shape.instance_id);
        self.shapes.push(shape);
        added
    }

    /// Remove the instance only; its curves stay.
    pub fn remove_shape(&mut self, instance_id: ObjectId) -> Option<Shape> {
        let at = self.shapes.iter().position(|s| s.instance_id == instance_id)?;
        Some(self.shapes.remove(at))
    }

    /// Remove the instance and, if it was the last variant of its
    /// `shape_id`, the `shape.<id>.*` curves too.
    pub fn take_shape(&mut self, instance_id: ObjectId) -> Option<RemovedShape> {
        let position = self.shapes.iter().position(|s| s.instance_id == instance_id)?;
        let shape = self.shapes.remove(position);
        let mut curves = Vec::new();
        if self.variants(shape.shape_id).next().is_none() {
            curves = self.animation.curves_for(shape.shape_id);
            for (key, _) in &curves {
                self.animation.remove_curve(key);
            }
        }
        Some(RemovedShape {
            position,
            shape,
            curves,
        })
    }

    /// Exact inverse of `take_shape`.
    pub fn restore_shape(&mut self, removed: RemovedShape) {
        let at = removed.position.min(self.shapes.len());
        self.shapes.insert(at, removed.shape);
        for (key, curve) in removed.curves {
            self.animation.insert_curve(key, curve);
        }
    }

    /// Copy every variant of `instance_id`'s shape under a new `shape_id`,
    /// together with its curves. Returns the new instance ids.
    pub fn duplicate_shape(&mut self, instance_id: ObjectId) -> Option<Vec<ObjectId>> {
        let count = self.variants(self.shape(instance_id)?.shape_id).count();
        let ids: Vec<ObjectId> = (0..count).map(|_| ObjectId::random()).collect();
        self.duplicate_shape_with(instance_id, ObjectId::random(), &ids)
    }

    /// `duplicate_shape` with caller-chosen ids, one per variant in layer
    /// order. Returns `None` when the id count does not match.
    pub fn duplicate_shape_with(
        &mut self,
        instance_id: ObjectId,
        shape_id: ObjectId,
        instance_ids: &[ObjectId],
    ) -> Option<Vec<ObjectId>> {
        let old = self.shape(instance_id)?.shape_id;
        let copies: Vec<Shape> = self
            .variants(old)
            .zip(instance_ids)
            .map(|(s, &id)| {
                let mut c = s.clone();
                c.shape_id = shape_id;
                c.instance_id = id;
                c
            })
            .collect();
        if copies.len() != self.variants(old).count() || copies.len() != instance_ids.len() {
            log::warn!("layer {}: duplicate of {old} got {} ids", self.id, instance_ids.len());
            return None;
        }
        self.shapes.extend(copies);
        self.animation.copy_ids(old, shape_id);
        Some(instance_ids.to_vec())
    }

    // ─── Variant selection ───────────────────────────────────────────────

    /// Visible shapes at `time`, back to front.
    ///
    /// A `shape_id` group is visible when its `exists` curve interpolates
    /// to a positive value. Without `shapeIndex` keys variant 0 is shown.
    /// Within half a frame of a `shapeIndex` keyframe, or on a `Hold`
    /// segment, the keyed variant is shown; on a `Linear` segment between
    /// two different variants the result is a `Morph`.
    pub fn visible_shapes(&self, time: f64, frame_duration: f64) -> Vec<VisibleShape<'_>> {
        let half_frame = frame_duration / 2.0;
        let mut seen: Vec<ObjectId> = Vec::new();
        let mut out = Vec::new();

        for shape in &self.shapes {
            let id = shape.shape_id;
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);

            let exists = self.animation.interpolate(&keys::exists(id), time);
            if !exists.is_some_and(|v| v > 0.0) {
                continue;
            }
            let z_order = self.animation.interpolate(&keys::z_order(id), time).unwrap_or(0.0);
            let variant = move |index: f64| self.variant_at(id, index);

            let entry = match self.animation.curve(&keys::shape_index(id)).map(|c| c.bracket(time)) {
                None | Some((None, None)) => variant(0.0).map(|shape| VisibleShape::Instance { shape, z_order }),
                Some((Some(k), None)) | Some((None, Some(k))) => {
                    variant(k.value).map(|shape| VisibleShape::Instance { shape, z_order })
                }
                Some((Some(prev), Some(next))) => {
                    let near_prev = time - prev.time <= half_frame;
                    let near_next = next.time - time <= half_frame;
                    let from = variant(prev.value);
                    let to = variant(next.value);
                    if near_next && !near_prev {
                        to.map(|shape| VisibleShape::Instance { shape, z_order })
                    } else if near_prev || prev.interpolation == Interpolation::Hold {
                        from.map(|shape| VisibleShape::Instance { shape, z_order })
                    } else {
                        match (from, to) {
                            (Some(a), Some(b)) if a.instance_id != b.instance_id => {
                                let t = (time - prev.time) / (next.time - prev.time);
                                Some(VisibleShape::Morph {
                                    from: a,
                                    to: b,
                                    t,
                                    z_order,
                                })
                            }
                            (Some(shape), _) | (None, Some(shape)) => {
                                Some(VisibleShape::Instance { shape, z_order })
                            }
                            (None, None) => None,
                        }
                    }
                }
            };
            out.extend(entry);
        }

        out.sort_by(|a, b| a.z_order().total_cmp(&b.z_order()));
        out
    }

    /// Visible instances only; a shape mid-morph has nothing to edit.
    pub fn editable_shapes(&self, time: f64, frame_duration: f64) -> Vec<&Shape> {
        self.visible_shapes(time, frame_duration)
            .into_iter()
            .filter_map(|v| match v {
                VisibleShape::Instance { shape, .. } => Some(shape),
                VisibleShape::Morph { .. } => None,
            })
            .collect()
    }

    /// Visible shapes with morphs materialized, back to front.
    pub fn resolve_for_paint(&self, time: f64, frame_duration: f64) -> Vec<(Cow<'_, Shape>, f64)> {
        self.visible_shapes(time, frame_duration)
            .iter()
            .map(|v| (v.resolve(), v.z_order()))
            .collect()
    }

    fn variant_at(&self, shape_id: ObjectId, index: f64) -> Option<&Shape> {
        let wanted = index.round().max(0.0) as u32;
        self.variants(shape_id).find(|s| s.shape_index == wanted)
    }

    // ─── Migration ───────────────────────────────────────────────────────

    /// Content of the legacy track at `time`.
    pub fn legacy_snapshot(&self, time: f64, frame_duration: f64) -> FrameSnapshot {
        self.frames.get_frame(frame_index(time, frame_duration))
    }

    /// Copy the legacy track's keyframes onto the curve side.
    ///
    /// Transform keys become curve keyframes at `index * frame_duration`,
    /// linear when a motion tween follows and hold otherwise; those keys
    /// become curve-authoritative. Keyframe shapes become variants with
    /// `exists`/`zOrder`/`shapeIndex` keys. Returns the keyframes written.
    pub fn migrate_frames_to_curves(&mut self, frame_duration: f64) -> usize {
        let mut written = 0;
        let mut present: Vec<ObjectId> = Vec::new();
        let indices = self.frames.keyframe_indices();

        for &i in &indices {
            let Some(cell) = self.frames.cell(i).cloned() else {
                continue;
            };
            let time = i as f64 * frame_duration;
            let follower = self.frames.kind(i + 1);
            let motion = if follower == Some(FrameKind::Motion) {
                Interpolation::Linear
            } else {
                Interpolation::Hold
            };
            let morph = if follower == Some(FrameKind::Shape) {
                Interpolation::Linear
            } else {
                Interpolation::Hold
            };

            let mut children: Vec<(&ObjectId, &ChildKeys)> = cell.keys.iter().collect();
            children.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
            for (child, params) in children {
                for (param, &value) in params {
                    let key = keys::child(*child, param);
                    self.add_curve_keyframe(&key, Keyframe::new(time, value, motion));
                    written += 1;
                }
            }

            let mut here = Vec::with_capacity(cell.shapes.len());
            for (z, shape) in cell.shapes.iter().enumerate() {
                let id = shape.shape_id;
                let index = self.variants(id).count() as u32;
                self.shapes.push(shape.variant(index));
                self.animation.add_keyframe(&keys::exists(id), Keyframe::hold(time, 1.0));
                self.animation.add_keyframe(&keys::z_order(id), Keyframe::hold(time, z as f64));
                self.animation
                    .add_keyframe(&keys::shape_index(id), Keyframe::new(time, f64::from(index), morph));
                written += 3;
                here.push(id);
            }
            for gone in present.iter().filter(|id| !here.contains(id)) {
                self.animation.add_keyframe(&keys::exists(*gone), Keyframe::hold(time, 0.0));
                written += 1;
            }
            present = here;
        }
        log::debug!(
            "layer {}: migrated {} keyframe cells ({written} curve keyframes)",
            self.id,
            indices.len()
        );
        written
    }
}

/// Frame cell shown at `time`.
pub fn frame_index(time: f64, frame_duration: f64) -> usize {
    if frame_duration <= 0.0 || !time.is_finite() {
        return 0;
    }
    (time / frame_duration + 1e-9).floor().max(0.0) as usize
}

/// Group instances by shape id, preserving first appearance.
pub fn group_by_shape_id(shapes: &[Shape]) -> Vec<(ObjectId, Vec<&Shape>)> {
    let mut order: Vec<ObjectId> = Vec::new();
    let mut groups: HashMap<ObjectId, Vec<&Shape>> = HashMap::new();
    for s in shapes {
        groups
            .entry(s.shape_id)
            .or_insert_with(|| {
                order.push(s.shape_id);
                Vec::new()
            })
            .push(s);
    }
    order
        .into_iter()
        .filter_map(|id| Some((id, groups.remove(&id)?)))
        .collect()
}
