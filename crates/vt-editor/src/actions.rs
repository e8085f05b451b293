//! The command catalogue.
//!
//! Every command is a serializable action record. `create` reads whatever
//! pre-state the rollback needs out of the document, so `execute` and
//! `rollback` depend only on the record and the ids it names. Edits that
//! allocate ids or cannot be inverted exactly carry full snapshots.

use crate::error::CommandError;
use crate::registry::CommandKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vt_core::animation::{Interpolation, Keyframe, keys};
use vt_core::curve::Curve;
use vt_core::document::Document;
use vt_core::frames::LegacyFrameTrack;
use vt_core::id::ObjectId;
use vt_core::layer::{Authority, Layer, RemovedShape};
use vt_core::shape::{Shape, SimplifyMode};

/// `create` / `execute` / `rollback` for one kind of edit.
pub trait Command: Serialize + DeserializeOwned {
    const KIND: CommandKind;

    /// What the caller supplies; the record adds captured pre-state.
    type Args;

    fn create(args: Self::Args, doc: &Document) -> Result<Self, CommandError>;

    /// Forward application. Applying an already-applied record is a no-op
    /// where that can be detected.
    fn execute(&self, doc: &mut Document) -> Result<(), CommandError>;

    /// Exact inverse of `execute`.
    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError>;
}

// ─── Lookup helpers ──────────────────────────────────────────────────────

fn layer(doc: &Document, id: ObjectId) -> Result<&Layer, CommandError> {
    doc.layer(id).ok_or(CommandError::MissingReference(id))
}

fn layer_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Layer, CommandError> {
    doc.layer_mut(id).ok_or(CommandError::MissingReference(id))
}

fn shape(doc: &Document, instance: ObjectId) -> Result<&Shape, CommandError> {
    doc.shape(instance).ok_or(CommandError::MissingReference(instance))
}

fn shape_mut(doc: &mut Document, instance: ObjectId) -> Result<&mut Shape, CommandError> {
    doc.shape_mut(instance).ok_or(CommandError::MissingReference(instance))
}

fn owner(doc: &Document, instance: ObjectId) -> Result<ObjectId, CommandError> {
    doc.shape_owner(instance).ok_or(CommandError::MissingReference(instance))
}

fn keyframe_at(layer: &Layer, key: &str, time: f64) -> Result<Keyframe, CommandError> {
    layer
        .animation
        .curve(key)
        .and_then(|c| c.keyframe_at(time))
        .copied()
        .ok_or_else(|| CommandError::NoKeyframe {
            key: key.to_string(),
            time,
        })
}

// ─── Shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddShapeArgs {
    pub layer: ObjectId,
    pub shape: Shape,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddShape {
    layer: ObjectId,
    shape: Shape,
    time: f64,
    /// zOrder keyframe written for a new shape id.
    z_order: Option<f64>,
}

impl Command for AddShape {
    const KIND: CommandKind = CommandKind::AddShape;
    type Args = AddShapeArgs;

    fn create(args: AddShapeArgs, doc: &Document) -> Result<Self, CommandError> {
        let l = layer(doc, args.layer)?;
        let z_order = l
            .animation
            .curve(&keys::z_order(args.shape.shape_id))
            .is_none()
            .then(|| l.next_z_order());
        Ok(Self {
            layer: args.layer,
            shape: args.shape,
            time: args.time,
            z_order,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        if l.shape(self.shape.instance_id).is_some() {
            log::debug!("add shape: {} already on layer", self.shape.instance_id);
            return Ok(());
        }
        l.add_shape(self.shape.clone(), self.time);
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        let instance = self.shape.instance_id;
        l.remove_shape(instance)
            .ok_or(CommandError::MissingReference(instance))?;
        let id = self.shape.shape_id;
        l.animation
            .remove_keyframe(&keys::exists(id), &Keyframe::hold(self.time, 1.0));
        l.animation.remove_keyframe(
            &keys::shape_index(id),
            &Keyframe::hold(self.time, f64::from(self.shape.shape_index)),
        );
        if let Some(z) = self.z_order {
            l.animation
                .remove_keyframe(&keys::z_order(id), &Keyframe::hold(self.time, z));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteShape {
    layer: ObjectId,
    instance: ObjectId,
    removed: RemovedShape,
}

impl Command for DeleteShape {
    const KIND: CommandKind = CommandKind::DeleteShape;
    type Args = ObjectId;

    fn create(instance: ObjectId, doc: &Document) -> Result<Self, CommandError> {
        let layer_id = owner(doc, instance)?;
        let mut scratch = layer(doc, layer_id)?.clone();
        let removed = scratch
            .take_shape(instance)
            .ok_or(CommandError::MissingReference(instance))?;
        Ok(Self {
            layer: layer_id,
            instance,
            removed,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?
            .take_shape(self.instance)
            .ok_or(CommandError::MissingReference(self.instance))?;
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        if l.shape(self.instance).is_none() {
            l.restore_shape(self.removed.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateShapeArgs {
    pub instance: ObjectId,
    pub dx: f64,
    pub dy: f64,
}

/// Rollback restores the captured curves; `x + dx - dx` is not exact in
/// floating point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateShape {
    instance: ObjectId,
    dx: f64,
    dy: f64,
    before: Vec<Curve>,
}

impl Command for TranslateShape {
    const KIND: CommandKind = CommandKind::TranslateShape;
    type Args = TranslateShapeArgs;

    fn create(args: TranslateShapeArgs, doc: &Document) -> Result<Self, CommandError> {
        let before = shape(doc, args.instance)?.curves().to_vec();
        Ok(Self {
            instance: args.instance,
            dx: args.dx,
            dy: args.dy,
            before,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        shape_mut(doc, self.instance)?.translate(self.dx, self.dy);
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        shape_mut(doc, self.instance)?.set_curves(self.before.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditCurveArgs {
    pub instance: ObjectId,
    pub index: usize,
    pub curve: Curve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditCurve {
    instance: ObjectId,
    index: usize,
    curve: Curve,
    previous: Curve,
}

impl Command for EditCurve {
    const KIND: CommandKind = CommandKind::EditCurve;
    type Args = EditCurveArgs;

    fn create(args: EditCurveArgs, doc: &Document) -> Result<Self, CommandError> {
        let previous = shape(doc, args.instance)?
            .curves()
            .get(args.index)
            .copied()
            .ok_or(CommandError::CurveIndex {
                id: args.instance,
                index: args.index,
            })?;
        Ok(Self {
            instance: args.instance,
            index: args.index,
            curve: args.curve,
            previous,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.put(doc, self.curve)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.put(doc, self.previous)
    }
}

impl EditCurve {
    fn put(&self, doc: &mut Document, curve: Curve) -> Result<(), CommandError> {
        shape_mut(doc, self.instance)?
            .replace_curve(self.index, curve)
            .map(drop)
            .ok_or(CommandError::CurveIndex {
                id: self.instance,
                index: self.index,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifyShapeArgs {
    pub instance: ObjectId,
    pub mode: SimplifyMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifyShape {
    instance: ObjectId,
    mode: SimplifyMode,
    before: Vec<Curve>,
}

impl Command for SimplifyShape {
    const KIND: CommandKind = CommandKind::SimplifyShape;
    type Args = SimplifyShapeArgs;

    fn create(args: SimplifyShapeArgs, doc: &Document) -> Result<Self, CommandError> {
        let before = shape(doc, args.instance)?.curves().to_vec();
        Ok(Self {
            instance: args.instance,
            mode: args.mode,
            before,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        let cfg = doc.config().clone();
        shape_mut(doc, self.instance)?.simplify_with(self.mode, &cfg);
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        shape_mut(doc, self.instance)?.set_curves(self.before.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateShape {
    layer: ObjectId,
    source: ObjectId,
    shape_id: ObjectId,
    instances: Vec<ObjectId>,
}

impl DuplicateShape {
    /// Instance ids of the copies, in layer order.
    pub fn copies(&self) -> &[ObjectId] {
        &self.instances
    }
}

impl Command for DuplicateShape {
    const KIND: CommandKind = CommandKind::DuplicateShape;
    type Args = ObjectId;

    fn create(source: ObjectId, doc: &Document) -> Result<Self, CommandError> {
        let layer_id = owner(doc, source)?;
        let l = layer(doc, layer_id)?;
        let old = shape(doc, source)?.shape_id;
        let instances = l.variants(old).map(|_| ObjectId::random()).collect();
        Ok(Self {
            layer: layer_id,
            source,
            shape_id: ObjectId::random(),
            instances,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        if self.instances.iter().any(|id| l.shape(*id).is_some()) {
            return Ok(());
        }
        l.duplicate_shape_with(self.source, self.shape_id, &self.instances)
            .ok_or(CommandError::MissingReference(self.source))?;
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        for id in &self.instances {
            l.remove_shape(*id);
        }
        for (key, _) in l.animation.curves_for(self.shape_id) {
            l.animation.remove_curve(&key);
        }
        Ok(())
    }
}

// ─── Keyframes ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddKeyframeArgs {
    pub layer: ObjectId,
    pub key: String,
    pub keyframe: Keyframe,
}

/// Rollback removes the keyframe by identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddKeyframe {
    layer: ObjectId,
    key: String,
    keyframe: Keyframe,
    authority: Option<Authority>,
}

impl Command for AddKeyframe {
    const KIND: CommandKind = CommandKind::AddKeyframe;
    type Args = AddKeyframeArgs;

    fn create(args: AddKeyframeArgs, doc: &Document) -> Result<Self, CommandError> {
        let authority = layer(doc, args.layer)?.explicit_authority(&args.key);
        Ok(Self {
            layer: args.layer,
            key: args.key,
            keyframe: args.keyframe,
            authority,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?.add_curve_keyframe(&self.key, self.keyframe);
        Ok(())
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        let l = layer_mut(doc, self.layer)?;
        l.set_authority(&self.key, self.authority);
        l.animation
            .remove_keyframe(&self.key, &self.keyframe)
            .map(drop)
            .ok_or_else(|| CommandError::NoKeyframe {
                key: self.key.clone(),
                time: self.keyframe.time,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRef {
    pub layer: ObjectId,
    pub key: String,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveKeyframe {
    layer: ObjectId,
    key: String,
    removed: Keyframe,
}

impl Command for RemoveKeyframe {
    const KIND: CommandKind = CommandKind::RemoveKeyframe;
    type Args = KeyframeRef;

    fn create(args: KeyframeRef, doc: &Document) -> Result<Self, CommandError> {
        let removed = keyframe_at(layer(doc, args.layer)?, &args.key, args.time)?;
        Ok(Self {
            layer: args.layer,
            key: args.key,
            removed,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?
            .animation
            .remove_keyframe(&self.key, &self.removed)
            .map(drop)
            .ok_or_else(|| CommandError::NoKeyframe {
                key: self.key.clone(),
                time: self.removed.time,
            })
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?
            .animation
            .add_keyframe(&self.key, self.removed);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetInterpolationArgs {
    pub at: KeyframeRef,
    pub mode: Interpolation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetKeyframeInterpolation {
    layer: ObjectId,
    key: String,
    time: f64,
    mode: Interpolation,
    previous: Interpolation,
}

impl Command for SetKeyframeInterpolation {
    const KIND: CommandKind = CommandKind::SetKeyframeInterpolation;
    type Args = SetInterpolationArgs;

    fn create(args: SetInterpolationArgs, doc: &Document) -> Result<Self, CommandError> {
        let KeyframeRef { layer: layer_id, key, time } = args.at;
        let previous = keyframe_at(layer(doc, layer_id)?, &key, time)?.interpolation;
        Ok(Self {
            layer: layer_id,
            key,
            time,
            mode: args.mode,
            previous,
        })
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.set(doc, self.mode)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.set(doc, self.previous)
    }
}

impl SetKeyframeInterpolation {
    fn set(&self, doc: &mut Document, mode: Interpolation) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?
            .animation
            .set_interpolation(&self.key, self.time, mode)
            .map(drop)
            .ok_or_else(|| CommandError::NoKeyframe {
                key: self.key.clone(),
                time: self.time,
            })
    }
}

// ─── Legacy frame track ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub layer: ObjectId,
    pub index: usize,
}

/// Track edits relink cells and allocate frame ids, so the record holds
/// the whole track before and after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEdit {
    layer: ObjectId,
    index: usize,
    before: LegacyFrameTrack,
    after: LegacyFrameTrack,
}

impl TrackEdit {
    fn capture(
        at: FrameRef,
        doc: &Document,
        edit: impl FnOnce(&mut LegacyFrameTrack, usize) -> bool,
    ) -> Result<Self, CommandError> {
        let before = layer(doc, at.layer)?.frames.clone();
        let mut after = before.clone();
        if !edit(&mut after, at.index) {
            log::debug!("frame edit at {} on {} changed nothing", at.index, at.layer);
        }
        Ok(Self {
            layer: at.layer,
            index: at.index,
            before,
            after,
        })
    }

    fn apply(&self, doc: &mut Document, track: &LegacyFrameTrack) -> Result<(), CommandError> {
        layer_mut(doc, self.layer)?.frames = track.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddFrameKeyframe(TrackEdit);

impl Command for AddFrameKeyframe {
    const KIND: CommandKind = CommandKind::AddFrameKeyframe;
    type Args = FrameRef;

    fn create(at: FrameRef, doc: &Document) -> Result<Self, CommandError> {
        TrackEdit::capture(at, doc, LegacyFrameTrack::add_keyframe).map(Self)
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.after)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.before)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateMotionTween(TrackEdit);

impl Command for CreateMotionTween {
    const KIND: CommandKind = CommandKind::CreateMotionTween;
    type Args = FrameRef;

    fn create(at: FrameRef, doc: &Document) -> Result<Self, CommandError> {
        TrackEdit::capture(at, doc, LegacyFrameTrack::create_motion_tween).map(Self)
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.after)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.before)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateShapeTween(TrackEdit);

impl Command for CreateShapeTween {
    const KIND: CommandKind = CommandKind::CreateShapeTween;
    type Args = FrameRef;

    fn create(at: FrameRef, doc: &Document) -> Result<Self, CommandError> {
        TrackEdit::capture(at, doc, LegacyFrameTrack::create_shape_tween).map(Self)
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.after)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.before)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteFrame(TrackEdit);

impl Command for DeleteFrame {
    const KIND: CommandKind = CommandKind::DeleteFrame;
    type Args = FrameRef;

    fn create(at: FrameRef, doc: &Document) -> Result<Self, CommandError> {
        TrackEdit::capture(at, doc, |track, index| track.delete_frame(index).is_some()).map(Self)
    }

    fn execute(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.after)
    }

    fn rollback(&self, doc: &mut Document) -> Result<(), CommandError> {
        self.0.apply(doc, &self.0.before)
    }
}
