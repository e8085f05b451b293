//! Closed command-kind enum and dispatch from logged records.

use crate::actions::*;
use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vt_core::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    AddShape,
    DeleteShape,
    TranslateShape,
    EditCurve,
    SimplifyShape,
    AddKeyframe,
    RemoveKeyframe,
    SetKeyframeInterpolation,
    AddFrameKeyframe,
    CreateMotionTween,
    CreateShapeTween,
    DeleteFrame,
    DuplicateShape,
}

impl CommandKind {
    /// Human-readable label for history menus.
    pub fn label(self) -> &'static str {
        match self {
            CommandKind::AddShape => "Add shape",
            CommandKind::DeleteShape => "Delete shape",
            CommandKind::TranslateShape => "Move shape",
            CommandKind::EditCurve => "Edit curve",
            CommandKind::SimplifyShape => "Simplify shape",
            CommandKind::AddKeyframe => "Add keyframe",
            CommandKind::RemoveKeyframe => "Remove keyframe",
            CommandKind::SetKeyframeInterpolation => "Set interpolation",
            CommandKind::AddFrameKeyframe => "Insert keyframe",
            CommandKind::CreateMotionTween => "Create motion tween",
            CommandKind::CreateShapeTween => "Create shape tween",
            CommandKind::DeleteFrame => "Delete frame",
            CommandKind::DuplicateShape => "Duplicate shape",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Decode `action` as `kind` and apply it.
pub fn execute(kind: CommandKind, action: &Value, doc: &mut Document) -> Result<(), CommandError> {
    dispatch(kind, action, doc, Direction::Forward)
}

/// Decode `action` as `kind` and undo it.
pub fn rollback(kind: CommandKind, action: &Value, doc: &mut Document) -> Result<(), CommandError> {
    dispatch(kind, action, doc, Direction::Backward)
}

fn dispatch(kind: CommandKind, action: &Value, doc: &mut Document, dir: Direction) -> Result<(), CommandError> {
    match kind {
        CommandKind::AddShape => run::<AddShape>(action, doc, dir),
        CommandKind::DeleteShape => run::<DeleteShape>(action, doc, dir),
        CommandKind::TranslateShape => run::<TranslateShape>(action, doc, dir),
        CommandKind::EditCurve => run::<EditCurve>(action, doc, dir),
        CommandKind::SimplifyShape => run::<SimplifyShape>(action, doc, dir),
        CommandKind::AddKeyframe => run::<AddKeyframe>(action, doc, dir),
        CommandKind::RemoveKeyframe => run::<RemoveKeyframe>(action, doc, dir),
        CommandKind::SetKeyframeInterpolation => run::<SetKeyframeInterpolation>(action, doc, dir),
        CommandKind::AddFrameKeyframe => run::<AddFrameKeyframe>(action, doc, dir),
        CommandKind::CreateMotionTween => run::<CreateMotionTween>(action, doc, dir),
        CommandKind::CreateShapeTween => run::<CreateShapeTween>(action, doc, dir),
        CommandKind::DeleteFrame => run::<DeleteFrame>(action, doc, dir),
        CommandKind::DuplicateShape => run::<DuplicateShape>(action, doc, dir),
    }
}

fn run<C: Command>(action: &Value, doc: &mut Document, dir: Direction) -> Result<(), CommandError> {
    let cmd = C::deserialize(action).map_err(|source| CommandError::MalformedAction { kind: C::KIND, source })?;
    match dir {
        Direction::Forward => cmd.execute(doc),
        Direction::Backward => cmd.rollback(doc),
    }
}
