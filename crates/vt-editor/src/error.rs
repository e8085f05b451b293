use crate::registry::CommandKind;
use thiserror::Error;
use vt_core::id::ObjectId;

#[derive(Debug, Error)]
pub enum CommandError {
    /// The action names an object that no longer exists.
    #[error("no object with id {0}")]
    MissingReference(ObjectId),

    #[error("{id} has no curve {index}")]
    CurveIndex { id: ObjectId, index: usize },

    #[error("no keyframe on `{key}` at t={time}")]
    NoKeyframe { key: String, time: f64 },

    #[error("malformed {kind:?} action: {source}")]
    MalformedAction {
        kind: CommandKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("action serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}
