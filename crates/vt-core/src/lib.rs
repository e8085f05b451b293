pub mod animation;
pub mod config;
pub mod curve;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod fit;
pub mod frames;
pub mod id;
pub mod layer;
pub mod model;
pub mod morph;
pub mod persist;
pub mod registry;
pub mod shape;
pub mod spatial;

pub use animation::{AnimationData, Interpolation, Keyframe, ParameterCurve, keys};
pub use config::CoreConfig;
pub use curve::{Curve, Projection};
pub use diagnostics::{Diagnostic, Severity, lint_layer, lint_shape};
pub use document::Document;
pub use error::{GeometryError, PersistError};
pub use frames::{ChildKeys, Frame, FrameKind, FrameSnapshot, LegacyFrameTrack, TweenLink};
pub use id::ObjectId;
pub use layer::{Authority, Child, Layer, RemovedShape, Transform, VisibleShape};
pub use model::*;
pub use registry::{Handle, IdTable};
pub use shape::{Region, Shape, SimplifyMode, Vertex, VertexKind};
pub use spatial::SpatialIndex;

// Re-export kurbo so downstream crates share one geometry version
pub use kurbo;
