use thiserror::Error;

/// Reported geometry degeneracies. These never abort an edit; callers log
/// them or surface them through `diagnostics`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("curve fitting needs at least two points, got {0}")]
    EmptyPointList(usize),

    #[error("curve {index} has zero length")]
    DegenerateCurve { index: usize },

    #[error("vertex at ({x:.2}, {y:.2}) joins {degree} curve ends; at most 4 are supported")]
    UnsupportedVertex { x: f64, y: f64, degree: usize },
}

/// Failures while (de)serializing a document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
