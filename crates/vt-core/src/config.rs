//! Tunable tolerances for geometry and timing.

use serde::{Deserialize, Serialize};

/// Numeric knobs shared by the geometry and animation code.
///
/// Missing fields fall back to their defaults when deserialized, so a host
/// app can override a single tolerance from its own settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Curves per spatial-index node before it subdivides. Default: **4**.
    pub index_capacity: usize,

    /// Distance under which curve endpoints merge into one vertex. Default: **0.5** px.
    pub vertex_epsilon: f64,

    /// Parameter-space distance under which intersection solutions coalesce.
    /// Default: **0.01**.
    pub intersection_tolerance: f64,

    /// Max deviation for "smooth" refits. Default: **30.0** px.
    pub fit_error_tolerance: f64,

    /// Polyline tolerance for "corners" simplification. Default: **10.0** px.
    pub corner_tolerance: f64,

    /// Timeline frames per second. Default: **24**.
    pub frame_rate: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            index_capacity: crate::spatial::DEFAULT_CAPACITY,
            vertex_epsilon: crate::shape::VERTEX_EPSILON,
            intersection_tolerance: crate::curve::INTERSECTION_EPSILON,
            fit_error_tolerance: 30.0,
            corner_tolerance: 10.0,
            frame_rate: 24.0,
        }
    }
}

impl CoreConfig {
    /// Seconds covered by one frame.
    pub fn frame_duration(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            log::warn!("non-positive frame rate {}, using 24 fps", self.frame_rate);
            1.0 / 24.0
        }
    }
}
