//! Lint diagnostics for shapes and layers.
//!
//! Reports degeneracies and dangling animation data without modifying
//! anything. Hosts surface these next to the canvas.

use crate::animation::keys;
use crate::error::GeometryError;
use crate::id::ObjectId;
use crate::layer::Layer;
use crate::shape::Shape;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Likely a mistake.
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Shape instance, layer or shape id the finding refers to.
    pub id: ObjectId,
    pub message: String,
    pub severity: Severity,
    /// Short rule identifier (e.g. "degenerate-curve").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Geometry findings for one shape.
#[must_use]
pub fn lint_shape(shape: &Shape) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for warning in shape.warnings() {
        let rule = match warning {
            GeometryError::EmptyPointList(_) => "empty-point-list",
            GeometryError::DegenerateCurve { .. } => "degenerate-curve",
            GeometryError::UnsupportedVertex { .. } => "unsupported-vertex",
        };
        diags.push(Diagnostic {
            id: shape.instance_id,
            message: warning.to_string(),
            severity: Severity::Warning,
            rule,
        });
    }
    if shape.filled && has_open_subpath(shape) {
        diags.push(Diagnostic {
            id: shape.instance_id,
            message: format!(
                "Shape `{}` is filled but its outline is open; the fill closes it with a straight edge.",
                shape.instance_id
            ),
            severity: Severity::Info,
            rule: "open-fill",
        });
    }
    for d in &diags {
        log::debug!("lint {}: {}", d.rule, d.message);
    }
    diags
}

fn has_open_subpath(shape: &Shape) -> bool {
    let curves = shape.curves();
    let eps = shape.config().vertex_epsilon;
    shape
        .subpaths()
        .into_iter()
        .any(|r| curves[r.start].start.distance(curves[r.end - 1].end) > eps)
}

/// Shape findings plus animation-data consistency for a whole layer.
#[must_use]
pub fn lint_layer(layer: &Layer) -> Vec<Diagnostic> {
    let mut diags: Vec<Diagnostic> = layer.shapes.iter().flat_map(lint_shape).collect();
    lint_duplicate_variants(layer, &mut diags);
    lint_unkeyed_shapes(layer, &mut diags);
    lint_orphan_curves(layer, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Two instances claiming the same variant slot; only one can ever show.
fn lint_duplicate_variants(layer: &Layer, diags: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for shape in &layer.shapes {
        if !seen.insert((shape.shape_id, shape.shape_index)) {
            diags.push(Diagnostic {
                id: shape.instance_id,
                message: format!(
                    "Shape `{}` repeats variant {} of `{}`.",
                    shape.instance_id, shape.shape_index, shape.shape_id
                ),
                severity: Severity::Warning,
                rule: "duplicate-variant",
            });
        }
    }
}

/// Without an `exists` curve a shape is never visible.
fn lint_unkeyed_shapes(layer: &Layer, diags: &mut Vec<Diagnostic>) {
    let mut reported = HashSet::new();
    for shape in &layer.shapes {
        let id = shape.shape_id;
        if layer.animation.curve(&keys::exists(id)).is_none() && reported.insert(id) {
            diags.push(Diagnostic {
                id,
                message: format!("Shape `{id}` has no `exists` keyframes and is never shown."),
                severity: Severity::Warning,
                rule: "unkeyed-shape",
            });
        }
    }
}

fn lint_orphan_curves(layer: &Layer, diags: &mut Vec<Diagnostic>) {
    let present: HashSet<&str> = layer.shapes.iter().map(|s| s.shape_id.as_str()).collect();
    for key in layer.animation.keys() {
        if let Some((id, _)) = keys::parse_shape(key)
            && !present.contains(id)
        {
            diags.push(Diagnostic {
                id: layer.id,
                message: format!("Curve `{key}` animates a shape that is not on the layer."),
                severity: Severity::Info,
                rule: "orphan-curve",
            });
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
