//! Hit testing: point → shape lookup.
//!
//! Walks editable shapes front to back. Shapes mid-morph are not
//! editable and never hit.

use kurbo::{Point, Rect};
use vt_core::document::Document;
use vt_core::id::ObjectId;
use vt_core::layer::Layer;
use vt_core::spatial::intersects;

/// Topmost editable instance at `point`: a stroke within `tolerance`
/// or a fill containing the point. `None` on background.
pub fn hit_test(layer: &Layer, time: f64, frame_duration: f64, point: Point, tolerance: f64) -> Option<ObjectId> {
    if !layer.visible {
        return None;
    }
    // Last painted = topmost
    for shape in layer.editable_shapes(time, frame_duration).into_iter().rev() {
        let reach = tolerance + shape.stroke.line_width / 2.0;
        if !shape.bbox().inflate(reach, reach).contains(point) {
            continue;
        }
        if shape.stroked && shape.stroke_hit(point, tolerance).is_some() {
            return Some(shape.instance_id);
        }
        if shape.filled && shape.contains_point(point) {
            return Some(shape.instance_id);
        }
    }
    None
}

/// Every editable instance with a curve whose bbox touches `rect`.
/// Used for marquee selection; back-to-front order.
pub fn hit_test_rect(layer: &Layer, time: f64, frame_duration: f64, rect: Rect) -> Vec<ObjectId> {
    if !layer.visible {
        return Vec::new();
    }
    let rect = rect.abs();
    layer
        .editable_shapes(time, frame_duration)
        .into_iter()
        .filter(|shape| {
            shape
                .index()
                .query(rect)
                .into_iter()
                .filter_map(|i| shape.curves().get(i))
                .any(|c| intersects(c.bbox(), rect))
        })
        .map(|shape| shape.instance_id)
        .collect()
}

/// Point hit across all layers, top layer first. Returns `(layer, instance)`.
pub fn hit_test_document(doc: &Document, time: f64, point: Point, tolerance: f64) -> Option<(ObjectId, ObjectId)> {
    let fd = doc.frame_duration();
    doc.layers
        .iter()
        .rev()
        .find_map(|layer| Some((layer.id, hit_test(layer, time, fd, point, tolerance)?)))
}
