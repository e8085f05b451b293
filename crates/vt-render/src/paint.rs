//! Layer → paint-surface drawing calls.
//!
//! Resolves which shape variants are visible at a time (materializing
//! morphs), orders them back to front and hands fills and strokes to a
//! `PaintSurface`. The surface itself lives in the host.

use kurbo::{Affine, BezPath, Rect, Shape as _};
use std::borrow::Cow;
use vt_core::document::Document;
use vt_core::id::ObjectId;
use vt_core::layer::Layer;
use vt_core::model::{Color, FillStyle, StrokeStyle};
use vt_core::shape::Shape;

/// Outline drawn around selected shapes.
pub const SELECTION_STROKE: StrokeStyle = StrokeStyle {
    color: Color::rgba(0.2, 0.5, 1.0, 1.0),
    line_width: 1.0,
};

/// What a host drawing backend has to provide.
pub trait PaintSurface {
    fn fill_path(&mut self, path: &BezPath, fill: &FillStyle);
    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle);
    fn push_transform(&mut self, transform: Affine);
    fn pop_transform(&mut self);
}

/// One shape ready to paint. Morph frames own their synthesized shape.
#[derive(Debug, Clone)]
pub struct PaintItem<'a> {
    pub shape: Cow<'a, Shape>,
    pub z_order: f64,
    pub selected: bool,
}

/// Visible shapes of `layer` at `time`, back to front.
pub fn build_paint_list<'a>(
    layer: &'a Layer,
    time: f64,
    frame_duration: f64,
    selection: &[ObjectId],
) -> Vec<PaintItem<'a>> {
    if !layer.visible {
        return Vec::new();
    }
    layer
        .resolve_for_paint(time, frame_duration)
        .into_iter()
        .map(|(shape, z_order)| {
            let selected = selection.contains(&shape.instance_id);
            PaintItem {
                shape,
                z_order,
                selected,
            }
        })
        .collect()
}

/// Paint one layer. Returns the number of shapes drawn.
pub fn paint_layer(
    surface: &mut dyn PaintSurface,
    layer: &Layer,
    time: f64,
    frame_duration: f64,
    selection: &[ObjectId],
) -> usize {
    let items = build_paint_list(layer, time, frame_duration, selection);
    for item in &items {
        paint_item(surface, item);
    }
    log::trace!("paint layer {}: {} shapes at t={time}", layer.id, items.len());
    items.len()
}

/// Paint every layer in stacking order under a view transform.
pub fn paint_document(surface: &mut dyn PaintSurface, doc: &Document, time: f64, view: Affine, selection: &[ObjectId]) {
    let fd = doc.frame_duration();
    surface.push_transform(view);
    for layer in &doc.layers {
        paint_layer(surface, layer, time, fd, selection);
    }
    surface.pop_transform();
}

fn paint_item(surface: &mut dyn PaintSurface, item: &PaintItem<'_>) {
    let shape = &item.shape;
    if shape.is_empty() {
        return;
    }
    if shape.filled {
        surface.fill_path(&shape.to_bezpath(), &shape.fill);
    }
    if shape.stroked {
        surface.stroke_path(&shape.to_stroke_path(), &shape.stroke);
    }
    if item.selected {
        let pad = shape.stroke.line_width / 2.0;
        surface.stroke_path(&selection_outline(shape.bbox().inflate(pad, pad)), &SELECTION_STROKE);
    }
}

fn selection_outline(r: Rect) -> BezPath {
    r.to_path(0.1)
}
