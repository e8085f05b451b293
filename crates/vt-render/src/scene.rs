//! `PaintSurface` backed by a Vello scene.
//!
//! The host owns the wgpu device and presents the scene; this only
//! records fills and strokes. Image fills resolve through a table the
//! host fills with decoded assets.

use crate::paint::PaintSurface;
use kurbo::{Affine, BezPath, Stroke};
use peniko::{Color as PenikoColor, Fill, Image};
use std::collections::HashMap;
use vello::Scene;
use vt_core::id::ObjectId;
use vt_core::model::{Color, FillStyle, StrokeStyle};

/// Shown where an image asset has not been registered.
const MISSING_IMAGE: Color = Color::rgba(0.8, 0.8, 0.8, 1.0);

pub struct VelloSurface<'s> {
    scene: &'s mut Scene,
    stack: Vec<Affine>,
    images: HashMap<ObjectId, Image>,
}

impl<'s> VelloSurface<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            stack: Vec::new(),
            images: HashMap::new(),
        }
    }

    pub fn register_image(&mut self, asset: ObjectId, image: Image) {
        self.images.insert(asset, image);
    }

    fn transform(&self) -> Affine {
        self.stack.last().copied().unwrap_or(Affine::IDENTITY)
    }
}

impl PaintSurface for VelloSurface<'_> {
    fn fill_path(&mut self, path: &BezPath, fill: &FillStyle) {
        let transform = self.transform();
        match fill {
            FillStyle::Flat(c) => self.scene.fill(Fill::NonZero, transform, to_peniko(c), None, path),
            FillStyle::Image { asset } => match self.images.get(asset) {
                Some(image) => self.scene.fill(Fill::NonZero, transform, image, None, path),
                None => {
                    log::trace!("vello: image {asset} not registered");
                    self.scene
                        .fill(Fill::NonZero, transform, to_peniko(&MISSING_IMAGE), None, path);
                }
            },
        }
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle) {
        let style = Stroke::new(stroke.line_width);
        self.scene
            .stroke(&style, self.transform(), to_peniko(&stroke.color), None, path);
    }

    fn push_transform(&mut self, transform: Affine) {
        let combined = self.transform() * transform;
        self.stack.push(combined);
    }

    fn pop_transform(&mut self) {
        if self.stack.pop().is_none() {
            log::warn!("vello: unbalanced pop_transform");
        }
    }
}

fn to_peniko(c: &Color) -> PenikoColor {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    PenikoColor::from_rgba8(byte(c.r), byte(c.g), byte(c.b), byte(c.a))
}
