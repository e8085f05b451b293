//! Tool system for canvas interactions.
//!
//! Each tool translates input events into command arguments; the host
//! applies them through a `CommandLog` with `EditRequest::apply`.

use crate::actions::{AddShape, AddShapeArgs, TranslateShape, TranslateShapeArgs};
use crate::commands::CommandLog;
use crate::error::CommandError;
use crate::input::InputEvent;
use kurbo::Point;
use vt_core::config::CoreConfig;
use vt_core::document::Document;
use vt_core::id::ObjectId;
use vt_core::model::StrokeStyle;
use vt_core::shape::Shape;
use vt_render::hit;

/// The active tool determines how input events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Draw,
}

/// Where the tool is working.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub doc: &'a Document,
    pub layer: ObjectId,
    pub time: f64,
}

/// A command a tool wants applied.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRequest {
    AddShape(AddShapeArgs),
    TranslateShape(TranslateShapeArgs),
}

impl EditRequest {
    pub fn apply(self, log: &mut CommandLog, doc: &mut Document) -> Result<(), CommandError> {
        match self {
            EditRequest::AddShape(args) => log.create::<AddShape>(doc, args),
            EditRequest::TranslateShape(args) => log.create::<TranslateShape>(doc, args),
        }
    }
}

/// Trait for tools that handle input and produce edits.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle an input event, returning zero or more edits.
    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<EditRequest>;
}

// ─── Select Tool ─────────────────────────────────────────────────────────

pub struct SelectTool {
    /// Currently selected shape instance.
    pub selected: Option<ObjectId>,
    /// Pick distance around strokes.
    pub tolerance: f64,
    dragging: bool,
    last: Point,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectTool {
    pub fn new() -> Self {
        Self {
            selected: None,
            tolerance: 4.0,
            dragging: false,
            last: Point::ZERO,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<EditRequest> {
        let p = event.position();
        match event {
            InputEvent::PointerDown { .. } => {
                self.selected = ctx
                    .doc
                    .layer(ctx.layer)
                    .and_then(|layer| hit::hit_test(layer, ctx.time, ctx.doc.frame_duration(), p, self.tolerance));
                self.dragging = self.selected.is_some();
                self.last = p;
                vec![]
            }
            InputEvent::PointerMove { .. } => {
                if self.dragging
                    && let Some(instance) = self.selected
                {
                    let d = p - self.last;
                    self.last = p;
                    if d.x != 0.0 || d.y != 0.0 {
                        return vec![EditRequest::TranslateShape(TranslateShapeArgs {
                            instance,
                            dx: d.x,
                            dy: d.y,
                        })];
                    }
                }
                vec![]
            }
            InputEvent::PointerUp { .. } => {
                self.dragging = false;
                vec![]
            }
        }
    }
}

// ─── Draw Tool ───────────────────────────────────────────────────────────

/// Freehand drawing: samples the pointer path and fits curves on release.
pub struct DrawTool {
    pub stroke: StrokeStyle,
    /// Max deviation of the fitted curves from the samples.
    pub error_tolerance: f64,
    points: Vec<Point>,
    drawing: bool,
}

impl Default for DrawTool {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}

impl DrawTool {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            stroke: StrokeStyle::default(),
            error_tolerance: cfg.fit_error_tolerance,
            points: Vec::new(),
            drawing: false,
        }
    }

    fn sample(&mut self, p: Point) {
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }
}

impl Tool for DrawTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Draw
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<EditRequest> {
        let p = event.position();
        match event {
            InputEvent::PointerDown { .. } => {
                self.drawing = true;
                self.points.clear();
                self.sample(p);
                vec![]
            }
            InputEvent::PointerMove { .. } => {
                if self.drawing {
                    self.sample(p);
                }
                vec![]
            }
            InputEvent::PointerUp { .. } => {
                if !self.drawing {
                    return vec![];
                }
                self.drawing = false;
                self.sample(p);
                let points = std::mem::take(&mut self.points);
                if points.len() < 2 {
                    return vec![];
                }
                let mut shape = Shape::new();
                shape.stroke = self.stroke;
                if let Err(e) = shape.from_points(&points, self.error_tolerance) {
                    log::warn!("draw: {e}");
                    return vec![];
                }
                log::debug!("draw: {} samples -> {} curves", points.len(), shape.curves().len());
                vec![EditRequest::AddShape(AddShapeArgs {
                    layer: ctx.layer,
                    shape,
                    time: ctx.time,
                })]
            }
        }
    }
}
