//! Undo/Redo command log.
//!
//! Every edit goes through `CommandLog::create`, which builds the action
//! record, applies it and pushes it as one undo step. Records are stored
//! as `{ kind, action }` JSON so the history can be saved with the
//! document and replayed through the registry.
//!
//! Drag gestures are grouped with `begin_batch` / `end_batch`: everything
//! created in between becomes a single undo step.

use crate::actions::Command;
use crate::error::CommandError;
use crate::registry::{self, CommandKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vt_core::document::Document;

/// One applied command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub kind: CommandKind,
    pub action: Value,
}

/// One undo step. Holds several actions when created inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub actions: Vec<LoggedAction>,
}

impl Entry {
    /// Kind of the last action, used as the step's label.
    pub fn kind(&self) -> Option<CommandKind> {
        self.actions.last().map(|a| a.kind)
    }
}

pub struct CommandLog {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    batch: Vec<LoggedAction>,
}

impl CommandLog {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(256)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch: Vec::new(),
        }
    }

    /// Build `C`'s record from `args`, apply it and log it.
    ///
    /// Errors from `create` (a missing reference, a bad curve index) leave
    /// the document and the log untouched.
    pub fn create<C: Command>(&mut self, doc: &mut Document, args: C::Args) -> Result<(), CommandError> {
        let cmd = C::create(args, doc)?;
        let action = serde_json::to_value(&cmd)?;
        cmd.execute(doc)?;
        doc.reindex();

        let logged = LoggedAction { kind: C::KIND, action };
        if self.batch_depth > 0 {
            self.batch.push(logged);
        } else {
            self.push(Entry { actions: vec![logged] });
        }
        Ok(())
    }

    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch. The outermost close logs everything created since
    /// the matching `begin_batch` as one step.
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 && !self.batch.is_empty() {
            let actions = std::mem::take(&mut self.batch);
            self.push(Entry { actions });
        }
    }

    fn push(&mut self, entry: Entry) {
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Roll back the last step. Actions whose ids no longer resolve are
    /// skipped with a warning; the step still moves to the redo stack.
    pub fn undo(&mut self, doc: &mut Document) -> Option<CommandKind> {
        let entry = self.undo_stack.pop()?;
        for a in entry.actions.iter().rev() {
            if let Err(e) = registry::rollback(a.kind, &a.action, doc) {
                log::warn!("undo {:?}: {e}", a.kind);
            }
        }
        doc.reindex();
        let kind = entry.kind();
        self.redo_stack.push(entry);
        kind
    }

    /// Re-apply the last undone step.
    pub fn redo(&mut self, doc: &mut Document) -> Option<CommandKind> {
        let entry = self.redo_stack.pop()?;
        for a in &entry.actions {
            if let Err(e) = registry::execute(a.kind, &a.action, doc) {
                log::warn!("redo {:?}: {e}", a.kind);
            }
        }
        doc.reindex();
        let kind = entry.kind();
        self.undo_stack.push(entry);
        kind
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Applied steps, oldest first.
    pub fn history(&self) -> &[Entry] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch.clear();
        self.batch_depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{TranslateShape, TranslateShapeArgs};
    use vt_core::id::ObjectId;
    use vt_core::layer::Layer;
    use vt_core::shape::Shape;

    fn doc_with_shape() -> (Document, ObjectId) {
        let mut doc = Document::new();
        let mut layer = Layer::new("log");
        let mut shape = Shape::new();
        shape.add_line(8.0, 0.0);
        let id = shape.instance_id;
        layer.add_shape(shape, 0.0);
        doc.add_layer(layer);
        (doc, id)
    }

    fn nudge(instance: ObjectId) -> TranslateShapeArgs {
        TranslateShapeArgs {
            instance,
            dx: 1.0,
            dy: 0.0,
        }
    }

    #[test]
    fn max_depth_drops_oldest() {
        let (mut doc, id) = doc_with_shape();
        let mut log = CommandLog::new(2);
        for _ in 0..3 {
            log.create::<TranslateShape>(&mut doc, nudge(id)).unwrap();
        }
        assert_eq!(log.history().len(), 2);
        assert!(log.undo(&mut doc).is_some());
        assert!(log.undo(&mut doc).is_some());
        assert!(!log.can_undo());
        // The dropped step stays applied.
        assert_eq!(doc.shape(id).unwrap().curves()[0].start.x, 1.0);
    }

    #[test]
    fn new_action_clears_redo() {
        let (mut doc, id) = doc_with_shape();
        let mut log = CommandLog::new(10);
        log.create::<TranslateShape>(&mut doc, nudge(id)).unwrap();
        log.undo(&mut doc);
        assert!(log.can_redo());
        log.create::<TranslateShape>(&mut doc, nudge(id)).unwrap();
        assert!(!log.can_redo());
    }

    #[test]
    fn batch_is_one_step() {
        let (mut doc, id) = doc_with_shape();
        let before = doc.clone();
        let mut log = CommandLog::new(10);
        log.begin_batch();
        for _ in 0..4 {
            log.create::<TranslateShape>(&mut doc, nudge(id)).unwrap();
        }
        log.end_batch();
        assert_eq!(log.history().len(), 1);
        assert_eq!(log.undo(&mut doc), Some(CommandKind::TranslateShape));
        assert_eq!(doc, before);
    }

    #[test]
    fn failed_create_logs_nothing() {
        let (mut doc, _) = doc_with_shape();
        let mut log = CommandLog::new(10);
        let missing = ObjectId::intern("log-missing");
        let err = log.create::<TranslateShape>(&mut doc, nudge(missing)).unwrap_err();
        assert!(matches!(err, CommandError::MissingReference(id) if id == missing));
        assert!(!log.can_undo());
    }
}
