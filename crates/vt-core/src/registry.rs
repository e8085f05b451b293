//! Identifier table: id → where the object lives.
//!
//! Handles hold indices into the owning collections, never the objects.
//! They go stale on structural edits, so owners rebuild the table after
//! changing layer, child or shape lists.

use crate::id::ObjectId;
use crate::layer::Layer;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Layer { layer: usize },
    Child { layer: usize },
    /// Keyed by the shape's instance id.
    Shape { layer: usize },
    Frame { layer: usize, index: usize },
}

impl Handle {
    pub fn layer(&self) -> usize {
        match *self {
            Handle::Layer { layer }
            | Handle::Child { layer }
            | Handle::Shape { layer }
            | Handle::Frame { layer, .. } => layer,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdTable {
    handles: HashMap<ObjectId, Handle>,
}

impl IdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle previously stored under `id`.
    pub fn register(&mut self, id: ObjectId, handle: Handle) -> Option<Handle> {
        let prev = self.handles.insert(id, handle);
        if let Some(p) = prev
            && p != handle
        {
            log::debug!("id table: {id:?} moved {p:?} -> {handle:?}");
        }
        prev
    }

    pub fn deregister(&mut self, id: ObjectId) -> Option<Handle> {
        self.handles.remove(&id)
    }

    pub fn resolve(&self, id: ObjectId) -> Option<Handle> {
        self.handles.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Re-register every layer, child, shape instance and legacy keyframe.
    pub fn rebuild(&mut self, layers: &[Layer]) {
        self.handles.clear();
        for (li, layer) in layers.iter().enumerate() {
            self.register(layer.id, Handle::Layer { layer: li });
            for child in &layer.children {
                self.register(child.id, Handle::Child { layer: li });
            }
            for shape in &layer.shapes {
                self.register(shape.instance_id, Handle::Shape { layer: li });
            }
            for index in layer.frames.keyframe_indices() {
                if let Some(frame) = layer.frames.cell(index) {
                    self.register(frame.id, Handle::Frame { layer: li, index });
                }
            }
        }
        log::trace!("id table: rebuilt with {} entries", self.handles.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Child;
    use crate::shape::Shape;
    use pretty_assertions::assert_eq;

    #[test]
    fn rebuild_indexes_every_owner() {
        let mut a = Layer::new("a");
        let mut b = Layer::new("b");
        let child = ObjectId::intern("registry-child");
        a.add_child(Child::new(child));
        let shape = Shape::new();
        let instance = shape.instance_id;
        b.add_shape(shape, 0.0);

        let mut table = IdTable::new();
        table.rebuild(&[a.clone(), b.clone()]);
        assert_eq!(table.resolve(a.id), Some(Handle::Layer { layer: 0 }));
        assert_eq!(table.resolve(child), Some(Handle::Child { layer: 0 }));
        assert_eq!(table.resolve(instance), Some(Handle::Shape { layer: 1 }));
        let frame0 = b.frames.cell(0).unwrap().id;
        assert_eq!(table.resolve(frame0), Some(Handle::Frame { layer: 1, index: 0 }));
        // two layers + child + shape + one keyframe each
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn deregister_forgets() {
        let mut table = IdTable::new();
        let id = ObjectId::intern("registry-gone");
        assert_eq!(table.register(id, Handle::Layer { layer: 2 }), None);
        assert_eq!(table.resolve(id).map(|h| h.layer()), Some(2));
        table.deregister(id);
        assert!(table.resolve(id).is_none());
    }
}
