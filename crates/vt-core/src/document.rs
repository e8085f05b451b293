//! Document: the layer stack plus timing and the id table.

use crate::config::CoreConfig;
use crate::id::ObjectId;
use crate::layer::{Child, Layer};
use crate::registry::{Handle, IdTable};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DocumentRecord", into = "DocumentRecord")]
pub struct Document {
    pub layers: Vec<Layer>,
    config: CoreConfig,
    ids: IdTable,
}

#[derive(Serialize, Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    config: CoreConfig,
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        let mut doc = Document {
            layers: r.layers,
            config: r.config,
            ids: IdTable::new(),
        };
        doc.reindex();
        doc
    }
}

impl From<Document> for DocumentRecord {
    fn from(d: Document) -> Self {
        DocumentRecord {
            layers: d.layers,
            config: d.config,
        }
    }
}

/// Structural on persistent state; the id table is derived.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.layers == other.layers && self.config == other.config
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_config(&CoreConfig::default())
    }

    pub fn with_config(cfg: &CoreConfig) -> Self {
        Self {
            layers: Vec::new(),
            config: cfg.clone(),
            ids: IdTable::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Replace the tolerances and re-derive every shape's caches with them.
    pub fn set_config(&mut self, cfg: CoreConfig) {
        self.config = cfg;
        self.reindex();
    }

    pub fn frame_duration(&self) -> f64 {
        self.config.frame_duration()
    }

    pub fn ids(&self) -> &IdTable {
        &self.ids
    }

    /// Rebuild the id table after structural edits. Shapes that arrived
    /// with other tolerances adopt the document's.
    pub fn reindex(&mut self) {
        self.adopt_config();
        self.ids.rebuild(&self.layers);
    }

    fn adopt_config(&mut self) {
        let cfg = &self.config;
        for shape in self.layers.iter_mut().flat_map(|l| l.shapes.iter_mut()) {
            if shape.config() != cfg {
                shape.apply_config(cfg);
            }
        }
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn add_layer(&mut self, layer: Layer) -> ObjectId {
        let id = layer.id;
        self.layers.push(layer);
        self.reindex();
        id
    }

    pub fn remove_layer(&mut self, id: ObjectId) -> Option<Layer> {
        let at = self.layer_index(id)?;
        let layer = self.layers.remove(at);
        self.reindex();
        Some(layer)
    }

    pub fn layer(&self, id: ObjectId) -> Option<&Layer> {
        self.layers.get(self.layer_index(id)?)
    }

    pub fn layer_mut(&mut self, id: ObjectId) -> Option<&mut Layer> {
        let at = self.layer_index(id)?;
        self.layers.get_mut(at)
    }

    fn layer_index(&self, id: ObjectId) -> Option<usize> {
        match self.ids.resolve(id) {
            Some(Handle::Layer { layer }) if self.layers.get(layer).is_some_and(|l| l.id == id) => Some(layer),
            _ => self.layers.iter().position(|l| l.id == id),
        }
    }

    // ─── Owners ──────────────────────────────────────────────────────────

    /// Layer holding the shape instance `instance_id`.
    pub fn shape_owner(&self, instance_id: ObjectId) -> Option<ObjectId> {
        self.owner(instance_id, |l| l.shape(instance_id).is_some())
    }

    /// Layer holding the child object `child_id`.
    pub fn child_owner(&self, child_id: ObjectId) -> Option<ObjectId> {
        self.owner(child_id, |l| l.child(child_id).is_some())
    }

    /// Table lookup, checked against the layer; a stale entry falls back
    /// to a scan.
    fn owner(&self, id: ObjectId, holds: impl Fn(&Layer) -> bool) -> Option<ObjectId> {
        if let Some(handle) = self.ids.resolve(id)
            && let Some(layer) = self.layers.get(handle.layer())
            && holds(layer)
        {
            return Some(layer.id);
        }
        let found = self.layers.iter().find(|l| holds(l)).map(|l| l.id);
        if found.is_some() {
            log::trace!("document: id table stale for {id:?}");
        }
        found
    }

    pub fn shape(&self, instance_id: ObjectId) -> Option<&Shape> {
        self.layer(self.shape_owner(instance_id)?)?.shape(instance_id)
    }

    pub fn shape_mut(&mut self, instance_id: ObjectId) -> Option<&mut Shape> {
        let owner = self.shape_owner(instance_id)?;
        self.layer_mut(owner)?.shape_mut(instance_id)
    }

    pub fn child(&self, child_id: ObjectId) -> Option<&Child> {
        self.layer(self.child_owner(child_id)?)?.child(child_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn owners_resolve_through_table() {
        let mut doc = Document::new();
        let bg = doc.add_layer(Layer::new("bg"));
        let fg = doc.add_layer(Layer::new("fg"));
        let shape = Shape::new();
        let instance = shape.instance_id;
        doc.layer_mut(fg).unwrap().add_shape(shape, 0.0);
        doc.layer_mut(bg).unwrap().add_child(Child::new(ObjectId::intern("doc-child")));

        // Found by scan before reindexing, by table after.
        assert_eq!(doc.shape_owner(instance), Some(fg));
        doc.reindex();
        assert_eq!(doc.shape_owner(instance), Some(fg));
        assert_eq!(doc.child_owner(ObjectId::intern("doc-child")), Some(bg));
        assert_eq!(doc.shape_owner(ObjectId::intern("doc-missing")), None);
    }

    #[test]
    fn stale_table_falls_back() {
        let mut doc = Document::new();
        let a = doc.add_layer(Layer::new("a"));
        let b = doc.add_layer(Layer::new("b"));
        let shape = Shape::new();
        let instance = shape.instance_id;
        doc.layer_mut(a).unwrap().add_shape(shape, 0.0);
        doc.reindex();
        let moved = doc.layer_mut(a).unwrap().remove_shape(instance).unwrap();
        doc.layer_mut(b).unwrap().shapes.push(moved);
        assert_eq!(doc.shape_owner(instance), Some(b));
    }

    #[test]
    fn equality_ignores_id_table() {
        let mut a = Document::new();
        a.add_layer(Layer::with_id(ObjectId::intern("eq-layer"), "l"));
        let mut b = a.clone();
        b.reindex();
        assert_eq!(a, b);
        assert_eq!(a.frame_duration(), 1.0 / 24.0);
    }

    fn open_pair() -> Shape {
        use crate::curve::Curve;
        use crate::model::Color;
        use kurbo::Point;
        let mut shape = Shape::with_ids(ObjectId::intern("doc-pair"), ObjectId::intern("doc-pair-0"));
        shape.set_curves(vec![
            Curve::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Color::BLACK),
            Curve::line(Point::new(10.2, 0.1), Point::new(20.0, 0.0), Color::BLACK),
        ]);
        shape
    }

    #[test]
    fn shapes_adopt_document_config() {
        let cfg = CoreConfig {
            vertex_epsilon: 0.1,
            frame_rate: 12.0,
            ..CoreConfig::default()
        };
        let mut doc = Document::with_config(&cfg);
        let mut layer = Layer::new("cfg");
        layer.add_shape(open_pair(), 0.0);
        let id = doc.add_layer(layer);
        let instance = ObjectId::intern("doc-pair-0");

        assert_eq!(doc.frame_duration(), 1.0 / 12.0);
        assert_eq!(doc.shape(instance).unwrap().config(), &cfg);
        assert_eq!(doc.shape(instance).unwrap().vertices().len(), 4);

        // Shapes added later pick it up on the next reindex.
        doc.layer_mut(id).unwrap().shapes.push(open_pair().variant(1));
        doc.reindex();
        assert!(doc.layer(id).unwrap().shapes.iter().all(|s| s.vertices().len() == 4));

        doc.set_config(CoreConfig::default());
        assert_eq!(doc.shape(instance).unwrap().vertices().len(), 3);
    }

    #[test]
    fn config_survives_save_and_load() {
        let cfg = CoreConfig {
            vertex_epsilon: 0.1,
            ..CoreConfig::default()
        };
        let mut doc = Document::with_config(&cfg);
        let mut layer = Layer::new("cfg-load");
        layer.add_shape(open_pair(), 0.0);
        doc.add_layer(layer);

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.shape(ObjectId::intern("doc-pair-0")).unwrap().vertices().len(), 4);
    }
}
