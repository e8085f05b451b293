//! Document save/load: JSON for interchange, MessagePack for compact storage.
//!
//! Derived caches (shape indices, vertices, the id table) are not written;
//! they are rebuilt while deserializing.

use crate::document::Document;
use crate::error::PersistError;

pub fn to_json(doc: &Document) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

pub fn from_json(text: &str) -> Result<Document, PersistError> {
    let doc: Document = serde_json::from_str(text)?;
    log::debug!("loaded {} layers from json", doc.layers.len());
    Ok(doc)
}

pub fn to_msgpack(doc: &Document) -> Result<Vec<u8>, PersistError> {
    Ok(rmp_serde::to_vec_named(doc)?)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<Document, PersistError> {
    let doc: Document = rmp_serde::from_slice(bytes)?;
    log::debug!("loaded {} layers from msgpack", doc.layers.len());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Keyframe, keys};
    use crate::id::ObjectId;
    use crate::layer::{Child, Layer};
    use crate::shape::Shape;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut doc = Document::new();
        let mut layer = Layer::new("persist");
        let mut shape = Shape::new();
        shape.add_line(20.0, 0.0);
        shape.add_line(20.0, 20.0);
        shape.add_line(0.0, 0.0);
        let instance = shape.instance_id;
        layer.add_shape(shape, 0.0);
        let hero = ObjectId::intern("persist-hero");
        layer.add_child(Child::new(hero));
        layer.add_curve_keyframe(&keys::child(hero, "x"), Keyframe::linear(1.0, 4.0));
        layer.frames.add_keyframe(3);
        let id = doc.add_layer(layer);
        assert_eq!(doc.shape_owner(instance), Some(id));
        doc
    }

    #[test]
    fn json_restores_document_and_caches() {
        let doc = sample();
        let text = to_json(&doc).unwrap();
        let back = from_json(&text).unwrap();
        assert_eq!(back, doc);

        let shape = &back.layers[0].shapes[0];
        assert_eq!(shape.vertices().len(), 3);
        assert_eq!(shape.index().len(), 3);
        assert_eq!(back.shape_owner(shape.instance_id), Some(back.layers[0].id));
        assert_eq!(back.ids().len(), doc.ids().len());
    }

    #[test]
    fn msgpack_matches_json() {
        let doc = sample();
        let bytes = to_msgpack(&doc).unwrap();
        assert_eq!(from_msgpack(&bytes).unwrap(), doc);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(from_json("{ layers: "), Err(PersistError::Json(_))));
        assert!(matches!(from_msgpack(&[0xc1]), Err(PersistError::Decode(_))));
    }
}
