//! Object identifiers shared by layers, children, shapes and frames.
//!
//! Every id is a string interned once per process. Animation keys embed
//! the string form (`hero.x`, `shape.blob.exists`), so the text must stay
//! stable through save and load while comparisons stay integer-cheap.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Interned handle for a document object. `Copy`, hashes as a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Spur);

impl ObjectId {
    /// The id spelled `name`. Equal names give equal ids.
    pub fn intern(name: &str) -> Self {
        ObjectId(NAMES.get_or_intern(name))
    }

    pub fn as_str(&self) -> &'static str {
        NAMES.resolve(&self.0)
    }

    /// UUID v4 id for duplicated objects, so copies cannot clash with ids
    /// from a file that was loaded later.
    pub fn random() -> Self {
        Self::intern(&uuid::Uuid::new_v4().to_string())
    }

    /// `<kind>_<n>` from a process-wide sequence, e.g. `layer_4`.
    pub fn with_prefix(kind: &str) -> Self {
        let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{kind}_{n}"))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|name| ObjectId::intern(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_name_same_id() {
        let hero = ObjectId::intern("hero");
        assert_eq!(hero, ObjectId::intern("hero"));
        assert_ne!(hero, ObjectId::intern("hero-shadow"));
        assert_eq!(hero.to_string(), "hero");
        assert_eq!(format!("{hero:?}"), "#hero");
    }

    #[test]
    fn sequence_ids_carry_their_kind() {
        let first = ObjectId::with_prefix("frame");
        let second = ObjectId::with_prefix("frame");
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("frame_"));
        assert!(!first.as_str().contains('.'));
    }

    #[test]
    fn duplicate_ids_never_repeat() {
        let ids: Vec<ObjectId> = (0..64).map(|_| ObjectId::random()).collect();
        let mut names: Vec<&str> = ids.iter().map(ObjectId::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ids.len());
        assert!(names.iter().all(|n| !n.contains('.')));
    }

    #[test]
    fn saved_as_plain_text() {
        let id = ObjectId::intern("stage");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"stage\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
