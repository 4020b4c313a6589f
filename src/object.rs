use crate::hash::object_hash;
use serde::Serialize;
use std::fmt;

/// Identity of a stored object, as seen by the hit-set layer.
///
/// `hash` is the object's placement hash. Explicit-hash and bloom hit sets
/// only ever look at it; explicit-object hit sets key on every field.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct ObjectId {
    pub pool: i64,
    pub namespace: String,
    pub name: String,
    /// Locator key; when non-empty it is hashed instead of the name.
    pub key: String,
    pub snap: u64,
    pub hash: u32,
}

/// Snapshot id of the writable head object.
pub const NOSNAP: u64 = u64::MAX - 1;

impl ObjectId {
    pub fn new(
        pool: i64,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let hash = object_hash(name.as_bytes());
        Self {
            pool,
            namespace: namespace.into(),
            name,
            key: String::new(),
            snap: NOSNAP,
            hash,
        }
    }

    /// Sets the locator key and rehashes.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self.hash = if self.key.is_empty() {
            object_hash(self.name.as_bytes())
        } else {
            object_hash(self.key.as_bytes())
        };
        self
    }

    pub fn with_snap(mut self, snap: u64) -> Self {
        self.snap = snap;
        self
    }

    /// Overrides the placement hash.
    pub fn with_hash(mut self, hash: u32) -> Self {
        self.hash = hash;
        self
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:08x}:{}:{}", self.pool, self.hash, self.namespace, self.name)?;
        if !self.key.is_empty() {
            write!(f, "@{}", self.key)?;
        }
        if self.snap == NOSNAP {
            write!(f, ":head")
        } else {
            write!(f, ":{:x}", self.snap)
        }
    }
}
