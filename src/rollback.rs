//! Reversible modification log for a single object.
//!
//! An [`ObjectModDesc`] records, in order, enough about each write to undo
//! it: the size before an append, the previous values of attributes that
//! were overwritten, the version a delete stashed away. A backend applies
//! the undo by implementing [`RollbackTarget`] and calling [`rollback`].
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::Result;
use crate::object::ObjectId;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

/// Previous attribute values; `None` means the attribute did not exist.
pub type AttrMap = BTreeMap<String, Option<Vec<u8>>>;

/// One reversible modification.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, bincode::Encode, bincode::Decode,
)]
pub enum ModOp {
    /// Data was appended to an object that was `old_size` bytes long.
    Append { old_size: u64 },
    /// Attributes were overwritten or removed.
    SetAttrs { attrs: AttrMap },
    /// The object was deleted and its contents stashed as `old_version`.
    Delete { old_version: u64 },
    /// The object did not exist before.
    Create,
}

/// Ordered undo information for writes to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectModDesc {
    can_local_rollback: bool,
    ops: Vec<ModOp>,
}

impl Default for ObjectModDesc {
    fn default() -> Self {
        Self {
            can_local_rollback: true,
            ops: Vec::new(),
        }
    }
}

/// Receives the operations of an [`ObjectModDesc`].
pub trait ModDescVisitor {
    fn append(&mut self, old_size: u64);
    fn set_attrs(&mut self, attrs: &AttrMap);
    fn delete(&mut self, old_version: u64);
    fn create(&mut self);
}

impl ObjectModDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, old_size: u64) {
        self.push(ModOp::Append { old_size });
    }

    pub fn setattrs(&mut self, attrs: AttrMap) {
        self.push(ModOp::SetAttrs { attrs });
    }

    pub fn delete(&mut self, old_version: u64) {
        self.push(ModOp::Delete { old_version });
    }

    pub fn create(&mut self) {
        self.push(ModOp::Create);
    }

    fn push(&mut self, op: ModOp) {
        if self.can_local_rollback {
            self.ops.push(op);
        }
    }

    pub fn can_rollback(&self) -> bool {
        self.can_local_rollback
    }

    /// Forgets recorded operations; later ones are ignored.
    pub fn mark_unrollbackable(&mut self) {
        self.can_local_rollback = false;
        self.ops.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[ModOp] {
        &self.ops
    }

    /// Hands each operation to `visitor` in the order it was recorded.
    pub fn visit<V: ModDescVisitor + ?Sized>(&self, visitor: &mut V) {
        for op in &self.ops {
            visit_op(op, visitor);
        }
    }

    /// Like [`visit`](Self::visit), newest operation first.
    pub fn visit_rev<V: ModDescVisitor + ?Sized>(&self, visitor: &mut V) {
        for op in self.ops.iter().rev() {
            visit_op(op, visitor);
        }
    }
}

fn visit_op<V: ModDescVisitor + ?Sized>(op: &ModOp, visitor: &mut V) {
    match op {
        ModOp::Append { old_size } => visitor.append(*old_size),
        ModOp::SetAttrs { attrs } => visitor.set_attrs(attrs),
        ModOp::Delete { old_version } => visitor.delete(*old_version),
        ModOp::Create => visitor.create(),
    }
}

impl Encodable for ObjectModDesc {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u8(u8::from(self.can_local_rollback));
            buf.write_bincode(&self.ops)
        })
    }
}

impl Decodable for ObjectModDesc {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("object mod desc", STRUCT_V, |buf, _struct_v| {
            let can_local_rollback = buf.read_u8()? != 0;
            let ops: Vec<ModOp> = buf.read_bincode()?;
            Ok(Self {
                can_local_rollback,
                ops,
            })
        })
    }
}

/// Object-store operations needed to undo a write.
pub trait RollbackTarget {
    /// Truncates the object back to `size` bytes.
    fn truncate(&mut self, oid: &ObjectId, size: u64) -> Result<()>;
    /// Sets each attribute to its old value, removing those mapped to `None`.
    fn restore_attrs(&mut self, oid: &ObjectId, attrs: &AttrMap) -> Result<()>;
    /// Brings back the contents stashed as `old_version`.
    fn unstash(&mut self, oid: &ObjectId, old_version: u64) -> Result<()>;
    /// Removes an object the write created.
    fn remove(&mut self, oid: &ObjectId) -> Result<()>;
}

/// Adapts a [`RollbackTarget`] into a visitor, stopping at the first error.
struct RollbackVisitor<'a, T: RollbackTarget + ?Sized> {
    oid: &'a ObjectId,
    target: &'a mut T,
    result: Result<()>,
}

impl<T: RollbackTarget + ?Sized> RollbackVisitor<'_, T> {
    fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&mut T, &ObjectId) -> Result<()>,
    {
        if self.result.is_ok() {
            self.result = op(self.target, self.oid);
        }
    }
}

impl<T: RollbackTarget + ?Sized> ModDescVisitor for RollbackVisitor<'_, T> {
    fn append(&mut self, old_size: u64) {
        trace!(oid = %self.oid, old_size, "rolling back append");
        self.apply(|t, oid| t.truncate(oid, old_size));
    }

    fn set_attrs(&mut self, attrs: &AttrMap) {
        trace!(oid = %self.oid, attrs = attrs.len(), "rolling back setattrs");
        self.apply(|t, oid| t.restore_attrs(oid, attrs));
    }

    fn delete(&mut self, old_version: u64) {
        trace!(oid = %self.oid, old_version, "rolling back delete");
        self.apply(|t, oid| t.unstash(oid, old_version));
    }

    fn create(&mut self) {
        trace!(oid = %self.oid, "rolling back create");
        self.apply(|t, oid| t.remove(oid));
    }
}

/// Undoes the writes `desc` describes against `target`, newest first.
///
/// # Panics
///
/// Panics if `desc` has been marked unrollbackable.
pub fn rollback<T: RollbackTarget + ?Sized>(
    oid: &ObjectId,
    desc: &ObjectModDesc,
    target: &mut T,
) -> Result<()> {
    assert!(
        desc.can_rollback(),
        "cannot roll back {oid}: modification description is unrollbackable"
    );
    debug!(%oid, ops = desc.ops.len(), "rolling back object");
    let mut visitor = RollbackVisitor {
        oid,
        target,
        result: Ok(()),
    };
    desc.visit_rev(&mut visitor);
    visitor.result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HitSetError;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct StoredObject {
        data: Vec<u8>,
        attrs: BTreeMap<String, Vec<u8>>,
    }

    #[derive(Default)]
    struct InMemoryStore {
        objects: HashMap<ObjectId, StoredObject>,
        stash: HashMap<(ObjectId, u64), StoredObject>,
    }

    impl InMemoryStore {
        fn object_mut(&mut self, oid: &ObjectId) -> Result<&mut StoredObject> {
            self.objects.get_mut(oid).ok_or_else(|| HitSetError::Rollback {
                oid: oid.to_string(),
                reason: "no such object".into(),
            })
        }
    }

    impl RollbackTarget for InMemoryStore {
        fn truncate(&mut self, oid: &ObjectId, size: u64) -> Result<()> {
            self.object_mut(oid)?.data.truncate(size as usize);
            Ok(())
        }

        fn restore_attrs(&mut self, oid: &ObjectId, attrs: &AttrMap) -> Result<()> {
            let obj = self.object_mut(oid)?;
            for (name, value) in attrs {
                match value {
                    Some(v) => obj.attrs.insert(name.clone(), v.clone()),
                    None => obj.attrs.remove(name),
                };
            }
            Ok(())
        }

        fn unstash(&mut self, oid: &ObjectId, old_version: u64) -> Result<()> {
            let obj = self
                .stash
                .remove(&(oid.clone(), old_version))
                .ok_or_else(|| HitSetError::Rollback {
                    oid: oid.to_string(),
                    reason: format!("version {old_version} not stashed"),
                })?;
            self.objects.insert(oid.clone(), obj);
            Ok(())
        }

        fn remove(&mut self, oid: &ObjectId) -> Result<()> {
            self.objects.remove(oid);
            Ok(())
        }
    }

    fn oid() -> ObjectId {
        ObjectId::new(1, "", "obj")
    }

    #[test]
    fn test_rollback_append_and_attrs() {
        let mut store = InMemoryStore::default();
        let original = StoredObject {
            data: b"abc".to_vec(),
            attrs: BTreeMap::from([("a".to_string(), b"1".to_vec())]),
        };
        store.objects.insert(oid(), original.clone());

        let mut desc = ObjectModDesc::new();
        desc.append(3);
        store.objects.get_mut(&oid()).unwrap().data.extend(b"def");
        desc.setattrs(BTreeMap::from([
            ("a".to_string(), Some(b"1".to_vec())),
            ("b".to_string(), None),
        ]));
        {
            let obj = store.objects.get_mut(&oid()).unwrap();
            obj.attrs.insert("a".into(), b"2".to_vec());
            obj.attrs.insert("b".into(), b"new".to_vec());
        }

        rollback(&oid(), &desc, &mut store).unwrap();
        assert_eq!(store.objects[&oid()], original);
    }

    #[test]
    fn test_rollback_create_then_delete() {
        let mut store = InMemoryStore::default();
        let mut desc = ObjectModDesc::new();
        desc.create();
        store.objects.insert(oid(), StoredObject::default());
        rollback(&oid(), &desc, &mut store).unwrap();
        assert!(store.objects.is_empty());

        let stashed = StoredObject {
            data: b"old".to_vec(),
            ..Default::default()
        };
        store.stash.insert((oid(), 7), stashed.clone());
        let mut desc = ObjectModDesc::new();
        desc.delete(7);
        rollback(&oid(), &desc, &mut store).unwrap();
        assert_eq!(store.objects[&oid()], stashed);
    }

    #[test]
    fn test_rollback_reports_target_error() {
        let mut store = InMemoryStore::default();
        let mut desc = ObjectModDesc::new();
        desc.delete(1);
        let err = rollback(&oid(), &desc, &mut store).unwrap_err();
        assert!(matches!(err, HitSetError::Rollback { .. }));
    }

    #[test]
    #[should_panic(expected = "unrollbackable")]
    fn test_rollback_unrollbackable_panics() {
        let mut desc = ObjectModDesc::new();
        desc.append(10);
        desc.mark_unrollbackable();
        let _ = rollback(&oid(), &desc, &mut InMemoryStore::default());
    }

    #[test]
    fn test_mark_unrollbackable_drops_ops() {
        let mut desc = ObjectModDesc::new();
        desc.append(1);
        desc.mark_unrollbackable();
        desc.create();
        assert!(!desc.can_rollback());
        assert!(desc.is_empty());
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ModDescVisitor for Recorder {
        fn append(&mut self, old_size: u64) {
            self.0.push(format!("append {old_size}"));
        }
        fn set_attrs(&mut self, attrs: &AttrMap) {
            self.0.push(format!("setattrs {}", attrs.len()));
        }
        fn delete(&mut self, old_version: u64) {
            self.0.push(format!("delete {old_version}"));
        }
        fn create(&mut self) {
            self.0.push("create".into());
        }
    }

    #[test]
    fn test_visit_order_and_encoding() {
        let mut desc = ObjectModDesc::new();
        desc.create();
        desc.append(0);
        desc.setattrs(BTreeMap::from([("x".to_string(), None)]));
        desc.delete(4);

        let mut forward = Recorder::default();
        desc.visit(&mut forward);
        assert_eq!(forward.0, ["create", "append 0", "setattrs 1", "delete 4"]);

        let decoded = ObjectModDesc::decode(&desc.encode().unwrap()).unwrap();
        assert_eq!(decoded, desc);
    }

    #[test]
    fn test_corrupt_op_count_is_malformed() {
        let mut buf = EncodeBuf::new();
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u8(1);
            buf.write_u64_le(u64::MAX / 4);
            buf.write_u8(0);
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            ObjectModDesc::decode(&buf.into_bytes()),
            Err(HitSetError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_rollback_create_then_append_undoes_newest_first() {
        let mut store = InMemoryStore::default();
        let mut desc = ObjectModDesc::new();
        desc.create();
        store.objects.insert(oid(), StoredObject::default());
        desc.append(0);
        store.objects.get_mut(&oid()).unwrap().data.extend(b"payload");

        // truncate must run while the object still exists, then remove it
        rollback(&oid(), &desc, &mut store).unwrap();
        assert!(store.objects.is_empty());

        let mut forward = Recorder::default();
        desc.visit(&mut forward);
        let mut backward = Recorder::default();
        desc.visit_rev(&mut backward);
        assert_eq!(forward.0, ["create", "append 0"]);
        assert_eq!(backward.0, ["append 0", "create"]);
    }
}
