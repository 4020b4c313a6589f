use super::facade::ImplDump;
use super::traits::HitSetImplOps;
use super::types::HitSetType;
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::Result;
use crate::object::ObjectId;
use crate::params::{ImplParams, Params};
use std::collections::BTreeSet;

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

/// Records the placement hash of every object inserted.
///
/// Objects sharing a hash are indistinguishable, so `contains` can report a
/// hit for an object that was never inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitHashHitSet {
    count: u64,
    hits: BTreeSet<u32>,
}

/// Explicit-hash hit sets take no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitHashParams;

impl ImplParams for ExplicitHashParams {
    const TYPE: HitSetType = HitSetType::ExplicitHash;

    fn from_params(params: &Params) -> Option<&Self> {
        match params {
            Params::ExplicitHash(p) => Some(p),
            _ => None,
        }
    }

    fn from_params_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::ExplicitHash(p) => Some(p),
            _ => None,
        }
    }

    fn into_params(self) -> Params {
        Params::ExplicitHash(self)
    }
}

impl ExplicitHashHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded hashes in ascending order.
    pub fn hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.hits.iter().copied()
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        let mut populated = Self::new();
        for oid in crate::hit_set::facade::sample_objects() {
            populated.insert(&oid);
        }
        vec![Self::new(), populated]
    }
}

impl HitSetImplOps for ExplicitHashHitSet {
    type Params = ExplicitHashParams;

    const TYPE: HitSetType = HitSetType::ExplicitHash;

    fn from_params(_params: &ExplicitHashParams) -> Result<Self> {
        Ok(Self::new())
    }

    fn insert(&mut self, oid: &ObjectId) {
        self.hits.insert(oid.hash);
        self.count += 1;
    }

    fn contains(&self, oid: &ObjectId) -> bool {
        self.hits.contains(&oid.hash)
    }

    fn insert_count(&self) -> u64 {
        self.count
    }

    fn approx_unique_insert_count(&self) -> u64 {
        self.hits.len() as u64
    }

    fn dump(&self) -> ImplDump {
        ImplDump::ExplicitHash {
            insert_count: self.count,
            hash_set: self.hashes().collect(),
        }
    }
}

impl Encodable for ExplicitHashHitSet {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u64_le(self.count);
            buf.write_len(self.hits.len())?;
            for &hash in &self.hits {
                buf.write_u32_le(hash);
            }
            Ok(())
        })
    }
}

impl Decodable for ExplicitHashHitSet {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("explicit_hash", STRUCT_V, |buf, _struct_v| {
            let count = buf.read_u64_le()?;
            let len = buf.read_len()?;
            let mut hits = BTreeSet::new();
            for _ in 0..len {
                hits.insert(buf.read_u32_le()?);
            }
            Ok(Self { count, hits })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_count_once() {
        let mut hs = ExplicitHashHitSet::new();
        let oid = ObjectId::new(1, "", "dup");
        hs.insert(&oid);
        hs.insert(&oid);
        assert_eq!(hs.insert_count(), 2);
        assert_eq!(hs.approx_unique_insert_count(), 1);
        assert!(hs.contains(&oid));
    }

    #[test]
    fn test_hash_collision_merges_keys() {
        let mut hs = ExplicitHashHitSet::new();
        let a = ObjectId::new(1, "", "a").with_hash(77);
        let b = ObjectId::new(1, "", "b").with_hash(77);
        let never = ObjectId::new(1, "", "never").with_hash(77);
        hs.insert(&a);
        hs.insert(&b);
        assert_eq!(hs.insert_count(), 2);
        assert_eq!(hs.approx_unique_insert_count(), 1);
        // shares the hash, so it reads as present
        assert!(hs.contains(&never));
    }

    #[test]
    fn test_encode_decode() {
        let mut hs = ExplicitHashHitSet::new();
        for name in ["x", "y", "z", "x"] {
            hs.insert(&ObjectId::new(2, "ns", name));
        }
        let decoded = ExplicitHashHitSet::decode(&hs.encode().unwrap()).unwrap();
        assert_eq!(decoded, hs);
        assert_eq!(decoded.insert_count(), 4);
    }
}
