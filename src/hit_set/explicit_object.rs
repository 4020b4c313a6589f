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

/// Records every object inserted; membership is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitObjectHitSet {
    count: u64,
    hits: BTreeSet<ObjectId>,
}

/// Explicit-object hit sets take no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitObjectParams;

impl ImplParams for ExplicitObjectParams {
    const TYPE: HitSetType = HitSetType::ExplicitObject;

    fn from_params(params: &Params) -> Option<&Self> {
        match params {
            Params::ExplicitObject(p) => Some(p),
            _ => None,
        }
    }

    fn from_params_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::ExplicitObject(p) => Some(p),
            _ => None,
        }
    }

    fn into_params(self) -> Params {
        Params::ExplicitObject(self)
    }
}

impl ExplicitObjectHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.hits.iter()
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

impl HitSetImplOps for ExplicitObjectHitSet {
    type Params = ExplicitObjectParams;

    const TYPE: HitSetType = HitSetType::ExplicitObject;

    fn from_params(_params: &ExplicitObjectParams) -> Result<Self> {
        Ok(Self::new())
    }

    fn insert(&mut self, oid: &ObjectId) {
        if !self.hits.contains(oid) {
            self.hits.insert(oid.clone());
        }
        self.count += 1;
    }

    fn contains(&self, oid: &ObjectId) -> bool {
        self.hits.contains(oid)
    }

    fn insert_count(&self) -> u64 {
        self.count
    }

    fn approx_unique_insert_count(&self) -> u64 {
        self.hits.len() as u64
    }

    fn dump(&self) -> ImplDump {
        ImplDump::ExplicitObject {
            insert_count: self.count,
            set: self.hits.iter().cloned().collect(),
        }
    }
}

impl Encodable for ExplicitObjectHitSet {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u64_le(self.count);
            buf.write_len(self.hits.len())?;
            for oid in &self.hits {
                buf.write_bincode(oid)?;
            }
            Ok(())
        })
    }
}

impl Decodable for ExplicitObjectHitSet {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("explicit_object", STRUCT_V, |buf, _struct_v| {
            let count = buf.read_u64_le()?;
            let len = buf.read_len()?;
            let mut hits = BTreeSet::new();
            for _ in 0..len {
                hits.insert(buf.read_bincode::<ObjectId>()?);
            }
            Ok(Self { count, hits })
        })
    }
}
