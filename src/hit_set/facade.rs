use super::bloom::BloomHitSet;
use super::explicit_hash::ExplicitHashHitSet;
use super::explicit_object::ExplicitObjectHitSet;
use super::traits::HitSetImplOps;
use super::types::HitSetType;
use crate::bloom::BloomFilterDump;
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::Result;
use crate::object::ObjectId;
use crate::params::Params;
use serde::Serialize;
use tracing::{debug, warn};

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

/// The concrete representation behind a [`HitSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum HitSetImpl {
    ExplicitHash(ExplicitHashHitSet),
    ExplicitObject(ExplicitObjectHitSet),
    Bloom(BloomHitSet),
}

macro_rules! dispatch {
    ($imp:expr, $inner:ident => $body:expr) => {
        match $imp {
            HitSetImpl::ExplicitHash($inner) => $body,
            HitSetImpl::ExplicitObject($inner) => $body,
            HitSetImpl::Bloom($inner) => $body,
        }
    };
}

impl HitSetImpl {
    pub fn get_type(&self) -> HitSetType {
        match self {
            HitSetImpl::ExplicitHash(_) => ExplicitHashHitSet::TYPE,
            HitSetImpl::ExplicitObject(_) => ExplicitObjectHitSet::TYPE,
            HitSetImpl::Bloom(_) => BloomHitSet::TYPE,
        }
    }

    /// Builds the empty implementation `params` describe, or `None` for
    /// [`Params::None`].
    pub fn from_params(params: &Params) -> Result<Option<Self>> {
        Ok(match params {
            Params::None => None,
            Params::ExplicitHash(p) => {
                Some(Self::ExplicitHash(ExplicitHashHitSet::from_params(p)?))
            }
            Params::ExplicitObject(p) => {
                Some(Self::ExplicitObject(ExplicitObjectHitSet::from_params(p)?))
            }
            Params::Bloom(p) => Some(Self::Bloom(BloomHitSet::from_params(p)?)),
        })
    }

    fn decode_as(kind: HitSetType, buf: &mut DecodeBuf<'_>) -> Result<Option<Self>> {
        Ok(match kind {
            HitSetType::None => None,
            HitSetType::ExplicitHash => {
                Some(Self::ExplicitHash(ExplicitHashHitSet::decode_from(buf)?))
            }
            HitSetType::ExplicitObject => Some(Self::ExplicitObject(
                ExplicitObjectHitSet::decode_from(buf)?,
            )),
            HitSetType::Bloom => Some(Self::Bloom(BloomHitSet::decode_from(buf)?)),
        })
    }

    pub fn insert(&mut self, oid: &ObjectId) {
        dispatch!(self, hs => hs.insert(oid))
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        dispatch!(self, hs => hs.contains(oid))
    }

    pub fn insert_count(&self) -> u64 {
        dispatch!(self, hs => hs.insert_count())
    }

    pub fn approx_unique_insert_count(&self) -> u64 {
        dispatch!(self, hs => hs.approx_unique_insert_count())
    }

    pub fn optimize(&mut self) {
        dispatch!(self, hs => hs.optimize())
    }

    pub fn dump(&self) -> ImplDump {
        dispatch!(self, hs => hs.dump())
    }
}

impl Encodable for HitSetImpl {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        dispatch!(self, hs => hs.encode_to(buf))
    }
}

impl From<ExplicitHashHitSet> for HitSetImpl {
    fn from(hs: ExplicitHashHitSet) -> Self {
        HitSetImpl::ExplicitHash(hs)
    }
}

impl From<ExplicitObjectHitSet> for HitSetImpl {
    fn from(hs: ExplicitObjectHitSet) -> Self {
        HitSetImpl::ExplicitObject(hs)
    }
}

impl From<BloomHitSet> for HitSetImpl {
    fn from(hs: BloomHitSet) -> Self {
        HitSetImpl::Bloom(hs)
    }
}

/// Implementation-specific part of a [`HitSetDump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImplDump {
    ExplicitHash {
        insert_count: u64,
        hash_set: Vec<u32>,
    },
    ExplicitObject {
        insert_count: u64,
        set: Vec<ObjectId>,
    },
    Bloom {
        bloom_filter: BloomFilterDump,
    },
}

/// Structured report of a hit set for introspection tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitSetDump {
    #[serde(rename = "type")]
    pub type_name: &'static str,
    #[serde(flatten)]
    pub details: Option<ImplDump>,
}

/// Record of the objects accessed during one tracking interval.
///
/// A `HitSet` holds at most one implementation. Without one it reports
/// type `"none"`, and the mutating and membership operations must not be
/// called: they panic. A hit set belongs to the single context that fills
/// it and is not `Clone`; use [`deep_clone`](Self::deep_clone) or an
/// encode/decode round trip to duplicate a populated one.
#[derive(Debug, Default, PartialEq)]
pub struct HitSet {
    imp: Option<HitSetImpl>,
}

impl HitSet {
    /// An empty hit set of type `"none"`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty hit set of the kind `params` selects.
    pub fn from_params(params: &Params) -> Result<Self> {
        params.validate()?;
        debug!(%params, "building hit set");
        Ok(Self {
            imp: HitSetImpl::from_params(params)?,
        })
    }

    pub fn with_impl(imp: impl Into<HitSetImpl>) -> Self {
        Self {
            imp: Some(imp.into()),
        }
    }

    pub fn get_impl(&self) -> Option<&HitSetImpl> {
        self.imp.as_ref()
    }

    pub fn into_impl(self) -> Option<HitSetImpl> {
        self.imp
    }

    pub fn get_type(&self) -> HitSetType {
        self.imp
            .as_ref()
            .map_or(HitSetType::None, HitSetImpl::get_type)
    }

    pub fn get_type_name(&self) -> &'static str {
        self.get_type().name()
    }

    /// Name for an arbitrary type tag.
    pub fn type_name_of(kind: HitSetType) -> &'static str {
        kind.name()
    }

    fn active(&self) -> &HitSetImpl {
        match &self.imp {
            Some(imp) => imp,
            None => panic!("HitSet of type none has no implementation"),
        }
    }

    fn active_mut(&mut self) -> &mut HitSetImpl {
        match &mut self.imp {
            Some(imp) => imp,
            None => panic!("HitSet of type none has no implementation"),
        }
    }

    /// Records an access to `oid`.
    ///
    /// # Panics
    ///
    /// Panics if the hit set has no implementation.
    pub fn insert(&mut self, oid: &ObjectId) {
        self.active_mut().insert(oid)
    }

    /// Whether `oid` was (probably) inserted.
    ///
    /// Explicit-object answers exactly. Explicit-hash and bloom may answer
    /// `true` for objects never inserted, never `false` for ones that were.
    ///
    /// # Panics
    ///
    /// Panics if the hit set has no implementation.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.active().contains(oid)
    }

    /// # Panics
    ///
    /// Panics if the hit set has no implementation.
    pub fn insert_count(&self) -> u64 {
        self.active().insert_count()
    }

    /// # Panics
    ///
    /// Panics if the hit set has no implementation.
    pub fn approx_unique_insert_count(&self) -> u64 {
        self.active().approx_unique_insert_count()
    }

    /// Shrinks backing storage where the implementation supports it.
    ///
    /// # Panics
    ///
    /// Panics if the hit set has no implementation.
    pub fn optimize(&mut self) {
        self.active_mut().optimize()
    }

    pub fn dump(&self) -> HitSetDump {
        HitSetDump {
            type_name: self.get_type_name(),
            details: self.imp.as_ref().map(HitSetImpl::dump),
        }
    }

    /// Independent copy including the implementation's contents.
    pub fn deep_clone(&self) -> Self {
        Self {
            imp: self.imp.clone(),
        }
    }

    /// Copy of an empty hit set; `None` when this one holds an
    /// implementation.
    pub fn clone_empty(&self) -> Option<Self> {
        match self.imp {
            None => Some(Self::new()),
            Some(_) => None,
        }
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        let mut out = vec![HitSet::new()];
        let bloom = BloomHitSet::new(10, 0.1, 1).expect("valid test instance parameters");
        let impls: [HitSetImpl; 3] = [
            bloom.into(),
            ExplicitHashHitSet::new().into(),
            ExplicitObjectHitSet::new().into(),
        ];
        for imp in impls {
            let mut hs = HitSet::with_impl(imp);
            for oid in sample_objects() {
                hs.insert(&oid);
            }
            out.push(hs);
        }
        out
    }
}

impl Encodable for HitSet {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u8(self.get_type().as_u8());
            if let Some(imp) = &self.imp {
                imp.encode_to(buf)?;
            }
            Ok(())
        })
    }
}

impl Decodable for HitSet {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("hit_set", STRUCT_V, |buf, _struct_v| {
            let tag = buf.read_u8()?;
            let kind = HitSetType::from_u8(tag).inspect_err(|err| {
                warn!(tag, %err, "refusing to decode hit set");
            })?;
            Ok(Self {
                imp: HitSetImpl::decode_as(kind, buf)?,
            })
        })
    }
}

/// Objects used to populate generated test instances.
#[cfg(feature = "tests")]
pub(crate) fn sample_objects() -> Vec<ObjectId> {
    vec![
        ObjectId::default(),
        ObjectId::new(1, "", "asdf").with_hash(123),
        ObjectId::new(1, "", "qwer").with_hash(456),
    ]
}
