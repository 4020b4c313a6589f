use super::facade::ImplDump;
use super::types::HitSetType;
use crate::codec::{Decodable, Encodable};
use crate::error::Result;
use crate::object::ObjectId;
use crate::params::ImplParams;

/// Operations every hit set implementation provides.
///
/// Encoding comes from the [`Encodable`]/[`Decodable`] supertraits; each
/// implementation wraps its payload in its own versioned frame.
pub trait HitSetImplOps: Encodable + Decodable {
    /// Construction parameters for this implementation.
    type Params: ImplParams;

    const TYPE: HitSetType;

    /// Builds an empty instance, failing on parameters it cannot honour.
    fn from_params(params: &Self::Params) -> Result<Self>;

    fn insert(&mut self, oid: &ObjectId);

    fn contains(&self, oid: &ObjectId) -> bool;

    /// Number of `insert` calls, duplicates included.
    fn insert_count(&self) -> u64;

    /// Number of distinct entries recorded, exact or estimated.
    fn approx_unique_insert_count(&self) -> u64;

    /// Trade unused capacity for space once the interval is complete.
    fn optimize(&mut self) {}

    fn dump(&self) -> ImplDump;
}
