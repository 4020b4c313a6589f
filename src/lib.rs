//! Hit sets for cache tiering.
//!
//! A hit set records which objects were accessed during one time interval,
//! so that tiering policy can tell hot objects from cold ones. Three
//! representations trade accuracy for space:
//!
//!    * Explicit-object: every distinct object id, exact membership.
//!    * Explicit-hash: only each object's 32-bit placement hash. Objects that
//!      share a hash are indistinguishable.
//!    * Bloom: a compressible bloom filter over placement hashes. No false
//!      negatives, a bounded false positive rate, and a table that can be
//!      folded down once the interval closes.
//!
//! [`HitSet`] wraps whichever one [`Params`] selects. Everything that is
//! archived (hit sets, params, the bloom filter itself) goes through a
//! versioned frame so that older readers can skip fields added later:
//!
//! ```
//! use hitset::{Decodable, Encodable, HitSet, HitSetType, ObjectId, Params};
//!
//! let mut hs = HitSet::from_params(&Params::new(HitSetType::Bloom)).unwrap();
//! let oid = ObjectId::new(1, "", "rbd_data.1234");
//! hs.insert(&oid);
//! hs.optimize();
//!
//! let archived = hs.encode().unwrap();
//! let restored = HitSet::decode(&archived).unwrap();
//! assert!(restored.contains(&oid));
//! assert_eq!(restored.insert_count(), 1);
//! ```
//!
//! Hit sets are owned by a single placement-group context and carry no
//! internal locking.

pub mod bloom;
pub mod codec;
mod error;
pub mod hash;
pub mod hit_set;
mod object;
pub mod params;
pub mod rollback;

pub use bloom::{BloomFilterDump, CompressibleBloomFilter, FilterSizing};
pub use codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
pub use error::{HitSetError, Result};
pub use hash::{object_hash, optimal_bit_vector_size, optimal_num_hashes};
pub use hit_set::{
    BloomHitSet, BloomHitSetParams, BloomHitSetParamsBuilder,
    BloomHitSetParamsBuilderError, ExplicitHashHitSet, ExplicitHashParams,
    ExplicitObjectHitSet, ExplicitObjectParams, HitSet, HitSetDump,
    HitSetImpl, HitSetImplOps, HitSetType, ImplDump,
};
pub use object::{NOSNAP, ObjectId};
pub use params::{ImplParams, ImplParamsDump, Params, ParamsDecoder, ParamsDump};
pub use rollback::{
    AttrMap, ModDescVisitor, ModOp, ObjectModDesc, RollbackTarget, rollback,
};
