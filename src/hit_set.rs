//! Hit sets: which objects were touched during one tracking interval.
//!
//! [`HitSet`] owns at most one implementation and forwards every call to
//! it. The implementation is chosen from [`crate::Params`] when an interval
//! starts, or from the type tag when an archived hit set is decoded.
pub mod bloom;
pub mod explicit_hash;
pub mod explicit_object;
pub mod facade;
pub mod traits;
pub mod types;

pub use bloom::{
    BloomHitSet, BloomHitSetParams, BloomHitSetParamsBuilder,
    BloomHitSetParamsBuilderError,
};
pub use explicit_hash::{ExplicitHashHitSet, ExplicitHashParams};
pub use explicit_object::{ExplicitObjectHitSet, ExplicitObjectParams};
pub use facade::{HitSet, HitSetDump, HitSetImpl, ImplDump};
pub use traits::HitSetImplOps;
pub use types::HitSetType;
