use super::facade::ImplDump;
use super::traits::HitSetImplOps;
use super::types::HitSetType;
use crate::bloom::{CompressibleBloomFilter, FilterSizing};
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::{HitSetError, Result};
use crate::object::ObjectId;
use crate::params::{ImplParams, ImplParamsDump, Params};
use derive_builder::Builder;
use serde::Serialize;
use std::fmt;

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

const PARAMS_STRUCT_V: u8 = 1;
const PARAMS_COMPAT_V: u8 = 1;

/// False positive probabilities travel as integer millionths.
const FPP_SCALE: f64 = 1_000_000.0;

/// Probabilities that survive the millionths encoding unchanged in kind:
/// neither 0 nor 1 once rounded.
const FPP_MICROS: std::ops::RangeInclusive<u32> = 1..=999_999;

/// Sizing for a bloom hit set.
#[derive(Debug, Clone, PartialEq, Builder, Serialize)]
#[builder(pattern = "owned")]
pub struct BloomHitSetParams {
    /// Target false positive probability, in (0, 1)
    #[builder(default = "0.05")]
    #[serde(rename = "false_positive_probability")]
    pub false_positive: f64,

    /// Number of distinct objects expected during the interval
    #[builder(default = "1000")]
    pub target_size: u64,

    /// Seed for the filter's hash functions
    #[builder(default = "0")]
    pub seed: u64,
}

impl Default for BloomHitSetParams {
    fn default() -> Self {
        Self::new(0.05, 1000, 0)
    }
}

impl BloomHitSetParams {
    pub fn new(false_positive: f64, target_size: u64, seed: u64) -> Self {
        Self {
            false_positive,
            target_size,
            seed,
        }
    }

    /// Checks the probability is in (0, 1) at millionth precision and that
    /// the table it implies fits the wire format.
    pub fn validate(&self) -> Result<()> {
        FilterSizing::new(self.target_size, self.false_positive)?;
        let micros = self.false_positive_micros();
        if !FPP_MICROS.contains(&micros) {
            return Err(HitSetError::InvalidConfig(format!(
                "False positive probability {} rounds to {micros} millionths, must be within {}..={}",
                self.false_positive,
                FPP_MICROS.start(),
                FPP_MICROS.end()
            )));
        }
        Ok(())
    }

    /// Probability as written on the wire.
    pub fn false_positive_micros(&self) -> u32 {
        (self.false_positive * FPP_SCALE).round() as u32
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        vec![Self::default(), Self::new(0.1, 300, 99)]
    }
}

impl ImplParams for BloomHitSetParams {
    const TYPE: HitSetType = HitSetType::Bloom;

    fn from_params(params: &Params) -> Option<&Self> {
        match params {
            Params::Bloom(p) => Some(p),
            _ => None,
        }
    }

    fn from_params_mut(params: &mut Params) -> Option<&mut Self> {
        match params {
            Params::Bloom(p) => Some(p),
            _ => None,
        }
    }

    fn into_params(self) -> Params {
        Params::Bloom(self)
    }

    fn encode_impl_bits(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(PARAMS_STRUCT_V, PARAMS_COMPAT_V, |buf| {
            buf.write_u32_le(self.false_positive_micros());
            buf.write_u64_le(self.target_size);
            buf.write_u64_le(self.seed);
            Ok(())
        })
    }

    fn decode_impl_bits(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("bloom params", PARAMS_STRUCT_V, |buf, _struct_v| {
            let micros = buf.read_u32_le()?;
            let target_size = buf.read_u64_le()?;
            let seed = buf.read_u64_le()?;
            Ok(Self::new(micros as f64 / FPP_SCALE, target_size, seed))
        })
    }

    fn dump_impl(&self) -> ImplParamsDump {
        ImplParamsDump::Bloom(self.clone())
    }

    fn fmt_impl(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "false_positive_probability: {}, target_size: {}, seed: {}",
            self.false_positive, self.target_size, self.seed
        )
    }
}

/// Tracks hits in a compressible bloom filter keyed by placement hash.
///
/// No false negatives. False positives stay near the configured rate while
/// the number of distinct objects is within `target_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomHitSet {
    bloom: CompressibleBloomFilter,
}

impl BloomHitSet {
    /// Fails with `InvalidConfig` on the same parameters
    /// [`BloomHitSetParams::validate`] rejects.
    pub fn new(target_size: u64, false_positive: f64, seed: u64) -> Result<Self> {
        BloomHitSetParams::new(false_positive, target_size, seed).validate()?;
        Ok(Self {
            bloom: CompressibleBloomFilter::new(target_size, false_positive, seed)?,
        })
    }

    pub fn filter(&self) -> &CompressibleBloomFilter {
        &self.bloom
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        let mut populated =
            Self::new(10, 0.1, 1).expect("valid test instance parameters");
        for oid in crate::hit_set::facade::sample_objects() {
            populated.insert(&oid);
        }
        let empty = Self::new(0, 0.05, 0).expect("valid test instance parameters");
        vec![empty, populated]
    }
}

impl HitSetImplOps for BloomHitSet {
    type Params = BloomHitSetParams;

    const TYPE: HitSetType = HitSetType::Bloom;

    fn from_params(params: &BloomHitSetParams) -> Result<Self> {
        Self::new(params.target_size, params.false_positive, params.seed)
    }

    fn insert(&mut self, oid: &ObjectId) {
        self.bloom.insert(oid.hash);
    }

    fn contains(&self, oid: &ObjectId) -> bool {
        self.bloom.contains(oid.hash)
    }

    fn insert_count(&self) -> u64 {
        self.bloom.element_count()
    }

    fn approx_unique_insert_count(&self) -> u64 {
        self.bloom.approx_unique_element_count()
    }

    fn optimize(&mut self) {
        // aim for a density of .5 (half the bits set)
        let ratio = self.bloom.density() * 2.0;
        if ratio < 1.0 {
            self.bloom.compress(ratio);
        }
    }

    fn dump(&self) -> ImplDump {
        ImplDump::Bloom {
            bloom_filter: self.bloom.dump(),
        }
    }
}

impl Encodable for BloomHitSet {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| self.bloom.encode_to(buf))
    }
}

impl Decodable for BloomHitSet {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("bloom", STRUCT_V, |buf, _struct_v| {
            Ok(Self {
                bloom: CompressibleBloomFilter::decode_from(buf)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<ObjectId> {
        vec![
            ObjectId::default(),
            ObjectId::new(123, "", "asdf"),
            ObjectId::new(456, "", "qwer"),
        ]
    }

    #[test]
    fn test_optimize_keeps_members_and_shrinks() {
        let mut hs = BloomHitSet::new(10, 0.1, 1).unwrap();
        for oid in &keys() {
            hs.insert(oid);
        }
        let before = hs.encode().unwrap().len();
        hs.optimize();
        for oid in &keys() {
            assert!(hs.contains(oid));
        }
        assert!(hs.encode().unwrap().len() <= before);
        assert_eq!(hs.insert_count(), 3);
    }

    #[test]
    fn test_optimize_empty_is_noop() {
        let mut hs = BloomHitSet::new(100, 0.01, 0).unwrap();
        let before = hs.clone();
        hs.optimize();
        assert_eq!(hs, before);
    }

    #[test]
    fn test_params_validate() {
        assert!(BloomHitSetParams::new(0.05, 0, 0).validate().is_ok());
        for bad in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            assert!(matches!(
                BloomHitSetParams::new(bad, 10, 0).validate(),
                Err(HitSetError::InvalidConfig(_))
            ));
        }
        assert!(
            BloomHitSetParams::new(1e-6, u64::MAX, 0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_builder_defaults() {
        let params = BloomHitSetParamsBuilder::default()
            .target_size(42)
            .build()
            .expect("Unable to build BloomHitSetParams");
        assert_eq!(params, BloomHitSetParams::new(0.05, 42, 0));
    }

    #[test]
    fn test_fpp_micro_scaling_is_inverse() {
        for fpp in [0.1, 0.05, 0.01, 0.000_001, 0.999_999, 0.123_456] {
            let params = BloomHitSetParams::new(fpp, 1, 2);
            params.validate().unwrap();
            let mut buf = EncodeBuf::new();
            params.encode_impl_bits(&mut buf).unwrap();
            let bytes = buf.into_bytes();
            let decoded =
                BloomHitSetParams::decode_impl_bits(&mut DecodeBuf::new(&bytes))
                    .unwrap();
            assert_eq!(decoded, params, "fpp {fpp} did not survive");
        }
    }

    #[test]
    fn test_rates_lost_to_rounding_are_rejected() {
        // would encode as 0 or 1_000_000 millionths
        for fpp in [1e-7, 4e-7, 0.999_999_6, 0.999_999_9] {
            assert!(
                matches!(
                    BloomHitSetParams::new(fpp, 10, 0).validate(),
                    Err(HitSetError::InvalidConfig(_))
                ),
                "fpp {fpp} should be rejected"
            );
        }
        assert!(BloomHitSetParams::new(6e-7, 10, 0).validate().is_ok());
        assert!(BloomHitSetParams::new(0.999_999_4, 10, 0).validate().is_ok());
    }

    #[test]
    fn test_new_validates() {
        for bad in [0.0, 1.0, 1e-7] {
            assert!(BloomHitSet::new(10, bad, 0).is_err());
        }
        assert!(BloomHitSet::new(u64::MAX, 0.01, 0).is_err());
    }
}
