use super::FilterSizing;
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::{HitSetError, Result};
use crate::hash::{MAX_NUM_HASHES, bloom_indices};
use bitvec::{bitvec, order::Lsb0, vec::BitVec};
use serde::Serialize;
use tracing::debug;

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

/// Bloom filter over 32-bit keys whose table can be folded down in place.
///
/// Bit positions are `raw % table_size`. Folding only ever moves to a table
/// size that divides the current one, so `raw % old % new == raw % new` and
/// a folded filter still answers `true` for every key it held before.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressibleBloomFilter {
    bits: BitVec<u8, Lsb0>,
    num_hashes: u32,
    seed: u64,
    target_size: u64,
    insert_count: u64,
}

/// Introspection view of a [`CompressibleBloomFilter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloomFilterDump {
    pub insert_count: u64,
    pub target_size: u64,
    pub seed: u64,
    pub num_hashes: u32,
    pub table_size: usize,
    pub bits_set: usize,
    pub density: f64,
}

impl CompressibleBloomFilter {
    /// Sizes a filter for `target_size` distinct keys at `false_positive`
    /// probability. A zero target still gets a one-word table.
    pub fn new(target_size: u64, false_positive: f64, seed: u64) -> Result<Self> {
        let sizing = FilterSizing::new(target_size, false_positive)?;
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; sizing.table_size],
            num_hashes: sizing.num_hashes as u32,
            seed,
            target_size,
            insert_count: 0,
        })
    }

    fn positions(&self, key: u32) -> impl Iterator<Item = usize> {
        bloom_indices(key, self.seed, self.num_hashes as usize, self.bits.len())
    }

    pub fn insert(&mut self, key: u32) {
        let positions: Vec<usize> = self.positions(key).collect();
        for idx in positions {
            self.bits.set(idx, true);
        }
        self.insert_count += 1;
    }

    pub fn contains(&self, key: u32) -> bool {
        self.positions(key).all(|idx| self.bits[idx])
    }

    /// Number of `insert` calls, duplicates included.
    pub fn element_count(&self) -> u64 {
        self.insert_count
    }

    /// Estimated number of distinct keys, from the fraction of set bits.
    ///
    /// Uses `n = -(m / k) ln(1 - X / m)` and never reports more than
    /// [`element_count`](Self::element_count).
    pub fn approx_unique_element_count(&self) -> u64 {
        let set = self.bits_set();
        if set == 0 {
            return 0;
        }
        let m = self.bits.len() as f64;
        if set == self.bits.len() {
            return self.insert_count;
        }
        let k = self.num_hashes as f64;
        let estimate = -(m / k) * (1.0 - set as f64 / m).ln();
        (estimate.round() as u64).min(self.insert_count)
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Fraction of table bits that are set.
    pub fn density(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.bits_set() as f64 / self.bits.len() as f64
    }

    pub fn table_size(&self) -> usize {
        self.bits.len()
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn target_size(&self) -> u64 {
        self.target_size
    }

    /// Folds the table down to at most `target_ratio` of its current size.
    ///
    /// Picks the largest byte-aligned divisor of the table no bigger than
    /// `table_size * target_ratio` (and no smaller than half of that), then
    /// ORs every bit onto its position in the smaller table. Returns `false`
    /// and leaves the filter untouched when the ratio is outside `(0, 1)` or
    /// no such divisor exists.
    pub fn compress(&mut self, target_ratio: f64) -> bool {
        if !(target_ratio > 0.0 && target_ratio < 1.0) {
            return false;
        }
        let old_size = self.bits.len();
        let Some(new_size) = fold_target(old_size, target_ratio) else {
            return false;
        };

        let mut folded = bitvec![u8, Lsb0; 0; new_size];
        for idx in self.bits.iter_ones() {
            folded.set(idx % new_size, true);
        }
        self.bits = folded;

        debug!(
            old_size,
            new_size,
            density = self.density(),
            "compressed bloom filter"
        );
        true
    }

    pub fn dump(&self) -> BloomFilterDump {
        BloomFilterDump {
            insert_count: self.insert_count,
            target_size: self.target_size,
            seed: self.seed,
            num_hashes: self.num_hashes,
            table_size: self.bits.len(),
            bits_set: self.bits_set(),
            density: self.density(),
        }
    }
}

/// Largest byte-aligned table size `table_size / d` (d >= 2) that does not
/// exceed `table_size * ratio`, as long as it is still at least half of it.
fn fold_target(table_size: usize, ratio: f64) -> Option<usize> {
    let bytes = table_size / 8;
    let target = bytes as f64 * ratio;
    (2..=bytes)
        .filter(|d| bytes % d == 0)
        .map(|d| bytes / d)
        .find(|&folded| folded as f64 <= target)
        .filter(|&folded| folded as f64 * 2.0 >= target)
        .map(|folded| folded * 8)
}

impl Encodable for CompressibleBloomFilter {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u64_le(self.insert_count);
            buf.write_u64_le(self.target_size);
            buf.write_u64_le(self.seed);
            buf.write_u32_le(self.num_hashes);
            buf.write_len(self.bits.len())?;
            buf.write(self.bits.as_raw_slice());
            Ok(())
        })
    }
}

impl Decodable for CompressibleBloomFilter {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("bloom_filter", STRUCT_V, |buf, _struct_v| {
            let insert_count = buf.read_u64_le()?;
            let target_size = buf.read_u64_le()?;
            let seed = buf.read_u64_le()?;
            let num_hashes = buf.read_u32_le()?;
            let table_size = buf.read_len()?;
            if num_hashes == 0 || num_hashes as usize > MAX_NUM_HASHES {
                return Err(HitSetError::MalformedInput(format!(
                    "bloom filter with {num_hashes} hash functions, expected 1..={MAX_NUM_HASHES}"
                )));
            }
            if table_size == 0 || table_size % 8 != 0 {
                return Err(HitSetError::MalformedInput(format!(
                    "bloom filter table size {table_size} is not a positive whole number of bytes"
                )));
            }
            let raw = buf.read_exact(table_size / 8)?.to_vec();
            Ok(Self {
                bits: BitVec::from_vec(raw),
                num_hashes,
                seed,
                target_size,
                insert_count,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let mut filter = CompressibleBloomFilter::new(100, 0.01, 7).unwrap();
        for key in 0..100u32 {
            filter.insert(key.wrapping_mul(2_654_435_761));
        }
        for key in 0..100u32 {
            assert!(filter.contains(key.wrapping_mul(2_654_435_761)));
        }
        assert_eq!(filter.element_count(), 100);
    }

    #[test]
    fn test_empty_filter() {
        let filter = CompressibleBloomFilter::new(10, 0.1, 1).unwrap();
        assert!(!filter.contains(123));
        assert_eq!(filter.approx_unique_element_count(), 0);
        assert_eq!(filter.density(), 0.0);
    }

    #[test]
    fn test_zero_capacity_accepts_inserts() {
        let mut filter = CompressibleBloomFilter::new(0, 0.01, 0).unwrap();
        filter.insert(1);
        filter.insert(2);
        assert!(filter.contains(1));
        assert!(filter.contains(2));
        assert_eq!(filter.table_size(), 64);
    }

    #[test]
    fn test_estimate_tracks_distinct_keys() {
        let mut filter = CompressibleBloomFilter::new(1000, 0.01, 3).unwrap();
        for key in 0..500u32 {
            filter.insert(key);
            filter.insert(key);
        }
        let estimate = filter.approx_unique_element_count();
        assert!(
            (450..=550).contains(&estimate),
            "estimate {estimate} too far from 500"
        );
        assert!(estimate <= filter.element_count());
    }

    #[test]
    fn test_compress_preserves_membership() {
        let mut filter = CompressibleBloomFilter::new(1000, 0.01, 5).unwrap();
        for key in 0..50u32 {
            filter.insert(key);
        }
        let before = filter.table_size();
        assert!(filter.compress(filter.density() * 2.0));
        assert!(filter.table_size() < before);
        assert_eq!(before % filter.table_size(), 0);
        for key in 0..50u32 {
            assert!(filter.contains(key), "key {key} lost by compression");
        }
    }

    #[test]
    fn test_compress_rejects_bad_ratio() {
        let mut filter = CompressibleBloomFilter::new(100, 0.01, 5).unwrap();
        filter.insert(1);
        let snapshot = filter.clone();
        assert!(!filter.compress(0.0));
        assert!(!filter.compress(1.0));
        assert!(!filter.compress(f64::NAN));
        assert_eq!(filter, snapshot);
    }

    #[test]
    fn test_fold_target() {
        assert_eq!(fold_target(48, 0.375), Some(16));
        assert_eq!(fold_target(48, 0.5), Some(24));
        assert_eq!(fold_target(8, 0.25), None);
        // 7 bytes only divides by 7, and one byte is far below 3.5
        assert_eq!(fold_target(56, 0.5), None);
        assert_eq!(fold_target(56, 0.2), Some(8));
    }

    #[test]
    fn test_encode_decode() {
        let mut filter = CompressibleBloomFilter::new(10, 0.1, 1).unwrap();
        filter.insert(0);
        filter.insert(123);
        filter.insert(456);
        let bytes = filter.encode().unwrap();
        let decoded = CompressibleBloomFilter::decode(&bytes).unwrap();
        assert_eq!(decoded, filter);
    }

    #[test]
    fn test_new_rejects_unusable_rate() {
        for bad in [0.0, 1.0, f64::NAN] {
            assert!(matches!(
                CompressibleBloomFilter::new(10, bad, 0),
                Err(HitSetError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_decode_rejects_excessive_hash_count() {
        let filter = CompressibleBloomFilter::new(10, 0.1, 1).unwrap();
        let mut bytes = filter.encode().unwrap();
        // frame header, then insert_count, target_size and seed
        let at = crate::codec::FRAME_HEADER_LEN + 24;
        for bad in [0u32, MAX_NUM_HASHES as u32 + 1, u32::MAX] {
            bytes[at..at + 4].copy_from_slice(&bad.to_le_bytes());
            assert!(matches!(
                CompressibleBloomFilter::decode(&bytes),
                Err(HitSetError::MalformedInput(_))
            ));
        }
    }
}
