use fnv::FnvHasher;
use murmur3::murmur3_32;
use std::hash::Hasher;
use std::io::Cursor;

/// Table sizes are rounded up to whole 64-bit words. Besides alignment this
/// keeps 2, 4 and 8 among the byte-count divisors a fold can pick from.
pub const TABLE_ALIGN_BITS: usize = 64;

/// Smallest table a bloom filter is ever given, so that a zero-capacity
/// filter still has somewhere to put its bits.
pub const MIN_TABLE_BITS: usize = TABLE_ALIGN_BITS;

/// Most hash functions a filter may use.
pub const MAX_NUM_HASHES: usize = 64;

pub(crate) fn hash_murmur32(key: &[u8], seed: u32) -> u32 {
    let mut cursor = Cursor::new(key);
    murmur3_32(&mut cursor, seed).expect("Failed to compute Murmur3 hash")
}

pub(crate) fn hash_fnv64(seed: u64, key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write_u64(seed);
    hasher.write(key);
    hasher.finish()
}

/// Placement hash of an object name, as stored in [`crate::ObjectId`].
pub fn object_hash(name: &[u8]) -> u32 {
    hash_murmur32(name, 0)
}

/// Computes the `num_hashes` bit positions for `key` in a table of
/// `table_size` bits.
///
/// Double hashing: `h1 + i * h2`, with `h1` from murmur3 and `h2` from FNV,
/// both keyed by `seed` so that two filters with the same seed agree on
/// every position.
pub fn bloom_indices(
    key: u32,
    seed: u64,
    num_hashes: usize,
    table_size: usize,
) -> impl Iterator<Item = usize> {
    let bytes = key.to_le_bytes();
    let h1 = hash_murmur32(&bytes, (seed ^ (seed >> 32)) as u32) as u64;
    // odd stride so consecutive indices never collapse onto one bit
    let h2 = hash_fnv64(seed, &bytes) | 1;
    let table_size = table_size.max(1) as u64;
    (0..num_hashes as u64).map(move |i| {
        (h1.wrapping_add(i.wrapping_mul(h2)) % table_size) as usize
    })
}

pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let bits = ((-(n as f64) * fpr.ln()) / (ln2 * ln2)).ceil() as usize;
    bits.max(MIN_TABLE_BITS)
        .checked_next_multiple_of(TABLE_ALIGN_BITS)
        .unwrap_or(usize::MAX - usize::MAX % TABLE_ALIGN_BITS)
}

pub fn optimal_num_hashes(n: usize, m: usize) -> usize {
    if n == 0 {
        return 1;
    }
    (((m as f64 / n as f64) * std::f64::consts::LN_2).round() as usize)
        .clamp(1, MAX_NUM_HASHES)
}
