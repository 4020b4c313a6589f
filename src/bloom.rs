//! Compressible bloom filter used by the bloom hit set.
pub mod config;
pub mod filter;

pub use config::FilterSizing;
pub use filter::{BloomFilterDump, CompressibleBloomFilter};
