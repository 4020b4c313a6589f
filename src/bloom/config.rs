use crate::error::{HitSetError, Result};
use crate::hash::{optimal_bit_vector_size, optimal_num_hashes};

/// Largest bloom table, in bits, the wire format can describe.
pub const MAX_TABLE_BITS: usize = u32::MAX as usize;

/// Table geometry derived from a target capacity and false positive rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSizing {
    /// Number of bits in the table, always a whole number of 64-bit words.
    pub table_size: usize,
    pub num_hashes: usize,
}

impl FilterSizing {
    /// Fails with `InvalidConfig` unless `false_positive` is in (0, 1) and
    /// the resulting table fits the wire format.
    pub fn new(target_size: u64, false_positive: f64) -> Result<Self> {
        if !(false_positive > 0.0 && false_positive < 1.0) {
            return Err(HitSetError::InvalidConfig(format!(
                "False positive probability must be between 0 and 1, got {false_positive}"
            )));
        }
        let capacity = usize::try_from(target_size).unwrap_or(usize::MAX);
        let table_size = optimal_bit_vector_size(capacity, false_positive);
        if table_size > MAX_TABLE_BITS {
            return Err(HitSetError::InvalidConfig(format!(
                "Target size {target_size} at {false_positive} needs {table_size} bits, more than a bloom table holds"
            )));
        }
        let num_hashes = optimal_num_hashes(capacity, table_size);
        Ok(Self {
            table_size,
            num_hashes,
        })
    }
}

impl TryFrom<(u64, f64)> for FilterSizing {
    type Error = HitSetError;

    fn try_from((target_size, false_positive): (u64, f64)) -> Result<Self> {
        Self::new(target_size, false_positive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_fpp_needs_more_bits() {
        let loose = FilterSizing::new(1000, 0.1).unwrap();
        let tight = FilterSizing::new(1000, 0.001).unwrap();
        assert!(tight.table_size > loose.table_size);
        assert!(tight.num_hashes > loose.num_hashes);
    }

    #[test]
    fn test_zero_target() {
        let sizing = FilterSizing::try_from((0, 0.05)).unwrap();
        assert_eq!(sizing.table_size, 64);
        assert_eq!(sizing.num_hashes, 1);
    }

    #[test]
    fn test_rejects_unusable_rates() {
        for bad in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(matches!(
                FilterSizing::new(10, bad),
                Err(HitSetError::InvalidConfig(_))
            ));
        }
        assert!(FilterSizing::new(u64::MAX, 1e-6).is_err());
    }
}
