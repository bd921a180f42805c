//! Bloom filter
//!
//! Constant-time negative evidence for memtable membership:
//!
//! - any bit unset → the key is DEFINITELY NOT in the memtable
//! - all bits set → the key is PROBABLY there (false positive possible)
//!
//! Sized from the expected capacity `n` and target error rate `e` with the
//! standard optimal formulas:
//!
//! ```text
//! m = -n * ln(e) / (ln 2)^2      (bits)
//! k = (m / n) * ln 2             (hash functions)
//! ```
//!
//! Rather than k independent hash functions, double hashing is used:
//! `h_i = h1 + i * h2 (mod m)`, with `h1`/`h2` the two halves of a single
//! 128-bit xxh3 hash.

use xxhash_rust::xxh3::xxh3_128;

/// Probabilistic set membership test with no false negatives
pub struct BloomFilter {
    /// Bit array, packed into u64 words
    bits: Vec<u64>,

    /// Total number of addressable bits (m)
    num_bits: u64,

    /// Number of probes per key (k)
    num_hashes: u32,
}

impl BloomFilter {
    /// Create a filter sized for `capacity` keys at the given error rate.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or `error_rate` is not in (0, 1).
    pub fn new(capacity: usize, error_rate: f64) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        assert!(
            error_rate > 0.0 && error_rate < 1.0,
            "error rate must be in (0, 1)"
        );

        let n = capacity as f64;
        let m = (-n * error_rate.ln() / std::f64::consts::LN_2.powi(2)).ceil();
        let k = (m / n * std::f64::consts::LN_2).ceil();

        let num_bits = (m as u64).max(64);
        let num_hashes = (k as u32).max(1);
        let words = num_bits.div_ceil(64) as usize;

        Self {
            bits: vec![0u64; words],
            num_bits,
            num_hashes,
        }
    }

    /// Insert a key into the filter.
    pub fn insert(&mut self, key: &str) {
        let (h1, h2) = Self::hash_pair(key);
        for i in 0..self.num_hashes {
            let pos = self.probe(h1, h2, i);
            self.bits[(pos / 64) as usize] |= 1 << (pos % 64);
        }
    }

    /// Whether the key MIGHT be in the set. `false` is definitive.
    pub fn contains(&self, key: &str) -> bool {
        let (h1, h2) = Self::hash_pair(key);
        for i in 0..self.num_hashes {
            let pos = self.probe(h1, h2, i);
            if self.bits[(pos / 64) as usize] >> (pos % 64) & 1 == 0 {
                return false;
            }
        }
        true
    }

    /// Number of addressable bits (m)
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of probes per key (k)
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    fn hash_pair(key: &str) -> (u64, u64) {
        let h = xxh3_128(key.as_bytes());
        (h as u64, (h >> 64) as u64)
    }

    fn probe(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_keys_are_reported_present() {
        let mut bloom = BloomFilter::new(100, 0.01);
        bloom.insert("apple");
        assert!(bloom.contains("apple"));
        assert!(!bloom.contains("banana"));
    }

    #[test]
    fn sizing_follows_the_optimal_formulas() {
        // n = 10_000, e = 0.01 → m ≈ 95_851 bits, k ≈ 7
        let bloom = BloomFilter::new(10_000, 0.01);
        assert!((95_000..97_000).contains(&bloom.num_bits()));
        assert_eq!(bloom.num_hashes(), 7);
    }
}
