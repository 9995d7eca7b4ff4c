//! Bloom filter for fast chunk existence checks
//!
//! A space-efficient probabilistic data structure for testing set membership.
//! May return false positives but never false negatives.

use crate::error::{Error, Result};
use bitvec::prelude::*;
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

/// Bloom filter for chunk content ID membership testing
#[derive(Debug, Clone)]
pub struct BloomFilter {
    /// Bit array for the filter
    bits: BitVec<u8, Msb0>,
    /// Number of hash functions
    num_hashes: u32,
    /// Number of elements inserted (for statistics)
    num_elements: u32,
}

impl BloomFilter {
    /// Create a new Bloom filter with specified capacity and false positive rate
    ///
    /// # Arguments
    /// * `expected_elements` - Expected number of elements to insert
    /// * `false_positive_rate` - Desired false positive rate (e.g., 0.01 for 1%)
    ///
    /// # Example
    /// ```
    /// use orbit_core_starmap::BloomFilter;
    ///
    /// // Create filter for 10,000 elements with 1% false positive rate
    /// let filter = BloomFilter::new(10_000, 0.01);
    /// ```
    pub fn new(expected_elements: u32, false_positive_rate: f64) -> Self {
        // Calculate optimal bit array size
        // m = -n * ln(p) / (ln(2)^2)
        let num_bits = Self::optimal_num_bits(expected_elements, false_positive_rate);

        // Calculate optimal number of hash functions
        // k = (m/n) * ln(2)
        let num_hashes = Self::optimal_num_hashes(num_bits, expected_elements);

        Self {
            bits: bitvec![u8, Msb0; 0; num_bits as usize],
            num_hashes,
            num_elements: 0,
        }
    }

    /// Create a Bloom filter from serialized data
    pub fn from_bytes(
        data: &[u8],
        num_hashes: u32,
        num_elements: u32,
        num_bits: usize,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::bloom_filter("Empty bloom filter data"));
        }

        // Create BitVec from the data and truncate to exact bit length
        let mut bits = BitVec::from_vec(data.to_vec());
        bits.truncate(num_bits);

        Ok(Self {
            bits,
            num_hashes,
            num_elements,
        })
    }

    /// Insert an element into the Bloom filter
    ///
    /// # Example
    /// ```
    /// use orbit_core_starmap::BloomFilter;
    ///
    /// let mut filter = BloomFilter::new(1000, 0.01);
    /// let content_id = [0u8; 32];
    /// filter.insert(&content_id);
    /// assert!(filter.contains(&content_id));
    /// ```
    pub fn insert<T: Hash>(&mut self, item: &T) {
        let hashes = self.hash(item);
        for hash in hashes {
            let bit_index = (hash % self.bits.len() as u64) as usize;
            self.bits.set(bit_index, true);
        }
        self.num_elements += 1;
    }

    /// Check if an element might be in the set
    ///
    /// Returns `true` if the element might be present (may be false positive).
    /// Returns `false` if the element is definitely not present (no false negatives).
    pub fn contains<T: Hash>(&self, item: &T) -> bool {
        let hashes = self.hash(item);
        for hash in hashes {
            let bit_index = (hash % self.bits.len() as u64) as usize;
            if !self.bits[bit_index] {
                return false;
            }
        }
        true
    }

    /// Serialize the Bloom filter to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.as_raw_slice().to_vec()
    }

    /// Get the number of bits in the filter
    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    /// Get the number of hash functions
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the number of elements inserted
    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    /// Calculate the estimated false positive rate based on current state
    pub fn estimated_false_positive_rate(&self) -> f64 {
        if self.num_elements == 0 {
            return 0.0;
        }

        // p â‰ˆ (1 - e^(-k*n/m))^k
        let m = self.bits.len() as f64;
        let n = self.num_elements as f64;
        let k = self.num_hashes as f64;

        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Generate hash values for an item using double hashing
    ///
    /// Uses two independent hash functions (SipHash with different keys)
    /// to generate k hash values: h_i = h1 + i*h2
    fn hash<T: Hash>(&self, item: &T) -> Vec<u64> {
        let mut hashes = Vec::with_capacity(self.num_hashes as usize);

        // First hash function
        let mut hasher1 = SipHasher13::new_with_keys(0, 0);
        item.hash(&mut hasher1);
        let h1 = hasher1.finish();

        // Second hash function (different key)
        let mut hasher2 = SipHasher13::new_with_keys(1, 1);
        item.hash(&mut hasher2);
        let h2 = hasher2.finish();

        // Generate k hash values using double hashing
        for i in 0..self.num_hashes {
            hashes.push(h1.wrapping_add((i as u64).wrapping_mul(h2)));
        }

        hashes
    }

    /// Calculate optimal number of bits for the filter
    fn optimal_num_bits(expected_elements: u32, false_positive_rate: f64) -> u32 {
        let n = expected_elements as f64;
        let p = false_positive_rate;
        let ln2_squared = std::f64::consts::LN_2.powi(2);

        let m = -(n * p.ln()) / ln2_squared;
        m.ceil() as u32
    }

    /// Calculate optimal number of hash functions
    fn optimal_num_hashes(num_bits: u32, expected_elements: u32) -> u32 {
        let m = num_bits as f64;
        let n = expected_elements as f64;

        let k = (m / n) * std::f64::consts::LN_2;
        k.ceil().max(1.0) as u32
    }
}
