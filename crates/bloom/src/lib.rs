//! # Bloom Filter
//!
//! Probabilistic membership set over the keys of one SSTable.
//!
//! A negative answer from [`BloomFilter::might_contain`] is definitive (no
//! false negatives); a positive answer may be wrong with roughly the target
//! false-positive rate chosen at construction.
//!
//! The read path consults the filter right after the min/max range check, so a
//! rejected key costs no disk I/O at all.
//!
//! ## On-disk layout
//!
//! Bits are persisted packed, eight positions per byte, least significant bit
//! first:
//!
//! ```text
//! [num_bits: u64 LE][num_hashes: u32 LE][bits_len: u32 LE][bits: bits_len bytes]
//! ```
//!
//! `bits_len` is always `ceil(num_bits / 8)`.
//!
//! ## Example
//!
//! ```rust
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(1000, 0.01);
//! bf.add(b"hello");
//! assert!(bf.might_contain(b"hello"));
//! ```
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Target false-positive rate used when the caller has no preference.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Largest bit array, in bytes, that [`BloomFilter::read_from`] accepts (128 MiB).
///
/// Writers check [`BloomFilter::serialized_size_for`] against it before
/// persisting anything, so every filter they write can be read back.
pub const MAX_BLOOM_BYTES: usize = 128 * 1024 * 1024;

/// Size of the fixed header in front of the bit array.
const HEADER_BYTES: usize = 8 + 4 + 4;

/// A fixed-size bit array probed by `k` hash functions.
///
/// Positions come from double hashing, `h(i) = h1 + i * h2`, with `h1` and
/// `h2` taken from FNV-1a under two different offset bases.
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Sizes a filter for `expected_items` keys at `false_positive_rate`.
    ///
    /// `m = ceil(-n ln p / ln²2)` bits (at least 8) and
    /// `k = ceil(m / n · ln 2)` hashes (at least 1). An `expected_items` of
    /// zero is sized as one.
    ///
    /// # Panics
    ///
    /// Panics if `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let (m, k) = sizing(expected_items, false_positive_rate);
        Self {
            bits: vec![0u8; byte_len(m)],
            num_bits: m,
            num_hashes: k,
        }
    }

    /// Persisted size of the filter [`BloomFilter::new`] would build for the
    /// same arguments, without allocating it.
    ///
    /// # Panics
    ///
    /// Panics if `false_positive_rate` is not in `(0, 1)`.
    #[must_use]
    pub fn serialized_size_for(expected_items: usize, false_positive_rate: f64) -> usize {
        let (m, _) = sizing(expected_items, false_positive_rate);
        HEADER_BYTES.saturating_add(byte_len(m))
    }

    /// Sets the `k` bit positions derived from `key`.
    pub fn add(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let idx = self.bit_index(h1, h2, i);
            self.bits[(idx / 8) as usize] |= 1 << (idx % 8);
        }
    }

    /// `false` means `key` was never added. `true` means it probably was.
    #[must_use]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        (0..self.num_hashes).all(|i| {
            let idx = self.bit_index(h1, h2, i);
            (self.bits[(idx / 8) as usize] >> (idx % 8)) & 1 == 1
        })
    }

    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Number of bits currently set.
    #[must_use]
    pub fn count_ones(&self) -> u64 {
        self.bits.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    /// Expected false-positive rate after `items` distinct insertions:
    /// `(1 - e^(-k·n/m))^k`.
    #[must_use]
    pub fn estimated_false_positive_rate(&self, items: usize) -> f64 {
        let k = f64::from(self.num_hashes);
        let exponent = -k * items as f64 / self.num_bits as f64;
        (1.0 - exponent.exp()).powf(k)
    }

    /// Size of the persisted form in bytes.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        HEADER_BYTES + self.bits.len()
    }

    /// Writes the filter in the layout described in the crate docs.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.num_bits)?;
        w.write_u32::<LittleEndian>(self.num_hashes)?;
        w.write_u32::<LittleEndian>(self.bits.len() as u32)?;
        w.write_all(&self.bits)?;
        Ok(())
    }

    /// Reads a filter previously written by [`BloomFilter::write_to`].
    ///
    /// Rejects filters whose bit array is larger than 128 MiB, whose
    /// `bits_len` disagrees with `num_bits`, or that declare zero bits or
    /// zero hashes.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let num_bits = r.read_u64::<LittleEndian>()?;
        let num_hashes = r.read_u32::<LittleEndian>()?;
        let bits_len = r.read_u32::<LittleEndian>()? as usize;

        if bits_len > MAX_BLOOM_BYTES {
            return Err(invalid(format!("bloom filter too large: {} bytes", bits_len)));
        }
        if num_bits == 0 || num_hashes == 0 {
            return Err(invalid("bloom filter has zero bits or zero hashes".to_string()));
        }
        if byte_len(num_bits) != bits_len {
            return Err(invalid(format!(
                "bloom filter declares {} bits but carries {} bytes",
                num_bits, bits_len
            )));
        }

        let mut bits = vec![0u8; bits_len];
        r.read_exact(&mut bits)?;

        Ok(Self {
            bits,
            num_bits,
            num_hashes,
        })
    }

    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % self.num_bits
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("ones", &self.count_ones())
            .finish()
    }
}

/// Bit count `m` and hash count `k` for `n` expected items at rate `p`.
fn sizing(expected_items: usize, false_positive_rate: f64) -> (u64, u32) {
    assert!(
        false_positive_rate > 0.0 && false_positive_rate < 1.0,
        "false_positive_rate must be in (0, 1)"
    );

    let n = expected_items.max(1) as f64;
    let ln2 = std::f64::consts::LN_2;
    let m = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil() as u64;
    let m = m.max(8);

    let k = ((m as f64 / n) * ln2).ceil() as u32;
    (m, k.max(1))
}

fn byte_len(num_bits: u64) -> usize {
    num_bits.div_ceil(8) as usize
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn hash_pair(key: &[u8]) -> (u64, u64) {
    (
        fnv1a_64(key, 0xcbf2_9ce4_8422_2325),
        fnv1a_64(key, 0x517c_c1b7_2722_0a95),
    )
}

/// FNV-1a 64-bit hash with a configurable offset basis.
fn fnv1a_64(data: &[u8], basis: u64) -> u64 {
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    data.iter().fold(basis, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests;
