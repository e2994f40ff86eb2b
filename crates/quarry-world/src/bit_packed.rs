//! Fixed-width integer array packed into `u64` words.
//!
//! Entries never straddle a word boundary: each word holds `64 / bits`
//! entries starting at bit 0, and any leftover high bits are padding. This is
//! the layout paletted containers use on the wire, so decoded data arrays can
//! be adopted without repacking.

use crate::error::DecodeError;

/// Widest entry this array stores.
pub const MAX_BITS: u8 = 32;

/// A compact array where each element is stored using a fixed number of bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitPackedArray {
    /// Packed words.
    data: Vec<u64>,
    /// Bits per element (0 for an array whose elements are all zero).
    bits: u8,
    /// Total number of logical elements.
    len: usize,
}

impl BitPackedArray {
    /// Creates a new array with `len` elements, all initialized to zero.
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(bits <= MAX_BITS, "bits must be at most {MAX_BITS}");
        Self {
            data: vec![0u64; Self::words_for(bits, len)],
            bits,
            len,
        }
    }

    /// Adopts words read off the wire, checking the word count.
    pub fn from_raw(bits: u8, len: usize, data: Vec<u64>) -> Result<Self, DecodeError> {
        if bits > MAX_BITS {
            return Err(DecodeError::InvalidBitsPerEntry(bits));
        }
        let expected = Self::words_for(bits, len);
        if data.len() != expected {
            return Err(DecodeError::DataLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, bits, len })
    }

    /// Number of words needed for `len` entries of `bits` each.
    pub fn words_for(bits: u8, len: usize) -> usize {
        if bits == 0 {
            return 0;
        }
        let per_word = 64 / usize::from(bits);
        len.div_ceil(per_word)
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> u32 {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return 0;
        }
        let (word, shift) = self.locate(index);
        ((self.data[word] >> shift) & self.mask()) as u32
    }

    /// Sets the value at the given index.
    pub fn set(&mut self, index: usize, value: u32) {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            debug_assert_eq!(value, 0, "zero-width array only stores 0");
            return;
        }
        debug_assert!(
            u64::from(value) <= self.mask(),
            "value {value} exceeds {}-bit capacity",
            self.bits
        );
        let (word, shift) = self.locate(index);
        let mask = self.mask();
        self.data[word] &= !(mask << shift);
        self.data[word] |= (u64::from(value) & mask) << shift;
    }

    /// Copies every element into a new array of a different width.
    ///
    /// The caller guarantees every stored value fits in `bits`.
    pub fn repacked(&self, bits: u8) -> Self {
        let mut out = Self::new(bits, self.len);
        if self.bits > 0 && bits > 0 {
            for i in 0..self.len {
                out.set(i, self.get(i));
            }
        }
        out
    }

    /// Returns the number of bits per element.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the size of the backing storage in bytes.
    pub fn storage_bytes(&self) -> usize {
        self.data.len() * 8
    }

    /// Returns the raw packed words.
    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    fn locate(&self, index: usize) -> (usize, u32) {
        let per_word = 64 / usize::from(self.bits);
        let word = index / per_word;
        let shift = ((index % per_word) * usize::from(self.bits)) as u32;
        (word, shift)
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }
}
