//! 16-bit compressed pointers into the literal store.
//!
//! Grounded on `rcs-cpointer.h`: a compressed pointer is a chunk-list index
//! plus an intra-chunk offset, small enough that every literal-pool entry and
//! every `previous`-chain link fits in 16 bits.

/// Records per chunk. `RECORDS_PER_CHUNK` is a power of two so the intra
/// offset is a plain bit-mask rather than a division.
pub const RECORDS_PER_CHUNK: usize = 64;
const INTRA_BITS: u32 = 6; // log2(RECORDS_PER_CHUNK)
const INTRA_MASK: u16 = (RECORDS_PER_CHUNK as u16) - 1;

/// Reserved sentinel. No valid `(chunk, intra)` pair compresses to this
/// value: chunk indices are kept below `MAX_CHUNKS` so the all-ones pattern
/// never arises from real data.
const NULL_VALUE: u16 = u16::MAX;

/// Upper bound on live chunks, chosen so `NULL_VALUE` is unreachable while
/// keeping capacity close to the spec's "~65534 live records" figure.
pub const MAX_CHUNKS: usize = 1023;
pub const CAPACITY: usize = MAX_CHUNKS * RECORDS_PER_CHUNK;

/// A compressed pointer: `chunk_index << INTRA_BITS | intra_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompressedPointer(u16);

impl CompressedPointer {
    pub const NULL: CompressedPointer = CompressedPointer(NULL_VALUE);

    pub fn is_null(self) -> bool {
        self.0 == NULL_VALUE
    }

    /// Compress a `(chunk, intra)` coordinate. Returns `None` if the chunk
    /// index would collide with the reserved null pattern or overflow the
    /// 16-bit representation.
    pub fn compress(chunk: usize, intra: usize) -> Option<CompressedPointer> {
        if chunk >= MAX_CHUNKS || intra >= RECORDS_PER_CHUNK {
            return None;
        }
        let value = ((chunk as u16) << INTRA_BITS) | (intra as u16 & INTRA_MASK);
        if value == NULL_VALUE {
            return None;
        }
        Some(CompressedPointer(value))
    }

    /// Decompress into `(chunk, intra)`. Undefined ordering for `NULL`; call
    /// sites must check [`is_null`](Self::is_null) first, matching the
    /// original's debug-asserted `decompress`.
    pub fn decompress(self) -> (usize, usize) {
        debug_assert!(!self.is_null(), "decompress called on a null compressed pointer");
        let chunk = (self.0 >> INTRA_BITS) as usize;
        let intra = (self.0 & INTRA_MASK) as usize;
        (chunk, intra)
    }

    /// Flatten to a single arena index, for the `Vec`-of-chunks storage the
    /// literal store actually uses internally.
    pub fn as_flat_index(self) -> Option<usize> {
        if self.is_null() {
            return None;
        }
        let (chunk, intra) = self.decompress();
        Some(chunk * RECORDS_PER_CHUNK + intra)
    }

    pub fn from_flat_index(index: usize) -> Option<CompressedPointer> {
        CompressedPointer::compress(index / RECORDS_PER_CHUNK, index % RECORDS_PER_CHUNK)
    }

    /// Raw 16-bit encoding, as it would be written into a literal pool slot
    /// or a record's previous-link field.
    pub fn to_bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> CompressedPointer {
        CompressedPointer(bits)
    }
}

impl Default for CompressedPointer {
    fn default() -> Self {
        CompressedPointer::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_round_trips() {
        assert!(CompressedPointer::NULL.is_null());
        assert_eq!(CompressedPointer::NULL.as_flat_index(), None);
    }

    #[test]
    fn compress_decompress_round_trip() {
        let cp = CompressedPointer::compress(3, 17).unwrap();
        assert_eq!(cp.decompress(), (3, 17));
        assert_eq!(cp.as_flat_index(), Some(3 * RECORDS_PER_CHUNK + 17));
    }

    #[test]
    fn flat_index_round_trip() {
        for flat in [0usize, 1, 63, 64, 65, CAPACITY - 1] {
            let cp = CompressedPointer::from_flat_index(flat).unwrap();
            assert_eq!(cp.as_flat_index(), Some(flat));
        }
    }

    #[test]
    fn chunk_overflow_rejected() {
        assert!(CompressedPointer::compress(MAX_CHUNKS, 0).is_none());
    }
}
