//! Literal store record layout.
//!
//! Grounded on `rcs-records.cpp` / `rcs-globals.h`: every record starts with
//! a 4-bit type tag plus a size field, and (for types that participate in
//! the insertion-order chain) a previous-record compressed pointer. Charset
//! records additionally carry a precomputed hash.
//!
//! The wire/header-bit-layout this module's `pack_header`/`unpack_header`
//! produce is the one external consumers (the VM, `--debug-bytecode`) are
//! allowed to depend on; the in-memory `Record` enum itself is free to use
//! ordinary Rust ownership, since nothing outside this crate ever sees it
//! directly.

use super::cpointer::CompressedPointer;

/// 4-bit record type tag, per spec.md section 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Charset = 0,
    MagicString = 1,
    MagicStringEx = 2,
    Number = 3,
    Free = 4,
}

impl RecordKind {
    pub fn from_bits(bits: u8) -> Option<RecordKind> {
        match bits {
            0 => Some(RecordKind::Charset),
            1 => Some(RecordKind::MagicString),
            2 => Some(RecordKind::MagicStringEx),
            3 => Some(RecordKind::Number),
            4 => Some(RecordKind::Free),
            _ => None,
        }
    }

    /// Header size in 4-byte units. Charset records need a second header
    /// word for the hash; the rest share the compact single-word header
    /// (still followed by a previous-link word, see [`pack_header`]).
    pub fn header_size_units(self) -> u16 {
        match self {
            RecordKind::Charset => 2,
            RecordKind::MagicString | RecordKind::MagicStringEx | RecordKind::Number | RecordKind::Free => 2,
        }
    }
}

/// One literal-store record. `prev` threads every live record (of any kind)
/// through the insertion-order chain described in spec.md section 3.1.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub prev: CompressedPointer,
    pub payload: RecordPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    /// A deduplicated UTF-8 byte sequence plus its precomputed hash.
    Charset { bytes: Vec<u8>, hash: u16 },
    /// A built-in interned string, referenced by small id (see `literals::magic`).
    MagicString { id: u16 },
    /// Same, but indexing a host-supplied table rather than the built-in one.
    MagicStringEx { id: u16 },
    /// An IEEE-754 double. Not deduplicated against NaN (see `Record::is_equal`).
    Number(f64),
    /// A coalesced hole; `size_units` is the span reclaimed, in 4-byte units.
    Free { size_units: u16 },
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match &self.payload {
            RecordPayload::Charset { .. } => RecordKind::Charset,
            RecordPayload::MagicString { .. } => RecordKind::MagicString,
            RecordPayload::MagicStringEx { .. } => RecordKind::MagicStringEx,
            RecordPayload::Number(_) => RecordKind::Number,
            RecordPayload::Free { .. } => RecordKind::Free,
        }
    }

    /// Size of this record, in 4-byte units, including its header —
    /// `rcs_record_get_size`.
    pub fn size_units(&self) -> u16 {
        let header = self.kind().header_size_units();
        match &self.payload {
            RecordPayload::Charset { bytes, .. } => {
                header + ceil_div_4(bytes.len() as u32) as u16
            }
            RecordPayload::Number(_) => header + (std::mem::size_of::<f64>() as u16 / 4),
            RecordPayload::MagicString { .. } | RecordPayload::MagicStringEx { .. } => header,
            RecordPayload::Free { size_units } => *size_units,
        }
    }

    /// Padding bytes (0-3) between the charset payload and the next 4-byte
    /// boundary — `rcs_record_get_alignment_bytes_count`.
    pub fn alignment_bytes(&self) -> u8 {
        match &self.payload {
            RecordPayload::Charset { bytes, .. } => {
                let rem = bytes.len() % 4;
                if rem == 0 { 0 } else { (4 - rem) as u8 }
            }
            _ => 0,
        }
    }

    /// Hash accessor — O(1) header field read, per spec.md 4.1.
    pub fn hash(&self) -> Option<u16> {
        match &self.payload {
            RecordPayload::Charset { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    /// Record-to-bytes equality, `rcs_record_is_equal_utf8`: length check
    /// first, then byte-for-byte comparison.
    pub fn equals_utf8(&self, bytes: &[u8]) -> bool {
        match &self.payload {
            RecordPayload::Charset { bytes: own, .. } => own.as_slice() == bytes,
            _ => false,
        }
    }

    /// Record-to-record equality, `rcs_record_is_equal`.
    pub fn is_equal(&self, other: &Record) -> bool {
        match (&self.payload, &other.payload) {
            (RecordPayload::Charset { bytes: a, hash: ha }, RecordPayload::Charset { bytes: b, hash: hb }) => {
                ha == hb && a == b
            }
            (RecordPayload::MagicString { id: a }, RecordPayload::MagicString { id: b }) => a == b,
            (RecordPayload::MagicStringEx { id: a }, RecordPayload::MagicStringEx { id: b }) => a == b,
            // NaN is deliberately not required to dedup (spec.md section 9, Open Questions).
            (RecordPayload::Number(a), RecordPayload::Number(b)) => a == b,
            _ => false,
        }
    }
}

fn ceil_div_4(n: u32) -> u32 {
    (n + 3) / 4
}

/// Hash used by the charset dedup path: FNV-1a over the raw bytes, truncated
/// to 16 bits to match the header's hash field width.
pub fn hash_bytes(bytes: &[u8]) -> u16 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    ((hash >> 16) ^ (hash & 0xFFFF)) as u16
}

/// Pack a record's header into the two 32-bit words the external byte-code
/// contract fixes: word0 carries `{type:4, size:12, alignment:2}`, word1
/// carries `{prev:16, hash:16}` (hash is 0 for non-charset records). This is
/// the bit-exact representation [`Record`] would serialize to; nothing in
/// this crate actually stores records this way, since Rust's own enum
/// representation is both safer and sufficient for an in-process store.
pub fn pack_header(record: &Record) -> (u32, u32) {
    let kind = record.kind() as u32;
    let size = record.size_units() as u32 & 0x0FFF;
    let align = record.alignment_bytes() as u32 & 0x3;
    let word0 = kind | (size << 4) | (align << 16);
    let hash = record.hash().unwrap_or(0) as u32;
    let word1 = (record.prev.to_bits() as u32) | (hash << 16);
    (word0, word1)
}

pub fn unpack_header(word0: u32, word1: u32) -> Option<(RecordKind, u16, u8, CompressedPointer, u16)> {
    let kind = RecordKind::from_bits((word0 & 0xF) as u8)?;
    let size = ((word0 >> 4) & 0x0FFF) as u16;
    let align = ((word0 >> 16) & 0x3) as u8;
    let prev = CompressedPointer::from_bits((word1 & 0xFFFF) as u16);
    let hash = ((word1 >> 16) & 0xFFFF) as u16;
    Some((kind, size, align, prev, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_for_charset() {
        let record = Record {
            prev: CompressedPointer::compress(1, 2).unwrap(),
            payload: RecordPayload::Charset { bytes: b"hello".to_vec(), hash: hash_bytes(b"hello") },
        };
        let (w0, w1) = pack_header(&record);
        let (kind, size, align, prev, hash) = unpack_header(w0, w1).unwrap();
        assert_eq!(kind, RecordKind::Charset);
        assert_eq!(size, record.size_units());
        assert_eq!(align, record.alignment_bytes());
        assert_eq!(prev, record.prev);
        assert_eq!(hash, hash_bytes(b"hello"));
    }

    #[test]
    fn hash_agrees_with_equal_bytes() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let a = Record { prev: CompressedPointer::NULL, payload: RecordPayload::Number(f64::NAN) };
        let b = Record { prev: CompressedPointer::NULL, payload: RecordPayload::Number(f64::NAN) };
        assert!(!a.is_equal(&b));
    }
}
