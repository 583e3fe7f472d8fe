//! The content-addressed literal store: spec.md sections 3.1 and 4.1.
//!
//! A process-wide, append-only record set, shared by every function compiled
//! against it. Records are never mutated after creation and are released en
//! masse at teardown — there is no per-record reference counting.

use super::cpointer::{CompressedPointer, CAPACITY, RECORDS_PER_CHUNK};
use super::magic;
use super::record::{hash_bytes, Record, RecordPayload};
use crate::error::{Error, ErrorKind, Span};

/// A process-wide, content-addressed record set.
///
/// Chunks are allocated on demand; within a chunk, slots are reused only via
/// [`LiteralStore::cleanup`] (which clears live records but keeps the
/// backing chunks — spec.md's `cleanup` vs `finalize` distinction).
pub struct LiteralStore {
    chunks: Vec<Vec<Option<Record>>>,
    /// Compressed pointer to the most recently inserted live record; walking
    /// `prev` from here visits every live record newest-first.
    head: CompressedPointer,
    live_count: usize,
}

impl LiteralStore {
    /// `init()` — spec.md 4.1.
    pub fn new() -> Self {
        LiteralStore { chunks: Vec::new(), head: CompressedPointer::NULL, live_count: 0 }
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// `cleanup()` — empties records but keeps the backing chunks allocated,
    /// so a subsequent parse reuses the existing capacity without the
    /// allocator churn `finalize` would force.
    pub fn cleanup(&mut self) {
        for chunk in &mut self.chunks {
            for slot in chunk.iter_mut() {
                *slot = None;
            }
        }
        self.head = CompressedPointer::NULL;
        self.live_count = 0;
    }

    /// `finalize()` — releases the backing chunks entirely.
    pub fn finalize(&mut self) {
        self.chunks.clear();
        self.head = CompressedPointer::NULL;
        self.live_count = 0;
    }

    /// `decompress(cp) -> record*`, debug-asserted live in the original;
    /// here a `None` result is the closest safe equivalent to that assert
    /// firing.
    pub fn decompress(&self, cp: CompressedPointer) -> Option<&Record> {
        if cp.is_null() {
            return None;
        }
        let flat = cp.as_flat_index()?;
        self.chunks.get(flat / RECORDS_PER_CHUNK)?.get(flat % RECORDS_PER_CHUNK)?.as_ref()
    }

    fn push_record(&mut self, payload: RecordPayload, span: Span) -> Result<CompressedPointer, Error> {
        if self.live_count >= CAPACITY {
            return Err(Error::parse(ErrorKind::OutOfMemory, span));
        }
        let record = Record { prev: self.head, payload };

        // Find an empty slot, growing the chunk list if every existing
        // chunk is full.
        for (chunk_idx, chunk) in self.chunks.iter_mut().enumerate() {
            if let Some(intra) = chunk.iter().position(|s| s.is_none()) {
                chunk[intra] = Some(record);
                let cp = CompressedPointer::compress(chunk_idx, intra)
                    .ok_or_else(|| Error::parse(ErrorKind::OutOfMemory, span))?;
                self.head = cp;
                self.live_count += 1;
                return Ok(cp);
            }
        }
        let chunk_idx = self.chunks.len();
        let mut new_chunk = vec![None; RECORDS_PER_CHUNK];
        new_chunk[0] = Some(record);
        self.chunks.push(new_chunk);
        let cp = CompressedPointer::compress(chunk_idx, 0)
            .ok_or_else(|| Error::parse(ErrorKind::OutOfMemory, span))?;
        self.head = cp;
        self.live_count += 1;
        Ok(cp)
    }

    /// `find_or_create_from_utf8(bytes, size) -> record*`.
    ///
    /// Magic strings short-circuit before any charset record is minted.
    /// Otherwise the existing chain is scanned hash-first, then
    /// byte-compared, per spec.md 3.1's dedup invariant.
    pub fn find_or_create_from_utf8(&mut self, bytes: &[u8], span: Span) -> Result<CompressedPointer, Error> {
        if let Some(id) = magic::lookup(bytes) {
            tracing::trace!(id, "literal store: magic string hit");
            return self.push_magic(id, span);
        }

        let hash = hash_bytes(bytes);
        let mut cursor = self.head;
        while !cursor.is_null() {
            let record = self.decompress(cursor).expect("live chain points to a live record");
            if let RecordPayload::Charset { bytes: existing, hash: existing_hash } = &record.payload {
                if *existing_hash == hash && existing.as_slice() == bytes {
                    tracing::trace!(len = bytes.len(), "literal store: charset dedup hit");
                    return Ok(cursor);
                }
            }
            cursor = record.prev;
        }

        tracing::trace!(len = bytes.len(), "literal store: inserting new charset record");
        self.push_record(RecordPayload::Charset { bytes: bytes.to_vec(), hash }, span)
    }

    fn push_magic(&mut self, id: u16, span: Span) -> Result<CompressedPointer, Error> {
        // Magic strings are still deduplicated by id — re-referencing
        // "length" twice yields the same record, same as a charset hit would.
        let mut cursor = self.head;
        while !cursor.is_null() {
            let record = self.decompress(cursor).expect("live chain points to a live record");
            if let RecordPayload::MagicString { id: existing } = &record.payload {
                if *existing == id {
                    return Ok(cursor);
                }
            }
            cursor = record.prev;
        }
        self.push_record(RecordPayload::MagicString { id }, span)
    }

    /// `find_or_create_from_number(x) -> record*`. Linear scan; NaN is
    /// deliberately excluded from dedup (spec.md section 9).
    pub fn find_or_create_from_number(&mut self, value: f64, span: Span) -> Result<CompressedPointer, Error> {
        if !value.is_nan() {
            let mut cursor = self.head;
            while !cursor.is_null() {
                let record = self.decompress(cursor).expect("live chain points to a live record");
                if let RecordPayload::Number(existing) = record.payload {
                    if existing == value {
                        tracing::trace!(value, "literal store: number dedup hit");
                        return Ok(cursor);
                    }
                }
                cursor = record.prev;
            }
        }
        tracing::trace!(value, "literal store: inserting new number record");
        self.push_record(RecordPayload::Number(value), span)
    }

    /// `equals(record, bytes, size)`.
    pub fn record_equals_utf8(&self, cp: CompressedPointer, bytes: &[u8]) -> bool {
        match self.decompress(cp) {
            Some(record) => match &record.payload {
                RecordPayload::MagicString { id } | RecordPayload::MagicStringEx { id } => {
                    magic::get(*id).map(|s| s.as_bytes() == bytes).unwrap_or(false)
                }
                _ => record.equals_utf8(bytes),
            },
            None => false,
        }
    }

    /// `equals(record, record)`.
    pub fn records_equal(&self, a: CompressedPointer, b: CompressedPointer) -> bool {
        if a == b {
            return true;
        }
        match (self.decompress(a), self.decompress(b)) {
            (Some(ra), Some(rb)) => ra.is_equal(rb),
            _ => false,
        }
    }

    /// `to_utf8(record, buf, buf_size) -> bytes*`.
    ///
    /// For charset records this copies into a caller-owned `Vec`; for magic
    /// strings it hands back the statically stored bytes without copying,
    /// matching the no-copy contract spec.md 4.1 describes.
    pub fn to_utf8(&self, cp: CompressedPointer) -> Option<std::borrow::Cow<'_, [u8]>> {
        let record = self.decompress(cp)?;
        match &record.payload {
            RecordPayload::Charset { bytes, .. } => Some(std::borrow::Cow::Borrowed(bytes.as_slice())),
            RecordPayload::MagicString { id } | RecordPayload::MagicStringEx { id } => {
                magic::get(*id).map(|s| std::borrow::Cow::Borrowed(s.as_bytes()))
            }
            RecordPayload::Number(n) => Some(std::borrow::Cow::Owned(format_number(*n).into_bytes())),
            RecordPayload::Free { .. } => None,
        }
    }

    /// `length_in_code_units(record)` — counts UTF-16 code units, so a
    /// character outside the BMP contributes 2.
    pub fn length_in_code_units(&self, cp: CompressedPointer) -> usize {
        match self.to_utf8(cp) {
            Some(bytes) => match std::str::from_utf8(&bytes) {
                Ok(s) => s.chars().map(|c| c.len_utf16()).sum(),
                Err(_) => 0,
            },
            None => 0,
        }
    }

    pub fn hash(&self, cp: CompressedPointer) -> Option<u16> {
        self.decompress(cp).and_then(|r| r.hash())
    }

    /// Iterate live records, oldest-first (reverses the newest-last chain).
    pub fn iter_oldest_first(&self) -> Vec<CompressedPointer> {
        let mut newest_first = Vec::with_capacity(self.live_count);
        let mut cursor = self.head;
        while !cursor.is_null() {
            newest_first.push(cursor);
            cursor = self.decompress(cursor).expect("live chain points to a live record").prev;
        }
        newest_first.reverse();
        newest_first
    }
}

impl Default for LiteralStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `number_to_utf8`-equivalent stringification, used when a number record is
/// compared against (or copied out as) UTF-8.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if value == 0.0 {
        if value.is_sign_negative() { "0".to_string() } else { "0".to_string() }
    } else {
        let mut s = format!("{}", value);
        if s.ends_with(".0") {
            s.truncate(s.len() - 2);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::default()
    }

    #[test]
    fn dedups_identical_strings() {
        let mut store = LiteralStore::new();
        let a = store.find_or_create_from_utf8(b"hello", span()).unwrap();
        let b = store.find_or_create_from_utf8(b"hello", span()).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_records() {
        let mut store = LiteralStore::new();
        let a = store.find_or_create_from_utf8(b"hello", span()).unwrap();
        let b = store.find_or_create_from_utf8(b"world", span()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn magic_strings_are_not_stored_as_charset() {
        let mut store = LiteralStore::new();
        let before = store.len();
        let cp = store.find_or_create_from_utf8(b"length", span()).unwrap();
        assert_eq!(store.len(), before + 1);
        assert!(matches!(store.decompress(cp).unwrap().payload, RecordPayload::MagicString { .. }));
    }

    #[test]
    fn numbers_dedup_except_nan() {
        let mut store = LiteralStore::new();
        let a = store.find_or_create_from_number(1.5, span()).unwrap();
        let b = store.find_or_create_from_number(1.5, span()).unwrap();
        assert_eq!(a, b);

        let n1 = store.find_or_create_from_number(f64::NAN, span()).unwrap();
        let n2 = store.find_or_create_from_number(f64::NAN, span()).unwrap();
        assert_ne!(n1, n2);
    }

    #[test]
    fn to_utf8_round_trips() {
        let mut store = LiteralStore::new();
        let cp = store.find_or_create_from_utf8(b"roundtrip", span()).unwrap();
        assert_eq!(store.to_utf8(cp).unwrap().as_ref(), b"roundtrip");
    }

    #[test]
    fn cleanup_keeps_capacity_but_drops_records() {
        let mut store = LiteralStore::new();
        store.find_or_create_from_utf8(b"x", span()).unwrap();
        assert_eq!(store.len(), 1);
        store.cleanup();
        assert_eq!(store.len(), 0);
        assert!(!store.chunks.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Testable property 1: repeated `find_or_create_from_utf8` on the
        /// same bytes always returns the same record.
        #[test]
        fn dedup_is_pointer_stable(s in "[a-zA-Z0-9_]{0,32}") {
            let mut store = LiteralStore::new();
            let first = store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap();
            let second = store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Testable property 2: equal byte content implies equal hash.
        #[test]
        fn hash_agrees_with_equality(s in "[a-zA-Z0-9_]{0,32}") {
            let mut store = LiteralStore::new();
            let cp = store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap();
            let h1 = store.hash(cp);
            let cp2 = store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap();
            let h2 = store.hash(cp2);
            prop_assert_eq!(h1, h2);
        }

        /// Non-NaN numbers dedup regardless of how they were produced.
        #[test]
        fn number_dedup_is_pointer_stable(x in -1.0e10f64..1.0e10f64) {
            let mut store = LiteralStore::new();
            let first = store.find_or_create_from_number(x, Span::default()).unwrap();
            let second = store.find_or_create_from_number(x, Span::default()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
