//! Built-in interned strings.
//!
//! Grounded on JerryScript's magic-string id table (`lit-literal.cpp`):
//! property names common enough to be worth referencing by a small numeric
//! id instead of storing their bytes in every compiled function that
//! mentions them. Spec.md section 3.1 names the record variant but leaves
//! the table's contents unspecified; this is the supplemented table from
//! SPEC_FULL.md.

/// Fixed order; the position in this table *is* the magic-string id, so it
/// must never be reordered once referenced by compiled byte code.
pub const MAGIC_STRINGS: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "name",
    "arguments",
    "caller",
    "callee",
    "undefined",
    "NaN",
    "Infinity",
    "toString",
    "valueOf",
    "__proto__",
];

/// Look up `bytes` in the magic-string table, returning its id if present.
pub fn lookup(bytes: &[u8]) -> Option<u16> {
    MAGIC_STRINGS
        .iter()
        .position(|s| s.as_bytes() == bytes)
        .map(|i| i as u16)
}

pub fn get(id: u16) -> Option<&'static str> {
    MAGIC_STRINGS.get(id as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for (i, s) in MAGIC_STRINGS.iter().enumerate() {
            assert_eq!(lookup(s.as_bytes()), Some(i as u16));
            assert_eq!(get(i as u16), Some(*s));
        }
    }

    #[test]
    fn unknown_string_is_absent() {
        assert_eq!(lookup(b"definitely_not_magic"), None);
    }
}
