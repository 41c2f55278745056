//! Resource name hashing
//!
//! The resource metadata table is keyed by a multiplicative string hash.
//! The accumulator is updated per UTF-16 code unit with wrapping 64-bit
//! arithmetic; both constants must match the reference values exactly or
//! every metadata lookup misses.

/// Seed of the resource name hash (the hash of the empty string).
pub const HASH_SEED: u64 = 3074457345618258791;

/// Per-character multiplier.
pub const HASH_MULTIPLIER: u64 = 3074457345618258799;

/// Hash a resource name for metadata table lookups.
pub fn resource_hash(name: &str) -> u64 {
    let mut acc = HASH_SEED;
    for unit in name.encode_utf16() {
        acc = acc.wrapping_add(unit as u64).wrapping_mul(HASH_MULTIPLIER);
    }
    acc
}
