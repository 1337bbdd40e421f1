//! Grain placement: maps a grain key onto one of the cluster's nodes.
//!
//! Uses 32-bit FNV-1a over the key's UTF-8 bytes. Placement is a pure
//! function of the key and the (sorted) node list, so every node computes the
//! same owner without coordination.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes a 32-bit FNV-1a hash of a string.
///
/// # Examples
///
/// ```
/// use ambit_core::placement::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash("hello"), 1_335_831_723);
/// assert_eq!(fnv1a_hash(""), 2_166_136_261);
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Picks the index of the node owning `key` among `node_count` nodes.
/// `None` when there are no nodes.
#[must_use]
pub fn owner_index(key: &str, node_count: usize) -> Option<usize> {
    if node_count == 0 {
        return None;
    }
    let count = u32::try_from(node_count).unwrap_or(u32::MAX);
    usize::try_from(fnv1a_hash(key) % count).ok()
}
