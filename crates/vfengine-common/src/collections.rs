//! Collection type aliases.
//!
//! Attribute names and node ids are tiny keys, so every hash container in
//! the workspace uses FxHash instead of SipHash.
//!
//! ```rust
//! use vfengine_common::collections::{VfMap, vf_set};
//!
//! let mut map: VfMap<&str, u32> = VfMap::default();
//! map.insert("a", 0);
//!
//! let mut seen = vf_set();
//! assert!(seen.insert("a"));
//! assert!(!seen.insert("a"));
//! ```

use rustc_hash::FxBuildHasher;

/// Hash map with FxHash.
pub type VfMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Hash set with FxHash.
pub type VfSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Creates an empty [`VfMap`].
#[inline]
#[must_use]
pub fn vf_map<K, V>() -> VfMap<K, V> {
    VfMap::default()
}

/// Creates an empty [`VfMap`] sized for `capacity` entries.
#[inline]
#[must_use]
pub fn vf_map_with_capacity<K, V>(capacity: usize) -> VfMap<K, V> {
    VfMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}

/// Creates an empty [`VfSet`].
#[inline]
#[must_use]
pub fn vf_set<T>() -> VfSet<T> {
    VfSet::default()
}
