//! Per-query result counters.
//!
//! Sinks publish into a [`QueryStats`] shared through an `Arc`, so the
//! caller can read results after the pipeline finishes and two pipelines
//! never observe each other's counts.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Number of per-attribute minimum slots, one per letter `a..=z`.
pub const ATTRIBUTE_SLOTS: usize = 26;

/// Maps an attribute to its minimum slot by its first letter.
///
/// Returns `None` for attributes not starting with a lowercase ASCII letter.
#[must_use]
pub fn attribute_slot(attribute: &str) -> Option<usize> {
    match attribute.as_bytes().first() {
        Some(&b) if b.is_ascii_lowercase() => Some(usize::from(b - b'a')),
        _ => None,
    }
}

/// Result counters of one query.
#[derive(Debug)]
pub struct QueryStats {
    rows: AtomicU64,
    surviving_roots: AtomicU64,
    minimums: [AtomicU64; ATTRIBUTE_SLOTS],
}

impl QueryStats {
    /// Creates zeroed counters with every minimum slot unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: AtomicU64::new(0),
            surviving_roots: AtomicU64::new(0),
            minimums: std::array::from_fn(|_| AtomicU64::new(u64::MAX)),
        }
    }

    /// Adds to the output row count.
    #[inline]
    pub fn add_rows(&self, rows: u64) {
        self.rows.fetch_add(rows, Ordering::Relaxed);
    }

    /// Total output rows counted so far.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    /// Adds to the count of root rows that kept at least one match.
    #[inline]
    pub fn add_surviving_roots(&self, rows: u64) {
        self.surviving_roots.fetch_add(rows, Ordering::Relaxed);
    }

    /// Root rows that kept at least one match after selection propagation.
    #[must_use]
    pub fn surviving_roots(&self) -> u64 {
        self.surviving_roots.load(Ordering::Relaxed)
    }

    /// Lowers the minimum of `slot` to `value` if smaller.
    #[inline]
    pub fn update_min(&self, slot: usize, value: u64) {
        self.minimums[slot].fetch_min(value, Ordering::Relaxed);
    }

    /// Smallest value seen for `slot`, if any.
    #[must_use]
    pub fn min_value(&self, slot: usize) -> Option<u64> {
        match self.minimums.get(slot)?.load(Ordering::Relaxed) {
            u64::MAX => None,
            value => Some(value),
        }
    }

    /// Minimum per attribute letter, for every slot that saw a value.
    #[must_use]
    pub fn minimums(&self) -> Vec<AttributeMinimum> {
        (0..ATTRIBUTE_SLOTS)
            .filter_map(|slot| {
                self.min_value(slot).map(|value| AttributeMinimum {
                    attribute: char::from(b'a' + slot as u8),
                    value,
                })
            })
            .collect()
    }

    /// Clears every counter.
    pub fn reset(&self) {
        self.rows.store(0, Ordering::Relaxed);
        self.surviving_roots.store(0, Ordering::Relaxed);
        for slot in &self.minimums {
            slot.store(u64::MAX, Ordering::Relaxed);
        }
    }
}

impl Default for QueryStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimum node id observed for one attribute letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeMinimum {
    /// Attribute letter.
    pub attribute: char,
    /// Smallest node id bound to it.
    pub value: u64,
}
