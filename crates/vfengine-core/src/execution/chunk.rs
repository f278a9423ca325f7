//! Column chunks and their shared state.
//!
//! A [`Chunk`] is a fixed block of [`MAX_VECTOR_SIZE`] node ids for one
//! attribute. Which part of the block is live, how it is grouped under the
//! parent attribute and which rows survive filtering all live in a [`State`],
//! and two chunks may point at the same state:
//!
//! ```text
//!   Chunk "a" ──┐
//!               ├──> State { window, rle, selection }
//!   Chunk "b" ──┘        (1:1 relation, aliased)
//!
//!   Chunk "c" ─────> State { window, rle, selection }
//! ```
//!
//! # Window
//!
//! `curr_start_pos..curr_start_pos + size` is the slice downstream operators
//! must look at. Narrowing the window of a chunk narrows it for every
//! attribute aliased to the same state.
//!
//! # Run-length offsets
//!
//! For a child chunk produced by a packed join, `rle[p]..rle[p + 1]` is the
//! range of child slots belonging to parent slot `p`. Only the first
//! `rle_size` entries are meaningful.

use std::ops::Range;

use vfengine_common::{Attribute, NodeId};

use super::bitmask::BitMask;

/// Capacity of every chunk.
pub const MAX_VECTOR_SIZE: usize = 1024;

/// Selection mask sized for one chunk.
pub type SelectionMask = BitMask<MAX_VECTOR_SIZE>;

/// Run-length offsets for one chunk, indexed by parent slot.
pub type RunLengths = [u32; MAX_VECTOR_SIZE + 1];

/// Index of a chunk inside a [`ColumnContext`](super::ColumnContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u32);

impl ChunkId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the chunk in its context.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a state inside a [`ColumnContext`](super::ColumnContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the state in its context.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Window, grouping and selection metadata shared by one or more chunks.
#[derive(Debug, Clone)]
pub struct State {
    curr_start_pos: usize,
    size: usize,
    rle: Option<Box<RunLengths>>,
    rle_size: usize,
    selection: Option<Box<SelectionMask>>,
}

impl State {
    /// Creates a state with an empty window and no grouping or selection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            curr_start_pos: 0,
            size: 0,
            rle: None,
            rle_size: 1,
            selection: None,
        }
    }

    /// First live slot.
    #[inline]
    #[must_use]
    pub fn curr_start_pos(&self) -> usize {
        self.curr_start_pos
    }

    /// Number of live slots.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Live slots as a range.
    #[inline]
    #[must_use]
    pub fn window(&self) -> Range<usize> {
        self.curr_start_pos..self.curr_start_pos + self.size
    }

    /// Moves the live window.
    #[inline]
    pub fn set_window(&mut self, start: usize, size: usize) {
        debug_assert!(start + size <= MAX_VECTOR_SIZE, "window past chunk end");
        self.curr_start_pos = start;
        self.size = size;
    }

    /// Allocates the run-length offsets, zeroed. Idempotent.
    pub fn allocate_rle(&mut self) {
        if self.rle.is_none() {
            self.rle = Some(Box::new([0; MAX_VECTOR_SIZE + 1]));
            self.rle_size = 1;
        }
    }

    /// Allocates an all-set selection mask. Idempotent.
    pub fn allocate_selection(&mut self) {
        if self.selection.is_none() {
            self.selection = Some(Box::default());
        }
    }

    /// Run-length offsets, if allocated. The full array is returned; only
    /// the first [`rle_size`](Self::rle_size) entries are meaningful.
    #[must_use]
    pub fn rle(&self) -> Option<&RunLengths> {
        self.rle.as_deref()
    }

    /// Mutable run-length offsets, if allocated.
    pub fn rle_mut(&mut self) -> Option<&mut RunLengths> {
        self.rle.as_deref_mut()
    }

    /// Number of meaningful run-length entries.
    #[inline]
    #[must_use]
    pub fn rle_size(&self) -> usize {
        self.rle_size
    }

    /// Sets the number of meaningful run-length entries.
    #[inline]
    pub fn set_rle_size(&mut self, rle_size: usize) {
        debug_assert!(rle_size <= MAX_VECTOR_SIZE + 1);
        self.rle_size = rle_size;
    }

    /// Zeroes `rle[0..=pad_to]` and marks those entries as the only
    /// meaningful ones, so a packed join can append the segment of parent
    /// slot `pad_to` next.
    pub fn reset_rle(&mut self, pad_to: usize) {
        if let Some(rle) = self.rle.as_deref_mut() {
            rle[..=pad_to].fill(0);
            self.rle_size = pad_to + 1;
        }
    }

    /// Child slots belonging to `parent_idx`.
    ///
    /// Empty when the offsets are not allocated or `parent_idx` lies outside
    /// the meaningful entries.
    #[must_use]
    pub fn segment(&self, parent_idx: usize) -> Range<usize> {
        match self.rle.as_deref() {
            Some(rle) if parent_idx + 1 < self.rle_size => {
                rle[parent_idx] as usize..rle[parent_idx + 1] as usize
            }
            _ => 0..0,
        }
    }

    /// Selection mask, if allocated.
    #[must_use]
    pub fn selection(&self) -> Option<&SelectionMask> {
        self.selection.as_deref()
    }

    /// Mutable selection mask, if allocated.
    pub fn selection_mut(&mut self) -> Option<&mut SelectionMask> {
        self.selection.as_deref_mut()
    }

    /// Returns `true` if slot `idx` is selected. Without a mask every slot is.
    #[inline]
    #[must_use]
    pub fn is_selected(&self, idx: usize) -> bool {
        self.selection.as_deref().is_none_or(|mask| mask.test(idx))
    }

    /// Number of selected slots in `range`.
    #[must_use]
    pub fn selected_in(&self, range: Range<usize>) -> usize {
        match self.selection.as_deref() {
            Some(mask) => mask.count_ones_in(range.start, range.end),
            None => range.len(),
        }
    }

    /// Number of selected slots inside the window.
    #[must_use]
    pub fn selected_in_window(&self) -> usize {
        self.selected_in(self.window())
    }

    /// Selected slots of `range` clipped to the window.
    pub fn selected_positions(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        let window = self.window();
        let start = range.start.max(window.start);
        let end = range.end.min(window.end);
        (start..end.max(start)).filter(|&idx| self.is_selected(idx))
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// One attribute's block of node ids.
#[derive(Debug, Clone)]
pub struct Chunk {
    attribute: Attribute,
    values: Box<[NodeId]>,
    state: StateId,
    /// Bumped each time a producer publishes fresh values.
    generation: u64,
}

impl Chunk {
    pub(crate) fn new(attribute: Attribute, state: StateId) -> Self {
        Self {
            attribute,
            values: vec![NodeId::INVALID; MAX_VECTOR_SIZE].into_boxed_slice(),
            state,
            generation: 0,
        }
    }

    /// Attribute the chunk stores.
    #[must_use]
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// All [`MAX_VECTOR_SIZE`] slots, live or not.
    #[must_use]
    pub fn values(&self) -> &[NodeId] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [NodeId] {
        &mut self.values
    }

    /// State the chunk reads its window from.
    #[inline]
    #[must_use]
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Number of value batches published into the chunk. Equal generations
    /// mean the same rows sit at the same positions.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn advance_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn set_state(&mut self, state: StateId) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = State::new();
        assert_eq!(state.window(), 0..0);
        assert_eq!(state.rle_size(), 1);
        assert!(state.rle().is_none());
        assert!(state.selection().is_none());
        assert!(state.is_selected(17));
    }

    #[test]
    fn test_segment_requires_rle() {
        let mut state = State::new();
        assert_eq!(state.segment(0), 0..0);

        state.allocate_rle();
        let rle = state.rle_mut().unwrap();
        rle[1] = 3;
        rle[2] = 5;
        state.set_rle_size(3);

        assert_eq!(state.segment(0), 0..3);
        assert_eq!(state.segment(1), 3..5);
        assert_eq!(state.segment(2), 0..0);
    }

    #[test]
    fn test_reset_rle_pads_with_zeros() {
        let mut state = State::new();
        state.allocate_rle();
        state.rle_mut().unwrap()[1..4].copy_from_slice(&[2, 4, 6]);
        state.set_rle_size(4);

        state.reset_rle(2);
        assert_eq!(state.rle_size(), 3);
        assert_eq!(&state.rle().unwrap()[..3], &[0, 0, 0]);
        assert_eq!(state.segment(2), 0..0);
    }

    #[test]
    fn test_selected_positions_clip_to_window() {
        let mut state = State::new();
        state.allocate_selection();
        state.set_window(2, 4);
        state.selection_mut().unwrap().clear(3);

        let picked: Vec<_> = state.selected_positions(0..10).collect();
        assert_eq!(picked, vec![2, 4, 5]);
        assert_eq!(state.selected_in_window(), 3);
        assert_eq!(state.selected_positions(7..9).count(), 0);
    }

    #[test]
    fn test_allocation_is_idempotent() {
        let mut state = State::new();
        state.allocate_selection();
        state.selection_mut().unwrap().clear(0);
        state.allocate_selection();
        assert!(!state.is_selected(0));
    }
}
