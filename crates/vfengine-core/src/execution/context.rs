//! Attribute name to chunk registry.
//!
//! Operators never own chunks. During `init` each operator asks the
//! [`ColumnContext`] for the chunks it reads and allocates the chunks it
//! writes; during `execute` it addresses them through the returned
//! [`ChunkId`]s. Chunks and states live in two arenas so that a chunk's values
//! and its state can be borrowed mutably at the same time.

use vfengine_common::collections::{VfMap, vf_map, vf_set};
use vfengine_common::{Attribute, NodeId};

use super::chunk::{Chunk, ChunkId, State, StateId};
use super::operators::OperatorError;

/// Registry of every column chunk of one pipeline.
#[derive(Debug, Default)]
pub struct ColumnContext {
    columns: VfMap<Attribute, ChunkId>,
    chunks: Vec<Chunk>,
    states: Vec<State>,
    debug_chunks: bool,
}

impl ColumnContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: vf_map(),
            ..Self::default()
        }
    }

    /// Enables per-execute chunk dumps (see [`debug`](super::debug)).
    #[must_use]
    pub fn with_debug_chunks(mut self, enabled: bool) -> Self {
        self.debug_chunks = enabled;
        self
    }

    /// Returns `true` if chunk dumps are enabled.
    #[inline]
    #[must_use]
    pub fn debug_chunks(&self) -> bool {
        self.debug_chunks
    }

    /// Allocates a chunk with its own state for `attribute`.
    ///
    /// Allocating an attribute twice returns the existing chunk.
    pub fn allocate(&mut self, attribute: &Attribute) -> ChunkId {
        if let Some(&id) = self.columns.get(attribute.as_str()) {
            return id;
        }
        let state = self.push_state();
        self.push_chunk(attribute.clone(), state)
    }

    /// Allocates a chunk for `attribute` that shares the state of `source`.
    ///
    /// If `attribute` already has a chunk, that chunk is re-pointed at the
    /// shared state.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::ColumnNotAllocated`] if `source` has no chunk.
    pub fn allocate_shared(
        &mut self,
        attribute: &Attribute,
        source: &str,
    ) -> Result<ChunkId, OperatorError> {
        let source_state = self.chunk(self.require(source)?).state();
        if let Some(&id) = self.columns.get(attribute.as_str()) {
            self.chunks[id.index()].set_state(source_state);
            return Ok(id);
        }
        Ok(self.push_chunk(attribute.clone(), source_state))
    }

    /// Looks up the chunk of `attribute`.
    #[must_use]
    pub fn lookup(&self, attribute: &str) -> Option<ChunkId> {
        self.columns.get(attribute).copied()
    }

    /// Looks up the chunk of `attribute`, failing if it was never allocated.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::ColumnNotAllocated`] for unknown attributes.
    pub fn require(&self, attribute: &str) -> Result<ChunkId, OperatorError> {
        self.lookup(attribute)
            .ok_or_else(|| OperatorError::ColumnNotAllocated(attribute.to_string()))
    }

    /// Returns the chunk behind `id`.
    #[inline]
    #[must_use]
    pub fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.index()]
    }

    /// Live and dead slots of the chunk behind `id`.
    #[inline]
    #[must_use]
    pub fn values(&self, id: ChunkId) -> &[NodeId] {
        self.chunks[id.index()].values()
    }

    /// Returns the state behind `id`.
    #[inline]
    #[must_use]
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    /// Returns the state behind `id` mutably.
    #[inline]
    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id.index()]
    }

    /// Returns the state the chunk behind `id` reads from.
    #[inline]
    #[must_use]
    pub fn state_of(&self, id: ChunkId) -> &State {
        &self.states[self.chunks[id.index()].state().index()]
    }

    /// Returns the state the chunk behind `id` reads from, mutably.
    #[inline]
    pub fn state_of_mut(&mut self, id: ChunkId) -> &mut State {
        let state = self.chunks[id.index()].state();
        &mut self.states[state.index()]
    }

    /// Borrows a chunk's values and its state mutably at once.
    pub fn chunk_and_state_mut(&mut self, id: ChunkId) -> (&mut [NodeId], &mut State) {
        let chunk = &mut self.chunks[id.index()];
        let state = &mut self.states[chunk.state().index()];
        (chunk.values_mut(), state)
    }

    /// Marks the values of `id` as a new batch of rows.
    pub(crate) fn advance_generation(&mut self, id: ChunkId) {
        self.chunks[id.index()].advance_generation();
    }

    /// Returns `true` if both chunks read from the same state.
    #[must_use]
    pub fn shares_state(&self, a: ChunkId, b: ChunkId) -> bool {
        self.chunk(a).state() == self.chunk(b).state()
    }

    /// States referenced by at least one chunk, in chunk allocation order.
    #[must_use]
    pub fn live_states(&self) -> Vec<StateId> {
        let mut seen = vf_set();
        self.chunks
            .iter()
            .map(Chunk::state)
            .filter(|state| seen.insert(*state))
            .collect()
    }

    /// Number of allocated chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunk has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Attribute names in allocation order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.chunks.iter().map(Chunk::attribute)
    }

    fn push_state(&mut self) -> StateId {
        let mut state = State::new();
        state.allocate_selection();
        self.states.push(state);
        StateId::from_index(self.states.len() - 1)
    }

    fn push_chunk(&mut self, attribute: Attribute, state: StateId) -> ChunkId {
        let id = ChunkId::from_index(self.chunks.len());
        self.chunks.push(Chunk::new(attribute.clone(), state));
        self.columns.insert(attribute, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcstr::literal;

    #[test]
    fn test_allocate_is_idempotent() {
        let mut ctx = ColumnContext::new();
        let a = ctx.allocate(&literal!("a"));
        let again = ctx.allocate(&literal!("a"));
        assert_eq!(a, again);
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.lookup("a"), Some(a));
        assert_eq!(ctx.lookup("b"), None);
    }

    #[test]
    fn test_require_unknown_column() {
        let ctx = ColumnContext::new();
        let err = ctx.require("z").unwrap_err();
        assert!(matches!(err, OperatorError::ColumnNotAllocated(ref name) if name == "z"));
    }

    #[test]
    fn test_shared_state_aliases_window() {
        let mut ctx = ColumnContext::new();
        let a = ctx.allocate(&literal!("a"));
        let b = ctx.allocate_shared(&literal!("b"), "a").unwrap();
        assert!(ctx.shares_state(a, b));

        ctx.state_of_mut(a).set_window(3, 2);
        assert_eq!(ctx.state_of(b).window(), 3..5);
        assert_eq!(ctx.live_states().len(), 1);
    }

    #[test]
    fn test_allocate_shared_repoints_existing_chunk() {
        let mut ctx = ColumnContext::new();
        let a = ctx.allocate(&literal!("a"));
        let b = ctx.allocate(&literal!("b"));
        assert!(!ctx.shares_state(a, b));

        let again = ctx.allocate_shared(&literal!("b"), "a").unwrap();
        assert_eq!(again, b);
        assert!(ctx.shares_state(a, b));
        assert_eq!(ctx.live_states().len(), 1);
    }

    #[test]
    fn test_allocate_shared_requires_source() {
        let mut ctx = ColumnContext::new();
        assert!(ctx.allocate_shared(&literal!("b"), "a").is_err());
    }

    #[test]
    fn test_new_chunks_are_fully_selected() {
        let mut ctx = ColumnContext::new();
        let a = ctx.allocate(&literal!("a"));
        let state = ctx.state_of(a);
        assert_eq!(state.selection().unwrap().count_ones(), crate::MAX_VECTOR_SIZE);
        assert!(ctx.values(a).iter().all(|v| !v.is_valid()));
    }
}
