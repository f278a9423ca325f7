//! Chunk dumps for tracing pipelines.
//!
//! Enabled per context through
//! [`ColumnContext::with_debug_chunks`](super::ColumnContext::with_debug_chunks)
//! and emitted at `trace` level under the `vfengine::chunk` target, so
//! `RUST_LOG=vfengine::chunk=trace` shows every window an operator pushes.

use super::chunk::ChunkId;
use super::context::ColumnContext;

/// Number of values printed per dump.
const PREVIEW: usize = 16;

/// Logs the live window, run-length offsets and selection of a chunk.
pub fn dump_chunk(ctx: &ColumnContext, chunk: ChunkId, site: &'static str) {
    if !ctx.debug_chunks() {
        return;
    }
    let state = ctx.state_of(chunk);
    let window = state.window();
    let values: Vec<u64> = ctx.values(chunk)[window.clone()]
        .iter()
        .take(PREVIEW)
        .map(|v| v.as_u64())
        .collect();
    let rle = state.rle().map(|rle| rle[..state.rle_size()].to_vec());
    tracing::trace!(
        target: "vfengine::chunk",
        site,
        attribute = %ctx.chunk(chunk).attribute(),
        start = window.start,
        size = window.len(),
        selected = state.selected_in_window(),
        ?rle,
        ?values,
        "chunk"
    );
}
