//! Bounded work-item pool (C1).
//!
//! Items are pre-allocated once at startup and recycled through the pipeline's
//! free queue for the lifetime of the run. This mirrors original pixz's
//! `pool_t`, simplified from the teacher's custom-allocator `Buffer` (which
//! generalizes over allocation strategies pixz never needs) to plain owned
//! `Vec<u8>`s: every pixz buffer comes from the global allocator.

/// What kind of payload a work item currently holds.
///
/// Only meaningful for the streaming decode path (C8); the write path and
/// the indexed read path only ever use `Sized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A block whose compressed and uncompressed sizes were known up front.
    Sized,
    /// A block read/decoded without knowing its final size ahead of time.
    Unsized,
    /// A chunk of an oversized block's decoded output, already in final
    /// position in the output stream (bypasses the worker pool).
    Continuation,
}

/// A single reusable buffer pair cycled between pipeline stages.
pub struct WorkItem {
    /// Input bytes for this item (tar chunk to compress, or block bytes to
    /// decode).
    pub input: Vec<u8>,
    /// Output bytes produced by the worker (compressed block, or decoded
    /// payload).
    pub output: Vec<u8>,
    /// Sequence number stamped by the splitter; used by the merger to
    /// restore original order.
    pub seq: u64,
    /// Uncompressed byte offset this item starts at, used by streaming reads
    /// and by the extract planner to intersect wanted ranges.
    pub uncompressed_offset: u64,
    /// Integrity check algorithm recorded for this item's block.
    pub check: lzma_safe::encoder::options::IntegrityCheck,
    /// Current payload kind.
    pub kind: ItemKind,
    /// On the encode path, the XZ Index "unpadded size" (header + compressed
    /// data + check, excluding Block Padding) of the block written into
    /// `output` by [`crate::codec::encode_work_item`] — the merger (C9)
    /// needs this verbatim to build the stream's main index, and it cannot
    /// be recovered from `output.len()` alone since block padding is applied
    /// by the merger, not the worker.
    pub unpadded_size: u64,
    /// For `Continuation` items: whether this chunk is the first one decoded
    /// from its source block. The streaming read path (C8/C9) needs this to
    /// apply the file-index magic heuristic once per block rather than once
    /// per chunk.
    pub is_block_start: bool,
}

impl WorkItem {
    fn new() -> Self {
        Self {
            input: Vec::new(),
            output: Vec::new(),
            seq: 0,
            uncompressed_offset: 0,
            check: lzma_safe::encoder::options::IntegrityCheck::Crc32,
            kind: ItemKind::Sized,
            unpadded_size: 0,
            is_block_start: false,
        }
    }

    /// Ensures `input`/`output` can each hold at least the given number of
    /// bytes, growing (but never shrinking) existing capacity.
    pub fn reserve(&mut self, input_at_least: usize, output_at_least: usize) {
        if self.input.capacity() < input_at_least {
            self.input.reserve(input_at_least - self.input.capacity());
        }
        if self.output.capacity() < output_at_least {
            self.output
                .reserve(output_at_least - self.output.capacity());
        }
    }

    /// Resets this item to an empty, reusable state without releasing its
    /// buffers' capacity.
    pub fn reset(&mut self) {
        self.input.clear();
        self.output.clear();
        self.seq = 0;
        self.uncompressed_offset = 0;
        self.kind = ItemKind::Sized;
        self.unpadded_size = 0;
        self.is_block_start = false;
    }
}

/// Pre-allocates `Q` [`WorkItem`]s at startup, where `Q` is resolved by the
/// caller (see [`crate::options::CompressionOptions::resolve_workers_and_pool`]
/// for the `Q = max(user_override, ceil(workers * 1.3 + 1))` contract and the
/// "clamp up to `workers`" decision for an under-sized user override).
pub struct Pool {
    items: Vec<WorkItem>,
}

impl Pool {
    /// Allocates `size` fresh work items.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let items = (0..size).map(|_| WorkItem::new()).collect();
        Self { items }
    }

    /// Number of items this pool was built with.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the pool, returning its items for priming the free queue.
    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_allocates_requested_count() {
        let pool = Pool::new(5);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn reset_clears_but_keeps_capacity() {
        let mut item = WorkItem::new();
        item.input.extend_from_slice(&[1, 2, 3, 4]);
        item.seq = 42;
        let cap_before = item.input.capacity();
        item.reset();
        assert!(item.input.is_empty());
        assert_eq!(item.seq, 0);
        assert_eq!(item.input.capacity(), cap_before);
    }

    #[test]
    fn reserve_only_grows() {
        let mut item = WorkItem::new();
        item.reserve(100, 50);
        let cap_after_first = item.input.capacity();
        assert!(cap_after_first >= 100);
        item.reserve(10, 10);
        assert_eq!(item.input.capacity(), cap_after_first);
    }
}
