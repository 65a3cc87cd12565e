//! List mode (C... ): summarize an already-walked [`Index`] for `pixz -l`.
//!
//! `lzma_safe::stream::index::{StreamInfo, BlockInfo}` already carry every
//! field the teacher's own `xz-core/src/file_info.rs` re-wraps into local
//! types of the same shape; this module reuses them directly rather than
//! introducing an identical wrapper.

use lzma_safe::stream::index::{BlockInfo, Index, IndexEntry, StreamInfo};

/// Per-file totals a `pixz -l` row (or, across files, the final totals row)
/// reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    /// Number of concatenated XZ streams in the file.
    pub stream_count: u64,
    /// Number of blocks across all streams.
    pub block_count: u64,
    /// Total compressed size, as recorded by the index.
    pub compressed: u64,
    /// Total uncompressed size, as recorded by the index.
    pub uncompressed: u64,
    /// Bitmask (`1 << check_id`) of every integrity check algorithm seen
    /// across the file's streams.
    pub checks_mask: u32,
}

/// Summarizes `index` into the totals a list row needs.
#[must_use]
pub fn summarize(index: &Index) -> ListSummary {
    ListSummary {
        stream_count: index.stream_count(),
        block_count: index.block_count(),
        compressed: index.file_size(),
        uncompressed: index.uncompressed_size(),
        checks_mask: index.checks(),
    }
}

/// Every stream record in `index`, in file order.
#[must_use]
pub fn streams(index: &Index) -> Vec<StreamInfo> {
    index
        .iter_streams()
        .filter_map(|entry| match entry {
            IndexEntry::Stream(s) => Some(s),
            IndexEntry::Block(_) => None,
        })
        .collect()
}

/// Every block record in `index`, in file order.
#[must_use]
pub fn blocks(index: &Index) -> Vec<BlockInfo> {
    index
        .iter_blocks()
        .filter_map(|entry| match entry {
            IndexEntry::Block(b) => Some(b),
            IndexEntry::Stream(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use lzma_safe::encoder::options::{Compression, IntegrityCheck};
    use lzma_safe::{Action, Stream};

    use super::*;

    fn xz_stream(data: &[u8]) -> Vec<u8> {
        let mut encoder = Stream::default()
            .easy_encoder(Compression::Level1, IntegrityCheck::Crc32)
            .unwrap();
        let mut out = vec![0u8; data.len() + 4096];
        let (_, written) = encoder.process(data, &mut out, Action::Run).unwrap();
        let mut total = written;
        let (_, finish_written) = encoder
            .process(&[], &mut out[total..], Action::Finish)
            .unwrap();
        total += finish_written;
        out.truncate(total);
        out
    }

    #[test]
    fn summarize_reports_single_stream_single_block_totals() {
        let payload = b"list mode summary payload".repeat(8);
        let stream_bytes = xz_stream(&payload);
        let mut cursor = Cursor::new(stream_bytes.clone());
        let index = crate::index_walk::walk(&mut cursor).unwrap().unwrap();

        let summary = summarize(&index);
        assert_eq!(summary.stream_count, 1);
        assert_eq!(summary.block_count, 1);
        assert_eq!(summary.uncompressed, payload.len() as u64);
        assert_eq!(summary.compressed, stream_bytes.len() as u64);
        // CRC32 is bit 1 of the checks bitmask (check id 1).
        assert_eq!(summary.checks_mask, 1 << 1);
    }

    #[test]
    fn streams_and_blocks_report_two_concatenated_streams() {
        let mut combined = xz_stream(b"first");
        combined.extend(xz_stream(b"second value"));
        let mut cursor = Cursor::new(combined);
        let index = crate::index_walk::walk(&mut cursor).unwrap().unwrap();

        let stream_infos = streams(&index);
        assert_eq!(stream_infos.len(), 2);
        assert_eq!(stream_infos[0].number, 1);
        assert_eq!(stream_infos[1].number, 2);

        let block_infos = blocks(&index);
        assert_eq!(block_infos.len(), 2);
        assert_eq!(block_infos[0].number_in_file, 1);
        assert_eq!(block_infos[1].number_in_file, 2);
    }
}
