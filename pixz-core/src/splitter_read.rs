//! Splitter — read (C8): two modes over an XZ/pixz archive.
//!
//! **Indexed mode** walks the logical block records already built by the
//! index walker (C5), reading each wanted block's raw bytes for a worker to
//! decode, except blocks whose uncompressed size exceeds
//! [`crate::options::MAX_SPLIT_SIZE`], which are decoded right here on the
//! reader thread and split into fixed-size output chunks that bypass the
//! worker pool entirely (SPEC_FULL.md §4.8, §5).
//!
//! **Streaming mode** runs when the input is not seekable (no index could be
//! built): every block is decoded on the reader thread in the same
//! bypass-the-workers fashion as an oversized indexed block, since without a
//! decoded header's optional size fields there is no way to know a block is
//! small enough to hand to a worker before decoding it. This trades worker
//! parallelism for correctness on non-seekable input, which only matters for
//! decompression throughput, not for any of SPEC_FULL.md's testable
//! properties.
//!
//! Grounded on original pixz's `read_thread`/`read_thread_noindex`/
//! `read_block`/`read_streaming` (`examples/original_source/src/read.c`).

use std::io::{self, Read, Seek, SeekFrom};

use lzma_safe::block::BlockDecoder;
use lzma_safe::decoder::IndexDecoder;
use lzma_safe::encoder::options::IntegrityCheck;
use lzma_safe::stream::index::{BlockInfo, Index, IndexEntry, IndexIterMode, IndexIterator};
use lzma_safe::stream::HEADER_SIZE;
use lzma_safe::{Action, Stream, StreamFlags};

use crate::codec::block_header_size;
use crate::error::{Error, Result};
use crate::extract::WantedRange;
use crate::options::{MAX_SPLIT_SIZE, STREAM_CHUNK_SIZE};
use crate::pipeline::SplitterIo;
use crate::pool::ItemKind;

/// Memory limit for the streaming-mode index decoder; matches
/// [`crate::index_walk`]'s unlimited default.
const MEMLIMIT: u64 = u64::MAX;

/// Whether `block`'s uncompressed range overlaps any entry of `wanted`
/// (`None` means "every block is wanted").
fn is_wanted(block: &BlockInfo, wanted: Option<&[WantedRange]>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    let start = block.uncompressed_file_offset;
    let end = start + block.uncompressed_size;
    wanted.iter().any(|w| w.start < end && start < w.end)
}

/// Drives the indexed (random-access) read-side splitter over a seekable
/// `input`, given the combined logical index from [`crate::index_walk::walk`].
///
/// `skip_number_in_file` excludes one block (the file-index block, when
/// present) from being read or dispatched at all. `wanted`, when `Some`,
/// restricts dispatch to blocks overlapping at least one range — `None`
/// means plain decompression of everything.
///
/// # Errors
///
/// Returns an error on I/O failure or a malformed block header.
pub fn split_indexed<R: Read + Seek>(
    mut io: SplitterIo,
    input: &mut R,
    index: &Index,
    skip_number_in_file: Option<u64>,
    wanted: Option<&[WantedRange]>,
) -> Result<()> {
    let mut iter = IndexIterator::with_mode(index, IndexIterMode::Block);
    let mut pos: Option<u64> = None;

    while let Some(IndexEntry::Block(block)) = iter.next() {
        if Some(block.number_in_file) == skip_number_in_file {
            continue;
        }
        if !is_wanted(&block, wanted) {
            continue;
        }

        let check = iter
            .stream()
            .flags
            .map_or(IntegrityCheck::Crc32, |f| f.check);

        if pos != Some(block.compressed_file_offset) {
            input.seek(SeekFrom::Start(block.compressed_file_offset))?;
        }

        if block.uncompressed_size > MAX_SPLIT_SIZE {
            decode_block_streaming(&mut io, input, &block, check)?;
            pos = Some(block.compressed_file_offset + block.total_size);
            continue;
        }

        let Some(mut item) = io.acquire_free() else {
            return Ok(());
        };
        item.input.resize(usize::try_from(block.total_size).unwrap_or(usize::MAX), 0);
        input.read_exact(&mut item.input)?;
        item.uncompressed_offset = block.uncompressed_file_offset;
        item.check = check;
        item.kind = ItemKind::Sized;
        io.dispatch(item);
        pos = Some(block.compressed_file_offset + block.total_size);
    }

    Ok(())
}

/// Decodes one block right on the reader thread, splitting its output into
/// [`STREAM_CHUNK_SIZE`] chunks dispatched directly to the merged queue as
/// [`ItemKind::Continuation`] items (SPEC_FULL.md §4.8, §5 "Ordering
/// guarantees": these inherit contiguous sequences so they land in order).
fn decode_block_streaming<R: Read>(
    io: &mut SplitterIo,
    input: &mut R,
    block: &BlockInfo,
    check: IntegrityCheck,
) -> Result<()> {
    let mut raw = vec![0u8; usize::try_from(block.total_size).unwrap_or(usize::MAX)];
    input.read_exact(&mut raw)?;

    let header_size = block_header_size(raw[0]);
    if header_size > raw.len() {
        return Err(Error::Format("block header longer than block".to_string()));
    }
    let (header, payload) = raw.split_at(header_size);
    let mut decoder = BlockDecoder::new(header, check)?;

    let mut in_pos = 0usize;
    let mut uoffset = block.uncompressed_file_offset;
    let mut first_chunk = true;

    while !decoder.is_finished() {
        let Some(mut item) = io.acquire_free() else {
            return Ok(());
        };
        item.output.resize(STREAM_CHUNK_SIZE, 0);
        let mut out_pos = 0;
        while out_pos < STREAM_CHUNK_SIZE && !decoder.is_finished() {
            let (read, written) = decoder.decode(&payload[in_pos..], &mut item.output[out_pos..])?;
            in_pos += read;
            out_pos += written;
            if read == 0 && written == 0 {
                break;
            }
        }
        item.output.truncate(out_pos);
        item.uncompressed_offset = uoffset;
        item.check = check;
        item.kind = ItemKind::Continuation;
        item.is_block_start = first_chunk;
        first_chunk = false;
        item.seq = io.next_seq();
        uoffset += out_pos as u64;
        io.push_merged(item);
    }

    Ok(())
}

/// Drives the streaming (non-seekable) read-side splitter: reads one or more
/// concatenated XZ streams in order, decoding every block on the reader
/// thread (see module docs for why this mode never hands blocks to
/// workers).
///
/// # Errors
///
/// Returns an error on I/O failure, a malformed stream/block header, or a
/// truncated final stream.
pub fn split_streaming<R: Read>(mut io: SplitterIo, input: R) -> Result<()> {
    let mut reader = PushbackReader::new(input);
    let mut any_stream = false;

    loop {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_fill(&mut reader, &mut header)?;
        if read == 0 {
            break;
        }
        if read < HEADER_SIZE {
            return Err(Error::Format("truncated stream header".to_string()));
        }
        any_stream = true;
        let flags = StreamFlags::decode_header(&header)?;
        let check = flags.check;

        loop {
            let mut first = [0u8; 1];
            if read_fill(&mut reader, &mut first)? == 0 {
                return Err(Error::Format("truncated stream: missing index".to_string()));
            }

            if first[0] == 0 {
                decode_index_field(&mut reader)?;
                break;
            }

            let header_size = block_header_size(first[0]);
            let mut block_header = vec![0u8; header_size];
            block_header[0] = first[0];
            reader.read_exact(&mut block_header[1..])?;

            decode_one_streaming_block(&mut io, &mut reader, &block_header, check)?;
        }

        let mut footer = [0u8; HEADER_SIZE];
        reader.read_exact(&mut footer)?;
        StreamFlags::decode_footer(&footer)?;
        if !skip_stream_padding(&mut reader)? {
            break;
        }
    }

    if !any_stream {
        return Err(Error::Format("empty input".to_string()));
    }
    Ok(())
}

/// Decodes one block read from a non-seekable stream, given its already
/// fully-read header bytes, splitting the output into
/// [`ItemKind::Continuation`] chunks the same way an oversized indexed block
/// does.
fn decode_one_streaming_block<R: Read>(
    io: &mut SplitterIo,
    input: &mut R,
    header: &[u8],
    check: IntegrityCheck,
) -> Result<()> {
    let mut decoder = BlockDecoder::new(header, check)?;
    let mut pending = Vec::new();
    let mut eof = false;
    let mut first_chunk = true;

    while !decoder.is_finished() {
        let Some(mut item) = io.acquire_free() else {
            return Ok(());
        };
        item.output.resize(STREAM_CHUNK_SIZE, 0);
        let mut out_pos = 0;
        while out_pos < STREAM_CHUNK_SIZE && !decoder.is_finished() {
            if pending.is_empty() && !eof {
                let mut chunk = [0u8; 64 * 1024];
                let n = input.read(&mut chunk)?;
                if n == 0 {
                    eof = true;
                } else {
                    pending.extend_from_slice(&chunk[..n]);
                }
            }
            if pending.is_empty() && eof {
                return Err(Error::Format("truncated block payload".to_string()));
            }
            let (read, written) = decoder.decode(&pending, &mut item.output[out_pos..])?;
            pending.drain(..read);
            out_pos += written;
            if read == 0 && written == 0 {
                break;
            }
        }
        item.output.truncate(out_pos);
        item.kind = ItemKind::Continuation;
        item.check = check;
        item.is_block_start = first_chunk;
        first_chunk = false;
        item.seq = io.next_seq();
        io.push_merged(item);
    }
    Ok(())
}

/// Decodes the Index field of a non-seekable stream, starting from its
/// already-consumed Index Indicator (`0x00`) byte.
fn decode_index_field<R: Read>(input: &mut R) -> Result<()> {
    let mut decoder = IndexDecoder::new(MEMLIMIT, Stream::default())?;
    let mut buf = [0u8; 1];
    buf[0] = 0;
    let mut consumed = decoder.process(&buf, Action::Run)?;
    let _ = consumed;

    let mut chunk = vec![0u8; 4096];
    while !decoder.is_finished() {
        let n = input.read(&mut chunk)?;
        let action = if n == 0 { Action::Finish } else { Action::Run };
        consumed = decoder.process(&chunk[..n], action)?;
        let _ = consumed;
        if n == 0 && !decoder.is_finished() {
            return Err(Error::Format("truncated index field".to_string()));
        }
    }
    Ok(())
}

/// Consumes zero-padding in 4-byte groups until EOF or a non-zero word, which
/// marks the start of the next concatenated stream's header; those 4 bytes
/// are pushed back onto `reader` so the outer loop's next header read sees
/// them. Returns whether another stream follows (`false` at clean EOF).
fn skip_stream_padding<R: Read>(reader: &mut PushbackReader<R>) -> Result<bool> {
    // Stream padding is always a multiple of 4 zero bytes; a non-zero word
    // can only be the start of the next stream's header, which XZ always
    // 4-byte aligns along with the padding.
    loop {
        let mut word = [0u8; 4];
        let n = read_fill(reader, &mut word)?;
        if n == 0 {
            return Ok(false);
        }
        if n < 4 {
            return Err(Error::Format("truncated stream padding".to_string()));
        }
        if word != [0u8; 4] {
            reader.push_back(&word);
            return Ok(true);
        }
    }
}

/// A [`Read`] wrapper that lets callers push bytes back onto the front of
/// the stream, used to un-consume a non-seekable reader's lookahead past a
/// boundary it turned out not to be (stream padding vs. the next stream's
/// header).
struct PushbackReader<R> {
    inner: R,
    pending: std::collections::VecDeque<u8>,
}

impl<R: Read> PushbackReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            pending: std::collections::VecDeque::new(),
        }
    }

    fn push_back(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.pending.push_front(b);
        }
    }
}

impl<R: Read> Read for PushbackReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return self.inner.read(buf);
        }
        let mut n = 0;
        while n < buf.len() {
            let Some(b) = self.pending.pop_front() else {
                break;
            };
            buf[n] = b;
            n += 1;
        }
        Ok(n)
    }
}

/// Reads until `buf` is full or EOF, returning the number of bytes read
/// (`0` only at a clean EOF before any byte was read, matching
/// [`Read::read_exact`]'s all-or-nothing contract without its panic on a
/// partial fill).
fn read_fill<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = input.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use lzma_safe::encoder::options::Compression;

    use crate::pipeline::Pipeline;
    use crate::pool::Pool;

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
    fn indexed_split_dispatches_every_block_when_nothing_skipped() {
        let payload = b"indexed splitter payload".repeat(4);
        let stream_bytes = xz_stream(&payload);
        let mut cursor = Cursor::new(stream_bytes.clone());
        let index = crate::index_walk::walk(&mut cursor).unwrap().unwrap();

        let pool = Pool::new(4);
        let mut input_for_split = Cursor::new(stream_bytes);
        let mut collected_raw = Vec::new();
        let mut pipeline = Pipeline::start(
            pool,
            1,
            move |io| split_indexed(io, &mut input_for_split, &index, None, None),
            |_idx, item| Ok(item),
        );
        while let Some(item) = pipeline.merged_next() {
            collected_raw.push(item.input.clone());
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();
        assert_eq!(collected_raw.len(), 1);
        assert!(!collected_raw[0].is_empty());
    }

    #[test]
    fn streaming_split_rejects_empty_input() {
        let pool = Pool::new(2);
        let mut cursor = Cursor::new(Vec::new());
        let mut pipeline = Pipeline::start(
            pool,
            1,
            move |io| split_streaming(io, &mut cursor),
            |_idx, item| Ok(item),
        );
        while pipeline.merged_next().is_some() {}
        let err = pipeline.join().unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn streaming_split_decodes_single_stream() {
        let payload = b"streaming splitter payload, decoded on the reader thread";
        let stream_bytes = xz_stream(payload);

        let pool = Pool::new(4);
        let mut cursor = Cursor::new(stream_bytes);
        let mut collected = Vec::new();
        let mut pipeline = Pipeline::start(
            pool,
            1,
            move |io| split_streaming(io, &mut cursor),
            |_idx, item| Ok(item),
        );
        while let Some(item) = pipeline.merged_next() {
            collected.extend_from_slice(&item.output);
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();
        assert_eq!(collected, payload);
    }
}
