//! Merger/writer (C9): the main-thread half of both the compress and the
//! decompress pipeline, driving a [`crate::pipeline::Pipeline`] started over
//! the matching splitter (C7/C8) and worker (C4) functions and turning its
//! reordered output into an actual XZ container on the wire (or, on
//! decompress, back into the original bytes).
//!
//! Grounded on original pixz's `write_block`/`encode_index`/
//! `write_file_index*` (`examples/original_source/src/write.c`, write path)
//! and `pixz_read` (`examples/original_source/src/read.c`, read path).

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use lzma_safe::encoder::options::IntegrityCheck;
use lzma_safe::stream::index::{Index, IndexEntry};
use lzma_safe::stream::HEADER_SIZE;

use crate::codec;
use crate::error::{Error, Result};
use crate::extract::{self, WantedRange};
use crate::file_index;
use crate::options::{CompressionOptions, DecompressionOptions};
use crate::pipeline::Pipeline;
use crate::pool::{ItemKind, Pool};
use crate::session::{FileIndexEntry, Session};
use crate::warning::Warning;

/// Totals from a finished compress run.
#[derive(Debug, Clone, Default)]
pub struct CompressStats {
    /// Uncompressed bytes read from the input.
    pub total_in: u64,
    /// Compressed bytes written to the output, including framing.
    pub total_out: u64,
    /// Non-fatal conditions encountered during the run, for the caller to
    /// report (this crate never writes to a terminal itself).
    pub warnings: Vec<Warning>,
}

/// Totals from a finished decompress run.
#[derive(Debug, Clone, Default)]
pub struct DecompressStats {
    /// Bytes written to the output.
    pub total_out: u64,
    /// Non-fatal conditions encountered during the run, for the caller to
    /// report (this crate never writes to a terminal itself).
    pub warnings: Vec<Warning>,
}

/// Writes `bytes` followed by zero Block Padding bytes up to the next
/// 4-byte boundary of `unpadded_size`, returning the total bytes written
/// (payload plus padding).
///
/// [`Index::append_block`] computes the padded total from `unpadded_size`
/// internally; it performs no I/O, so the padding bytes themselves must
/// still be written here.
fn write_padded<W: Write>(output: &mut W, bytes: &[u8], unpadded_size: u64) -> Result<u64> {
    output.write_all(bytes)?;
    let pad = (4 - (unpadded_size % 4)) % 4;
    if pad > 0 {
        output.write_all(&[0u8; 4][..pad as usize])?;
    }
    Ok(unpadded_size + pad)
}

/// Compresses `input` into a single XZ stream written to `output`, using
/// `options` to resolve the worker/pool sizes, block size, and level, and
/// `session`'s file-index builder to record tar member offsets when
/// `options.tar_mode()` is set.
///
/// # Errors
///
/// Returns an error from thread setup, the codec, or I/O.
pub fn compress<R, W>(input: R, mut output: W, options: &CompressionOptions, session: &Session) -> Result<CompressStats>
where
    R: Read + Send + 'static,
    W: Write,
{
    let (workers, pool_size, pool_warning) = options.resolve_workers_and_pool()?;
    let pool = Pool::new(pool_size);
    let level = options.level();
    let check = options.check();
    let block_in_size = options.block_in_size()?;
    let tar_mode = options.tar_mode();

    let file_index = tar_mode.then(|| Arc::clone(session.file_index()));
    let total_in = Arc::new(Mutex::new(0u64));
    let total_in_for_splitter = Arc::clone(&total_in);

    let mut pipeline = Pipeline::start(
        pool,
        workers,
        move |io| {
            let total = crate::splitter_write::split(io, input, block_in_size, tar_mode, file_index)?;
            *total_in_for_splitter.lock().expect("total_in mutex poisoned") = total;
            Ok(())
        },
        move |_idx, item| codec::encode_work_item(level, check, item),
    );

    let header = lzma_safe::StreamFlags::encode_header(check)?;
    output.write_all(&header)?;
    let mut total_out = HEADER_SIZE as u64;

    let mut index = Index::new()?;
    while let Some(item) = pipeline.merged_next() {
        total_out += write_padded(&mut output, &item.output, item.unpadded_size)?;
        index.append_block(item.unpadded_size, item.input.len() as u64)?;
        pipeline.recycle(item);
    }
    pipeline.join()?;

    let total_in = *total_in.lock().expect("total_in mutex poisoned");

    if tar_mode {
        let entries = std::mem::take(&mut *session.file_index().lock().expect("file index mutex poisoned")).finish(total_in);
        let payload = file_index::encode(&entries);
        let block = codec::encode_block(level, check, &payload)?;
        total_out += write_padded(&mut output, &[block.header.as_slice(), block.payload.as_slice()].concat(), block.unpadded_size)?;
        index.append_block(block.unpadded_size, payload.len() as u64)?;
    }

    let index_size = index.encoded_size();
    let mut index_buf = vec![0u8; usize::try_from(index_size).unwrap_or(usize::MAX)];
    let written = index.encode(&mut index_buf)?;
    index_buf.truncate(written);
    output.write_all(&index_buf)?;
    total_out += index_buf.len() as u64;

    let footer = lzma_safe::StreamFlags::encode_footer(check, index_size)?;
    output.write_all(&footer)?;
    total_out += HEADER_SIZE as u64;
    output.flush()?;

    Ok(CompressStats { total_in, total_out, warnings: pool_warning.into_iter().collect() })
}

/// Attempts to load the trailing file-index block from a single-stream
/// archive, returning its block number (so the caller can exclude it from
/// normal decoding) and decoded entries.
///
/// Multi-stream files never consult the file-index (an appended stream
/// could have been produced by a tool with no notion of one at all), nor
/// does a last block whose decoded content does not start with the magic
/// value — both are treated the same as "no file-index", never an error.
fn try_load_file_index<R: Read + Seek>(input: &mut R, index: &Index) -> Result<Option<(u64, Vec<FileIndexEntry>)>> {
    if index.stream_count() != 1 {
        return Ok(None);
    }
    let Some(IndexEntry::Block(last)) = index.iter_blocks().last() else {
        return Ok(None);
    };
    let check = index
        .iter_streams()
        .next()
        .and_then(|entry| match entry {
            IndexEntry::Stream(s) => s.flags.map(|f| f.check),
            IndexEntry::Block(_) => None,
        })
        .unwrap_or(IntegrityCheck::Crc32);

    input.seek(SeekFrom::Start(last.compressed_file_offset))?;
    let mut raw = vec![0u8; usize::try_from(last.total_size).unwrap_or(usize::MAX)];
    input.read_exact(&mut raw)?;

    let header_size = codec::block_header_size(raw[0]);
    if header_size > raw.len() {
        return Ok(None);
    }
    let (header, payload) = raw.split_at(header_size);
    let decoded = match codec::decode_block(header, check, payload, usize::try_from(last.uncompressed_size).unwrap_or(usize::MAX)) {
        Ok(d) => d,
        Err(_) => return Ok(None),
    };
    if !file_index::has_magic(&decoded) {
        return Ok(None);
    }
    let entries = file_index::decode(&decoded)?;
    Ok(Some((last.number_in_file, entries)))
}

/// Decompresses `input` (or, when `specs` is non-empty, extracts only the
/// members it names) into `output`.
///
/// Falls back to [`decompress_streaming`] when `input` does not look like a
/// valid indexed XZ file; `specs` must be empty in that case since random
/// access requires the index.
///
/// # Errors
///
/// Returns [`Error::Usage`] if `specs` is non-empty and `input` has no
/// usable index, [`Error::NotFound`] if a spec matches no file-index entry,
/// [`Error::Integrity`] if tar-verify is requested and the decompressed
/// content disagrees with the file-index, or an error from the codec or I/O.
pub fn decompress<R, W>(mut input: R, output: W, options: &DecompressionOptions, specs: &[Vec<u8>]) -> Result<DecompressStats>
where
    R: Read + Seek + Send + 'static,
    W: Write,
{
    let (workers, pool_size, pool_warning) = options.resolve_workers_and_pool()?;
    let pool = Pool::new(pool_size);

    let mut stats = match crate::index_walk::walk(&mut input)? {
        Some(index) => decompress_indexed(input, output, pool, workers, index, specs, options.verify_tar())?,
        None => {
            if !specs.is_empty() {
                return Err(Error::Usage(
                    "extracting specific members requires a usable index".to_string(),
                ));
            }
            input.seek(SeekFrom::Start(0))?;
            decompress_streaming(input, output, pool, workers)?
        }
    };
    stats.warnings.extend(pool_warning);
    Ok(stats)
}

/// Decompresses non-seekable `input` (e.g. a pipe), always through the
/// streaming reader. `specs` must be empty: streaming input offers no
/// random access.
///
/// # Errors
///
/// Returns [`Error::Usage`] if `specs` is non-empty, or an error from the
/// codec or I/O.
pub fn decompress_stream<R, W>(input: R, output: W, options: &DecompressionOptions, specs: &[Vec<u8>]) -> Result<DecompressStats>
where
    R: Read + Send + 'static,
    W: Write,
{
    if !specs.is_empty() {
        return Err(Error::Usage(
            "extracting specific members requires seekable input".to_string(),
        ));
    }
    let (workers, pool_size, pool_warning) = options.resolve_workers_and_pool()?;
    let pool = Pool::new(pool_size);
    let mut stats = decompress_streaming(input, output, pool, workers)?;
    stats.warnings.extend(pool_warning);
    Ok(stats)
}

fn decompress_indexed<R, W>(
    mut input: R,
    mut output: W,
    pool: Pool,
    workers: u32,
    index: Index,
    specs: &[Vec<u8>],
    verify_tar: bool,
) -> Result<DecompressStats>
where
    R: Read + Seek + Send + 'static,
    W: Write,
{
    let loaded = try_load_file_index(&mut input, &index)?;
    let (skip_number, entries) = match loaded {
        Some((number, entries)) => (Some(number), Some(entries)),
        None => (None, None),
    };

    let wanted: Option<Vec<WantedRange>> = if specs.is_empty() {
        None
    } else {
        let entries = entries
            .as_ref()
            .ok_or_else(|| Error::Index("no file-index present; cannot extract specific members".to_string()))?;
        Some(extract::plan(entries, specs)?)
    };

    let expected_members: Option<Vec<(Vec<u8>, u64)>> = if !verify_tar {
        None
    } else if let Some(wanted) = &wanted {
        Some(wanted.iter().map(|w| (w.name.clone(), w.size())).collect())
    } else {
        entries.as_ref().map(|entries| {
            entries
                .windows(2)
                .filter(|pair| !pair[0].path.is_empty())
                .map(|pair| (pair[0].path.clone(), pair[1].offset - pair[0].offset))
                .collect()
        })
    };

    let wanted_for_splitter = wanted.clone();
    let mut pipeline = Pipeline::start(
        pool,
        workers,
        move |io| crate::splitter_read::split_indexed(io, &mut input, &index, skip_number, wanted_for_splitter.as_deref()),
        |_idx, item| codec::decode_work_item(item),
    );

    let mut total_out = 0u64;
    let mut verify_buf = expected_members.is_some().then(Vec::new);

    while let Some(item) = pipeline.merged_next() {
        let item_start = item.uncompressed_offset;
        let item_end = item_start + item.output.len() as u64;

        if let Some(ranges) = wanted.as_deref() {
            for range in ranges {
                if range.start < item_end && item_start < range.end {
                    let from = usize::try_from(range.start.max(item_start) - item_start).unwrap_or(0);
                    let to = usize::try_from(range.end.min(item_end) - item_start).unwrap_or(0);
                    let slice = &item.output[from..to];
                    output.write_all(slice)?;
                    total_out += slice.len() as u64;
                    if let Some(buf) = verify_buf.as_mut() {
                        buf.extend_from_slice(slice);
                    }
                }
            }
        } else {
            output.write_all(&item.output)?;
            total_out += item.output.len() as u64;
            if let Some(buf) = verify_buf.as_mut() {
                buf.extend_from_slice(&item.output);
            }
        }
        pipeline.recycle(item);
    }
    pipeline.join()?;
    output.flush()?;

    if let (Some(buf), Some(expected)) = (verify_buf, expected_members) {
        verify_tar_contents(&buf, &expected)?;
    }

    Ok(DecompressStats { total_out, warnings: Vec::new() })
}

/// Decodes every block on the reader thread via
/// [`crate::splitter_read::split_streaming`], writing decoded chunks in
/// order as they arrive.
///
/// Applies the file-index detection heuristic: chunks are buffered one
/// block at a time (using [`crate::pool::WorkItem::is_block_start`] to find
/// block boundaries among the otherwise undifferentiated
/// [`ItemKind::Continuation`] chunks streaming mode always produces). A
/// completed block matching the file-index magic is held back rather than
/// written immediately, since it might be the trailing file-index block
/// original pixz appends on write. If the stream ends there, the guess is
/// confirmed and the held block is dropped silently (the expected,
/// successful case — original content never legitimately ends with it).
///
/// If instead another block follows a held-back block, the guess was
/// wrong: per SPEC_FULL.md §7/§9, this is the sole exception to "integrity
/// errors always abort" — the held bytes are written out (no data is lost)
/// and [`Warning::UnexpectedBlockAfterMagic`] is recorded rather than
/// silently continuing, so the caller can tell the user to pass `-t` if the
/// input is not actually a pixz archive.
fn decompress_streaming<R, W>(input: R, mut output: W, pool: Pool, workers: u32) -> Result<DecompressStats>
where
    R: Read + Send + 'static,
    W: Write,
{
    let mut pipeline = Pipeline::start(
        pool,
        workers,
        move |io| crate::splitter_read::split_streaming(io, input),
        |_idx, item| Ok(item),
    );

    let mut total_out = 0u64;
    let mut warnings = Vec::new();
    let mut pending = Vec::new();
    let mut have_pending = false;
    let mut held_match: Option<Vec<u8>> = None;

    while let Some(item) = pipeline.merged_next() {
        debug_assert!(matches!(item.kind, ItemKind::Continuation));
        if item.is_block_start && have_pending {
            if let Some(held) = held_match.take() {
                output.write_all(&held)?;
                total_out += held.len() as u64;
                warnings.push(Warning::UnexpectedBlockAfterMagic);
            }
            if file_index::has_magic(&pending) {
                held_match = Some(std::mem::take(&mut pending));
            } else {
                output.write_all(&pending)?;
                total_out += pending.len() as u64;
                pending.clear();
            }
        }
        have_pending = true;
        pending.extend_from_slice(&item.output);
        pipeline.recycle(item);
    }
    pipeline.join()?;

    if let Some(held) = held_match.take() {
        // A later block did start accumulating in `pending` below, so the
        // held block was not the final one after all.
        output.write_all(&held)?;
        total_out += held.len() as u64;
        warnings.push(Warning::UnexpectedBlockAfterMagic);
    }

    if have_pending {
        if file_index::has_magic(&pending) {
            // Last block of a single-stream archive, magic matched: this is
            // the file-index block original pixz appends on write, not part
            // of the original content.
        } else {
            output.write_all(&pending)?;
            total_out += pending.len() as u64;
        }
    }

    output.flush()?;
    Ok(DecompressStats { total_out, warnings })
}

/// Cross-checks a decompressed tar byte stream against the `(name, size)`
/// pairs the file-index or extract plan expected, in order.
///
/// # Errors
///
/// Returns [`Error::Integrity`] on any name/size mismatch or count
/// mismatch, or a tar parse error wrapped via `Error::Io`.
fn verify_tar_contents(buf: &[u8], expected: &[(Vec<u8>, u64)]) -> Result<()> {
    let mut archive = tar::Archive::new(std::io::Cursor::new(buf));
    let mut expected = expected.iter();

    for entry in archive.entries()? {
        let entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned().into_bytes();
        let size = entry.size();

        let Some((expected_name, expected_size)) = expected.next() else {
            return Err(Error::Integrity(
                "decompressed archive has more members than the file-index recorded".to_string(),
            ));
        };
        if &name != expected_name || size != *expected_size {
            return Err(Error::Integrity(format!(
                "member {:?} does not match file-index entry {:?}",
                String::from_utf8_lossy(&name),
                String::from_utf8_lossy(expected_name),
            )));
        }
    }

    if expected.next().is_some() {
        return Err(Error::Integrity(
            "file-index recorded more members than the decompressed archive contains".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn compress_then_decompress_roundtrips_raw_bytes() {
        let input = b"pixz merger roundtrip payload ".repeat(200);
        let options = CompressionOptions::default()
            .with_threads(crate::Threading::Exact(2))
            .without_tar_mode();
        let session = Session::new();

        let mut compressed = Vec::new();
        let stats = compress(Cursor::new(input.clone()), &mut compressed, &options, &session).unwrap();
        assert_eq!(stats.total_in, input.len() as u64);
        assert!(stats.total_out > 0);

        let mut decompressed = Vec::new();
        let decompress_options = DecompressionOptions::default();
        decompress(Cursor::new(compressed), &mut decompressed, &decompress_options, &[]).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn compress_then_decompress_streaming_roundtrips() {
        let input = b"streaming decode path payload ".repeat(50);
        let options = CompressionOptions::default()
            .with_threads(crate::Threading::Exact(1))
            .without_tar_mode();
        let session = Session::new();

        let mut compressed = Vec::new();
        compress(Cursor::new(input.clone()), &mut compressed, &options, &session).unwrap();

        let mut decompressed = Vec::new();
        let decompress_options = DecompressionOptions::default();
        decompress_stream(Cursor::new(compressed), &mut decompressed, &decompress_options, &[]).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn tar_mode_compress_then_extract_one_member() {
        let tar_bytes = build_tar(&[("a", b"a-body".repeat(10).as_slice()), ("b", b"b-body".repeat(10).as_slice())]);
        let options = CompressionOptions::default().with_threads(crate::Threading::Exact(2));
        let session = Session::new();

        let mut compressed = Vec::new();
        compress(Cursor::new(tar_bytes), &mut compressed, &options, &session).unwrap();

        let mut extracted = Vec::new();
        let decompress_options = DecompressionOptions::default();
        decompress(Cursor::new(compressed), &mut extracted, &decompress_options, &[b"b".to_vec()]).unwrap();

        let mut archive = tar::Archive::new(Cursor::new(extracted));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b".to_string()]);
    }

    #[test]
    fn tar_mode_full_decompress_passes_verify() {
        let tar_bytes = build_tar(&[("only", b"payload".repeat(5).as_slice())]);
        let options = CompressionOptions::default().with_threads(crate::Threading::Exact(1));
        let session = Session::new();

        let mut compressed = Vec::new();
        compress(Cursor::new(tar_bytes.clone()), &mut compressed, &options, &session).unwrap();

        let mut decompressed = Vec::new();
        let decompress_options = DecompressionOptions::default().with_tar_verify(true);
        decompress(Cursor::new(compressed), &mut decompressed, &decompress_options, &[]).unwrap();
        assert_eq!(decompressed, tar_bytes);
    }

    #[test]
    fn extract_with_no_file_index_is_usage_error() {
        let input = b"no tar mode here".repeat(10);
        let options = CompressionOptions::default().without_tar_mode();
        let session = Session::new();

        let mut compressed = Vec::new();
        compress(Cursor::new(input), &mut compressed, &options, &session).unwrap();

        let decompress_options = DecompressionOptions::default();
        let err = decompress(Cursor::new(compressed), &mut Vec::new(), &decompress_options, &[b"anything".to_vec()]).unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn small_pool_override_surfaces_as_warning() {
        let input = b"pool clamp warning payload ".repeat(20);
        let options = CompressionOptions::default()
            .with_threads(crate::Threading::Exact(4))
            .with_pool_size(1)
            .without_tar_mode();
        let session = Session::new();

        let mut compressed = Vec::new();
        let stats = compress(Cursor::new(input), &mut compressed, &options, &session).unwrap();
        assert_eq!(
            stats.warnings,
            vec![Warning::PoolSizeClamped { requested: 1, used: 4 }]
        );
    }

    #[test]
    fn streaming_decode_recovers_and_warns_when_magic_match_is_a_false_positive() {
        // Ordinary (non-file-index) data whose first block happens to start
        // with the file-index magic bytes, followed by further blocks: the
        // streaming heuristic must still write every byte and report
        // exactly one warning, never lose data.
        let mut input = file_index::MAGIC.to_le_bytes().to_vec();
        input.extend(std::iter::repeat(b'x').take(20_000));

        let options = CompressionOptions::default()
            .with_threads(crate::Threading::Exact(1))
            .with_block_fraction(0.0001)
            .without_tar_mode();
        let session = Session::new();

        let mut compressed = Vec::new();
        compress(Cursor::new(input.clone()), &mut compressed, &options, &session).unwrap();

        let mut decompressed = Vec::new();
        let decompress_options = DecompressionOptions::default();
        let stats =
            decompress_stream(Cursor::new(compressed), &mut decompressed, &decompress_options, &[]).unwrap();

        assert_eq!(decompressed, input);
        assert_eq!(stats.warnings, vec![Warning::UnexpectedBlockAfterMagic]);
    }
}
