//! Multi-stream index walker (C5): drive `lzma_safe`'s file-info decoder
//! over a seekable input to build the combined logical index for every
//! concatenated XZ stream in the file.
//!
//! `lzma_safe::FileInfoDecoder` already performs the whole backward-seek
//! footer/padding/index walk internally (SPEC_FULL.md §4.5); this module is
//! the driving loop a random-access reader needs on top of it, grounded on
//! `xz-core/src/file_info.rs`'s backward multi-stream walk shape.

use std::io::{Read, Seek, SeekFrom};

use lzma_safe::{Action, Index, Stream};

use crate::error::Result;

/// Memory limit passed to the underlying liblzma index decoder. Index-only
/// operations never bound this explicitly, matching original pixz's
/// unlimited `MEMLIMIT` for list/extract planning.
const MEMLIMIT: u64 = u64::MAX;

/// Walks every XZ stream in `input` back-to-front and returns the combined
/// logical index (SPEC_FULL.md §4.5), or `None` if `input` is empty, not a
/// valid XZ file, or the walk otherwise cannot complete — callers fall back
/// to the streaming reader in that case (SPEC_FULL.md §4.5 "Failure").
///
/// # Errors
///
/// Returns an error only on an I/O failure reading or seeking `input`;
/// format mismatches are reported as `Ok(None)`, not an `Err`, so callers
/// can fall back uniformly.
pub fn walk<R: Read + Seek>(input: &mut R) -> Result<Option<Index>> {
    let file_size = input.seek(SeekFrom::End(0))?;
    if file_size == 0 {
        return Ok(None);
    }
    input.seek(SeekFrom::Start(0))?;

    let mut decoder = match Stream::default().file_info_decoder(MEMLIMIT, file_size) {
        Ok(decoder) => decoder,
        Err(_) => return Ok(None),
    };

    let mut buf = vec![0u8; 64 * 1024];
    while !decoder.is_finished() {
        let n = input.read(&mut buf)?;
        let action = if n == 0 { Action::Finish } else { Action::Run };

        match decoder.process(&buf[..n], action) {
            Ok(consumed) => {
                let unused = n - consumed;
                if unused > 0 {
                    #[allow(clippy::cast_possible_wrap)]
                    input.seek(SeekFrom::Current(-(unused as i64)))?;
                }
                if n == 0 && !decoder.is_finished() {
                    // EOF reached with no progress and no pending seek: not
                    // a valid (multi-stream) XZ file.
                    return Ok(None);
                }
            }
            Err(lzma_safe::Error::SeekNeeded) => {
                let target = decoder.seek_pos();
                input.seek(SeekFrom::Start(target))?;
            }
            Err(_) => return Ok(None),
        }
    }

    Ok(decoder.into_index())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use lzma_safe::encoder::options::{Compression, IntegrityCheck};

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
    fn walk_reports_none_for_non_xz_input() {
        let mut cursor = Cursor::new(b"not an xz file at all".to_vec());
        assert!(walk(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn walk_reports_none_for_empty_input() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(walk(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn walk_recovers_single_stream_block_count() {
        let stream = xz_stream(b"hello pixz world, walked back to front");
        let mut cursor = Cursor::new(stream);
        let index = walk(&mut cursor).unwrap().expect("valid xz stream");
        assert_eq!(index.stream_count(), 1);
        assert_eq!(index.block_count(), 1);
    }

    #[test]
    fn walk_concatenates_two_streams_in_file_order() {
        let mut combined = xz_stream(b"first stream payload");
        combined.extend(xz_stream(b"second stream payload"));
        let mut cursor = Cursor::new(combined);

        let index = walk(&mut cursor).unwrap().expect("valid multi-stream xz file");
        assert_eq!(index.stream_count(), 2);
        assert_eq!(index.block_count(), 2);

        let offsets: Vec<u64> = index
            .iter_blocks()
            .map(|entry| match entry {
                lzma_safe::IndexEntry::Block(block) => block.uncompressed_file_offset,
                lzma_safe::IndexEntry::Stream(_) => unreachable!("Block iter mode"),
            })
            .collect();
        assert_eq!(offsets, vec![0, "first stream payload".len() as u64]);
    }
}
