//! Splitter — write (C7): feed a streaming tar reader while chunking the
//! exact same raw bytes into fixed-size work items for the encoder pool.
//!
//! Grounded on original pixz's `read_thread`/`add_file`
//! (`examples/original_source/src/write.c`); tar member boundary discovery
//! uses the `tar` crate instead of a custom libarchive read callback, since
//! the `tar` crate already skips an entry's unread body when advancing to
//! the next header.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::pipeline::SplitterIo;
use crate::pool::WorkItem;
use crate::session::FileIndexBuilder;

/// Forwards every byte read from `inner` into fixed-size work items
/// dispatched through a [`SplitterIo`], whether sitting underneath the
/// `tar` crate's entry iterator (tar mode) or read directly (raw mode).
struct Chunker<'a, R> {
    inner: R,
    io: &'a mut SplitterIo,
    current: Option<WorkItem>,
    block_in_size: usize,
    total: u64,
    stopped: bool,
}

impl<'a, R: Read> Chunker<'a, R> {
    fn new(inner: R, io: &'a mut SplitterIo, block_in_size: usize) -> Self {
        let current = io.acquire_free();
        let stopped = current.is_none();
        Self {
            inner,
            io,
            current,
            block_in_size,
            total: 0,
            stopped,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        if self.stopped {
            return;
        }
        self.total += bytes.len() as u64;

        let mut remaining = bytes;
        while !remaining.is_empty() {
            let Some(item) = self.current.as_mut() else {
                return;
            };
            let space = self.block_in_size.saturating_sub(item.input.len());
            let take = space.min(remaining.len());
            item.input.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if item.input.len() >= self.block_in_size {
                let full = self.current.take().expect("checked Some above");
                self.io.dispatch(full);
                self.current = self.io.acquire_free();
                if self.current.is_none() {
                    self.stopped = true;
                }
            }
        }
    }

    /// Flushes any remaining partial item per SPEC_FULL.md §4.7 "End of
    /// input": a non-empty tail is dispatched, an empty one is returned to
    /// the free queue untouched. Returns the total bytes read.
    fn finish(mut self) -> u64 {
        if let Some(item) = self.current.take() {
            if item.input.is_empty() {
                self.io.release(item);
            } else {
                self.io.dispatch(item);
            }
        }
        self.total
    }
}

impl<R: Read> Read for Chunker<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.stopped {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.push(&buf[..n]);
        }
        Ok(n)
    }
}

/// Drives the write-side splitter: in tar mode, parses `input` as a tar
/// stream, recording each member's header offset into `file_index` (with
/// `._`-prefixed companion coalescing, see [`crate::session::FileIndexBuilder`]);
/// every raw byte read — whether consumed by tar header parsing or skipped
/// past an entry's body — is chunked into fixed-size work items dispatched
/// through `io`.
///
/// Falls back to plain chunking with no file-index when `tar_mode` is
/// requested but `input`'s very first header fails to parse
/// (SPEC_FULL.md §4.7 "Raw-mode detection").
///
/// Returns the total number of uncompressed bytes read.
///
/// # Errors
///
/// Returns an error from a tar header parse failure after at least one
/// member has already been recorded (a genuinely corrupt archive, not a
/// non-tar input), or from the underlying reader.
pub fn split<R: Read>(
    mut io: SplitterIo,
    input: R,
    block_in_size: u64,
    tar_mode: bool,
    file_index: Option<Arc<Mutex<FileIndexBuilder>>>,
) -> Result<u64> {
    #[allow(clippy::cast_possible_truncation)]
    let block_in_size = (block_in_size.max(1) as usize).max(1);

    if !tar_mode {
        let mut chunker = Chunker::new(input, &mut io, block_in_size);
        std::io::copy(&mut chunker, &mut std::io::sink())?;
        return Ok(chunker.finish());
    }

    let chunker = Chunker::new(input, &mut io, block_in_size);
    let mut archive = tar::Archive::new(chunker);
    let mut saw_any_entry = false;

    let result = (|| -> Result<()> {
        for entry in archive.entries()? {
            let entry = entry?;
            saw_any_entry = true;
            let offset = entry.raw_header_position();
            let path = entry.path()?.to_string_lossy().into_owned().into_bytes();
            if let Some(fi) = &file_index {
                fi.lock()
                    .expect("file index mutex poisoned")
                    .add_file(offset, path);
            }
        }
        Ok(())
    })();

    let total = archive.into_inner().finish();

    match result {
        Ok(()) => Ok(total),
        Err(_) if !saw_any_entry => {
            // The very first header failed to parse: not a tar stream at
            // all. Bytes already read were chunked regardless of format, so
            // the run continues as a plain chunker with no file-index.
            Ok(total)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::pipeline::Pipeline;
    use crate::pool::Pool;

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
    fn raw_mode_chunks_without_file_index() {
        let data = vec![7u8; 50];
        let pool = Pool::new(4);
        let mut collected = Vec::new();
        let mut pipeline = Pipeline::start(
            pool,
            1,
            {
                let data = data.clone();
                move |io| split(io, Cursor::new(data), 16, false, None).map(|_| ())
            },
            |_idx, item| Ok(item),
        );
        while let Some(item) = pipeline.merged_next() {
            collected.extend_from_slice(&item.input);
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();
        assert_eq!(collected, data);
    }

    #[test]
    fn tar_mode_records_member_offsets() {
        let tar_bytes = build_tar(&[("a", b"x".repeat(100).as_slice()), ("b", b"y".repeat(100).as_slice())]);
        let session_file_index = Arc::new(Mutex::new(FileIndexBuilder::new()));

        let pool = Pool::new(8);
        let fi = Arc::clone(&session_file_index);
        let mut pipeline = Pipeline::start(
            pool,
            2,
            move |io| {
                let total = split(io, Cursor::new(tar_bytes), 4096, true, Some(fi))?;
                let _ = total;
                Ok(())
            },
            |_idx, item| Ok(item),
        );
        while let Some(item) = pipeline.merged_next() {
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();

        let builder = Arc::try_unwrap(session_file_index)
            .unwrap_or_else(|_| panic!("splitter thread still holds a reference"))
            .into_inner()
            .unwrap();
        let entries = builder.finish(0);
        let names: Vec<&[u8]> = entries.iter().map(|e| e.path.as_slice()).collect();
        assert_eq!(names, vec![b"a".as_slice(), b"b".as_slice(), b""]);
        assert_eq!(entries[0].offset, 0);
    }

    #[test]
    fn non_tar_input_falls_back_to_raw_chunking() {
        let data = b"definitely not a tar header".to_vec();
        let pool = Pool::new(4);
        let mut collected = Vec::new();
        let mut pipeline = Pipeline::start(
            pool,
            1,
            {
                let data = data.clone();
                move |io| split(io, Cursor::new(data), 512, true, None).map(|_| ())
            },
            |_idx, item| Ok(item),
        );
        while let Some(item) = pipeline.merged_next() {
            collected.extend_from_slice(&item.input);
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();
        assert_eq!(collected, data);
    }
}
