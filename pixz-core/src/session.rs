//! Session (ADDED): the one value shared between the write-side splitter
//! thread and the main thread's merger, replacing original pixz's
//! process-global `gFileIndex`/`gLastFile` linked list.
//!
//! Grounded on SPEC_FULL.md §9 "Global mutable state": the rewrite collects
//! what the original scattered across process globals into explicit fields
//! passed into the threads that need them, rather than true statics.

use std::sync::{Arc, Mutex};

/// One `(path, offset)` pair recorded as tar members are discovered by the
/// write-side splitter (C7). See SPEC_FULL.md §3 "File-index entry".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    /// Tar member path, as stored in the tar header (not the file-index's
    /// own NUL-terminated wire encoding).
    pub path: Vec<u8>,
    /// Uncompressed tar-stream offset of this member's header.
    pub offset: u64,
}

/// Returns whether `path`'s basename begins with `._`, marking it as a tar
/// "copyfile" / extended-header companion entry rather than a real member.
#[must_use]
pub fn is_multi_header(path: &[u8]) -> bool {
    let basename = path.rsplit(|&b| b == b'/').next().unwrap_or(path);
    basename.starts_with(b"._")
}

/// Accumulates file-index entries as the write-side splitter walks tar
/// headers, coalescing multi-header companions onto the entry that follows
/// them (SPEC_FULL.md §3, grounded on original pixz's `add_file`).
#[derive(Debug, Default)]
pub struct FileIndexBuilder {
    entries: Vec<FileIndexEntry>,
    pending_offset: Option<u64>,
}

impl FileIndexBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tar member header at `offset`.
    ///
    /// A `._`-prefixed basename records its offset as pending and is not
    /// added as its own entry; the next non-multi-header entry adopts that
    /// pending offset instead of its own.
    pub fn add_file(&mut self, offset: u64, path: Vec<u8>) {
        if is_multi_header(&path) {
            if self.pending_offset.is_none() {
                self.pending_offset = Some(offset);
            }
            return;
        }
        let offset = self.pending_offset.take().unwrap_or(offset);
        self.entries.push(FileIndexEntry { path, offset });
    }

    /// Entries recorded so far, not yet terminated.
    #[must_use]
    pub fn entries(&self) -> &[FileIndexEntry] {
        &self.entries
    }

    /// Consumes the builder, appending the terminal empty-path entry whose
    /// offset is the total uncompressed size (SPEC_FULL.md §3).
    #[must_use]
    pub fn finish(mut self, total_size: u64) -> Vec<FileIndexEntry> {
        self.entries.push(FileIndexEntry {
            path: Vec::new(),
            offset: total_size,
        });
        self.entries
    }
}

/// Shared state threaded between the write-side splitter thread and the
/// main thread's merger for a single compress run.
///
/// The splitter locks [`Session::file_index`] to append entries as it
/// parses tar headers; the merger locks it exactly once, after
/// [`crate::pipeline::Pipeline::join`] has returned, to read the finished
/// list — the thread join is the happens-before edge the original relied on
/// implicitly via `pthread_join`.
#[derive(Clone, Default)]
pub struct Session {
    file_index: Arc<Mutex<FileIndexBuilder>>,
}

impl Session {
    /// Creates a fresh session with an empty file-index builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the shared file-index builder.
    #[must_use]
    pub fn file_index(&self) -> &Arc<Mutex<FileIndexBuilder>> {
        &self.file_index
    }
}
