//! Non-fatal conditions surfaced alongside a successful run's stats.
//!
//! Unlike [`crate::error::Error`], a [`Warning`] never aborts an operation —
//! it is accumulated on [`crate::merger::CompressStats`]/
//! [`crate::merger::DecompressStats`] and left for the caller (`pixz-cli`) to
//! report, since this crate never writes to a terminal itself.

use std::fmt;

/// A condition worth telling the user about even though the run succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// A requested work-item pool size (`-q`) was smaller than the worker
    /// count and was clamped up to avoid deadlocking the free queue (SPEC
    /// §4.1, decision (a) in `DESIGN.md`).
    PoolSizeClamped {
        /// The pool size the caller asked for.
        requested: u32,
        /// The pool size actually used.
        used: u32,
    },

    /// The streaming (non-seekable) file-index heuristic tentatively
    /// skipped a block that matched the file-index magic, but a later block
    /// proved it was not actually the trailing file-index. The skipped
    /// block's bytes were still written; this only flags that the guess was
    /// wrong (SPEC §7/§9).
    UnexpectedBlockAfterMagic,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PoolSizeClamped { requested, used } => write!(
                f,
                "pool size {requested} is smaller than the worker count; using {used} instead"
            ),
            Warning::UnexpectedBlockAfterMagic => write!(
                f,
                "a block matching the file-index magic was followed by another block; \
                 treating it as ordinary data (pass -t if this is not a pixz archive)"
            ),
        }
    }
}
