//! CLI-level error wrapping: adds program-name/file context on top of
//! [`pixz_core::Error`], mirroring the teacher's `InvocationError`/
//! `CliError::{Warning, Error}` split used to drive `-q`/`-qq` suppression
//! (`examples/dsemak-xz-rs/xz-cli/error.rs`).
//!
//! `pixz` has no quiet flag (SPEC_FULL.md §6's CLI table omits one), but the
//! warning/error distinction survives for the one warning condition the
//! spec defines: the streaming file-index heuristic misfiring (§9).

use std::path::PathBuf;

use thiserror::Error;

/// Non-fatal conditions `pixz` reports to stderr without aborting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A block arrived after the streaming file-index heuristic had already
    /// decided to skip a trailing magic block, but it was not a
    /// continuation of that block (§9 "File-index detection on streams").
    #[error("unexpected block after file-index magic; pass -t if this is not a pixz archive")]
    UnexpectedBlockAfterMagic,

    /// A requested pool size (`-q`) was smaller than the worker count and
    /// was clamped up (SPEC_FULL.md §4.1, decision (a) in `DESIGN.md`).
    #[error("pool size {requested} is smaller than the worker count; using {used} instead")]
    PoolSizeClamped {
        /// The pool size the user asked for.
        requested: u32,
        /// The pool size actually used.
        used: u32,
    },
}

impl From<pixz_core::Warning> for Warning {
    fn from(warning: pixz_core::Warning) -> Self {
        match warning {
            pixz_core::Warning::PoolSizeClamped { requested, used } => Warning::PoolSizeClamped { requested, used },
            pixz_core::Warning::UnexpectedBlockAfterMagic => Warning::UnexpectedBlockAfterMagic,
        }
    }
}

/// Fatal CLI-level errors, layered on top of [`pixz_core::Error`].
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps a core pipeline error.
    #[error(transparent)]
    Core(#[from] pixz_core::Error),

    /// Could not open the input path.
    #[error("{}: {source}", path.display())]
    OpenInput {
        /// Input path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not create the output path.
    #[error("{}: {source}", path.display())]
    CreateOutput {
        /// Output path that failed to create.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Refused to write compressed bytes to a terminal.
    #[error("refusing to write compressed data to a terminal")]
    OutputIsTerminal,

    /// Could not derive an output filename from the input's suffix.
    #[error("{}: unrecognized suffix; specify -o explicitly", path.display())]
    UnknownSuffix {
        /// Input path with the unrecognized suffix.
        path: PathBuf,
    },

    /// Bad flag combination or argument count.
    #[error("{0}")]
    Usage(String),

    /// Could not remove the input file after a successful run.
    #[error("{}: cannot remove: {source}", path.display())]
    RemoveInput {
        /// Input path that failed to remove.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed writing formatted `-l`/`-l -v` output to stdout.
    #[error("{source}")]
    WriteOutput {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Either a [`Warning`] or a fatal [`Error`], the unit a single invocation
/// reports.
#[derive(Debug, Error)]
pub enum CliError {
    /// Non-fatal condition.
    #[error(transparent)]
    Warning(#[from] Warning),
    /// Fatal condition.
    #[error(transparent)]
    Error(#[from] Error),
}

impl From<pixz_core::Error> for CliError {
    fn from(err: pixz_core::Error) -> Self {
        CliError::Error(Error::Core(err))
    }
}

/// Specialized `Result` for `pixz-cli` operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// A [`CliError`] plus the program name and input path it occurred under,
/// formatted the way `pixz`'s single-line diagnostics (§7) require.
#[derive(Debug)]
pub struct InvocationError {
    /// Program name to prefix diagnostics with (always `"pixz"`).
    pub program: String,
    /// Input path, or `None` for stdin.
    pub file: Option<PathBuf>,
    /// The underlying error or warning.
    pub source: CliError,
}

impl InvocationError {
    /// Wraps `err` with `program`/`file` context.
    #[must_use]
    pub fn new(err: CliError, program: &str, file: Option<&std::path::Path>) -> Self {
        Self {
            program: program.to_string(),
            file: file.map(std::path::Path::to_path_buf),
            source: err,
        }
    }

    /// The process exit status this error maps to: 2 for usage errors, 1
    /// for everything else (SPEC_FULL.md §6 "Exit codes").
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match &self.source {
            CliError::Warning(_) => 1,
            CliError::Error(Error::Usage(_) | Error::Core(pixz_core::Error::Usage(_))) => 2,
            CliError::Error(_) => 1,
        }
    }
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.file.as_deref() {
            Some(path) => write!(f, "{}: {}: {}", self.program, path.display(), self.source),
            None => write!(f, "{}: (stdin): {}", self.program, self.source),
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_exits_with_status_two() {
        let err = InvocationError::new(CliError::Error(Error::Usage("bad".into())), "pixz", None);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn core_error_exits_with_status_one() {
        let err = InvocationError::new(
            CliError::Error(Error::Core(pixz_core::Error::NotFound("x".into()))),
            "pixz",
            None,
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn display_includes_program_and_file() {
        let err = InvocationError::new(
            CliError::Error(Error::OutputIsTerminal),
            "pixz",
            Some(std::path::Path::new("a.tar")),
        );
        assert_eq!(err.to_string(), "pixz: a.tar: refusing to write compressed data to a terminal");
    }
}
