//! Error type covering all failure modes in the pixz block pipeline.

use std::fmt;

pub use lzma_safe::Error as BackendError;

/// Result alias using the crate-level [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the splitter, pipeline, codec driver, or merger.
#[derive(Debug)]
pub enum Error {
    /// I/O failure while reading input or writing output.
    Io(std::io::Error),

    /// liblzma returned something other than `LZMA_OK`/`LZMA_STREAM_END`.
    Codec(BackendError),

    /// Input does not look like a valid XZ container, or a header/footer is
    /// truncated or internally inconsistent.
    Format(String),

    /// Bad caller-supplied configuration (invalid flag combination, missing
    /// file, unsupported check algorithm on write, etc).
    Usage(String),

    /// The file-index disagrees with what the tar reader reports (name or
    /// size mismatch). Always fatal; never downgraded to a warning.
    Integrity(String),

    /// A file-index was requested but the archive has none, or has one that
    /// cannot be trusted (e.g. a multi-stream file).
    Index(String),

    /// An extract spec matched no entry in the file-index.
    NotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Codec(err) => write!(f, "liblzma error: {err}"),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::Usage(msg) => write!(f, "{msg}"),
            Error::Integrity(msg) => write!(f, "integrity error: {msg}"),
            Error::Index(msg) => write!(f, "{msg}"),
            Error::NotFound(msg) => write!(f, "\"{msg}\" not found in archive"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::Codec(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_with_spec_quoted() {
        let err = Error::NotFound("docs/readme.txt".to_string());
        assert_eq!(err.to_string(), "\"docs/readme.txt\" not found in archive");
    }

    #[test]
    fn io_error_has_source() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
