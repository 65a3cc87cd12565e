//! Configuration builders for pipeline operations.

pub use lzma_safe::encoder::options::Compression;
use lzma_safe::encoder::options::IntegrityCheck;

use crate::error::{Error, Result};
use crate::threading::{sanitize_threads, Threading};
use crate::warning::Warning;

/// Default block-in-size multiplier of the preset's LZMA2 dictionary size.
pub const DEFAULT_BLOCK_FRACTION: f64 = 2.0;

/// Hard cap (bytes) on the uncompressed size of a block read indexed, in one
/// shot, by the random-access reader (C8). Larger blocks fall back to
/// streaming decode. See original pixz's `MAXSPLITSIZE`.
pub const MAX_SPLIT_SIZE: u64 = 128 * 1024 * 1024;

/// Chunk size (bytes) used when re-splitting a streaming-decoded block into
/// CONTINUATION work items. See original pixz's `STREAMSIZE`.
pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

/// Configuration for a compress (write) run.
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    level: Compression,
    threads: Threading,
    block_fraction: f64,
    pool_size: Option<u32>,
    tar_mode: bool,
    keep_input: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: Compression::Level6,
            threads: Threading::Auto,
            block_fraction: DEFAULT_BLOCK_FRACTION,
            pool_size: None,
            tar_mode: true,
            keep_input: false,
        }
    }
}

impl CompressionOptions {
    /// Sets the compression preset.
    #[must_use]
    pub fn with_level(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Sets the worker thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: Threading) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the block-in-size multiplier of the preset's dictionary size.
    #[must_use]
    pub fn with_block_fraction(mut self, fraction: f64) -> Self {
        self.block_fraction = fraction;
        self
    }

    /// Overrides the pipeline's work-item pool size (`-q`).
    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Disables tar member indexing, producing a plain multi-block XZ stream
    /// with no file-index (`-t`).
    #[must_use]
    pub fn without_tar_mode(mut self) -> Self {
        self.tar_mode = false;
        self
    }

    /// Keeps the input file after a successful compression (`-k`).
    #[must_use]
    pub fn keep_input(mut self, keep: bool) -> Self {
        self.keep_input = keep;
        self
    }

    /// Resolved integrity check. Always CRC32: see [`DESIGN.md`] decision (b) —
    /// the uncompressible fallback's tail is hard-wired to CRC32, so no other
    /// check is writable.
    #[must_use]
    pub fn check(&self) -> IntegrityCheck {
        IntegrityCheck::Crc32
    }

    #[must_use]
    pub fn level(&self) -> Compression {
        self.level
    }

    #[must_use]
    pub fn block_fraction(&self) -> f64 {
        self.block_fraction
    }

    #[must_use]
    pub fn tar_mode(&self) -> bool {
        self.tar_mode
    }

    #[must_use]
    pub fn keep_input_flag(&self) -> bool {
        self.keep_input
    }

    /// Resolves the worker count and work-item pool size.
    ///
    /// Returns the clamped-up [`Warning::PoolSizeClamped`] as the third
    /// element when a requested pool size (`-q`) was smaller than the
    /// worker count (decision (a) in `DESIGN.md`); the caller is
    /// responsible for reporting it, since this crate never writes to a
    /// terminal itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if the thread count exceeds the safe maximum.
    pub fn resolve_workers_and_pool(&self) -> Result<(u32, u32, Option<Warning>)> {
        resolve_workers_and_pool(self.threads, self.pool_size)
    }

    /// Block-in-size in bytes for the configured preset and fraction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if liblzma does not recognize the preset.
    pub fn block_in_size(&self) -> Result<u64> {
        let dict_size = u64::from(self.level.dict_size()?);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (dict_size as f64 * self.block_fraction) as u64;
        Ok(scaled.max(1))
    }
}

/// Configuration for a decompress/extract/list run.
#[derive(Debug, Clone, Default)]
pub struct DecompressionOptions {
    threads: Threading,
    pool_size: Option<u32>,
    keep_input: bool,
    verify_tar: bool,
}

impl DecompressionOptions {
    /// Sets the worker thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: Threading) -> Self {
        self.threads = threads;
        self
    }

    /// Overrides the pipeline's work-item pool size (`-q`).
    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Keeps the input file after a successful decompression (`-k`).
    #[must_use]
    pub fn keep_input(mut self, keep: bool) -> Self {
        self.keep_input = keep;
        self
    }

    /// Enables tar-verify on extraction: member name/size is checked against
    /// the file-index while reading.
    #[must_use]
    pub fn with_tar_verify(mut self, verify: bool) -> Self {
        self.verify_tar = verify;
        self
    }

    #[must_use]
    pub fn keep_input_flag(&self) -> bool {
        self.keep_input
    }

    #[must_use]
    pub fn verify_tar(&self) -> bool {
        self.verify_tar
    }

    /// Resolves the worker count and work-item pool size.
    ///
    /// Returns the clamped-up [`Warning::PoolSizeClamped`] as the third
    /// element when a requested pool size (`-q`) was smaller than the
    /// worker count (decision (a) in `DESIGN.md`); the caller is
    /// responsible for reporting it, since this crate never writes to a
    /// terminal itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if the thread count exceeds the safe maximum.
    pub fn resolve_workers_and_pool(&self) -> Result<(u32, u32, Option<Warning>)> {
        resolve_workers_and_pool(self.threads, self.pool_size)
    }
}

/// Shared implementation for `CompressionOptions`/`DecompressionOptions`'s
/// identical worker/pool resolution (decision (a) in `DESIGN.md`: a
/// requested pool smaller than the worker count is clamped up, since it
/// would otherwise deadlock the free queue, and the clamp is reported back
/// as a warning rather than printed here).
fn resolve_workers_and_pool(
    threads: Threading,
    pool_size: Option<u32>,
) -> Result<(u32, u32, Option<Warning>)> {
    let workers = sanitize_threads(threads)?.max(1);
    let (pool, warning) = match pool_size {
        Some(requested) if requested < workers => (
            workers,
            Some(Warning::PoolSizeClamped { requested, used: workers }),
        ),
        Some(requested) => (requested, None),
        None => {
            let scaled = f64::from(workers) * 1.3 + 1.0;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scaled = scaled.ceil() as u32;
            (scaled.max(workers), None)
        }
    };
    Ok((workers, pool, warning))
}
