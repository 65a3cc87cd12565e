//! Parallel, indexed XZ block pipeline: splitter, worker pool, and merger.
//!
//! This crate implements the core of pixz: a three-stage pipeline (splitter,
//! worker pool, merger) that produces and consumes a single, standard-
//! compliant XZ container while allowing block encode/decode to run on
//! multiple threads, and an auxiliary file-index block that lets a tar
//! member be extracted in time proportional to its own size rather than the
//! whole archive's.
//!
//! `pixz-core` never parses command-line arguments or touches a terminal;
//! that belongs to the `pixz-cli` binary crate built on top of it.

pub mod codec;
pub mod error;
pub mod extract;
pub mod file_index;
pub mod index_walk;
pub mod list;
pub mod merger;
pub mod options;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod session;
pub mod splitter_read;
pub mod splitter_write;
pub mod threading;
pub mod warning;

pub use error::{Error, Result};
pub use options::{Compression, CompressionOptions, DecompressionOptions};
pub use session::Session;
pub use threading::Threading;
pub use warning::Warning;
