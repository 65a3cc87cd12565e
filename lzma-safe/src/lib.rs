//! Safe FFI bindings to liblzma (XZ Utils).
//!
//! This crate provides safe, idiomatic Rust wrappers around the liblzma C library for LZMA/XZ
//! compression and decompression. It offers a high-level, RAII-based API that automatically
//! manages resources and provides comprehensive error handling.
//!
//! In addition to the streaming `lzma_stream`-based encoder/decoder, this crate exposes the
//! one-shot Block API (`lzma_block_encoder`/`lzma_block_decoder` and friends) through the
//! [`block`] module, and the combined multi-stream `lzma_index` API through [`stream::index`].

pub mod block;
pub mod decoder;
pub mod encoder;
mod error;
pub(crate) mod ffi;
pub mod stream;

pub use decoder::Decoder;
pub use decoder::FileInfoDecoder;
pub use decoder::IndexDecoder;
pub use encoder::AloneEncoder;
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use stream::Stream;
pub use stream::index::{BlockInfo, Index, IndexEntry, IndexIterMode, IndexIterator, StreamFlags, StreamInfo};

/// Coding action passed to `lzma_code()` and the Block API.
///
/// Mirrors `lzma_action` from liblzma. Not every action is meaningful for every coder; see
/// the liblzma documentation for `LZMA_SYNC_FLUSH`/`LZMA_FULL_FLUSH`/`LZMA_FULL_BARRIER`
/// restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Coder may buffer input and produce no output (`LZMA_RUN`).
    Run,
    /// Make all input available as output without ending the stream (`LZMA_SYNC_FLUSH`).
    SyncFlush,
    /// Like `SyncFlush`, but starts a new LZMA2 chunk (`LZMA_FULL_FLUSH`).
    FullFlush,
    /// Finish coding: no more input will be given (`LZMA_FINISH`).
    Finish,
}

impl From<Action> for liblzma_sys::lzma_action {
    fn from(action: Action) -> Self {
        match action {
            Action::Run => liblzma_sys::lzma_action_LZMA_RUN,
            Action::SyncFlush => liblzma_sys::lzma_action_LZMA_SYNC_FLUSH,
            Action::FullFlush => liblzma_sys::lzma_action_LZMA_FULL_FLUSH,
            Action::Finish => liblzma_sys::lzma_action_LZMA_FINISH,
        }
    }
}
