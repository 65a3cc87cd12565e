//! Block-level LZMA2 codec.
//!
//! An XZ Block pairs a small header (filter chain, optional compressed/uncompressed
//! size fields) with a compressed payload and trailing check value. These wrappers use
//! the streaming `lzma_block_encoder`/`lzma_block_decoder` + `lzma_code` pair rather
//! than the one-shot buffer functions, matching how block boundaries are driven
//! incrementally by a caller that owns the surrounding pipeline.

use crate::encoder::options::IntegrityCheck;
use crate::{Action, Error, Result, Stream};

/// Maximum size of a single LZMA2 uncompressed chunk (`1 << 16`).
pub const LZMA_CHUNK_MAX: usize = 1 << 16;

/// Bytes needed to store `insize` bytes using the raw (uncompressed) LZMA2 chunk
/// encoding: each chunk costs a control byte plus a 2-byte big-endian size, and the
/// whole run is terminated by a single zero byte, then padded to a 4-byte boundary.
#[must_use]
pub fn uncompressed_size(insize: usize) -> usize {
    uncompressed_unpadded_size(insize).div_ceil(4) * 4
}

/// Same accounting as [`uncompressed_size`], but without the final rounding to a
/// 4-byte boundary — the exact compressed-data length the XZ Index field's
/// "unpadded size" needs (it counts the Block Padding bytes out separately).
#[must_use]
pub fn uncompressed_unpadded_size(insize: usize) -> usize {
    let chunks = insize.div_ceil(LZMA_CHUNK_MAX).max(1);
    insize + chunks * 3 + 1
}

/// Encode `input` as a sequence of raw (uncompressed) LZMA2 chunks, the fallback used
/// when compression would not shrink the data.
///
/// Output format: repeating `[0x01][size-1 as u16 BE][chunk bytes]`, a terminating
/// `0x00`, zero padding to a 4-byte boundary, then the CRC32 of `input` as little-endian
/// bytes. Returns the number of bytes written to `output`, which must be at least
/// [`uncompressed_size`]`(input.len()) + 4` bytes long.
pub fn encode_uncompressed_chunks(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let needed = uncompressed_size(input.len()) + 4;
    if output.len() < needed {
        return Err(Error::BufError);
    }

    let mut pos = 0;
    let mut remain = input;
    while !remain.is_empty() {
        let size = remain.len().min(LZMA_CHUNK_MAX);
        let (chunk, rest) = remain.split_at(size);
        output[pos] = 1;
        #[allow(clippy::cast_possible_truncation)]
        let size_minus_one = (size - 1) as u16;
        output[pos + 1..pos + 3].copy_from_slice(&size_minus_one.to_be_bytes());
        output[pos + 3..pos + 3 + size].copy_from_slice(chunk);
        pos += 3 + size;
        remain = rest;
    }
    output[pos] = 0;
    pos += 1;

    while pos % 4 != 0 {
        output[pos] = 0;
        pos += 1;
    }

    let check = crate::ffi::crc32(input, 0);
    output[pos..pos + 4].copy_from_slice(&check.to_le_bytes());
    pos += 4;

    Ok(pos)
}

/// Streaming encoder for a single XZ Block.
///
/// Writes the block header on the first call to [`BlockEncoder::encode`], then feeds
/// input through `lzma_code` until the final call (`last = true`) reaches
/// `LZMA_STREAM_END`. Callers that hit [`Error::BufError`] should fall back to
/// [`encode_uncompressed_chunks`] and write a raw block instead.
pub struct BlockEncoder {
    block: liblzma_sys::lzma_block,
    header: Vec<u8>,
    stream: Option<Stream>,
    started: bool,
    // Kept alive for the lifetime of `block.filters`, which points into this buffer.
    _filters: crate::encoder::options::RawFilters,
}

impl BlockEncoder {
    /// Create a new block encoder for the given filter chain and integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionsError`] if the filter chain is invalid, or
    /// [`Error::ProgError`]/[`Error::MemError`] on liblzma-internal failures.
    pub fn new(
        filters: &[crate::encoder::options::FilterConfig],
        check: IntegrityCheck,
    ) -> Result<Self> {
        let raw_filters = crate::encoder::options::prepare_filters(filters);
        let (block, header) = crate::ffi::lzma_block_header_encode(&raw_filters, check)?;
        Ok(Self {
            block,
            header,
            stream: Some(Stream::default()),
            started: false,
            _filters: raw_filters,
        })
    }

    /// The encoded block header bytes; callers write this before any compressed payload.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Size this block would occupy once padded and appended with its check value, given
    /// the compressed payload size written so far. Valid only after encoding finishes.
    #[must_use]
    pub fn unpadded_size(&self) -> u64 {
        crate::ffi::lzma_block_unpadded_size(&self.block)
    }

    /// Feed `input` through the block encoder, writing compressed bytes to `output`.
    ///
    /// Pass `last = true` exactly once, when `input` holds the final bytes of the
    /// block; this drives `LZMA_FINISH` and is required to flush the integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufError`] if `output` cannot hold the produced bytes without
    /// growing; the caller should retry with a larger buffer or fall back to the
    /// uncompressed chunk encoding.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], last: bool) -> Result<(usize, usize)> {
        let mut stream = self.stream.take().ok_or(Error::ProgError)?;

        if !self.started {
            crate::ffi::lzma_block_encoder(&mut stream, &mut self.block)?;
            self.started = true;
        }

        if !input.is_empty() {
            stream.set_next_input(input);
        }
        stream.set_next_out(output);

        let input_before = stream.avail_in();
        let output_before = stream.avail_out();
        let action = if last { Action::Finish } else { Action::Run };
        let result = crate::ffi::lzma_code(&mut stream, action);
        let bytes_read = input_before - stream.avail_in();
        let bytes_written = output_before - stream.avail_out();

        match result {
            Ok(()) => {
                self.stream = Some(stream);
                Ok((bytes_read, bytes_written))
            }
            Err(Error::StreamEnd) => {
                stream.finish();
                Ok((bytes_read, bytes_written))
            }
            Err(err) => {
                self.stream = Some(stream);
                Err(err)
            }
        }
    }
}

/// Streaming decoder for a single XZ Block, given its already-decoded header.
pub struct BlockDecoder {
    block: liblzma_sys::lzma_block,
    stream: Option<Stream>,
    // Kept alive for the lifetime of `block.filters`, which points into this buffer.
    _filters: Vec<liblzma_sys::lzma_filter>,
}

impl BlockDecoder {
    /// Create a decoder for a block whose header has already been read into `header`.
    ///
    /// `check` must be the integrity check type recorded for this block's Stream (XZ
    /// does not repeat the check type per-block, so the caller supplies it from the
    /// Stream Header/Footer flags).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataError`] if `header` is not a valid block header, or
    /// [`Error::OptionsError`]/[`Error::MemError`] on liblzma-internal failures.
    pub fn new(header: &[u8], check: IntegrityCheck) -> Result<Self> {
        let (mut block, filters) = crate::ffi::lzma_block_header_decode(header, check)?;
        let mut stream = Stream::default();
        crate::ffi::lzma_block_decoder(&mut stream, &mut block)?;
        Ok(Self {
            block,
            stream: Some(stream),
            _filters: filters,
        })
    }

    /// Decode block payload bytes from `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataError`] on corrupted input, [`Error::BufError`] if no
    /// progress is possible with the current buffers.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize)> {
        let mut stream = self.stream.take().ok_or(Error::ProgError)?;

        if !input.is_empty() {
            stream.set_next_input(input);
        }
        stream.set_next_out(output);

        let input_before = stream.avail_in();
        let output_before = stream.avail_out();
        let action = if input.is_empty() {
            Action::Finish
        } else {
            Action::Run
        };
        let result = crate::ffi::lzma_code(&mut stream, action);
        let bytes_read = input_before - stream.avail_in();
        let bytes_written = output_before - stream.avail_out();

        match result {
            Ok(()) => {
                self.stream = Some(stream);
                Ok((bytes_read, bytes_written))
            }
            Err(Error::StreamEnd) => {
                stream.finish();
                Ok((bytes_read, bytes_written))
            }
            Err(err) => {
                self.stream = Some(stream);
                Err(err)
            }
        }
    }

    /// Whether the block has been fully decoded (reached `LZMA_STREAM_END`).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for BlockDecoder {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_size_single_chunk() {
        // One chunk: control(1) + size(2) + data + terminator(1), rounded to 4.
        let size = uncompressed_size(10);
        assert_eq!(size, (10 + 3 + 1).div_ceil(4) * 4);
    }

    #[test]
    fn uncompressed_size_multiple_chunks() {
        let insize = LZMA_CHUNK_MAX * 2 + 100;
        let size = uncompressed_size(insize);
        let chunks = 3;
        let data_size = insize + chunks * 3 + 1;
        assert_eq!(size, data_size.div_ceil(4) * 4);
    }

    #[test]
    fn encode_uncompressed_chunks_roundtrip_crc() {
        let input = b"hello pixz world, this data will not compress well".repeat(3);
        let needed = uncompressed_size(input.len()) + 4;
        let mut output = vec![0u8; needed];
        let written = encode_uncompressed_chunks(&input, &mut output).unwrap();
        assert_eq!(written, needed);

        // First byte is the raw-chunk control code.
        assert_eq!(output[0], 1);

        // Last 4 bytes are the little-endian CRC32 of the input.
        let crc_bytes: [u8; 4] = output[written - 4..written].try_into().unwrap();
        let expected = crate::ffi::crc32(&input, 0);
        assert_eq!(u32::from_le_bytes(crc_bytes), expected);
    }

    #[test]
    fn encode_uncompressed_chunks_rejects_small_buffer() {
        let input = vec![0u8; 100];
        let mut output = vec![0u8; 4];
        let err = encode_uncompressed_chunks(&input, &mut output).unwrap_err();
        assert!(matches!(err, Error::BufError));
    }
}
