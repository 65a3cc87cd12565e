//! Single-block XZ codec (C4): encode one block's worth of input through the
//! LZMA2 filter chain, falling back to the uncompressible raw-chunk encoding
//! liblzma itself uses when a block would not shrink, and decode a block back
//! given its header and the stream's integrity check.
//!
//! Grounded on `lzma_safe::block::{BlockEncoder, BlockDecoder}`, which already
//! drive the streaming `lzma_block_encoder`/`lzma_block_decoder` pair; this
//! module only owns the budget/fallback policy a pipeline worker needs.

use lzma_safe::block::{encode_uncompressed_chunks, uncompressed_size, BlockDecoder, BlockEncoder};
use lzma_safe::encoder::options::{Compression, FilterConfig, FilterOptions, FilterType, IntegrityCheck};
use lzma_safe::Error as BackendError;

use crate::error::Result;
use crate::pool::WorkItem;

/// A single encoded XZ block: header bytes plus payload (compressed or raw
/// chunks, always including the trailing check value).
pub struct EncodedBlock {
    /// Block header bytes, written once before the payload.
    pub header: Vec<u8>,
    /// Payload bytes: compressed stream or raw LZMA2 chunks, check included.
    pub payload: Vec<u8>,
    /// Whether `payload` is the uncompressible raw-chunk fallback.
    pub uncompressible: bool,
    /// Exact `header + compressed-data + check` size the XZ Index field
    /// records for this block — excludes the Block Padding bytes folded into
    /// `payload`, which [`Index::append_block`](lzma_safe::Index::append_block)
    /// derives from this value instead of from `header.len() + payload.len()`.
    pub unpadded_size: u64,
}

/// Builds the single-filter LZMA2 chain a pixz block uses, from a preset.
///
/// # Errors
///
/// Returns an error if the linked liblzma does not recognize `level`.
fn lzma2_filter_chain(level: Compression) -> Result<Vec<FilterConfig>> {
    let opts = level.lzma2_options()?;
    Ok(vec![FilterConfig {
        filter_type: FilterType::Lzma2,
        options: Some(FilterOptions::Lzma(opts)),
    }])
}

/// Encodes `input` as a single XZ block, trying real LZMA2 compression first
/// and falling back to the raw (uncompressible) chunk encoding when the
/// compressed form would not fit a buffer sized for the worst case.
///
/// # Errors
///
/// Returns an error if the filter chain is invalid or the backend reports a
/// failure other than the buffer-full condition that triggers the fallback.
pub fn encode_block(level: Compression, check: IntegrityCheck, input: &[u8]) -> Result<EncodedBlock> {
    let filters = lzma2_filter_chain(level)?;
    let budget = uncompressed_size(input.len()) + check.size();

    let mut encoder = BlockEncoder::new(&filters, check)?;
    let header = encoder.header().to_vec();
    let mut payload = vec![0u8; budget];

    match drive_encoder(&mut encoder, input, &mut payload) {
        Ok(written) => {
            payload.truncate(written);
            let unpadded_size = encoder.unpadded_size();
            Ok(EncodedBlock {
                header,
                payload,
                uncompressible: false,
                unpadded_size,
            })
        }
        Err(BackendError::BufError) => {
            // LZMA2's own chunk format already supports literal (uncompressed)
            // chunks alongside compressed ones, so the block header — which
            // only describes the filter chain — stays valid for either.
            let needed = uncompressed_size(input.len()) + 4;
            let mut raw = vec![0u8; needed];
            let written = encode_uncompressed_chunks(input, &mut raw)?;
            raw.truncate(written);

            // The raw-chunk payload is already 4-byte aligned internally (the
            // chunk terminator padding), so unlike the general case its
            // unpadded size is simply header + payload: there is no separate
            // XZ Block Padding to account for on top of it.
            let unpadded_size = (header.len() + raw.len()) as u64;
            Ok(EncodedBlock {
                header,
                payload: raw,
                uncompressible: true,
                unpadded_size,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Drives `encoder` to completion against a single in-memory `input`, calling
/// `encode` until liblzma signals no further progress is possible, and
/// returns the number of bytes written to `output`.
///
/// Caps iteration count defensively: with `output` sized for the worst case
/// a single call should finish the block, but liblzma's block encoder offers
/// no direct `is_finished` signal (unlike [`BlockDecoder`]), so this keeps
/// calling until a call makes no progress at all.
fn drive_encoder(encoder: &mut BlockEncoder, input: &[u8], output: &mut [u8]) -> std::result::Result<usize, BackendError> {
    let mut in_pos = 0;
    let mut out_pos = 0;
    let max_iters = input.len() + output.len() + 16;

    for _ in 0..max_iters {
        let (read, written) = encoder.encode(&input[in_pos..], &mut output[out_pos..], true)?;
        in_pos += read;
        out_pos += written;
        if read == 0 && written == 0 {
            break;
        }
    }
    Ok(out_pos)
}

/// Size in bytes of a block header, decoded from its first on-disk byte per
/// the XZ format: `(first_byte + 1) * 4`. liblzma's own header decoder uses
/// this same formula internally but, unlike this helper, does not bound-check
/// the header slice passed to it — callers reading a block's raw bytes off
/// disk (C8, C9) must compute this themselves to read exactly the right
/// number of header bytes before ever handing them to [`BlockDecoder::new`].
#[must_use]
pub fn block_header_size(first_byte: u8) -> usize {
    (usize::from(first_byte) + 1) * 4
}

/// Decodes a single XZ block given its already-read header bytes and the
/// stream's integrity check, returning the decompressed payload.
///
/// # Errors
///
/// Returns an error if `header` is not a valid block header or the payload
/// fails integrity checking.
pub fn decode_block(header: &[u8], check: IntegrityCheck, input: &[u8], uncompressed_size_hint: usize) -> Result<Vec<u8>> {
    let mut decoder = BlockDecoder::new(header, check)?;
    let mut output = vec![0u8; uncompressed_size_hint.max(1)];
    let mut in_pos = 0;
    let mut out_pos = 0;

    while !decoder.is_finished() {
        if out_pos == output.len() {
            output.resize(output.len() * 2, 0);
        }
        let (read, written) = decoder.decode(&input[in_pos..], &mut output[out_pos..])?;
        in_pos += read;
        out_pos += written;
        if read == 0 && written == 0 {
            break;
        }
    }

    output.truncate(out_pos);
    Ok(output)
}

/// Encodes a pipeline work item in place: `item.input` holds the raw
/// uncompressed chunk the splitter filled; on return `item.output` holds
/// `header || payload` for the resulting block and `item.unpadded_size`
/// holds the XZ Index value the merger (C9) needs to record it.
///
/// This is the `process_fn` a compress run hands to
/// [`crate::pipeline::Pipeline::start`] (see `pixz-cli`'s orchestration).
///
/// # Errors
///
/// Returns an error from [`encode_block`].
pub fn encode_work_item(level: Compression, check: IntegrityCheck, mut item: WorkItem) -> Result<WorkItem> {
    let block = encode_block(level, check, &item.input)?;
    item.output.clear();
    item.output.extend_from_slice(&block.header);
    item.output.extend_from_slice(&block.payload);
    item.unpadded_size = block.unpadded_size;
    Ok(item)
}

/// Decodes a pipeline work item in place: `item.input` holds the raw block
/// bytes (header followed by compressed payload) the splitter read;
/// `item.check` holds the stream's integrity check type. On return
/// `item.output` holds the decompressed payload.
///
/// This is the `process_fn` a decompress run hands to
/// [`crate::pipeline::Pipeline::start`] for [`crate::pool::ItemKind::Sized`]
/// items (see `pixz-cli`'s orchestration); `Continuation` items bypass the
/// worker pool entirely and never reach this function (SPEC_FULL.md §4.8).
///
/// # Errors
///
/// Returns [`crate::error::Error::Format`] if `item.input` is shorter than
/// its own declared block header, or an error from [`decode_block`].
pub fn decode_work_item(mut item: WorkItem) -> Result<WorkItem> {
    let header_size = block_header_size(*item.input.first().unwrap_or(&0));
    if header_size > item.input.len() {
        return Err(crate::error::Error::Format(
            "block header longer than block".to_string(),
        ));
    }
    let (header, payload) = item.input.split_at(header_size);
    let decoded = decode_block(header, item.check, payload, payload.len().max(1))?;
    item.output = decoded;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_roundtrips_compressible_input() {
        let input = b"the quick brown fox jumps over the lazy dog ".repeat(64);
        let block = encode_block(Compression::Level1, IntegrityCheck::Crc32, &input).unwrap();
        assert!(!block.uncompressible);

        let decoded = decode_block(&block.header, IntegrityCheck::Crc32, &block.payload, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn encode_then_decode_roundtrips_incompressible_input() {
        // Pseudo-random bytes: compression should not shrink this, which may
        // or may not trip the BufError fallback depending on level, but the
        // roundtrip must hold either way.
        let mut input = Vec::with_capacity(4096);
        let mut state = 0x1234_5678u32;
        for _ in 0..4096 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            input.push((state >> 16) as u8);
        }

        let block = encode_block(Compression::Level6, IntegrityCheck::Crc32, &input).unwrap();
        let decoded = decode_block(&block.header, IntegrityCheck::Crc32, &block.payload, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn encode_empty_input_roundtrips() {
        let block = encode_block(Compression::Level1, IntegrityCheck::Crc32, &[]).unwrap();
        let decoded = decode_block(&block.header, IntegrityCheck::Crc32, &block.payload, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn encode_work_item_then_decode_work_item_roundtrips() {
        use crate::pool::Pool;

        let input = b"pixz work item round trip payload ".repeat(32);
        let mut item = Pool::new(1).into_items().pop().unwrap();
        item.input = input.clone();
        item.check = IntegrityCheck::Crc32;

        let encoded = encode_work_item(Compression::Level3, IntegrityCheck::Crc32, item).unwrap();
        assert!(encoded.unpadded_size > 0);
        assert_eq!(encoded.unpadded_size as usize, encoded.output.len());

        let mut decode_item = Pool::new(1).into_items().pop().unwrap();
        decode_item.input = encoded.output.clone();
        decode_item.check = IntegrityCheck::Crc32;
        let decoded = decode_work_item(decode_item).unwrap();
        assert_eq!(decoded.output, input);
    }

    #[test]
    fn block_header_size_matches_formula() {
        assert_eq!(block_header_size(0), 4);
        assert_eq!(block_header_size(1), 8);
        assert_eq!(block_header_size(15), 64);
    }

    #[test]
    fn block_header_size_matches_real_header_first_byte() {
        let block = encode_block(Compression::Level1, IntegrityCheck::Crc32, b"abc").unwrap();
        assert_eq!(block_header_size(block.header[0]), block.header.len());
    }
}
