//! Thin wrappers around the `liblzma` FFI calls used by the safe API.

use crate::error::{result_from_lzma_ret, Result};
use crate::stream::index::StreamFlags;
use crate::{decoder, encoder, Action, Error, Index, IndexIterMode, IndexIterator, Stream};

/// Call `lzma_code` with a safe return type.
pub(crate) fn lzma_code(stream: &mut Stream, action: Action) -> Result<()> {
    // SAFETY: The stream is assumed to be valid and initialized by liblzma.
    let ret = unsafe { liblzma_sys::lzma_code(stream.lzma_stream(), action.into()) };
    result_from_lzma_ret(ret, ())
}

/// Finalise a stream by calling `lzma_end`.
pub(crate) fn lzma_end(mut stream: Stream) {
    // SAFETY: The stream is valid and initialized by liblzma.
    // This function can only be called once per stream due to move semantics.
    unsafe { liblzma_sys::lzma_end(stream.lzma_stream()) };
}

/// Initialise a single-threaded encoder via `lzma_easy_encoder`.
pub(crate) fn lzma_easy_encoder(
    level: encoder::options::Compression,
    check: encoder::options::IntegrityCheck,
    stream: &mut Stream,
) -> Result<()> {
    // SAFETY: The stream must be valid and not already initialized.
    // The level and check must be valid for liblzma.
    let ret = unsafe {
        liblzma_sys::lzma_easy_encoder(stream.lzma_stream(), level.to_preset(), check.into())
    };
    result_from_lzma_ret(ret, ())
}

/// Initialise a multithreaded encoder via `lzma_stream_encoder_mt`.
pub(crate) fn lzma_stream_encoder_mt(
    config: &encoder::Options,
    stream: &mut Stream,
) -> Result<Option<encoder::options::RawFilters>> {
    // Build mt options and prepare filter chain in this scope so pointers stay valid.
    let (mt, raw_filters) = config.to_lzma_options();

    // SAFETY: `mt` and its filter chain memory are valid for the duration of this call.
    let ret = unsafe { liblzma_sys::lzma_stream_encoder_mt(stream.lzma_stream(), &raw const mt) };
    result_from_lzma_ret(ret, raw_filters)
}

/// Initialise an XZ decoder with `lzma_stream_decoder`.
pub(crate) fn lzma_stream_decoder(
    memlimit: u64,
    flags: decoder::options::Flags,
    stream: &mut Stream,
) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized.
    // The flags are validated by the type system.
    let ret = unsafe {
        liblzma_sys::lzma_stream_decoder(stream.lzma_stream(), memlimit, flags.to_liblzma_flags())
    };
    result_from_lzma_ret(ret, ())
}

/// Initialise a multithreaded decoder with `lzma_stream_decoder_mt`.
pub(crate) fn lzma_stream_decoder_mt(
    options: &decoder::Options,
    stream: &mut Stream,
) -> Result<()> {
    // SAFETY: All fields of the options struct are set as required by liblzma documentation.
    // The stream is valid and not already initialized.
    let ret = unsafe {
        liblzma_sys::lzma_stream_decoder_mt(stream.lzma_stream(), &options.to_lzma_options())
    };
    result_from_lzma_ret(ret, ())
}

/// Initialise an auto-detecting decoder via `lzma_auto_decoder`.
pub(crate) fn lzma_auto_decoder(
    memlimit: u64,
    flags: decoder::options::Flags,
    stream: &mut Stream,
) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized.
    // The flags are validated by the type system.
    let ret = unsafe {
        liblzma_sys::lzma_auto_decoder(stream.lzma_stream(), memlimit, flags.to_liblzma_flags())
    };
    result_from_lzma_ret(ret, ())
}

/// Initialise a legacy LZMA decoder via `lzma_alone_decoder`.
pub(crate) fn lzma_alone_decoder(memlimit: u64, stream: &mut Stream) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized.
    let ret = unsafe { liblzma_sys::lzma_alone_decoder(stream.lzma_stream(), memlimit) };
    result_from_lzma_ret(ret, ())
}

/// Initialise an index decoder with `lzma_index_decoder`.
///
/// The index will be made available through the index_ptr after decoding completes.
pub(crate) fn lzma_index_decoder(
    stream: &mut Stream,
    index_ptr: *mut *mut liblzma_sys::lzma_index,
    memlimit: u64,
) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized.
    // The index_ptr will be populated when decoding completes successfully.
    let ret = unsafe { liblzma_sys::lzma_index_decoder(stream.lzma_stream(), index_ptr, memlimit) };
    result_from_lzma_ret(ret, ())
}

/// Initialise a file info decoder with `lzma_file_info_decoder`.
///
/// The combined index will be made available through the index_ptr after decoding completes.
pub(crate) fn lzma_file_info_decoder(
    stream: &mut Stream,
    index_ptr: *mut *mut liblzma_sys::lzma_index,
    memlimit: u64,
    file_size: u64,
) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized.
    // The index_ptr will be populated when decoding completes successfully.
    let ret = unsafe {
        liblzma_sys::lzma_file_info_decoder(stream.lzma_stream(), index_ptr, memlimit, file_size)
    };
    result_from_lzma_ret(ret, ())
}

/// Initializes an `lzma_index_iter` for traversing an index.
pub(crate) fn lzma_index_iter_init(iter: &mut liblzma_sys::lzma_index_iter, index: &Index) {
    // SAFETY: Both `iter` and `index` are valid and properly initialized.
    // The `iter` memory must be zeroed as required by liblzma.
    unsafe {
        liblzma_sys::lzma_index_iter_init(iter, index.as_ptr());
    }
}

/// Free an `lzma_index` previously allocated by liblzma.
pub(crate) fn lzma_index_end(
    index: *mut liblzma_sys::lzma_index,
    allocator: Option<&crate::stream::LzmaAllocator>,
) {
    let allocator_ptr = allocator.map_or(std::ptr::null(), crate::stream::LzmaAllocator::as_ptr);
    unsafe { liblzma_sys::lzma_index_end(index, allocator_ptr) };
}

/// Advance the given `lzma_index_iter` to the next entry using the provided mode.
///
/// # Returns
///
/// `true` if the iterator points to a valid entry after advancing, or `false` if the end is reached.
pub(crate) fn lzma_index_iter_next(iter: &mut IndexIterator, mode: IndexIterMode) -> bool {
    // SAFETY: `iter` points to a valid iterator and `mode` is a trusted enum.
    unsafe {
        // liblzma returns zero (0) for "success" (i.e., valid entry found) and nonzero for "end".
        liblzma_sys::lzma_index_iter_next(iter.as_mut_raw(), mode.into()) == 0
    }
}

/// Returns the number of streams present in the given `Index`.
pub(crate) fn lzma_index_stream_count(index: &Index) -> u64 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_stream_count(index.as_ptr()) }
}

/// Returns the number of blocks present in the given `Index`.
pub(crate) fn lzma_index_block_count(index: &Index) -> u64 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_block_count(index.as_ptr()) }
}

/// Returns the total compressed file size tracked by the given `Index`.
pub(crate) fn lzma_index_file_size(index: &Index) -> u64 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_file_size(index.as_ptr()) }
}

/// Returns the total uncompressed size tracked by the given `Index`.
pub(crate) fn lzma_index_uncompressed_size(index: &Index) -> u64 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_uncompressed_size(index.as_ptr()) }
}

/// Returns a bitmask of integrity checks found in the given `Index`.
pub(crate) fn lzma_index_checks(index: &Index) -> u32 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_checks(index.as_ptr()) }
}

/// Estimate decoder memory usage for a given compression preset.
#[allow(dead_code)]
pub(crate) fn lzma_easy_decoder_memusage(level: encoder::options::Compression) -> u64 {
    // SAFETY: The compression level is validated by the type system and converted safely.
    unsafe { liblzma_sys::lzma_easy_decoder_memusage(level.to_preset()) }
}

/// Update the runtime memory limit of a decoder stream.
#[allow(dead_code)]
pub(crate) fn lzma_memlimit_set(memlimit: u64, stream: &mut Stream) -> Result<()> {
    // SAFETY: The stream is assumed to be valid and initialized by liblzma.
    let ret = unsafe { liblzma_sys::lzma_memlimit_set(stream.lzma_stream(), memlimit) };
    result_from_lzma_ret(ret, ())
}

/// Fill an `lzma_options_lzma` struct from a numeric preset via `lzma_lzma_preset`.
///
/// Returns `Error::OptionsError` if the preset is not supported by the linked liblzma,
/// mirroring the `lzma_bool` return convention (`true` means error for this one function).
pub(crate) fn lzma_lzma_preset(
    options: &mut liblzma_sys::lzma_options_lzma,
    preset: u32,
) -> Result<()> {
    // SAFETY: `options` is a valid, writable `lzma_options_lzma`.
    let is_error = unsafe { liblzma_sys::lzma_lzma_preset(options, preset) };
    if is_error != 0 {
        return Err(Error::OptionsError);
    }
    Ok(())
}

/// Initialise a legacy `.lzma` encoder via `lzma_alone_encoder`.
pub(crate) fn lzma_alone_encoder(
    options: &liblzma_sys::lzma_options_lzma,
    stream: &mut Stream,
) -> Result<()> {
    // SAFETY: The stream is valid and not already initialized. `options` outlives the call.
    let ret = unsafe { liblzma_sys::lzma_alone_encoder(stream.lzma_stream(), options) };
    result_from_lzma_ret(ret, ())
}

/// Decode an XZ Stream Header into [`StreamFlags`].
pub(crate) fn decode_stream_header_flags(
    input: &[u8; crate::stream::HEADER_SIZE],
) -> Result<StreamFlags> {
    // SAFETY: `raw` is zero-initialized and fully populated by liblzma on success.
    let mut raw: liblzma_sys::lzma_stream_flags = unsafe { std::mem::zeroed() };
    let ret = unsafe { liblzma_sys::lzma_stream_header_decode(&mut raw, input.as_ptr()) };
    result_from_lzma_ret(ret, ())?;
    // SAFETY: `raw` was just populated by a successful decode call.
    unsafe { StreamFlags::from_raw(&raw) }.ok_or(Error::ProgError)
}

/// Decode an XZ Stream Footer into [`StreamFlags`].
pub(crate) fn decode_stream_footer_flags(
    input: &[u8; crate::stream::HEADER_SIZE],
) -> Result<StreamFlags> {
    // SAFETY: `raw` is zero-initialized and fully populated by liblzma on success.
    let mut raw: liblzma_sys::lzma_stream_flags = unsafe { std::mem::zeroed() };
    let ret = unsafe { liblzma_sys::lzma_stream_footer_decode(&mut raw, input.as_ptr()) };
    result_from_lzma_ret(ret, ())?;
    // SAFETY: `raw` was just populated by a successful decode call.
    unsafe { StreamFlags::from_raw(&raw) }.ok_or(Error::ProgError)
}

/// Compare decoded Stream Header and Stream Footer flags via `lzma_stream_flags_compare`.
pub(crate) fn compare_stream_header_footer(
    header: &[u8; crate::stream::HEADER_SIZE],
    footer: &[u8; crate::stream::HEADER_SIZE],
) -> Result<()> {
    // SAFETY: both buffers are zero-initialized then populated by successful decode calls.
    let mut header_flags: liblzma_sys::lzma_stream_flags = unsafe { std::mem::zeroed() };
    let mut footer_flags: liblzma_sys::lzma_stream_flags = unsafe { std::mem::zeroed() };
    result_from_lzma_ret(
        unsafe { liblzma_sys::lzma_stream_header_decode(&mut header_flags, header.as_ptr()) },
        (),
    )?;
    result_from_lzma_ret(
        unsafe { liblzma_sys::lzma_stream_footer_decode(&mut footer_flags, footer.as_ptr()) },
        (),
    )?;
    // SAFETY: both structs are populated and valid for the duration of this call.
    let ret = unsafe { liblzma_sys::lzma_stream_flags_compare(&header_flags, &footer_flags) };
    result_from_lzma_ret(ret, ())
}

/// Encode a Stream Header or Stream Footer via `lzma_stream_header_encode`/`lzma_stream_footer_encode`.
///
/// `backward_size` distinguishes the two: `None` produces a header, `Some(size)` a footer whose
/// Index field is `size` bytes long.
pub(crate) fn encode_stream_edge(
    check: encoder::options::IntegrityCheck,
    backward_size: Option<u64>,
) -> Result<[u8; crate::stream::HEADER_SIZE]> {
    const LZMA_VLI_UNKNOWN: u64 = u64::MAX;
    let flags = liblzma_sys::lzma_stream_flags {
        version: 0,
        backward_size: backward_size.unwrap_or(LZMA_VLI_UNKNOWN),
        check: check.into(),
        reserved_enum1: liblzma_sys::lzma_reserved_enum_LZMA_RESERVED_ENUM,
        reserved_enum2: liblzma_sys::lzma_reserved_enum_LZMA_RESERVED_ENUM,
        reserved_enum3: liblzma_sys::lzma_reserved_enum_LZMA_RESERVED_ENUM,
        reserved_enum4: liblzma_sys::lzma_reserved_enum_LZMA_RESERVED_ENUM,
        reserved_bool1: 0,
        reserved_bool2: 0,
        reserved_bool3: 0,
        reserved_bool4: 0,
        reserved_bool5: 0,
        reserved_bool6: 0,
        reserved_bool7: 0,
        reserved_bool8: 0,
        reserved_int1: 0,
        reserved_int2: 0,
    };
    let mut buf = [0u8; crate::stream::HEADER_SIZE];
    let ret = match backward_size {
        // SAFETY: `buf` has exactly `LZMA_STREAM_HEADER_SIZE` bytes as required by liblzma.
        None => unsafe { liblzma_sys::lzma_stream_header_encode(&flags, buf.as_mut_ptr()) },
        // SAFETY: same as above.
        Some(_) => unsafe { liblzma_sys::lzma_stream_footer_encode(&flags, buf.as_mut_ptr()) },
    };
    result_from_lzma_ret(ret, buf)
}

/// Build an empty `lzma_index` via `lzma_index_init`.
pub(crate) fn lzma_index_init() -> Result<Index> {
    // SAFETY: passing a null allocator asks liblzma to use its default allocator.
    let ptr = unsafe { liblzma_sys::lzma_index_init(std::ptr::null_mut(), std::ptr::null()) };
    // SAFETY: `ptr` was just returned by liblzma; ownership transfers to `Index`.
    unsafe { Index::from_raw(ptr, None) }.ok_or(Error::MemError)
}

/// Append one block's sizes to an `lzma_index` via `lzma_index_append`.
pub(crate) fn lzma_index_append(
    index: &mut Index,
    unpadded_size: u64,
    uncompressed_size: u64,
) -> Result<()> {
    // SAFETY: the index pointer is valid and owned by the caller.
    let ret = unsafe {
        liblzma_sys::lzma_index_append(
            index.as_mut_ptr(),
            std::ptr::null(),
            unpadded_size,
            uncompressed_size,
        )
    };
    result_from_lzma_ret(ret, ())
}

/// Concatenate `other` onto the end of `index` via `lzma_index_cat`.
///
/// On success `other` has been consumed by liblzma and must not be dropped by its
/// `ManuallyDrop` wrapper.
pub(crate) fn lzma_index_cat(
    index: &mut Index,
    other: &mut std::mem::ManuallyDrop<Index>,
    allocator: Option<&crate::stream::LzmaAllocator>,
) -> Result<()> {
    let allocator_ptr = allocator.map_or(std::ptr::null(), crate::stream::LzmaAllocator::as_ptr);
    // SAFETY: both index pointers are valid; liblzma takes ownership of `other` on success.
    let ret = unsafe {
        liblzma_sys::lzma_index_cat(index.as_mut_ptr(), other.as_mut_ptr(), allocator_ptr)
    };
    result_from_lzma_ret(ret, ())
}

/// Set this index's Stream Flags (the integrity check in use) via `lzma_index_stream_flags`.
pub(crate) fn lzma_index_stream_flags(index: &mut Index, flags: &StreamFlags) -> Result<()> {
    let raw = flags.to_raw();
    // SAFETY: the index pointer is valid; `raw` lives for the duration of the call.
    let ret = unsafe { liblzma_sys::lzma_index_stream_flags(index.as_mut_ptr(), &raw) };
    result_from_lzma_ret(ret, ())
}

/// Set this index's Stream Padding size via `lzma_index_stream_padding`.
pub(crate) fn lzma_index_stream_padding(index: &mut Index, padding: u64) -> Result<()> {
    // SAFETY: the index pointer is valid and owned by the caller.
    let ret = unsafe { liblzma_sys::lzma_index_stream_padding(index.as_mut_ptr(), padding) };
    result_from_lzma_ret(ret, ())
}

/// Returns the total size of the Stream represented by the given `Index`.
pub(crate) fn lzma_index_stream_size(index: &Index) -> u64 {
    // SAFETY: The index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_stream_size(index.as_ptr()) }
}

/// Size in bytes that encoding this index would occupy, via `lzma_index_size`.
pub(crate) fn lzma_index_size(index: &Index) -> u64 {
    // SAFETY: the index pointer is valid and owned by the caller.
    unsafe { liblzma_sys::lzma_index_size(index.as_ptr()) }
}

/// Decode a standalone XZ Index field (as found between the last block and the Stream Footer).
///
/// Returns the decoded [`Index`] and the number of input bytes consumed.
pub(crate) fn decode_xz_index_field(
    memlimit: &mut u64,
    input: &[u8],
    allocator: Option<&crate::stream::LzmaAllocator>,
) -> Result<(Index, usize)> {
    let allocator_ptr = allocator.map_or(std::ptr::null(), crate::stream::LzmaAllocator::as_ptr);
    let mut index_ptr: *mut liblzma_sys::lzma_index = std::ptr::null_mut();
    let mut in_pos: usize = 0;
    // SAFETY: `input` is valid for `input.len()` bytes; `in_pos`/`index_ptr` are out-params.
    let ret = unsafe {
        liblzma_sys::lzma_index_buffer_decode(
            &mut index_ptr,
            memlimit,
            allocator_ptr,
            input.as_ptr(),
            &mut in_pos,
            input.len(),
        )
    };
    result_from_lzma_ret(ret, ())?;
    // SAFETY: `index_ptr` was populated by a successful decode call.
    let index = unsafe { Index::from_raw(index_ptr, allocator.cloned()) }.ok_or(Error::MemError)?;
    Ok((index, in_pos))
}

/// Encode an `lzma_index` into a caller-supplied output buffer via `lzma_index_buffer_encode`.
///
/// Returns the number of bytes written.
pub(crate) fn encode_xz_index_field(index: &Index, output: &mut [u8]) -> Result<usize> {
    let mut out_pos: usize = 0;
    // SAFETY: the index pointer is valid; `output` is valid for `output.len()` bytes.
    let ret = unsafe {
        liblzma_sys::lzma_index_buffer_encode(
            index.as_ptr().cast_mut(),
            output.as_mut_ptr(),
            &mut out_pos,
            output.len(),
        )
    };
    result_from_lzma_ret(ret, out_pos)
}

/// Compute the CRC32 checksum of `data`, continuing from `seed` (pass `0` for a fresh checksum).
pub(crate) fn crc32(data: &[u8], seed: u32) -> u32 {
    // SAFETY: `data` is a valid slice of `data.len()` bytes.
    unsafe { liblzma_sys::lzma_crc32(data.as_ptr(), data.len(), seed) }
}

/// Maximum number of filters (excluding the `LZMA_VLI_UNKNOWN` terminator) in a chain.
pub(crate) const LZMA_FILTERS_MAX: usize = 4;

/// Build and encode an XZ Block Header for the given filter chain and check type.
///
/// Returns the initialized `lzma_block` (with `header_size` set, ready to hand to
/// [`lzma_block_encoder`]) together with the encoded header bytes.
pub(crate) fn lzma_block_header_encode(
    filters: &encoder::options::RawFilters,
    check: encoder::options::IntegrityCheck,
) -> Result<(liblzma_sys::lzma_block, Vec<u8>)> {
    const LZMA_VLI_UNKNOWN: u64 = u64::MAX;

    // SAFETY: `lzma_block` is a POD struct; zero-initialization is a valid starting point.
    let mut block: liblzma_sys::lzma_block = unsafe { std::mem::zeroed() };
    block.version = 0;
    block.check = check.into();
    block.filters = filters.as_ptr().cast_mut();
    block.compressed_size = LZMA_VLI_UNKNOWN;
    block.uncompressed_size = LZMA_VLI_UNKNOWN;

    // SAFETY: `block.filters` points at a chain kept alive by the caller's `RawFilters`.
    let ret = unsafe { liblzma_sys::lzma_block_header_size(&mut block) };
    result_from_lzma_ret(ret, ())?;

    let mut header = vec![0u8; block.header_size as usize];
    // SAFETY: `header` has exactly `block.header_size` bytes, as required by liblzma.
    let ret = unsafe { liblzma_sys::lzma_block_header_encode(&block, header.as_mut_ptr()) };
    result_from_lzma_ret(ret, ())?;

    Ok((block, header))
}

/// Initialise a block encoder from an already-sized `lzma_block`.
pub(crate) fn lzma_block_encoder(
    stream: &mut Stream,
    block: &mut liblzma_sys::lzma_block,
) -> Result<()> {
    // SAFETY: `block`'s filter chain outlives this call; the stream is not yet initialized.
    let ret = unsafe { liblzma_sys::lzma_block_encoder(stream.lzma_stream(), block) };
    result_from_lzma_ret(ret, ())
}

/// Decode an XZ Block Header previously read into `header`.
///
/// `header[0]` encodes the real header size as `(header[0] + 1) * 4` per the XZ format.
/// Returns the populated `lzma_block` (ready for [`lzma_block_decoder`]) along with the
/// owned filter-chain buffer that the block's `filters` pointer refers to.
pub(crate) fn lzma_block_header_decode(
    header: &[u8],
    check: encoder::options::IntegrityCheck,
) -> Result<(liblzma_sys::lzma_block, Vec<liblzma_sys::lzma_filter>)> {
    if header.is_empty() {
        return Err(Error::DataError);
    }

    let mut filters = vec![
        liblzma_sys::lzma_filter {
            id: u64::MAX,
            options: std::ptr::null_mut(),
        };
        LZMA_FILTERS_MAX + 1
    ];

    // SAFETY: `lzma_block` is a POD struct; zero-initialization is a valid starting point.
    let mut block: liblzma_sys::lzma_block = unsafe { std::mem::zeroed() };
    block.version = 0;
    block.check = check.into();
    block.header_size = (u32::from(header[0]) + 1) * 4;
    block.filters = filters.as_mut_ptr();

    // SAFETY: `header` holds at least `block.header_size` bytes; `filters` outlives the call.
    let ret = unsafe {
        liblzma_sys::lzma_block_header_decode(&mut block, std::ptr::null(), header.as_ptr())
    };
    result_from_lzma_ret(ret, ())?;

    Ok((block, filters))
}

/// Initialise a block decoder from an already-decoded `lzma_block`.
pub(crate) fn lzma_block_decoder(
    stream: &mut Stream,
    block: &mut liblzma_sys::lzma_block,
) -> Result<()> {
    // SAFETY: `block`'s filter chain outlives this call; the stream is not yet initialized.
    let ret = unsafe { liblzma_sys::lzma_block_decoder(stream.lzma_stream(), block) };
    result_from_lzma_ret(ret, ())
}

/// Size of the block including header, payload, padding, and the check value, via
/// `lzma_block_unpadded_size`. Used to build the corresponding `lzma_index` entry.
pub(crate) fn lzma_block_unpadded_size(block: &liblzma_sys::lzma_block) -> u64 {
    // SAFETY: `block` has been through a successful encode or decode.
    unsafe { liblzma_sys::lzma_block_unpadded_size(block) }
}
