//! Formatting for `pixz -l` / `pixz -l -v`, grounded on original pixz's
//! `pixzlist.c` table shape and the teacher's `xz-cli`
//! `format/list.rs` column layout/verbose report
//! (`examples/dsemak-xz-rs/xz-cli/format/list.rs`).

use std::io::{self, Write};

use lzma_safe::stream::index::{BlockInfo, StreamInfo};
use pixz_core::list::ListSummary;

use crate::error::{CliError, Error, Result};

fn write_output(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    let mut out = io::stdout().lock();
    f(&mut out).map_err(|source| CliError::from(Error::WriteOutput { source }))
}

/// Converts an index's checks bitmask into a human-readable name: `None` for
/// zero checks, `Mixed` for more than one distinct check, or the specific
/// check name for exactly one (SPEC_FULL.md §4.11).
#[must_use]
pub fn format_check_name(checks_mask: u32) -> &'static str {
    if checks_mask == 0 {
        return "None";
    }
    if !checks_mask.is_power_of_two() {
        return "Mixed";
    }
    match checks_mask.trailing_zeros() {
        0 => "None",
        1 => "CRC32",
        4 => "CRC64",
        10 => "SHA256",
        _ => "Unknown",
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= MIB {
        format!("{:.1} MiB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn ratio_fraction(compressed: u64, uncompressed: u64) -> f64 {
    if uncompressed == 0 {
        return 0.0;
    }
    compressed as f64 / uncompressed as f64
}

/// Writes the column header row for non-verbose `-l` output.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn write_header() -> Result<()> {
    write_output(|out| {
        writeln!(out, "Strms  Blocks   Compressed Uncompressed  Ratio  Check   Filename")
    })
}

/// Writes one non-verbose summary row for `filename`.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn write_row(summary: ListSummary, filename: &str) -> Result<()> {
    let ratio = ratio_fraction(summary.compressed, summary.uncompressed);
    let check = format_check_name(summary.checks_mask);
    write_output(|out| {
        writeln!(
            out,
            "{:>5} {:>7} {:>12} {:>12} {:>6.3}  {:<5}   {}",
            summary.stream_count,
            summary.block_count,
            format_size(summary.compressed),
            format_size(summary.uncompressed),
            ratio,
            check,
            filename,
        )
    })
}

/// Writes the `-l -v` verbose report: overview, per-stream table, per-block
/// table (SPEC_FULL.md §4.11).
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn write_verbose_report(filename: &str, summary: ListSummary, streams: &[StreamInfo], blocks: &[BlockInfo]) -> Result<()> {
    let ratio = ratio_fraction(summary.compressed, summary.uncompressed);
    let check = format_check_name(summary.checks_mask);
    let padding_total: u64 = streams.iter().map(|s| s.padding).sum();

    write_output(|out| {
        writeln!(out, "{filename}")?;
        writeln!(out, "  Streams:           {}", summary.stream_count)?;
        writeln!(out, "  Blocks:            {}", summary.block_count)?;
        writeln!(out, "  Compressed size:   {}", format_size(summary.compressed))?;
        writeln!(out, "  Uncompressed size: {}", format_size(summary.uncompressed))?;
        writeln!(out, "  Ratio:             {ratio:.3}")?;
        writeln!(out, "  Check:             {check}")?;
        writeln!(out, "  Stream Padding:    {}", format_size(padding_total))?;

        writeln!(out, "  Streams:")?;
        writeln!(
            out,
            "    Stream    Blocks      CompOffset    UncompOffset        CompSize      UncompSize  Ratio  Check      Padding"
        )?;
        for stream in streams {
            let stream_ratio = ratio_fraction(stream.compressed_size, stream.uncompressed_size);
            writeln!(
                out,
                "{:>10} {:>9} {:>15} {:>15} {:>15} {:>15}  {:>5.3}  {:<5} {:>12}",
                stream.number,
                stream.block_count,
                stream.compressed_offset,
                stream.uncompressed_offset,
                stream.compressed_size,
                stream.uncompressed_size,
                stream_ratio,
                check,
                stream.padding,
            )?;
        }

        writeln!(out, "  Blocks:")?;
        writeln!(
            out,
            "    Stream     Block      CompOffset    UncompOffset       TotalSize      UncompSize  Ratio  Check"
        )?;
        let mut stream_idx = 0usize;
        let mut remaining_in_stream = streams.first().map_or(0, |s| s.block_count);
        for block in blocks {
            while remaining_in_stream == 0 && stream_idx + 1 < streams.len() {
                stream_idx += 1;
                remaining_in_stream = streams[stream_idx].block_count;
            }
            let stream_number = streams.get(stream_idx).map_or(0, |s| s.number);
            remaining_in_stream = remaining_in_stream.saturating_sub(1);

            let block_ratio = ratio_fraction(block.total_size, block.uncompressed_size);
            writeln!(
                out,
                "{:>10} {:>9} {:>15} {:>15} {:>15} {:>15}  {:>5.3}  {}",
                stream_number,
                block.number_in_stream,
                block.compressed_file_offset,
                block.uncompressed_file_offset,
                block.total_size,
                block.uncompressed_size,
                block_ratio,
                check,
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_mask_zero_is_none() {
        assert_eq!(format_check_name(0), "None");
    }

    #[test]
    fn checks_mask_single_bit_names_check() {
        assert_eq!(format_check_name(1 << 1), "CRC32");
        assert_eq!(format_check_name(1 << 4), "CRC64");
        assert_eq!(format_check_name(1 << 10), "SHA256");
    }

    #[test]
    fn checks_mask_multiple_bits_is_mixed() {
        assert_eq!(format_check_name((1 << 1) | (1 << 4)), "Mixed");
    }

    #[test]
    fn ratio_fraction_of_zero_uncompressed_is_zero() {
        assert_eq!(ratio_fraction(10, 0), 0.0);
    }
}
