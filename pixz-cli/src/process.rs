//! Per-invocation orchestration: open input/output, dispatch to the right
//! `pixz-core` entry point, clean up the input file on success
//! (SPEC_FULL.md §4.12, grounded on the teacher's `process_file`
//! (`examples/dsemak-xz-rs/xz-cli/process.rs`)).

use std::io::Write;
use std::path::{Path, PathBuf};

use pixz_core::session::Session;
use pixz_core::{CompressionOptions, DecompressionOptions, Threading};

use crate::config::{Mode, PixzConfig};
use crate::error::{CliError, Error, Result, Warning};
use crate::io::{self, Input};
use crate::list;

/// Returns the first warning in `warnings`, converted to a CLI-level
/// [`Warning`] and wrapped as an [`Err(CliError::Warning)`], so `pixz-cli`'s
/// main reports it and exits non-zero the way the teacher's `InvocationError`
/// does for its own `Warning` variants (`examples/dsemak-xz-rs/xz-cli/process.rs`).
/// Later warnings are not surfaced individually; `pixz` reports at most one.
fn report_warnings(warnings: Vec<pixz_core::Warning>) -> Result<()> {
    match warnings.into_iter().next() {
        Some(warning) => Err(CliError::from(Warning::from(warning))),
        None => Ok(()),
    }
}

fn threading(threads: Option<u32>) -> Threading {
    match threads {
        Some(n) => Threading::Exact(n),
        None => Threading::Auto,
    }
}

fn compression_options(config: &PixzConfig) -> Result<CompressionOptions> {
    let level = crate::opts::level_to_compression(config.level, config.extreme);
    let mut options = CompressionOptions::default()
        .with_level(level)
        .with_threads(threading(config.threads))
        .keep_input(config.keep);
    if let Some(fraction) = config.block_fraction {
        options = options.with_block_fraction(fraction);
    }
    if let Some(pool) = config.pool_size {
        options = options.with_pool_size(pool);
    }
    if !config.tar_mode {
        options = options.without_tar_mode();
    }
    Ok(options)
}

fn decompression_options(config: &PixzConfig) -> DecompressionOptions {
    let mut options = DecompressionOptions::default()
        .with_threads(threading(config.threads))
        .keep_input(config.keep)
        .with_tar_verify(config.mode != Mode::Extract);
    if let Some(pool) = config.pool_size {
        options = options.with_pool_size(pool);
    }
    options
}

/// Runs one `pixz` invocation end to end.
///
/// # Errors
///
/// Returns the first fatal error encountered opening input/output or
/// running the pipeline.
pub fn run(config: &PixzConfig) -> Result<()> {
    match config.mode {
        Mode::Compress => run_compress(config),
        Mode::Decompress => run_decompress(config),
        Mode::Extract => run_extract(config),
        Mode::List => run_list(config),
    }
}

fn resolve_output_path(config: &PixzConfig, auto_mode: Mode) -> Result<Option<String>> {
    if config.output.is_some() {
        return Ok(config.output.clone());
    }
    match &config.input {
        Some(input) => {
            let derived = io::auto_output(auto_mode, Path::new(input))?;
            Ok(Some(derived.to_string_lossy().into_owned()))
        }
        None => Ok(None),
    }
}

fn run_compress(config: &PixzConfig) -> Result<()> {
    let output_path = resolve_output_path(config, Mode::Compress)?;
    let input = io::open_input(config.input.as_deref())?;
    let output = io::open_output(output_path.as_deref(), Mode::Compress)?;
    let options = compression_options(config)?;
    let session = Session::new();

    let stats = pixz_core::merger::compress(input, output, &options, &session)?;
    if config.verbose {
        report_ratio(stats.total_in, stats.total_out);
    }

    cleanup_input(config)?;
    report_warnings(stats.warnings)
}

fn run_decompress(config: &PixzConfig) -> Result<()> {
    let output_path = resolve_output_path(config, Mode::Decompress)?;
    let input = io::open_input(config.input.as_deref())?;
    let mut output = io::open_output(output_path.as_deref(), Mode::Decompress)?;
    let options = decompression_options(config);

    let stats = if io::is_seekable(&input) {
        pixz_core::merger::decompress(input, &mut output, &options, &[])?
    } else {
        pixz_core::merger::decompress_stream(input, &mut output, &options, &[])?
    };
    if config.verbose {
        eprintln!("{} bytes written", stats.total_out);
    }

    cleanup_input(config)?;
    report_warnings(stats.warnings)
}

fn run_extract(config: &PixzConfig) -> Result<()> {
    let file = io::open_seekable_input(config.input.as_deref())?;
    let mut output = io::open_output(config.output.as_deref(), Mode::Extract)?;
    let options = decompression_options(config);

    let stats = pixz_core::merger::decompress(file, &mut output, &options, &config.specs)?;
    if config.verbose {
        eprintln!("{} bytes written", stats.total_out);
    }
    report_warnings(stats.warnings)
}

fn run_list(config: &PixzConfig) -> Result<()> {
    let mut file = io::open_seekable_input(config.input.as_deref())?;
    let index = pixz_core::index_walk::walk(&mut file)?
        .ok_or_else(|| CliError::from(Error::Usage("not a valid XZ file".to_string())))?;

    let summary = pixz_core::list::summarize(&index);
    let filename = config.input.clone().unwrap_or_else(|| "(stdin)".to_string());

    if config.verbose {
        let streams = pixz_core::list::streams(&index);
        let blocks = pixz_core::list::blocks(&index);
        list::write_verbose_report(&filename, summary, &streams, &blocks)?;
    } else {
        list::write_header()?;
        list::write_row(summary, &filename)?;
    }
    Ok(())
}

fn report_ratio(total_in: u64, total_out: u64) {
    let ratio = if total_in == 0 { 0.0 } else { total_out as f64 / total_in as f64 };
    eprintln!("{total_in} bytes in, {total_out} bytes out, ratio {ratio:.3}");
}

fn cleanup_input(config: &PixzConfig) -> Result<()> {
    if config.keep {
        return Ok(());
    }
    let Some(input) = &config.input else {
        return Ok(());
    };
    std::fs::remove_file(input).map_err(|source| {
        CliError::from(Error::RemoveInput {
            path: PathBuf::from(input),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use tempfile::tempdir;

    use super::*;
    use crate::config::PixzConfig;

    fn base_config() -> PixzConfig {
        PixzConfig {
            mode: Mode::Compress,
            input: None,
            output: None,
            specs: Vec::new(),
            tar_mode: false,
            keep: false,
            level: 1,
            extreme: false,
            threads: Some(1),
            pool_size: None,
            block_fraction: None,
            verbose: false,
        }
    }

    #[test]
    fn compress_then_decompress_roundtrip_via_files() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("payload.bin");
        std::fs::write(&input_path, b"roundtrip payload ".repeat(50)).unwrap();

        let compressed_path = dir.path().join("payload.bin.xz");
        let compress_config = PixzConfig {
            input: Some(input_path.to_string_lossy().into_owned()),
            output: Some(compressed_path.to_string_lossy().into_owned()),
            keep: true,
            ..base_config()
        };
        run(&compress_config).unwrap();
        assert!(compressed_path.exists());

        let decompressed_path = dir.path().join("payload.bin");
        std::fs::remove_file(&input_path).unwrap();
        let decompress_config = PixzConfig {
            mode: Mode::Decompress,
            input: Some(compressed_path.to_string_lossy().into_owned()),
            output: Some(decompressed_path.to_string_lossy().into_owned()),
            keep: true,
            ..base_config()
        };
        run(&decompress_config).unwrap();

        let mut contents = Vec::new();
        std::fs::File::open(&decompressed_path).unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"roundtrip payload ".repeat(50));
    }

    #[test]
    fn keep_flag_preserves_input_file() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("payload.bin");
        std::fs::write(&input_path, b"keep me").unwrap();
        let compressed_path = dir.path().join("out.xz");

        let config = PixzConfig {
            input: Some(input_path.to_string_lossy().into_owned()),
            output: Some(compressed_path.to_string_lossy().into_owned()),
            keep: true,
            ..base_config()
        };
        run(&config).unwrap();
        assert!(input_path.exists());
    }

    #[test]
    fn without_keep_flag_input_file_is_removed() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("payload.bin");
        std::fs::write(&input_path, b"remove me").unwrap();
        let compressed_path = dir.path().join("out.xz");

        let config = PixzConfig {
            input: Some(input_path.to_string_lossy().into_owned()),
            output: Some(compressed_path.to_string_lossy().into_owned()),
            keep: false,
            ..base_config()
        };
        run(&config).unwrap();
        assert!(!input_path.exists());
    }
}
