//! Command-line argument parsing for `pixz`.
//!
//! Flag shapes follow SPEC_FULL.md §6's CLI table, which is itself the
//! original pixz getopt string (`"dxli:o:p:tvh0123456789"`,
//! `examples/original_source/pixz.c`) plus the spec's ambient additions
//! (`-e`, `-q`, `-f`, `-k`, `-v`). Parsing style (derive, `conflicts_with`,
//! a `group` for the mutually exclusive level flags) follows the teacher's
//! `xz-cli` `bin/xz/opts.rs`.

use clap::Parser;

use pixz_core::Compression;

use crate::config::{Mode, PixzConfig};
use crate::error::{CliError, Error, Result};

/// Maps a `-0`..`-9` preset level and the `-e` flag to a
/// [`Compression`] variant.
#[must_use]
pub fn level_to_compression(level: u8, extreme: bool) -> Compression {
    if extreme {
        return Compression::Extreme(level);
    }
    match level {
        0 => Compression::Level0,
        1 => Compression::Level1,
        2 => Compression::Level2,
        3 => Compression::Level3,
        4 => Compression::Level4,
        5 => Compression::Level5,
        6 => Compression::Level6,
        7 => Compression::Level7,
        8 => Compression::Level8,
        _ => Compression::Level9,
    }
}

/// Parallel, indexed XZ compressor/decompressor.
#[derive(Parser, Debug)]
#[command(
    name = "pixz",
    version,
    about = "Parallel, indexed XZ compression utility",
    long_about = "pixz compresses and decompresses tar archives (or arbitrary data with -t) \
                  into a standard-compliant XZ container, using multiple threads and writing \
                  an auxiliary file-index block that lets individual tar members be extracted \
                  without decompressing the whole archive."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct PixzOpts {
    /// Input file, or output file for a write/read run, or member specs to
    /// extract.
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// Decompress.
    #[arg(short = 'd', long = "decompress", conflicts_with_all = ["extract", "list"])]
    pub decompress: bool,

    /// Decompress and extract the named tar members (or every member if
    /// none are given), using the file-index for random access.
    #[arg(short = 'x', long = "extract", conflicts_with_all = ["decompress", "list"])]
    pub extract: bool,

    /// List the contents of a pixz/XZ file without decompressing it.
    #[arg(short = 'l', long = "list", conflicts_with_all = ["decompress", "extract"])]
    pub list: bool,

    /// Input file (otherwise read from stdin).
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: Option<String>,

    /// Output file (otherwise write to stdout).
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<String>,

    /// Do not treat the data as a tar archive: write/read a plain multi-block
    /// XZ stream with no file-index.
    #[arg(short = 't', long = "no-tar")]
    pub no_tar: bool,

    /// Keep (don't delete) the input file after a successful run.
    #[arg(short = 'k', long = "keep")]
    pub keep: bool,

    /// Enable the LZMA "extreme" preset variant.
    #[arg(short = 'e', long = "extreme")]
    pub extreme: bool,

    /// Maximum number of worker threads.
    #[arg(short = 'p', long = "threads", value_name = "N")]
    pub threads: Option<u32>,

    /// Work-item pool size override.
    #[arg(short = 'q', long = "pool-size", value_name = "N")]
    pub pool_size: Option<u32>,

    /// Block-size fraction of the preset's dictionary size.
    #[arg(short = 'f', long = "block-fraction", value_name = "F")]
    pub block_fraction: Option<f64>,

    /// Verbose: per-stream/per-block detail in list mode, a ratio report on
    /// compress/decompress.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Compression preset level 0 (fastest, lowest ratio).
    #[arg(short = '0', group = "level")]
    pub level_0: bool,
    /// Compression preset level 1.
    #[arg(short = '1', group = "level")]
    pub level_1: bool,
    /// Compression preset level 2.
    #[arg(short = '2', group = "level")]
    pub level_2: bool,
    /// Compression preset level 3.
    #[arg(short = '3', group = "level")]
    pub level_3: bool,
    /// Compression preset level 4.
    #[arg(short = '4', group = "level")]
    pub level_4: bool,
    /// Compression preset level 5.
    #[arg(short = '5', group = "level")]
    pub level_5: bool,
    /// Compression preset level 6 (default).
    #[arg(short = '6', group = "level")]
    pub level_6: bool,
    /// Compression preset level 7.
    #[arg(short = '7', group = "level")]
    pub level_7: bool,
    /// Compression preset level 8.
    #[arg(short = '8', group = "level")]
    pub level_8: bool,
    /// Compression preset level 9 (best ratio, slowest).
    #[arg(short = '9', group = "level")]
    pub level_9: bool,
}

impl PixzOpts {
    /// Parses `pixz`'s arguments from the process's argv.
    #[must_use]
    pub fn parse() -> Self {
        Parser::parse()
    }

    fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.extract {
            Mode::Extract
        } else if self.decompress {
            Mode::Decompress
        } else {
            Mode::Compress
        }
    }

    fn level(&self) -> u8 {
        [
            (self.level_0, 0),
            (self.level_1, 1),
            (self.level_2, 2),
            (self.level_3, 3),
            (self.level_4, 4),
            (self.level_5, 5),
            (self.level_6, 6),
            (self.level_7, 7),
            (self.level_8, 8),
            (self.level_9, 9),
        ]
        .iter()
        .find_map(|&(flag, level)| flag.then_some(level))
        .unwrap_or(6)
    }

    /// Resolves parsed options into a [`PixzConfig`], validating argument
    /// counts and flag combinations the way original pixz's `main()` does
    /// (SPEC_FULL.md §6.2, grounded on `examples/original_source/pixz.c`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if too many positional arguments were given,
    /// or both `-i`/positional input were specified.
    pub fn config(&self) -> Result<PixzConfig> {
        let mode = self.mode();
        let level = self.level();

        let (input, output, specs) = if mode == Mode::Extract {
            (self.input.clone(), None, self.args.clone())
        } else {
            let args = &self.args;
            if args.len() > 2 || (mode == Mode::List && args.len() == 2) {
                return Err(CliError::from(Error::Usage("too many arguments".to_string())));
            }
            if !args.is_empty() && self.input.is_some() {
                return Err(CliError::from(Error::Usage(
                    "multiple input files specified".to_string(),
                )));
            }
            let input = self.input.clone().or_else(|| args.first().cloned());
            let output = if args.len() == 2 {
                if self.output.is_some() {
                    return Err(CliError::from(Error::Usage(
                        "multiple output files specified".to_string(),
                    )));
                }
                args.get(1).cloned()
            } else {
                self.output.clone()
            };
            (input, output, Vec::new())
        };

        Ok(PixzConfig {
            mode,
            input,
            output,
            specs: specs.into_iter().map(String::into_bytes).collect(),
            tar_mode: !self.no_tar,
            keep: self.keep,
            level,
            extreme: self.extreme,
            threads: self.threads,
            pool_size: self.pool_size,
            block_fraction: self.block_fraction,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_opts() -> PixzOpts {
        PixzOpts {
            args: vec![],
            decompress: false,
            extract: false,
            list: false,
            input: None,
            output: None,
            no_tar: false,
            keep: false,
            extreme: false,
            threads: None,
            pool_size: None,
            block_fraction: None,
            verbose: false,
            level_0: false,
            level_1: false,
            level_2: false,
            level_3: false,
            level_4: false,
            level_5: false,
            level_6: false,
            level_7: false,
            level_8: false,
            level_9: false,
        }
    }

    #[test]
    fn default_mode_is_compress_at_level_six() {
        let opts = default_opts();
        let config = opts.config().unwrap();
        assert_eq!(config.mode, Mode::Compress);
        assert_eq!(config.level, 6);
    }

    #[test]
    fn two_positional_args_are_input_and_output() {
        let opts = PixzOpts {
            args: vec!["in.tar".to_string(), "out.tpxz".to_string()],
            ..default_opts()
        };
        let config = opts.config().unwrap();
        assert_eq!(config.input.as_deref(), Some("in.tar"));
        assert_eq!(config.output.as_deref(), Some("out.tpxz"));
    }

    #[test]
    fn three_positional_args_is_usage_error() {
        let opts = PixzOpts {
            args: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..default_opts()
        };
        assert!(opts.config().is_err());
    }

    #[test]
    fn extract_mode_treats_positionals_as_specs() {
        let opts = PixzOpts {
            extract: true,
            input: Some("archive.tpxz".to_string()),
            args: vec!["a/b".to_string(), "c".to_string()],
            ..default_opts()
        };
        let config = opts.config().unwrap();
        assert_eq!(config.mode, Mode::Extract);
        assert_eq!(config.input.as_deref(), Some("archive.tpxz"));
        assert_eq!(config.specs, vec![b"a/b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn extreme_flag_selects_extreme_variant() {
        let opts = PixzOpts {
            extreme: true,
            level_9: true,
            ..default_opts()
        };
        let config = opts.config().unwrap();
        assert_eq!(level_to_compression(config.level, config.extreme), Compression::Extreme(9));
    }

    #[test]
    fn list_mode_rejects_two_positional_args() {
        let opts = PixzOpts {
            list: true,
            args: vec!["a".to_string(), "b".to_string()],
            ..default_opts()
        };
        assert!(opts.config().is_err());
    }
}
