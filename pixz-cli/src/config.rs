//! Resolved CLI configuration, the output of [`crate::opts::PixzOpts::config`]
//! and the input to [`crate::process::run`].

/// Operation an invocation performs, mirroring original pixz's `pixz_op_t`
/// (`examples/original_source/pixz.c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compress (write) a tar stream or raw bytes into an XZ container.
    Compress,
    /// Decompress the whole archive.
    Decompress,
    /// Decompress and extract only the named tar members.
    Extract,
    /// Print index contents without decompressing block payloads.
    List,
}

/// Fully resolved configuration for one `pixz` invocation.
#[derive(Debug, Clone)]
pub struct PixzConfig {
    /// Which operation to perform.
    pub mode: Mode,
    /// Input path, or `None` for stdin.
    pub input: Option<String>,
    /// Output path, or `None` for stdout (or auto-derived on write/read).
    pub output: Option<String>,
    /// Tar member specs to extract (`Mode::Extract` only).
    pub specs: Vec<Vec<u8>>,
    /// Whether to treat input as a tar archive (`-t` clears this).
    pub tar_mode: bool,
    /// Keep the input file after a successful run.
    pub keep: bool,
    /// Compression preset level 0..=9.
    pub level: u8,
    /// Whether to use the LZMA "extreme" preset variant (`-e`).
    pub extreme: bool,
    /// Worker thread cap (`-p`).
    pub threads: Option<u32>,
    /// Work-item pool size override (`-q`).
    pub pool_size: Option<u32>,
    /// Block-size fraction override (`-f`).
    pub block_fraction: Option<f64>,
    /// Verbose output.
    pub verbose: bool,
}
