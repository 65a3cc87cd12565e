//! `pixz`'s command-line surface, built on the [`pixz_core`] pipeline
//! library.
//!
//! Argument parsing and path/suffix derivation are intentionally kept out of
//! `pixz-core` (SPEC_FULL.md §1 "Out of scope"); this crate is where they
//! live.

pub mod config;
pub mod error;
pub mod io;
pub mod list;
pub mod opts;
pub mod process;

pub use config::{Mode, PixzConfig};
pub use error::{CliError, Error, InvocationError, Result, Warning};
pub use opts::PixzOpts;
