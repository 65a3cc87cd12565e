//! Utilities for configuring safe worker thread counts for the pipeline.

use crate::error::{Error, Result};

/// Worker thread configuration for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threading {
    /// Automatically choose a worker count that keeps a safety margin for the
    /// rest of the system.
    #[default]
    Auto,
    /// Use an explicit number of worker threads.
    ///
    /// `0` is treated as `Auto`.
    Exact(u32),
}

/// Validates and converts a threading configuration to a concrete worker count.
///
/// # Errors
///
/// Returns [`Error::Usage`] if the requested count exceeds the safe maximum.
pub(crate) fn sanitize_threads(threads: Threading) -> Result<u32> {
    let maximum = get_safe_max_threads();
    match threads {
        Threading::Auto | Threading::Exact(0) => Ok(maximum),
        Threading::Exact(requested) if requested <= maximum => Ok(requested),
        Threading::Exact(requested) => Err(Error::Usage(format!(
            "requested {requested} threads exceeds safe limit of {maximum}"
        ))),
    }
}

/// Determines the maximum safe number of worker threads for this host.
fn get_safe_max_threads() -> u32 {
    let available = match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(_) => 1,
    };

    let system_reserve = match available {
        1 => 0,
        2..=4 => 1,
        5..=7 => 2,
        _ => 3,
    };

    let safe = available.saturating_sub(system_reserve).max(1);
    u32::try_from(safe).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_returns_safe_max() {
        let max = get_safe_max_threads();
        assert!(matches!(sanitize_threads(Threading::Auto), Ok(n) if n == max));
    }

    #[test]
    fn zero_means_auto() {
        let max = get_safe_max_threads();
        assert!(matches!(sanitize_threads(Threading::Exact(0)), Ok(n) if n == max));
    }

    #[test]
    fn exceeding_max_is_usage_error() {
        let max = get_safe_max_threads();
        assert!(matches!(
            sanitize_threads(Threading::Exact(max + 1)),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn default_is_auto() {
        assert_eq!(Threading::default(), Threading::Auto);
    }
}
