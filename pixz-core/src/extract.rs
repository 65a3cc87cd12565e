//! Extract planner (C10): compute wanted uncompressed byte ranges from a
//! glob-free prefix match against the file-index.
//!
//! Grounded on original pixz's `spec_match`/`wanted_files` (`src/read.c`).

use crate::error::{Error, Result};
use crate::session::FileIndexEntry;

/// One member the caller asked to extract, in uncompressed (tar) byte
/// coordinates (SPEC_FULL.md §3 "Wanted range").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WantedRange {
    /// Tar member path, as recorded in the file-index.
    pub name: Vec<u8>,
    /// Start offset, inclusive.
    pub start: u64,
    /// End offset, exclusive.
    pub end: u64,
}

impl WantedRange {
    /// Number of uncompressed bytes this member occupies.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Returns whether `spec` matches `name`: an exact match, or `name` names
/// something inside the `spec` directory (SPEC_FULL.md §8 P8).
///
/// Equivalently: `spec` is a prefix of `name`, and the character at
/// `name[spec.len()]` is either end-of-string or `/`.
#[must_use]
pub fn spec_match(spec: &[u8], name: &[u8]) -> bool {
    if name == spec {
        return true;
    }
    name.len() > spec.len() && name.starts_with(spec) && name[spec.len()] == b'/'
}

/// Builds the wanted-range list for `specs` against `entries` (the
/// file-index, including its terminal empty-path entry).
///
/// An empty `specs` means "extract everything": every non-terminal entry is
/// wanted, in file order. Each spec's trailing `/` characters are stripped
/// before matching.
///
/// # Errors
///
/// Returns [`Error::NotFound`] naming the first spec that matched no entry.
pub fn plan(entries: &[FileIndexEntry], specs: &[Vec<u8>]) -> Result<Vec<WantedRange>> {
    let specs: Vec<Vec<u8>> = specs.iter().map(|s| strip_trailing_slashes(s)).collect();
    let mut matched = vec![false; specs.len()];
    let mut wanted = Vec::new();

    for pair in entries.windows(2) {
        let (entry, next) = (&pair[0], &pair[1]);
        if entry.path.is_empty() {
            continue;
        }

        let want = if specs.is_empty() {
            true
        } else {
            let mut any = false;
            for (i, spec) in specs.iter().enumerate() {
                if spec_match(spec, &entry.path) {
                    matched[i] = true;
                    any = true;
                    break;
                }
            }
            any
        };

        if want {
            wanted.push(WantedRange {
                name: entry.path.clone(),
                start: entry.offset,
                end: next.offset,
            });
        }
    }

    if let Some(idx) = matched.iter().position(|m| !m) {
        return Err(Error::NotFound(
            String::from_utf8_lossy(&specs[idx]).into_owned(),
        ));
    }

    Ok(wanted)
}

fn strip_trailing_slashes(spec: &[u8]) -> Vec<u8> {
    let mut end = spec.len();
    while end > 0 && spec[end - 1] == b'/' {
        end -= 1;
    }
    spec[..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_match_table() {
        assert!(spec_match(b"a/b", b"a/b"));
        assert!(!spec_match(b"a/b", b"a/bc"));
        assert!(spec_match(b"a/b", b"a/b/c"));
    }

    #[test]
    fn trailing_slash_is_stripped_before_matching() {
        let entries = vec![
            FileIndexEntry {
                path: b"a/b".to_vec(),
                offset: 0,
            },
            FileIndexEntry {
                path: Vec::new(),
                offset: 100,
            },
        ];
        let specs = vec![b"a/b/".to_vec()];
        let wanted = plan(&entries, &specs).unwrap();
        assert_eq!(wanted.len(), 1);
        assert_eq!(wanted[0].name, b"a/b");
    }

    #[test]
    fn empty_specs_wants_every_entry() {
        let entries = vec![
            FileIndexEntry {
                path: b"a".to_vec(),
                offset: 0,
            },
            FileIndexEntry {
                path: b"b".to_vec(),
                offset: 612,
            },
            FileIndexEntry {
                path: Vec::new(),
                offset: 900,
            },
        ];
        let wanted = plan(&entries, &[]).unwrap();
        assert_eq!(
            wanted,
            vec![
                WantedRange {
                    name: b"a".to_vec(),
                    start: 0,
                    end: 612
                },
                WantedRange {
                    name: b"b".to_vec(),
                    start: 612,
                    end: 900
                },
            ]
        );
        assert_eq!(wanted[1].size(), 288);
    }

    #[test]
    fn unmatched_spec_is_not_found() {
        let entries = vec![
            FileIndexEntry {
                path: b"a".to_vec(),
                offset: 0,
            },
            FileIndexEntry {
                path: Vec::new(),
                offset: 100,
            },
        ];
        let err = plan(&entries, &[b"missing".to_vec()]).unwrap_err();
        assert!(matches!(err, Error::NotFound(ref name) if name == "missing"));
    }
}
