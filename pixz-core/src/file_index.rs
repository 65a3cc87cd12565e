//! File-index codec (C6): encode/decode the auxiliary file-index block's
//! uncompressed content.
//!
//! Grounded on original pixz's `write_file_index*`/`read_file_index`
//! (`examples/original_source/src/write.c`, `src/read.c`). The original
//! streams this through a fixed-size intermediate buffer as it is produced
//! incrementally by `lzma_code`; here the whole block is always decoded into
//! memory first by [`crate::codec::decode_block`] (file-index blocks are
//! bounded by the number of tar members, never by [`crate::options::MAX_SPLIT_SIZE`]),
//! so encode/decode work directly against a single `&[u8]`/`Vec<u8>`.

use crate::error::{Error, Result};
use crate::session::FileIndexEntry;

/// Magic prefix identifying a file-index block's uncompressed content
/// (SPEC_FULL.md §3, §6).
pub const MAGIC: u64 = 0xDBAE_14D6_2E32_4CA6;

/// Encodes `entries` (already terminated by [`crate::session::FileIndexBuilder::finish`])
/// into the file-index block's uncompressed byte layout:
/// `MAGIC(8 LE) || (path NUL-terminated || offset(8 LE))*`.
#[must_use]
pub fn encode(entries: &[FileIndexEntry]) -> Vec<u8> {
    let size = entries.iter().map(|e| e.path.len() + 1 + 8).sum::<usize>() + 8;
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.path);
        out.push(0);
        out.extend_from_slice(&entry.offset.to_le_bytes());
    }
    out
}

/// Decodes a file-index block's uncompressed content.
///
/// # Errors
///
/// Returns [`Error::Format`] if the magic prefix is missing, or an entry is
/// truncated (no NUL terminator, or fewer than 8 trailing offset bytes).
pub fn decode(data: &[u8]) -> Result<Vec<FileIndexEntry>> {
    if !has_magic(data) {
        return Err(Error::Format("file-index magic mismatch".to_string()));
    }

    let mut entries = Vec::new();
    let mut pos = 8;
    loop {
        let nul = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::Format("file-index entry missing NUL terminator".to_string()))?;
        let path = data[pos..pos + nul].to_vec();
        pos += nul + 1;

        if pos + 8 > data.len() {
            return Err(Error::Format("file-index entry missing offset".to_string()));
        }
        let offset = u64::from_le_bytes(data[pos..pos + 8].try_into().expect("8-byte slice"));
        pos += 8;

        let terminal = path.is_empty();
        entries.push(FileIndexEntry { path, offset });
        if terminal {
            break;
        }
    }
    Ok(entries)
}

/// Whether `data`'s first 8 bytes match the file-index magic — the reader's
/// detection heuristic (SPEC_FULL.md §3, §4.6, §9 "File-index detection on
/// streams").
#[must_use]
pub fn has_magic(data: &[u8]) -> bool {
    data.len() >= 8 && u64::from_le_bytes(data[0..8].try_into().expect("8-byte slice")) == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<FileIndexEntry> {
        vec![
            FileIndexEntry {
                path: b"a".to_vec(),
                offset: 0,
            },
            FileIndexEntry {
                path: b"dir/b".to_vec(),
                offset: 612,
            },
            FileIndexEntry {
                path: Vec::new(),
                offset: 900,
            },
        ]
    }

    #[test]
    fn encode_starts_with_magic() {
        let out = encode(&entries());
        assert_eq!(&out[0..8], &MAGIC.to_le_bytes());
    }

    #[test]
    fn encode_then_decode_roundtrips() {
        let original = entries();
        let out = encode(&original);
        let decoded = decode(&out).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_wrong_magic() {
        let data = [0u8; 16];
        assert!(matches!(decode(&data), Err(Error::Format(_))));
    }

    #[test]
    fn decode_rejects_truncated_entry() {
        let mut out = encode(&entries());
        out.truncate(out.len() - 2);
        assert!(decode(&out).is_err());
    }

    #[test]
    fn has_magic_is_false_for_short_input() {
        assert!(!has_magic(&[1, 2, 3]));
    }
}
