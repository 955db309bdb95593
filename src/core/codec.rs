//! Snapshot codec
//!
//! Converts the engine's binary snapshot to and from the text form kept in a
//! key-value storage slot. The text form is a JSON array of byte values
//! (`[83,81,76,...]`), the layout the web client keeps in browser local
//! storage, so slots written by either side stay readable.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while moving a snapshot between the engine and storage
#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    /// Stored text exists but cannot be decoded into bytes
    #[error("Stored snapshot is malformed: {reason}")]
    #[diagnostic(
        code(emakhua::snapshot::malformed),
        help("the storage slot is corrupted; restore a backup or clear the slot to start fresh")
    )]
    Malformed { reason: String },

    /// Bytes decoded fine but the engine refused them
    #[error("Snapshot is not a usable database: {0}")]
    #[diagnostic(code(emakhua::snapshot::engine))]
    Engine(#[from] rusqlite::Error),

    /// The storage backend failed to read or write
    #[error("Storage slot error: {0}")]
    #[diagnostic(code(emakhua::snapshot::storage))]
    Storage(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(emakhua::snapshot::io))]
    Io(#[from] std::io::Error),
}

/// Encode snapshot bytes into storable text
pub fn encode(bytes: &[u8]) -> Result<String, SnapshotError> {
    serde_json::to_string(bytes).map_err(|e| SnapshotError::Storage(e.to_string()))
}

/// Decode storable text back into snapshot bytes
pub fn decode(text: &str) -> Result<Vec<u8>, SnapshotError> {
    serde_json::from_str::<Vec<u8>>(text).map_err(|e| SnapshotError::Malformed {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = encode(&bytes).unwrap();
        assert_eq!(decode(&text).unwrap(), bytes);
    }

    #[test]
    fn test_roundtrip_empty() {
        assert_eq!(encode(&[]).unwrap(), "[]");
        assert!(decode("[]").unwrap().is_empty());
    }

    #[test]
    fn test_encode_matches_json_array_layout() {
        assert_eq!(encode(&[83, 81, 76]).unwrap(), "[83,81,76]");
        // Whitespace produced by pretty printers is tolerated
        assert_eq!(decode("[ 1, 2,\n 3 ]").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not json"),
            Err(SnapshotError::Malformed { .. })
        ));
        assert!(matches!(
            decode("[1, 2, 300]"),
            Err(SnapshotError::Malformed { .. })
        ));
        assert!(matches!(
            decode("{\"a\": 1}"),
            Err(SnapshotError::Malformed { .. })
        ));
    }
}
