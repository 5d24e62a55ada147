//! Snapshot model

use serde::{Deserialize, Serialize};

uuid_id!(
    /// A unique identifier for a stored snapshot
    SnapshotId
);

/// One immutable, content-hashed capture of the remote team document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier
    pub id: SnapshotId,
    /// Hex-encoded SHA-256 of `payload` (unique)
    pub hash: String,
    /// Canonical JSON document
    pub payload: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_id_parse() {
        let id = SnapshotId::new();
        let parsed: SnapshotId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_snapshot_ids_sort_by_creation() {
        let first = SnapshotId::new();
        let second = SnapshotId::new();
        assert!(first < second);
    }
}
