//! On-disk snapshot of the cache tables.
//!
//! The snapshot is a single binary file framed as a 4-byte little-endian
//! header length, a bincode header (magic, format version, payload checksum)
//! and the bincode-encoded [`CacheTables`]. Writes go to a sibling temporary
//! file that is then renamed over the snapshot, so readers only ever observe
//! the previous or the next committed state.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use mason_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::tables::CacheTables;

/// Name of the snapshot file within the build-output directory.
pub const SNAPSHOT_FILE: &str = "cache.bin";

/// Name of the in-flight file written before the atomic rename.
const SNAPSHOT_TMP_FILE: &str = "cache.bin.tmp";

/// Magic bytes identifying a mason cache snapshot.
const SNAPSHOT_MAGIC: [u8; 4] = *b"MSON";

/// Current snapshot format version. Increment on breaking changes to
/// the header or table layout.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Header prepended to every snapshot for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic bytes: must be `b"MSON"`.
    pub magic: [u8; 4],

    /// Snapshot format version.
    pub format_version: u32,

    /// Content hash of the payload (for integrity checks).
    pub checksum: ContentHash,
}

/// Reads and atomically replaces the snapshot file in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    /// Creates a store rooted at the given build-output directory.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    /// The directory holding the snapshot.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the committed snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(SNAPSHOT_FILE)
    }

    /// Path of the temporary file used during commit.
    pub fn tmp_path(&self) -> PathBuf {
        self.directory.join(SNAPSHOT_TMP_FILE)
    }

    /// Reads the committed snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot has been committed yet, and an error
    /// describing the problem if the file exists but cannot be trusted.
    pub fn read(&self) -> Result<Option<CacheTables>, CacheError> {
        let path = self.snapshot_path();
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };

        if raw.len() < 4 {
            return Err(CacheError::InvalidHeader {
                path,
                reason: "file shorter than header length prefix".to_string(),
            });
        }

        let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        if raw.len() < 4 + header_len {
            return Err(CacheError::InvalidHeader {
                path,
                reason: format!("header length {header_len} exceeds file size"),
            });
        }

        let (header, _): (SnapshotHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .map_err(|e| CacheError::InvalidHeader {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

        if header.magic != SNAPSHOT_MAGIC {
            return Err(CacheError::InvalidHeader {
                path,
                reason: "missing magic bytes".to_string(),
            });
        }

        if header.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path,
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        let payload = &raw[4 + header_len..];
        let actual = ContentHash::from_bytes(payload);
        if actual != header.checksum {
            return Err(CacheError::ChecksumMismatch {
                path,
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        let (tables, _): (CacheTables, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(
                |e| CacheError::Serialization {
                    reason: e.to_string(),
                },
            )?;

        Ok(Some(tables))
    }

    /// Writes `tables` as the new committed snapshot.
    ///
    /// The bytes are written and synced to the temporary file first and then
    /// renamed over the snapshot. On failure the previous snapshot is left
    /// intact.
    pub fn write(&self, tables: &CacheTables) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.directory).map_err(|e| CacheError::Io {
            path: self.directory.clone(),
            source: e,
        })?;

        let payload = bincode::serde::encode_to_vec(tables, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let tmp = self.tmp_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CacheError::Io { path, source }
        };

        let mut file = File::create(&tmp).map_err(io_err(&tmp))?;
        file.write_all(&output).map_err(io_err(&tmp))?;
        file.sync_all().map_err(io_err(&tmp))?;
        drop(file);

        let target = self.snapshot_path();
        std::fs::rename(&tmp, &target).map_err(io_err(&target))
    }

    /// Removes a temporary file left behind by an interrupted commit.
    pub fn discard_pending(&self) -> Result<(), CacheError> {
        let tmp = self.tmp_path();
        match std::fs::remove_file(&tmp) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: tmp,
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::InputBaseline;
    use mason_common::Fingerprint;

    fn make_store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        (dir, store)
    }

    fn sample_tables() -> CacheTables {
        let mut t = CacheTables::default();
        t.options.insert("enum.mode".to_string(), "release".to_string());
        t.input_files.insert(
            "/p/project.toml".to_string(),
            InputBaseline {
                mtime_millis: 1_700_000_000_000,
                metadata: Fingerprint::of(b"cmake"),
            },
        );
        t.output_files.insert(
            "/p/.build/cmake/CMakeLists.txt".to_string(),
            ContentHash::from_bytes(b"cmake_minimum_required"),
        );
        t
    }

    fn frame(header: &SnapshotHeader, payload: &[u8]) -> Vec<u8> {
        let header_bytes =
            bincode::serde::encode_to_vec(header, bincode::config::standard()).unwrap();
        let mut output = Vec::new();
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(payload);
        output
    }

    #[test]
    fn write_and_read_back() {
        let (_dir, store) = make_store();
        let tables = sample_tables();
        store.write(&tables).unwrap();
        assert_eq!(store.read().unwrap(), Some(tables));
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn read_missing_is_none() {
        let (_dir, store) = make_store();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeply").join("nested").join(".build");
        let store = SnapshotStore::new(&nested);
        store.write(&CacheTables::default()).unwrap();
        assert!(nested.join(SNAPSHOT_FILE).exists());
    }

    #[test]
    fn read_truncated_prefix_errors() {
        let (_dir, store) = make_store();
        std::fs::write(store.snapshot_path(), b"AB").unwrap();
        assert!(matches!(
            store.read(),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn read_garbage_errors() {
        let (_dir, store) = make_store();
        std::fs::write(store.snapshot_path(), b"garbage data that is not a snapshot").unwrap();
        assert!(store.read().is_err());
    }

    #[test]
    fn read_wrong_magic_errors() {
        let (_dir, store) = make_store();
        let header = SnapshotHeader {
            magic: *b"BAAD",
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(b"data"),
        };
        std::fs::write(store.snapshot_path(), frame(&header, b"data")).unwrap();
        assert!(matches!(
            store.read(),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn read_wrong_version_errors() {
        let (_dir, store) = make_store();
        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: 999,
            checksum: ContentHash::from_bytes(b"data"),
        };
        std::fs::write(store.snapshot_path(), frame(&header, b"data")).unwrap();
        assert!(matches!(
            store.read(),
            Err(CacheError::VersionMismatch { actual: 999, .. })
        ));
    }

    #[test]
    fn read_tampered_payload_errors() {
        let (_dir, store) = make_store();
        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(b"data"),
        };
        std::fs::write(store.snapshot_path(), frame(&header, b"tampered")).unwrap();
        assert!(matches!(
            store.read(),
            Err(CacheError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn overwrite_replaces_previous_snapshot() {
        let (_dir, store) = make_store();
        store.write(&sample_tables()).unwrap();
        store.write(&CacheTables::default()).unwrap();
        assert_eq!(store.read().unwrap(), Some(CacheTables::default()));
    }

    #[test]
    fn discard_pending_removes_leftover_tmp() {
        let (_dir, store) = make_store();
        std::fs::write(store.tmp_path(), b"half written").unwrap();
        store.discard_pending().unwrap();
        assert!(!store.tmp_path().exists());
        // Nothing to remove is fine too.
        store.discard_pending().unwrap();
    }
}
