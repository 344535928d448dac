//! The transactional [`BuildCache`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mason_common::{canonical_path, ContentHash, Fingerprint, Logger};

use crate::error::CacheError;
use crate::store::SnapshotStore;
use crate::tables::{CacheTables, InputBaseline};

/// Persistent option store and change oracle for one build-output directory.
///
/// The cache is opened lazily: the first accessor call loads the committed
/// snapshot into an in-memory transaction, and every later mutation only
/// touches that transaction. [`commit`](Self::commit) replaces the snapshot
/// atomically and [`rollback`](Self::rollback) discards the buffered state.
/// Either one closes the transaction, and the next accessor call transparently
/// reopens it from disk.
///
/// Only one writer per directory is supported.
pub struct BuildCache {
    store: SnapshotStore,
    transaction: Option<CacheTables>,
    logger: Arc<dyn Logger>,
}

impl BuildCache {
    /// Creates a cache for the given build-output directory.
    ///
    /// Nothing is read from disk until the first accessor call.
    pub fn new(directory: &Path, logger: Arc<dyn Logger>) -> Self {
        Self {
            store: SnapshotStore::new(directory),
            transaction: None,
            logger,
        }
    }

    /// Returns `true` while a transaction is open.
    pub fn is_open(&self) -> bool {
        self.transaction.is_some()
    }

    /// The build-output directory this cache belongs to.
    pub fn directory(&self) -> &Path {
        self.store.directory()
    }

    /// Path of the committed snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.store.snapshot_path()
    }

    /// Returns the value of an option, if one is stored.
    pub fn get_option(&mut self, key: &str) -> Option<String> {
        self.tables().options.get(key).cloned()
    }

    /// Stores an option value in the open transaction.
    pub fn set_option(&mut self, key: &str, value: &str) {
        self.tables()
            .options
            .insert(key.to_string(), value.to_string());
    }

    /// Reports whether an input file changed since its last check.
    ///
    /// Returns `true` if the file does not exist, or if its modification time
    /// or the fingerprint of `extra_metadata` differs from the stored
    /// baseline. The baseline is overwritten with the current values on every
    /// call, so a second check of the same file within one pass reports
    /// `false`. Check each input at most once per pass.
    ///
    /// A missing or unreadable file drops its baseline, so it keeps reporting
    /// `true` until it can be observed again.
    pub fn did_input_file_change(&mut self, path: &Path, extra_metadata: &[u8]) -> bool {
        let key = cache_key(path);

        let mtime_millis = match std::fs::metadata(path) {
            Ok(meta) => match meta.modified() {
                Ok(modified) => millis_since_epoch(modified),
                Err(e) => {
                    self.logger.warn(&format!(
                        "unable to read modification time of \"{}\": {e}",
                        path.display()
                    ));
                    self.tables().input_files.remove(&key);
                    return true;
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.tables().input_files.remove(&key);
                return true;
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "unable to stat \"{}\": {e}",
                    path.display()
                ));
                self.tables().input_files.remove(&key);
                return true;
            }
        };

        let current = InputBaseline {
            mtime_millis,
            metadata: Fingerprint::of(extra_metadata),
        };
        let previous = self.tables().input_files.insert(key, current);
        previous != Some(current)
    }

    /// Reports whether `hash` differs from the last hash recorded for an output.
    ///
    /// The hash is stored as the new baseline regardless of the outcome.
    pub fn did_output_file_change(&mut self, path: &Path, hash: &ContentHash) -> bool {
        let key = cache_key(path);
        let previous = self.tables().output_files.insert(key, *hash);
        previous.as_ref() != Some(hash)
    }

    /// Writes the open transaction to disk and closes it.
    ///
    /// The transaction is closed even if the write fails; the previously
    /// committed snapshot stays intact in that case. Committing without an
    /// open transaction is a no-op.
    pub fn commit(&mut self) -> Result<(), CacheError> {
        match self.transaction.take() {
            Some(tables) => {
                self.store.write(&tables)?;
                self.logger.debug(&format!(
                    "committed build cache \"{}\"",
                    self.store.snapshot_path().display()
                ));
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Discards the open transaction.
    ///
    /// Also removes a temporary file left behind by an interrupted commit.
    pub fn rollback(&mut self) -> Result<(), CacheError> {
        if self.transaction.take().is_some() {
            self.logger.debug(&format!(
                "rolled back build cache \"{}\"",
                self.store.snapshot_path().display()
            ));
        }
        self.store.discard_pending()
    }

    /// Like [`rollback`](Self::rollback), but logs failures instead of
    /// returning them. For use on error paths.
    pub fn rollback_safe(&mut self) {
        if let Err(e) = self.rollback() {
            self.logger
                .error(&format!("unable to roll back build cache: {e}"));
        }
    }

    /// Opens the transaction on first use.
    ///
    /// A snapshot that cannot be read is reported and replaced by empty
    /// tables, which makes every input and output look changed.
    fn tables(&mut self) -> &mut CacheTables {
        if self.transaction.is_none() {
            let tables = match self.store.read() {
                Ok(Some(tables)) => tables,
                Ok(None) => CacheTables::default(),
                Err(e) => {
                    self.logger
                        .warn(&format!("ignoring unreadable build cache: {e}"));
                    CacheTables::default()
                }
            };
            self.transaction = Some(tables);
        }
        self.transaction.get_or_insert_with(CacheTables::default)
    }
}

impl std::fmt::Debug for BuildCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCache")
            .field("store", &self.store)
            .field("open", &self.is_open())
            .finish()
    }
}

fn cache_key(path: &Path) -> String {
    canonical_path(path).to_string_lossy().into_owned()
}

fn millis_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
