//! Buffered, content-addressed file writes.

use std::fmt;
use std::path::{Path, PathBuf};

use mason_cache::BuildCache;
use mason_common::{relative_path, ContentHash, Logger};

use crate::error::EmitError;

/// Accumulates the text of one output file and writes it only if changed.
#[derive(Debug, Clone)]
pub struct FileEmitter {
    path: PathBuf,
    buffer: String,
}

impl FileEmitter {
    /// Starts an empty buffer for the file at `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            buffer: String::new(),
        }
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The text accumulated so far.
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Appends `text` to the buffer. Never touches the filesystem.
    pub fn append(&mut self, text: &str) -> &mut Self {
        self.buffer.push_str(text);
        self
    }

    /// Writes the buffer to disk if its hash differs from the recorded one.
    ///
    /// Returns `true` if the file was written. When the content is unchanged
    /// the file is not touched, which keeps its modification time stable for
    /// tools that compare timestamps. The new hash is recorded in `cache`
    /// either way.
    pub fn commit(&self, cache: &mut BuildCache, logger: &dyn Logger) -> Result<bool, EmitError> {
        let hash = ContentHash::from_bytes(self.buffer.as_bytes());
        let display = relative_path(cache.directory(), &self.path);

        if !cache.did_output_file_change(&self.path, &hash) {
            logger.trace(&format!("Keeping {display}"));
            return Ok(false);
        }

        logger.info(&format!("Writing {display}"));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EmitError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&self.path, self.buffer.as_bytes()).map_err(|e| EmitError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(true)
    }
}

impl fmt::Write for FileEmitter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}
