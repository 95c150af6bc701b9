//! Scoped temporary files for synthesized audio
//!
//! Each spoken reply lives in a throwaway MP3 file for exactly one
//! playback. The artifact owns the path: deletion happens on drop no
//! matter how playback ends, and deleting twice or after the file has
//! already vanished is a no-op.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A synthesized audio clip on disk, deleted when dropped
#[derive(Debug)]
pub struct AudioArtifact {
    path: PathBuf,
    removed: bool,
}

impl AudioArtifact {
    /// Write MP3 bytes to a fresh temporary file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn write(bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("sori-")
            .suffix(".mp3")
            .tempfile()?;

        file.write_all(bytes)?;
        file.flush()?;

        // Detach tempfile's own drop-deletion; this type governs cleanup
        let (_file, path) = file.keep().map_err(|e| Error::Io(e.error))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");

        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Path of the on-disk clip
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the clip. Idempotent: repeated calls and an
    /// already-missing file both succeed silently.
    pub fn delete(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "artifact deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "artifact cleanup failed");
            }
        }
    }
}

impl Drop for AudioArtifact {
    fn drop(&mut self) {
        self.delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_file_with_contents() {
        let artifact = AudioArtifact::write(b"mp3-bytes").unwrap();
        assert!(artifact.path().exists());
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"mp3-bytes");
    }

    #[test]
    fn drop_removes_file() {
        let path = {
            let artifact = AudioArtifact::write(b"x").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn delete_is_idempotent() {
        let mut artifact = AudioArtifact::write(b"x").unwrap();
        artifact.delete();
        assert!(!artifact.path().exists());
        artifact.delete();
        artifact.delete();
    }

    #[test]
    fn delete_survives_external_removal() {
        let mut artifact = AudioArtifact::write(b"x").unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        artifact.delete();
    }
}
