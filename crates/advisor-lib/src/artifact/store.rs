//! On-disk artifact storage
//!
//! An artifact file is a bincode envelope holding the format version, the
//! model kind, and the bincode-encoded artifact with its SHA-256 checksum.
//! Writes go through a sibling temp file that is synced and renamed into
//! place, so a reader never sees a partial artifact.

use super::ModelArtifact;
use crate::error::PersistenceError;
use crate::models::ModelKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current artifact envelope version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    kind: ModelKind,
    checksum: String,
    payload: Vec<u8>,
}

/// A single artifact file location
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and verify the artifact, which must be of `expected` kind
    pub fn load(&self, expected: ModelKind) -> Result<ModelArtifact, PersistenceError> {
        let bytes = fs::read(&self.path).map_err(|e| self.io_error(e))?;

        let envelope: ArtifactEnvelope =
            bincode::deserialize(&bytes).map_err(PersistenceError::Decode)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedFormat {
                found: envelope.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if envelope.kind != expected {
            return Err(PersistenceError::KindMismatch {
                found: envelope.kind,
                expected,
            });
        }

        let computed = compute_checksum(&envelope.payload);
        if computed != envelope.checksum {
            return Err(PersistenceError::ChecksumMismatch {
                recorded: envelope.checksum,
                computed,
            });
        }

        let artifact: ModelArtifact =
            bincode::deserialize(&envelope.payload).map_err(PersistenceError::Decode)?;
        if artifact.kind != expected {
            return Err(PersistenceError::KindMismatch {
                found: artifact.kind,
                expected,
            });
        }
        artifact.validate()?;

        debug!(path = ?self.path, model = %expected, bytes = bytes.len(), "Artifact read");
        Ok(artifact)
    }

    /// Atomically write `artifact`, creating the parent directory if needed
    pub fn save(&self, artifact: &ModelArtifact) -> Result<(), PersistenceError> {
        let payload = bincode::serialize(artifact).map_err(PersistenceError::Encode)?;
        let envelope = ArtifactEnvelope {
            format_version: FORMAT_VERSION,
            kind: artifact.kind,
            checksum: compute_checksum(&payload),
            payload,
        };
        let bytes = bincode::serialize(&envelope).map_err(PersistenceError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.temp_path();
        let written = write_synced(&temp_path, &bytes).and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        debug!(path = ?self.path, model = %artifact.kind, bytes = bytes.len(), "Artifact written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        if source.kind() == io::ErrorKind::NotFound {
            PersistenceError::NotFound {
                path: self.path.clone(),
            }
        } else {
            PersistenceError::Io {
                path: self.path.clone(),
                source,
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// SHA-256 of `data` as lowercase hex
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
