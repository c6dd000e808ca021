//! Loading and saving model artifacts.
//!
//! An artifact lives in a single JSON file. Loading distinguishes an absent file
//! ([`ModelError::NotFound`]) from one whose bytes cannot be turned back into a consistent
//! artifact ([`ModelError::Corrupt`]); callers surface these differently.

use crate::artifact::ModelArtifact;
use crate::{ModelError, ModelResult};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Stateless entry point for artifact persistence.
pub struct ModelStore;

impl ModelStore {
    /// Reads and validates the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ModelError::NotFound` if nothing exists at `path`,
    /// - `ModelError::Corrupt` if the content cannot be deserialised or fails consistency checks,
    /// - `ModelError::Read` for any other I/O failure.
    pub fn load(path: &Path) -> ModelResult<ModelArtifact> {
        tracing::info!("loading model artifact from {}", path.display());

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::error!(
                    "model artifact not found at {}; train one with `noshow train` first",
                    path.display()
                );
                return Err(ModelError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ModelError::Read(e)),
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|e| ModelError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        artifact.validate().map_err(|reason| ModelError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::info!("model artifact loaded from {}", path.display());
        Ok(artifact)
    }

    /// Writes `artifact` to `path`, creating parent directories as needed.
    ///
    /// The document is written to a sibling temporary file and renamed into place, so a reader
    /// never observes a half-written artifact.
    pub fn save(artifact: &ModelArtifact, path: &Path) -> ModelResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ModelError::Write)?;
        }
        let json = serde_json::to_vec_pretty(artifact).map_err(ModelError::Serialization)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json).map_err(ModelError::Write)?;
        fs::rename(&tmp, path).map_err(ModelError::Write)?;

        tracing::info!("model artifact saved to {}", path.display());
        Ok(())
    }
}
