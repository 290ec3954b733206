//! Per-request scratch directories

use execgate_errors::{Error, PlatformError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Working directory for one execution
///
/// Either the caller's directory, or a fresh private directory that is
/// removed once the request finishes.
#[derive(Debug)]
pub(crate) enum WorkDir {
    Requested(PathBuf),
    Sandbox(TempDir),
}

impl WorkDir {
    pub(crate) fn prepare(requested: Option<&Path>, sandbox_root: Option<&Path>) -> Result<Self, Error> {
        if let Some(dir) = requested {
            return Ok(Self::Requested(dir.to_path_buf()));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("execgate-");
        let created = match sandbox_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map(Self::Sandbox).map_err(|e| {
            PlatformError::WorkingDirectory {
                path: sandbox_root.map_or_else(
                    || std::env::temp_dir().display().to_string(),
                    |root| root.display().to_string(),
                ),
                message: format!("cannot create sandbox: {e}"),
            }
            .into()
        })
    }

    pub(crate) fn path(&self) -> &Path {
        match self {
            Self::Requested(path) => path,
            Self::Sandbox(dir) => dir.path(),
        }
    }

    /// Remove the sandbox, if one was created
    pub(crate) fn finish(self) {
        if let Self::Sandbox(dir) = self {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove sandbox directory");
            }
        }
    }
}
