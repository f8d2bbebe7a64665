use crate::error::{RendezvousError, Result};
use crate::lock::LockName;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CLAIM_EXTENSION: &str = "lock";
const PRESENCE_EXTENSION: &str = "presence";

/// A directory shared by every process that coordinates through it.
///
/// Two processes see the same named locks iff they use the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockNamespace {
    dir: PathBuf,
}

impl LockNamespace {
    /// Use `dir` as the namespace, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| RendezvousError::LockDirectoryFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        // Canonical form so the registry keys agree however the path was spelled
        let dir = dir
            .canonicalize()
            .map_err(|e| RendezvousError::LockDirectoryFailed {
                path: dir.clone(),
                source: e,
            })?;

        if !dir.is_dir() {
            return Err(RendezvousError::LockDirectoryFailed {
                path: dir,
                source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            });
        }

        Ok(LockNamespace { dir })
    }

    /// The per-user namespace in the platform cache directory.
    pub fn user_default() -> Result<Self> {
        Self::new(default_lock_dir()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File whose exclusive lock is the claim on `name`
    pub fn claim_path(&self, name: &LockName) -> PathBuf {
        self.dir.join(format!("{}.{}", name.as_str(), CLAIM_EXTENSION))
    }

    /// Directory holding one exclusively locked file per open handle of `name`
    pub fn presence_path(&self, name: &LockName) -> PathBuf {
        self.dir.join(format!("{}.{}", name.as_str(), PRESENCE_EXTENSION))
    }
}

/// Get the platform-specific cache directory for lock files.
///
/// Returns an error if the cache directory cannot be determined
/// (e.g., on systems without a home directory). Callers can work around this
/// by passing an explicit directory.
pub fn default_lock_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "rendezvous").ok_or_else(|| {
        RendezvousError::Other(
            "Failed to determine lock directory. \
                 Try specifying an explicit directory with --lock-dir."
                .to_string(),
        )
    })?;

    Ok(proj_dirs.cache_dir().join("locks"))
}
