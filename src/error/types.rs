use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendezvousError {
    #[error("Invalid lock name '{name}': {reason}")]
    InvalidLockName { name: String, reason: String },

    #[error("Lock name collision: '{first}' and '{second}' both normalize to '{name}'")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Invalid membership for participant '{name}': {reason}")]
    InvalidMembership { name: String, reason: String },

    #[error("Failed to prepare lock directory {path}: {source}")]
    LockDirectoryFailed { path: PathBuf, source: io::Error },

    #[error("Failed to open lock {path}: {source}")]
    LockOpenFailed { path: PathBuf, source: io::Error },

    #[error("Failed to acquire lock on {path}: {source}")]
    LockAcquisitionFailed { path: PathBuf, source: io::Error },

    #[error("Failed to release lock on {path}: {source}")]
    LockReleaseFailed { path: PathBuf, source: io::Error },

    #[error("Failed to probe lock {path}: {source}")]
    ProbeFailed { path: PathBuf, source: io::Error },

    #[error("Invalid duration format '{input}': {message}")]
    InvalidDuration { input: String, message: String },

    #[error("Failed to run command '{command}': {source}")]
    CommandFailed { command: String, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl RendezvousError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RendezvousError::LockOpenFailed { .. }
            | RendezvousError::LockAcquisitionFailed { .. }
            | RendezvousError::LockReleaseFailed { .. }
            | RendezvousError::ProbeFailed { .. } => 2,
            RendezvousError::Io(e) if e.kind() == io::ErrorKind::Interrupted => 3,
            _ => 1,
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RendezvousError::InvalidLockName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_membership(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RendezvousError::InvalidMembership {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RendezvousError>;
