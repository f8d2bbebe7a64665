use crate::error::{RendezvousError, Result};
use crate::lock::{LockName, LockNamespace};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// Check if an I/O error indicates lock contention (file locked by another process)
fn is_lock_contention(e: &io::Error) -> bool {
    // Check for WouldBlock (Unix)
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_LOCK_VIOLATION (33) - file region is locked
    // ERROR_SHARING_VIOLATION (32) - file in use by another process
    #[cfg(windows)]
    if let Some(code) = e.raw_os_error() {
        if code == 33 || code == 32 {
            return true;
        }
    }
    false
}

fn lock_file_options(create_new: bool) -> OpenOptions {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true);
    if create_new {
        opts.create_new(true);
    }

    // On Unix, use O_NOFOLLOW to reject symlinks at OS level
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.custom_flags(libc::O_NOFOLLOW);
    }

    opts
}

/// Open `path`, creating it first if no process has.
///
/// "Does it exist" and "create it" are separate steps, so a peer can create
/// the file in between. Losing that race just means opening the peer's file.
fn open_or_create(path: &Path) -> Result<File> {
    let open_failed = |e: io::Error| RendezvousError::LockOpenFailed {
        path: path.to_path_buf(),
        source: e,
    };

    match lock_file_options(false).open(path) {
        Ok(file) => return Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(open_failed(e)),
    }

    match lock_file_options(true).open(path) {
        Ok(file) => {
            trace!("Created lock file: {}", path.display());
            Ok(file)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!("Lost create race, opening existing: {}", path.display());
            lock_file_options(false).open(path).map_err(open_failed)
        }
        Err(e) => Err(open_failed(e)),
    }
}

/// Create the per-name presence directory, refusing anything that is not a
/// real directory (a symlink included).
fn prepare_presence_dir(path: &Path) -> Result<()> {
    let open_failed = |e: io::Error| RendezvousError::LockOpenFailed {
        path: path.to_path_buf(),
        source: e,
    };

    fs::create_dir_all(path).map_err(open_failed)?;
    let metadata = fs::symlink_metadata(path).map_err(open_failed)?;
    if !metadata.file_type().is_dir() {
        return Err(open_failed(io::Error::new(
            io::ErrorKind::Other,
            "presence path is not a directory",
        )));
    }
    Ok(())
}

/// Non-blocking "is some open file holding `path` exclusively".
///
/// Only ever tries a shared lock, so concurrent checks never see each other.
/// Returns `None` if the file does not exist. Never creates the file and never
/// keeps it open past the call.
fn held_exclusively(path: &Path) -> Result<Option<bool>> {
    let check_failed = |e: io::Error| RendezvousError::ProbeFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut opts = OpenOptions::new();
    opts.read(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.custom_flags(libc::O_NOFOLLOW);
    }

    let file = match opts.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(check_failed(e)),
    };

    match FileExt::try_lock_shared(&file) {
        // Our shared lock goes away with `file`
        Ok(()) => Ok(Some(false)),
        Err(e) if is_lock_contention(&e) => Ok(Some(true)),
        Err(e) => Err(check_failed(e)),
    }
}

/// Per-process counter making each handle's presence file name unique.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0);

/// A handle on a cross-process named lock.
///
/// Every open handle creates its own file under `<name>.presence/` and holds
/// an exclusive lock on it, so the name "exists" for other processes exactly
/// as long as some handle is open. Presence checks only try shared locks. The
/// claim itself is an exclusive lock on `<name>.lock`.
///
/// File locks belong to the open file, not the thread, so threads sharing one
/// handle are additionally serialized by an in-process mutex.
#[derive(Debug)]
pub struct NamedLock {
    name: LockName,
    claim_path: PathBuf,
    claim: File,
    presence_path: PathBuf,
    #[allow(dead_code)]
    presence: File,
    local: Mutex<()>,
}

impl NamedLock {
    /// Open (or create) the named lock and register this handle's presence.
    pub fn open(namespace: &LockNamespace, name: &LockName) -> Result<Self> {
        let presence_dir = namespace.presence_path(name);
        prepare_presence_dir(&presence_dir)?;

        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        let presence_path = presence_dir.join(format!("{}-{}", process::id(), handle));
        // A stale file left by a dead process with the same pid is simply reused
        let presence = open_or_create(&presence_path)?;
        // Can only wait behind a presence check's momentary shared lock
        FileExt::lock_exclusive(&presence).map_err(|e| RendezvousError::LockOpenFailed {
            path: presence_path.clone(),
            source: e,
        })?;

        let claim_path = namespace.claim_path(name);
        let claim = open_or_create(&claim_path)?;

        debug!("Opened named lock: {}", name);

        Ok(NamedLock {
            name: name.clone(),
            claim_path,
            claim,
            presence_path,
            presence,
            local: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    /// Block until this handle holds the claim exclusively.
    pub fn acquire(&self) -> Result<NamedLockGuard<'_>> {
        debug!("Acquiring lock: {}", self.name);

        // The guarded value is (), so a poisoned mutex carries no broken state
        let local = self.local.lock().unwrap_or_else(PoisonError::into_inner);

        FileExt::lock_exclusive(&self.claim).map_err(|e| {
            RendezvousError::LockAcquisitionFailed {
                path: self.claim_path.clone(),
                source: e,
            }
        })?;

        debug!("Lock acquired: {}", self.name);

        Ok(NamedLockGuard {
            lock: self,
            _local: local,
            released: false,
        })
    }

    /// Whether any process currently has a handle on `name` open.
    ///
    /// Files left behind by crashed processes are unlocked and count as absent.
    pub fn probe(namespace: &LockNamespace, name: &LockName) -> Result<bool> {
        let dir = namespace.presence_path(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("Probed {}: absent (never opened)", name);
                return Ok(false);
            }
            Err(e) => {
                return Err(RendezvousError::ProbeFailed {
                    path: dir,
                    source: e,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| RendezvousError::ProbeFailed {
                path: dir.clone(),
                source: e,
            })?;

            // Skip symlinks and anything else we did not create
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            // A file removed since the listing belonged to a closed handle
            if held_exclusively(&entry.path())? == Some(true) {
                trace!("Probed {}: present", name);
                return Ok(true);
            }
        }

        trace!("Probed {}: absent", name);
        Ok(false)
    }

    /// Whether any process currently holds the claim on `name`.
    pub fn probe_claim(namespace: &LockNamespace, name: &LockName) -> Result<bool> {
        Ok(held_exclusively(&namespace.claim_path(name))?.unwrap_or(false))
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        // Closing the file drops the lock; removing it only keeps the directory tidy
        if let Err(e) = fs::remove_file(&self.presence_path) {
            debug!(
                "Could not remove presence file {}: {}",
                self.presence_path.display(),
                e
            );
        }
    }
}

/// An exclusive claim on a [`NamedLock`]. Released on drop if not released
/// explicitly.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct NamedLockGuard<'a> {
    lock: &'a NamedLock,
    _local: MutexGuard<'a, ()>,
    released: bool,
}

impl NamedLockGuard<'_> {
    pub fn name(&self) -> &LockName {
        &self.lock.name
    }

    /// Release the claim, reporting failure instead of logging it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        FileExt::unlock(&self.lock.claim).map_err(|e| RendezvousError::LockReleaseFailed {
            path: self.lock.claim_path.clone(),
            source: e,
        })?;
        debug!("Lock released: {}", self.lock.name);
        Ok(())
    }
}

impl Drop for NamedLockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Best effort, never panic
        match FileExt::unlock(&self.lock.claim) {
            Ok(()) => debug!("Lock released on drop: {}", self.lock.name),
            Err(e) => warn!(
                "Failed to release lock {} (closing the handle will): {}",
                self.lock.name, e
            ),
        }
    }
}
