//! Run an action in one process at a time, after every participant has
//! reached the barrier.

use crate::barrier::Participant;
use crate::error::Result;
use crate::lock::{LockName, NamedLock};
use tracing::debug;

/// Lock guarding the action when callers don't name their own.
pub const DEFAULT_SERIALIZATION_LOCK_NAME: &str = "rendezvous-serialize";

pub fn default_serialization_lock() -> LockName {
    LockName::well_known(DEFAULT_SERIALIZATION_LOCK_NAME)
}

/// Whether the action needs cross-process coordination at all.
#[derive(Debug, Clone, Copy)]
pub enum Coordination<'a> {
    /// Wait at the barrier, then serialize on the lock.
    Barrier(&'a Participant),
    /// Only one instance exists; run the action directly.
    Standalone,
}

/// Pass `participant`'s barrier, then run `action` while holding
/// `serialization_lock` in the participant's namespace.
///
/// The lock is released however `action` ends, including by panic. A failure
/// to release after a successful action is still reported as an error.
pub fn run_exclusive_after_barrier<F, R>(
    participant: &Participant,
    serialization_lock: &LockName,
    action: F,
) -> Result<R>
where
    F: FnOnce() -> R,
{
    participant.wait()?;

    let lock = NamedLock::open(participant.namespace(), serialization_lock)?;
    let guard = lock.acquire()?;

    debug!(
        "Participant {} running exclusive action under {}",
        participant.name(),
        serialization_lock
    );
    let output = action();

    guard.release()?;
    Ok(output)
}

/// [`run_exclusive_after_barrier`], or just `action` when running standalone.
pub fn run_serialized<F, R>(
    coordination: Coordination<'_>,
    serialization_lock: &LockName,
    action: F,
) -> Result<R>
where
    F: FnOnce() -> R,
{
    match coordination {
        Coordination::Barrier(participant) => {
            run_exclusive_after_barrier(participant, serialization_lock, action)
        }
        Coordination::Standalone => {
            debug!("Standalone deployment, running action without coordination");
            Ok(action())
        }
    }
}
