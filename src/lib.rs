//! Cross-process rendezvous barrier and serialized critical sections built on
//! named file locks

pub mod barrier;
pub mod error;
pub mod exclusive;
pub mod lock;
pub mod topology;
pub mod utils;

pub use barrier::{BarrierConfig, BarrierEvent, BarrierRegistry, BarrierState, Participant};
pub use error::{RendezvousError, Result};
pub use exclusive::{run_exclusive_after_barrier, run_serialized, Coordination};
pub use lock::{LockName, LockNamespace, NameNormalizer, NamedLock, NamedLockGuard};
