mod name;
mod named;
mod namespace;

pub use name::{HashedNormalizer, InstanceIdEscaper, LockName, NameNormalizer, Verbatim};
pub use named::{NamedLock, NamedLockGuard};
pub use namespace::{default_lock_dir, LockNamespace};
