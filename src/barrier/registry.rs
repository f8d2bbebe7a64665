use crate::barrier::{BarrierConfig, Participant};
use crate::error::Result;
use crate::lock::{LockName, LockNamespace};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{OnceLock, PoisonError, RwLock};
use tracing::{debug, warn};

static GLOBAL: OnceLock<BarrierRegistry> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    dir: PathBuf,
    name: LockName,
}

/// Get-or-create store of [`Participant`]s, one per (namespace, name).
///
/// Participants are never removed and never dropped: closing a participant's
/// self lock would make it look absent to peers while it is still running.
/// There is deliberately no teardown; tests isolate themselves with distinct
/// namespaces or names instead.
#[derive(Debug, Default)]
pub struct BarrierRegistry {
    instances: RwLock<HashMap<RegistryKey, &'static Participant>>,
}

impl BarrierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static BarrierRegistry {
        GLOBAL.get_or_init(BarrierRegistry::new)
    }

    /// Return the participant for `name`, registering it on first request.
    ///
    /// Later requests for the same name get the original participant back,
    /// whatever `peers` and `config` they pass.
    pub fn get_instance<I>(
        &self,
        namespace: &LockNamespace,
        name: &LockName,
        peers: I,
        config: BarrierConfig,
    ) -> Result<&'static Participant>
    where
        I: IntoIterator<Item = LockName>,
    {
        let key = RegistryKey {
            dir: namespace.dir().to_path_buf(),
            name: name.clone(),
        };
        let peers: BTreeSet<LockName> = peers.into_iter().collect();

        // Fast path
        let existing = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        if let Some(participant) = existing {
            warn_on_mismatch(participant, &peers, &config);
            return Ok(participant);
        }

        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Another thread may have registered it while we waited
        if let Some(participant) = instances.get(&key).copied() {
            warn_on_mismatch(participant, &peers, &config);
            return Ok(participant);
        }

        let participant = Participant::new(namespace.clone(), name.clone(), peers, config)?;
        let participant: &'static Participant = Box::leak(Box::new(participant));
        instances.insert(key, participant);

        debug!("Registry now holds {} participant(s)", instances.len());

        Ok(participant)
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn warn_on_mismatch(
    participant: &Participant,
    peers: &BTreeSet<LockName>,
    config: &BarrierConfig,
) {
    if participant.peers() != peers || participant.config() != config {
        warn!(
            "Participant {} already registered with different peers or config; keeping the original",
            participant.name()
        );
    }
}
