use crate::barrier::BarrierConfig;
use crate::error::{RendezvousError, Result};
use crate::lock::{LockName, LockNamespace, NamedLock};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierState {
    Idle,
    SelfClaimed,
    Scanning,
    Passed,
}

impl BarrierState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BarrierState::SelfClaimed,
            2 => BarrierState::Scanning,
            3 => BarrierState::Passed,
            _ => BarrierState::Idle,
        }
    }
}

/// Progress reported to the observer of [`Participant::wait_observed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierEvent {
    /// The participant holds the claim on its own lock.
    SelfClaimed,
    /// One gated scan finished; `missing` lists the peers found absent.
    Scanned { round: u64, missing: Vec<LockName> },
    /// The self claim has been released and `wait` is about to return.
    Passed { rounds: u64 },
}

/// One member of a barrier, identified by its own lock name.
///
/// Obtained from [`crate::barrier::BarrierRegistry`], which keeps every
/// participant (and so its open self lock) alive until the process exits.
#[derive(Debug)]
pub struct Participant {
    name: LockName,
    peers: BTreeSet<LockName>,
    config: BarrierConfig,
    namespace: LockNamespace,
    self_lock: NamedLock,
    state: AtomicU8,
}

impl Participant {
    pub(crate) fn new(
        namespace: LockNamespace,
        name: LockName,
        peers: BTreeSet<LockName>,
        config: BarrierConfig,
    ) -> Result<Self> {
        if peers.contains(&name) {
            return Err(RendezvousError::invalid_membership(
                name.as_str(),
                "peer set contains the participant itself",
            ));
        }
        if name == config.gate_name || peers.contains(&config.gate_name) {
            return Err(RendezvousError::invalid_membership(
                name.as_str(),
                format!("'{}' is reserved for the barrier gate", config.gate_name),
            ));
        }

        let self_lock = NamedLock::open(&namespace, &name)?;

        debug!(
            "Registered participant {} with {} peer(s) in {}",
            name,
            peers.len(),
            namespace.dir().display()
        );

        Ok(Participant {
            name,
            peers,
            config,
            namespace,
            self_lock,
            state: AtomicU8::new(BarrierState::Idle as u8),
        })
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    pub fn peers(&self) -> &BTreeSet<LockName> {
        &self.peers
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    pub fn namespace(&self) -> &LockNamespace {
        &self.namespace
    }

    pub fn state(&self) -> BarrierState {
        BarrierState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: BarrierState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Block until every peer has been observed present.
    ///
    /// There is no timeout: if a peer never starts, this never returns.
    /// Callers that need a deadline must impose it themselves and accept that an
    /// abandoned wait keeps the self claim.
    pub fn wait(&self) -> Result<()> {
        self.wait_observed(|_| {})
    }

    /// [`Participant::wait`], reporting each step to `observer` on the calling
    /// thread. Scans are reported while the self claim is still held.
    pub fn wait_observed<F>(&self, mut observer: F) -> Result<()>
    where
        F: FnMut(&BarrierEvent),
    {
        let outcome = self.rendezvous(&mut observer);
        if outcome.is_err() {
            self.set_state(BarrierState::Idle);
        }
        outcome
    }

    fn rendezvous<F>(&self, observer: &mut F) -> Result<()>
    where
        F: FnMut(&BarrierEvent),
    {
        debug!(
            "Participant {} waiting for {} peer(s)",
            self.name,
            self.peers.len()
        );

        // Held until every peer has been seen, so no peer can take our
        // presence as "already through" before we have checked anyone
        let claim = self.self_lock.acquire()?;
        self.set_state(BarrierState::SelfClaimed);
        observer(&BarrierEvent::SelfClaimed);

        let gate = NamedLock::open(&self.namespace, &self.config.gate_name)?;
        self.set_state(BarrierState::Scanning);

        let mut round = 0u64;
        loop {
            round += 1;

            let gate_guard = gate.acquire()?;
            let missing = self.missing_peers()?;
            gate_guard.release()?;

            let all_present = missing.is_empty();
            if !all_present {
                debug!(
                    "Participant {} round {}: waiting on {}",
                    self.name,
                    round,
                    missing
                        .iter()
                        .map(LockName::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            observer(&BarrierEvent::Scanned { round, missing });

            if all_present {
                break;
            }
            thread::sleep(self.config.next_delay());
        }
        drop(gate);

        claim.release()?;
        self.set_state(BarrierState::Passed);

        info!(
            "Barrier passed by {} after {} round(s) at {}",
            self.name,
            round,
            Utc::now().to_rfc3339()
        );
        observer(&BarrierEvent::Passed { rounds: round });

        Ok(())
    }

    /// Probe every peer; must run under the gate.
    fn missing_peers(&self) -> Result<Vec<LockName>> {
        let mut missing = Vec::new();
        for peer in &self.peers {
            if !NamedLock::probe(&self.namespace, peer)? {
                missing.push(peer.clone());
            }
        }
        Ok(missing)
    }
}
